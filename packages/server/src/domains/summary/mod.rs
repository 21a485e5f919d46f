//! Summary domain - four-clause privacy summaries of a site.

pub mod models;
pub mod summarizer;

pub use models::{Clause, ClauseType, PolicySummary};
pub use summarizer::Summarizer;
