//! Kernel module - server infrastructure and dependencies.

pub mod ai;
pub mod background;
pub mod deps;
pub mod setup;
pub mod test_dependencies;
pub mod traits;

pub use background::{BackgroundIndexer, DispatchOutcome};
pub use deps::{ModelConfig, ServerDeps, DEFAULT_CHAT_MODEL, DEFAULT_UTILITY_MODEL};
pub use test_dependencies::{MockAI, MockAICall, TestDependencies};
pub use traits::*;

pub use openai_client::StructuredOutput;
