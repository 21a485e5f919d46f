//! Grading domain - scores retrieved passages against the user's question.

pub mod grader;

pub use grader::{ChunkGrade, ChunkRating, Grader};
