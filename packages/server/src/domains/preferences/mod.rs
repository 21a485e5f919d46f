//! Preferences domain - the privacy-preferences questionnaire.

pub mod assistant;
pub mod questions;

pub use assistant::PreferenceAssistant;
pub use questions::{next_question, PreferenceQuestion, PREFERENCE_QUESTIONS};
