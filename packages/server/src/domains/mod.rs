// Business domains
pub mod chat;
pub mod conversations;
pub mod grading;
pub mod preferences;
pub mod sites;
pub mod summary;
