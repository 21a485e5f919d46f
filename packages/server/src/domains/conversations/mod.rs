//! Conversations domain - per-session chat memory.

pub mod format;
pub mod models;
pub mod store;

pub use format::{format_time_ago, generate_conversation_title, ConversationSummary};
pub use models::{Conversation, StoredMessage};
pub use store::{
    ConversationStore, MemoryConversationStore, PostgresConversationStore, DEFAULT_LIST_LIMIT,
};
