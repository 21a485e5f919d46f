//! Chat domain - per-message routing and the nodes that answer.
//!
//! A turn is: supervisor picks a [`Route`], one node appends an assistant
//! message (or none, for `Finish`), done.

pub mod graph;
pub mod nodes;
pub mod prompts;
pub mod router;
pub mod state;

pub use graph::{ChatGraph, ChatReply, ReplyStatus};
pub use nodes::{retrieve_and_grade, GradedChunk};
pub use router::{Route, Supervisor};
pub use state::{ChatMessage, ChatState, Role};
