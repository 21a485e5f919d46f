// ClauseBit - API Core
//
// Backend for a chat assistant that answers questions about websites' privacy
// policies and terms of service.
//
// Each message is routed by a supervisor to one node (document search, direct
// answer, background indexing notice). Domains live in domains/*, shared
// infrastructure in kernel/.

pub mod config;
pub mod domains;
pub mod kernel;
pub mod server;

pub use config::*;
