// HTTP routes
pub mod chat;
pub mod conversations;
pub mod extension_auth;
pub mod health;
pub mod preferences;
pub mod sites;

pub use chat::*;
pub use conversations::*;
pub use extension_auth::*;
pub use health::*;
pub use preferences::*;
pub use sites::*;
