pub mod jwks;

pub use jwks::{bearer_token, AuthError, ClerkClaims, JwksVerifier};
