pub mod auth;

pub use auth::{AuthUser, TokenVerifier, ANONYMOUS_USER};
