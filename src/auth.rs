//! Credential models: redacted secrets, persisted credentials, and auth endpoint payloads.

pub mod credential;
pub mod secret;

pub use credential::*;
pub use secret::*;
