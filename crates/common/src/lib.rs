//! Shared types for the OIDC verification gateway

mod error;
mod secret;

pub use error::{Error, Result};
pub use secret::Secret;
