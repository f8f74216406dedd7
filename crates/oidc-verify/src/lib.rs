//! OpenID Connect identity-token verification library
//!
//! Implements the OAuth2 Authorization Code flow with PKCE against a
//! single OIDC provider and cryptographically verifies the identity
//! token that comes back. This crate is a standalone library with no
//! HTTP routing of its own; the gateway binary (or any other host
//! application) wires it to inbound requests and a session backend.
//!
//! Flow:
//! 1. Host calls [`AuthFlow::begin`] and redirects the user to the
//!    returned authorization URL
//! 2. Provider redirects back; host passes the query parameters to
//!    [`AuthFlow::complete`]
//! 3. The controller exchanges the code, resolves the provider key,
//!    verifies the RSA signature, and validates the claim set
//! 4. Outcome is committed to the session store and queryable via
//!    [`AuthFlow::current_result`]

pub mod claims;
pub mod compact;
pub mod config;
pub mod error;
pub mod flow;
pub mod jwk;
pub mod jwks;
pub mod pkce;
pub mod session;
pub mod verify;

#[cfg(test)]
pub(crate) mod testkeys;

pub use claims::Claims;
pub use compact::CompactToken;
pub use config::ProviderConfig;
pub use error::{Error, Result};
pub use flow::{AuthFlow, CallbackParams, RedirectTarget, VerificationResult};
pub use jwks::{JsonWebKey, KeySet};
pub use pkce::PkceMaterial;
pub use session::{MemorySessionStore, SessionStore};
