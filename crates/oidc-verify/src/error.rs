//! Error types for token verification and the authorization flow
//!
//! Every variant here is internal detail: the flow controller collapses
//! all of them to a boolean before anything reaches the caller. Keeping
//! the kinds distinct matters for logging; a silent binary failure is
//! a debugging hazard when the provider misbehaves.

/// Errors from token verification and authorization-flow operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed JWK material (bad base64url, empty modulus/exponent)
    #[error("key codec error: {0}")]
    KeyCodec(String),

    /// Malformed compact serialization (wrong segment count, bad JSON)
    #[error("token format error: {0}")]
    TokenFormat(String),

    /// Key-set fetch or token exchange unreachable, timed out, or non-2xx
    #[error("network error: {0}")]
    Network(String),

    /// RSA signature did not verify against the resolved key
    #[error("token signature invalid")]
    SignatureInvalid,

    /// A claim check failed; carries the claim name that failed
    #[error("invalid claim: {0}")]
    ClaimInvalid(&'static str),

    /// Missing/mismatched callback state, or callback with no pending flow
    #[error("flow state error: {0}")]
    FlowState(String),
}

/// Result alias for verification operations.
pub type Result<T> = std::result::Result<T, Error>;
