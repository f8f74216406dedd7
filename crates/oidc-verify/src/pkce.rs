//! PKCE (Proof Key for Code Exchange) material per RFC 7636
//!
//! Generates the per-attempt random triple (CSRF `state`, replay
//! `nonce`, and PKCE `code_verifier`) plus the S256 challenge derived
//! from the verifier. All three are persisted across the redirect
//! round-trip by the session store and consumed exactly once on
//! callback.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::Rng;
use sha2::{Digest, Sha256};

use crate::config::ProviderConfig;

/// One authorization attempt's random material.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PkceMaterial {
    /// CSRF token echoed back by the provider on callback
    pub state: String,
    /// Replay-resistant nonce bound into the identity token
    pub nonce: String,
    /// PKCE verifier sent during token exchange
    pub code_verifier: String,
}

/// Generate fresh PKCE material: 16 random bytes each for state and
/// nonce, 64 for the verifier, all hex-encoded.
///
/// The 128-char hex verifier sits exactly at RFC 7636's upper length
/// bound of 128 characters.
pub fn generate() -> PkceMaterial {
    PkceMaterial {
        state: random_hex::<16>(),
        nonce: random_hex::<16>(),
        code_verifier: random_hex::<64>(),
    }
}

fn random_hex<const N: usize>() -> String {
    let mut bytes = [0u8; N];
    rand::rng().fill(&mut bytes[..]);
    hex::encode(bytes)
}

/// Compute the S256 code challenge from a verifier.
///
/// `challenge = BASE64URL(SHA256(verifier))`, padding stripped.
pub fn compute_challenge(verifier: &str) -> String {
    let hash = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hash)
}

/// Build the authorization redirect URL with all required parameters.
pub fn build_authorization_url(
    config: &ProviderConfig,
    material: &PkceMaterial,
    challenge: &str,
) -> String {
    format!(
        "{}?response_type=code&client_id={}&redirect_uri={}&scope={}&state={}&nonce={}&code_challenge={}&code_challenge_method=S256",
        config.authorization_endpoint,
        urlencoded(&config.client_id),
        urlencoded(&config.redirect_uri),
        urlencoded(&config.scopes),
        material.state,
        material.nonce,
        challenge,
    )
}

/// Minimal URL encoding for parameter values.
/// Only encodes characters that would break URL parameter parsing.
fn urlencoded(s: &str) -> String {
    s.replace('%', "%25")
        .replace(' ', "%20")
        .replace(':', "%3A")
        .replace('/', "%2F")
        .replace('?', "%3F")
        .replace('&', "%26")
        .replace('=', "%3D")
}
