//! Key resolution against the provider's published key set
//!
//! Fetches the JWKS document and picks the verification key the token
//! header points at. Selection order: exact `kid` match first, then the
//! first RSA key in the set. The fallback keeps working against
//! providers that publish a single unlabeled key, at the cost of a
//! weaker token-to-key binding when the set holds several.

use reqwest::Client;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::jwk;

/// One entry of a JWKS document. Unknown fields are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonWebKey {
    #[serde(default)]
    pub kid: Option<String>,
    #[serde(default)]
    pub kty: String,
    #[serde(default)]
    pub n: Option<String>,
    #[serde(default)]
    pub e: Option<String>,
}

impl JsonWebKey {
    pub fn is_rsa(&self) -> bool {
        self.kty == "RSA"
    }

    /// Reconstruct this key as a DER SubjectPublicKeyInfo.
    pub fn to_spki(&self) -> Result<Vec<u8>> {
        let n = self
            .n
            .as_deref()
            .ok_or_else(|| Error::KeyCodec("JWK is missing modulus".into()))?;
        let e = self
            .e
            .as_deref()
            .ok_or_else(|| Error::KeyCodec("JWK is missing exponent".into()))?;
        jwk::rsa_spki_from_components(n, e)
    }
}

/// A provider key-set document (`{"keys": [...]}`).
#[derive(Debug, Clone, Deserialize)]
pub struct KeySet {
    pub keys: Vec<JsonWebKey>,
}

impl KeySet {
    /// Select the verification key for a token's declared `kid`.
    ///
    /// Falls back to the first RSA key when the token declares no key id
    /// or no entry matches it; returns None only when the set holds no
    /// RSA key at all.
    pub fn select(&self, kid: Option<&str>) -> Option<&JsonWebKey> {
        if let Some(kid) = kid {
            if let Some(matched) = self
                .keys
                .iter()
                .find(|key| key.kid.as_deref() == Some(kid))
            {
                return Some(matched);
            }
        }
        self.keys.iter().find(|key| key.is_rsa())
    }
}

/// Fetch the key-set document. Timeout behavior comes from the injected
/// client; unreachable endpoints and non-2xx statuses are resolution
/// failures, never successes.
pub async fn fetch(client: &Client, jwks_uri: &str) -> Result<KeySet> {
    let response = client
        .get(jwks_uri)
        .send()
        .await
        .map_err(|e| Error::Network(format!("key-set fetch failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        return Err(Error::Network(format!(
            "key-set endpoint returned {status}"
        )));
    }

    response
        .json::<KeySet>()
        .await
        .map_err(|e| Error::Network(format!("invalid key-set document: {e}")))
}

/// Resolve the DER verification key for a token's `kid` in one step.
pub async fn resolve_key(client: &Client, jwks_uri: &str, kid: Option<&str>) -> Result<Vec<u8>> {
    let key_set = fetch(client, jwks_uri).await?;
    let key = key_set
        .select(kid)
        .ok_or_else(|| Error::KeyCodec("key set contains no usable RSA key".into()))?;
    key.to_spki()
}
