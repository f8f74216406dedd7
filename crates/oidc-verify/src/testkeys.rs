//! Shared RSA fixture for unit tests
//!
//! The checked-in key under `tests/fixtures/` pairs with the JWKS
//! document built here; integration tests load the same PEM so tokens
//! signed in one place verify in the other.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rsa::pkcs8::DecodePrivateKey;
use rsa::traits::PublicKeyParts;
use rsa::{Pkcs1v15Sign, RsaPrivateKey};
use serde_json::{Value, json};
use sha2::{Digest, Sha256};

pub(crate) const TEST_KEY_ID: &str = "test-key-1";

pub(crate) const TEST_PRIVATE_KEY_PEM: &str =
    include_str!("../tests/fixtures/test_key.pem");

pub(crate) fn private_key() -> RsaPrivateKey {
    RsaPrivateKey::from_pkcs8_pem(TEST_PRIVATE_KEY_PEM).expect("fixture key parses")
}

/// Base64url modulus of the fixture key, as a provider would publish it.
pub(crate) fn jwk_n() -> String {
    URL_SAFE_NO_PAD.encode(private_key().n().to_bytes_be())
}

pub(crate) fn jwk_e() -> String {
    URL_SAFE_NO_PAD.encode(private_key().e().to_bytes_be())
}

pub(crate) fn jwks_document() -> Value {
    json!({
        "keys": [{
            "kty": "RSA",
            "use": "sig",
            "alg": "RS256",
            "kid": TEST_KEY_ID,
            "n": jwk_n(),
            "e": jwk_e(),
        }]
    })
}

pub(crate) fn sign_rs256(signed_input: &str) -> Vec<u8> {
    private_key()
        .sign(
            Pkcs1v15Sign::new::<Sha256>(),
            &Sha256::digest(signed_input.as_bytes()),
        )
        .expect("signing fixture input")
}

/// Assemble a compact-serialized RS256 token over the given claims.
pub(crate) fn make_token(claims: &Value) -> String {
    let header = json!({"alg": "RS256", "typ": "JWT", "kid": TEST_KEY_ID});
    let signed_input = format!(
        "{}.{}",
        URL_SAFE_NO_PAD.encode(header.to_string()),
        URL_SAFE_NO_PAD.encode(claims.to_string()),
    );
    let signature = sign_rs256(&signed_input);
    format!("{signed_input}.{}", URL_SAFE_NO_PAD.encode(signature))
}
