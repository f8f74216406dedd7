//! Compact token codec
//!
//! Splits a `header.payload.signature` compact serialization into its
//! parts. Pure parsing: no signature or claim checks happen here. The
//! one subtle requirement is `signed_input`: signature verification must
//! run over the literal `header.payload` substring of the original
//! token, never over re-serialized JSON, because serialization is not
//! canonical (key order, whitespace).

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde_json::Value;

use crate::claims::Claims;
use crate::error::{Error, Result};

/// Parsed view of a compact-serialized token.
#[derive(Debug, Clone)]
pub struct CompactToken {
    /// Decoded JOSE header
    pub header: Value,
    /// Decoded claim set
    pub claims: Claims,
    /// Raw signature bytes (third segment, never JSON)
    pub signature: Vec<u8>,
    /// The exact `header.payload` substring the signature covers
    pub signed_input: String,
}

impl CompactToken {
    /// Declared signature algorithm from the header, if any.
    pub fn algorithm(&self) -> Option<&str> {
        self.header.get("alg").and_then(Value::as_str)
    }

    /// Declared key identifier from the header, if any.
    pub fn key_id(&self) -> Option<&str> {
        self.header.get("kid").and_then(Value::as_str)
    }
}

/// Parse a compact serialization into header, claims, and signature.
///
/// Requires exactly three dot-separated segments; anything else is a
/// format error.
pub fn decode(token: &str) -> Result<CompactToken> {
    let segments: Vec<&str> = token.split('.').collect();
    if segments.len() != 3 {
        return Err(Error::TokenFormat(format!(
            "expected 3 segments, got {}",
            segments.len()
        )));
    }

    let header = decode_json_segment(segments[0], "header")?;
    let payload = decode_json_segment(segments[1], "payload")?;
    let claims = Claims::from_value(payload)?;

    let signature = URL_SAFE_NO_PAD
        .decode(segments[2])
        .map_err(|e| Error::TokenFormat(format!("signature segment: {e}")))?;

    // Keep the original bytes; re-encoding the parsed JSON would break
    // signature verification.
    let signed_input = token[..segments[0].len() + 1 + segments[1].len()].to_string();

    Ok(CompactToken {
        header,
        claims,
        signature,
        signed_input,
    })
}

fn decode_json_segment(segment: &str, which: &str) -> Result<Value> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|e| Error::TokenFormat(format!("{which} segment: {e}")))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| Error::TokenFormat(format!("{which} is not valid JSON: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_token(header: &str, payload: &str, signature: &[u8]) -> String {
        format!(
            "{}.{}.{}",
            URL_SAFE_NO_PAD.encode(header),
            URL_SAFE_NO_PAD.encode(payload),
            URL_SAFE_NO_PAD.encode(signature),
        )
    }

    #[test]
    fn decodes_all_three_segments() {
        let token = encode_token(
            r#"{"alg":"RS256","kid":"key-1"}"#,
            r#"{"iss":"https://idp.example.com","sub":"user-1"}"#,
            b"\x01\x02\x03",
        );

        let parsed = decode(&token).expect("valid token");
        assert_eq!(parsed.algorithm(), Some("RS256"));
        assert_eq!(parsed.key_id(), Some("key-1"));
        assert_eq!(parsed.claims.issuer(), Some("https://idp.example.com"));
        assert_eq!(parsed.signature, vec![0x01, 0x02, 0x03]);
    }

    #[test]
    fn signed_input_is_byte_identical_to_original() {
        // Non-canonical JSON: out-of-order keys and embedded whitespace
        // must survive the round trip untouched.
        let header = r#"{ "kid": "k", "alg":"RS256" }"#;
        let payload = r#"{"b": 2,  "a": 1}"#;
        let token = encode_token(header, payload, b"sig");

        let parsed = decode(&token).expect("valid token");
        let dot = token.rfind('.').unwrap();
        assert_eq!(parsed.signed_input, token[..dot]);
    }

    #[test]
    fn rejects_wrong_segment_count() {
        for bad in ["", "a.b", "a.b.c.d", "onesegment"] {
            assert!(
                matches!(decode(bad), Err(Error::TokenFormat(_))),
                "should reject {bad:?}"
            );
        }
    }

    #[test]
    fn rejects_non_json_segments() {
        let not_json = URL_SAFE_NO_PAD.encode("not json");
        let token = format!("{not_json}.{not_json}.AAAA");
        assert!(matches!(decode(&token), Err(Error::TokenFormat(_))));
    }

    #[test]
    fn rejects_bad_base64_signature() {
        let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"RS256"}"#);
        let payload = URL_SAFE_NO_PAD.encode(r#"{"iss":"x"}"#);
        let token = format!("{header}.{payload}.!!notbase64!!");
        assert!(matches!(decode(&token), Err(Error::TokenFormat(_))));
    }

    #[test]
    fn signature_segment_is_never_json_parsed() {
        // A signature that happens to be valid JSON bytes stays raw
        let token = encode_token(r#"{"alg":"RS256"}"#, r#"{"iss":"x"}"#, b"{}");
        let parsed = decode(&token).expect("valid token");
        assert_eq!(parsed.signature, b"{}");
    }

    #[test]
    fn rejects_non_object_payload() {
        let token = encode_token(r#"{"alg":"RS256"}"#, r#"[1,2,3]"#, b"sig");
        assert!(matches!(decode(&token), Err(Error::TokenFormat(_))));
    }
}
