//! Key material codec: JWK components to DER SubjectPublicKeyInfo
//!
//! Providers publish RSA verification keys as JWK `n`/`e` fields,
//! base64url-encoded big-endian integers. The verifier wants a
//! DER-encoded SubjectPublicKeyInfo. This module bridges the two with a
//! small hand-rolled DER writer:
//!
//! ```text
//! SEQUENCE {
//!     SEQUENCE { OID rsaEncryption, NULL }      -- AlgorithmIdentifier
//!     BIT STRING {
//!         SEQUENCE { INTEGER n, INTEGER e }     -- RSAPublicKey
//!     }
//! }
//! ```
//!
//! Pure byte manipulation, no I/O and no crypto.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;

use crate::error::{Error, Result};

/// DER encoding of AlgorithmIdentifier { rsaEncryption (1.2.840.113549.1.1.1), NULL }
const RSA_ENCRYPTION_ALG_ID: [u8; 15] = [
    0x30, 0x0d, 0x06, 0x09, 0x2a, 0x86, 0x48, 0x86, 0xf7, 0x0d, 0x01, 0x01, 0x01, 0x05, 0x00,
];

/// Decode a base64url JWK field, tolerating both padded and unpadded input.
///
/// JWK values are unpadded per RFC 7518, but some providers emit padding
/// anyway. An empty field or one that decodes to nothing is rejected.
pub fn decode_field(value: &str) -> Result<Vec<u8>> {
    let trimmed = value.trim_end_matches('=');
    if trimmed.is_empty() {
        return Err(Error::KeyCodec("empty JWK field".into()));
    }

    let bytes = URL_SAFE_NO_PAD
        .decode(trimmed)
        .map_err(|e| Error::KeyCodec(format!("invalid base64url in JWK field: {e}")))?;

    if bytes.is_empty() {
        return Err(Error::KeyCodec("JWK field decoded to zero bytes".into()));
    }

    Ok(bytes)
}

/// Build a DER SubjectPublicKeyInfo from base64url modulus and exponent.
pub fn rsa_spki_from_components(modulus_b64: &str, exponent_b64: &str) -> Result<Vec<u8>> {
    let n = decode_field(modulus_b64)?;
    let e = decode_field(exponent_b64)?;

    let rsa_public_key = der_sequence(&[der_integer(&n), der_integer(&e)]);
    let spki = der_sequence(&[
        RSA_ENCRYPTION_ALG_ID.to_vec(),
        der_bit_string(&rsa_public_key),
    ]);

    Ok(spki)
}

/// Encode a big-endian unsigned integer as a DER INTEGER.
///
/// DER integers are two's complement: a value whose high bit is set needs
/// a leading zero byte, and a redundant sign-guard zero on the input is
/// stripped first so at most one leading zero remains.
fn der_integer(bytes: &[u8]) -> Vec<u8> {
    let mut value = bytes;
    if value.len() > 1 && value[0] == 0x00 {
        value = &value[1..];
    }

    let needs_guard = value[0] & 0x80 != 0;
    let content_len = value.len() + usize::from(needs_guard);

    let mut out = vec![0x02];
    out.extend_from_slice(&der_length(content_len));
    if needs_guard {
        out.push(0x00);
    }
    out.extend_from_slice(value);
    out
}

/// Concatenate pre-encoded elements into a DER SEQUENCE.
fn der_sequence(elements: &[Vec<u8>]) -> Vec<u8> {
    let content_len: usize = elements.iter().map(Vec::len).sum();
    let mut out = vec![0x30];
    out.extend_from_slice(&der_length(content_len));
    for element in elements {
        out.extend_from_slice(element);
    }
    out
}

/// Wrap content in a DER BIT STRING with zero unused bits.
fn der_bit_string(content: &[u8]) -> Vec<u8> {
    let mut out = vec![0x03];
    out.extend_from_slice(&der_length(content.len() + 1));
    out.push(0x00);
    out.extend_from_slice(content);
    out
}

/// Encode a DER length: short form below 128, long form above.
fn der_length(len: usize) -> Vec<u8> {
    if len < 128 {
        return vec![len as u8];
    }

    let be = len.to_be_bytes();
    let first = be.iter().position(|&b| b != 0).unwrap_or(be.len() - 1);
    let digits = &be[first..];

    let mut out = vec![0x80 | digits.len() as u8];
    out.extend_from_slice(digits);
    out
}
