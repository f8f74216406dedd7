//! RSA PKCS#1 v1.5 signature verification
//!
//! Maps the token header's declared algorithm to a digest and verifies
//! the signature over the exact signed input. The public surface is a
//! plain boolean: every failure mode (unparsable key, unknown
//! algorithm, wrong signature length, digest mismatch) collapses to
//! `false` and never to a panic or an accidental `true`.
//!
//! An unrecognized algorithm identifier fails closed. Accepting an
//! attacker-chosen algorithm under a silent default would weaken the
//! binding between token and key.

use rsa::pkcs8::DecodePublicKey;
use rsa::{Pkcs1v15Sign, RsaPublicKey};
use sha2::{Digest, Sha256, Sha384, Sha512};

use crate::error::{Error, Result};

/// Supported signature algorithms, as declared in the token header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureAlg {
    Rs256,
    Rs384,
    Rs512,
}

impl SignatureAlg {
    /// Parse a header `alg` value. Unknown identifiers are rejected.
    pub fn from_header(alg: &str) -> Option<Self> {
        match alg {
            "RS256" => Some(Self::Rs256),
            "RS384" => Some(Self::Rs384),
            "RS512" => Some(Self::Rs512),
            _ => None,
        }
    }
}

/// Verify `signature` over `signed_input` with a DER SubjectPublicKeyInfo
/// key and the header-declared algorithm. Returns `true` only on a full
/// cryptographic match.
pub fn verify_signature(
    spki_der: &[u8],
    signed_input: &[u8],
    signature: &[u8],
    algorithm: &str,
) -> bool {
    match try_verify(spki_der, signed_input, signature, algorithm) {
        Ok(()) => true,
        Err(err) => {
            tracing::debug!(error = %err, "signature verification failed");
            false
        }
    }
}

fn try_verify(
    spki_der: &[u8],
    signed_input: &[u8],
    signature: &[u8],
    algorithm: &str,
) -> Result<()> {
    let alg = SignatureAlg::from_header(algorithm).ok_or(Error::SignatureInvalid)?;

    let key = RsaPublicKey::from_public_key_der(spki_der)
        .map_err(|e| Error::KeyCodec(format!("unusable verification key: {e}")))?;

    let outcome = match alg {
        SignatureAlg::Rs256 => key.verify(
            Pkcs1v15Sign::new::<Sha256>(),
            &Sha256::digest(signed_input),
            signature,
        ),
        SignatureAlg::Rs384 => key.verify(
            Pkcs1v15Sign::new::<Sha384>(),
            &Sha384::digest(signed_input),
            signature,
        ),
        SignatureAlg::Rs512 => key.verify(
            Pkcs1v15Sign::new::<Sha512>(),
            &Sha512::digest(signed_input),
            signature,
        ),
    };

    outcome.map_err(|_| Error::SignatureInvalid)
}
