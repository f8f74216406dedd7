//! Typed claim set and claim validation
//!
//! Claims are an open JSON object: the required OIDC claims get named
//! accessors, everything else (provider-specific flags such as an
//! age-verification attribute) passes through opaquely via `get`.
//!
//! Validation policy: a missing required claim is a failing value, not
//! an error; every check degrades to "absent means reject". All checks
//! must pass; the first failure names the claim that sank it so the
//! controller can log something more useful than `false`.

use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::{Map, Value};

use crate::config::ProviderConfig;
use crate::error::{Error, Result};

/// Validated-or-not claim set from an identity token payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Claims(Map<String, Value>);

impl Claims {
    /// Wrap a decoded payload. Anything but a JSON object is malformed.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(Error::TokenFormat(format!(
                "claims payload must be a JSON object, got {other}"
            ))),
        }
    }

    /// Look up any claim by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn issuer(&self) -> Option<&str> {
        self.get("iss").and_then(Value::as_str)
    }

    pub fn subject(&self) -> Option<&str> {
        self.get("sub").and_then(Value::as_str)
    }

    pub fn nonce(&self) -> Option<&str> {
        self.get("nonce").and_then(Value::as_str)
    }

    pub fn expires_at(&self) -> Option<i64> {
        self.get("exp").and_then(claim_as_i64)
    }

    pub fn issued_at(&self) -> Option<i64> {
        self.get("iat").and_then(claim_as_i64)
    }

    /// Whether `aud` names the given client id. The claim may be a single
    /// string or an array of strings; either form matches.
    pub fn audience_contains(&self, client_id: &str) -> bool {
        match self.get("aud") {
            Some(Value::String(aud)) => aud == client_id,
            Some(Value::Array(auds)) => auds.iter().any(|v| v.as_str() == Some(client_id)),
            _ => false,
        }
    }

    /// The claim set as a JSON value, for storage in the session blob.
    pub fn to_value(&self) -> Value {
        Value::Object(self.0.clone())
    }
}

/// Validate a claim set against the provider identity, timing window,
/// and the nonce persisted for this flow. Current time is taken from the
/// system clock; see [`validate_at`] for the clock-injected form.
pub fn validate(claims: &Claims, config: &ProviderConfig, expected_nonce: &str) -> Result<()> {
    validate_at(claims, config, expected_nonce, unix_now())
}

/// Validate a claim set at an explicit current time `now` (unix seconds).
///
/// Both timing checks are inclusive at the skew boundary: a token with
/// `exp == now - skew` is still accepted, `exp == now - skew - 1` is not.
pub fn validate_at(
    claims: &Claims,
    config: &ProviderConfig,
    expected_nonce: &str,
    now: i64,
) -> Result<()> {
    if claims.issuer() != Some(config.issuer.as_str()) {
        return Err(Error::ClaimInvalid("iss"));
    }

    if !claims.audience_contains(&config.client_id) {
        return Err(Error::ClaimInvalid("aud"));
    }

    let skew = config.clock_skew_secs as i64;

    match claims.expires_at() {
        Some(exp) if exp >= now - skew => {}
        _ => return Err(Error::ClaimInvalid("exp")),
    }

    // iat is optional; when present it must not lie beyond the skew
    // window in the future.
    if let Some(iat_value) = claims.get("iat") {
        match claim_as_i64(iat_value) {
            Some(iat) if iat <= now + skew => {}
            _ => return Err(Error::ClaimInvalid("iat")),
        }
    }

    if claims.nonce() != Some(expected_nonce) {
        return Err(Error::ClaimInvalid("nonce"));
    }

    Ok(())
}

fn claim_as_i64(value: &Value) -> Option<i64> {
    value.as_i64().or_else(|| value.as_u64().map(|v| v as i64))
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;
    use serde_json::json;

    const NOW: i64 = 1_700_000_000;

    fn claims_with(overrides: Value) -> Claims {
        let mut base = json!({
            "iss": "https://idp.example.com",
            "aud": "abc",
            "exp": NOW + 600,
            "iat": NOW,
            "nonce": "expected-nonce",
            "sub": "user-1",
        });
        if let (Some(base_map), Value::Object(extra)) = (base.as_object_mut(), overrides) {
            for (k, v) in extra {
                if v.is_null() {
                    base_map.remove(&k);
                } else {
                    base_map.insert(k, v);
                }
            }
        }
        Claims::from_value(base).unwrap()
    }

    fn check(claims: &Claims) -> Result<()> {
        validate_at(claims, &test_config(), "expected-nonce", NOW)
    }

    #[test]
    fn accepts_fully_valid_claims() {
        check(&claims_with(json!({}))).expect("valid claim set");
    }

    #[test]
    fn rejects_wrong_or_missing_issuer() {
        let err = check(&claims_with(json!({"iss": "https://evil.example.com"}))).unwrap_err();
        assert!(matches!(err, Error::ClaimInvalid("iss")));

        let err = check(&claims_with(json!({"iss": null}))).unwrap_err();
        assert!(matches!(err, Error::ClaimInvalid("iss")));
    }

    #[test]
    fn issuer_comparison_is_exact() {
        // No trailing-slash normalization
        let err = check(&claims_with(json!({"iss": "https://idp.example.com/"}))).unwrap_err();
        assert!(matches!(err, Error::ClaimInvalid("iss")));
    }

    #[test]
    fn audience_accepts_string_or_array_form() {
        check(&claims_with(json!({"aud": "abc"}))).expect("string aud");
        check(&claims_with(json!({"aud": ["other", "abc"]}))).expect("array aud");
    }

    #[test]
    fn rejects_audience_without_client_id() {
        for aud in [json!("xyz"), json!(["xyz", "def"]), json!(null), json!(42)] {
            let err = check(&claims_with(json!({"aud": aud}))).unwrap_err();
            assert!(matches!(err, Error::ClaimInvalid("aud")));
        }
    }

    #[test]
    fn expiry_boundary_is_inclusive() {
        let skew = test_config().clock_skew_secs as i64;

        // exp == now - skew still passes
        check(&claims_with(json!({"exp": NOW - skew}))).expect("boundary passes");

        // one second past the window fails
        let err = check(&claims_with(json!({"exp": NOW - skew - 1}))).unwrap_err();
        assert!(matches!(err, Error::ClaimInvalid("exp")));
    }

    #[test]
    fn missing_expiry_fails() {
        let err = check(&claims_with(json!({"exp": null}))).unwrap_err();
        assert!(matches!(err, Error::ClaimInvalid("exp")));
    }

    #[test]
    fn issued_at_boundary_is_inclusive() {
        let skew = test_config().clock_skew_secs as i64;

        check(&claims_with(json!({"iat": NOW + skew}))).expect("boundary passes");

        let err = check(&claims_with(json!({"iat": NOW + skew + 1}))).unwrap_err();
        assert!(matches!(err, Error::ClaimInvalid("iat")));
    }

    #[test]
    fn missing_issued_at_is_allowed() {
        check(&claims_with(json!({"iat": null}))).expect("iat is optional");
    }

    #[test]
    fn non_numeric_issued_at_fails() {
        let err = check(&claims_with(json!({"iat": "yesterday"}))).unwrap_err();
        assert!(matches!(err, Error::ClaimInvalid("iat")));
    }

    #[test]
    fn nonce_mismatch_fails_even_when_all_else_is_valid() {
        let err = check(&claims_with(json!({"nonce": "different"}))).unwrap_err();
        assert!(matches!(err, Error::ClaimInvalid("nonce")));

        let err = check(&claims_with(json!({"nonce": null}))).unwrap_err();
        assert!(matches!(err, Error::ClaimInvalid("nonce")));
    }

    #[test]
    fn extension_claims_pass_through_opaquely() {
        let claims = claims_with(json!({"age_verified": true}));
        assert_eq!(claims.get("age_verified"), Some(&json!(true)));
        check(&claims).expect("extension claims do not affect validation");
    }

    #[test]
    fn non_object_payload_is_rejected() {
        assert!(Claims::from_value(json!("just a string")).is_err());
        assert!(Claims::from_value(json!([1, 2])).is_err());
    }
}
