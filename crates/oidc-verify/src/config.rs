//! Provider configuration
//!
//! Immutable description of the remote identity provider, loaded once by
//! the calling application and only read by the core. The client secret
//! is wrapped in `common::Secret` so it never leaks into Debug output;
//! secret resolution (env var, file) is the caller's concern.

use common::Secret;

/// Default tolerance for clock drift between this host and the provider.
pub const DEFAULT_CLOCK_SKEW_SECS: u64 = 300;

/// Static configuration for one OpenID Connect provider.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Expected `iss` claim value, compared with exact string equality
    pub issuer: String,
    /// Authorization endpoint the user is redirected to
    pub authorization_endpoint: String,
    /// Token endpoint for the authorization-code exchange
    pub token_endpoint: String,
    /// Key-set document endpoint (`{"keys": [...]}`)
    pub jwks_uri: String,
    /// OAuth client identifier; also the expected `aud` claim value
    pub client_id: String,
    /// Optional client secret, sent on token exchange when non-empty
    pub client_secret: Option<Secret<String>>,
    /// Redirect URI registered with the provider
    pub redirect_uri: String,
    /// Space-separated scope string for the authorization request
    pub scopes: String,
    /// Allowed clock skew in seconds for `exp`/`iat` checks
    pub clock_skew_secs: u64,
}

impl ProviderConfig {
    /// Client secret as a plain string, or None when absent or empty.
    ///
    /// An empty configured secret is treated the same as no secret: the
    /// token-exchange request omits the `client_secret` field entirely.
    pub fn client_secret_value(&self) -> Option<&str> {
        self.client_secret
            .as_ref()
            .map(|s| s.expose().as_str())
            .filter(|s| !s.is_empty())
    }
}

#[cfg(test)]
pub(crate) fn test_config() -> ProviderConfig {
    ProviderConfig {
        issuer: "https://idp.example.com".into(),
        authorization_endpoint: "https://idp.example.com/authorize".into(),
        token_endpoint: "https://idp.example.com/token".into(),
        jwks_uri: "https://idp.example.com/jwks".into(),
        client_id: "abc".into(),
        client_secret: None,
        redirect_uri: "https://app.example.com/auth/callback".into(),
        scopes: "openid".into(),
        clock_skew_secs: DEFAULT_CLOCK_SKEW_SECS,
    }
}
