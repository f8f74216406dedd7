//! Authorization flow controller
//!
//! Orchestrates one authorization attempt end to end: `begin()` mints
//! PKCE material and a redirect target, `complete()` consumes the
//! callback and drives code exchange → signature verification → claim
//! validation → session commit.
//!
//! Flow states, tracked through the session store:
//! `Idle → PendingAuthorization → (Verified | Unverified)`.
//!
//! Two contracts hold unconditionally:
//! - PKCE material is single-use. It is cleared from the session before
//!   any network call, so a concurrent callback replay fails the state
//!   check instead of racing to a second commit.
//! - No error escapes `complete()`. Every internal failure is logged
//!   with its kind, then collapsed to `false` and an `Unverified`
//!   commit.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::claims::{self, Claims};
use crate::compact;
use crate::config::ProviderConfig;
use crate::error::{Error, Result};
use crate::jwks;
use crate::pkce::{self, PkceMaterial};
use crate::session::{SessionStore, keys};
use crate::verify;

/// Hard bound on both outbound calls (key-set fetch, token exchange).
/// A timeout is an ordinary failure, not a fault.
const NETWORK_TIMEOUT: Duration = Duration::from_secs(10);

/// Query parameters delivered to the redirect URI by the provider.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

/// Terminal outcome of an authorization attempt. Never partially
/// populated: claims are only present behind `Verified`.
#[derive(Debug, Clone, PartialEq)]
pub enum VerificationResult {
    Verified(Claims),
    Unverified,
}

impl VerificationResult {
    pub fn is_verified(&self) -> bool {
        matches!(self, Self::Verified(_))
    }
}

/// Redirect instruction produced by `begin()`.
#[derive(Debug, Clone)]
pub struct RedirectTarget {
    pub url: String,
}

/// Token endpoint response. Extra fields (access_token, token_type, ...)
/// are tolerated and ignored; only the identity token matters here.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    id_token: Option<String>,
}

/// One user session's authorization flow against a single provider.
pub struct AuthFlow {
    config: Arc<ProviderConfig>,
    store: Arc<dyn SessionStore>,
    http: Client,
}

impl AuthFlow {
    /// Build a flow controller with its own HTTP client (10s timeout on
    /// every outbound call).
    pub fn new(config: Arc<ProviderConfig>, store: Arc<dyn SessionStore>) -> Result<Self> {
        let http = Client::builder()
            .timeout(NETWORK_TIMEOUT)
            .build()
            .map_err(|e| Error::Network(format!("building HTTP client: {e}")))?;
        Ok(Self::with_http_client(config, store, http))
    }

    /// Build a flow controller around an existing HTTP client. The
    /// caller owns the client's timeout policy.
    pub fn with_http_client(
        config: Arc<ProviderConfig>,
        store: Arc<dyn SessionStore>,
        http: Client,
    ) -> Self {
        Self {
            config,
            store,
            http,
        }
    }

    /// Start an authorization attempt: generate fresh PKCE material,
    /// persist it, and produce the redirect target.
    ///
    /// Transition: Idle → PendingAuthorization. Any material from an
    /// earlier abandoned attempt is overwritten.
    pub fn begin(&self) -> RedirectTarget {
        let material = pkce::generate();
        let challenge = pkce::compute_challenge(&material.code_verifier);

        self.store.set(keys::STATE, &material.state);
        self.store.set(keys::NONCE, &material.nonce);
        self.store.set(keys::VERIFIER, &material.code_verifier);

        let url = pkce::build_authorization_url(&self.config, &material, &challenge);
        info!(
            authorization_endpoint = %self.config.authorization_endpoint,
            "authorization flow started"
        );
        RedirectTarget { url }
    }

    /// Complete the attempt from callback parameters.
    ///
    /// Consumes the pending PKCE material exactly once, then walks the
    /// ordered short-circuit chain: provider error, state match, code
    /// exchange, signature verification, claim validation. The boolean
    /// return carries success only; failure detail goes to the log.
    pub async fn complete(&self, params: &CallbackParams) -> bool {
        let pending = self.take_pending();

        match self.run_callback(params, pending).await {
            Ok(claims) => {
                self.commit_verified(&claims);
                info!(subject = claims.subject().unwrap_or("<none>"), "identity verified");
                true
            }
            Err(err) => {
                warn!(error = %err, "authorization attempt rejected");
                self.commit_unverified();
                false
            }
        }
    }

    /// The committed outcome of the most recent attempt.
    ///
    /// Degrades to `Unverified` on any inconsistency in the stored
    /// result (missing or unparsable claim blob).
    pub fn current_result(&self) -> VerificationResult {
        if self.store.get(keys::VERIFIED).as_deref() != Some("true") {
            return VerificationResult::Unverified;
        }

        let claims = self
            .store
            .get(keys::CLAIMS)
            .and_then(|blob| serde_json::from_str(&blob).ok())
            .and_then(|value| Claims::from_value(value).ok());

        match claims {
            Some(claims) => VerificationResult::Verified(claims),
            None => {
                debug!("verified flag set but claim blob unusable; reporting Unverified");
                VerificationResult::Unverified
            }
        }
    }

    /// Clear verified state and claims unconditionally. Idempotent.
    pub fn reset(&self) {
        self.store.remove(keys::VERIFIED);
        self.store.remove(keys::CLAIMS);
    }

    /// Read and clear the pending PKCE material in one step. Clearing
    /// happens before any network I/O so the material can never be
    /// consumed twice.
    fn take_pending(&self) -> Option<PkceMaterial> {
        let state = self.store.get(keys::STATE);
        let nonce = self.store.get(keys::NONCE);
        let code_verifier = self.store.get(keys::VERIFIER);

        self.store.remove(keys::STATE);
        self.store.remove(keys::NONCE);
        self.store.remove(keys::VERIFIER);

        match (state, nonce, code_verifier) {
            (Some(state), Some(nonce), Some(code_verifier)) => Some(PkceMaterial {
                state,
                nonce,
                code_verifier,
            }),
            _ => None,
        }
    }

    async fn run_callback(
        &self,
        params: &CallbackParams,
        pending: Option<PkceMaterial>,
    ) -> Result<Claims> {
        if let Some(provider_error) = &params.error {
            return Err(Error::FlowState(format!(
                "provider returned error: {provider_error}"
            )));
        }

        let pending = pending
            .ok_or_else(|| Error::FlowState("callback with no pending authorization".into()))?;

        match params.state.as_deref() {
            Some(state) if state == pending.state => {}
            _ => return Err(Error::FlowState("callback state mismatch".into())),
        }

        let code = params
            .code
            .as_deref()
            .ok_or_else(|| Error::FlowState("callback missing authorization code".into()))?;

        let id_token = self.exchange_code(code, &pending.code_verifier).await?;

        let token = compact::decode(&id_token)?;
        let spki =
            jwks::resolve_key(&self.http, &self.config.jwks_uri, token.key_id()).await?;

        let algorithm = token.algorithm().unwrap_or("");
        if !verify::verify_signature(
            &spki,
            token.signed_input.as_bytes(),
            &token.signature,
            algorithm,
        ) {
            return Err(Error::SignatureInvalid);
        }

        claims::validate(&token.claims, &self.config, &pending.nonce)?;

        Ok(token.claims)
    }

    /// Exchange the authorization code for an identity token.
    async fn exchange_code(&self, code: &str, code_verifier: &str) -> Result<String> {
        let mut form: Vec<(&str, &str)> = vec![
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", &self.config.redirect_uri),
            ("client_id", &self.config.client_id),
            ("code_verifier", code_verifier),
        ];
        if let Some(secret) = self.config.client_secret_value() {
            form.push(("client_secret", secret));
        }

        let response = self
            .http
            .post(&self.config.token_endpoint)
            .form(&form)
            .send()
            .await
            .map_err(|e| Error::Network(format!("token exchange request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Network(format!(
                "token endpoint returned {status}"
            )));
        }

        let token_response = response
            .json::<TokenResponse>()
            .await
            .map_err(|e| Error::Network(format!("invalid token response: {e}")))?;

        token_response
            .id_token
            .ok_or_else(|| Error::TokenFormat("token response missing id_token".into()))
    }

    fn commit_verified(&self, claims: &Claims) {
        self.store.set(keys::CLAIMS, &claims.to_value().to_string());
        self.store.set(keys::VERIFIED, "true");
    }

    fn commit_unverified(&self) {
        self.store.remove(keys::CLAIMS);
        self.store.set(keys::VERIFIED, "false");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;
    use crate::session::MemorySessionStore;

    fn flow_with_store() -> (AuthFlow, Arc<MemorySessionStore>) {
        let store = Arc::new(MemorySessionStore::new());
        let flow = AuthFlow::new(Arc::new(test_config()), store.clone()).expect("flow");
        (flow, store)
    }

    #[test]
    fn begin_persists_material_and_builds_challenge_from_it() {
        let (flow, store) = flow_with_store();
        let redirect = flow.begin();

        let state = store.get(keys::STATE).expect("state persisted");
        let nonce = store.get(keys::NONCE).expect("nonce persisted");
        let verifier = store.get(keys::VERIFIER).expect("verifier persisted");

        let challenge = pkce::compute_challenge(&verifier);
        assert!(redirect.url.contains("code_challenge_method=S256"));
        assert!(
            redirect.url.contains(&format!("code_challenge={challenge}")),
            "challenge in URL must derive from the persisted verifier"
        );
        assert!(redirect.url.contains(&format!("state={state}")));
        assert!(redirect.url.contains(&format!("nonce={nonce}")));
        assert!(!challenge.contains('='), "challenge must be unpadded");
    }

    #[test]
    fn begin_overwrites_abandoned_material() {
        let (flow, store) = flow_with_store();
        flow.begin();
        let first_state = store.get(keys::STATE).unwrap();
        flow.begin();
        let second_state = store.get(keys::STATE).unwrap();
        assert_ne!(first_state, second_state);
    }

    #[tokio::test]
    async fn state_mismatch_fails_and_consumes_material() {
        let (flow, store) = flow_with_store();
        flow.begin();

        let params = CallbackParams {
            code: Some("some-code".into()),
            state: Some("not-the-persisted-state".into()),
            error: None,
        };
        assert!(!flow.complete(&params).await);

        assert_eq!(store.get(keys::STATE), None, "material must be cleared");
        assert_eq!(store.get(keys::NONCE), None);
        assert_eq!(store.get(keys::VERIFIER), None);
        assert_eq!(flow.current_result(), VerificationResult::Unverified);
    }

    #[tokio::test]
    async fn provider_error_parameter_fails_closed() {
        let (flow, store) = flow_with_store();
        flow.begin();
        let state = store.get(keys::STATE).unwrap();

        // Even with a matching state, an error parameter sinks the flow
        let params = CallbackParams {
            code: Some("some-code".into()),
            state: Some(state),
            error: Some("access_denied".into()),
        };
        assert!(!flow.complete(&params).await);
        assert_eq!(flow.current_result(), VerificationResult::Unverified);
    }

    #[tokio::test]
    async fn callback_without_pending_flow_fails() {
        let (flow, _store) = flow_with_store();
        let params = CallbackParams {
            code: Some("code".into()),
            state: Some("state".into()),
            error: None,
        };
        assert!(!flow.complete(&params).await);
    }

    #[tokio::test]
    async fn missing_code_fails_before_any_exchange() {
        let (flow, store) = flow_with_store();
        flow.begin();
        let state = store.get(keys::STATE).unwrap();

        let params = CallbackParams {
            code: None,
            state: Some(state),
            error: None,
        };
        assert!(!flow.complete(&params).await);
    }

    #[test]
    fn reset_is_idempotent_and_yields_unverified() {
        let (flow, store) = flow_with_store();
        store.set(keys::VERIFIED, "true");
        store.set(keys::CLAIMS, r#"{"sub":"user-1"}"#);

        flow.reset();
        assert_eq!(flow.current_result(), VerificationResult::Unverified);

        flow.reset();
        assert_eq!(flow.current_result(), VerificationResult::Unverified);
    }

    #[test]
    fn current_result_requires_parsable_claims() {
        let (flow, store) = flow_with_store();

        store.set(keys::VERIFIED, "true");
        assert_eq!(
            flow.current_result(),
            VerificationResult::Unverified,
            "verified flag without claims is not a verified session"
        );

        store.set(keys::CLAIMS, "not json at all");
        assert_eq!(flow.current_result(), VerificationResult::Unverified);

        store.set(keys::CLAIMS, r#"{"sub":"user-1","age_verified":true}"#);
        let result = flow.current_result();
        match result {
            VerificationResult::Verified(claims) => {
                assert_eq!(claims.subject(), Some("user-1"));
            }
            VerificationResult::Unverified => panic!("expected verified result"),
        }
    }

    #[test]
    fn verified_flag_false_is_unverified_even_with_claims() {
        let (flow, store) = flow_with_store();
        store.set(keys::VERIFIED, "false");
        store.set(keys::CLAIMS, r#"{"sub":"user-1"}"#);
        assert_eq!(flow.current_result(), VerificationResult::Unverified);
    }
}
