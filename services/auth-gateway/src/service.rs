//! HTTP dispatch for the four flow operations
//!
//! Thin glue only: each handler resolves the caller's session from the
//! `sid` cookie, builds an `AuthFlow` over it, and calls exactly one
//! core operation. No verification logic lives here.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Json, Response};
use metrics_exporter_prometheus::PrometheusHandle;
use oidc_verify::{
    AuthFlow, CallbackParams, MemorySessionStore, ProviderConfig, SessionStore,
    VerificationResult,
};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::metrics;

const SESSION_COOKIE: &str = "sid";

/// Shared application state accessible from all handlers
#[derive(Clone)]
pub struct AppState {
    pub provider: Arc<ProviderConfig>,
    pub http: reqwest::Client,
    pub sessions: Arc<SessionMap>,
    pub post_login_redirect: String,
    pub prometheus: PrometheusHandle,
}

/// In-process map from session id to that session's key-value store.
///
/// Persistent session backends plug in at the `SessionStore` seam in
/// the core; this map only gives each browser its own store.
#[derive(Default)]
pub struct SessionMap {
    inner: Mutex<HashMap<String, Arc<MemorySessionStore>>>,
}

impl SessionMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// The store for a session id, created on first use.
    pub fn store(&self, session_id: &str) -> Arc<dyn SessionStore> {
        self.inner
            .lock()
            .expect("session map lock")
            .entry(session_id.to_string())
            .or_default()
            .clone()
    }
}

/// The session id carried by the request's cookie, if any.
fn existing_session_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|cookies| cookie_value(cookies, SESSION_COOKIE))
}

/// The caller's session id, minting a fresh one when no cookie came in.
/// Returns the id and whether it needs to be set on the response.
fn session_id(headers: &HeaderMap) -> (String, bool) {
    match existing_session_id(headers) {
        Some(id) => (id, false),
        None => (Uuid::new_v4().to_string(), true),
    }
}

fn cookie_value(cookie_header: &str, name: &str) -> Option<String> {
    cookie_header.split(';').find_map(|pair| {
        let (key, value) = pair.split_once('=')?;
        (key.trim() == name).then(|| value.trim().to_string())
    })
}

fn set_cookie_header(session_id: &str) -> String {
    format!("{SESSION_COOKIE}={session_id}; Path=/; HttpOnly; SameSite=Lax")
}

fn flow_for(state: &AppState, session_id: &str) -> AuthFlow {
    AuthFlow::with_http_client(
        state.provider.clone(),
        state.sessions.store(session_id),
        state.http.clone(),
    )
}

fn redirect_response(location: &str, cookie: Option<&str>) -> Response {
    let mut response = (
        StatusCode::FOUND,
        [(header::LOCATION, location.to_string())],
    )
        .into_response();
    if let Some(cookie) = cookie {
        if let Ok(value) = cookie.parse() {
            response.headers_mut().insert(header::SET_COOKIE, value);
        }
    }
    response
}

/// GET /auth/login: start a flow and redirect to the provider.
pub async fn login_handler(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let (sid, fresh) = session_id(&headers);
    let flow = flow_for(&state, &sid);

    let redirect = flow.begin();
    metrics::record_flow_started();

    redirect_response(&redirect.url, fresh.then(|| set_cookie_header(&sid)).as_deref())
}

/// GET /auth/callback: complete the flow, then send the browser home.
pub async fn callback_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<CallbackParams>,
) -> Response {
    let (sid, fresh) = session_id(&headers);
    let flow = flow_for(&state, &sid);

    let verified = flow.complete(&params).await;
    metrics::record_flow_outcome(verified);
    info!(verified, "authorization callback handled");

    redirect_response(
        &state.post_login_redirect,
        fresh.then(|| set_cookie_header(&sid)).as_deref(),
    )
}

/// GET /auth/status: the committed outcome for this session.
///
/// A caller without a session cookie has no flow to report; answer
/// Unverified without minting a session.
pub async fn status_handler(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let result = match existing_session_id(&headers) {
        Some(sid) => flow_for(&state, &sid).current_result(),
        None => VerificationResult::Unverified,
    };

    let body = match result {
        VerificationResult::Verified(claims) => json!({
            "verified": true,
            "claims": claims.to_value(),
        }),
        VerificationResult::Unverified => json!({
            "verified": false,
            "claims": null,
        }),
    };
    Json(body).into_response()
}

/// POST /auth/reset: drop verified state for this session. A no-op for
/// callers without a session cookie.
pub async fn reset_handler(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Some(sid) = existing_session_id(&headers) {
        flow_for(&state, &sid).reset();
    }
    StatusCode::NO_CONTENT.into_response()
}

/// GET /health
pub async fn health_handler() -> Json<serde_json::Value> {
    Json(json!({"status": "ok"}))
}

/// GET /metrics: Prometheus text exposition.
pub async fn metrics_handler(State(state): State<AppState>) -> String {
    state.prometheus.render()
}
