//! Session store abstraction
//!
//! The flow controller never touches ambient global state: the durable
//! per-user store is injected as a capability with plain get/set/remove
//! by opaque key. Production wires in whatever session backend the
//! application has; tests and the bundled gateway use the in-memory
//! implementation.

use std::collections::HashMap;
use std::sync::Mutex;

/// Keys the flow controller persists under. Callers should treat these
/// as reserved names within the session namespace.
pub mod keys {
    /// CSRF state pending the redirect round-trip
    pub const STATE: &str = "auth.state";
    /// Nonce expected in the identity token
    pub const NONCE: &str = "auth.nonce";
    /// PKCE code verifier for the token exchange
    pub const VERIFIER: &str = "auth.verifier";
    /// "true" once a flow completed with a fully verified claim set
    pub const VERIFIED: &str = "auth.verified";
    /// JSON claim blob of the verified identity
    pub const CLAIMS: &str = "auth.claims";
}

/// Durable per-session key-value store, provided by the application.
pub trait SessionStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
}

/// In-memory session store for tests and single-process deployments.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.lock().expect("session map lock").get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.values
            .lock()
            .expect("session map lock")
            .insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        self.values.lock().expect("session map lock").remove(key);
    }
}
