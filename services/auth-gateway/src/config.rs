//! Configuration types and loading
//!
//! Config precedence: CLI args > env vars > config file > defaults.
//! The client secret is loaded from the OIDC_CLIENT_SECRET env var or
//! client_secret_file, never stored in the TOML directly to avoid
//! leaking secrets.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use common::Secret;
use oidc_verify::ProviderConfig;
use serde::Deserialize;

/// Root configuration
#[derive(Debug, Deserialize)]
pub struct Config {
    pub provider: ProviderSection,
    pub gateway: GatewaySection,
}

/// Identity provider settings
#[derive(Debug, Deserialize)]
pub struct ProviderSection {
    pub issuer: String,
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    pub jwks_uri: String,
    pub client_id: String,
    #[serde(skip)]
    pub client_secret: Option<Secret<String>>,
    /// Path to a file containing the client secret (alternative to the
    /// OIDC_CLIENT_SECRET env var)
    #[serde(default)]
    pub client_secret_file: Option<PathBuf>,
    pub redirect_uri: String,
    #[serde(default = "default_scopes")]
    pub scopes: String,
    #[serde(default = "default_clock_skew")]
    pub clock_skew_secs: u64,
}

/// HTTP gateway settings
#[derive(Debug, Deserialize)]
pub struct GatewaySection {
    pub listen_addr: SocketAddr,
    /// Where to send the browser after the callback completes
    #[serde(default = "default_post_login_redirect")]
    pub post_login_redirect: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
}

fn default_scopes() -> String {
    "openid".into()
}

fn default_clock_skew() -> u64 {
    oidc_verify::config::DEFAULT_CLOCK_SKEW_SECS
}

fn default_post_login_redirect() -> String {
    "/".into()
}

fn default_max_connections() -> usize {
    1000
}

impl Config {
    /// Load configuration from a TOML file, then overlay environment variables.
    ///
    /// Client secret resolution order:
    /// 1. OIDC_CLIENT_SECRET env var
    /// 2. client_secret_file path from config
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&contents)?;

        for (name, value) in [
            ("issuer", &config.provider.issuer),
            ("authorization_endpoint", &config.provider.authorization_endpoint),
            ("token_endpoint", &config.provider.token_endpoint),
            ("jwks_uri", &config.provider.jwks_uri),
            ("redirect_uri", &config.provider.redirect_uri),
        ] {
            if !value.starts_with("http://") && !value.starts_with("https://") {
                return Err(common::Error::Config(format!(
                    "{name} must start with http:// or https://, got: {value}"
                )));
            }
        }

        if config.provider.client_id.trim().is_empty() {
            return Err(common::Error::Config("client_id must not be empty".into()));
        }

        if config.gateway.max_connections == 0 {
            return Err(common::Error::Config(
                "max_connections must be greater than 0".into(),
            ));
        }

        // Resolve client secret: env var takes precedence over file
        if let Ok(secret) = std::env::var("OIDC_CLIENT_SECRET") {
            config.provider.client_secret = Some(Secret::new(secret));
        } else if let Some(ref secret_file) = config.provider.client_secret_file {
            let secret = std::fs::read_to_string(secret_file).map_err(|e| {
                common::Error::Config(format!(
                    "failed to read client_secret_file {}: {e}",
                    secret_file.display()
                ))
            })?;
            let secret = secret.trim().to_owned();
            if !secret.is_empty() {
                config.provider.client_secret = Some(Secret::new(secret));
            }
        }

        Ok(config)
    }

    /// Resolve config file path from CLI arg or CONFIG_PATH env var.
    pub fn resolve_path(cli_path: Option<&str>) -> PathBuf {
        if let Some(p) = cli_path {
            return PathBuf::from(p);
        }
        if let Ok(p) = std::env::var("CONFIG_PATH") {
            return PathBuf::from(p);
        }
        PathBuf::from("auth-gateway.toml")
    }

    /// The core library's read-only provider view of this config.
    pub fn provider_config(&self) -> Arc<ProviderConfig> {
        Arc::new(ProviderConfig {
            issuer: self.provider.issuer.clone(),
            authorization_endpoint: self.provider.authorization_endpoint.clone(),
            token_endpoint: self.provider.token_endpoint.clone(),
            jwks_uri: self.provider.jwks_uri.clone(),
            client_id: self.provider.client_id.clone(),
            client_secret: self.provider.client_secret.clone(),
            redirect_uri: self.provider.redirect_uri.clone(),
            scopes: self.provider.scopes.clone(),
            clock_skew_secs: self.provider.clock_skew_secs,
        })
    }
}
