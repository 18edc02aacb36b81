// ── Runtime connection configuration ──
//
// These types describe how to reach SmartThings and how to poll. They carry
// credential data and tuning, but never touch disk. The CLI builds a
// `ControllerConfig` and hands it in.

use std::time::Duration;

use secrecy::SecretString;
use url::Url;

use crate::cache::{DEFAULT_POLL_INTERVAL, DEFAULT_SUPPRESSION_WINDOW};

/// How to authenticate against the SmartThings API.
#[derive(Debug, Clone)]
pub enum AuthCredentials {
    /// Personal access token; no refresh.
    AccessToken(SecretString),
    /// Tokens from the OAuth authorization-code flow.
    OAuth {
        client_id: String,
        client_secret: SecretString,
        access_token: SecretString,
        refresh_token: Option<SecretString>,
        /// Absolute expiry, epoch seconds.
        expires_at: Option<i64>,
    },
    /// Nothing configured yet. `Controller::connect` drops into the
    /// authentication-failure state.
    None,
}

/// Polling behaviour of the device-state cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    /// Base delay between polls of a subscribed device.
    pub poll_interval: Duration,
    /// How long an optimistic write shields the cache from poll results.
    pub suppression_window: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            suppression_window: DEFAULT_SUPPRESSION_WINDOW,
        }
    }
}

/// Configuration for one SmartThings account.
///
/// Built by the CLI, passed to `Controller` -- core never reads config files.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// REST base URL (default `https://api.smartthings.com/v1/`).
    pub api_url: Url,
    pub auth: AuthCredentials,
    /// Per-request HTTP timeout.
    pub timeout: Duration,
    pub cache: CacheConfig,
}

impl ControllerConfig {
    pub fn new(auth: AuthCredentials) -> Result<Self, url::ParseError> {
        Ok(Self {
            api_url: Url::parse(smartpoll_api::client::DEFAULT_API_URL)?,
            auth,
            timeout: Duration::from_secs(30),
            cache: CacheConfig::default(),
        })
    }
}
