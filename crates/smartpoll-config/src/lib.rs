//! Shared configuration for smartpoll.
//!
//! TOML profiles, client-secret resolution (env + keyring + plaintext),
//! token persistence, and translation to `smartpoll_core::ControllerConfig`.
//! The core never reads files; the CLI layers its flag overrides on top.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use smartpoll_api::TokenSet;
use smartpoll_core::{AuthCredentials, CacheConfig, ControllerConfig, normalize_poll_interval};

const KEYRING_SERVICE: &str = "smartpoll";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no client secret configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Profile used when none is given on the command line.
    pub default_profile: Option<String>,

    #[serde(default)]
    pub defaults: Defaults,

    /// Named SmartThings accounts.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

impl Config {
    /// Resolve `requested`, then `default_profile`, then `"default"`.
    pub fn profile_name(&self, requested: Option<&str>) -> String {
        requested
            .or(self.default_profile.as_deref())
            .unwrap_or("default")
            .to_owned()
    }

    pub fn profile(&self, name: &str) -> Result<&Profile, ConfigError> {
        self.profiles.get(name).ok_or_else(|| ConfigError::Validation {
            field: "profile".into(),
            reason: format!("no profile named '{name}'"),
        })
    }

    /// Write `tokens` into profile `name`, creating the profile if needed.
    pub fn store_tokens(&mut self, name: &str, tokens: &TokenSet) {
        let profile = self.profiles.entry(name.to_owned()).or_default();
        profile.access_token = Some(tokens.access_token.expose_secret().to_owned());
        if let Some(refresh) = &tokens.refresh_token {
            profile.refresh_token = Some(refresh.expose_secret().to_owned());
        }
        profile.token_expiry = tokens.expires_at;
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    /// Per-request HTTP timeout, seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// How long an optimistic write wins over poll results.
    #[serde(default = "default_suppression_window_ms")]
    pub suppression_window_ms: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            timeout: default_timeout(),
            poll_interval_ms: default_poll_interval_ms(),
            suppression_window_ms: default_suppression_window_ms(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_timeout() -> u64 {
    30
}
fn default_poll_interval_ms() -> u64 {
    10_000
}
fn default_suppression_window_ms() -> u64 {
    10_000
}

/// A named SmartThings account.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Profile {
    /// OAuth app client id. Absent for personal access tokens.
    pub client_id: Option<String>,

    /// Client secret (plaintext -- prefer keyring or env var).
    pub client_secret: Option<String>,

    /// Environment variable name containing the client secret.
    pub client_secret_env: Option<String>,

    #[serde(default = "default_scopes")]
    pub scopes: String,

    pub access_token: Option<String>,

    pub refresh_token: Option<String>,

    /// Access token expiry, epoch seconds.
    pub token_expiry: Option<i64>,

    /// Override the REST base URL.
    pub api_url: Option<String>,

    pub poll_interval_ms: Option<u64>,

    pub timeout: Option<u64>,
}

fn default_scopes() -> String {
    "r:devices:* x:devices:*".into()
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "smartpoll", "smartpoll").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("smartpoll");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Defaults, then the TOML file at `path`, then `SMARTPOLL_*` variables
/// (`__` separates nesting levels).
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("SMARTPOLL_").split("__"));

    Ok(figment.extract()?)
}

/// Load config, returning a default if the file doesn't exist.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

/// Persist a refreshed or newly exchanged token set into profile `name`.
pub fn save_tokens(cfg: &mut Config, name: &str, tokens: &TokenSet) -> Result<(), ConfigError> {
    cfg.store_tokens(name, tokens);
    save_config(cfg)
}

// ── Credential resolution ───────────────────────────────────────────

/// Resolve the OAuth client secret: env var named by the profile, then the
/// system keyring, then plaintext.
pub fn resolve_client_secret(
    profile: &Profile,
    profile_name: &str,
) -> Result<SecretString, ConfigError> {
    if let Some(ref env_name) = profile.client_secret_env {
        if let Ok(val) = std::env::var(env_name) {
            return Ok(SecretString::from(val));
        }
    }

    let user = format!("{profile_name}/client-secret");
    if let Ok(entry) = keyring::Entry::new(KEYRING_SERVICE, &user) {
        if let Ok(secret) = entry.get_password() {
            return Ok(SecretString::from(secret));
        }
    }

    if let Some(ref secret) = profile.client_secret {
        return Ok(SecretString::from(secret.clone()));
    }

    Err(ConfigError::NoCredentials {
        profile: profile_name.into(),
    })
}

/// Store the client secret in the system keyring.
pub fn store_client_secret(profile_name: &str, secret: &str) -> Result<(), ConfigError> {
    keyring::Entry::new(KEYRING_SERVICE, &format!("{profile_name}/client-secret"))
        .and_then(|entry| entry.set_password(secret))
        .map_err(|e| ConfigError::Validation {
            field: "keyring".into(),
            reason: e.to_string(),
        })
}

/// Credentials for `profile`.
///
/// No access token yet means [`AuthCredentials::None`]; an access token
/// without a client id is a personal access token.
pub fn resolve_auth(profile: &Profile, profile_name: &str) -> Result<AuthCredentials, ConfigError> {
    let Some(access_token) = non_empty(profile.access_token.as_deref()) else {
        return Ok(AuthCredentials::None);
    };
    let access_token = SecretString::from(access_token.to_owned());

    let Some(client_id) = non_empty(profile.client_id.as_deref()) else {
        return Ok(AuthCredentials::AccessToken(access_token));
    };

    Ok(AuthCredentials::OAuth {
        client_id: client_id.to_owned(),
        client_secret: resolve_client_secret(profile, profile_name)?,
        access_token,
        refresh_token: non_empty(profile.refresh_token.as_deref())
            .map(|t| SecretString::from(t.to_owned())),
        expires_at: profile.token_expiry,
    })
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Build a `ControllerConfig` from a profile and the global defaults.
pub fn profile_to_controller_config(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
) -> Result<ControllerConfig, ConfigError> {
    let auth = resolve_auth(profile, profile_name)?;
    let mut config = ControllerConfig::new(auth).map_err(|e| ConfigError::Validation {
        field: "api_url".into(),
        reason: e.to_string(),
    })?;

    if let Some(ref raw) = profile.api_url {
        config.api_url = url::Url::parse(raw).map_err(|_| ConfigError::Validation {
            field: "api_url".into(),
            reason: format!("invalid URL: {raw}"),
        })?;
    }

    config.timeout = Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout));
    config.cache = CacheConfig {
        poll_interval: normalize_poll_interval(Some(Duration::from_millis(
            profile.poll_interval_ms.unwrap_or(defaults.poll_interval_ms),
        ))),
        suppression_window: Duration::from_millis(defaults.suppression_window_ms),
    };

    Ok(config)
}
