//! CLI-side configuration: flag overrides layered over `smartpoll-config`.
//!
//! Core never sees these types -- it receives a pre-built `ControllerConfig`.

use std::time::Duration;

use secrecy::SecretString;

use smartpoll_config::Config;
use smartpoll_core::{AuthCredentials, ControllerConfig, normalize_poll_interval};

use crate::cli::GlobalOpts;
use crate::error::CliError;

pub use smartpoll_config::{config_path, load_config_or_default, save_config};

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    config.profile_name(global.profile.as_deref())
}

/// Build the `ControllerConfig` for the active profile with flag overrides.
///
/// Precedence per field: flag/env > profile > defaults. A `--token` alone is
/// enough when no profile exists.
pub fn build_controller_config(
    global: &GlobalOpts,
    cfg: &Config,
    profile_name: &str,
) -> Result<ControllerConfig, CliError> {
    let mut config = match cfg.profiles.get(profile_name) {
        Some(profile) => {
            smartpoll_config::profile_to_controller_config(profile, profile_name, &cfg.defaults)?
        }
        None if global.token.is_some() => {
            let mut config =
                ControllerConfig::new(AuthCredentials::None).map_err(|e| CliError::Validation {
                    field: "api_url".into(),
                    reason: e.to_string(),
                })?;
            config.timeout = Duration::from_secs(cfg.defaults.timeout);
            config.cache.poll_interval = normalize_poll_interval(Some(Duration::from_millis(
                cfg.defaults.poll_interval_ms,
            )));
            config.cache.suppression_window =
                Duration::from_millis(cfg.defaults.suppression_window_ms);
            config
        }
        None if global.profile.is_some() => {
            let mut available: Vec<_> = cfg.profiles.keys().cloned().collect();
            available.sort();
            return Err(CliError::ProfileNotFound {
                name: profile_name.into(),
                available: if available.is_empty() {
                    "(none)".into()
                } else {
                    available.join(", ")
                },
            });
        }
        None => {
            return Err(CliError::NoCredentials {
                profile: profile_name.into(),
            });
        }
    };

    if let Some(ref token) = global.token {
        config.auth = AuthCredentials::AccessToken(SecretString::from(token.clone()));
    }
    if let Some(secs) = global.timeout {
        config.timeout = Duration::from_secs(secs);
    }
    if let Some(ms) = global.poll_interval {
        config.cache.poll_interval = normalize_poll_interval(Some(Duration::from_millis(ms)));
    }

    if matches!(config.auth, AuthCredentials::None) {
        return Err(CliError::NoCredentials {
            profile: profile_name.into(),
        });
    }
    Ok(config)
}
