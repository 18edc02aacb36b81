//! OAuth helpers: build the authorize URL and exchange the returned code.

use chrono::DateTime;
use serde_json::json;

use smartpoll_api::oauth::authorize_url;
use smartpoll_api::{OAuthClient, TransportConfig};
use smartpoll_config::{Config, Profile};
use smartpoll_core::CoreError;

use crate::cli::{AuthArgs, AuthCommand, GlobalOpts, OutputFormat};
use crate::config;
use crate::error::CliError;
use crate::output;

fn client_id<'a>(profile: &'a Profile, profile_name: &str) -> Result<&'a str, CliError> {
    profile
        .client_id
        .as_deref()
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| CliError::Validation {
            field: "client_id".into(),
            reason: format!("profile '{profile_name}' has no OAuth client_id"),
        })
}

fn profile<'a>(cfg: &'a Config, name: &str) -> Result<&'a Profile, CliError> {
    cfg.profiles.get(name).ok_or_else(|| {
        let mut available: Vec<_> = cfg.profiles.keys().cloned().collect();
        available.sort();
        CliError::ProfileNotFound {
            name: name.into(),
            available: if available.is_empty() {
                "(none)".into()
            } else {
                available.join(", ")
            },
        }
    })
}

pub async fn handle(args: AuthArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let mut cfg = config::load_config_or_default();
    let profile_name = config::active_profile_name(global, &cfg);

    match args.command {
        AuthCommand::Url { state } => {
            let p = profile(&cfg, &profile_name)?;
            let url = authorize_url(client_id(p, &profile_name)?, &p.scopes, &state)
                .map_err(CoreError::from)?;
            let out = match global.output {
                OutputFormat::Json => serde_json::to_string_pretty(&json!({ "url": url }))?,
                OutputFormat::JsonCompact => serde_json::to_string(&json!({ "url": url }))?,
                OutputFormat::Table | OutputFormat::Plain => url.to_string(),
            };
            output::print_output(&out, global.quiet);
            Ok(())
        }

        AuthCommand::Exchange { code } => {
            let p = profile(&cfg, &profile_name)?;
            let client_id = client_id(p, &profile_name)?.to_owned();
            let secret = smartpoll_config::resolve_client_secret(p, &profile_name)?;
            let transport = TransportConfig {
                timeout: std::time::Duration::from_secs(
                    global.timeout.or(p.timeout).unwrap_or(cfg.defaults.timeout),
                ),
            };

            let oauth = OAuthClient::new(client_id, secret, &transport).map_err(CoreError::from)?;
            let tokens = oauth
                .exchange_code(code.trim())
                .await
                .map_err(CoreError::from)?;

            smartpoll_config::save_tokens(&mut cfg, &profile_name, &tokens)?;

            let expires = tokens
                .expires_at
                .and_then(|at| DateTime::from_timestamp(at, 0))
                .map_or_else(|| "unknown".into(), |at| at.to_rfc3339());
            output::print_output(
                &format!("Tokens saved to profile '{profile_name}' (expires {expires})"),
                global.quiet,
            );
            Ok(())
        }
    }
}
