//! Config subcommand handlers.

use smartpoll_config::Config;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts, OutputFormat};
use crate::config;
use crate::error::CliError;
use crate::output;

/// Format config for display, masking sensitive fields.
fn format_config_redacted(cfg: &Config) -> String {
    use std::fmt::Write;
    let mut out = String::new();

    if let Some(ref default) = cfg.default_profile {
        let _ = writeln!(out, "default_profile = \"{default}\"");
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "[defaults]");
    let _ = writeln!(out, "output = \"{}\"", cfg.defaults.output);
    let _ = writeln!(out, "color = \"{}\"", cfg.defaults.color);
    let _ = writeln!(out, "timeout = {}", cfg.defaults.timeout);
    let _ = writeln!(out, "poll_interval_ms = {}", cfg.defaults.poll_interval_ms);
    let _ = writeln!(
        out,
        "suppression_window_ms = {}",
        cfg.defaults.suppression_window_ms
    );

    let mut names: Vec<_> = cfg.profiles.keys().collect();
    names.sort();
    for name in names {
        let Some(p) = cfg.profiles.get(name) else {
            continue;
        };
        let _ = writeln!(out);
        let _ = writeln!(out, "[profiles.{name}]");
        if let Some(ref id) = p.client_id {
            let _ = writeln!(out, "client_id = \"{id}\"");
        }
        if p.client_secret.is_some() {
            let _ = writeln!(out, "client_secret = \"****\"");
        }
        if let Some(ref env) = p.client_secret_env {
            let _ = writeln!(out, "client_secret_env = \"{env}\"");
        }
        let _ = writeln!(out, "scopes = \"{}\"", p.scopes);
        if p.access_token.is_some() {
            let _ = writeln!(out, "access_token = \"****\"");
        }
        if p.refresh_token.is_some() {
            let _ = writeln!(out, "refresh_token = \"****\"");
        }
        if let Some(expiry) = p.token_expiry {
            let _ = writeln!(out, "token_expiry = {expiry}");
        }
        if let Some(ref url) = p.api_url {
            let _ = writeln!(out, "api_url = \"{url}\"");
        }
        if let Some(ms) = p.poll_interval_ms {
            let _ = writeln!(out, "poll_interval_ms = {ms}");
        }
        if let Some(timeout) = p.timeout {
            let _ = writeln!(out, "timeout = {timeout}");
        }
    }

    out
}

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Show => {
            let cfg = config::load_config_or_default();
            let out = match global.output {
                OutputFormat::Table | OutputFormat::Plain => format_config_redacted(&cfg),
                OutputFormat::Json | OutputFormat::JsonCompact => {
                    let text = format_config_redacted(&cfg);
                    serde_json::to_string(&text)?
                }
            };
            output::print_output(out.trim_end(), global.quiet);
            Ok(())
        }

        ConfigCommand::Path => {
            output::print_output(&config::config_path().display().to_string(), global.quiet);
            Ok(())
        }

        ConfigCommand::SetSecret { secret } => {
            let mut cfg = config::load_config_or_default();
            let name = config::active_profile_name(global, &cfg);
            smartpoll_config::store_client_secret(&name, &secret)?;

            // The keyring now holds it; drop any plaintext copy.
            if let Some(profile) = cfg.profiles.get_mut(&name) {
                if profile.client_secret.take().is_some() {
                    config::save_config(&cfg)?;
                }
            }
            output::print_output(
                &format!("Client secret stored in keyring for profile '{name}'"),
                global.quiet,
            );
            Ok(())
        }
    }
}
