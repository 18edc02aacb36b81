mod cli;
mod commands;
mod config;
mod error;
mod output;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use smartpoll_core::Controller;

use crate::cli::{Cli, Command};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.global.verbose);

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        // These don't need an API connection
        Command::Config(args) => commands::config_cmd::handle(args, &cli.global),
        Command::Auth(args) => commands::auth::handle(args, &cli.global).await,

        Command::Completions(args) => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Cli::command();
            generate(args.shell, &mut cmd, "smartpoll", &mut std::io::stdout());
            Ok(())
        }

        cmd => {
            let mut cfg = config::load_config_or_default();
            let profile_name = config::active_profile_name(&cli.global, &cfg);
            let controller_config =
                config::build_controller_config(&cli.global, &cfg, &profile_name)?;
            let controller = Controller::new(controller_config);

            tracing::debug!(command = ?cmd, profile = %profile_name, "dispatching command");
            let mut tokens = controller.token_updates();
            let result = commands::dispatch(cmd, &controller, &cli.global).await;

            // Persist tokens the client refreshed along the way.
            if tokens.has_changed().unwrap_or(false) {
                let refreshed = tokens.borrow_and_update().clone();
                if let Some(refreshed) = refreshed {
                    if cfg.profiles.contains_key(&profile_name) {
                        if let Err(e) =
                            smartpoll_config::save_tokens(&mut cfg, &profile_name, &refreshed)
                        {
                            tracing::warn!(error = %e, "failed to save refreshed tokens");
                        }
                    }
                }
            }

            result
        }
    }
}
