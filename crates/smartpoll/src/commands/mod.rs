//! Command dispatch: bridges CLI args -> core Commands -> output formatting.

pub mod auth;
pub mod config_cmd;
pub mod control;
pub mod devices;
pub mod util;
pub mod watch;

use smartpoll_core::Controller;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Connect, run an API-bound command, then disconnect.
pub async fn dispatch(
    cmd: Command,
    controller: &Controller,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    controller.connect().await?;

    let result = match cmd {
        Command::Devices(args) => devices::handle(controller, args, global).await,
        Command::Watch(args) => watch::handle(controller, args, global).await,
        Command::Power(args) => control::power(controller, args, global).await,
        Command::Mute(args) => control::mute(controller, args, global).await,
        Command::Input(args) => control::input(controller, args, global).await,
        Command::Volume(args) => control::volume(controller, args, global).await,
        Command::Auth(_) | Command::Config(_) | Command::Completions(_) => {
            Err(CliError::Validation {
                field: "command".into(),
                reason: "handled without a connection".into(),
            })
        }
    };

    controller.disconnect().await;
    result
}
