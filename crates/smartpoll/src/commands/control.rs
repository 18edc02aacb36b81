//! Power, mute, input and volume handlers.

use smartpoll_core::{Command as CoreCommand, CommandResult, Controller, VolumeDirection};

use crate::cli::{GlobalOpts, InputArgs, MuteArgs, PowerArgs, Switch, VolumeArgs, VolumeStep};
use crate::error::CliError;
use crate::output;

use super::util;

pub async fn power(
    controller: &Controller,
    args: PowerArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let device = util::resolve_device(controller, &args.device)?;
    let cmd = match args.state {
        Switch::On => CoreCommand::SetPower { device, on: true },
        Switch::Off => CoreCommand::SetPower { device, on: false },
        Switch::Toggle => CoreCommand::TogglePower { device },
    };
    run(controller, cmd, global).await
}

pub async fn mute(
    controller: &Controller,
    args: MuteArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let device = util::resolve_device(controller, &args.device)?;
    let cmd = match args.state {
        Switch::On => CoreCommand::SetMute { device, muted: true },
        Switch::Off => CoreCommand::SetMute {
            device,
            muted: false,
        },
        Switch::Toggle => CoreCommand::ToggleMute { device },
    };
    run(controller, cmd, global).await
}

pub async fn input(
    controller: &Controller,
    args: InputArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let device = util::resolve_device(controller, &args.device)?;
    run(
        controller,
        CoreCommand::SelectInput {
            device,
            input: args.source,
        },
        global,
    )
    .await
}

pub async fn volume(
    controller: &Controller,
    args: VolumeArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let device = util::resolve_device(controller, &args.device)?;
    let direction = match args.direction {
        VolumeStep::Up => VolumeDirection::Up,
        VolumeStep::Down => VolumeDirection::Down,
    };
    run(controller, CoreCommand::Volume { device, direction }, global).await
}

async fn run(
    controller: &Controller,
    cmd: CoreCommand,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let name = controller.device_display_name(cmd.device());
    let result = controller.execute(cmd).await?;
    let out = output::render_single(
        &global.output,
        &result,
        |r| format!("{name}: {}", describe(r)),
        describe,
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

fn describe(result: &CommandResult) -> String {
    match result {
        CommandResult::Power { on } => format!("power {}", if *on { "on" } else { "off" }),
        CommandResult::Mute { muted } => {
            if *muted {
                "muted".into()
            } else {
                "unmuted".into()
            }
        }
        CommandResult::Input { source } => format!("input {source}"),
        CommandResult::Volume { direction } => format!("volume {direction}"),
    }
}
