// ── Command API ──
//
// All device writes flow through a unified `Command` enum. The controller
// sends the matching SmartThings command and pre-applies its expected
// effect to the cache.

use serde::Serialize;
use smartpoll_api::DeviceCommand;
use strum::{Display, EnumString};

use crate::model::DeviceKey;

/// Direction of a relative volume step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum VolumeDirection {
    Up,
    Down,
}

/// All write operations against a device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    SetPower { device: DeviceKey, on: bool },
    /// Reads fresh state to decide which way to switch.
    TogglePower { device: DeviceKey },
    SetMute { device: DeviceKey, muted: bool },
    ToggleMute { device: DeviceKey },
    /// `input` is a source id or display name.
    SelectInput { device: DeviceKey, input: String },
    Volume {
        device: DeviceKey,
        direction: VolumeDirection,
    },
}

impl Command {
    pub fn device(&self) -> &DeviceKey {
        match self {
            Self::SetPower { device, .. }
            | Self::TogglePower { device }
            | Self::SetMute { device, .. }
            | Self::ToggleMute { device }
            | Self::SelectInput { device, .. }
            | Self::Volume { device, .. } => device,
        }
    }
}

/// What a command did, for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CommandResult {
    Power { on: bool },
    Mute { muted: bool },
    Input { source: String },
    Volume { direction: String },
}

// ── SmartThings payloads ─────────────────────────────────────────────

pub(crate) fn power_command(on: bool) -> DeviceCommand {
    DeviceCommand::new("main", "switch", power_value(on))
}

pub(crate) fn power_value(on: bool) -> &'static str {
    if on { "on" } else { "off" }
}

pub(crate) fn mute_command(muted: bool) -> DeviceCommand {
    DeviceCommand::new("main", "audioMute", "setMute").with_argument(mute_value(muted))
}

pub(crate) fn mute_value(muted: bool) -> &'static str {
    if muted { "muted" } else { "unmuted" }
}

pub(crate) fn input_command(input: &str) -> DeviceCommand {
    DeviceCommand::new("main", "samsungvd.mediaInputSource", "setInputSource").with_argument(input)
}

pub(crate) fn volume_command(direction: VolumeDirection) -> DeviceCommand {
    let command = match direction {
        VolumeDirection::Up => "volumeUp",
        VolumeDirection::Down => "volumeDown",
    };
    DeviceCommand::new("main", "audioVolume", command)
}
