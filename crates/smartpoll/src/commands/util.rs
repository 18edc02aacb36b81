//! Shared helpers for command handlers.

use smartpoll_core::{Controller, DeviceKey};

use crate::error::CliError;

/// Resolve a device id or display name (case-insensitive) to its key.
pub fn resolve_device(controller: &Controller, identifier: &str) -> Result<DeviceKey, CliError> {
    let snap = controller.devices_snapshot();
    if let Some(device) = snap.iter().find(|d| d.key.as_str() == identifier) {
        return Ok(device.key.clone());
    }

    let mut by_name = snap
        .iter()
        .filter(|d| d.display_name().eq_ignore_ascii_case(identifier));
    match (by_name.next(), by_name.next()) {
        (Some(device), None) => Ok(device.key.clone()),
        (Some(_), Some(_)) => Err(CliError::Validation {
            field: "device".into(),
            reason: format!("'{identifier}' matches several devices; use the device id"),
        }),
        (None, _) => Err(CliError::NotFound {
            resource_type: "device".into(),
            identifier: identifier.into(),
            list_command: "devices list".into(),
        }),
    }
}
