//! Device command handlers.

use std::sync::Arc;

use serde::Serialize;
use tabled::Tabled;

use smartpoll_core::values::{self, VariableIds};
use smartpoll_core::{Controller, Device, DeviceStatus, DeviceValues};

use crate::cli::{DevicesArgs, DevicesCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table rows ──────────────────────────────────────────────────────

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Label")]
    label: String,
    #[tabled(rename = "Manufacturer")]
    manufacturer: String,
    #[tabled(rename = "Room")]
    room: String,
}

impl From<&Arc<Device>> for DeviceRow {
    fn from(d: &Arc<Device>) -> Self {
        Self {
            id: d.key.to_string(),
            name: d.display_name().to_owned(),
            label: d.label.clone().unwrap_or_default(),
            manufacturer: d.manufacturer.clone().unwrap_or_default(),
            room: d.room_id.clone().unwrap_or_default(),
        }
    }
}

#[derive(Tabled)]
struct AttributeRow {
    #[tabled(rename = "Component")]
    component: String,
    #[tabled(rename = "Capability")]
    capability: String,
    #[tabled(rename = "Attribute")]
    attribute: String,
    #[tabled(rename = "Value")]
    value: String,
}

fn attribute_rows(status: &DeviceStatus) -> Vec<AttributeRow> {
    let mut rows = Vec::new();
    for (component, capabilities) in &status.components {
        for (capability, attributes) in capabilities {
            for (attribute, state) in attributes {
                let mut value = values::format_value(&state.value);
                if value.is_empty() && !state.value.is_null() {
                    value = state.value.to_string();
                }
                if let Some(unit) = state.unit() {
                    value.push_str(unit);
                }
                rows.push(AttributeRow {
                    component: component.clone(),
                    capability: capability.clone(),
                    attribute: attribute.clone(),
                    value,
                });
            }
        }
    }
    rows
}

/// Button-style feedback states derived from a status.
#[derive(Debug, Serialize, PartialEq, Eq)]
struct Feedbacks {
    power_on: bool,
    muted: bool,
    volume: String,
    inputs: Vec<InputFeedback>,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct InputFeedback {
    id: String,
    name: String,
    selected: bool,
}

fn feedbacks(status: &DeviceStatus) -> Feedbacks {
    let inputs = values::input_sources(status)
        .into_iter()
        .map(|source| InputFeedback {
            selected: values::input_selected(status, &source.id),
            id: source.id,
            name: source.name,
        })
        .collect();
    Feedbacks {
        power_on: values::power_on(status),
        muted: values::muted(status),
        volume: values::volume_text(status),
        inputs,
    }
}

/// JSON shape of `devices status`.
#[derive(Serialize)]
struct StatusView<'a> {
    device: &'a str,
    name: String,
    values: DeviceValues,
    feedbacks: Feedbacks,
    status: &'a DeviceStatus,
}

fn plain_values(key: &str, values: &DeviceValues) -> String {
    let ids = VariableIds::for_device(&key.into());
    [
        format!("{}={}", ids.power, values.power),
        format!("{}={}", ids.input, values.input),
        format!("{}={}", ids.mute, values.mute),
        format!("{}={}", ids.volume, values.volume),
    ]
    .join("\n")
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    controller: &Controller,
    args: DevicesArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        DevicesCommand::List => {
            let snap = controller.devices_snapshot();
            let out = output::render_list(
                &global.output,
                &snap,
                |d| DeviceRow::from(d),
                |d| d.key.to_string(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        DevicesCommand::Status { device } => {
            let key = util::resolve_device(controller, &device)?;
            let status = controller
                .snapshot(&key, true)
                .await
                .ok_or_else(|| CliError::ApiError {
                    code: "unavailable".into(),
                    message: format!("could not fetch status for '{key}'"),
                })?;

            let view = StatusView {
                device: key.as_str(),
                name: controller.device_display_name(&key),
                values: DeviceValues::from_status(Some(&status)),
                feedbacks: feedbacks(&status),
                status: &status,
            };
            let out = output::render_single(
                &global.output,
                &view,
                |v| output::render_table(&attribute_rows(v.status)),
                |v| plain_values(v.device, &v.values),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
