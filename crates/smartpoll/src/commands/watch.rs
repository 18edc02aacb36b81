//! `watch`: subscribe to devices and print their values as they change.

use std::collections::HashMap;

use serde_json::json;
use tokio::sync::broadcast::error::RecvError;

use smartpoll_core::{Controller, DeviceKey, DeviceValues, StateEvent};

use crate::cli::{GlobalOpts, OutputFormat, WatchArgs};
use crate::error::CliError;
use crate::output;

use super::util;

pub async fn handle(
    controller: &Controller,
    args: WatchArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let keys = args
        .devices
        .iter()
        .map(|d| util::resolve_device(controller, d))
        .collect::<Result<Vec<_>, _>>()?;

    let mut events = controller.events();
    for key in &keys {
        controller.subscribe(key);
    }

    let color = output::should_color(&global.color);
    let mut last: HashMap<DeviceKey, DeviceValues> = HashMap::new();
    let mut remaining = args.count;

    let result = loop {
        if remaining == Some(0) {
            break Ok(());
        }
        let event = tokio::select! {
            _ = tokio::signal::ctrl_c() => break Ok(()),
            event = events.recv() => event,
        };

        let device = match event {
            Ok(StateEvent::Updated { device, .. }) if keys.contains(&device) => device,
            Ok(_) => continue,
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "watch fell behind, some updates were skipped");
                continue;
            }
            Err(RecvError::Closed) => break Ok(()),
        };

        let values = controller.device_values(&device);
        let line = render_line(controller, global, &device, &values, last.get(&device), color);
        match line {
            Ok(line) => output::print_output(&line, global.quiet),
            Err(e) => break Err(e),
        }
        last.insert(device, values);
        remaining = remaining.map(|n| n.saturating_sub(1));
    };

    for key in &keys {
        controller.unsubscribe(key);
    }
    result
}

fn render_line(
    controller: &Controller,
    global: &GlobalOpts,
    device: &DeviceKey,
    values: &DeviceValues,
    previous: Option<&DeviceValues>,
    color: bool,
) -> Result<String, CliError> {
    match global.output {
        OutputFormat::Json | OutputFormat::JsonCompact => Ok(serde_json::to_string(&json!({
            "device": device,
            "values": values,
        }))?),
        OutputFormat::Plain => Ok(format!(
            "{device} {} {} {} {}",
            values.power, values.input, values.mute, values.volume
        )),
        OutputFormat::Table => {
            let field = |label: &str, now: &str, before: Option<&str>| {
                let text = format!("{label}={now}");
                if before.is_some_and(|b| b != now) {
                    output::paint_changed(&text, color)
                } else {
                    text
                }
            };
            let name = controller.device_display_name(device);
            Ok(format!(
                "{}  {}  {}  {}  {}",
                output::paint_name(&name, color),
                field("power", &values.power, previous.map(|p| p.power.as_str())),
                field("input", &values.input, previous.map(|p| p.input.as_str())),
                field("mute", &values.mute, previous.map(|p| p.mute.as_str())),
                field("volume", &values.volume, previous.map(|p| p.volume.as_str())),
            ))
        }
    }
}
