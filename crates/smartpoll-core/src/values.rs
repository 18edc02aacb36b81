// ── Presentation values ──
//
// Projections of a cached device status into the flat strings and booleans
// a UI binds to: per-device variables and feedback predicates.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::{AttributePath, DeviceKey, DeviceStatus};

pub const POWER: AttributePath<'static> = AttributePath::new("main", "switch", "switch");
pub const INPUT_SOURCE: AttributePath<'static> =
    AttributePath::new("main", "samsungvd.mediaInputSource", "inputSource");
pub const INPUT_SOURCE_MAP: AttributePath<'static> =
    AttributePath::new("main", "samsungvd.mediaInputSource", "supportedInputSourcesMap");
pub const MUTE: AttributePath<'static> = AttributePath::new("main", "audioMute", "mute");
pub const VOLUME: AttributePath<'static> = AttributePath::new("main", "audioVolume", "volume");

/// `device_` followed by the key with every character outside
/// `[A-Za-z0-9_]` replaced by `_`.
pub fn variable_base_id(key: &DeviceKey) -> String {
    let sanitized: String = key
        .as_str()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    format!("device_{sanitized}")
}

/// Variable names for one device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableIds {
    pub power: String,
    pub input: String,
    pub mute: String,
    pub volume: String,
}

impl VariableIds {
    pub fn for_device(key: &DeviceKey) -> Self {
        let base = variable_base_id(key);
        Self {
            power: format!("{base}_power"),
            input: format!("{base}_input"),
            mute: format!("{base}_mute"),
            volume: format!("{base}_volume"),
        }
    }
}

/// Current variable values of one device. All empty when nothing is cached.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeviceValues {
    pub power: String,
    pub input: String,
    pub mute: String,
    pub volume: String,
}

impl DeviceValues {
    pub fn from_status(status: Option<&DeviceStatus>) -> Self {
        let Some(status) = status else {
            return Self::default();
        };
        let read = |path| status.value(path).map(format_value).unwrap_or_default();
        Self {
            power: read(POWER),
            input: read(INPUT_SOURCE),
            mute: read(MUTE),
            volume: read(VOLUME),
        }
    }
}

/// Strings verbatim, numbers and booleans printed, anything else empty.
pub fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    }
}

// ── Input sources ────────────────────────────────────────────────────

/// One entry of `supportedInputSourcesMap`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputSource {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

pub fn input_sources(status: &DeviceStatus) -> Vec<InputSource> {
    status
        .value(INPUT_SOURCE_MAP)
        .cloned()
        .and_then(|v| serde_json::from_value(v).ok())
        .unwrap_or_default()
}

/// Look up an input source by id or display name.
pub fn find_input_source(status: &DeviceStatus, id_or_name: &str) -> Option<InputSource> {
    input_sources(status)
        .into_iter()
        .find(|s| s.id == id_or_name || s.name == id_or_name)
}

// ── Feedbacks ────────────────────────────────────────────────────────

pub fn power_on(status: &DeviceStatus) -> bool {
    status.value(POWER).and_then(Value::as_str) == Some("on")
}

pub fn muted(status: &DeviceStatus) -> bool {
    status.value(MUTE).and_then(Value::as_str) == Some("muted")
}

/// Whether the source named `id_or_name` is the current input.
pub fn input_selected(status: &DeviceStatus, id_or_name: &str) -> bool {
    let Some(source) = find_input_source(status, id_or_name) else {
        return false;
    };
    status.value(INPUT_SOURCE).and_then(Value::as_str) == Some(source.id.as_str())
}

/// Volume with its unit, e.g. `"12%"`. Empty when unknown.
pub fn volume_text(status: &DeviceStatus) -> String {
    let Some(attr) = status.attribute(VOLUME) else {
        return String::new();
    };
    let mut text = format_value(&attr.value);
    if let Some(unit) = attr.unit() {
        text.push_str(unit);
    }
    text
}
