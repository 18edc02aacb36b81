// SmartThings REST payloads
//
// Wire shapes for the device list, full status tree, and command batches.
// Field names follow the API's camelCase; status trees use BTreeMap so that
// re-serialization is deterministic.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A device as returned by `GET /devices`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    pub device_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub presentation_id: Option<String>,
    #[serde(default)]
    pub manufacturer_name: Option<String>,
    #[serde(default)]
    pub room_id: Option<String>,
}

/// Paged list envelope: `{ items: [...], _links: { next: { href } } }`.
#[derive(Debug, Deserialize)]
pub(crate) struct PagedItems<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    #[serde(rename = "_links", default)]
    pub links: Option<Links>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct Links {
    #[serde(default)]
    pub next: Option<Link>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Link {
    pub href: String,
}

/// One attribute reading: `{ value, unit?, timestamp?, data? }`.
///
/// Everything other than `value` is kept verbatim in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeState {
    #[serde(default)]
    pub value: Value,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// attribute name → reading
pub type CapabilityStatus = BTreeMap<String, AttributeState>;

/// capability id → attributes
pub type ComponentStatus = BTreeMap<String, CapabilityStatus>;

/// Full status tree returned by `GET /devices/{id}/status`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusResponse {
    #[serde(default)]
    pub components: BTreeMap<String, ComponentStatus>,
}

/// A single device command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceCommand {
    pub component: String,
    pub capability: String,
    pub command: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub arguments: Vec<Value>,
}

impl DeviceCommand {
    pub fn new(
        component: impl Into<String>,
        capability: impl Into<String>,
        command: impl Into<String>,
    ) -> Self {
        Self {
            component: component.into(),
            capability: capability.into(),
            command: command.into(),
            arguments: Vec::new(),
        }
    }

    pub fn with_argument(mut self, argument: impl Into<Value>) -> Self {
        self.arguments.push(argument.into());
        self
    }

    /// The `main/refresh/refresh` nudge that makes a device push fresh state.
    pub fn refresh() -> Self {
        Self::new("main", "refresh", "refresh")
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct CommandBatch<'a> {
    pub commands: &'a [DeviceCommand],
}
