// ── Device status tree ──
//
// component → capability → attribute → reading. BTreeMaps keep
// serialization deterministic, which the cache relies on for change
// detection.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One attribute reading. `fields` carries `unit`, `timestamp`, `data`
/// and anything else the cloud attaches.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    #[serde(default)]
    pub value: Value,
    #[serde(flatten)]
    pub fields: BTreeMap<String, Value>,
}

impl Attribute {
    pub fn new(value: impl Into<Value>) -> Self {
        Self {
            value: value.into(),
            fields: BTreeMap::new(),
        }
    }

    pub fn unit(&self) -> Option<&str> {
        self.fields.get("unit").and_then(Value::as_str)
    }
}

/// attribute name → reading
pub type CapabilityState = BTreeMap<String, Attribute>;

/// capability id → attributes
pub type ComponentState = BTreeMap<String, CapabilityState>;

/// Full snapshot of one device.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceStatus {
    #[serde(default)]
    pub components: BTreeMap<String, ComponentState>,
}

/// Address of a single attribute, e.g. `main/switch/switch`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttributePath<'a> {
    pub component: &'a str,
    pub capability: &'a str,
    pub attribute: &'a str,
}

impl<'a> AttributePath<'a> {
    pub const fn new(component: &'a str, capability: &'a str, attribute: &'a str) -> Self {
        Self {
            component,
            capability,
            attribute,
        }
    }
}

impl fmt::Display for AttributePath<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.component, self.capability, self.attribute)
    }
}

impl DeviceStatus {
    pub fn attribute(&self, path: AttributePath<'_>) -> Option<&Attribute> {
        self.components
            .get(path.component)?
            .get(path.capability)?
            .get(path.attribute)
    }

    pub fn value(&self, path: AttributePath<'_>) -> Option<&Value> {
        self.attribute(path).map(|a| &a.value)
    }

    /// Mutable access to an attribute, creating every missing level.
    pub fn attribute_mut(&mut self, path: AttributePath<'_>) -> &mut Attribute {
        self.components
            .entry(path.component.to_owned())
            .or_default()
            .entry(path.capability.to_owned())
            .or_default()
            .entry(path.attribute.to_owned())
            .or_default()
    }

    /// Set `value` at `path` and merge `fields` into the attribute.
    pub fn set(
        &mut self,
        path: AttributePath<'_>,
        value: impl Into<Value>,
        fields: impl IntoIterator<Item = (String, Value)>,
    ) {
        let attribute = self.attribute_mut(path);
        attribute.value = value.into();
        attribute.fields.extend(fields);
    }
}
