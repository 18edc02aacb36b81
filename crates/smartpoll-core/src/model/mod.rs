// ── Domain model ──
//
// Canonical representation of SmartThings devices and their live state.
// API payloads are converted into these types in `convert.rs`.

pub mod device;
pub mod status;

pub use device::{Device, DeviceKey};
pub use status::{Attribute, AttributePath, CapabilityState, ComponentState, DeviceStatus};
