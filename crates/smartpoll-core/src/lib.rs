// smartpoll-core: Device-state cache and command layer between smartpoll-api and consumers.

pub mod cache;
pub mod cloud;
pub mod command;
pub mod config;
pub mod controller;
pub mod convert;
pub mod error;
pub mod model;
pub mod values;

// ── Primary re-exports ──────────────────────────────────────────────
pub use cache::{DeviceStateHost, DeviceStateManager, StateUpdate, normalize_poll_interval};
pub use cloud::DeviceCloud;
pub use command::{Command, CommandResult, VolumeDirection};
pub use config::{AuthCredentials, CacheConfig, ControllerConfig};
pub use controller::{ConnectionState, Controller, Session, StateEvent};
pub use error::CoreError;
pub use values::{DeviceValues, InputSource, VariableIds};

// Re-export model types at the crate root for ergonomics.
pub use model::{
    Attribute, AttributePath, CapabilityState, ComponentState, Device, DeviceKey, DeviceStatus,
};
