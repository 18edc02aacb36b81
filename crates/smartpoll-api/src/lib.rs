// smartpoll-api: Async Rust client for the SmartThings REST API

pub mod auth;
pub mod client;
pub mod devices;
pub mod error;
pub mod models;
pub mod oauth;
pub mod transport;

pub use auth::TokenSet;
pub use client::SmartThingsClient;
pub use error::Error;
pub use models::{
    AttributeState, CapabilityStatus, ComponentStatus, DeviceCommand, DeviceInfo, StatusResponse,
};
pub use oauth::OAuthClient;
pub use transport::TransportConfig;
