// ── Device-cloud seam ──
//
// The cache engine talks to the remote service only through `DeviceCloud`,
// so tests can substitute an in-memory implementation.

use std::future::Future;

use smartpoll_api::{DeviceCommand, SmartThingsClient};

use crate::error::CoreError;
use crate::model::{Device, DeviceKey, DeviceStatus};

/// Remote operations the cache and command handlers depend on.
pub trait DeviceCloud: Send + Sync + 'static {
    /// Every device visible to the current credentials.
    fn list_devices(&self) -> impl Future<Output = Result<Vec<Device>, CoreError>> + Send;

    /// Ask the device to report fresh state. Idempotent.
    fn send_refresh(&self, key: &DeviceKey) -> impl Future<Output = Result<(), CoreError>> + Send;

    fn fetch_status(
        &self,
        key: &DeviceKey,
    ) -> impl Future<Output = Result<DeviceStatus, CoreError>> + Send;

    fn send_command(
        &self,
        key: &DeviceKey,
        command: DeviceCommand,
    ) -> impl Future<Output = Result<(), CoreError>> + Send;
}

impl DeviceCloud for SmartThingsClient {
    async fn list_devices(&self) -> Result<Vec<Device>, CoreError> {
        let raw = SmartThingsClient::list_devices(self).await?;
        Ok(raw.into_iter().map(Device::from).collect())
    }

    async fn send_refresh(&self, key: &DeviceKey) -> Result<(), CoreError> {
        self.refresh(key.as_str()).await?;
        Ok(())
    }

    async fn fetch_status(&self, key: &DeviceKey) -> Result<DeviceStatus, CoreError> {
        let raw = self.get_device_status(key.as_str()).await?;
        Ok(DeviceStatus::from(raw))
    }

    async fn send_command(&self, key: &DeviceKey, command: DeviceCommand) -> Result<(), CoreError> {
        self.execute_command(key.as_str(), command).await?;
        Ok(())
    }
}
