// Device endpoints: list, status, commands.

use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::client::SmartThingsClient;
use crate::error::Error;
use crate::models::{
    CapabilityStatus, CommandBatch, DeviceCommand, DeviceInfo, PagedItems, StatusResponse,
};

impl SmartThingsClient {
    /// List every device visible to the token, following `_links.next`.
    pub async fn list_devices(&self) -> Result<Vec<DeviceInfo>, Error> {
        let mut all = Vec::new();
        let mut next: Option<Url> = Some(self.url("devices")?);

        while let Some(url) = next.take() {
            let page: PagedItems<DeviceInfo> = self.get(url).await?;
            all.extend(page.items);
            next = page
                .links
                .and_then(|l| l.next)
                .map(|link| Url::parse(&link.href))
                .transpose()?;
        }

        debug!(count = all.len(), "listed devices");
        Ok(all)
    }

    /// Full component/capability/attribute tree for one device.
    pub async fn get_device_status(&self, device_id: &str) -> Result<StatusResponse, Error> {
        let url = self.url(&format!("devices/{device_id}/status"))?;
        self.get(url).await
    }

    /// Attributes of a single capability on one component.
    pub async fn get_capability_status(
        &self,
        device_id: &str,
        component: &str,
        capability: &str,
    ) -> Result<CapabilityStatus, Error> {
        let url = self.url(&format!(
            "devices/{device_id}/components/{component}/capabilities/{capability}/status"
        ))?;
        self.get(url).await
    }

    /// Send one command.
    pub async fn execute_command(
        &self,
        device_id: &str,
        command: DeviceCommand,
    ) -> Result<(), Error> {
        self.execute_commands(device_id, std::slice::from_ref(&command))
            .await
    }

    /// Send a batch of commands in a single request.
    pub async fn execute_commands(
        &self,
        device_id: &str,
        commands: &[DeviceCommand],
    ) -> Result<(), Error> {
        let url = self.url(&format!("devices/{device_id}/commands"))?;
        debug!(device_id, count = commands.len(), "executing commands");
        let _: Value = self.post(url, &CommandBatch { commands }).await?;
        Ok(())
    }

    /// Ask the device to push fresh state to the cloud.
    pub async fn refresh(&self, device_id: &str) -> Result<(), Error> {
        self.execute_command(device_id, DeviceCommand::refresh())
            .await
    }
}
