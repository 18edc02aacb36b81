// ── API-to-domain type conversions ──
//
// Bridges raw `smartpoll_api` payloads into `smartpoll_core::model` types.

use smartpoll_api::{AttributeState, DeviceInfo, StatusResponse};

use crate::model::{Attribute, Device, DeviceKey, DeviceStatus};

impl From<DeviceInfo> for Device {
    fn from(info: DeviceInfo) -> Self {
        Self {
            key: DeviceKey::from(info.device_id),
            name: info.name,
            label: info.label,
            presentation_id: info.presentation_id,
            manufacturer: info.manufacturer_name,
            room_id: info.room_id,
        }
    }
}

impl From<AttributeState> for Attribute {
    fn from(state: AttributeState) -> Self {
        Self {
            value: state.value,
            fields: state.extra,
        }
    }
}

impl From<StatusResponse> for DeviceStatus {
    fn from(resp: StatusResponse) -> Self {
        let components = resp
            .components
            .into_iter()
            .map(|(component, capabilities)| {
                let capabilities = capabilities
                    .into_iter()
                    .map(|(capability, attributes)| {
                        let attributes = attributes
                            .into_iter()
                            .map(|(name, state)| (name, Attribute::from(state)))
                            .collect();
                        (capability, attributes)
                    })
                    .collect();
                (component, capabilities)
            })
            .collect();
        Self { components }
    }
}
