// ── Device-state cache ──
//
// Reference-counted per-device entries kept fresh by a self-scheduling poll
// loop. Refreshes are single-flight per device, back off exponentially on
// failure, and respect a suppression window after optimistic writes.
//
// Entry bookkeeping lives in `entry.rs`, the public surface in `manager.rs`,
// the refresh round trip in `refresh.rs` and timers in `schedule.rs`.

mod entry;
mod manager;
mod refresh;
mod schedule;

#[cfg(test)]
mod tests;

use std::sync::Arc;
use std::time::Duration;

use crate::cloud::DeviceCloud;
use crate::model::DeviceKey;

pub use manager::DeviceStateManager;
pub use schedule::normalize_poll_interval;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10_000);
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1_000);
pub const MAX_BACKOFF: Duration = Duration::from_millis(60_000);
pub const DEFAULT_SUPPRESSION_WINDOW: Duration = Duration::from_millis(10_000);

/// Upper bound on the random delay added to each poll.
pub const MAX_JITTER: Duration = Duration::from_millis(1_000);

/// What a refresh or optimistic write reports to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateUpdate {
    /// The cached snapshot differs from what it was before.
    pub changed: bool,
    /// The caller asked for a notification regardless of change.
    pub forced: bool,
}

/// The environment a [`DeviceStateManager`] runs in.
///
/// Callbacks are invoked outside of any cache lock and may call back into
/// the manager.
pub trait DeviceStateHost: Send + Sync + 'static {
    type Cloud: DeviceCloud;

    /// The live client, or `None` while unauthenticated.
    fn cloud(&self) -> Option<Arc<Self::Cloud>>;

    fn is_known_device(&self, key: &DeviceKey) -> bool;

    fn on_state_updated(&self, key: &DeviceKey, update: StateUpdate);

    fn on_state_cleared(&self, key: &DeviceKey);

    fn on_all_cleared(&self);
}
