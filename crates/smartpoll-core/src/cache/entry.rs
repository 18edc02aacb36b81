use std::sync::Arc;
use std::time::Duration;

use futures_util::future::{BoxFuture, Shared};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::error;

use crate::model::{DeviceKey, DeviceStatus};

/// A refresh in flight. Every clone resolves to the entry's status as of
/// completion, or `None` if the entry was torn down or replaced meanwhile.
pub(crate) type PendingRefresh = Shared<BoxFuture<'static, Option<Arc<DeviceStatus>>>>;

/// Per-device cache record.
pub(crate) struct CacheEntry {
    pub ref_count: usize,
    pub status: Option<Arc<DeviceStatus>>,
    /// Canonical serialization of `status`, for change detection.
    pub fingerprint: Option<String>,
    pub backoff: Duration,
    /// Poll results are not applied while `now < suppress_until`.
    pub suppress_until: Option<Instant>,
    pub pending: Option<PendingRefresh>,
    /// Set when any joiner of the pending refresh asked for a forced
    /// notification.
    pub force_notify: bool,
    pub timer: Option<JoinHandle<()>>,
    /// Distinguishes this entry from a later one under the same key.
    pub generation: u64,
}

impl CacheEntry {
    pub fn new(backoff: Duration, generation: u64) -> Self {
        Self {
            ref_count: 0,
            status: None,
            fingerprint: None,
            backoff,
            suppress_until: None,
            pending: None,
            force_notify: false,
            timer: None,
            generation,
        }
    }

    /// No subscribers and nothing in flight: the entry must not exist.
    pub fn is_idle(&self) -> bool {
        self.ref_count == 0 && self.pending.is_none()
    }

    pub fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }

    pub fn is_suppressed(&self, now: Instant) -> bool {
        self.suppress_until.is_some_and(|until| now < until)
    }
}

impl Drop for CacheEntry {
    fn drop(&mut self) {
        self.cancel_timer();
    }
}

/// Canonical serialization of a status tree. `None` if serialization
/// fails, which the caller treats as "changed".
pub(crate) fn fingerprint(key: &DeviceKey, status: &DeviceStatus) -> Option<String> {
    match serde_json::to_string(status) {
        Ok(s) => Some(s),
        Err(e) => {
            error!(device = %key, error = %e, "failed to serialize device status");
            None
        }
    }
}
