// ── Poll scheduling ──
//
// One-shot timer per subscribed device, rearmed after every refresh. The
// delay is the entry's backoff plus a random jitter of up to a tenth of it,
// capped at `MAX_JITTER`, so devices do not poll in lockstep.

use std::sync::atomic::Ordering;
use std::sync::{Arc, Weak};
use std::time::Duration;

use tracing::{debug, trace};

use super::entry::CacheEntry;
use super::manager::{ManagerInner, duration_ms};
use super::{DEFAULT_POLL_INTERVAL, DeviceStateHost, MAX_BACKOFF, MAX_JITTER, MIN_POLL_INTERVAL};
use crate::model::DeviceKey;

/// Absent → default; otherwise clamped to `[MIN_POLL_INTERVAL, MAX_BACKOFF]`.
pub fn normalize_poll_interval(value: Option<Duration>) -> Duration {
    value
        .unwrap_or(DEFAULT_POLL_INTERVAL)
        .clamp(MIN_POLL_INTERVAL, MAX_BACKOFF)
}

/// `backoff` plus a uniform jitter in `[0, min(MAX_JITTER, backoff / 10)]`.
pub(super) fn jittered_delay(backoff: Duration) -> Duration {
    let window = duration_ms((backoff / 10).min(MAX_JITTER));
    backoff + Duration::from_millis(rand::random_range(0..=window))
}

impl<H: DeviceStateHost> ManagerInner<H> {
    /// Cancel any pending timer for `key` and schedule the next refresh.
    pub fn arm(self: &Arc<Self>, key: &DeviceKey, entry: &mut CacheEntry) {
        let delay = jittered_delay(entry.backoff);
        let weak = Arc::downgrade(self);
        let timer = tokio::spawn(poll_timer(weak, key.clone(), entry.generation, delay));
        if let Some(previous) = entry.timer.replace(timer) {
            previous.abort();
        }
        trace!(device = %key, delay_ms = duration_ms(delay), "next poll armed");
    }

    pub fn set_poll_interval(self: &Arc<Self>, value: Option<Duration>) -> Duration {
        let normalized = normalize_poll_interval(value);
        let previous = self
            .poll_interval_ms
            .swap(duration_ms(normalized), Ordering::AcqRel);
        if previous == duration_ms(normalized) {
            return normalized;
        }

        debug!(poll_interval_ms = duration_ms(normalized), "poll interval changed, rearming");
        for mut entry in self.entries.iter_mut() {
            if entry.ref_count == 0 {
                continue;
            }
            let key = entry.key().clone();
            entry.backoff = normalized;
            self.arm(&key, entry.value_mut());
        }
        normalized
    }

    fn timer_fired(self: &Arc<Self>, key: &DeviceKey, generation: u64) {
        let Some(mut entry) = self.entries.get_mut(key) else {
            return;
        };
        if entry.generation != generation || entry.ref_count == 0 {
            return;
        }
        entry.timer = None;
        let _ = self.start_refresh(key, &mut entry, false);
    }
}

/// Holds only a weak reference, so dropping the manager ends polling.
async fn poll_timer<H: DeviceStateHost>(
    manager: Weak<ManagerInner<H>>,
    key: DeviceKey,
    generation: u64,
    delay: Duration,
) {
    tokio::time::sleep(delay).await;
    if let Some(manager) = manager.upgrade() {
        manager.timer_fired(&key, generation);
    }
}
