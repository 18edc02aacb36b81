// ── Refresh executor ──
//
// One remote round trip per device at a time: nudge, fetch, then apply the
// result under the entry lock. Host callbacks fire after the lock is
// released.

use std::sync::Arc;

use futures_util::FutureExt;
use tokio::time::Instant;
use tracing::{debug, error};

use super::entry::{CacheEntry, PendingRefresh, fingerprint};
use super::manager::{ManagerInner, duration_ms};
use super::{DeviceStateHost, MAX_BACKOFF, MIN_POLL_INTERVAL, StateUpdate};
use crate::cloud::DeviceCloud;
use crate::error::CoreError;
use crate::model::{DeviceKey, DeviceStatus};

impl<H: DeviceStateHost> ManagerInner<H> {
    /// Join the refresh in flight for `entry`, or start one.
    pub fn start_refresh(
        self: &Arc<Self>,
        key: &DeviceKey,
        entry: &mut CacheEntry,
        force_notify: bool,
    ) -> PendingRefresh {
        entry.force_notify |= force_notify;
        if let Some(pending) = &entry.pending {
            return pending.clone();
        }

        let task = tokio::spawn(Arc::clone(self).run_refresh(key.clone(), entry.generation));
        let pending = async move { task.await.ok().flatten() }.boxed().shared();
        entry.pending = Some(pending.clone());
        pending
    }

    async fn run_refresh(
        self: Arc<Self>,
        key: DeviceKey,
        generation: u64,
    ) -> Option<Arc<DeviceStatus>> {
        let result = match self.host.cloud() {
            Some(cloud) => fetch_fresh(cloud.as_ref(), &key).await,
            None => Err(CoreError::NotAuthenticated),
        };
        self.complete_refresh(&key, generation, result)
    }

    fn complete_refresh(
        self: &Arc<Self>,
        key: &DeviceKey,
        generation: u64,
        result: Result<DeviceStatus, CoreError>,
    ) -> Option<Arc<DeviceStatus>> {
        let now = Instant::now();
        let mut update = None;

        let (output, release) = {
            let Some(mut entry) = self.entries.get_mut(key) else {
                debug!(device = %key, "entry gone, discarding refresh result");
                return None;
            };
            if entry.generation != generation {
                debug!(device = %key, "entry replaced, discarding refresh result");
                return None;
            }
            entry.pending = None;
            let force_notify = std::mem::take(&mut entry.force_notify);

            match result {
                Ok(_) if entry.is_suppressed(now) => {
                    let remaining = entry.suppress_until.map_or(MIN_POLL_INTERVAL, |u| u - now);
                    entry.backoff = remaining.clamp(MIN_POLL_INTERVAL, MAX_BACKOFF);
                    debug!(
                        device = %key,
                        backoff_ms = duration_ms(entry.backoff),
                        "optimistic value still shielded, poll result ignored"
                    );
                }
                Ok(status) => {
                    let fp = fingerprint(key, &status);
                    let changed = fp.is_none() || fp != entry.fingerprint;
                    entry.status = Some(Arc::new(status));
                    entry.fingerprint = fp;
                    entry.backoff = self.poll_interval();
                    entry.suppress_until = None;
                    if changed || force_notify {
                        update = Some(StateUpdate {
                            changed,
                            forced: force_notify,
                        });
                    }
                }
                Err(e) => {
                    entry.backoff = (entry.backoff * 2).min(MAX_BACKOFF);
                    error!(
                        device = %key,
                        error = %e,
                        backoff_ms = duration_ms(entry.backoff),
                        "device refresh failed"
                    );
                }
            }

            let output = entry.status.clone();
            if entry.ref_count > 0 {
                self.arm(key, &mut entry);
                (output, false)
            } else {
                entry.cancel_timer();
                (output, true)
            }
        };

        if let Some(update) = update {
            self.host.on_state_updated(key, update);
        }
        if release && self.remove_idle(key, generation) {
            debug!(device = %key, "device state released after refresh");
            self.host.on_state_cleared(key);
        }
        output
    }
}

async fn fetch_fresh<C: DeviceCloud>(
    cloud: &C,
    key: &DeviceKey,
) -> Result<DeviceStatus, CoreError> {
    cloud.send_refresh(key).await?;
    cloud.fetch_status(key).await
}
