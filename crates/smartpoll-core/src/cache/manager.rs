use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use dashmap::mapref::one::RefMut;
use serde_json::Value;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::entry::{CacheEntry, fingerprint};
use super::{DeviceStateHost, StateUpdate, normalize_poll_interval};
use crate::config::CacheConfig;
use crate::error::CoreError;
use crate::model::{AttributePath, DeviceKey, DeviceStatus};

/// Device-state cache and poll engine.
///
/// Cheaply cloneable. Owns one entry per device that has subscribers or an
/// operation in flight. Must be used from within a Tokio runtime: refreshes
/// and poll timers run as spawned tasks.
pub struct DeviceStateManager<H: DeviceStateHost> {
    pub(super) inner: Arc<ManagerInner<H>>,
}

impl<H: DeviceStateHost> Clone for DeviceStateManager<H> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

pub(super) struct ManagerInner<H: DeviceStateHost> {
    pub host: Arc<H>,
    pub entries: DashMap<DeviceKey, CacheEntry>,
    pub poll_interval_ms: AtomicU64,
    pub suppression_window: Duration,
    next_generation: AtomicU64,
}

impl<H: DeviceStateHost> DeviceStateManager<H> {
    pub fn new(host: Arc<H>, config: CacheConfig) -> Self {
        let poll = normalize_poll_interval(Some(config.poll_interval));
        Self {
            inner: Arc::new(ManagerInner {
                host,
                entries: DashMap::new(),
                poll_interval_ms: AtomicU64::new(duration_ms(poll)),
                suppression_window: config.suppression_window,
                next_generation: AtomicU64::new(0),
            }),
        }
    }

    pub fn host(&self) -> &Arc<H> {
        &self.inner.host
    }

    pub fn poll_interval(&self) -> Duration {
        self.inner.poll_interval()
    }

    /// Normalize and store a new poll interval, re-arming every subscribed
    /// device when it changes. Returns the interval now in effect.
    pub fn set_poll_interval(&self, value: Option<Duration>) -> Duration {
        self.inner.set_poll_interval(value)
    }

    // ── Subscriptions ────────────────────────────────────────────────

    /// Register interest in `key`. The first subscriber triggers an
    /// immediate forced refresh and starts the poll loop.
    pub fn subscribe(&self, key: &DeviceKey) {
        if !self.inner.accepts(key, "subscribe") {
            return;
        }
        let mut entry = self.inner.ensure_entry(key);
        entry.ref_count += 1;
        debug!(device = %key, ref_count = entry.ref_count, "subscribed");
        if entry.ref_count == 1 {
            let _ = self.inner.start_refresh(key, &mut entry, true);
        }
    }

    /// Drop one subscription. The last one tears the entry down, deferred to
    /// the end of any refresh still in flight.
    pub fn unsubscribe(&self, key: &DeviceKey) {
        let generation = {
            let Some(mut entry) = self.inner.entries.get_mut(key) else {
                return;
            };
            entry.ref_count = entry.ref_count.saturating_sub(1);
            if entry.ref_count > 0 {
                return;
            }
            entry.cancel_timer();
            if entry.pending.is_some() {
                debug!(device = %key, "last subscriber gone, teardown deferred to pending refresh");
                return;
            }
            entry.generation
        };

        if self.inner.remove_idle(key, generation) {
            debug!(device = %key, "device state released");
            self.inner.host.on_state_cleared(key);
        }
    }

    /// Remove every entry whose device is not in `known`, in-flight
    /// operations included.
    pub fn prune_unknown(&self, known: &HashSet<DeviceKey>) {
        let mut removed = Vec::new();
        self.inner.entries.retain(|key, _| {
            let keep = known.contains(key);
            if !keep {
                removed.push(key.clone());
            }
            keep
        });

        for key in &removed {
            debug!(device = %key, "pruned state of unknown device");
            self.inner.host.on_state_cleared(key);
        }
    }

    /// Cancel every timer and drop every entry.
    pub fn clear_all(&self) {
        self.inner.entries.clear();
        debug!("cleared all device state");
        self.inner.host.on_all_cleared();
    }

    // ── Reads ────────────────────────────────────────────────────────

    /// Last known status, without any remote traffic.
    pub fn cached_state(&self, key: &DeviceKey) -> Option<Arc<DeviceStatus>> {
        self.inner.host.cloud()?;
        self.inner.entries.get(key)?.status.clone()
    }

    /// Cached status, refreshing first when `force_refresh` is set or
    /// nothing has been fetched yet.
    pub async fn snapshot(
        &self,
        key: &DeviceKey,
        force_refresh: bool,
    ) -> Option<Arc<DeviceStatus>> {
        if self.inner.host.cloud().is_none() || !self.inner.host.is_known_device(key) {
            return None;
        }

        let pending = {
            let mut entry = self.inner.ensure_entry(key);
            if !force_refresh {
                if let Some(status) = &entry.status {
                    return Some(Arc::clone(status));
                }
            }
            self.inner.start_refresh(key, &mut entry, true)
        };
        pending.await
    }

    /// Refresh `key` now and wait for the result. Only acts on devices that
    /// already have an entry.
    pub async fn refresh(&self, key: &DeviceKey, force_notify: bool) -> Option<Arc<DeviceStatus>> {
        self.inner.host.cloud()?;
        let pending = {
            let mut entry = self.inner.entries.get_mut(key)?;
            self.inner.start_refresh(key, &mut entry, force_notify)
        };
        pending.await
    }

    /// Fire-and-forget variant of [`refresh`](Self::refresh).
    pub fn request_refresh(&self, key: &DeviceKey, force_notify: bool) {
        if self.inner.host.cloud().is_none() {
            return;
        }
        if let Some(mut entry) = self.inner.entries.get_mut(key) {
            let _ = self.inner.start_refresh(key, &mut entry, force_notify);
        }
    }

    // ── Optimistic writes ────────────────────────────────────────────

    /// Apply `mutate` to a copy of the cached status and publish it,
    /// shielding it from poll results for the suppression window.
    ///
    /// A failing `mutate` leaves the cache untouched.
    pub fn apply_optimistic<F>(&self, key: &DeviceKey, mutate: F)
    where
        F: FnOnce(&mut DeviceStatus) -> Result<(), CoreError>,
    {
        if !self.inner.accepts(key, "optimistic update") {
            return;
        }

        let (applied, release) = {
            let mut entry = self.inner.ensure_entry(key);
            let mut draft = entry.status.as_deref().cloned().unwrap_or_default();
            let applied = match mutate(&mut draft) {
                Ok(()) => {
                    entry.fingerprint = fingerprint(key, &draft);
                    entry.status = Some(Arc::new(draft));
                    entry.suppress_until = Some(Instant::now() + self.inner.suppression_window);
                    true
                }
                Err(e) => {
                    debug!(device = %key, error = %e, "optimistic update dropped");
                    false
                }
            };
            (applied, entry.is_idle().then_some(entry.generation))
        };

        if applied {
            self.inner.host.on_state_updated(
                key,
                StateUpdate {
                    changed: true,
                    forced: true,
                },
            );
        }
        if let Some(generation) = release {
            if self.inner.remove_idle(key, generation) && applied {
                self.inner.host.on_state_cleared(key);
            }
        }
    }

    /// Optimistically set one attribute, merging `fields` into it.
    pub fn optimistic_set_attribute(
        &self,
        key: &DeviceKey,
        path: AttributePath<'_>,
        value: impl Into<Value>,
        fields: impl IntoIterator<Item = (String, Value)>,
    ) {
        let value = value.into();
        self.apply_optimistic(key, |status| {
            status.set(path, value, fields);
            Ok(())
        });
    }
}

// ── Entry bookkeeping ────────────────────────────────────────────────

impl<H: DeviceStateHost> ManagerInner<H> {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.load(Ordering::Acquire))
    }

    /// Gate shared by subscribe and optimistic writes: a live client and a
    /// device the host knows about.
    fn accepts(&self, key: &DeviceKey, op: &str) -> bool {
        if self.host.cloud().is_none() {
            debug!(device = %key, op, "no client, ignoring");
            return false;
        }
        if !self.host.is_known_device(key) {
            warn!(device = %key, op, "unknown device, ignoring");
            return false;
        }
        true
    }

    pub fn ensure_entry(&self, key: &DeviceKey) -> RefMut<'_, DeviceKey, CacheEntry> {
        self.entries.entry(key.clone()).or_insert_with(|| {
            let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
            CacheEntry::new(self.poll_interval(), generation)
        })
    }

    /// Delete the entry if it is still generation `generation` and idle.
    /// Dropping the entry cancels its timer.
    pub fn remove_idle(&self, key: &DeviceKey, generation: u64) -> bool {
        self.entries
            .remove_if(key, |_, e| e.is_idle() && e.generation == generation)
            .is_some()
    }
}

pub(super) fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
