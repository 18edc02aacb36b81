#![allow(clippy::unwrap_used)]

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use smartpoll_api::DeviceCommand;
use tokio::time::sleep;
use tokio_test::{assert_pending, assert_ready};

use super::{DeviceStateHost, DeviceStateManager, StateUpdate};
use crate::cloud::DeviceCloud;
use crate::config::CacheConfig;
use crate::error::CoreError;
use crate::model::{AttributePath, Device, DeviceKey, DeviceStatus};

const SWITCH: AttributePath<'static> = AttributePath::new("main", "switch", "switch");

// ── In-memory cloud ─────────────────────────────────────────────────

struct FakeCloud {
    queued: Mutex<VecDeque<Result<DeviceStatus, String>>>,
    fallback: Mutex<Result<DeviceStatus, String>>,
    latency: Duration,
    fetches: AtomicUsize,
    nudges: AtomicUsize,
}

impl FakeCloud {
    fn returning(status: DeviceStatus) -> Self {
        Self::with_fallback(Ok(status))
    }

    fn failing() -> Self {
        Self::with_fallback(Err("cloud unavailable".into()))
    }

    fn with_fallback(fallback: Result<DeviceStatus, String>) -> Self {
        Self {
            queued: Mutex::new(VecDeque::new()),
            fallback: Mutex::new(fallback),
            latency: Duration::ZERO,
            fetches: AtomicUsize::new(0),
            nudges: AtomicUsize::new(0),
        }
    }

    fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    fn push(&self, response: Result<DeviceStatus, String>) {
        self.queued.lock().unwrap().push_back(response);
    }

    fn set_fallback(&self, response: Result<DeviceStatus, String>) {
        *self.fallback.lock().unwrap() = response;
    }

    fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    fn nudges(&self) -> usize {
        self.nudges.load(Ordering::SeqCst)
    }
}

impl DeviceCloud for FakeCloud {
    async fn list_devices(&self) -> Result<Vec<Device>, CoreError> {
        Ok(Vec::new())
    }

    async fn send_refresh(&self, _key: &DeviceKey) -> Result<(), CoreError> {
        self.nudges.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn fetch_status(&self, _key: &DeviceKey) -> Result<DeviceStatus, CoreError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if !self.latency.is_zero() {
            sleep(self.latency).await;
        }
        let queued = self.queued.lock().unwrap().pop_front();
        let response = queued.unwrap_or_else(|| self.fallback.lock().unwrap().clone());
        response.map_err(CoreError::Internal)
    }

    async fn send_command(
        &self,
        _key: &DeviceKey,
        _command: DeviceCommand,
    ) -> Result<(), CoreError> {
        Ok(())
    }
}

// ── Recording host ──────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
enum HostEvent {
    Updated(DeviceKey, StateUpdate),
    Cleared(DeviceKey),
    AllCleared,
}

struct RecordingHost {
    cloud: Mutex<Option<Arc<FakeCloud>>>,
    known: HashSet<DeviceKey>,
    events: Mutex<Vec<HostEvent>>,
}

impl RecordingHost {
    fn events(&self) -> Vec<HostEvent> {
        self.events.lock().unwrap().clone()
    }

    fn record(&self, event: HostEvent) {
        self.events.lock().unwrap().push(event);
    }
}

impl DeviceStateHost for RecordingHost {
    type Cloud = FakeCloud;

    fn cloud(&self) -> Option<Arc<FakeCloud>> {
        self.cloud.lock().unwrap().clone()
    }

    fn is_known_device(&self, key: &DeviceKey) -> bool {
        self.known.contains(key)
    }

    fn on_state_updated(&self, key: &DeviceKey, update: StateUpdate) {
        self.record(HostEvent::Updated(key.clone(), update));
    }

    fn on_state_cleared(&self, key: &DeviceKey) {
        self.record(HostEvent::Cleared(key.clone()));
    }

    fn on_all_cleared(&self) {
        self.record(HostEvent::AllCleared);
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

type Harness = (
    DeviceStateManager<RecordingHost>,
    Arc<FakeCloud>,
    Arc<RecordingHost>,
);

fn harness(cloud: FakeCloud, known: &[&str]) -> Harness {
    let cloud = Arc::new(cloud);
    let host = Arc::new(RecordingHost {
        cloud: Mutex::new(Some(Arc::clone(&cloud))),
        known: known.iter().map(|k| key(k)).collect(),
        events: Mutex::new(Vec::new()),
    });
    let config = CacheConfig {
        poll_interval: Duration::from_secs(10),
        suppression_window: Duration::from_secs(4),
    };
    let manager = DeviceStateManager::new(Arc::clone(&host), config);
    (manager, cloud, host)
}

fn key(s: &str) -> DeviceKey {
    DeviceKey::from(s)
}

fn switch_status(value: &str) -> DeviceStatus {
    let mut status = DeviceStatus::default();
    status.set(SWITCH, value, []);
    status
}

fn switch_of(manager: &DeviceStateManager<RecordingHost>, k: &DeviceKey) -> Option<Value> {
    manager.cached_state(k)?.value(SWITCH).cloned()
}

fn backoff_of(manager: &DeviceStateManager<RecordingHost>, k: &DeviceKey) -> Option<Duration> {
    manager.inner.entries.get(k).map(|e| e.backoff)
}

fn has_entry(manager: &DeviceStateManager<RecordingHost>, k: &DeviceKey) -> bool {
    manager.inner.entries.contains_key(k)
}

/// Let spawned tasks run without moving the paused clock.
async fn settle() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}

const FORCED_CHANGE: StateUpdate = StateUpdate {
    changed: true,
    forced: true,
};

const PLAIN_CHANGE: StateUpdate = StateUpdate {
    changed: true,
    forced: false,
};

// ── Subscriptions ───────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn first_subscription_fetches_and_notifies_once() {
    let (manager, cloud, host) = harness(FakeCloud::returning(switch_status("off")), &["dev1"]);
    let dev1 = key("dev1");

    manager.subscribe(&dev1);
    settle().await;

    assert_eq!(host.events(), vec![HostEvent::Updated(dev1.clone(), FORCED_CHANGE)]);
    assert_eq!(switch_of(&manager, &dev1), Some(json!("off")));
    assert_eq!(cloud.fetches(), 1);
    assert_eq!(cloud.nudges(), 1);

    // Next poll returns the same state: no notification.
    sleep(Duration::from_millis(11_100)).await;
    assert_eq!(cloud.fetches(), 2);
    assert_eq!(host.events().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn subscribe_without_client_is_a_noop() {
    let (manager, cloud, host) = harness(FakeCloud::returning(switch_status("off")), &["dev1"]);
    *host.cloud.lock().unwrap() = None;

    manager.subscribe(&key("dev1"));
    settle().await;

    assert!(!has_entry(&manager, &key("dev1")));
    assert_eq!(cloud.fetches(), 0);
    assert!(host.events().is_empty());
    assert_eq!(manager.snapshot(&key("dev1"), true).await, None);
}

#[tokio::test(start_paused = true)]
async fn subscribe_unknown_device_is_a_noop() {
    let (manager, cloud, host) = harness(FakeCloud::returning(switch_status("off")), &["dev1"]);

    manager.subscribe(&key("ghost"));
    settle().await;

    assert!(!has_entry(&manager, &key("ghost")));
    assert_eq!(cloud.fetches(), 0);
    assert!(host.events().is_empty());
}

#[tokio::test(start_paused = true)]
async fn entry_lives_while_referenced() {
    let (manager, cloud, host) = harness(FakeCloud::returning(switch_status("off")), &["dev1"]);
    let dev1 = key("dev1");

    manager.subscribe(&dev1);
    manager.subscribe(&dev1);
    settle().await;
    assert_eq!(cloud.fetches(), 1, "only the first subscriber triggers a refresh");

    manager.unsubscribe(&dev1);
    assert!(has_entry(&manager, &dev1));

    manager.unsubscribe(&dev1);
    assert!(!has_entry(&manager, &dev1));
    assert_eq!(host.events().last(), Some(&HostEvent::Cleared(dev1.clone())));

    let before = host.events().len();
    manager.unsubscribe(&dev1);
    assert_eq!(host.events().len(), before);

    // Timer was cancelled with the entry.
    sleep(Duration::from_secs(30)).await;
    assert_eq!(cloud.fetches(), 1);
}

#[tokio::test(start_paused = true)]
async fn unsubscribe_during_refresh_defers_teardown() {
    let cloud = FakeCloud::returning(switch_status("off")).with_latency(Duration::from_secs(1));
    let (manager, cloud, host) = harness(cloud, &["dev1"]);
    let dev1 = key("dev1");

    manager.subscribe(&dev1);
    settle().await;
    assert_eq!(cloud.fetches(), 1);

    manager.unsubscribe(&dev1);
    assert!(has_entry(&manager, &dev1), "entry kept while refresh in flight");
    assert!(host.events().is_empty());

    sleep(Duration::from_millis(1_100)).await;
    assert!(!has_entry(&manager, &dev1));
    assert_eq!(
        host.events(),
        vec![
            HostEvent::Updated(dev1.clone(), FORCED_CHANGE),
            HostEvent::Cleared(dev1.clone()),
        ]
    );

    sleep(Duration::from_secs(30)).await;
    assert_eq!(cloud.fetches(), 1);
}

#[tokio::test(start_paused = true)]
async fn prune_removes_unknown_devices() {
    let (manager, cloud, host) = harness(FakeCloud::returning(switch_status("off")), &["a", "b"]);

    manager.subscribe(&key("a"));
    manager.subscribe(&key("b"));
    settle().await;
    assert_eq!(cloud.fetches(), 2);

    manager.prune_unknown(&HashSet::from([key("a")]));

    assert!(has_entry(&manager, &key("a")));
    assert!(!has_entry(&manager, &key("b")));
    assert_eq!(host.events().last(), Some(&HostEvent::Cleared(key("b"))));

    sleep(Duration::from_secs(12)).await;
    assert_eq!(cloud.fetches(), 3, "only the surviving device keeps polling");
}

#[tokio::test(start_paused = true)]
async fn result_for_replaced_entry_is_discarded() {
    let cloud = FakeCloud::returning(switch_status("off")).with_latency(Duration::from_secs(1));
    let (manager, cloud, host) = harness(cloud, &["dev1"]);
    let dev1 = key("dev1");

    manager.subscribe(&dev1);
    settle().await;

    manager.prune_unknown(&HashSet::new());
    manager.subscribe(&dev1);
    settle().await;
    assert_eq!(cloud.fetches(), 2);

    sleep(Duration::from_millis(1_100)).await;

    assert_eq!(
        host.events(),
        vec![
            HostEvent::Cleared(dev1.clone()),
            HostEvent::Updated(dev1.clone(), FORCED_CHANGE),
        ]
    );
    assert!(has_entry(&manager, &dev1));
    assert_eq!(manager.inner.entries.get(&dev1).unwrap().ref_count, 1);
}

#[tokio::test(start_paused = true)]
async fn clear_all_stops_everything() {
    let (manager, cloud, host) = harness(FakeCloud::returning(switch_status("off")), &["a", "b"]);

    manager.subscribe(&key("a"));
    manager.subscribe(&key("b"));
    settle().await;

    manager.clear_all();

    assert!(manager.inner.entries.is_empty());
    assert_eq!(host.events().last(), Some(&HostEvent::AllCleared));

    sleep(Duration::from_secs(70)).await;
    assert_eq!(cloud.fetches(), 2);
}

#[tokio::test(start_paused = true)]
async fn dropping_the_manager_ends_polling() {
    let (manager, cloud, _host) = harness(FakeCloud::returning(switch_status("off")), &["dev1"]);

    manager.subscribe(&key("dev1"));
    settle().await;
    drop(manager);

    sleep(Duration::from_secs(30)).await;
    assert_eq!(cloud.fetches(), 1);
}

// ── Refresh / single-flight ─────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn concurrent_snapshots_share_one_fetch() {
    let cloud = FakeCloud::returning(switch_status("on")).with_latency(Duration::from_millis(500));
    let (manager, cloud, host) = harness(cloud, &["dev1"]);
    let dev1 = key("dev1");

    let (a, b) = tokio::join!(manager.snapshot(&dev1, true), manager.snapshot(&dev1, true));

    let (a, b) = (a.unwrap(), b.unwrap());
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(a.value(SWITCH), Some(&json!("on")));
    assert_eq!(cloud.fetches(), 1);

    // No subscribers: released once the refresh completed.
    assert!(!has_entry(&manager, &dev1));
    assert_eq!(
        host.events(),
        vec![
            HostEvent::Updated(dev1.clone(), FORCED_CHANGE),
            HostEvent::Cleared(dev1.clone()),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn refresh_joins_the_pending_operation() {
    let cloud = FakeCloud::returning(switch_status("on")).with_latency(Duration::from_millis(500));
    let (manager, cloud, _host) = harness(cloud, &["dev1"]);
    let dev1 = key("dev1");

    let mut snapshot = tokio_test::task::spawn(manager.snapshot(&dev1, true));
    assert_pending!(snapshot.poll());

    let joined = manager.refresh(&dev1, false).await.unwrap();

    assert!(snapshot.is_woken());
    let first = assert_ready!(snapshot.poll()).unwrap();
    assert!(Arc::ptr_eq(&first, &joined));
    assert_eq!(cloud.fetches(), 1);
}

#[tokio::test(start_paused = true)]
async fn snapshot_uses_cache_when_present() {
    let (manager, cloud, _host) = harness(FakeCloud::returning(switch_status("off")), &["dev1"]);
    let dev1 = key("dev1");

    manager.subscribe(&dev1);
    settle().await;

    let cached = manager.snapshot(&dev1, false).await.unwrap();
    assert_eq!(cached.value(SWITCH), Some(&json!("off")));
    assert_eq!(cloud.fetches(), 1);

    assert_eq!(manager.snapshot(&key("ghost"), false).await, None);
}

#[tokio::test(start_paused = true)]
async fn cached_state_is_stable_between_writes() {
    let (manager, _cloud, _host) = harness(FakeCloud::returning(switch_status("off")), &["dev1"]);
    let dev1 = key("dev1");

    assert_eq!(manager.cached_state(&dev1), None);

    manager.subscribe(&dev1);
    settle().await;

    let a = manager.cached_state(&dev1).unwrap();
    let b = manager.cached_state(&dev1).unwrap();
    assert!(Arc::ptr_eq(&a, &b));
}

#[tokio::test(start_paused = true)]
async fn request_refresh_ignores_devices_without_entry() {
    let (manager, cloud, _host) = harness(FakeCloud::returning(switch_status("off")), &["dev1"]);

    manager.request_refresh(&key("dev1"), true);
    settle().await;

    assert_eq!(cloud.fetches(), 0);
    assert_eq!(manager.refresh(&key("dev1"), true).await, None);
}

#[tokio::test(start_paused = true)]
async fn forced_refresh_notifies_without_change() {
    let (manager, _cloud, host) = harness(FakeCloud::returning(switch_status("off")), &["dev1"]);
    let dev1 = key("dev1");

    manager.subscribe(&dev1);
    settle().await;

    manager.request_refresh(&dev1, true);
    settle().await;

    assert_eq!(
        host.events().last(),
        Some(&HostEvent::Updated(
            dev1.clone(),
            StateUpdate {
                changed: false,
                forced: true,
            }
        ))
    );
}

// ── Backoff ─────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn failures_double_backoff_up_to_the_cap() {
    let (manager, cloud, host) = harness(FakeCloud::failing(), &["dev1"]);
    let dev1 = key("dev1");

    manager.subscribe(&dev1);
    settle().await;
    assert_eq!(cloud.fetches(), 1);
    assert_eq!(backoff_of(&manager, &dev1), Some(Duration::from_secs(20)));

    sleep(Duration::from_secs(22)).await;
    assert_eq!(cloud.fetches(), 2);
    assert_eq!(backoff_of(&manager, &dev1), Some(Duration::from_secs(40)));

    sleep(Duration::from_secs(44)).await;
    assert_eq!(cloud.fetches(), 3);
    assert_eq!(backoff_of(&manager, &dev1), Some(Duration::from_secs(60)));

    sleep(Duration::from_secs(66)).await;
    assert_eq!(cloud.fetches(), 4);
    assert_eq!(backoff_of(&manager, &dev1), Some(Duration::from_secs(60)));

    assert!(host.events().is_empty(), "failures never notify");

    // Next attempt lands in [180 s, 187 s]; stop before the 10 s poll after it.
    cloud.set_fallback(Ok(switch_status("on")));
    sleep(Duration::from_secs(56)).await;
    assert_eq!(cloud.fetches(), 5);
    assert_eq!(backoff_of(&manager, &dev1), Some(Duration::from_secs(10)));
    assert_eq!(host.events(), vec![HostEvent::Updated(dev1.clone(), PLAIN_CHANGE)]);
}

#[tokio::test(start_paused = true)]
async fn failure_keeps_last_known_good() {
    let (manager, cloud, host) = harness(FakeCloud::failing(), &["dev1"]);
    let dev1 = key("dev1");
    cloud.push(Ok(switch_status("off")));

    manager.subscribe(&dev1);
    settle().await;
    assert_eq!(switch_of(&manager, &dev1), Some(json!("off")));

    sleep(Duration::from_millis(11_100)).await;
    assert_eq!(cloud.fetches(), 2);
    assert_eq!(switch_of(&manager, &dev1), Some(json!("off")));
    assert_eq!(backoff_of(&manager, &dev1), Some(Duration::from_secs(20)));
    assert_eq!(host.events().len(), 1);
}

// ── Poll interval ───────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn poll_interval_change_rearms_active_devices() {
    let (manager, cloud, _host) =
        harness(FakeCloud::returning(switch_status("off")), &["dev1", "dev2"]);

    manager.subscribe(&key("dev1"));
    manager.subscribe(&key("dev2"));
    settle().await;
    assert_eq!(cloud.fetches(), 2);

    for k in ["dev1", "dev2"] {
        manager.inner.entries.get_mut(&key(k)).unwrap().backoff = Duration::from_secs(40);
    }

    assert_eq!(
        manager.set_poll_interval(Some(Duration::from_secs(2))),
        Duration::from_secs(2)
    );
    for k in ["dev1", "dev2"] {
        assert_eq!(backoff_of(&manager, &key(k)), Some(Duration::from_secs(2)));
    }

    sleep(Duration::from_millis(2_300)).await;
    assert_eq!(cloud.fetches(), 4);
    assert_eq!(manager.poll_interval(), Duration::from_secs(2));
}

#[tokio::test(start_paused = true)]
async fn poll_interval_is_normalized() {
    let (manager, _cloud, _host) = harness(FakeCloud::returning(switch_status("off")), &[]);

    assert_eq!(manager.set_poll_interval(None), Duration::from_secs(10));
    assert_eq!(
        manager.set_poll_interval(Some(Duration::from_millis(100))),
        Duration::from_secs(1)
    );
    assert_eq!(
        manager.set_poll_interval(Some(Duration::from_secs(3_600))),
        Duration::from_secs(60)
    );
    assert_eq!(manager.poll_interval(), Duration::from_secs(60));
}

// ── Optimistic updates ──────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn optimistic_value_survives_early_poll() {
    let (manager, cloud, host) = harness(FakeCloud::returning(switch_status("off")), &["dev1"]);
    let dev1 = key("dev1");

    manager.subscribe(&dev1);
    settle().await;

    manager.optimistic_set_attribute(&dev1, SWITCH, "on", []);
    assert_eq!(switch_of(&manager, &dev1), Some(json!("on")));
    assert_eq!(host.events().last(), Some(&HostEvent::Updated(dev1.clone(), FORCED_CHANGE)));

    // Poll 1 s into the 4 s window still reports "off".
    sleep(Duration::from_secs(1)).await;
    let after = manager.refresh(&dev1, false).await.unwrap();
    assert_eq!(after.value(SWITCH), Some(&json!("on")));
    assert_eq!(cloud.fetches(), 2);
    assert_eq!(backoff_of(&manager, &dev1), Some(Duration::from_secs(3)));
    assert_eq!(host.events().len(), 2);

    // Next poll is scheduled no earlier than the end of the window.
    sleep(Duration::from_millis(2_900)).await;
    assert_eq!(cloud.fetches(), 2);

    sleep(Duration::from_millis(600)).await;
    assert_eq!(cloud.fetches(), 3);
    assert_eq!(switch_of(&manager, &dev1), Some(json!("off")));
    assert_eq!(host.events().last(), Some(&HostEvent::Updated(dev1.clone(), PLAIN_CHANGE)));
    assert_eq!(manager.inner.entries.get(&dev1).unwrap().suppress_until, None);
}

#[tokio::test(start_paused = true)]
async fn optimistic_value_survives_poll_already_in_flight() {
    let cloud = FakeCloud::returning(switch_status("off")).with_latency(Duration::from_millis(500));
    let (manager, cloud, host) = harness(cloud, &["dev1"]);
    let dev1 = key("dev1");

    manager.subscribe(&dev1);
    sleep(Duration::from_millis(600)).await;
    assert_eq!(cloud.fetches(), 1);

    // The poll starts before the write and lands 500 ms into the window.
    let mut poll = tokio_test::task::spawn(manager.refresh(&dev1, false));
    assert_pending!(poll.poll());
    manager.optimistic_set_attribute(&dev1, SWITCH, "on", []);

    sleep(Duration::from_millis(600)).await;
    let after = assert_ready!(poll.poll()).unwrap();

    assert_eq!(after.value(SWITCH), Some(&json!("on")));
    assert_eq!(switch_of(&manager, &dev1), Some(json!("on")));
    assert_eq!(cloud.fetches(), 2);
    assert_eq!(backoff_of(&manager, &dev1), Some(Duration::from_millis(3_500)));
    assert_eq!(
        host.events(),
        vec![
            HostEvent::Updated(dev1.clone(), FORCED_CHANGE),
            HostEvent::Updated(dev1.clone(), FORCED_CHANGE),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn forced_joiner_upgrades_pending_notification() {
    let cloud = FakeCloud::returning(switch_status("off")).with_latency(Duration::from_millis(500));
    let (manager, cloud, host) = harness(cloud, &["dev1"]);
    let dev1 = key("dev1");

    manager.subscribe(&dev1);
    sleep(Duration::from_millis(600)).await;

    let mut quiet = tokio_test::task::spawn(manager.refresh(&dev1, false));
    assert_pending!(quiet.poll());
    let forced = manager.refresh(&dev1, true).await.unwrap();

    let first = assert_ready!(quiet.poll()).unwrap();
    assert!(Arc::ptr_eq(&first, &forced));
    assert_eq!(cloud.fetches(), 2);
    assert_eq!(
        host.events().last(),
        Some(&HostEvent::Updated(
            dev1.clone(),
            StateUpdate {
                changed: false,
                forced: true,
            }
        ))
    );
    assert_eq!(host.events().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn failed_mutation_leaves_cache_untouched() {
    let (manager, _cloud, host) = harness(FakeCloud::returning(switch_status("off")), &["dev1"]);
    let dev1 = key("dev1");

    manager.subscribe(&dev1);
    settle().await;

    manager.apply_optimistic(&dev1, |status| {
        status.set(SWITCH, "on", []);
        Err(CoreError::Validation {
            message: "volume is not numeric".into(),
        })
    });

    assert_eq!(switch_of(&manager, &dev1), Some(json!("off")));
    assert_eq!(host.events().len(), 1);
    assert_eq!(manager.inner.entries.get(&dev1).unwrap().suppress_until, None);
}

#[tokio::test(start_paused = true)]
async fn optimistic_write_without_subscribers_is_released() {
    let (manager, cloud, host) = harness(FakeCloud::returning(switch_status("off")), &["dev1"]);
    let dev1 = key("dev1");

    manager.optimistic_set_attribute(&dev1, SWITCH, "on", [("source".to_owned(), json!("ui"))]);

    assert!(!has_entry(&manager, &dev1));
    assert_eq!(
        host.events(),
        vec![
            HostEvent::Updated(dev1.clone(), FORCED_CHANGE),
            HostEvent::Cleared(dev1.clone()),
        ]
    );
    assert_eq!(cloud.fetches(), 0);
}

#[tokio::test(start_paused = true)]
async fn optimistic_write_for_unknown_device_is_ignored() {
    let (manager, _cloud, host) = harness(FakeCloud::returning(switch_status("off")), &["dev1"]);

    manager.optimistic_set_attribute(&key("ghost"), SWITCH, "on", []);

    assert!(!has_entry(&manager, &key("ghost")));
    assert!(host.events().is_empty());
}
