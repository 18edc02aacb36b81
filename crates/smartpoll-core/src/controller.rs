// ── Controller ──
//
// Lifecycle for one SmartThings account: builds the API client from
// credentials, loads the device list, hosts the device-state cache, routes
// commands, and republishes cache notifications and refreshed tokens to
// consumers.

use std::collections::HashSet;
use std::sync::{Arc, Weak};
use std::time::Duration;

use arc_swap::{ArcSwap, ArcSwapOption};
use secrecy::SecretString;
use smartpoll_api::{OAuthClient, SmartThingsClient, TokenSet, TransportConfig};
use strum::Display;
use tokio::sync::{Mutex, broadcast, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cache::{DeviceStateHost, DeviceStateManager, StateUpdate};
use crate::cloud::DeviceCloud;
use crate::command::{
    Command, CommandResult, input_command, mute_command, mute_value, power_command, power_value,
    volume_command,
};
use crate::config::{AuthCredentials, ControllerConfig};
use crate::error::CoreError;
use crate::model::{Device, DeviceKey, DeviceStatus};
use crate::values::{self, DeviceValues};

const EVENT_CHANNEL_SIZE: usize = 256;

// ── ConnectionState ──────────────────────────────────────────────

/// Connection state observable by consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    /// No usable credentials.
    AuthenticationFailure,
    Failed,
}

/// Cache notifications, republished for any number of consumers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateEvent {
    Updated { device: DeviceKey, update: StateUpdate },
    Cleared { device: DeviceKey },
    AllCleared,
}

// ── Session (cache host) ─────────────────────────────────────────

/// Client and device list the cache consults, plus the event fan-out.
pub struct Session {
    client: ArcSwapOption<SmartThingsClient>,
    devices: ArcSwap<Vec<Arc<Device>>>,
    events: broadcast::Sender<StateEvent>,
}

impl Session {
    fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_SIZE);
        Self {
            client: ArcSwapOption::empty(),
            devices: ArcSwap::from_pointee(Vec::new()),
            events,
        }
    }

    fn device(&self, key: &DeviceKey) -> Option<Arc<Device>> {
        self.devices.load().iter().find(|d| &d.key == key).cloned()
    }
}

impl DeviceStateHost for Session {
    type Cloud = SmartThingsClient;

    fn cloud(&self) -> Option<Arc<SmartThingsClient>> {
        self.client.load_full()
    }

    fn is_known_device(&self, key: &DeviceKey) -> bool {
        self.devices.load().iter().any(|d| &d.key == key)
    }

    fn on_state_updated(&self, key: &DeviceKey, update: StateUpdate) {
        let _ = self.events.send(StateEvent::Updated {
            device: key.clone(),
            update,
        });
    }

    fn on_state_cleared(&self, key: &DeviceKey) {
        let _ = self.events.send(StateEvent::Cleared {
            device: key.clone(),
        });
    }

    fn on_all_cleared(&self) {
        let _ = self.events.send(StateEvent::AllCleared);
    }
}

// ── Controller ───────────────────────────────────────────────────

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc<ControllerInner>`.
#[derive(Clone)]
pub struct Controller {
    inner: Arc<ControllerInner>,
}

struct ControllerInner {
    config: ControllerConfig,
    session: Arc<Session>,
    cache: DeviceStateManager<Session>,
    connection_state: watch::Sender<ConnectionState>,
    tokens: watch::Sender<Option<Arc<TokenSet>>>,
    cancel: Mutex<CancellationToken>,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Controller {
    /// Create a controller. Does NOT connect -- call
    /// [`connect()`](Self::connect) to authenticate and load devices.
    pub fn new(config: ControllerConfig) -> Self {
        let session = Arc::new(Session::new());
        let cache = DeviceStateManager::new(Arc::clone(&session), config.cache);
        let (connection_state, _) = watch::channel(ConnectionState::Disconnected);
        let (tokens, _) = watch::channel(None);

        Self {
            inner: Arc::new(ControllerInner {
                config,
                session,
                cache,
                connection_state,
                tokens,
                cancel: Mutex::new(CancellationToken::new()),
                task_handles: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.inner.config
    }

    /// The device-state cache hosted by this controller.
    pub fn cache(&self) -> &DeviceStateManager<Session> {
        &self.inner.cache
    }

    // ── Connection lifecycle ─────────────────────────────────────

    /// Build the client, load the device list, and prune cache entries for
    /// devices that disappeared.
    ///
    /// Without credentials the controller drops any previous client, clears
    /// the cache and reports [`ConnectionState::AuthenticationFailure`].
    pub async fn connect(&self) -> Result<(), CoreError> {
        self.inner
            .connection_state
            .send_replace(ConnectionState::Connecting);

        let client = match self.build_client() {
            Ok(client) => client,
            Err(e) => {
                self.inner.connection_state.send_replace(ConnectionState::Failed);
                return Err(e);
            }
        };
        let Some(client) = client else {
            self.inner.session.client.store(None);
            self.inner.session.devices.store(Arc::new(Vec::new()));
            self.inner.cache.clear_all();
            self.inner
                .connection_state
                .send_replace(ConnectionState::AuthenticationFailure);
            warn!("no credentials configured");
            return Err(CoreError::NotAuthenticated);
        };
        let client = Arc::new(client);

        let devices = match DeviceCloud::list_devices(client.as_ref()).await {
            Ok(devices) => devices,
            Err(e) => {
                self.inner.connection_state.send_replace(ConnectionState::Failed);
                return Err(e);
            }
        };
        let known: HashSet<DeviceKey> = devices.iter().map(|d| d.key.clone()).collect();
        let count = devices.len();

        self.inner.session.client.store(Some(Arc::clone(&client)));
        self.inner
            .session
            .devices
            .store(Arc::new(devices.into_iter().map(Arc::new).collect()));
        self.inner.cache.prune_unknown(&known);

        self.spawn_token_forwarder(&client).await;

        self.inner
            .connection_state
            .send_replace(ConnectionState::Connected);
        info!(devices = count, "connected to SmartThings");
        Ok(())
    }

    /// Stop background tasks, clear the cache and drop the client.
    pub async fn disconnect(&self) {
        self.inner.cancel.lock().await.cancel();

        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }
        drop(handles);

        self.inner.cache.clear_all();
        self.inner.session.client.store(None);
        self.inner
            .connection_state
            .send_replace(ConnectionState::Disconnected);
        debug!("disconnected");
    }

    fn build_client(&self) -> Result<Option<SmartThingsClient>, CoreError> {
        let config = &self.inner.config;
        let transport = TransportConfig {
            timeout: config.timeout,
        };

        let (tokens, oauth) = match &config.auth {
            AuthCredentials::None => return Ok(None),
            AuthCredentials::AccessToken(token) => (bearer(token.clone()), None),
            AuthCredentials::OAuth {
                client_id,
                client_secret,
                access_token,
                refresh_token,
                expires_at,
            } => {
                let oauth = OAuthClient::new(client_id.clone(), client_secret.clone(), &transport)?;
                let tokens = TokenSet {
                    access_token: access_token.clone(),
                    refresh_token: refresh_token.clone(),
                    expires_at: *expires_at,
                };
                if tokens.is_expired() {
                    debug!("stored access token expired, relying on refresh");
                }
                (tokens, Some(oauth))
            }
        };

        let client = SmartThingsClient::new(config.api_url.as_str(), tokens, oauth, &transport)?;
        Ok(Some(client))
    }

    /// Republish tokens refreshed by `client` until the next disconnect.
    async fn spawn_token_forwarder(&self, client: &Arc<SmartThingsClient>) {
        let cancel = {
            let mut guard = self.inner.cancel.lock().await;
            guard.cancel();
            *guard = CancellationToken::new();
            guard.clone()
        };

        let mut updates = client.token_updates();
        let inner = Arc::downgrade(&self.inner);
        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => {
                        // a refresh may have raced the shutdown
                        if updates.has_changed().unwrap_or(false) {
                            forward_tokens(&inner, &mut updates);
                        }
                        break;
                    }
                    changed = updates.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        forward_tokens(&inner, &mut updates);
                    }
                }
            }
        });
        self.inner.task_handles.lock().await.push(handle);
    }

    // ── State observation ────────────────────────────────────────

    pub fn connection_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.connection_state.subscribe()
    }

    /// Subscribe to cache notifications.
    pub fn events(&self) -> broadcast::Receiver<StateEvent> {
        self.inner.session.events.subscribe()
    }

    /// Token sets obtained by automatic refresh, for persisting.
    pub fn token_updates(&self) -> watch::Receiver<Option<Arc<TokenSet>>> {
        self.inner.tokens.subscribe()
    }

    // ── Devices ──────────────────────────────────────────────────

    pub fn devices_snapshot(&self) -> Arc<Vec<Arc<Device>>> {
        self.inner.session.devices.load_full()
    }

    pub fn device(&self, key: &DeviceKey) -> Option<Arc<Device>> {
        self.inner.session.device(key)
    }

    pub fn is_known_device(&self, key: &DeviceKey) -> bool {
        self.inner.session.is_known_device(key)
    }

    /// `name`, then `label`, then `presentation_id`, then the key.
    pub fn device_display_name(&self, key: &DeviceKey) -> String {
        self.device(key)
            .map(|d| d.display_name().to_owned())
            .unwrap_or_else(|| key.to_string())
    }

    // ── Cache passthrough ────────────────────────────────────────

    pub fn subscribe(&self, key: &DeviceKey) {
        self.inner.cache.subscribe(key);
    }

    pub fn unsubscribe(&self, key: &DeviceKey) {
        self.inner.cache.unsubscribe(key);
    }

    pub fn cached_state(&self, key: &DeviceKey) -> Option<Arc<DeviceStatus>> {
        self.inner.cache.cached_state(key)
    }

    pub async fn snapshot(
        &self,
        key: &DeviceKey,
        force_refresh: bool,
    ) -> Option<Arc<DeviceStatus>> {
        self.inner.cache.snapshot(key, force_refresh).await
    }

    pub fn request_refresh(&self, key: &DeviceKey, force_notify: bool) {
        self.inner.cache.request_refresh(key, force_notify);
    }

    pub fn set_poll_interval(&self, value: Option<Duration>) -> Duration {
        self.inner.cache.set_poll_interval(value)
    }

    pub fn poll_interval(&self) -> Duration {
        self.inner.cache.poll_interval()
    }

    /// Variable values for `key`, empty strings when nothing is cached.
    pub fn device_values(&self, key: &DeviceKey) -> DeviceValues {
        DeviceValues::from_status(self.cached_state(key).as_deref())
    }

    // ── Command execution ────────────────────────────────────────

    pub async fn execute(&self, cmd: Command) -> Result<CommandResult, CoreError> {
        let client = self
            .inner
            .session
            .cloud()
            .ok_or(CoreError::NotAuthenticated)?;
        let device = cmd.device().clone();
        if !self.is_known_device(&device) {
            return Err(CoreError::DeviceNotFound {
                identifier: device.to_string(),
            });
        }
        debug!(device = %device, ?cmd, "executing command");
        route_command(self, client.as_ref(), &device, cmd).await
    }
}

// ── Command routing ──────────────────────────────────────────────

async fn route_command(
    controller: &Controller,
    client: &SmartThingsClient,
    device: &DeviceKey,
    cmd: Command,
) -> Result<CommandResult, CoreError> {
    let cache = &controller.inner.cache;

    match cmd {
        Command::SetPower { on, .. } => {
            client.send_command(device, power_command(on)).await?;
            cache.optimistic_set_attribute(device, values::POWER, power_value(on), []);
            Ok(CommandResult::Power { on })
        }

        Command::TogglePower { .. } => {
            let status = current_status(controller, client, device).await?;
            let on = !values::power_on(&status);
            client.send_command(device, power_command(on)).await?;
            cache.optimistic_set_attribute(device, values::POWER, power_value(on), []);
            cache.request_refresh(device, true);
            Ok(CommandResult::Power { on })
        }

        Command::SetMute { muted, .. } => {
            client.send_command(device, mute_command(muted)).await?;
            cache.optimistic_set_attribute(device, values::MUTE, mute_value(muted), []);
            Ok(CommandResult::Mute { muted })
        }

        Command::ToggleMute { .. } => {
            let status = current_status(controller, client, device).await?;
            let muted = !values::muted(&status);
            client.send_command(device, mute_command(muted)).await?;
            cache.optimistic_set_attribute(device, values::MUTE, mute_value(muted), []);
            cache.request_refresh(device, true);
            Ok(CommandResult::Mute { muted })
        }

        Command::SelectInput { input, .. } => {
            if input.trim().is_empty() {
                return Err(CoreError::Validation {
                    message: "input source must not be empty".into(),
                });
            }
            client.send_command(device, input_command(&input)).await?;
            // the device takes ids or names; the cache stores the id
            let source = cache
                .snapshot(device, false)
                .await
                .and_then(|status| values::find_input_source(&status, &input))
                .map_or(input, |s| s.id);
            cache.optimistic_set_attribute(device, values::INPUT_SOURCE, source.clone(), []);
            Ok(CommandResult::Input { source })
        }

        Command::Volume { direction, .. } => {
            client.send_command(device, volume_command(direction)).await?;
            cache.request_refresh(device, true);
            Ok(CommandResult::Volume {
                direction: direction.to_string(),
            })
        }
    }
}

/// Fresh status for a toggle decision: a forced snapshot, falling back to a
/// direct fetch when the cache cannot provide one.
async fn current_status(
    controller: &Controller,
    client: &SmartThingsClient,
    device: &DeviceKey,
) -> Result<Arc<DeviceStatus>, CoreError> {
    if let Some(status) = controller.inner.cache.snapshot(device, true).await {
        return Ok(status);
    }
    debug!(device = %device, "no snapshot available, fetching status directly");
    Ok(Arc::new(client.fetch_status(device).await?))
}

fn forward_tokens(inner: &Weak<ControllerInner>, updates: &mut watch::Receiver<Arc<TokenSet>>) {
    let tokens = updates.borrow_and_update().clone();
    if let Some(inner) = inner.upgrade() {
        debug!("forwarding refreshed token set");
        inner.tokens.send_replace(Some(tokens));
    }
}

fn bearer(token: SecretString) -> TokenSet {
    TokenSet {
        access_token: token,
        refresh_token: None,
        expires_at: None,
    }
}
