//! Remote robot client.
//!
//! [`RobotClient`] dials a robot, caches its resources as typed stubs, and
//! keeps the cache and the connected flag current in the background.
//!
//! # Example
//!
//! ```no_run
//! use robolink_client::{ClientOptions, PollInterval, RobotAddress, RobotClient};
//! use std::time::Duration;
//!
//! # async fn example() -> robolink_client::Result<()> {
//! let address: RobotAddress = "192.168.1.42:8080".parse()?;
//! let options = ClientOptions::default()
//!     .with_check_connected_every(PollInterval::Every(Duration::from_secs(10)))
//!     .with_reconnect_every(PollInterval::Every(Duration::from_secs(1)));
//! let client = RobotClient::connect(address, options).await?;
//!
//! for name in client.resource_names() {
//!     println!("{name}");
//! }
//! let arm = client.arm("arm1")?;
//! println!("{:?}", arm.end_position().await?);
//!
//! client.close().await;
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::{watch, Mutex};
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};

use crate::components::{
    build_stub, subtype, ArmClient, BaseClient, GripperClient, MotorClient, ResourceClient,
    SensorClient,
};
use crate::connection::RobotAddress;
use crate::error::{ClientError, Result};
use crate::grpc::{ChannelConfig, GrpcDialer};
use crate::options::ClientOptions;
use crate::poller::Poller;
use crate::resource::{ResourceName, ResourceSnapshot};
use crate::state::{ClientState, ConnectionTracker};
use crate::transport::{ConnectionSlot, Dialer, RobotConnection, RobotVersion, RpcGate};

type ParentNotifier = Arc<dyn Fn() + Send + Sync>;

/// State shared between the facade and the background loops.
pub(crate) struct ClientInner {
    address: RobotAddress,
    options: ClientOptions,
    dialer: Arc<dyn Dialer>,
    tracker: Arc<ConnectionTracker>,
    slot: Arc<ConnectionSlot>,
    gate: RpcGate,
    snapshot: RwLock<Arc<ResourceSnapshot>>,
    /// Serializes snapshot rebuilds so swaps land in call order.
    refresh_lock: Mutex<()>,
    parent_notifier: RwLock<Option<ParentNotifier>>,
}

impl ClientInner {
    pub(crate) fn options(&self) -> &ClientOptions {
        &self.options
    }

    async fn dial(&self) -> Result<Arc<dyn RobotConnection>> {
        match timeout(self.options.dial_timeout, self.dialer.dial(&self.address)).await {
            Ok(result) => result,
            Err(_) => Err(ClientError::Dial {
                address: self.address.to_string(),
                message: format!("timed out after {:?}", self.options.dial_timeout),
            }),
        }
    }

    fn notify_parent(&self) {
        let notifier = self.parent_notifier.read().clone();
        if let Some(notify) = notifier {
            notify();
        }
    }

    /// Rebuild the resource snapshot from a fresh listing.
    ///
    /// On failure the previous snapshot stays in place.
    async fn refresh(&self) -> Result<()> {
        let _guard = self.refresh_lock.lock().await;
        let conn = self.gate.connection()?;
        let listing = timeout(self.options.rpc_timeout, conn.resource_names())
            .await
            .map_err(|_| ClientError::Timeout("listing resources".to_string()))??;

        let snapshot = ResourceSnapshot::build(listing, |name| {
            build_stub(name.clone(), self.gate.clone())
        })?;
        let mut current = self.snapshot.write();
        // Checked under the snapshot lock so close always has the last word
        if self.tracker.is_closed() {
            return Err(ClientError::Closed);
        }
        debug!(address = %self.address, resources = snapshot.len(), "Resource snapshot rebuilt");
        *current = Arc::new(snapshot);
        Ok(())
    }

    /// Dial, install the new connection and refresh.
    async fn reconnect(&self) -> Result<()> {
        if self.tracker.is_closed() {
            return Err(ClientError::Closed);
        }
        let conn = self.dial().await?;
        match self.slot.install(conn, &self.tracker) {
            Ok(Some(old)) => old.close().await,
            Ok(None) => {}
            Err(conn) => {
                // Closed while dialing
                conn.close().await;
                return Err(ClientError::Closed);
            }
        }
        if self.tracker.set_connected(true) {
            info!(address = %self.address, "Reconnected to robot");
            self.notify_parent();
        }
        if self.options.refresh_every.is_enabled() {
            self.refresh().await?;
        }
        Ok(())
    }

    pub(crate) async fn reconnect_tick(&self) {
        if self.tracker.is_connected() {
            return;
        }
        if let Err(e) = self.reconnect().await {
            debug!(address = %self.address, error = %e, "Reconnect attempt failed");
        }
    }

    pub(crate) async fn refresh_tick(&self) {
        if !self.tracker.is_connected() {
            return;
        }
        if let Err(e) = self.refresh().await {
            warn!(address = %self.address, error = %e, "Failed to refresh resources");
        }
    }

    /// Probe the robot; on final failure mark the client disconnected.
    pub(crate) async fn check_liveness(&self) {
        if !self.tracker.is_connected() {
            return;
        }
        let Some(conn) = self.slot.get() else {
            return;
        };
        let probe_timeout = self.options.probe_timeout();
        let attempts = self.options.liveness_attempts.max(1);

        let mut last_error = None;
        for attempt in 1..=attempts {
            match timeout(probe_timeout, conn.check_health()).await {
                Ok(Ok(())) => {
                    self.tracker.mark_checked();
                    return;
                }
                Ok(Err(e)) => {
                    let fatal = e.is_transport_failure();
                    debug!(address = %self.address, attempt, error = %e, "Health check failed");
                    last_error = Some(e);
                    if fatal {
                        break;
                    }
                }
                Err(_) => {
                    debug!(address = %self.address, attempt, "Health check timed out");
                    last_error = Some(ClientError::Timeout(format!(
                        "health check after {probe_timeout:?}"
                    )));
                }
            }
        }

        if self.tracker.set_connected(false) {
            let error = last_error.map(|e| e.to_string()).unwrap_or_default();
            warn!(address = %self.address, error = %error, "Lost connection to robot");
            self.notify_parent();
        }
    }
}

/// Client for one remote robot.
///
/// Cheap reads (`is_connected`, `resource_names`, `resource_by_name`) never
/// block on the network. RPC wrappers fail with
/// [`ClientError::Unavailable`] while disconnected without touching the
/// transport.
pub struct RobotClient {
    inner: Arc<ClientInner>,
    poller: Mutex<Option<Poller>>,
}

impl RobotClient {
    /// Dial `address` over gRPC.
    pub async fn connect(address: RobotAddress, options: ClientOptions) -> Result<Self> {
        let dialer = GrpcDialer::new(ChannelConfig::from_timeouts(
            options.dial_timeout,
            options.rpc_timeout,
        ));
        Self::with_dialer(address, options, Arc::new(dialer)).await
    }

    /// Dial `address` with a caller-supplied dialer.
    ///
    /// Fails if the first dial fails, or if the initial resource listing
    /// fails while refreshing is enabled.
    #[instrument(skip_all, fields(address = %address))]
    pub async fn with_dialer(
        address: RobotAddress,
        options: ClientOptions,
        dialer: Arc<dyn Dialer>,
    ) -> Result<Self> {
        if let Err(reason) = options.validate() {
            return Err(ClientError::InvalidOptions(reason));
        }

        let tracker = Arc::new(ConnectionTracker::new(false));
        let slot = Arc::new(ConnectionSlot::default());
        let gate = RpcGate::new(Arc::clone(&tracker), Arc::clone(&slot), address.as_str());
        let inner = Arc::new(ClientInner {
            address,
            options,
            dialer,
            tracker,
            slot,
            gate,
            snapshot: RwLock::new(Arc::new(ResourceSnapshot::empty())),
            refresh_lock: Mutex::new(()),
            parent_notifier: RwLock::new(None),
        });

        let conn = inner.dial().await?;
        if let Err(conn) = inner.slot.install(conn, &inner.tracker) {
            conn.close().await;
            return Err(ClientError::Closed);
        }
        inner.tracker.set_connected(true);

        let refreshed = inner.options.refresh_every.is_enabled();
        if refreshed {
            if let Err(e) = inner.refresh().await {
                if let Some(conn) = inner.slot.take() {
                    conn.close().await;
                }
                inner.tracker.close();
                return Err(e);
            }
        }

        info!(
            resources = inner.snapshot.read().len(),
            "Connected to robot"
        );
        let poller = Poller::start(Arc::clone(&inner), refreshed);
        Ok(Self {
            inner,
            poller: Mutex::new(Some(poller)),
        })
    }

    /// Address this client dials.
    #[must_use]
    pub fn address(&self) -> &RobotAddress {
        &self.inner.address
    }

    /// Options the client was built with.
    #[must_use]
    pub fn options(&self) -> &ClientOptions {
        &self.inner.options
    }

    /// Whether the transport is currently believed healthy.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.inner.tracker.is_connected()
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ClientState {
        self.inner.tracker.state()
    }

    /// Subscribe to connected/disconnected transitions.
    ///
    /// The channel ends when the client is closed.
    #[must_use]
    pub fn changed(&self) -> watch::Receiver<bool> {
        self.inner.tracker.changed()
    }

    /// Register a callback run after every reconnect and every detected
    /// connection loss. Replaces any previous callback.
    pub fn set_parent_notifier<F>(&self, notify: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        *self.inner.parent_notifier.write() = Some(Arc::new(notify));
    }

    /// Names of the robot's resources. Empty while disconnected.
    #[must_use]
    pub fn resource_names(&self) -> Vec<ResourceName> {
        if !self.is_connected() {
            return Vec::new();
        }
        self.inner.snapshot.read().names().to_vec()
    }

    /// Cached stub for `name`, by full name or unique short name.
    ///
    /// A cached stub is returned even while disconnected; its calls then
    /// fail with [`ClientError::Unavailable`].
    pub fn resource_by_name(&self, name: &ResourceName) -> Result<ResourceClient> {
        if self.inner.tracker.is_closed() {
            return Err(ClientError::Closed);
        }
        self.inner
            .snapshot
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| ClientError::NotFound(name.clone()))
    }

    fn component(&self, kind: &'static str, name: &str) -> Result<ResourceClient> {
        let wanted = ResourceName::component(kind, name);
        match self.resource_by_name(&wanted) {
            Err(ClientError::NotFound(_)) => {}
            other => return other,
        }
        let snapshot = Arc::clone(&self.inner.snapshot.read());
        match snapshot.find_by_name(name) {
            Some(found) => Err(ClientError::WrongKind {
                name: found.name().clone(),
                expected: kind,
                actual: found.subtype().to_string(),
            }),
            None => Err(ClientError::NotFound(wanted)),
        }
    }

    /// Arm named `name`.
    pub fn arm(&self, name: &str) -> Result<ArmClient> {
        match self.component(subtype::ARM, name)? {
            ResourceClient::Arm(arm) => Ok(arm),
            other => Err(wrong_kind(&other, subtype::ARM)),
        }
    }

    /// Base named `name`.
    pub fn base(&self, name: &str) -> Result<BaseClient> {
        match self.component(subtype::BASE, name)? {
            ResourceClient::Base(base) => Ok(base),
            other => Err(wrong_kind(&other, subtype::BASE)),
        }
    }

    /// Gripper named `name`.
    pub fn gripper(&self, name: &str) -> Result<GripperClient> {
        match self.component(subtype::GRIPPER, name)? {
            ResourceClient::Gripper(gripper) => Ok(gripper),
            other => Err(wrong_kind(&other, subtype::GRIPPER)),
        }
    }

    /// Motor named `name`.
    pub fn motor(&self, name: &str) -> Result<MotorClient> {
        match self.component(subtype::MOTOR, name)? {
            ResourceClient::Motor(motor) => Ok(motor),
            other => Err(wrong_kind(&other, subtype::MOTOR)),
        }
    }

    /// Sensor named `name`.
    pub fn sensor(&self, name: &str) -> Result<SensorClient> {
        match self.component(subtype::SENSOR, name)? {
            ResourceClient::Sensor(sensor) => Ok(sensor),
            other => Err(wrong_kind(&other, subtype::SENSOR)),
        }
    }

    /// Re-list resources now.
    pub async fn refresh(&self) -> Result<()> {
        self.inner.refresh().await
    }

    /// Dial again now, replacing the current connection.
    pub async fn connect_now(&self) -> Result<()> {
        self.inner.reconnect().await
    }

    /// Stop every actuator on the robot.
    pub async fn stop_all(&self) -> Result<()> {
        let conn = self.inner.gate.connection()?;
        conn.stop_all().await
    }

    /// Version reported by the robot.
    pub async fn version(&self) -> Result<RobotVersion> {
        let conn = self.inner.gate.connection()?;
        conn.version().await
    }

    /// Stop the background loops, close the transport and drop the cached
    /// resources. Safe to call more than once.
    pub async fn close(&self) {
        let poller = self.poller.lock().await.take();
        let Some(mut poller) = poller else {
            return;
        };
        // Before the slot is emptied: installs check the tracker under the slot lock
        self.inner.tracker.close();
        debug!(loops = poller.active_loops(), "Stopping background loops");
        poller.shutdown().await;

        if let Some(conn) = self.inner.slot.take() {
            conn.close().await;
        }
        *self.inner.snapshot.write() = Arc::new(ResourceSnapshot::empty());
        info!(address = %self.inner.address, "Robot client closed");
    }
}

fn wrong_kind(found: &ResourceClient, expected: &'static str) -> ClientError {
    ClientError::WrongKind {
        name: found.name().clone(),
        expected,
        actual: found.subtype().to_string(),
    }
}

impl fmt::Debug for RobotClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RobotClient")
            .field("address", &self.inner.address.as_str())
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}
