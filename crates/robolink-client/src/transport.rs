//! Transport seams between the lifecycle logic and the wire.
//!
//! The background loops and the facade only ever talk to [`Dialer`] and
//! [`RobotConnection`]. The gRPC implementation lives in [`crate::grpc`];
//! tests use [`crate::mock`].

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::components::{ComponentCall, ComponentReply};
use crate::connection::RobotAddress;
use crate::error::{ClientError, Result};
use crate::resource::ResourceName;
use crate::state::ConnectionTracker;

/// Version information reported by a robot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RobotVersion {
    /// Platform identifier (e.g. `rdk`).
    pub platform: String,
    /// Server build version.
    pub version: String,
    /// API revision the server speaks.
    pub api_version: String,
}

impl fmt::Display for RobotVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} (api {})",
            self.platform, self.version, self.api_version
        )
    }
}

/// Establishes connections to a robot.
#[async_trait]
pub trait Dialer: Send + Sync + 'static {
    /// Dial `address`. Timeouts are applied by the caller.
    async fn dial(&self, address: &RobotAddress) -> Result<Arc<dyn RobotConnection>>;
}

/// An open connection to a robot.
#[async_trait]
pub trait RobotConnection: Send + Sync + 'static {
    /// List the robot's resources.
    async fn resource_names(&self) -> Result<Vec<ResourceName>>;

    /// Lightweight liveness probe.
    async fn check_health(&self) -> Result<()>;

    /// Forward a component call.
    async fn invoke(&self, call: ComponentCall) -> Result<ComponentReply>;

    /// Stop every actuator on the robot.
    async fn stop_all(&self) -> Result<()>;

    /// Query the robot's version.
    async fn version(&self) -> Result<RobotVersion>;

    /// Release the transport. Must be safe to call more than once.
    async fn close(&self);
}

/// The client's current connection, replaced on reconnect.
#[derive(Default)]
pub struct ConnectionSlot {
    inner: RwLock<Option<Arc<dyn RobotConnection>>>,
}

impl ConnectionSlot {
    /// Current connection, if any.
    #[must_use]
    pub fn get(&self) -> Option<Arc<dyn RobotConnection>> {
        self.inner.read().clone()
    }

    /// Install `conn` and return the connection it replaced.
    ///
    /// The closed check runs under the slot lock, so a connection is never
    /// installed after [`ConnectionTracker::close`] followed by
    /// [`ConnectionSlot::take`]. If `tracker` is closed, `conn` is handed
    /// back untouched.
    pub fn install(
        &self,
        conn: Arc<dyn RobotConnection>,
        tracker: &ConnectionTracker,
    ) -> std::result::Result<Option<Arc<dyn RobotConnection>>, Arc<dyn RobotConnection>> {
        let mut slot = self.inner.write();
        if tracker.is_closed() {
            return Err(conn);
        }
        Ok(slot.replace(conn))
    }

    /// Empty the slot.
    pub fn take(&self) -> Option<Arc<dyn RobotConnection>> {
        self.inner.write().take()
    }
}

impl fmt::Debug for ConnectionSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionSlot")
            .field("occupied", &self.inner.read().is_some())
            .finish()
    }
}

/// Gate every outgoing call passes through.
///
/// Checks the tracker before touching the transport and always resolves the
/// slot's *current* connection, so stubs survive reconnects.
#[derive(Clone)]
pub struct RpcGate {
    tracker: Arc<ConnectionTracker>,
    slot: Arc<ConnectionSlot>,
    address: Arc<str>,
}

impl RpcGate {
    /// Create a gate over shared client state.
    #[must_use]
    pub fn new(tracker: Arc<ConnectionTracker>, slot: Arc<ConnectionSlot>, address: &str) -> Self {
        Self {
            tracker,
            slot,
            address: Arc::from(address),
        }
    }

    /// The connection to use for a call, or why there is none.
    pub fn connection(&self) -> Result<Arc<dyn RobotConnection>> {
        if self.tracker.is_closed() {
            return Err(ClientError::Closed);
        }
        if !self.tracker.is_connected() {
            return Err(self.unavailable());
        }
        self.slot.get().ok_or_else(|| self.unavailable())
    }

    /// Forward a component call.
    pub async fn invoke(&self, call: ComponentCall) -> Result<ComponentReply> {
        let conn = self.connection()?;
        conn.invoke(call).await
    }

    fn unavailable(&self) -> ClientError {
        ClientError::Unavailable {
            address: self.address.to_string(),
        }
    }
}

impl fmt::Debug for RpcGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RpcGate")
            .field("address", &self.address)
            .field("state", &self.tracker.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::AddressSource;
    use crate::mock::MockRobot;

    fn address() -> RobotAddress {
        RobotAddress::parse("mock:8080", AddressSource::UserInput).unwrap()
    }

    #[tokio::test]
    async fn test_install_refused_once_closed() {
        let robot = MockRobot::new(Vec::new());
        let dialer = robot.dialer();
        let tracker = ConnectionTracker::new(false);
        let slot = ConnectionSlot::default();

        let first = dialer.dial(&address()).await.unwrap();
        assert!(matches!(slot.install(first, &tracker), Ok(None)));
        let second = dialer.dial(&address()).await.unwrap();
        assert!(matches!(slot.install(second, &tracker), Ok(Some(_))));

        tracker.close();
        let late = dialer.dial(&address()).await.unwrap();
        assert!(slot.install(late, &tracker).is_err());

        // The slot still holds the last accepted connection
        assert!(slot.take().is_some());
        assert!(slot.get().is_none());
    }

    #[tokio::test]
    async fn test_gate_checks_tracker_before_transport() {
        let robot = MockRobot::new(Vec::new());
        let tracker = Arc::new(ConnectionTracker::new(false));
        let slot = Arc::new(ConnectionSlot::default());
        let conn = robot.dialer().dial(&address()).await.unwrap();
        assert!(slot.install(conn, &tracker).is_ok());
        let gate = RpcGate::new(Arc::clone(&tracker), slot, "http://mock:8080");

        let call = ComponentCall::ArmStop { name: "arm1".into() };
        let err = gate.invoke(call.clone()).await.unwrap_err();
        assert!(matches!(err, ClientError::Unavailable { .. }), "got {err:?}");

        tracker.set_connected(true);
        assert_eq!(gate.invoke(call.clone()).await.unwrap(), ComponentReply::Empty);

        tracker.close();
        assert!(matches!(gate.invoke(call).await, Err(ClientError::Closed)));
        assert_eq!(robot.counts().invokes, 1);
    }
}
