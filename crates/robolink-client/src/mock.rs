//! In-memory robot for exercising the client without a network.
//!
//! [`MockRobot`] counts every call that reaches it, so tests can assert
//! that gated calls never touch the transport. [`MockRobot::sever`] drops
//! every open connection and refuses new dials until
//! [`MockRobot::restore`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::components::{ComponentCall, ComponentReply, Pose};
use crate::connection::RobotAddress;
use crate::error::{ClientError, Result};
use crate::resource::ResourceName;
use crate::transport::{Dialer, RobotConnection, RobotVersion};

/// Number of calls that reached the mock, per operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    /// Dial attempts, successful or not.
    pub dials: usize,
    /// Resource listings.
    pub listings: usize,
    /// Health probes.
    pub health_checks: usize,
    /// Component calls.
    pub invokes: usize,
    /// `StopAll` calls.
    pub stop_alls: usize,
    /// Version queries.
    pub versions: usize,
}

#[derive(Default)]
struct Counters {
    dials: AtomicUsize,
    listings: AtomicUsize,
    health_checks: AtomicUsize,
    invokes: AtomicUsize,
    stop_alls: AtomicUsize,
    versions: AtomicUsize,
}

/// A scriptable in-memory robot.
#[derive(Default)]
pub struct MockRobot {
    resources: Mutex<Vec<ResourceName>>,
    severed: AtomicBool,
    /// Bumped on every sever; connections from older generations are dead.
    generation: AtomicU64,
    listing_error: Mutex<Option<tonic::Status>>,
    health_error: Mutex<Option<tonic::Status>>,
    replies: Mutex<HashMap<&'static str, ComponentReply>>,
    calls: Mutex<Vec<ComponentCall>>,
    dial_delay: Mutex<Duration>,
    /// Connections handed out and not yet closed.
    open: AtomicUsize,
    counters: Counters,
}

impl MockRobot {
    /// A reachable robot hosting `resources`.
    pub fn new(resources: impl IntoIterator<Item = ResourceName>) -> Arc<Self> {
        let robot = Self::default();
        *robot.resources.lock() = resources.into_iter().collect();
        Arc::new(robot)
    }

    /// A dialer connecting to this robot.
    #[must_use]
    pub fn dialer(self: &Arc<Self>) -> Arc<dyn Dialer> {
        Arc::new(MockDialer {
            robot: Arc::clone(self),
        })
    }

    /// Kill open connections and refuse dials.
    pub fn sever(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.severed.store(true, Ordering::Release);
    }

    /// Accept dials again. Connections killed by [`MockRobot::sever`] stay dead.
    pub fn restore(&self) {
        self.severed.store(false, Ordering::Release);
    }

    /// Whether the robot is currently unreachable.
    #[must_use]
    pub fn is_severed(&self) -> bool {
        self.severed.load(Ordering::Acquire)
    }

    /// Replace the resource list served to future listings.
    pub fn set_resources(&self, resources: impl IntoIterator<Item = ResourceName>) {
        *self.resources.lock() = resources.into_iter().collect();
    }

    /// Make listings fail with `status` until cleared with `None`.
    pub fn fail_listing(&self, status: Option<tonic::Status>) {
        *self.listing_error.lock() = status;
    }

    /// Make health probes fail with `status` until cleared with `None`.
    pub fn fail_health(&self, status: Option<tonic::Status>) {
        *self.health_error.lock() = status;
    }

    /// Make every later dial take `delay` before it resolves.
    pub fn set_dial_delay(&self, delay: Duration) {
        *self.dial_delay.lock() = delay;
    }

    /// Connections dialed and not yet closed by the client.
    #[must_use]
    pub fn open_connections(&self) -> usize {
        self.open.load(Ordering::SeqCst)
    }

    /// Reply with `reply` to every call of `method`.
    pub fn set_reply(&self, method: &'static str, reply: ComponentReply) {
        self.replies.lock().insert(method, reply);
    }

    /// Snapshot of the call counters.
    #[must_use]
    pub fn counts(&self) -> CallCounts {
        let c = &self.counters;
        CallCounts {
            dials: c.dials.load(Ordering::SeqCst),
            listings: c.listings.load(Ordering::SeqCst),
            health_checks: c.health_checks.load(Ordering::SeqCst),
            invokes: c.invokes.load(Ordering::SeqCst),
            stop_alls: c.stop_alls.load(Ordering::SeqCst),
            versions: c.versions.load(Ordering::SeqCst),
        }
    }

    /// Component calls received so far, oldest first.
    #[must_use]
    pub fn calls(&self) -> Vec<ComponentCall> {
        self.calls.lock().clone()
    }

    fn default_reply(call: &ComponentCall) -> ComponentReply {
        match call {
            ComponentCall::ArmGetEndPosition { .. } => ComponentReply::Pose(Pose::default()),
            ComponentCall::ArmGetJointPositions { .. } => ComponentReply::JointPositions(Vec::new()),
            ComponentCall::GripperGrab { .. } => ComponentReply::Grabbed(true),
            ComponentCall::MotorGetPosition { .. } => ComponentReply::Position(0.0),
            ComponentCall::MotorIsPowered { .. } => ComponentReply::Powered {
                is_on: false,
                power_pct: 0.0,
            },
            ComponentCall::SensorGetReadings { .. } => ComponentReply::Readings(HashMap::new()),
            _ => ComponentReply::Empty,
        }
    }
}

struct MockDialer {
    robot: Arc<MockRobot>,
}

#[async_trait]
impl Dialer for MockDialer {
    async fn dial(&self, address: &RobotAddress) -> Result<Arc<dyn RobotConnection>> {
        self.robot.counters.dials.fetch_add(1, Ordering::SeqCst);
        let delay = *self.robot.dial_delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if self.robot.is_severed() {
            return Err(ClientError::Dial {
                address: address.to_string(),
                message: "connection refused".to_string(),
            });
        }
        self.robot.open.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(MockConnection {
            robot: Arc::clone(&self.robot),
            generation: self.robot.generation.load(Ordering::Acquire),
            closed: AtomicBool::new(false),
        }))
    }
}

struct MockConnection {
    robot: Arc<MockRobot>,
    generation: u64,
    closed: AtomicBool,
}

impl MockConnection {
    fn ensure_alive(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(ClientError::Closed);
        }
        if self.robot.is_severed()
            || self.robot.generation.load(Ordering::Acquire) != self.generation
        {
            return Err(ClientError::Rpc(tonic::Status::unavailable(
                "transport is closing",
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl RobotConnection for MockConnection {
    async fn resource_names(&self) -> Result<Vec<ResourceName>> {
        self.robot.counters.listings.fetch_add(1, Ordering::SeqCst);
        self.ensure_alive()?;
        if let Some(status) = self.robot.listing_error.lock().clone() {
            return Err(ClientError::Rpc(status));
        }
        Ok(self.robot.resources.lock().clone())
    }

    async fn check_health(&self) -> Result<()> {
        self.robot.counters.health_checks.fetch_add(1, Ordering::SeqCst);
        self.ensure_alive()?;
        match self.robot.health_error.lock().clone() {
            Some(status) => Err(ClientError::Rpc(status)),
            None => Ok(()),
        }
    }

    async fn invoke(&self, call: ComponentCall) -> Result<ComponentReply> {
        self.robot.counters.invokes.fetch_add(1, Ordering::SeqCst);
        self.ensure_alive()?;
        let reply = self
            .robot
            .replies
            .lock()
            .get(call.method())
            .cloned()
            .unwrap_or_else(|| MockRobot::default_reply(&call));
        self.robot.calls.lock().push(call);
        Ok(reply)
    }

    async fn stop_all(&self) -> Result<()> {
        self.robot.counters.stop_alls.fetch_add(1, Ordering::SeqCst);
        self.ensure_alive()
    }

    async fn version(&self) -> Result<RobotVersion> {
        self.robot.counters.versions.fetch_add(1, Ordering::SeqCst);
        self.ensure_alive()?;
        Ok(RobotVersion {
            platform: "mock".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            api_version: "v1".to_string(),
        })
    }

    async fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            self.robot.open.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn address() -> RobotAddress {
        RobotAddress::parse("mock:8080", crate::AddressSource::UserInput).unwrap()
    }

    #[tokio::test]
    async fn test_sever_kills_existing_connections() {
        let robot = MockRobot::new([ResourceName::component("arm", "arm1")]);
        let dialer = robot.dialer();
        let conn = dialer.dial(&address()).await.unwrap();
        assert_eq!(conn.resource_names().await.unwrap().len(), 1);

        robot.sever();
        assert!(conn.check_health().await.unwrap_err().is_transport_failure());
        assert!(dialer.dial(&address()).await.is_err());

        robot.restore();
        assert!(conn.check_health().await.is_err());
        let fresh = dialer.dial(&address()).await.unwrap();
        assert!(fresh.check_health().await.is_ok());

        let counts = robot.counts();
        assert_eq!(counts.dials, 3);
        assert_eq!(counts.health_checks, 3);
    }

    #[tokio::test]
    async fn test_scripted_replies_and_call_log() {
        let robot = MockRobot::new(Vec::new());
        robot.set_reply(
            robolink_proto::paths::MOTOR_GET_POSITION,
            ComponentReply::Position(4.5),
        );
        let conn = robot.dialer().dial(&address()).await.unwrap();

        let reply = conn
            .invoke(ComponentCall::MotorGetPosition { name: "m1".into() })
            .await
            .unwrap();
        assert_eq!(reply, ComponentReply::Position(4.5));
        assert_eq!(robot.calls().len(), 1);

        assert_eq!(robot.open_connections(), 1);
        conn.close().await;
        conn.close().await;
        assert_eq!(robot.open_connections(), 0);
        assert!(matches!(
            conn.stop_all().await.unwrap_err(),
            ClientError::Closed
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dial_delay() {
        let robot = MockRobot::new(Vec::new());
        robot.set_dial_delay(std::time::Duration::from_secs(3));

        let started = tokio::time::Instant::now();
        robot.dialer().dial(&address()).await.unwrap();
        assert!(started.elapsed() >= std::time::Duration::from_secs(3));
    }
}
