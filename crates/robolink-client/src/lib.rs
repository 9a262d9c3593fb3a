//! Client library for remote robots.
//!
//! [`RobotClient`] dials a robot over gRPC, caches its resources as typed
//! stubs and keeps the cache current with three background loops:
//!
//! - **liveness**: probes the robot and marks the client disconnected when
//!   probes keep failing
//! - **reconnect**: re-dials while disconnected
//! - **refresh**: re-lists resources and rebuilds the stub cache
//!
//! Each loop is scheduled with a [`PollInterval`] in [`ClientOptions`].
//! The transport sits behind the [`Dialer`] and [`RobotConnection`] traits;
//! [`mock::MockRobot`] implements them in memory for tests.

pub mod client;
pub mod components;
pub mod connection;
pub mod error;
pub mod grpc;
pub mod mock;
pub mod options;
mod poller;
pub mod resource;
pub mod state;
pub mod transport;

pub use client::RobotClient;
pub use components::{
    build_stub, ArmClient, BaseClient, ComponentCall, ComponentReply, GenericClient,
    GripperClient, MotorClient, Pose, ResourceClient, SensorClient,
};
pub use connection::{
    normalize_url, resolve_address, AddressError, AddressSource, RobotAddress,
    DEFAULT_ROBOT_PORT, DEFAULT_ROBOT_URL, ROBOT_URL_ENV,
};
pub use error::{friendly_error_message, ClientError, Result};
pub use grpc::{ChannelConfig, GrpcDialer};
pub use options::{ClientOptions, PollInterval};
pub use resource::{ResourceName, ResourceSnapshot};
pub use state::{ClientState, ConnectionTracker};
pub use transport::{Dialer, RobotConnection, RobotVersion, RpcGate};
