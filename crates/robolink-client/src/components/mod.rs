//! Typed component stubs.
//!
//! A stub is a thin handle holding a resource name and an [`RpcGate`]. Calls
//! are expressed as [`ComponentCall`] values keyed by gRPC method path, and
//! answered with [`ComponentReply`] values; the transport dispatches on the
//! variant.

mod arm;
mod base;
mod gripper;
mod motor;
mod sensor;

use std::collections::HashMap;

use robolink_proto::paths;

pub use arm::ArmClient;
pub use base::BaseClient;
pub use gripper::GripperClient;
pub use motor::MotorClient;
pub use robolink_proto::component::common::Pose;
pub use sensor::SensorClient;

use crate::error::{ClientError, Result};
use crate::resource::{ResourceName, KIND_COMPONENT};
use crate::transport::RpcGate;

/// Subtype strings of the built-in components.
pub mod subtype {
    /// Robotic arm.
    pub const ARM: &str = "arm";
    /// Mobile base.
    pub const BASE: &str = "base";
    /// Gripper.
    pub const GRIPPER: &str = "gripper";
    /// Motor.
    pub const MOTOR: &str = "motor";
    /// Generic sensor.
    pub const SENSOR: &str = "sensor";
}

/// One component RPC, with its arguments.
///
/// `name` is the target resource's `name` part as listed by the robot,
/// remote prefixes included.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq)]
pub enum ComponentCall {
    ArmGetEndPosition { name: String },
    ArmMoveToPosition { name: String, to: Pose },
    ArmGetJointPositions { name: String },
    ArmMoveToJointPositions { name: String, positions: Vec<f64> },
    ArmStop { name: String },
    BaseMoveStraight { name: String, distance_mm: i64, mm_per_sec: f64 },
    BaseSpin { name: String, angle_deg: f64, degs_per_sec: f64 },
    BaseStop { name: String },
    GripperOpen { name: String },
    GripperGrab { name: String },
    GripperStop { name: String },
    MotorSetPower { name: String, power_pct: f64 },
    MotorGoFor { name: String, rpm: f64, revolutions: f64 },
    MotorGetPosition { name: String },
    MotorIsPowered { name: String },
    MotorStop { name: String },
    SensorGetReadings { name: String },
}

impl ComponentCall {
    /// gRPC method path of the call.
    #[must_use]
    pub fn method(&self) -> &'static str {
        match self {
            Self::ArmGetEndPosition { .. } => paths::ARM_GET_END_POSITION,
            Self::ArmMoveToPosition { .. } => paths::ARM_MOVE_TO_POSITION,
            Self::ArmGetJointPositions { .. } => paths::ARM_GET_JOINT_POSITIONS,
            Self::ArmMoveToJointPositions { .. } => paths::ARM_MOVE_TO_JOINT_POSITIONS,
            Self::ArmStop { .. } => paths::ARM_STOP,
            Self::BaseMoveStraight { .. } => paths::BASE_MOVE_STRAIGHT,
            Self::BaseSpin { .. } => paths::BASE_SPIN,
            Self::BaseStop { .. } => paths::BASE_STOP,
            Self::GripperOpen { .. } => paths::GRIPPER_OPEN,
            Self::GripperGrab { .. } => paths::GRIPPER_GRAB,
            Self::GripperStop { .. } => paths::GRIPPER_STOP,
            Self::MotorSetPower { .. } => paths::MOTOR_SET_POWER,
            Self::MotorGoFor { .. } => paths::MOTOR_GO_FOR,
            Self::MotorGetPosition { .. } => paths::MOTOR_GET_POSITION,
            Self::MotorIsPowered { .. } => paths::MOTOR_IS_POWERED,
            Self::MotorStop { .. } => paths::MOTOR_STOP,
            Self::SensorGetReadings { .. } => paths::SENSOR_GET_READINGS,
        }
    }

    /// Target resource name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::ArmGetEndPosition { name }
            | Self::ArmMoveToPosition { name, .. }
            | Self::ArmGetJointPositions { name }
            | Self::ArmMoveToJointPositions { name, .. }
            | Self::ArmStop { name }
            | Self::BaseMoveStraight { name, .. }
            | Self::BaseSpin { name, .. }
            | Self::BaseStop { name }
            | Self::GripperOpen { name }
            | Self::GripperGrab { name }
            | Self::GripperStop { name }
            | Self::MotorSetPower { name, .. }
            | Self::MotorGoFor { name, .. }
            | Self::MotorGetPosition { name }
            | Self::MotorIsPowered { name }
            | Self::MotorStop { name }
            | Self::SensorGetReadings { name } => name,
        }
    }
}

/// Decoded reply to a [`ComponentCall`].
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq)]
pub enum ComponentReply {
    /// Call with an empty response message.
    Empty,
    Pose(Pose),
    JointPositions(Vec<f64>),
    Grabbed(bool),
    Position(f64),
    Powered { is_on: bool, power_pct: f64 },
    Readings(HashMap<String, f64>),
}

impl ComponentReply {
    fn empty(self, method: &'static str) -> Result<()> {
        match self {
            Self::Empty => Ok(()),
            _ => Err(ClientError::UnexpectedReply { method }),
        }
    }
}

/// Stub for a resource of a subtype this client has no typed API for.
#[derive(Debug, Clone)]
pub struct GenericClient {
    name: ResourceName,
}

impl GenericClient {
    /// Create a generic stub.
    #[must_use]
    pub fn new(name: ResourceName) -> Self {
        Self { name }
    }

    /// Resource name.
    #[must_use]
    pub fn name(&self) -> &ResourceName {
        &self.name
    }
}

/// A cached per-resource stub.
#[allow(missing_docs)]
#[derive(Debug, Clone)]
pub enum ResourceClient {
    Arm(ArmClient),
    Base(BaseClient),
    Gripper(GripperClient),
    Motor(MotorClient),
    Sensor(SensorClient),
    Generic(GenericClient),
}

impl ResourceClient {
    /// Name of the underlying resource.
    #[must_use]
    pub fn name(&self) -> &ResourceName {
        match self {
            Self::Arm(c) => c.name(),
            Self::Base(c) => c.name(),
            Self::Gripper(c) => c.name(),
            Self::Motor(c) => c.name(),
            Self::Sensor(c) => c.name(),
            Self::Generic(c) => c.name(),
        }
    }

    /// Subtype served by this stub.
    #[must_use]
    pub fn subtype(&self) -> &str {
        &self.name().subtype
    }
}

/// Build the stub for `name`.
///
/// Components of a known subtype get a typed stub; everything else, services
/// included, gets a [`GenericClient`].
pub fn build_stub(name: ResourceName, gate: RpcGate) -> Result<ResourceClient> {
    name.validate()?;
    if name.kind != KIND_COMPONENT {
        return Ok(ResourceClient::Generic(GenericClient::new(name)));
    }
    let stub = match name.subtype.as_str() {
        subtype::ARM => ResourceClient::Arm(ArmClient::new(name, gate)),
        subtype::BASE => ResourceClient::Base(BaseClient::new(name, gate)),
        subtype::GRIPPER => ResourceClient::Gripper(GripperClient::new(name, gate)),
        subtype::MOTOR => ResourceClient::Motor(MotorClient::new(name, gate)),
        subtype::SENSOR => ResourceClient::Sensor(SensorClient::new(name, gate)),
        _ => ResourceClient::Generic(GenericClient::new(name)),
    };
    Ok(stub)
}
