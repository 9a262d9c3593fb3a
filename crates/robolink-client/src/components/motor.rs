//! Motor client: power, relative moves and position.

use robolink_proto::paths;

use super::{ComponentCall, ComponentReply};
use crate::error::{ClientError, Result};
use crate::resource::ResourceName;
use crate::transport::RpcGate;

/// Client for a remote motor.
#[derive(Debug, Clone)]
pub struct MotorClient {
    name: ResourceName,
    gate: RpcGate,
}

impl MotorClient {
    pub(crate) fn new(name: ResourceName, gate: RpcGate) -> Self {
        Self { name, gate }
    }

    /// Resource name.
    #[must_use]
    pub fn name(&self) -> &ResourceName {
        &self.name
    }

    /// Set power as a fraction in `[-1.0, 1.0]`.
    pub async fn set_power(&self, power_pct: f64) -> Result<()> {
        let call = ComponentCall::MotorSetPower {
            name: self.name.name.clone(),
            power_pct,
        };
        self.gate.invoke(call).await?.empty(paths::MOTOR_SET_POWER)
    }

    /// Spin for `revolutions` at `rpm`. Zero revolutions spins indefinitely.
    pub async fn go_for(&self, rpm: f64, revolutions: f64) -> Result<()> {
        let call = ComponentCall::MotorGoFor {
            name: self.name.name.clone(),
            rpm,
            revolutions,
        };
        self.gate.invoke(call).await?.empty(paths::MOTOR_GO_FOR)
    }

    /// Position in revolutions relative to the home position.
    pub async fn position(&self) -> Result<f64> {
        let call = ComponentCall::MotorGetPosition {
            name: self.name.name.clone(),
        };
        match self.gate.invoke(call).await? {
            ComponentReply::Position(position) => Ok(position),
            _ => Err(ClientError::UnexpectedReply {
                method: paths::MOTOR_GET_POSITION,
            }),
        }
    }

    /// Whether the motor is powered, and at what power.
    pub async fn is_powered(&self) -> Result<(bool, f64)> {
        let call = ComponentCall::MotorIsPowered {
            name: self.name.name.clone(),
        };
        match self.gate.invoke(call).await? {
            ComponentReply::Powered { is_on, power_pct } => Ok((is_on, power_pct)),
            _ => Err(ClientError::UnexpectedReply {
                method: paths::MOTOR_IS_POWERED,
            }),
        }
    }

    /// Cut power.
    pub async fn stop(&self) -> Result<()> {
        let call = ComponentCall::MotorStop {
            name: self.name.name.clone(),
        };
        self.gate.invoke(call).await?.empty(paths::MOTOR_STOP)
    }
}
