//! Arm client: end pose and joint moves.

use robolink_proto::paths;

use super::{ComponentCall, ComponentReply, Pose};
use crate::error::{ClientError, Result};
use crate::resource::ResourceName;
use crate::transport::RpcGate;

/// Client for a remote arm.
#[derive(Debug, Clone)]
pub struct ArmClient {
    name: ResourceName,
    gate: RpcGate,
}

impl ArmClient {
    pub(crate) fn new(name: ResourceName, gate: RpcGate) -> Self {
        Self { name, gate }
    }

    /// Resource name.
    #[must_use]
    pub fn name(&self) -> &ResourceName {
        &self.name
    }

    /// Current pose of the end effector.
    pub async fn end_position(&self) -> Result<Pose> {
        let call = ComponentCall::ArmGetEndPosition {
            name: self.name.name.clone(),
        };
        match self.gate.invoke(call).await? {
            ComponentReply::Pose(pose) => Ok(pose),
            _ => Err(ClientError::UnexpectedReply {
                method: paths::ARM_GET_END_POSITION,
            }),
        }
    }

    /// Move the end effector to `to`.
    pub async fn move_to_position(&self, to: Pose) -> Result<()> {
        let call = ComponentCall::ArmMoveToPosition {
            name: self.name.name.clone(),
            to,
        };
        self.gate
            .invoke(call)
            .await?
            .empty(paths::ARM_MOVE_TO_POSITION)
    }

    /// Joint angles in degrees, base first.
    pub async fn joint_positions(&self) -> Result<Vec<f64>> {
        let call = ComponentCall::ArmGetJointPositions {
            name: self.name.name.clone(),
        };
        match self.gate.invoke(call).await? {
            ComponentReply::JointPositions(values) => Ok(values),
            _ => Err(ClientError::UnexpectedReply {
                method: paths::ARM_GET_JOINT_POSITIONS,
            }),
        }
    }

    /// Move every joint to the given angles.
    pub async fn move_to_joint_positions(&self, positions: Vec<f64>) -> Result<()> {
        let call = ComponentCall::ArmMoveToJointPositions {
            name: self.name.name.clone(),
            positions,
        };
        self.gate
            .invoke(call)
            .await?
            .empty(paths::ARM_MOVE_TO_JOINT_POSITIONS)
    }

    /// Stop any motion in progress.
    pub async fn stop(&self) -> Result<()> {
        let call = ComponentCall::ArmStop {
            name: self.name.name.clone(),
        };
        self.gate.invoke(call).await?.empty(paths::ARM_STOP)
    }
}
