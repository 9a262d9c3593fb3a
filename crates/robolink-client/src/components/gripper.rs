//! Gripper client.

use robolink_proto::paths;

use super::{ComponentCall, ComponentReply};
use crate::error::{ClientError, Result};
use crate::resource::ResourceName;
use crate::transport::RpcGate;

/// Client for a remote gripper.
#[derive(Debug, Clone)]
pub struct GripperClient {
    name: ResourceName,
    gate: RpcGate,
}

impl GripperClient {
    pub(crate) fn new(name: ResourceName, gate: RpcGate) -> Self {
        Self { name, gate }
    }

    /// Resource name.
    #[must_use]
    pub fn name(&self) -> &ResourceName {
        &self.name
    }

    /// Open the jaws.
    pub async fn open(&self) -> Result<()> {
        let call = ComponentCall::GripperOpen {
            name: self.name.name.clone(),
        };
        self.gate.invoke(call).await?.empty(paths::GRIPPER_OPEN)
    }

    /// Close the jaws. Returns whether something was grabbed.
    pub async fn grab(&self) -> Result<bool> {
        let call = ComponentCall::GripperGrab {
            name: self.name.name.clone(),
        };
        match self.gate.invoke(call).await? {
            ComponentReply::Grabbed(success) => Ok(success),
            _ => Err(ClientError::UnexpectedReply {
                method: paths::GRIPPER_GRAB,
            }),
        }
    }

    /// Stop the gripper.
    pub async fn stop(&self) -> Result<()> {
        let call = ComponentCall::GripperStop {
            name: self.name.name.clone(),
        };
        self.gate.invoke(call).await?.empty(paths::GRIPPER_STOP)
    }
}
