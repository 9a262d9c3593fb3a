//! Mobile base client.

use robolink_proto::paths;

use super::ComponentCall;
use crate::error::Result;
use crate::resource::ResourceName;
use crate::transport::RpcGate;

/// Client for a remote mobile base.
#[derive(Debug, Clone)]
pub struct BaseClient {
    name: ResourceName,
    gate: RpcGate,
}

impl BaseClient {
    pub(crate) fn new(name: ResourceName, gate: RpcGate) -> Self {
        Self { name, gate }
    }

    /// Resource name.
    #[must_use]
    pub fn name(&self) -> &ResourceName {
        &self.name
    }

    /// Drive straight. Negative distances move backwards.
    pub async fn move_straight(&self, distance_mm: i64, mm_per_sec: f64) -> Result<()> {
        let call = ComponentCall::BaseMoveStraight {
            name: self.name.name.clone(),
            distance_mm,
            mm_per_sec,
        };
        self.gate.invoke(call).await?.empty(paths::BASE_MOVE_STRAIGHT)
    }

    /// Turn in place. Positive angles turn counter-clockwise.
    pub async fn spin(&self, angle_deg: f64, degs_per_sec: f64) -> Result<()> {
        let call = ComponentCall::BaseSpin {
            name: self.name.name.clone(),
            angle_deg,
            degs_per_sec,
        };
        self.gate.invoke(call).await?.empty(paths::BASE_SPIN)
    }

    /// Stop the base.
    pub async fn stop(&self) -> Result<()> {
        let call = ComponentCall::BaseStop {
            name: self.name.name.clone(),
        };
        self.gate.invoke(call).await?.empty(paths::BASE_STOP)
    }
}
