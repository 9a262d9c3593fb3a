//! Sensor client returning named readings.

use std::collections::HashMap;

use robolink_proto::paths;

use super::{ComponentCall, ComponentReply};
use crate::error::{ClientError, Result};
use crate::resource::ResourceName;
use crate::transport::RpcGate;

/// Client for a remote sensor.
#[derive(Debug, Clone)]
pub struct SensorClient {
    name: ResourceName,
    gate: RpcGate,
}

impl SensorClient {
    pub(crate) fn new(name: ResourceName, gate: RpcGate) -> Self {
        Self { name, gate }
    }

    /// Resource name.
    #[must_use]
    pub fn name(&self) -> &ResourceName {
        &self.name
    }

    /// Latest readings keyed by channel.
    pub async fn readings(&self) -> Result<HashMap<String, f64>> {
        let call = ComponentCall::SensorGetReadings {
            name: self.name.name.clone(),
        };
        match self.gate.invoke(call).await? {
            ComponentReply::Readings(readings) => Ok(readings),
            _ => Err(ClientError::UnexpectedReply {
                method: paths::SENSOR_GET_READINGS,
            }),
        }
    }
}
