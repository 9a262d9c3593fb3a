//! gRPC transport over tonic.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use robolink_proto::component::arm::arm_service_client::ArmServiceClient;
use robolink_proto::component::base::base_service_client::BaseServiceClient;
use robolink_proto::component::gripper::gripper_service_client::GripperServiceClient;
use robolink_proto::component::motor::motor_service_client::MotorServiceClient;
use robolink_proto::component::sensor::sensor_service_client::SensorServiceClient;
use robolink_proto::component::{arm, base, common, gripper, motor, sensor};
use robolink_proto::health::health_client::HealthClient;
use robolink_proto::robot::robot_service_client::RobotServiceClient;
use robolink_proto::{health, robot, MAX_MESSAGE_SIZE};
use tonic::transport::Channel;
use tracing::{debug, trace};

use crate::components::{ComponentCall, ComponentReply};
use crate::connection::RobotAddress;
use crate::error::{ClientError, Result};
use crate::resource::ResourceName;
use crate::transport::{Dialer, RobotConnection, RobotVersion};

/// Channel configuration for robot connections.
///
/// Keepalive settings let the liveness loop see a dead peer quickly instead
/// of waiting for TCP timeouts.
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// How long to wait for the TCP/HTTP2 handshake.
    pub connect_timeout: Duration,
    /// Default deadline for individual RPCs.
    pub request_timeout: Duration,
    /// HTTP/2 keepalive interval.
    pub keepalive_interval: Duration,
    /// How long to wait for a keepalive ack.
    pub keepalive_timeout: Duration,
    /// Send keepalive pings even when idle.
    pub keepalive_while_idle: bool,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(20),
            request_timeout: Duration::from_secs(30),
            keepalive_interval: Duration::from_secs(10),
            keepalive_timeout: Duration::from_secs(20),
            keepalive_while_idle: true,
        }
    }
}

impl ChannelConfig {
    /// Derive channel settings from client timeouts.
    #[must_use]
    pub fn from_timeouts(dial_timeout: Duration, rpc_timeout: Duration) -> Self {
        Self {
            connect_timeout: dial_timeout,
            request_timeout: rpc_timeout.max(Self::default().request_timeout),
            ..Self::default()
        }
    }
}

/// Dials robots over gRPC.
#[derive(Debug, Clone, Default)]
pub struct GrpcDialer {
    config: ChannelConfig,
}

impl GrpcDialer {
    /// Create a dialer with custom channel settings.
    #[must_use]
    pub fn new(config: ChannelConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Dialer for GrpcDialer {
    async fn dial(&self, address: &RobotAddress) -> Result<Arc<dyn RobotConnection>> {
        let dial_err = |message: String| ClientError::Dial {
            address: address.to_string(),
            message,
        };
        let endpoint = Channel::from_shared(address.as_str().to_string())
            .map_err(|e| dial_err(format!("invalid URI: {e}")))?
            .connect_timeout(self.config.connect_timeout)
            .timeout(self.config.request_timeout)
            .http2_keep_alive_interval(self.config.keepalive_interval)
            .keep_alive_timeout(self.config.keepalive_timeout)
            .keep_alive_while_idle(self.config.keepalive_while_idle)
            .tcp_nodelay(true);

        let channel = endpoint
            .connect()
            .await
            .map_err(|e| dial_err(e.to_string()))?;
        debug!(address = %address, "gRPC channel established");

        Ok(Arc::new(GrpcConnection {
            channel,
            closed: AtomicBool::new(false),
        }))
    }
}

/// A robot connection backed by one tonic channel.
///
/// Service clients are built per call from clones of the channel; clones
/// share the underlying HTTP/2 connection.
pub struct GrpcConnection {
    channel: Channel,
    closed: AtomicBool,
}

impl GrpcConnection {
    /// The channel handle for one call, unless the connection was closed.
    fn channel(&self) -> Result<Channel> {
        if self.closed.load(Ordering::Acquire) {
            return Err(ClientError::Closed);
        }
        Ok(self.channel.clone())
    }

    fn robot(&self) -> Result<RobotServiceClient<Channel>> {
        Ok(RobotServiceClient::new(self.channel()?).max_decoding_message_size(MAX_MESSAGE_SIZE))
    }

    fn arm(&self) -> Result<ArmServiceClient<Channel>> {
        Ok(ArmServiceClient::new(self.channel()?).max_decoding_message_size(MAX_MESSAGE_SIZE))
    }

    fn base(&self) -> Result<BaseServiceClient<Channel>> {
        Ok(BaseServiceClient::new(self.channel()?).max_decoding_message_size(MAX_MESSAGE_SIZE))
    }

    fn gripper(&self) -> Result<GripperServiceClient<Channel>> {
        Ok(GripperServiceClient::new(self.channel()?).max_decoding_message_size(MAX_MESSAGE_SIZE))
    }

    fn motor(&self) -> Result<MotorServiceClient<Channel>> {
        Ok(MotorServiceClient::new(self.channel()?).max_decoding_message_size(MAX_MESSAGE_SIZE))
    }

    fn sensor(&self) -> Result<SensorServiceClient<Channel>> {
        Ok(SensorServiceClient::new(self.channel()?).max_decoding_message_size(MAX_MESSAGE_SIZE))
    }
}

#[async_trait]
impl RobotConnection for GrpcConnection {
    async fn resource_names(&self) -> Result<Vec<ResourceName>> {
        let resp = self
            .robot()?
            .resource_names(robot::ResourceNamesRequest {})
            .await?
            .into_inner();
        Ok(resp.resources.into_iter().map(ResourceName::from).collect())
    }

    async fn check_health(&self) -> Result<()> {
        let request = health::HealthCheckRequest {
            service: String::new(),
        };
        let resp = HealthClient::new(self.channel()?)
            .check(request)
            .await?
            .into_inner();
        if resp.is_serving() {
            Ok(())
        } else {
            Err(ClientError::Rpc(tonic::Status::unavailable(format!(
                "robot health status is {:?}",
                resp.status()
            ))))
        }
    }

    async fn invoke(&self, call: ComponentCall) -> Result<ComponentReply> {
        trace!(method = call.method(), resource = call.name(), "Invoking component RPC");
        let reply = match call {
            ComponentCall::ArmGetEndPosition { name } => {
                let resp = self
                    .arm()?
                    .get_end_position(arm::GetEndPositionRequest { name })
                    .await?
                    .into_inner();
                ComponentReply::Pose(resp.pose.unwrap_or_default())
            }
            ComponentCall::ArmMoveToPosition { name, to } => {
                self.arm()?
                    .move_to_position(arm::MoveToPositionRequest { name, to: Some(to) })
                    .await?;
                ComponentReply::Empty
            }
            ComponentCall::ArmGetJointPositions { name } => {
                let resp = self
                    .arm()?
                    .get_joint_positions(arm::GetJointPositionsRequest { name })
                    .await?
                    .into_inner();
                ComponentReply::JointPositions(resp.positions.map(|p| p.values).unwrap_or_default())
            }
            ComponentCall::ArmMoveToJointPositions { name, positions } => {
                let request = arm::MoveToJointPositionsRequest {
                    name,
                    positions: Some(arm::JointPositions { values: positions }),
                };
                self.arm()?.move_to_joint_positions(request).await?;
                ComponentReply::Empty
            }
            ComponentCall::ArmStop { name } => {
                self.arm()?.stop(common::StopRequest { name }).await?;
                ComponentReply::Empty
            }
            ComponentCall::BaseMoveStraight {
                name,
                distance_mm,
                mm_per_sec,
            } => {
                let request = base::MoveStraightRequest {
                    name,
                    distance_mm,
                    mm_per_sec,
                };
                self.base()?.move_straight(request).await?;
                ComponentReply::Empty
            }
            ComponentCall::BaseSpin {
                name,
                angle_deg,
                degs_per_sec,
            } => {
                let request = base::SpinRequest {
                    name,
                    angle_deg,
                    degs_per_sec,
                };
                self.base()?.spin(request).await?;
                ComponentReply::Empty
            }
            ComponentCall::BaseStop { name } => {
                self.base()?.stop(common::StopRequest { name }).await?;
                ComponentReply::Empty
            }
            ComponentCall::GripperOpen { name } => {
                self.gripper()?.open(gripper::OpenRequest { name }).await?;
                ComponentReply::Empty
            }
            ComponentCall::GripperGrab { name } => {
                let resp = self
                    .gripper()?
                    .grab(gripper::GrabRequest { name })
                    .await?
                    .into_inner();
                ComponentReply::Grabbed(resp.success)
            }
            ComponentCall::GripperStop { name } => {
                self.gripper()?.stop(common::StopRequest { name }).await?;
                ComponentReply::Empty
            }
            ComponentCall::MotorSetPower { name, power_pct } => {
                self.motor()?
                    .set_power(motor::SetPowerRequest { name, power_pct })
                    .await?;
                ComponentReply::Empty
            }
            ComponentCall::MotorGoFor {
                name,
                rpm,
                revolutions,
            } => {
                let request = motor::GoForRequest {
                    name,
                    rpm,
                    revolutions,
                };
                self.motor()?.go_for(request).await?;
                ComponentReply::Empty
            }
            ComponentCall::MotorGetPosition { name } => {
                let resp = self
                    .motor()?
                    .get_position(motor::GetPositionRequest { name })
                    .await?
                    .into_inner();
                ComponentReply::Position(resp.position)
            }
            ComponentCall::MotorIsPowered { name } => {
                let resp = self
                    .motor()?
                    .is_powered(motor::IsPoweredRequest { name })
                    .await?
                    .into_inner();
                ComponentReply::Powered {
                    is_on: resp.is_on,
                    power_pct: resp.power_pct,
                }
            }
            ComponentCall::MotorStop { name } => {
                self.motor()?.stop(common::StopRequest { name }).await?;
                ComponentReply::Empty
            }
            ComponentCall::SensorGetReadings { name } => {
                let resp = self
                    .sensor()?
                    .get_readings(sensor::GetReadingsRequest { name })
                    .await?
                    .into_inner();
                ComponentReply::Readings(resp.readings)
            }
        };
        Ok(reply)
    }

    async fn stop_all(&self) -> Result<()> {
        self.robot()?.stop_all(robot::StopAllRequest {}).await?;
        Ok(())
    }

    async fn version(&self) -> Result<RobotVersion> {
        let resp = self
            .robot()?
            .get_version(robot::GetVersionRequest {})
            .await?
            .into_inner();
        Ok(RobotVersion {
            platform: resp.platform,
            version: resp.version,
            api_version: resp.api_version,
        })
    }

    async fn close(&self) {
        // The channel shuts down once the last clone of it is dropped.
        self.closed.store(true, Ordering::Release);
    }
}
