//! Protocol buffer definitions for robolink.
//!
//! This crate contains:
//! - Generated types and client for the robot service (`proto/robot.proto`)
//! - Health check client from `proto/health.proto`
//! - Per-component services under `proto/component/`
//! - The method path table in [`paths`]
//!
//! # Architecture
//!
//! The proto types are kept separate from the client's domain types to:
//! - Avoid transport-layer coupling in the connection lifecycle code
//! - Let tests drive the client through an in-memory transport
//! - Provide clear boundaries for type conversions

#![allow(missing_docs)] // Generated code doesn't have docs

pub mod paths;

/// Maximum decoded message size (16 MB covers sensor maps and joint arrays
/// with a wide margin).
pub const MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

/// Generated robot service types.
pub mod robot {
    tonic::include_proto!("robot.v1");
}

/// Generated health check types.
pub mod health {
    tonic::include_proto!("grpc.health.v1");

    impl HealthCheckResponse {
        /// Returns `true` when the server reports `SERVING`.
        #[must_use]
        pub fn is_serving(&self) -> bool {
            self.status == health_check_response::ServingStatus::Serving as i32
        }
    }
}

/// Generated component service types.
///
/// Module nesting follows the proto packages so cross-package references
/// resolve; each subtype re-exports its `v1` package.
pub mod component {
    pub mod common {
        pub mod v1 {
            tonic::include_proto!("component.common.v1");
        }
        pub use v1::*;
    }

    pub mod arm {
        pub mod v1 {
            tonic::include_proto!("component.arm.v1");
        }
        pub use v1::*;
    }

    pub mod base {
        pub mod v1 {
            tonic::include_proto!("component.base.v1");
        }
        pub use v1::*;
    }

    pub mod gripper {
        pub mod v1 {
            tonic::include_proto!("component.gripper.v1");
        }
        pub use v1::*;
    }

    pub mod motor {
        pub mod v1 {
            tonic::include_proto!("component.motor.v1");
        }
        pub use v1::*;
    }

    pub mod sensor {
        pub mod v1 {
            tonic::include_proto!("component.sensor.v1");
        }
        pub use v1::*;
    }
}

#[cfg(test)]
mod tests {
    use super::component::common::Pose;
    use super::health::{health_check_response::ServingStatus, HealthCheckResponse};

    #[test]
    fn test_is_serving() {
        let serving = HealthCheckResponse {
            status: ServingStatus::Serving as i32,
        };
        assert!(serving.is_serving());

        let not_serving = HealthCheckResponse {
            status: ServingStatus::NotServing as i32,
        };
        assert!(!not_serving.is_serving());
        assert_eq!(not_serving.status(), ServingStatus::NotServing);

        // Unknown wire values are not treated as serving
        assert!(!HealthCheckResponse { status: 42 }.is_serving());
    }

    #[test]
    fn test_pose_is_copy() {
        let pose = Pose {
            x: 1.0,
            ..Pose::default()
        };
        let copied = pose;
        assert_eq!(pose, copied);
    }
}
