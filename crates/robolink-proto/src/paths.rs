//! gRPC method paths.
//!
//! Paths follow the `/<package>.<Service>/<Method>` convention and match the
//! routes of the generated clients. Callers use them as dispatch keys.

pub const ROBOT_RESOURCE_NAMES: &str = "/robot.v1.RobotService/ResourceNames";
pub const ROBOT_STOP_ALL: &str = "/robot.v1.RobotService/StopAll";
pub const ROBOT_GET_VERSION: &str = "/robot.v1.RobotService/GetVersion";

pub const HEALTH_CHECK: &str = "/grpc.health.v1.Health/Check";

pub const ARM_GET_END_POSITION: &str = "/component.arm.v1.ArmService/GetEndPosition";
pub const ARM_MOVE_TO_POSITION: &str = "/component.arm.v1.ArmService/MoveToPosition";
pub const ARM_GET_JOINT_POSITIONS: &str = "/component.arm.v1.ArmService/GetJointPositions";
pub const ARM_MOVE_TO_JOINT_POSITIONS: &str =
    "/component.arm.v1.ArmService/MoveToJointPositions";
pub const ARM_STOP: &str = "/component.arm.v1.ArmService/Stop";

pub const BASE_MOVE_STRAIGHT: &str = "/component.base.v1.BaseService/MoveStraight";
pub const BASE_SPIN: &str = "/component.base.v1.BaseService/Spin";
pub const BASE_STOP: &str = "/component.base.v1.BaseService/Stop";

pub const GRIPPER_OPEN: &str = "/component.gripper.v1.GripperService/Open";
pub const GRIPPER_GRAB: &str = "/component.gripper.v1.GripperService/Grab";
pub const GRIPPER_STOP: &str = "/component.gripper.v1.GripperService/Stop";

pub const MOTOR_SET_POWER: &str = "/component.motor.v1.MotorService/SetPower";
pub const MOTOR_GO_FOR: &str = "/component.motor.v1.MotorService/GoFor";
pub const MOTOR_GET_POSITION: &str = "/component.motor.v1.MotorService/GetPosition";
pub const MOTOR_IS_POWERED: &str = "/component.motor.v1.MotorService/IsPowered";
pub const MOTOR_STOP: &str = "/component.motor.v1.MotorService/Stop";

pub const SENSOR_GET_READINGS: &str = "/component.sensor.v1.SensorService/GetReadings";
