//! Build script for robolink-proto
//!
//! Generates protobuf messages and gRPC clients during `cargo build`.

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Generated code cannot carry doc comments at source
    tonic_build::configure()
        .build_server(false)
        .build_client(true)
        .type_attribute(".", "#[allow(missing_docs)]")
        .type_attribute("component.common.v1.Pose", "#[derive(Copy)]")
        .compile(
            &[
                "proto/robot.proto",
                "proto/health.proto",
                "proto/component/common.proto",
                "proto/component/arm.proto",
                "proto/component/base.proto",
                "proto/component/gripper.proto",
                "proto/component/motor.proto",
                "proto/component/sensor.proto",
            ],
            &["proto"],
        )?;

    Ok(())
}
