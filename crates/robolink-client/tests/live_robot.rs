//! Integration tests against a live robot server.
//!
//! These tests are ignored by default. Run with:
//! ```text
//! ROBOLINK_ROBOT_URL=http://192.168.1.42:8080 cargo test -p robolink-client --test live_robot -- --ignored
//! ```

use std::time::Duration;

use robolink_client::{
    resolve_address, ClientError, ClientOptions, PollInterval, RobotAddress, RobotClient,
};

/// Connect to the configured robot, or `None` if it is not reachable.
async fn try_connect(options: ClientOptions) -> Option<RobotClient> {
    let address = resolve_address(None, None);
    match RobotClient::connect(address.clone(), options).await {
        Ok(client) => Some(client),
        Err(e) => {
            eprintln!("Skipping test: robot not available at {address}: {e}");
            None
        }
    }
}

#[tokio::test]
#[ignore]
async fn test_connect_and_list_resources() {
    let Some(client) = try_connect(ClientOptions::default()).await else {
        return;
    };

    assert!(client.is_connected());
    for name in client.resource_names() {
        assert!(name.validate().is_ok(), "robot listed invalid name {name}");
        assert!(client.resource_by_name(&name).is_ok());
    }

    client.close().await;
}

#[tokio::test]
#[ignore]
async fn test_version_and_health() {
    let options = ClientOptions::default()
        .with_check_connected_every(PollInterval::Every(Duration::from_secs(1)));
    let Some(client) = try_connect(options).await else {
        return;
    };

    let version = client.version().await.expect("version query failed");
    assert!(!version.version.is_empty());

    // A healthy robot stays connected across several liveness ticks
    tokio::time::sleep(Duration::from_secs(3)).await;
    assert!(client.is_connected());

    client.close().await;
}

#[tokio::test]
#[ignore]
async fn test_connect_unreachable_address() {
    let address: RobotAddress = "http://127.0.0.1:1".parse().expect("valid address");
    let options = ClientOptions::default().with_dial_timeout(Duration::from_secs(2));

    let err = RobotClient::connect(address, options).await.unwrap_err();

    assert!(matches!(err, ClientError::Dial { .. }), "got {err:?}");
}
