//! Connection lifecycle tests against the in-memory robot.
//!
//! Timer-driven behaviour runs on a paused tokio clock, so intervals of
//! seconds complete instantly and deterministically.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use robolink_client::mock::MockRobot;
use robolink_client::{
    AddressSource, ClientError, ClientOptions, ClientState, ComponentCall, ComponentReply,
    PollInterval, ResourceClient, ResourceName, RobotAddress, RobotClient,
};
use tokio::sync::watch;
use tokio::time::Instant;

const TICK: Duration = Duration::from_secs(1);

fn address() -> RobotAddress {
    RobotAddress::parse("robot.local:8080", AddressSource::UserInput).unwrap()
}

fn arm_a() -> ResourceName {
    ResourceName::component("arm", "A")
}

fn motor_b() -> ResourceName {
    ResourceName::component("motor", "B")
}

fn watched() -> ClientOptions {
    ClientOptions::default()
        .with_check_connected_every(PollInterval::Every(TICK))
        .with_reconnect_every(PollInterval::Every(TICK))
}

async fn connect(robot: &Arc<MockRobot>, options: ClientOptions) -> RobotClient {
    RobotClient::with_dialer(address(), options, robot.dialer())
        .await
        .unwrap()
}

/// Wait until the watched flag reads `want`, failing after `within`.
async fn wait_for(rx: &mut watch::Receiver<bool>, want: bool, within: Duration) {
    let waited = tokio::time::timeout(within, async {
        loop {
            if *rx.borrow_and_update() == want {
                return;
            }
            rx.changed().await.unwrap();
        }
    })
    .await;
    assert!(waited.is_ok(), "connected never became {want} within {within:?}");
}

/// Sleep in small steps until `done` holds, failing after `within`.
async fn poll_until(within: Duration, mut done: impl FnMut() -> bool) {
    let deadline = Instant::now() + within;
    while !done() {
        assert!(Instant::now() < deadline, "condition not met within {within:?}");
        tokio::time::sleep(TICK / 20).await;
    }
}

#[tokio::test(start_paused = true)]
async fn test_initial_refresh_lists_resources_once() {
    let robot = MockRobot::new([arm_a(), motor_b()]);
    let client = connect(&robot, ClientOptions::default()).await;

    assert!(client.is_connected());
    assert_eq!(client.resource_names(), vec![arm_a(), motor_b()]);
    assert_eq!(robot.counts().listings, 1);

    // Once means once: nothing more happens over a long idle period
    tokio::time::sleep(Duration::from_secs(3600)).await;
    let counts = robot.counts();
    assert_eq!(counts.listings, 1);
    assert_eq!(counts.dials, 1);
    assert_eq!(counts.health_checks, 0);

    client.close().await;
}

#[tokio::test(start_paused = true)]
async fn test_never_loops_make_no_calls() {
    let robot = MockRobot::new([arm_a()]);
    let options = ClientOptions::default().with_refresh_every(PollInterval::Never);
    let client = connect(&robot, options).await;

    assert!(client.is_connected());
    assert!(client.resource_names().is_empty());

    tokio::time::sleep(Duration::from_secs(600)).await;
    let counts = robot.counts();
    assert_eq!(counts.dials, 1);
    assert_eq!(counts.listings, 0);
    assert_eq!(counts.health_checks, 0);

    client.close().await;
}

#[tokio::test(start_paused = true)]
async fn test_construction_fails_when_dial_fails() {
    let robot = MockRobot::new([arm_a()]);
    robot.sever();

    let err = RobotClient::with_dialer(address(), ClientOptions::default(), robot.dialer())
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Dial { .. }), "got {err:?}");
    assert_eq!(robot.counts().listings, 0);
}

#[tokio::test(start_paused = true)]
async fn test_construction_fails_when_initial_refresh_fails() {
    let robot = MockRobot::new([arm_a()]);
    robot.fail_listing(Some(tonic::Status::permission_denied("no")));

    let err = RobotClient::with_dialer(address(), ClientOptions::default(), robot.dialer())
        .await
        .unwrap_err();
    match err {
        ClientError::Rpc(status) => assert_eq!(status.code(), tonic::Code::PermissionDenied),
        other => panic!("expected upstream status, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_severed_transport_is_detected() {
    let robot = MockRobot::new([arm_a(), motor_b()]);
    let options = ClientOptions::default().with_check_connected_every(PollInterval::Every(TICK));
    let client = connect(&robot, options).await;
    let mut rx = client.changed();

    robot.sever();
    wait_for(&mut rx, false, TICK + TICK / 10).await;

    assert!(!client.is_connected());
    assert_eq!(client.state(), ClientState::Disconnected);
    assert!(client.resource_names().is_empty());

    // Exactly one transition is published, and no reconnect is attempted
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert!(!rx.has_changed().unwrap());
    assert_eq!(robot.counts().dials, 1);

    client.close().await;
}

#[tokio::test(start_paused = true)]
async fn test_restored_transport_reconnects_and_refreshes() {
    let robot = MockRobot::new([arm_a(), motor_b()]);
    let options = watched().with_refresh_every(PollInterval::Every(Duration::from_secs(5)));
    let client = connect(&robot, options).await;
    let mut rx = client.changed();

    robot.sever();
    wait_for(&mut rx, false, TICK * 2).await;

    let sensor = ResourceName::component("sensor", "C");
    robot.set_resources([arm_a(), motor_b(), sensor.clone()]);
    robot.restore();

    wait_for(&mut rx, true, TICK * 2).await;
    assert!(client.is_connected());
    assert_eq!(client.state(), ClientState::Connected);

    // The reconnect's own refresh lands within one refresh tick
    poll_until(Duration::from_secs(5), || client.resource_names().len() == 3).await;
    assert!(client.resource_by_name(&sensor).is_ok());

    client.close().await;
}

#[tokio::test(start_paused = true)]
async fn test_rpcs_while_disconnected_never_reach_transport() {
    let robot = MockRobot::new([arm_a(), motor_b()]);
    let options = ClientOptions::default().with_check_connected_every(PollInterval::Every(TICK));
    let client = connect(&robot, options).await;
    let arm = client.arm("A").unwrap();
    let mut rx = client.changed();

    robot.sever();
    wait_for(&mut rx, false, TICK * 2).await;
    let before = robot.counts();

    let err = arm.end_position().await.unwrap_err();
    assert!(matches!(err, ClientError::Unavailable { .. }), "got {err:?}");
    assert!(matches!(
        client.stop_all().await.unwrap_err(),
        ClientError::Unavailable { .. }
    ));
    assert!(matches!(
        client.version().await.unwrap_err(),
        ClientError::Unavailable { .. }
    ));
    assert!(matches!(
        client.refresh().await.unwrap_err(),
        ClientError::Unavailable { .. }
    ));

    // Lookups hit the cache, so the stub is still handed out
    let cached = client.resource_by_name(&motor_b()).unwrap();
    let ResourceClient::Motor(motor) = cached else {
        panic!("expected a motor stub");
    };
    assert!(matches!(
        motor.stop().await.unwrap_err(),
        ClientError::Unavailable { .. }
    ));

    let after = robot.counts();
    assert_eq!(after.invokes, before.invokes);
    assert_eq!(after.stop_alls, before.stop_alls);
    assert_eq!(after.versions, before.versions);
    assert_eq!(after.listings, before.listings);

    client.close().await;
}

#[tokio::test(start_paused = true)]
async fn test_lookup_of_absent_names() {
    let robot = MockRobot::new([arm_a(), motor_b()]);
    let client = connect(&robot, ClientOptions::default()).await;

    let missing = ResourceName::component("arm", "nope");
    match client.resource_by_name(&missing) {
        Err(ClientError::NotFound(name)) => assert_eq!(name, missing),
        other => panic!("expected NotFound, got {other:?}"),
    }
    assert!(matches!(client.gripper("A"), Err(ClientError::WrongKind { .. })));
    assert!(matches!(client.base("Z"), Err(ClientError::NotFound(_))));
    assert!(client.motor("B").is_ok());

    client.close().await;
}

#[tokio::test(start_paused = true)]
async fn test_stub_calls_forward_and_survive_reconnect() {
    let robot = MockRobot::new([arm_a(), motor_b()]);
    robot.set_reply(
        robolink_proto::paths::MOTOR_GET_POSITION,
        ComponentReply::Position(12.5),
    );
    let client = connect(&robot, watched()).await;
    let motor = client.motor("B").unwrap();

    motor.go_for(60.0, 2.0).await.unwrap();
    assert_eq!(motor.position().await.unwrap(), 12.5);
    assert_eq!(
        robot.calls().first(),
        Some(&ComponentCall::MotorGoFor {
            name: "B".into(),
            rpm: 60.0,
            revolutions: 2.0,
        })
    );

    let mut rx = client.changed();
    robot.sever();
    wait_for(&mut rx, false, TICK * 2).await;
    robot.restore();
    wait_for(&mut rx, true, TICK * 2).await;

    // The old stub routes through the new connection
    assert_eq!(motor.position().await.unwrap(), 12.5);
    assert!(robot.counts().dials >= 2);

    client.close().await;
}

#[tokio::test(start_paused = true)]
async fn test_failed_refresh_keeps_snapshot() {
    let robot = MockRobot::new([arm_a(), motor_b()]);
    let options = ClientOptions::default().with_refresh_every(PollInterval::Every(TICK));
    let client = connect(&robot, options).await;

    robot.fail_listing(Some(tonic::Status::internal("registry busy")));
    match client.refresh().await {
        Err(ClientError::Rpc(status)) => assert_eq!(status.message(), "registry busy"),
        other => panic!("expected upstream error, got {other:?}"),
    }
    tokio::time::sleep(TICK * 3).await;
    assert!(client.is_connected());
    assert_eq!(client.resource_names(), vec![arm_a(), motor_b()]);

    robot.fail_listing(None);
    robot.set_resources([arm_a()]);
    poll_until(TICK * 2, || client.resource_names() == vec![arm_a()]).await;
    assert!(matches!(client.motor("B"), Err(ClientError::NotFound(_))));

    client.close().await;
}

#[tokio::test(start_paused = true)]
async fn test_liveness_retries_rejected_probes() {
    let robot = MockRobot::new([arm_a()]);
    let options = ClientOptions::default().with_check_connected_every(PollInterval::Every(TICK));
    let client = connect(&robot, options).await;
    let mut rx = client.changed();

    tokio::time::sleep(TICK / 10).await;
    let before = robot.counts().health_checks;
    robot.fail_health(Some(tonic::Status::internal("probe rejected")));

    wait_for(&mut rx, false, TICK * 2).await;
    assert_eq!(robot.counts().health_checks - before, 3);

    client.close().await;
}

#[tokio::test(start_paused = true)]
async fn test_parent_notifier_runs_on_loss_and_reconnect() {
    let robot = MockRobot::new([arm_a()]);
    let client = connect(&robot, watched()).await;
    let notified = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&notified);
    client.set_parent_notifier(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    let mut rx = client.changed();

    robot.sever();
    wait_for(&mut rx, false, TICK * 2).await;
    assert_eq!(notified.load(Ordering::SeqCst), 1);

    robot.restore();
    wait_for(&mut rx, true, TICK * 2).await;
    assert_eq!(notified.load(Ordering::SeqCst), 2);

    client.close().await;
}

#[tokio::test(start_paused = true)]
async fn test_connect_now_without_reconnect_loop() {
    let robot = MockRobot::new([arm_a()]);
    let options = ClientOptions::default().with_check_connected_every(PollInterval::Every(TICK));
    let client = connect(&robot, options).await;
    let mut rx = client.changed();

    robot.sever();
    wait_for(&mut rx, false, TICK * 2).await;
    assert!(client.connect_now().await.is_err());

    robot.restore();
    client.connect_now().await.unwrap();
    assert!(client.is_connected());
    assert_eq!(client.resource_names(), vec![arm_a()]);
    assert_eq!(client.version().await.unwrap().platform, "mock");

    client.close().await;
}

#[tokio::test(start_paused = true)]
async fn test_loop_cycles_stay_on_schedule() {
    const CYCLES: usize = 5;
    let robot = MockRobot::new([arm_a()]);
    let client = connect(&robot, watched()).await;

    // Liveness ticks while connected
    let start = Instant::now();
    let base = robot.counts().health_checks;
    poll_until(TICK * 20, || robot.counts().health_checks >= base + CYCLES).await;
    let elapsed = start.elapsed();
    assert!(elapsed >= TICK * (CYCLES as u32 - 1), "too fast: {elapsed:?}");
    assert!(elapsed <= TICK * (CYCLES as u32 + 4), "too slow: {elapsed:?}");

    // Reconnect ticks while the robot stays unreachable
    let mut rx = client.changed();
    robot.sever();
    wait_for(&mut rx, false, TICK * 2).await;
    let start = Instant::now();
    let base = robot.counts().dials;
    poll_until(TICK * 20, || robot.counts().dials >= base + CYCLES).await;
    let elapsed = start.elapsed();
    assert!(elapsed >= TICK * (CYCLES as u32 - 1), "too fast: {elapsed:?}");
    assert!(elapsed <= TICK * (CYCLES as u32 + 4), "too slow: {elapsed:?}");

    client.close().await;
}

#[tokio::test(start_paused = true)]
async fn test_close_stops_all_activity() {
    let robot = MockRobot::new([arm_a(), motor_b()]);
    let options = watched().with_refresh_every(PollInterval::Every(TICK));
    let client = connect(&robot, options).await;
    let arm = client.arm("A").unwrap();
    let mut rx = client.changed();

    tokio::time::sleep(TICK * 3).await;
    client.close().await;
    let frozen = robot.counts();

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(robot.counts(), frozen);
    assert_eq!(robot.open_connections(), 0);

    assert_eq!(client.state(), ClientState::Closed);
    assert!(!client.is_connected());
    assert!(client.resource_names().is_empty());
    assert!(matches!(
        client.resource_by_name(&arm_a()),
        Err(ClientError::Closed)
    ));
    assert!(matches!(client.stop_all().await, Err(ClientError::Closed)));
    assert!(matches!(arm.stop().await, Err(ClientError::Closed)));

    // Observers see one final false, then the channel ends
    rx.changed().await.unwrap();
    assert!(!*rx.borrow_and_update());
    assert!(rx.changed().await.is_err());

    // Idempotent
    client.close().await;
    assert_eq!(client.state(), ClientState::Closed);
}

#[tokio::test(start_paused = true)]
async fn test_zero_period_runs_loop_once() {
    let robot = MockRobot::new([arm_a()]);
    let options =
        ClientOptions::default().with_check_connected_every(PollInterval::Every(Duration::ZERO));
    assert!(options.validate().is_ok());
    let client = connect(&robot, options).await;

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(robot.counts().health_checks, 1);
    assert!(client.is_connected());

    client.close().await;
    assert_eq!(client.state(), ClientState::Closed);
}

#[tokio::test(start_paused = true)]
async fn test_tiny_liveness_period_keeps_healthy_robot_connected() {
    let robot = MockRobot::new([arm_a()]);
    let options = ClientOptions::default()
        .with_check_connected_every(PollInterval::Every(Duration::from_millis(1)));
    assert_eq!(options.probe_timeout(), Duration::from_millis(1));
    let client = connect(&robot, options).await;

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(client.is_connected());
    assert!(robot.counts().health_checks > 10);

    client.close().await;
}

#[tokio::test(start_paused = true)]
async fn test_close_during_foreground_reconnect_releases_new_connection() {
    let robot = MockRobot::new([arm_a()]);
    let client = Arc::new(connect(&robot, ClientOptions::default()).await);
    robot.set_dial_delay(TICK * 5);

    let redial = tokio::spawn({
        let client = Arc::clone(&client);
        async move { client.connect_now().await }
    });
    tokio::time::sleep(TICK).await;
    assert_eq!(robot.counts().dials, 2);

    client.close().await;
    assert_eq!(robot.open_connections(), 0);

    let result = redial.await.unwrap();
    assert!(matches!(result, Err(ClientError::Closed)), "got {result:?}");
    assert_eq!(robot.open_connections(), 0);
    assert_eq!(client.state(), ClientState::Closed);
    assert!(client.resource_names().is_empty());
}
