//! ---
//! ems_section: "15-testing-qa-runbook"
//! ems_subsection: "tests"
//! ems_type: "test"
//! ems_scope: "code"
//! ems_description: "Dashboard session driven over HTTP against the mock backend."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use std::sync::Arc;
use std::time::Duration;

use evq_client::{ClientError, GenerateParams, HttpSimulationClient, LifecycleCommand, SimulationApi};
use evq_common::BackendConfig;
use evq_core::{Command, ControllerSettings, SessionController};
use evq_testharness::{FakeBackend, MockServerBuilder, MockServerHandle, Recorder};
use tokio::time::timeout;
use url::Url;

const DEADLINE: Duration = Duration::from_secs(10);

fn client_for(server: &MockServerHandle) -> HttpSimulationClient {
    let config = BackendConfig {
        base_url: Url::parse(&server.base_url()).expect("mock url"),
        request_timeout: Duration::from_secs(2),
    };
    HttpSimulationClient::from_config(&config).expect("client")
}

async fn settled(controller: &mut SessionController) {
    timeout(DEADLINE, controller.settle())
        .await
        .expect("controller settles");
}

#[tokio::test]
async fn client_reads_every_endpoint() {
    let backend = FakeBackend::new();
    backend.advance(3);
    let server = MockServerBuilder::new(backend.clone())
        .spawn()
        .await
        .expect("mock server");
    let client = client_for(&server);

    assert_eq!(client.agents().await.unwrap().len(), 3);
    assert_eq!(client.stations().await.unwrap().len(), 2);

    let snapshot = client.snapshot().await.unwrap();
    assert_eq!(snapshot.step, 3);
    assert_eq!(snapshot.agents.len(), 3);

    let history = client.history(1, 5).await.unwrap();
    let steps: Vec<u64> = history.iter().map(|entry| entry.step).collect();
    assert_eq!(steps, vec![2, 3]);

    let logs = client.optimization_logs().await.unwrap();
    assert_eq!(logs.last().map(String::as_str), Some("step 3: queues rebalanced"));

    assert_eq!(client.journey_log("ev-0").await.unwrap().len(), 1);
    assert!(client.journey_log("ev-404").await.unwrap().is_empty());

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn lifecycle_requests_reach_the_backend() {
    let backend = FakeBackend::new();
    let server = MockServerBuilder::new(backend.clone())
        .spawn()
        .await
        .expect("mock server");
    let client = client_for(&server);

    client.execute(&LifecycleCommand::Start).await.unwrap();
    assert!(backend.world().running);
    client.execute(&LifecycleCommand::Stop).await.unwrap();
    assert!(!backend.world().running);

    let params = GenerateParams {
        num_agents: 6,
        num_stations: 3,
        num_nodes: 40,
        num_routes: 90,
        use_cache: Some(false),
    };
    client
        .execute(&LifecycleCommand::Generate(params.clone()))
        .await
        .unwrap();
    assert_eq!(backend.generate_requests(), vec![params]);
    assert_eq!(backend.world().agents.len(), 6);

    backend.reject_lifecycle(true);
    let err = client.execute(&LifecycleCommand::Start).await.unwrap_err();
    assert!(matches!(err, ClientError::Rejected { .. }));

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn session_runs_against_live_server() {
    let backend = FakeBackend::new();
    let server = MockServerBuilder::new(backend.clone())
        .advance_every(Duration::from_millis(20))
        .spawn()
        .await
        .expect("mock server");
    let recorder = Recorder::new();
    let settings = ControllerSettings {
        initial_speed: 10,
        ..ControllerSettings::default()
    };
    let mut controller =
        SessionController::new(Arc::new(client_for(&server)), recorder.surface_set(), settings);
    settled(&mut controller).await;
    assert_eq!(recorder.state().markers.len(), 5);
    assert_eq!(recorder.state().options.len(), 3);

    controller
        .handle_command(Command::Generate(Some(GenerateParams {
            num_agents: 4,
            num_stations: 1,
            num_nodes: 20,
            num_routes: 30,
            use_cache: None,
        })))
        .unwrap();
    settled(&mut controller).await;
    assert_eq!(recorder.state().markers.len(), 5);
    assert_eq!(recorder.state().options.len(), 4);

    controller.handle_command(Command::Select(Some("ev-2".into()))).unwrap();
    settled(&mut controller).await;
    assert_eq!(recorder.state().selected.as_deref(), Some("ev-2"));
    assert_eq!(recorder.state().timeline.len(), 1);

    controller.handle_command(Command::Start).unwrap();
    settled(&mut controller).await;
    assert!(controller.session().running());
    assert!(backend.world().running);

    timeout(DEADLINE, async {
        while controller.session().tick_counter() < 5 {
            controller.step().await;
        }
    })
    .await
    .expect("five ticks");
    settled(&mut controller).await;
    let capacity = controller.settings().chart_capacity;
    let state = recorder.state();
    assert_eq!(state.charts.len(), 2);
    for chart in state.charts.values() {
        assert_eq!(chart.labels.len(), capacity);
        assert_eq!(chart.values.len(), capacity);
        let (last, earlier) = chart.labels.split_last().unwrap();
        assert!(!last.is_empty());
        assert!(earlier.iter().all(String::is_empty));
    }
    drop(state);

    controller.handle_command(Command::Stop).unwrap();
    settled(&mut controller).await;
    assert!(!controller.session().running());
    assert!(!backend.world().running);
    assert_eq!(controller.recent_errors().count(), 0);

    controller.shutdown();
    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn offline_backend_surfaces_http_errors() {
    let backend = FakeBackend::new();
    backend.set_offline(true);
    let server = MockServerBuilder::new(backend.clone())
        .spawn()
        .await
        .expect("mock server");
    let recorder = Recorder::new();
    let mut controller = SessionController::new(
        Arc::new(client_for(&server)),
        recorder.surface_set(),
        ControllerSettings::default(),
    );
    settled(&mut controller).await;

    assert!(recorder.state().markers.is_empty());
    let errors: Vec<&str> = controller.recent_errors().collect();
    assert!(!errors.is_empty());
    assert!(errors.iter().all(|line| line.contains("503")));
    assert!(!recorder.state().errors.is_empty());

    backend.set_offline(false);
    controller.handle_command(Command::Reset).unwrap();
    settled(&mut controller).await;
    assert_eq!(recorder.state().markers.len(), 5);

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn unreachable_backend_is_reported_not_fatal() {
    let server = MockServerBuilder::new(FakeBackend::new())
        .spawn()
        .await
        .expect("mock server");
    let client = client_for(&server);
    server.shutdown().await.unwrap();

    let recorder = Recorder::new();
    let mut controller =
        SessionController::new(Arc::new(client), recorder.surface_set(), ControllerSettings::default());
    settled(&mut controller).await;

    assert!(controller.recent_errors().count() >= 1);
    assert!(!controller.session().running());
    let controls = recorder.state().controls.expect("controls published");
    assert!(controls.start);
}
