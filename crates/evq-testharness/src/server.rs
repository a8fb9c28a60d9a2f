//! ---
//! ems_section: "11-simulation"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Test harness fixtures, fakes and mock backend."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
//! HTTP front for [`FakeBackend`] speaking the simulation backend's JSON API.

use std::net::SocketAddr;
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use evq_client::{GenerateParams, LifecycleCommand};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::backend::{Endpoint, FakeBackend};

/// Builder for a mock backend server bound to a local port.
pub struct MockServerBuilder {
    backend: FakeBackend,
    listen: SocketAddr,
    advance_every: Option<Duration>,
}

impl MockServerBuilder {
    pub fn new(backend: FakeBackend) -> Self {
        Self {
            backend,
            listen: SocketAddr::from(([127, 0, 0, 1], 0)),
            advance_every: None,
        }
    }

    pub fn listen(mut self, addr: SocketAddr) -> Self {
        self.listen = addr;
        self
    }

    /// Step the world on this period while it is running.
    pub fn advance_every(mut self, period: Duration) -> Self {
        self.advance_every = Some(period);
        self
    }

    pub async fn spawn(self) -> anyhow::Result<MockServerHandle> {
        let listener = TcpListener::bind(self.listen).await?;
        let local_addr = listener.local_addr()?;
        info!(address = %local_addr, "mock simulation backend listening");

        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let stepper = self.advance_every.map(|period| {
            let backend = self.backend.clone();
            let mut stop = shutdown_tx.subscribe();
            tokio::spawn(async move {
                let mut interval = tokio::time::interval(period);
                loop {
                    tokio::select! {
                        _ = interval.tick() => {
                            backend.update(|world| if world.running { world.advance() });
                        }
                        _ = stop.changed() => break,
                    }
                }
            })
        });

        let server = axum::serve(listener, router(self.backend)).with_graceful_shutdown(
            async move {
                let _ = shutdown_rx.changed().await;
            },
        );
        let task = tokio::spawn(async move {
            if let Err(err) = server.await {
                warn!(error = %err, "mock backend exited with error");
            }
        });

        Ok(MockServerHandle {
            address: local_addr,
            task,
            stepper,
            shutdown: shutdown_tx,
        })
    }
}

pub struct MockServerHandle {
    address: SocketAddr,
    task: JoinHandle<()>,
    stepper: Option<JoinHandle<()>>,
    shutdown: watch::Sender<bool>,
}

impl MockServerHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.address
    }

    /// Base URL suitable for `BackendConfig::base_url`.
    pub fn base_url(&self) -> String {
        format!("http://{}/", self.address)
    }

    pub async fn shutdown(self) -> anyhow::Result<()> {
        let _ = self.shutdown.send(true);
        if let Some(stepper) = self.stepper {
            stepper.await.map_err(|join| anyhow::anyhow!(join))?;
        }
        self.task.await.map_err(|join| anyhow::anyhow!(join))
    }
}

/// Convenience wrapper: serve `backend` on an ephemeral port.
pub async fn spawn_mock_server(backend: FakeBackend) -> anyhow::Result<MockServerHandle> {
    MockServerBuilder::new(backend).spawn().await
}

fn router(backend: FakeBackend) -> Router {
    Router::new()
        .route("/api/evs", get(get_agents))
        .route("/api/stations", get(get_stations))
        .route("/api/ev/journey-log/:id", get(get_journey))
        .route("/api/simulation/state", get(get_state))
        .route("/api/simulation/history", get(get_history))
        .route("/api/optimization/logs", get(get_logs))
        .route("/api/simulation/start", post(post_start))
        .route("/api/simulation/stop", post(post_stop))
        .route("/api/simulation/reset", post(post_reset))
        .route("/api/generate", post(post_generate))
        .with_state(backend)
}

async fn admit(backend: &FakeBackend, endpoint: Endpoint) -> Result<(), Response> {
    backend.enter(endpoint).await.map_err(|err| {
        debug!(?endpoint, error = %err, "injected fault");
        (StatusCode::SERVICE_UNAVAILABLE, err.to_string()).into_response()
    })
}

async fn get_agents(State(backend): State<FakeBackend>) -> Response {
    if let Err(response) = admit(&backend, Endpoint::Agents).await {
        return response;
    }
    Json(backend.world().agents).into_response()
}

async fn get_stations(State(backend): State<FakeBackend>) -> Response {
    if let Err(response) = admit(&backend, Endpoint::Stations).await {
        return response;
    }
    Json(backend.world().stations).into_response()
}

async fn get_journey(State(backend): State<FakeBackend>, Path(id): Path<String>) -> Response {
    if let Err(response) = admit(&backend, Endpoint::Journey).await {
        return response;
    }
    match backend.world().journeys.get(&id) {
        Some(events) => Json(json!({ "ev_id": id, "journey_log": events })).into_response(),
        None => Json(json!({ "ev_id": id })).into_response(),
    }
}

async fn get_state(State(backend): State<FakeBackend>) -> Response {
    if let Err(response) = admit(&backend, Endpoint::Snapshot).await {
        return response;
    }
    let world = backend.world();
    if !world.has_state {
        return Json(json!({ "error": "No simulation state available" })).into_response();
    }
    let mut body = json!(world.snapshot());
    if let Value::Object(fields) = &mut body {
        fields.insert("timestamp".into(), Value::from("2024-03-01T08:00:00"));
        fields.insert("optimization_logs".into(), json!(world.logs));
    }
    Json(body).into_response()
}

#[derive(Debug, Deserialize)]
struct HistoryQuery {
    #[serde(default)]
    start: usize,
    #[serde(default = "default_history_count")]
    count: usize,
}

fn default_history_count() -> usize {
    100
}

async fn get_history(
    State(backend): State<FakeBackend>,
    Query(query): Query<HistoryQuery>,
) -> Response {
    if let Err(response) = admit(&backend, Endpoint::History).await {
        return response;
    }
    let history: Vec<_> = backend
        .world()
        .history
        .into_iter()
        .skip(query.start)
        .take(query.count)
        .collect();
    Json(history).into_response()
}

async fn get_logs(State(backend): State<FakeBackend>) -> Response {
    if let Err(response) = admit(&backend, Endpoint::Logs).await {
        return response;
    }
    Json(json!({ "logs": backend.world().logs })).into_response()
}

async fn lifecycle(backend: &FakeBackend, command: LifecycleCommand) -> Response {
    if let Err(response) = admit(backend, Endpoint::Lifecycle).await {
        return response;
    }
    let success = backend.apply_command(&command);
    debug!(command = command.label(), success, "lifecycle request");
    Json(json!({ "success": success })).into_response()
}

async fn post_start(State(backend): State<FakeBackend>) -> Response {
    lifecycle(&backend, LifecycleCommand::Start).await
}

async fn post_stop(State(backend): State<FakeBackend>) -> Response {
    lifecycle(&backend, LifecycleCommand::Stop).await
}

async fn post_reset(State(backend): State<FakeBackend>) -> Response {
    lifecycle(&backend, LifecycleCommand::Reset).await
}

async fn post_generate(
    State(backend): State<FakeBackend>,
    Json(params): Json<GenerateParams>,
) -> Response {
    if let Err(response) = admit(&backend, Endpoint::Lifecycle).await {
        return response;
    }
    let success = backend.apply_command(&LifecycleCommand::Generate(params.clone()));
    Json(json!({
        "success": success,
        "num_evs": params.num_agents,
        "num_stations": params.num_stations,
    }))
    .into_response()
}
