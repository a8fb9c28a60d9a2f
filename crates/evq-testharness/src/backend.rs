//! ---
//! ems_section: "11-simulation"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Test harness fixtures, fakes and mock backend."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
//! In-memory simulation backend with failure and latency injection.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use evq_client::{
    AgentState, ClientError, GenerateParams, HistoryEntry, JourneyEvent, LifecycleCommand,
    MetricsSnapshot, SimulationApi, SimulationSnapshot, StationState,
};
use parking_lot::Mutex;

use crate::fixtures;

/// Backend operation, used to target injected faults and count calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Agents,
    Stations,
    Journey,
    Snapshot,
    Logs,
    History,
    Lifecycle,
}

/// Simulation world as the backend sees it.
#[derive(Debug, Clone)]
pub struct World {
    pub step: u64,
    pub running: bool,
    /// `false` until the first state exists; snapshots then report an error.
    pub has_state: bool,
    pub agents: Vec<AgentState>,
    pub stations: Vec<StationState>,
    pub metrics: MetricsSnapshot,
    pub journeys: HashMap<String, Vec<JourneyEvent>>,
    pub logs: Vec<String>,
    pub history: Vec<HistoryEntry>,
}

impl World {
    pub fn generated(agents: u32, stations: u32) -> Self {
        let agents = fixtures::fleet(agents);
        let journeys = agents
            .iter()
            .map(|agent| (agent.id.clone(), fixtures::initial_journey()))
            .collect();
        Self {
            step: 0,
            running: false,
            has_state: true,
            agents,
            stations: fixtures::stations(stations),
            metrics: MetricsSnapshot::default(),
            journeys,
            logs: Vec::new(),
            history: Vec::new(),
        }
    }

    pub fn snapshot(&self) -> SimulationSnapshot {
        SimulationSnapshot {
            step: self.step,
            agents: self.agents.clone(),
            stations: self.stations.clone(),
            metrics: self.metrics.clone(),
        }
    }

    /// Run one simulation step: advance the counter, grow the queue metrics
    /// and append an optimisation log line.
    pub fn advance(&mut self) {
        self.step += 1;
        self.metrics.average_wait_time_seconds += 30.0;
        self.metrics.max_queue_length = (self.step % 4) as u32;
        self.logs.push(format!("step {}: queues rebalanced", self.step));
        self.history.push(HistoryEntry {
            step: self.step,
            timestamp: None,
            agents: self.agents.clone(),
            stations: self.stations.clone(),
            metrics: self.metrics.clone(),
            optimization_logs: self.logs.clone(),
        });
    }

    fn rewind(&mut self) {
        self.step = 0;
        self.metrics = MetricsSnapshot::default();
        self.logs.clear();
        self.history.clear();
    }
}

impl Default for World {
    fn default() -> Self {
        Self::generated(3, 2)
    }
}

#[derive(Default)]
struct Faults {
    failing: HashMap<Endpoint, String>,
    latency: HashMap<Endpoint, Duration>,
    reject_lifecycle: bool,
    offline: bool,
}

#[derive(Default)]
struct Inner {
    world: Mutex<World>,
    faults: Mutex<Faults>,
    calls: Mutex<HashMap<Endpoint, usize>>,
    generated: Mutex<Vec<GenerateParams>>,
}

/// Cloneable handle to a shared fake backend.
#[derive(Clone, Default)]
pub struct FakeBackend {
    inner: Arc<Inner>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_world(world: World) -> Self {
        let backend = Self::default();
        *backend.inner.world.lock() = world;
        backend
    }

    /// Shared handle usable wherever a [`SimulationApi`] is expected.
    pub fn api(&self) -> Arc<dyn SimulationApi> {
        Arc::new(self.clone())
    }

    pub fn world(&self) -> World {
        self.inner.world.lock().clone()
    }

    pub fn update<R>(&self, change: impl FnOnce(&mut World) -> R) -> R {
        change(&mut self.inner.world.lock())
    }

    /// Advance the world `steps` times.
    pub fn advance(&self, steps: u64) {
        let mut world = self.inner.world.lock();
        for _ in 0..steps {
            world.advance();
        }
    }

    /// Make `endpoint` fail with `message` until [`recover`](Self::recover).
    pub fn fail(&self, endpoint: Endpoint, message: &str) {
        self.inner
            .faults
            .lock()
            .failing
            .insert(endpoint, message.to_owned());
    }

    pub fn recover(&self, endpoint: Endpoint) {
        self.inner.faults.lock().failing.remove(&endpoint);
    }

    pub fn set_latency(&self, endpoint: Endpoint, latency: Duration) {
        self.inner.faults.lock().latency.insert(endpoint, latency);
    }

    /// Lifecycle commands answer `success: false` while set.
    pub fn reject_lifecycle(&self, reject: bool) {
        self.inner.faults.lock().reject_lifecycle = reject;
    }

    /// Every call fails as if the backend were unreachable while set.
    pub fn set_offline(&self, offline: bool) {
        self.inner.faults.lock().offline = offline;
    }

    pub fn calls(&self, endpoint: Endpoint) -> usize {
        self.inner
            .calls
            .lock()
            .get(&endpoint)
            .copied()
            .unwrap_or_default()
    }

    /// Parameters of every accepted generate request, oldest first.
    pub fn generate_requests(&self) -> Vec<GenerateParams> {
        self.inner.generated.lock().clone()
    }

    pub(crate) async fn enter(&self, endpoint: Endpoint) -> Result<(), ClientError> {
        *self.inner.calls.lock().entry(endpoint).or_default() += 1;
        let (latency, failure) = {
            let faults = self.inner.faults.lock();
            let failure = if faults.offline {
                Some("backend offline".to_owned())
            } else {
                faults.failing.get(&endpoint).cloned()
            };
            (faults.latency.get(&endpoint).copied(), failure)
        };
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        match failure {
            Some(message) => Err(ClientError::Unavailable(message)),
            None => Ok(()),
        }
    }

    /// Apply a lifecycle command to the world the way the backend does.
    pub fn apply_command(&self, command: &LifecycleCommand) -> bool {
        if self.inner.faults.lock().reject_lifecycle {
            return false;
        }
        let mut world = self.inner.world.lock();
        match command {
            LifecycleCommand::Start => {
                if world.running {
                    return false;
                }
                world.running = true;
                world.has_state = true;
            }
            LifecycleCommand::Stop => world.running = false,
            LifecycleCommand::Reset => {
                world.running = false;
                world.rewind();
            }
            LifecycleCommand::Generate(params) => {
                *world = World::generated(params.num_agents, params.num_stations);
                self.inner.generated.lock().push(params.clone());
            }
        }
        true
    }
}

#[async_trait]
impl SimulationApi for FakeBackend {
    async fn agents(&self) -> Result<Vec<AgentState>, ClientError> {
        self.enter(Endpoint::Agents).await?;
        Ok(self.inner.world.lock().agents.clone())
    }

    async fn stations(&self) -> Result<Vec<StationState>, ClientError> {
        self.enter(Endpoint::Stations).await?;
        Ok(self.inner.world.lock().stations.clone())
    }

    async fn journey_log(&self, agent_id: &str) -> Result<Vec<JourneyEvent>, ClientError> {
        self.enter(Endpoint::Journey).await?;
        Ok(self
            .inner
            .world
            .lock()
            .journeys
            .get(agent_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn snapshot(&self) -> Result<SimulationSnapshot, ClientError> {
        self.enter(Endpoint::Snapshot).await?;
        let world = self.inner.world.lock();
        if !world.has_state {
            return Err(ClientError::Backend(
                "No simulation state available".to_owned(),
            ));
        }
        Ok(world.snapshot())
    }

    async fn optimization_logs(&self) -> Result<Vec<String>, ClientError> {
        self.enter(Endpoint::Logs).await?;
        Ok(self.inner.world.lock().logs.clone())
    }

    async fn history(&self, start: u64, count: u64) -> Result<Vec<HistoryEntry>, ClientError> {
        self.enter(Endpoint::History).await?;
        let world = self.inner.world.lock();
        Ok(world
            .history
            .iter()
            .skip(start as usize)
            .take(count as usize)
            .cloned()
            .collect())
    }

    async fn execute(&self, command: &LifecycleCommand) -> Result<(), ClientError> {
        self.enter(Endpoint::Lifecycle).await?;
        if self.apply_command(command) {
            Ok(())
        } else {
            Err(ClientError::Rejected {
                operation: command.label(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn generate_rebuilds_and_stops_the_world() {
        let backend = FakeBackend::new();
        backend.execute(&LifecycleCommand::Start).await.unwrap();
        backend.advance(3);
        let params = GenerateParams {
            num_agents: 7,
            num_stations: 4,
            num_nodes: 10,
            num_routes: 2,
            use_cache: None,
        };
        backend
            .execute(&LifecycleCommand::Generate(params.clone()))
            .await
            .unwrap();
        let world = backend.world();
        assert!(!world.running);
        assert_eq!(world.step, 0);
        assert_eq!(world.agents.len(), 7);
        assert_eq!(world.stations.len(), 4);
        assert_eq!(backend.generate_requests(), vec![params]);
    }

    #[tokio::test]
    async fn injected_faults_surface_as_client_errors() {
        let backend = FakeBackend::new();
        backend.fail(Endpoint::Agents, "boom");
        assert!(matches!(
            backend.agents().await,
            Err(ClientError::Unavailable(message)) if message == "boom"
        ));
        backend.recover(Endpoint::Agents);
        assert_eq!(backend.agents().await.unwrap().len(), 3);
        assert_eq!(backend.calls(Endpoint::Agents), 2);

        backend.reject_lifecycle(true);
        assert!(matches!(
            backend.execute(&LifecycleCommand::Start).await,
            Err(ClientError::Rejected { operation: "start" })
        ));
    }

    #[tokio::test]
    async fn snapshot_reports_missing_state() {
        let backend = FakeBackend::new();
        backend.update(|world| world.has_state = false);
        assert!(matches!(
            backend.snapshot().await,
            Err(ClientError::Backend(_))
        ));
    }
}
