//! ---
//! ems_section: "05-networking-external-interfaces"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Simulation backend client and wire model."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use async_trait::async_trait;
use evq_common::BackendConfig;
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::api::{LifecycleCommand, SimulationApi};
use crate::error::ClientError;
use crate::model::{
    AgentState, CommandAck, HistoryEntry, JourneyEvent, JourneyLogResponse, LogsResponse,
    SimulationSnapshot, StationState,
};

const AGENTS_PATH: &str = "api/evs";
const STATIONS_PATH: &str = "api/stations";
const JOURNEY_PATH: &str = "api/ev/journey-log";
const SNAPSHOT_PATH: &str = "api/simulation/state";
const HISTORY_PATH: &str = "api/simulation/history";
const LOGS_PATH: &str = "api/optimization/logs";

/// reqwest-backed implementation of [`SimulationApi`].
#[derive(Debug, Clone)]
pub struct HttpSimulationClient {
    client: Client,
    base: Url,
}

impl HttpSimulationClient {
    pub fn from_config(config: &BackendConfig) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|err| ClientError::Unavailable(format!("http client setup: {err}")))?;
        Self::with_client(client, config.base_url.clone())
    }

    /// Use a caller-provided client. The base url gains a trailing slash so
    /// relative endpoint paths resolve below it.
    pub fn with_client(client: Client, mut base: Url) -> Result<Self, ClientError> {
        if base.cannot_be_a_base() {
            return Err(ClientError::InvalidBaseUrl(base.to_string()));
        }
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self { client, base })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        self.base
            .join(path)
            .map_err(|err| ClientError::InvalidBaseUrl(format!("{}{path}: {err}", self.base)))
    }

    async fn fetch_value(
        &self,
        method: Method,
        url: Url,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value, ClientError> {
        debug!(%method, %url, "backend request");
        let mut request = self.client.request(method, url);
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send().await.map_err(|source| ClientError::Transport {
            path: path.to_owned(),
            source,
        })?;
        let status = response.status();
        if !status.is_success() {
            warn!(path, status = status.as_u16(), "backend returned error status");
            return Err(ClientError::Status {
                path: path.to_owned(),
                status: status.as_u16(),
            });
        }
        let text = response.text().await.map_err(|source| ClientError::Transport {
            path: path.to_owned(),
            source,
        })?;
        let de = &mut serde_json::Deserializer::from_str(&text);
        serde_path_to_error::deserialize(de).map_err(|err| decode_error(path, err))
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let url = self.endpoint(path)?;
        let value = self.fetch_value(Method::GET, url, path, None).await?;
        decode(path, value)
    }
}

fn decode_error(path: &str, err: serde_path_to_error::Error<serde_json::Error>) -> ClientError {
    ClientError::Decode {
        path: path.to_owned(),
        location: err.path().to_string(),
        message: err.inner().to_string(),
    }
}

fn decode<T: DeserializeOwned>(path: &str, value: Value) -> Result<T, ClientError> {
    serde_path_to_error::deserialize(value).map_err(|err| decode_error(path, err))
}

/// The backend signals "no state" with a bare `{"error": "..."}` object.
fn backend_error(value: &Value) -> Option<String> {
    let message = value.as_object()?.get("error")?;
    Some(match message {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    })
}

#[async_trait]
impl SimulationApi for HttpSimulationClient {
    async fn agents(&self) -> Result<Vec<AgentState>, ClientError> {
        self.get(AGENTS_PATH).await
    }

    async fn stations(&self) -> Result<Vec<StationState>, ClientError> {
        self.get(STATIONS_PATH).await
    }

    async fn journey_log(&self, agent_id: &str) -> Result<Vec<JourneyEvent>, ClientError> {
        let mut url = self.endpoint(JOURNEY_PATH)?;
        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidBaseUrl(self.base.to_string()))?
            .push(agent_id);
        let value = self.fetch_value(Method::GET, url, JOURNEY_PATH, None).await?;
        let response: JourneyLogResponse = decode(JOURNEY_PATH, value)?;
        Ok(response.journey_log.unwrap_or_default())
    }

    async fn snapshot(&self) -> Result<SimulationSnapshot, ClientError> {
        let url = self.endpoint(SNAPSHOT_PATH)?;
        let value = self.fetch_value(Method::GET, url, SNAPSHOT_PATH, None).await?;
        if let Some(message) = backend_error(&value) {
            return Err(ClientError::Backend(message));
        }
        decode(SNAPSHOT_PATH, value)
    }

    async fn optimization_logs(&self) -> Result<Vec<String>, ClientError> {
        let response: LogsResponse = self.get(LOGS_PATH).await?;
        Ok(response.logs)
    }

    async fn history(&self, start: u64, count: u64) -> Result<Vec<HistoryEntry>, ClientError> {
        let mut url = self.endpoint(HISTORY_PATH)?;
        url.query_pairs_mut()
            .append_pair("start", &start.to_string())
            .append_pair("count", &count.to_string());
        let value = self.fetch_value(Method::GET, url, HISTORY_PATH, None).await?;
        decode(HISTORY_PATH, value)
    }

    async fn execute(&self, command: &LifecycleCommand) -> Result<(), ClientError> {
        let path = command.path();
        let url = self.endpoint(path)?;
        let body = match command {
            LifecycleCommand::Generate(params) => {
                Some(serde_json::to_value(params).map_err(|err| ClientError::Decode {
                    path: path.to_owned(),
                    location: ".".to_owned(),
                    message: err.to_string(),
                })?)
            }
            _ => None,
        };
        let value = self
            .fetch_value(Method::POST, url, path, body.as_ref())
            .await?;
        if let Some(message) = backend_error(&value) {
            return Err(ClientError::Backend(message));
        }
        let ack: CommandAck = decode(path, value)?;
        if ack.success {
            debug!(command = command.label(), "backend acknowledged command");
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
    use serde_json::json;

    #[test]
    fn base_url_gains_trailing_slash() {
        let client =
            HttpSimulationClient::with_client(Client::new(), Url::parse("http://sim:5000/dash").unwrap())
                .unwrap();
        assert_eq!(
            client.endpoint(AGENTS_PATH).unwrap().as_str(),
            "http://sim:5000/dash/api/evs"
        );
    }

    #[test]
    fn detects_backend_error_object() {
        assert_eq!(
            backend_error(&json!({"error": "No simulation state available"})).as_deref(),
            Some("No simulation state available")
        );
        assert!(backend_error(&json!({"step": 1})).is_none());
        assert!(backend_error(&json!([])).is_none());
    }

    #[test]
    fn decode_reports_offending_field() {
        let err = decode::<Vec<AgentState>>(
            AGENTS_PATH,
            json!([{"id": "ev-1", "current_position": [1.0, 2.0], "soc": "full", "charging": false, "in_queue": false}]),
        )
        .unwrap_err();
        match err {
            ClientError::Decode { location, .. } => assert_eq!(location, "[0].soc"),
            other => panic!("unexpected error {other:?}"),
        }
    }
}
