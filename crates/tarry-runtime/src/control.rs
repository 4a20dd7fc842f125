//! Control server (line-delimited JSON).

#![allow(missing_docs)]

mod handlers;
mod transport;

use std::net::SocketAddr;
#[cfg(unix)]
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Map;
use smol_str::SmolStr;
use tracing::debug;

use crate::debug::{DebugService, MessageSink};
use crate::error::RuntimeError;
use crate::host::EvalHost;

pub use transport::{spawn_control_server, ControlServer};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlEndpoint {
    Tcp(SocketAddr),
    #[cfg(unix)]
    Unix(PathBuf),
}

impl ControlEndpoint {
    pub fn parse(text: &str) -> Result<Self, RuntimeError> {
        if let Some(rest) = text.strip_prefix("tcp://") {
            let addr = rest.parse::<SocketAddr>().map_err(|err| {
                RuntimeError::ControlError(format!("invalid tcp endpoint: {err}").into())
            })?;
            if !addr.ip().is_loopback() {
                return Err(RuntimeError::ControlError(
                    "tcp endpoint must be loopback (use unix:// for local sockets)".into(),
                ));
            }
            return Ok(Self::Tcp(addr));
        }
        #[cfg(unix)]
        if let Some(rest) = text.strip_prefix("unix://") {
            return Ok(Self::Unix(PathBuf::from(rest)));
        }
        Err(RuntimeError::ControlError(
            format!("unsupported endpoint '{text}'").into(),
        ))
    }
}

/// Shared state behind every control connection.
#[derive(Debug)]
pub struct ControlState {
    pub debug: Arc<DebugService>,
    pub host: EvalHost,
    next_connection: AtomicU64,
}

impl ControlState {
    #[must_use]
    pub fn new(debug: Arc<DebugService>) -> Self {
        Self {
            host: EvalHost::new(debug.clone()),
            debug,
            next_connection: AtomicU64::new(1),
        }
    }

    pub fn next_connection_id(&self) -> u64 {
        self.next_connection.fetch_add(1, Ordering::Relaxed)
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ControlRequest {
    id: u64,
    #[serde(rename = "type")]
    r#type: String,
    params: Option<serde_json::Value>,
}

impl ControlRequest {
    fn params<T: DeserializeOwned>(&self) -> Result<T, String> {
        let params = self
            .params
            .clone()
            .unwrap_or_else(|| serde_json::Value::Object(Map::new()));
        serde_json::from_value(params).map_err(|err| format!("invalid params: {err}"))
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ControlResponse {
    id: u64,
    status: Vec<SmolStr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(flatten)]
    body: Map<String, serde_json::Value>,
}

impl ControlResponse {
    fn done(id: u64) -> Self {
        Self::done_with(id, Map::new())
    }

    fn done_with(id: u64, body: Map<String, serde_json::Value>) -> Self {
        Self {
            id,
            status: vec![SmolStr::new("done")],
            error: None,
            body,
        }
    }

    fn error(id: u64, error: String) -> Self {
        Self {
            id,
            status: vec![SmolStr::new("error"), SmolStr::new("done")],
            error: Some(error),
            body: Map::new(),
        }
    }

    fn with_status(mut self, status: &[&str]) -> Self {
        self.status = status.iter().map(|status| SmolStr::new(status)).collect();
        self
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// What a handler produced for a request.
pub(crate) enum Handled {
    /// Answer now.
    Respond(ControlResponse),
    /// The answer, if any, arrives later through the connection's sink.
    Deferred,
}

/// Handles one request line; returns the immediate response, if any.
pub fn handle_request_line(
    line: &str,
    state: &ControlState,
    sink: &Arc<dyn MessageSink>,
) -> Option<String> {
    let request = match serde_json::from_str::<ControlRequest>(line) {
        Ok(request) => request,
        Err(err) => {
            let response = ControlResponse::error(0, format!("invalid request: {err}"));
            return serde_json::to_string(&response).ok();
        }
    };
    debug!(
        id = request.id,
        kind = request.r#type.as_str(),
        connection = sink.connection_id(),
        "control request"
    );
    let handled = handlers::dispatch(&request, state, sink).unwrap_or_else(|| {
        Handled::Respond(ControlResponse::error(
            request.id,
            format!("unsupported request '{}'", request.r#type),
        ))
    });
    match handled {
        Handled::Respond(response) => serde_json::to_string(&response).ok(),
        Handled::Deferred => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_parsing() {
        assert_eq!(
            ControlEndpoint::parse("tcp://127.0.0.1:7888").unwrap(),
            ControlEndpoint::Tcp("127.0.0.1:7888".parse().unwrap())
        );
        assert!(ControlEndpoint::parse("tcp://0.0.0.0:7888").is_err());
        assert!(ControlEndpoint::parse("http://127.0.0.1:1").is_err());
        #[cfg(unix)]
        assert_eq!(
            ControlEndpoint::parse("unix:///tmp/tarry.sock").unwrap(),
            ControlEndpoint::Unix(PathBuf::from("/tmp/tarry.sock"))
        );
    }

    #[test]
    fn error_response_shape() {
        let response = ControlResponse::error(4, "nope".into());
        assert_eq!(
            response.to_json(),
            serde_json::json!({"id": 4, "status": ["error", "done"], "error": "nope"})
        );
    }
}
