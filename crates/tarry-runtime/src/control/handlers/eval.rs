use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Map};
use tracing::warn;

use crate::debug::MessageSink;
use crate::host::EvalOutcome;

use super::super::{ControlRequest, ControlResponse, ControlState, Handled};

pub(super) fn dispatch(
    request: &ControlRequest,
    state: &ControlState,
    sink: &Arc<dyn MessageSink>,
) -> Option<Handled> {
    let handled = match request.r#type.as_str() {
        "eval" => handle_eval(request, state, sink),
        "close-session" => handle_close_session(request, state),
        "sessions" => handle_sessions(request, state),
        _ => return None,
    };
    Some(handled)
}

#[derive(Debug, Deserialize)]
struct EvalParams {
    session: String,
    code: String,
}

#[derive(Debug, Deserialize)]
struct SessionParams {
    session: String,
}

fn handle_eval(
    request: &ControlRequest,
    state: &ControlState,
    sink: &Arc<dyn MessageSink>,
) -> Handled {
    let params: EvalParams = match request.params() {
        Ok(params) => params,
        Err(error) => return Handled::Respond(ControlResponse::error(request.id, error)),
    };
    let id = request.id;
    let reply_to = sink.clone();
    let spawned = state.host.spawn(params.session, params.code, move |outcome| {
        let response = match outcome {
            EvalOutcome::Value(value) => {
                let mut body = Map::new();
                body.insert("value".into(), json!(value.to_string()));
                ControlResponse::done_with(id, body)
            }
            EvalOutcome::Error(err) => {
                ControlResponse::error(id, err.to_string()).with_status(&["eval-error", "done"])
            }
            EvalOutcome::Aborted => ControlResponse::done(id).with_status(&["aborted", "done"]),
        };
        if let Err(err) = reply_to.send(response.to_json()) {
            warn!(id, "failed to deliver eval result: {err}");
        }
    });
    match spawned {
        Ok(_) => Handled::Deferred,
        Err(err) => Handled::Respond(ControlResponse::error(
            request.id,
            format!("failed to start evaluation: {err}"),
        )),
    }
}

fn handle_close_session(request: &ControlRequest, state: &ControlState) -> Handled {
    let params: SessionParams = match request.params() {
        Ok(params) => params,
        Err(error) => return Handled::Respond(ControlResponse::error(request.id, error)),
    };
    state.host.close_session(&params.session);
    Handled::Respond(ControlResponse::done(request.id))
}

fn handle_sessions(request: &ControlRequest, state: &ControlState) -> Handled {
    let mut body = Map::new();
    body.insert("sessions".into(), json!(state.debug.sessions().sessions()));
    Handled::Respond(ControlResponse::done_with(request.id, body))
}
