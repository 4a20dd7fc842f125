use std::sync::Arc;

use serde::Deserialize;

use crate::debug::{AttachOutcome, MessageSink};

use super::super::{ControlRequest, ControlResponse, ControlState, Handled};

pub(super) fn dispatch(
    request: &ControlRequest,
    state: &ControlState,
    sink: &Arc<dyn MessageSink>,
) -> Option<Handled> {
    let handled = match request.r#type.as_str() {
        "attach-debugger" => handle_attach(request, state, sink),
        "submit-debug-reply" => handle_submit_reply(request, state),
        _ => return None,
    };
    Some(handled)
}

#[derive(Debug, Default, Deserialize)]
struct AttachParams {
    #[serde(default)]
    force: bool,
}

#[derive(Debug, Deserialize)]
struct SubmitReplyParams {
    key: String,
    input: String,
}

fn handle_attach(
    request: &ControlRequest,
    state: &ControlState,
    sink: &Arc<dyn MessageSink>,
) -> Handled {
    let params: AttachParams = match request.params() {
        Ok(params) => params,
        Err(error) => return Handled::Respond(ControlResponse::error(request.id, error)),
    };
    match state.debug.attach(sink.clone(), request.id, params.force) {
        // the request stays open for awaiting-input pushes
        AttachOutcome::Attached | AttachOutcome::Replaced { .. } => Handled::Deferred,
        AttachOutcome::Kept { .. } => Handled::Respond(ControlResponse::done(request.id)),
    }
}

fn handle_submit_reply(request: &ControlRequest, state: &ControlState) -> Handled {
    let params: SubmitReplyParams = match request.params() {
        Ok(params) => params,
        Err(error) => return Handled::Respond(ControlResponse::error(request.id, error)),
    };
    // stale keys are dropped but still acknowledged
    state.debug.submit_reply(&params.key, &params.input);
    Handled::Respond(ControlResponse::done(request.id))
}
