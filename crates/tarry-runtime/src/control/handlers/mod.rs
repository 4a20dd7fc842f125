use std::sync::Arc;

use crate::debug::MessageSink;

use super::{ControlRequest, ControlState, Handled};

mod debug;
mod eval;

pub(super) fn dispatch(
    request: &ControlRequest,
    state: &ControlState,
    sink: &Arc<dyn MessageSink>,
) -> Option<Handled> {
    debug::dispatch(request, state, sink).or_else(|| eval::dispatch(request, state, sink))
}
