//! The debug service: attachment, pending replies and sessions in one place.

use std::sync::Arc;

use tracing::{debug, info, trace, warn};

use crate::config::{DebugSettings, DetachedPolicy};
use crate::error::RuntimeError;
use crate::value::Value;

use super::channel::InputKey;
use super::{
    AttachOutcome, Attachment, AttachmentSlot, BreakpointHook, BreakpointSite, MessageSink,
    SessionStore, SuspensionChannel,
};

/// Owns all debugger state shared between evaluation threads and the
/// control server.
#[derive(Debug, Default)]
pub struct DebugService {
    pub(super) settings: DebugSettings,
    pub(super) sessions: SessionStore,
    pub(super) channel: SuspensionChannel,
    pub(super) attachment: AttachmentSlot,
}

impl DebugService {
    #[must_use]
    pub fn new(settings: DebugSettings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    #[must_use]
    pub fn channel(&self) -> &SuspensionChannel {
        &self.channel
    }

    /// Installs `sink` as the debugger client correlated with `request_id`.
    pub fn attach(
        &self,
        sink: Arc<dyn MessageSink>,
        request_id: u64,
        force: bool,
    ) -> AttachOutcome {
        self.attachment
            .attach(Attachment::new(sink, request_id), force)
    }

    #[must_use]
    pub fn attachment(&self) -> Option<Attachment> {
        self.attachment.current()
    }

    /// Delivers a client reply. Unknown keys are dropped.
    pub fn submit_reply(&self, key: &str, input: &str) -> bool {
        self.channel.submit_reply(&InputKey::from(key), input)
    }

    /// Called when a connection closes; frees the attachment it held.
    pub fn release_connection(&self, connection_id: u64) {
        self.attachment.detach_connection(connection_id);
    }

    /// Cancels every running evaluation of `session` and forgets it.
    pub fn close_session(&self, session: &str) -> bool {
        let Some(tokens) = self.sessions.close(session) else {
            return false;
        };
        for token in &tokens {
            token.cancel();
        }
        if !tokens.is_empty() {
            self.channel.wake_all();
            self.attachment.wake_all();
        }
        info!(session, cancelled = tokens.len(), "session closed");
        true
    }

    fn resolve_attachment(&self, site: BreakpointSite<'_>) -> Result<Attachment, RuntimeError> {
        if let Some(attachment) = self.attachment.current() {
            return Ok(attachment);
        }
        match self.settings.detached {
            DetachedPolicy::Error => {
                warn!(
                    session = site.session,
                    coordinate = %site.coordinate,
                    "breakpoint hit with no debugger attached"
                );
                Err(RuntimeError::NoDebuggerAttached {
                    coordinate: site.coordinate.to_string().into(),
                })
            }
            DetachedPolicy::Block => {
                debug!(session = site.session, "waiting for a debugger to attach");
                self.attachment.wait_for_attachment(site.cancel)
            }
        }
    }
}

impl BreakpointHook for DebugService {
    fn on_breakpoint(&self, site: BreakpointSite<'_>, value: Value) -> Result<Value, RuntimeError> {
        site.cancel.check()?;
        if self.sessions.should_skip(site.session, site.coordinate) {
            trace!(session = site.session, coordinate = %site.coordinate, "breakpoint skipped");
            return Ok(value);
        }
        let attachment = self.resolve_attachment(site)?;
        debug!(
            session = site.session,
            coordinate = %site.coordinate,
            request = attachment.request_id(),
            "breakpoint hit"
        );
        self.run_commands(&attachment, site, value)
    }

    fn on_top_level_form(&self, session: &str) {
        // `out` never reaches past the form it was issued in
        self.sessions.clear_nested_skip(session);
    }
}
