//! The single debugger attachment.

use std::fmt;
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};
use serde_json::{json, Map, Value as JsonValue};
use tracing::{debug, info, warn};

use crate::error::RuntimeError;

use super::CancelToken;

/// Outbound half of a client connection.
pub trait MessageSink: Send + Sync + fmt::Debug {
    /// Identifies the connection the sink writes to.
    fn connection_id(&self) -> u64;

    /// Queues one message for the client.
    fn send(&self, message: JsonValue) -> Result<(), RuntimeError>;
}

/// Client destination plus the request id its pushes are correlated with.
#[derive(Debug, Clone)]
pub struct Attachment {
    sink: Arc<dyn MessageSink>,
    request_id: u64,
}

impl Attachment {
    pub fn new(sink: Arc<dyn MessageSink>, request_id: u64) -> Self {
        Self { sink, request_id }
    }

    #[must_use]
    pub fn request_id(&self) -> u64 {
        self.request_id
    }

    #[must_use]
    pub fn connection_id(&self) -> u64 {
        self.sink.connection_id()
    }

    /// Sends `{id, status, ..body}` to the attached client.
    pub fn push(&self, status: &[&str], body: Map<String, JsonValue>) -> Result<(), RuntimeError> {
        let mut message = body;
        message.insert("id".into(), json!(self.request_id));
        message.insert("status".into(), json!(status));
        self.sink.send(JsonValue::Object(message))
    }
}

/// Result of an attach request.
#[derive(Debug, Clone)]
pub enum AttachOutcome {
    /// No client was attached.
    Attached,
    /// `force` replaced the previous client, which was sent `done`.
    Replaced { previous: u64 },
    /// An attachment already existed and was kept.
    Kept { current: u64 },
}

/// Process-wide slot holding at most one attachment.
#[derive(Debug, Default)]
pub struct AttachmentSlot {
    current: Mutex<Option<Attachment>>,
    changed: Condvar,
}

impl AttachmentSlot {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach(&self, attachment: Attachment, force: bool) -> AttachOutcome {
        let mut current = self.current.lock();
        if let Some(existing) = current.as_ref() {
            if !force {
                let kept = existing.request_id;
                drop(current);
                debug!(current = kept, "keeping existing attachment");
                return AttachOutcome::Kept { current: kept };
            }
        }
        let previous = current.replace(attachment);
        drop(current);
        self.changed.notify_all();
        match previous {
            None => {
                info!("debugger attached");
                AttachOutcome::Attached
            }
            Some(previous) => {
                if let Err(err) = previous.push(&["done"], Map::new()) {
                    warn!(
                        request = previous.request_id,
                        "failed to close replaced attachment: {err}"
                    );
                }
                info!(previous = previous.request_id, "debugger attachment replaced");
                AttachOutcome::Replaced {
                    previous: previous.request_id,
                }
            }
        }
    }

    #[must_use]
    pub fn current(&self) -> Option<Attachment> {
        self.current.lock().clone()
    }

    /// Clears the slot when it belongs to the given connection.
    pub fn detach_connection(&self, connection_id: u64) -> bool {
        let mut current = self.current.lock();
        if current
            .as_ref()
            .is_some_and(|existing| existing.connection_id() == connection_id)
        {
            *current = None;
            info!(connection = connection_id, "debugger connection closed, detached");
            return true;
        }
        false
    }

    /// Blocks until a client is attached or `cancel` trips.
    pub fn wait_for_attachment(&self, cancel: &CancelToken) -> Result<Attachment, RuntimeError> {
        let mut current = self.current.lock();
        loop {
            cancel.check()?;
            if let Some(attachment) = current.as_ref() {
                return Ok(attachment.clone());
            }
            self.changed.wait(&mut current);
        }
    }

    /// Wakes threads waiting for an attachment so they re-check cancellation.
    pub fn wake_all(&self) {
        let _guard = self.current.lock();
        self.changed.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default)]
    struct Recorder {
        id: u64,
        sent: Mutex<Vec<JsonValue>>,
    }

    impl MessageSink for Recorder {
        fn connection_id(&self) -> u64 {
            self.id
        }

        fn send(&self, message: JsonValue) -> Result<(), RuntimeError> {
            self.sent.lock().push(message);
            Ok(())
        }
    }

    #[test]
    fn force_replaces_and_closes_previous() {
        let slot = AttachmentSlot::new();
        let first = Arc::new(Recorder { id: 1, ..Recorder::default() });
        let second = Arc::new(Recorder { id: 2, ..Recorder::default() });

        assert!(matches!(
            slot.attach(Attachment::new(first.clone(), 10), false),
            AttachOutcome::Attached
        ));
        assert!(matches!(
            slot.attach(Attachment::new(second.clone(), 20), false),
            AttachOutcome::Kept { current: 10 }
        ));
        assert!(first.sent.lock().is_empty());

        assert!(matches!(
            slot.attach(Attachment::new(second.clone(), 21), true),
            AttachOutcome::Replaced { previous: 10 }
        ));
        assert_eq!(
            first.sent.lock().as_slice(),
            &[json!({"id": 10, "status": ["done"]})]
        );
        assert_eq!(slot.current().map(|att| att.request_id()), Some(21));
    }

    #[test]
    fn closing_connection_releases_slot() {
        let slot = AttachmentSlot::new();
        let sink = Arc::new(Recorder { id: 7, ..Recorder::default() });
        slot.attach(Attachment::new(sink, 1), false);
        assert!(!slot.detach_connection(8));
        assert!(slot.detach_connection(7));
        assert!(slot.current().is_none());
    }

    #[test]
    fn cancelled_wait_returns_error() {
        let slot = AttachmentSlot::new();
        let cancel = CancelToken::new();
        cancel.cancel();
        assert_eq!(
            slot.wait_for_attachment(&cancel).unwrap_err(),
            RuntimeError::Cancelled
        );
    }
}
