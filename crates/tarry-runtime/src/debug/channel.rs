//! Suspension channel: correlates `awaiting-input` pushes with replies.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use rustc_hash::FxHashMap;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value as JsonValue};
use smol_str::SmolStr;
use tarry_syntax::Form;
use tracing::{debug, trace, warn};

use crate::error::RuntimeError;

use super::{Attachment, CancelToken, DebugCommand};

/// Correlation key of one pending input request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct InputKey(SmolStr);

impl InputKey {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for InputKey {
    fn from(key: &str) -> Self {
        Self(SmolStr::new(key))
    }
}

/// What the client is asked to send back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    /// One of the debug commands.
    Command,
    /// An expression to read.
    Expression,
}

impl Serialize for InputKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            InputKind::Command => DebugCommand::ALL
                .iter()
                .map(|command| command.as_str())
                .collect::<Vec<_>>()
                .serialize(serializer),
            InputKind::Expression => serializer.serialize_str("expression"),
        }
    }
}

/// A parsed client reply.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Command(DebugCommand),
    Expression(Form),
}

impl Reply {
    /// Parses reply text according to the kind that was requested.
    pub fn parse(kind: InputKind, text: &str) -> Result<Self, RuntimeError> {
        match kind {
            InputKind::Command => {
                let name = text.trim();
                let name = name.strip_prefix(':').unwrap_or(name);
                name.parse::<DebugCommand>().map(Reply::Command)
            }
            InputKind::Expression => tarry_syntax::parse_form(text)
                .map(Reply::Expression)
                .map_err(|err| RuntimeError::MalformedReply(err.to_string().into())),
        }
    }
}

#[derive(Serialize)]
struct Prompt<'a> {
    key: &'a InputKey,
    prompt: &'a str,
    #[serde(rename = "input-kind")]
    input_kind: InputKind,
    #[serde(flatten)]
    display: &'a Map<String, JsonValue>,
}

#[derive(Debug)]
struct PendingSlot {
    kind: InputKind,
    reply: Option<Result<Reply, RuntimeError>>,
}

/// Pending input requests keyed by [`InputKey`].
///
/// A key is registered before its prompt is sent, filled once by
/// [`SuspensionChannel::submit_reply`] and removed by the single waiter that
/// consumes it.
#[derive(Debug, Default)]
pub struct SuspensionChannel {
    next_key: AtomicU64,
    pending: Mutex<FxHashMap<InputKey, PendingSlot>>,
    arrived: Condvar,
}

impl SuspensionChannel {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn fresh_key(&self) -> InputKey {
        let n = self.next_key.fetch_add(1, Ordering::Relaxed) + 1;
        InputKey(SmolStr::new(format!("input-{n}")))
    }

    /// Registers a fresh key and pushes the prompt plus `display` to the
    /// attached client.
    pub fn request_input(
        &self,
        attachment: &Attachment,
        kind: InputKind,
        prompt: &str,
        display: &Map<String, JsonValue>,
    ) -> Result<InputKey, RuntimeError> {
        let key = self.fresh_key();
        self.pending
            .lock()
            .insert(key.clone(), PendingSlot { kind, reply: None });
        let body = serde_json::to_value(Prompt {
            key: &key,
            prompt,
            input_kind: kind,
            display,
        })
        .map_err(|err| RuntimeError::Transport(err.to_string().into()));
        let sent = body.and_then(|body| match body {
            JsonValue::Object(body) => attachment.push(&["awaiting-input"], body),
            _ => Err(RuntimeError::Transport("prompt is not an object".into())),
        });
        if let Err(err) = sent {
            self.pending.lock().remove(&key);
            return Err(err);
        }
        debug!(key = key.as_str(), prompt, "awaiting debugger input");
        Ok(key)
    }

    /// Records the reply for `key`. Returns false when the key is unknown
    /// or already answered; such replies are dropped.
    pub fn submit_reply(&self, key: &InputKey, input: &str) -> bool {
        let mut pending = self.pending.lock();
        let Some(slot) = pending.get_mut(key) else {
            warn!(key = key.as_str(), "dropping reply for unknown input key");
            return false;
        };
        if slot.reply.is_some() {
            warn!(key = key.as_str(), "dropping duplicate reply");
            return false;
        }
        slot.reply = Some(Reply::parse(slot.kind, input));
        drop(pending);
        trace!(key = key.as_str(), "reply recorded");
        self.arrived.notify_all();
        true
    }

    /// Blocks until `key` is answered, then removes and returns the reply.
    ///
    /// Returns `Err(Cancelled)` when `cancel` trips and `ReplyTimeout` when
    /// `timeout` elapses first; the key is forgotten in both cases.
    pub fn await_reply(
        &self,
        key: &InputKey,
        cancel: &CancelToken,
        timeout: Option<Duration>,
    ) -> Result<Reply, RuntimeError> {
        let deadline = timeout.map(|timeout| Instant::now() + timeout);
        let mut pending = self.pending.lock();
        loop {
            let answered = match pending.get(key) {
                Some(slot) => slot.reply.is_some(),
                None => {
                    return Err(RuntimeError::MalformedReply(
                        format!("input key '{}' is not pending", key.as_str()).into(),
                    ))
                }
            };
            if answered {
                return pending
                    .remove(key)
                    .and_then(|slot| slot.reply)
                    .unwrap_or(Err(RuntimeError::Cancelled));
            }
            if cancel.is_cancelled() {
                pending.remove(key);
                return Err(RuntimeError::Cancelled);
            }
            match deadline {
                None => self.arrived.wait(&mut pending),
                Some(deadline) => {
                    if self.arrived.wait_until(&mut pending, deadline).timed_out()
                        && !pending.get(key).is_some_and(|slot| slot.reply.is_some())
                    {
                        pending.remove(key);
                        return Err(RuntimeError::ReplyTimeout(key.0.clone()));
                    }
                }
            }
        }
    }

    /// Wakes every waiter so it re-checks its cancellation token.
    pub fn wake_all(&self) {
        let _guard = self.pending.lock();
        self.arrived.notify_all();
    }

    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }
}
