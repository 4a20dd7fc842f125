#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, Sender};
use serde_json::Value as JsonValue;
use tarry_runtime::config::DebugSettings;
use tarry_runtime::debug::MessageSink;
use tarry_runtime::error::RuntimeError;
use tarry_runtime::{DebugService, EvalHost, EvalOutcome};

pub const WAIT: Duration = Duration::from_millis(2000);
pub const QUIET: Duration = Duration::from_millis(100);

/// Sink that forwards every pushed message to a channel.
#[derive(Debug)]
pub struct ChannelSink {
    pub id: u64,
    tx: Sender<JsonValue>,
}

impl MessageSink for ChannelSink {
    fn connection_id(&self) -> u64 {
        self.id
    }

    fn send(&self, message: JsonValue) -> Result<(), RuntimeError> {
        self.tx
            .send(message)
            .map_err(|_| RuntimeError::Transport("receiver dropped".into()))
    }
}

pub fn channel_sink(id: u64) -> (Arc<ChannelSink>, Receiver<JsonValue>) {
    let (tx, rx) = unbounded();
    (Arc::new(ChannelSink { id, tx }), rx)
}

pub fn service() -> Arc<DebugService> {
    Arc::new(DebugService::new(DebugSettings::default()))
}

/// Attaches a fresh client and returns its message stream.
pub fn attach(service: &DebugService, request_id: u64) -> Receiver<JsonValue> {
    let (sink, rx) = channel_sink(request_id);
    service.attach(sink, request_id, false);
    rx
}

pub fn spawn_eval(host: &EvalHost, session: &str, code: &str) -> Receiver<EvalOutcome> {
    let (tx, rx) = unbounded();
    host.spawn(session, code, move |outcome| {
        let _ = tx.send(outcome);
    })
    .unwrap();
    rx
}

/// Waits for the next `awaiting-input` push and returns it.
pub fn next_prompt(rx: &Receiver<JsonValue>) -> JsonValue {
    let message = rx.recv_timeout(WAIT).expect("prompt");
    assert_eq!(message["status"], serde_json::json!(["awaiting-input"]), "{message}");
    message
}

pub fn key_of(prompt: &JsonValue) -> String {
    prompt["key"].as_str().expect("key").to_string()
}

/// Answers the next prompt with `input`.
pub fn answer(service: &DebugService, rx: &Receiver<JsonValue>, input: &str) -> JsonValue {
    let prompt = next_prompt(rx);
    assert!(service.submit_reply(&key_of(&prompt), input));
    prompt
}
