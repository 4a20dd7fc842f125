mod common;

use std::io::{BufRead, BufReader, Write};
use std::net::TcpStream;
use std::sync::Arc;

use serde_json::{json, Value as JsonValue};
use tarry_runtime::control::{
    handle_request_line, spawn_control_server, ControlEndpoint, ControlState,
};
use tarry_runtime::debug::MessageSink;

use common::{channel_sink, service, QUIET, WAIT};

fn request(
    state: &ControlState,
    sink: &Arc<dyn MessageSink>,
    line: JsonValue,
) -> Option<JsonValue> {
    handle_request_line(&line.to_string(), state, sink)
        .map(|text| serde_json::from_str(&text).unwrap())
}

#[test]
fn attach_keeps_or_replaces() {
    let state = ControlState::new(service());
    let (first, first_rx) = channel_sink(1);
    let first: Arc<dyn MessageSink> = first;
    let (second, _second_rx) = channel_sink(2);
    let second: Arc<dyn MessageSink> = second;

    let attach = json!({"id": 1, "type": "attach-debugger"});
    assert_eq!(request(&state, &first, attach), None);

    let reuse = json!({"id": 2, "type": "attach-debugger", "params": {"force": false}});
    assert_eq!(
        request(&state, &second, reuse),
        Some(json!({"id": 2, "status": ["done"]}))
    );
    assert!(first_rx.recv_timeout(QUIET).is_err());

    let force = json!({"id": 3, "type": "attach-debugger", "params": {"force": true}});
    assert_eq!(request(&state, &second, force), None);
    assert_eq!(
        first_rx.recv_timeout(WAIT).unwrap(),
        json!({"id": 1, "status": ["done"]})
    );
    assert_eq!(state.debug.attachment().map(|att| att.request_id()), Some(3));
}

#[test]
fn eval_round_trip_through_a_breakpoint() {
    let state = ControlState::new(service());
    let (sink, rx) = channel_sink(1);
    let sink: Arc<dyn MessageSink> = sink;

    request(&state, &sink, json!({"id": 1, "type": "attach-debugger"}));
    let eval = json!({
        "id": 2,
        "type": "eval",
        "params": {"session": "s1", "code": "(let [x 20] (* 2 #break (inc x)))"}
    });
    assert_eq!(request(&state, &sink, eval), None);

    let prompt = rx.recv_timeout(WAIT).unwrap();
    assert_eq!(prompt["id"], json!(1));
    assert_eq!(prompt["status"], json!(["awaiting-input"]));
    assert_eq!(prompt["value"], json!("21"));
    assert_eq!(prompt["coordinate"], json!([2, 2]));
    assert_eq!(prompt["locals"], json!({"x": "20"}));

    let reply = json!({
        "id": 3,
        "type": "submit-debug-reply",
        "params": {"key": prompt["key"], "input": "inject"}
    });
    assert_eq!(
        request(&state, &sink, reply),
        Some(json!({"id": 3, "status": ["done"]}))
    );
    let prompt = rx.recv_timeout(WAIT).unwrap();
    assert_eq!(prompt["input-kind"], json!("expression"));
    let reply = json!({
        "id": 4,
        "type": "submit-debug-reply",
        "params": {"key": prompt["key"], "input": "(+ x 30)"}
    });
    request(&state, &sink, reply);

    assert_eq!(
        rx.recv_timeout(WAIT).unwrap(),
        json!({"id": 2, "value": "100", "status": ["done"]})
    );

    let sessions = request(&state, &sink, json!({"id": 5, "type": "sessions"}));
    assert_eq!(
        sessions,
        Some(json!({"id": 5, "sessions": ["s1"], "status": ["done"]}))
    );
}

#[test]
fn eval_errors_and_unknown_requests() {
    let state = ControlState::new(service());
    let (sink, rx) = channel_sink(1);
    let sink: Arc<dyn MessageSink> = sink;

    let eval = json!({"id": 7, "type": "eval", "params": {"session": "s", "code": "(+ 1 nil)"}});
    request(&state, &sink, eval);
    assert_eq!(
        rx.recv_timeout(WAIT).unwrap(),
        json!({
            "id": 7,
            "error": "type mismatch: + expects numbers, got nil",
            "status": ["eval-error", "done"]
        })
    );

    let unknown = request(&state, &sink, json!({"id": 8, "type": "load-file"})).unwrap();
    assert_eq!(unknown["status"], json!(["error", "done"]));
    assert_eq!(unknown["error"], json!("unsupported request 'load-file'"));

    let invalid = handle_request_line("{not json", &state, &sink).unwrap();
    let invalid: JsonValue = serde_json::from_str(&invalid).unwrap();
    assert_eq!(invalid["id"], json!(0));
    assert_eq!(invalid["status"], json!(["error", "done"]));

    let missing = request(&state, &sink, json!({"id": 9, "type": "eval", "params": {}})).unwrap();
    assert_eq!(missing["status"], json!(["error", "done"]));

    // stale replies are still acknowledged
    let stale = json!({
        "id": 10,
        "type": "submit-debug-reply",
        "params": {"key": "input-404", "input": "next"}
    });
    assert_eq!(
        request(&state, &sink, stale),
        Some(json!({"id": 10, "status": ["done"]}))
    );
}

#[test]
fn close_session_aborts_pending_eval() {
    let state = ControlState::new(service());
    let (sink, rx) = channel_sink(1);
    let sink: Arc<dyn MessageSink> = sink;
    request(&state, &sink, json!({"id": 1, "type": "attach-debugger"}));
    let eval = json!({"id": 2, "type": "eval", "params": {"session": "s", "code": "#break 5"}});
    request(&state, &sink, eval);
    assert_eq!(rx.recv_timeout(WAIT).unwrap()["status"], json!(["awaiting-input"]));

    let close = json!({"id": 3, "type": "close-session", "params": {"session": "s"}});
    assert_eq!(
        request(&state, &sink, close),
        Some(json!({"id": 3, "status": ["done"]}))
    );
    assert_eq!(
        rx.recv_timeout(WAIT).unwrap(),
        json!({"id": 2, "status": ["aborted", "done"]})
    );
}

#[test]
fn tcp_server_speaks_json_lines() {
    let state = Arc::new(ControlState::new(service()));
    let endpoint = ControlEndpoint::parse("tcp://127.0.0.1:0").unwrap();
    let server = spawn_control_server(&endpoint, state.clone()).unwrap();
    let addr = server.local_addr.unwrap();

    let stream = TcpStream::connect(addr).unwrap();
    stream.set_read_timeout(Some(WAIT)).unwrap();
    let mut writer = stream.try_clone().unwrap();
    let mut reader = BufReader::new(stream);
    let mut read_message = || {
        let mut line = String::new();
        reader.read_line(&mut line).unwrap();
        serde_json::from_str::<JsonValue>(&line).unwrap()
    };

    writeln!(writer, r#"{{"id":1,"type":"attach-debugger"}}"#).unwrap();
    writeln!(
        writer,
        r#"{{"id":2,"type":"eval","params":{{"session":"t","code":"(+ 1 #break 2)"}}}}"#
    )
    .unwrap();

    let prompt = read_message();
    assert_eq!(prompt["status"], json!(["awaiting-input"]));
    assert_eq!(prompt["coordinate"], json!([2]));
    let reply = json!({
        "id": 3,
        "type": "submit-debug-reply",
        "params": {"key": prompt["key"], "input": "next"}
    });
    writeln!(writer, "{reply}").unwrap();

    let mut messages = vec![read_message(), read_message()];
    messages.sort_by_key(|message| message["id"].as_u64());
    assert_eq!(messages[0], json!({"id": 2, "value": "3", "status": ["done"]}));
    assert_eq!(messages[1], json!({"id": 3, "status": ["done"]}));

    drop(writer);
    drop(reader);
    for _ in 0..50 {
        if state.debug.attachment().is_none() {
            break;
        }
        std::thread::sleep(std::time::Duration::from_millis(20));
    }
    assert!(state.debug.attachment().is_none());
}
