//! Control server transport (TCP/Unix).

use std::io::{BufRead, BufReader, Read, Write};
use std::net::{SocketAddr, TcpListener};
use std::sync::Arc;
use std::thread;

use crossbeam_channel::{unbounded, Sender};
use tracing::{debug, info, warn};

use crate::debug::MessageSink;
use crate::error::RuntimeError;

use super::{handle_request_line, ControlEndpoint, ControlState};

/// A running control server.
#[derive(Debug, Clone)]
pub struct ControlServer {
    /// Bound TCP address; `None` for Unix sockets.
    pub local_addr: Option<SocketAddr>,
    accept: Arc<thread::JoinHandle<()>>,
}

impl ControlServer {
    /// Blocks until the accept loop ends.
    pub fn join(self) {
        if let Ok(handle) = Arc::try_unwrap(self.accept) {
            let _ = handle.join();
        }
    }
}

/// Outbound queue of one connection, drained by its writer thread.
#[derive(Debug)]
struct ConnectionSink {
    id: u64,
    tx: Sender<String>,
}

impl MessageSink for ConnectionSink {
    fn connection_id(&self) -> u64 {
        self.id
    }

    fn send(&self, message: serde_json::Value) -> Result<(), RuntimeError> {
        self.tx
            .send(message.to_string())
            .map_err(|_| RuntimeError::Transport(format!("connection {} closed", self.id).into()))
    }
}

pub fn spawn_control_server(
    endpoint: &ControlEndpoint,
    state: Arc<ControlState>,
) -> Result<ControlServer, RuntimeError> {
    match endpoint {
        ControlEndpoint::Tcp(addr) => {
            let listener = TcpListener::bind(addr)
                .map_err(|err| RuntimeError::ControlError(format!("bind {addr}: {err}").into()))?;
            let local_addr = listener.local_addr().ok();
            let accept = thread::Builder::new()
                .name("tarry-control".into())
                .spawn(move || {
                    for stream in listener.incoming().map_while(Result::ok) {
                        let peer = stream.peer_addr().map(|addr| addr.to_string()).ok();
                        let reader = match stream.try_clone() {
                            Ok(clone) => clone,
                            Err(err) => {
                                warn!("control connection clone failed: {err}");
                                continue;
                            }
                        };
                        serve_connection(reader, stream, state.clone(), peer.as_deref());
                    }
                })
                .map_err(|err| RuntimeError::ControlError(format!("spawn: {err}").into()))?;
            Ok(ControlServer {
                local_addr,
                accept: Arc::new(accept),
            })
        }
        #[cfg(unix)]
        ControlEndpoint::Unix(path) => {
            if path.exists() {
                let _ = std::fs::remove_file(path);
            }
            let listener = std::os::unix::net::UnixListener::bind(path).map_err(|err| {
                RuntimeError::ControlError(format!("bind {path:?}: {err}").into())
            })?;
            set_unix_permissions(path)?;
            let accept = thread::Builder::new()
                .name("tarry-control".into())
                .spawn(move || {
                    for stream in listener.incoming().map_while(Result::ok) {
                        let Ok(reader) = stream.try_clone() else {
                            continue;
                        };
                        serve_connection(reader, stream, state.clone(), Some("unix"));
                    }
                })
                .map_err(|err| RuntimeError::ControlError(format!("spawn: {err}").into()))?;
            Ok(ControlServer {
                local_addr: None,
                accept: Arc::new(accept),
            })
        }
    }
}

fn serve_connection<R, W>(reader: R, writer: W, state: Arc<ControlState>, peer: Option<&str>)
where
    R: Read + Send + 'static,
    W: Write + Send + 'static,
{
    let id = state.next_connection_id();
    let (tx, rx) = unbounded::<String>();
    info!(connection = id, peer, "control connection opened");

    let spawned_writer = thread::Builder::new()
        .name(format!("tarry-conn-{id}-tx"))
        .spawn(move || {
            let mut writer = writer;
            for line in rx {
                if writeln!(writer, "{line}").and_then(|()| writer.flush()).is_err() {
                    break;
                }
            }
        });
    if let Err(err) = spawned_writer {
        warn!(connection = id, "failed to start writer: {err}");
        return;
    }

    let spawned_reader = thread::Builder::new()
        .name(format!("tarry-conn-{id}-rx"))
        .spawn(move || {
            let sink: Arc<dyn MessageSink> = Arc::new(ConnectionSink { id, tx: tx.clone() });
            for line in BufReader::new(reader).lines().map_while(Result::ok) {
                if line.trim().is_empty() {
                    continue;
                }
                if let Some(response) = handle_request_line(&line, &state, &sink) {
                    if tx.send(response).is_err() {
                        break;
                    }
                }
            }
            state.debug.release_connection(id);
            debug!(connection = id, "control connection closed");
        });
    if let Err(err) = spawned_reader {
        warn!(connection = id, "failed to start reader: {err}");
    }
}

#[cfg(unix)]
fn set_unix_permissions(path: &std::path::Path) -> Result<(), RuntimeError> {
    use std::os::unix::fs::PermissionsExt;
    let mut perms = std::fs::metadata(path)
        .map_err(|err| RuntimeError::ControlError(format!("socket metadata: {err}").into()))?
        .permissions();
    perms.set_mode(0o600);
    std::fs::set_permissions(path, perms)
        .map_err(|err| RuntimeError::ControlError(format!("socket chmod: {err}").into()))
}
