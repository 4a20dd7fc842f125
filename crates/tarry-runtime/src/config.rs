//! Server configuration loading (`tarry.toml`).

#![allow(missing_docs)]

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use smol_str::SmolStr;

use crate::control::ControlEndpoint;
use crate::error::RuntimeError;

pub const DEFAULT_LISTEN: &str = "tcp://127.0.0.1:7888";
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// What a breakpoint does when no client is attached.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DetachedPolicy {
    /// Fail the evaluation with `NoDebuggerAttached`.
    #[default]
    Error,
    /// Wait until a client attaches or the evaluation is cancelled.
    Block,
}

impl DetachedPolicy {
    pub fn parse(text: &str) -> Result<Self, RuntimeError> {
        match text.trim().to_ascii_lowercase().as_str() {
            "error" => Ok(Self::Error),
            "block" => Ok(Self::Block),
            _ => Err(RuntimeError::InvalidConfig(
                format!("invalid debug.detached '{text}'").into(),
            )),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DebugSettings {
    pub detached: DetachedPolicy,
    /// `None` waits for replies forever.
    pub reply_timeout: Option<Duration>,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen: SmolStr,
    pub log_level: SmolStr,
    pub debug: DebugSettings,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: SmolStr::new(DEFAULT_LISTEN),
            log_level: SmolStr::new(DEFAULT_LOG_LEVEL),
            debug: DebugSettings::default(),
        }
    }
}

impl ServerConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RuntimeError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|err| {
            RuntimeError::InvalidConfig(format!("{}: {err}", path.display()).into())
        })?;
        Self::from_toml_str(&text).map_err(|err| match err {
            RuntimeError::InvalidConfig(message) => {
                RuntimeError::InvalidConfig(format!("{}: {message}", path.display()).into())
            }
            other => other,
        })
    }

    pub fn from_toml_str(text: &str) -> Result<Self, RuntimeError> {
        let raw: TarryToml = toml::from_str(text)
            .map_err(|err| RuntimeError::InvalidConfig(err.to_string().into()))?;
        raw.into_config()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct TarryToml {
    server: Option<ServerSection>,
    debug: Option<DebugSection>,
    log: Option<LogSection>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ServerSection {
    listen: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DebugSection {
    detached: Option<String>,
    reply_timeout_ms: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct LogSection {
    level: Option<String>,
}

impl TarryToml {
    fn into_config(self) -> Result<ServerConfig, RuntimeError> {
        let listen = self
            .server
            .and_then(|server| server.listen)
            .unwrap_or_else(|| DEFAULT_LISTEN.to_string());
        ControlEndpoint::parse(&listen).map_err(|err| {
            RuntimeError::InvalidConfig(format!("server.listen: {err}").into())
        })?;

        let (detached, reply_timeout_ms) = match self.debug {
            Some(debug) => (debug.detached, debug.reply_timeout_ms),
            None => (None, None),
        };
        let detached = DetachedPolicy::parse(detached.as_deref().unwrap_or("error"))?;
        let reply_timeout = reply_timeout_ms
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis);

        let log_level = self
            .log
            .and_then(|log| log.level)
            .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string());

        Ok(ServerConfig {
            listen: SmolStr::new(listen),
            log_level: SmolStr::new(log_level),
            debug: DebugSettings {
                detached,
                reply_timeout,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let config = ServerConfig::from_toml_str("").unwrap();
        assert_eq!(config.listen, DEFAULT_LISTEN);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.debug, DebugSettings::default());
    }

    #[test]
    fn reads_every_section() {
        let config = ServerConfig::from_toml_str(
            r#"
[server]
listen = "tcp://127.0.0.1:9000"

[debug]
detached = "block"
reply_timeout_ms = 1500

[log]
level = "debug"
"#,
        )
        .unwrap();
        assert_eq!(config.listen, "tcp://127.0.0.1:9000");
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.debug.detached, DetachedPolicy::Block);
        assert_eq!(config.debug.reply_timeout, Some(Duration::from_millis(1500)));
    }

    #[test]
    fn zero_timeout_means_unbounded() {
        let config = ServerConfig::from_toml_str("[debug]\nreply_timeout_ms = 0\n").unwrap();
        assert_eq!(config.debug.reply_timeout, None);
    }

    #[test]
    fn rejects_bad_values() {
        let err = ServerConfig::from_toml_str("[debug]\ndetached = \"retry\"\n").unwrap_err();
        assert_eq!(err.to_string(), "invalid config: invalid debug.detached 'retry'");
        assert!(ServerConfig::from_toml_str("[server]\nlisten = \"tcp://10.0.0.1:1\"\n").is_err());
        assert!(ServerConfig::from_toml_str("[server]\nport = 1\n").is_err());
    }
}
