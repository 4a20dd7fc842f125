//! Debug commands and the stepping state machine.

use std::fmt;
use std::str::FromStr;

use serde_json::{Map, Value as JsonValue};
use tracing::{debug, info};

use crate::error::RuntimeError;
use crate::value::Value;

use super::channel::{InputKind, Reply};
use super::{Attachment, BreakpointSite, DebugService, SkipPolicy};

/// Command a client answers a breakpoint prompt with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DebugCommand {
    /// Resume with the current value.
    Next,
    /// Resume and skip every later breakpoint of this evaluation.
    Continue,
    /// Resume and skip breakpoints nested in the enclosing form.
    Out,
    /// Replace the value with an evaluated expression.
    Inject,
    /// Evaluate an expression for display, then prompt again.
    Eval,
    /// Abort the evaluation.
    Quit,
}

impl DebugCommand {
    pub const ALL: [DebugCommand; 6] = [
        DebugCommand::Next,
        DebugCommand::Continue,
        DebugCommand::Out,
        DebugCommand::Inject,
        DebugCommand::Eval,
        DebugCommand::Quit,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            DebugCommand::Next => "next",
            DebugCommand::Continue => "continue",
            DebugCommand::Out => "out",
            DebugCommand::Inject => "inject",
            DebugCommand::Eval => "eval",
            DebugCommand::Quit => "quit",
        }
    }
}

impl FromStr for DebugCommand {
    type Err = RuntimeError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        DebugCommand::ALL
            .into_iter()
            .find(|command| command.as_str() == text)
            .ok_or_else(|| RuntimeError::MalformedReply(format!("unknown command '{text}'").into()))
    }
}

impl fmt::Display for DebugCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl DebugService {
    /// Prompts for commands until one of them resumes or aborts the
    /// computation.
    pub(super) fn run_commands(
        &self,
        attachment: &Attachment,
        site: BreakpointSite<'_>,
        value: Value,
    ) -> Result<Value, RuntimeError> {
        let mut display = Map::new();
        display.insert("value".into(), JsonValue::String(value.to_string()));
        display.insert("coordinate".into(), serde_json::json!(site.coordinate));
        display.insert("locals".into(), JsonValue::Object(site.snapshot.to_display()));
        display.insert("session".into(), JsonValue::String(site.session.to_string()));

        loop {
            let reply = self.read_reply(attachment, site, InputKind::Command, "debug", &display)?;
            let Reply::Command(command) = reply else {
                return Err(RuntimeError::MalformedReply("expected a command".into()));
            };
            debug!(
                session = site.session,
                coordinate = %site.coordinate,
                %command,
                "debug command"
            );
            match command {
                DebugCommand::Next => return Ok(value),
                DebugCommand::Continue => {
                    self.sessions.set_skip_policy(site.session, SkipPolicy::All);
                    return Ok(value);
                }
                DebugCommand::Out => {
                    let parent = site.coordinate.parent();
                    self.sessions
                        .set_skip_policy(site.session, SkipPolicy::Below(parent));
                    return Ok(value);
                }
                DebugCommand::Inject => {
                    let form = self.read_expression(attachment, site, "inject", &display)?;
                    return site.snapshot.evaluate_form(&form, site.cancel);
                }
                DebugCommand::Eval => {
                    let form = self.read_expression(attachment, site, "eval", &display)?;
                    let shown = match site.snapshot.evaluate_form(&form, site.cancel) {
                        Ok(result) => result.to_string(),
                        Err(RuntimeError::Cancelled) => return Err(RuntimeError::Cancelled),
                        Err(err) => format!("#error {err}"),
                    };
                    display.insert("eval-result".into(), JsonValue::String(shown));
                }
                DebugCommand::Quit => {
                    info!(
                        session = site.session,
                        coordinate = %site.coordinate,
                        "evaluation quit from debugger"
                    );
                    site.cancel.cancel();
                    return Err(RuntimeError::Cancelled);
                }
            }
        }
    }

    fn read_expression(
        &self,
        attachment: &Attachment,
        site: BreakpointSite<'_>,
        prompt: &str,
        display: &Map<String, JsonValue>,
    ) -> Result<tarry_syntax::Form, RuntimeError> {
        match self.read_reply(attachment, site, InputKind::Expression, prompt, display)? {
            Reply::Expression(form) => Ok(form),
            Reply::Command(_) => Err(RuntimeError::MalformedReply("expected an expression".into())),
        }
    }

    fn read_reply(
        &self,
        attachment: &Attachment,
        site: BreakpointSite<'_>,
        kind: InputKind,
        prompt: &str,
        display: &Map<String, JsonValue>,
    ) -> Result<Reply, RuntimeError> {
        let key = self.channel.request_input(attachment, kind, prompt, display)?;
        self.channel
            .await_reply(&key, site.cancel, self.settings.reply_timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_command_names() {
        assert_eq!("out".parse::<DebugCommand>(), Ok(DebugCommand::Out));
        assert!("stepover".parse::<DebugCommand>().is_err());
        for command in DebugCommand::ALL {
            assert_eq!(command.as_str().parse::<DebugCommand>(), Ok(command));
        }
    }
}
