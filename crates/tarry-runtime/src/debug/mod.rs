//! Breakpoint debugging: skip tracking, suspension and the command loop.

#![allow(missing_docs)]

mod attachment;
mod cancel;
pub mod channel;
mod command;
mod coordinate;
mod hook;
mod service;
mod session;
mod snapshot;

pub use attachment::{AttachOutcome, Attachment, AttachmentSlot, MessageSink};
pub use cancel::CancelToken;
pub use channel::{InputKey, InputKind, Reply, SuspensionChannel};
pub use command::DebugCommand;
pub use coordinate::Coordinate;
pub use hook::{BreakpointHook, BreakpointSite, NoopBreakpointHook};
pub use service::DebugService;
pub use session::{SessionId, SessionStore, SkipPolicy};
pub use snapshot::ScopeSnapshot;
