//! JSON-lines protocol spoken with the node evaluation host
//!
//! Each request and reply is one JSON object per line. Replies carry the id
//! of the request they answer; id 0 is reserved for the startup `ready`.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Id of the unsolicited `ready` reply sent once the host is listening
pub const READY_ID: u64 = 0;

/// Request sent to the host on its stdin
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostRequest<'a> {
    /// `require` the package at `path` and store it as `alias` in scope
    Bind {
        id: u64,
        alias: &'a str,
        path: &'a Path,
    },
    /// Compile and run `code` in the shared scope
    Eval {
        id: u64,
        code: &'a str,
        timeout_ms: u64,
    },
}

/// A reply line from the host's stdout
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HostMessage {
    /// Request this reply answers
    pub id: u64,
    #[serde(flatten)]
    pub reply: HostReply,
}

/// Reply payloads
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostReply {
    /// Host is up and reading requests
    Ready,
    /// Binding stored in scope
    Bound,
    /// Fragment produced a plain value
    Value { display: String },
    /// Fragment did not compile
    CompileError { message: String },
    /// Fragment (or bind) threw
    Threw { message: String },
    /// Host stopped the fragment at its time budget
    TimedOut,
    /// Fragment produced a promise; `settled` or `rejected` follows
    Deferred,
    /// Promise resolved
    Settled { display: String },
    /// Promise rejected
    Rejected { message: String },
}

impl HostReply {
    /// Whether no further replies will follow for the same id
    pub fn is_final(&self) -> bool {
        !matches!(self, Self::Deferred)
    }
}
