//! Evaluator abstraction
//!
//! An evaluator owns the persistent scope that REPL submissions run in.
//! The session driver only sees this trait; the node host is one
//! implementation and tests use scripted ones.

use crate::error::TrymodResult;
use crate::package::ResolvedModule;
use async_trait::async_trait;
use futures_util::future::BoxFuture;
use std::fmt;

/// Rendered result of an evaluation, as the user should see it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Value(String);

impl Value {
    /// Wrap an already-rendered value
    pub fn new(display: impl Into<String>) -> Self {
        Self(display.into())
    }

    /// Rendered text
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What running a fragment produced
pub enum Evaluation {
    /// A plain value, available now
    Ready(Value),
    /// A promise-like value; the future resolves once it settles
    Deferred(BoxFuture<'static, TrymodResult<Value>>),
}

impl fmt::Debug for Evaluation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready(value) => f.debug_tuple("Ready").field(value).finish(),
            Self::Deferred(_) => f.write_str("Deferred(..)"),
        }
    }
}

/// A scope that user code is compiled and run in
#[async_trait]
pub trait Evaluator: Send + Sync {
    /// Make `module` visible in scope as `alias`
    async fn bind(&self, alias: &str, module: &ResolvedModule) -> TrymodResult<()>;

    /// Compile and run `source` in scope.
    ///
    /// Fails with `Compile` when the fragment does not parse, `Runtime` when
    /// it throws, and `EvaluationTimeout` when the evaluator itself stopped
    /// it. The returned future may be dropped before completion; the
    /// evaluator must stay usable afterwards.
    async fn evaluate(&self, source: &str) -> TrymodResult<Evaluation>;
}
