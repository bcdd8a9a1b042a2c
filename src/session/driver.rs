//! Session driver: binds packages into scope and evaluates submissions

use super::bindings::BindingSet;
use super::evaluator::{Evaluation, Evaluator, Value};
use crate::error::{TrymodError, TrymodResult};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Time budget for a submission to produce its immediate result
pub const EVALUATION_TIMEOUT: Duration = Duration::from_millis(5000);

/// Printed when a submission returns a promise
pub const DEFERRED_NOTICE: &str = "Returned a Promise. waiting for result...";

/// Result of a successful submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The fragment produced its value directly
    Immediate(Value),
    /// The fragment produced a promise, which settled with this value
    Settled(Value),
}

impl Outcome {
    /// The value to show, however it was produced
    pub fn value(&self) -> &Value {
        match self {
            Self::Immediate(value) | Self::Settled(value) => value,
        }
    }
}

/// Drives one evaluator through a REPL session
pub struct SessionDriver<E> {
    evaluator: E,
    bindings: BindingSet,
    on_deferred: Arc<dyn Fn() + Send + Sync>,
}

impl<E: Evaluator> SessionDriver<E> {
    /// Create a driver with no bindings yet
    pub fn new(evaluator: E) -> Self {
        Self {
            evaluator,
            bindings: BindingSet::default(),
            on_deferred: Arc::new(|| println!("{}", DEFERRED_NOTICE)),
        }
    }

    /// Replace the default advisory printed when a promise is returned
    pub fn with_deferred_notice(mut self, notice: Arc<dyn Fn() + Send + Sync>) -> Self {
        self.on_deferred = notice;
        self
    }

    /// Inject every binding into scope.
    ///
    /// Must run before the first submission; a package that fails to load in
    /// the evaluator aborts the session.
    pub async fn bind(&mut self, bindings: BindingSet) -> TrymodResult<()> {
        for package in bindings.iter() {
            debug!("Binding {} as {}", package.name, package.alias);
            self.evaluator.bind(&package.alias, &package.value).await?;
        }
        self.bindings = bindings;
        Ok(())
    }

    /// Bindings currently in scope
    pub fn bindings(&self) -> &BindingSet {
        &self.bindings
    }

    /// Evaluator this driver submits to
    pub fn evaluator(&self) -> &E {
        &self.evaluator
    }

    /// Evaluate one submission.
    ///
    /// The whole submission, including waiting for a returned promise to
    /// settle, shares one [`EVALUATION_TIMEOUT`] budget. Running out only
    /// drops interest in the result; the evaluator may keep running the
    /// fragment.
    pub async fn submit(&self, source: &str) -> TrymodResult<Outcome> {
        let deadline = Instant::now() + EVALUATION_TIMEOUT;

        let evaluation = match tokio::time::timeout_at(deadline, self.evaluator.evaluate(source))
            .await
        {
            Ok(result) => result?,
            Err(_) => return Err(timed_out("Submission")),
        };

        match evaluation {
            Evaluation::Ready(value) => Ok(Outcome::Immediate(value)),
            Evaluation::Deferred(pending) => {
                (self.on_deferred)();
                match tokio::time::timeout_at(deadline, pending).await {
                    Ok(result) => result.map(Outcome::Settled),
                    Err(_) => Err(timed_out("Promise")),
                }
            }
        }
    }
}

fn timed_out(what: &str) -> TrymodError {
    debug!("{} exceeded {:?}", what, EVALUATION_TIMEOUT);
    TrymodError::EvaluationTimeout {
        millis: EVALUATION_TIMEOUT.as_millis() as u64,
    }
}
