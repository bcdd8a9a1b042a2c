//! Interactive session
//!
//! Packages are bound into an evaluator's scope once, before the first
//! submission. Each submission is then compiled and run against that scope
//! with a time budget on its immediate result; promise results are awaited
//! and unwrapped before display.

pub mod bindings;
pub mod driver;
pub mod evaluator;
pub mod node;
pub mod protocol;
pub mod repl;

pub use bindings::BindingSet;
pub use driver::{Outcome, SessionDriver, DEFERRED_NOTICE, EVALUATION_TIMEOUT};
pub use evaluator::{Evaluation, Evaluator, Value};
pub use node::{HostOptions, NodeEvaluator};
pub use repl::{run as run_repl, ReplOptions};
