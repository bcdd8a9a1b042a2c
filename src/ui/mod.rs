//! UI module for consistent CLI output
//!
//! Uses `cliclack` (default theme) for banners and log lines and `indicatif`
//! for install spinners, with automatic fallback to plain output in CI and
//! non-interactive runs.
//!
//! # Example
//!
//! ```rust,ignore
//! use trymod::ui::{self, UiContext, TaskSpinner};
//!
//! let ctx = UiContext::detect();
//!
//! ui::intro(&ctx, "trymod");
//!
//! let mut spinner = TaskSpinner::new(&ctx);
//! spinner.start("Starting node...");
//! // ... do work ...
//! spinner.stop("REPL started...");
//!
//! ui::binding(&ctx, "lodash", "_");
//! ```

mod context;
mod output;
mod progress;

pub use context::UiContext;
pub use output::{binding, intro, outro_success, remark, step_info, step_ok};
pub use progress::{InstallProgress, TaskSpinner};
