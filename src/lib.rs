//! trymod - Try npm packages without adding them to a project
//!
//! Installs packages into a shared cache, loads them, and exposes each one
//! by name inside an interactive node REPL.

pub mod cli;
pub mod config;
pub mod error;
pub mod package;
pub mod session;
pub mod ui;

pub use error::{TrymodError, TrymodResult};
