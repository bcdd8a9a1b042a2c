//! CLI command implementations

pub mod clear;
pub mod start;

pub use clear::execute as clear;
pub use start::execute as start;
