//! CLI argument definitions using clap derive

use crate::package::PackageRequest;
use clap::builder::FalseyValueParser;
use clap::{ArgAction, Parser};
use std::path::PathBuf;

/// trymod - Try npm packages in a REPL
///
/// Installs packages into a shared cache, loads them, and starts a node
/// REPL with each one bound to a variable.
#[derive(Parser, Debug)]
#[command(name = "trymod")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Packages to load: `name` (bound as name with - and . turned into _)
    /// or `name=alias`
    #[arg(value_name = "PACKAGE")]
    pub packages: Vec<PackageRequest>,

    /// Remove all cached packages and exit
    #[arg(long)]
    pub clear: bool,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, env = "TRYMOD_CONFIG")]
    pub config: Option<PathBuf>,

    /// Package cache directory [default: ~/.trymod]
    #[arg(long, env = "TRYMOD_PATH")]
    pub cache_dir: Option<PathBuf>,

    /// REPL history file [default: <cache-dir>/repl_history]
    #[arg(long, env = "TRYMOD_HISTORY_PATH")]
    pub history: Option<PathBuf>,

    /// Load packages but do not start the REPL
    #[arg(long, env = "TRYMOD_NONINTERACTIVE", value_parser = FalseyValueParser::new())]
    pub non_interactive: bool,
}
