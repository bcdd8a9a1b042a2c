//! trymod - Try npm packages in a REPL
//!
//! CLI entry point: clears the cache or loads packages and starts the REPL.

use clap::Parser;
use console::style;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;
use trymod::cli::commands::{self, start::StartArgs};
use trymod::cli::Cli;
use trymod::config::ConfigManager;
use trymod::error::TrymodResult;
use trymod::package::CacheDir;
use trymod::ui::UiContext;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> TrymodResult<()> {
    let cli = Cli::parse();

    let config_manager = match cli.config {
        Some(ref path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    };
    let config = config_manager.load().await?;

    // Initialize logging: 0 = warn, 1 = info, 2+ = debug
    let filter = match cli.verbose {
        0 => EnvFilter::new("trymod=warn"),
        1 => EnvFilter::new("trymod=info"),
        _ => EnvFilter::new("trymod=debug"),
    };
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .without_time();
    if config.general.json_logs() {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
    debug!("Using config {}", config_manager.path().display());

    let ctx = if cli.non_interactive {
        UiContext::non_interactive()
    } else {
        UiContext::detect()
    };

    let cache_dir = cli
        .cache_dir
        .clone()
        .unwrap_or_else(ConfigManager::default_cache_dir);
    debug!("Cache directory: {}", cache_dir.display());
    let cache = CacheDir::new(cache_dir);

    if cli.clear {
        return commands::clear(&cache, &ctx).await;
    }

    let history = cli
        .history
        .clone()
        .unwrap_or_else(|| ConfigManager::default_history_path(cache.root()));

    let args = StartArgs {
        packages: cli.packages,
        history,
        non_interactive: cli.non_interactive,
    };
    commands::start(args, cache, &config, &ctx).await
}
