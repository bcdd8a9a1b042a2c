//! Start command - load packages and run the REPL

use crate::config::Config;
use crate::error::TrymodResult;
use crate::package::{normalize, CacheDir, NpmInstaller, PackageLoader, PackageRequest};
use crate::session::{
    self, BindingSet, HostOptions, NodeEvaluator, ReplOptions, SessionDriver, EVALUATION_TIMEOUT,
};
use crate::ui::{self, InstallProgress, TaskSpinner, UiContext};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// Inputs for a REPL session
#[derive(Debug)]
pub struct StartArgs {
    /// Packages requested on the command line
    pub packages: Vec<PackageRequest>,
    /// Persistent REPL history file
    pub history: PathBuf,
    /// Load packages, then return without starting the REPL
    pub non_interactive: bool,
}

/// Execute the start command
pub async fn execute(
    args: StartArgs,
    cache: CacheDir,
    config: &Config,
    ctx: &UiContext,
) -> TrymodResult<()> {
    ui::intro(ctx, "Starting a REPL with packages installed and loaded for you...");

    let requests = normalize(args.packages)?;
    let bindings = load_bindings(&requests, cache.clone(), config, ctx).await?;

    if args.non_interactive {
        for package in bindings.iter() {
            ui::binding(ctx, &package.name, &package.alias);
        }
        ui::step_info(ctx, "REPL started...");
        debug!("Non-interactive mode, not starting the REPL");
        return Ok(());
    }

    let mut spinner = TaskSpinner::new(ctx);
    spinner.start(&format!("Starting {}...", config.session.node));
    let options = HostOptions {
        node: config.session.node.clone(),
        timeout: EVALUATION_TIMEOUT,
        colors: ctx.use_colors(),
        cache_root: Some(cache.root().to_path_buf()),
    };
    let host = match NodeEvaluator::spawn(&options).await {
        Ok(host) => {
            spinner.stop("REPL started...");
            host
        }
        Err(e) => {
            spinner.stop_error(&format!("Could not start {}", config.session.node));
            return Err(e);
        }
    };

    let mut driver = SessionDriver::new(host);
    if let Err(e) = driver.bind(bindings).await {
        driver.evaluator().shutdown().await;
        return Err(e);
    }
    for package in driver.bindings().iter() {
        ui::binding(ctx, &package.name, &package.alias);
    }
    ui::remark(ctx, "Type .help for commands, .exit or Ctrl+D to quit");

    let repl = ReplOptions {
        prompt: config.session.prompt.clone(),
        history: args.history,
    };
    let result = session::run_repl(&driver, &repl).await;
    driver.evaluator().shutdown().await;
    result
}

/// Load every request from the cache, installing misses with npm
async fn load_bindings(
    requests: &[PackageRequest],
    cache: CacheDir,
    config: &Config,
    ctx: &UiContext,
) -> TrymodResult<BindingSet> {
    let progress = Arc::new(InstallProgress::new(ctx));
    let observer = Arc::clone(&progress);
    let loader = Arc::new(
        PackageLoader::new(cache, Arc::new(NpmInstaller::new(&config.installer)))
            .with_observer(Arc::new(move |event| observer.on_event(&event))),
    );

    let loaded = loader.load(requests).await;
    progress.finish();
    BindingSet::from_packages(loaded?)
}
