//! Progress indicators with CI fallback

use super::context::UiContext;
use crate::package::LoadEvent;
use console::style;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// A task spinner with CI fallback
pub struct TaskSpinner {
    spinner: Option<cliclack::ProgressBar>,
    interactive: bool,
}

impl TaskSpinner {
    /// Create a new spinner (shows once started, interactive mode only)
    pub fn new(ctx: &UiContext) -> Self {
        Self {
            spinner: None,
            interactive: ctx.use_fancy_output(),
        }
    }

    /// Start the spinner with a message
    pub fn start(&mut self, message: &str) {
        if self.interactive {
            let spinner = cliclack::spinner();
            spinner.start(message);
            self.spinner = Some(spinner);
        } else {
            println!("{} {}", style("...").dim(), message);
        }
    }

    /// Stop with success message
    pub fn stop(&mut self, message: &str) {
        if let Some(spinner) = self.spinner.take() {
            spinner.stop(message);
        } else {
            println!("{} {}", style("[OK]").green(), message);
        }
    }

    /// Stop with error message
    pub fn stop_error(&mut self, message: &str) {
        if let Some(spinner) = self.spinner.take() {
            spinner.error(message);
        } else {
            println!("{} {}", style("[FAIL]").red(), message);
        }
    }
}

/// Per-package install progress for concurrent loads.
///
/// One indicatif spinner per package being installed in interactive mode,
/// one line per event in CI.
pub struct InstallProgress {
    multi: Option<MultiProgress>,
    bars: Mutex<HashMap<String, ProgressBar>>,
}

impl InstallProgress {
    /// Create a progress display for the given context
    pub fn new(ctx: &UiContext) -> Self {
        Self {
            multi: ctx.use_fancy_output().then(MultiProgress::new),
            bars: Mutex::new(HashMap::new()),
        }
    }

    /// React to a loader event
    pub fn on_event(&self, event: &LoadEvent) {
        match event {
            LoadEvent::CacheHit { name } => self.line(format!(
                "  {} '{}' was already installed since before!",
                style("[CACHED]").blue(),
                name
            )),
            LoadEvent::Installing { name } => match self.multi {
                Some(ref multi) => {
                    let bar = multi.add(ProgressBar::new_spinner());
                    bar.set_style(
                        ProgressStyle::default_spinner()
                            .template("  {spinner:.yellow} {msg}  {elapsed:.dim}")
                            .unwrap_or_else(|_| ProgressStyle::default_spinner())
                            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ "),
                    );
                    bar.set_message(format!("Couldn't find '{}' locally, downloading it now", name));
                    bar.enable_steady_tick(Duration::from_millis(120));
                    self.bars().insert(name.clone(), bar);
                }
                None => println!(
                    "  {} Couldn't find '{}' locally, downloading it now",
                    style("[INSTALL]").yellow(),
                    name
                ),
            },
            LoadEvent::Installed { name } => {
                let message = format!("Installed '{}'", name);
                match self.bars().remove(name) {
                    Some(bar) => bar.finish_with_message(format!("{} {}", style("✓").green(), message)),
                    None => self.line(format!("  {} {}", style("[OK]").green(), message)),
                }
            }
            LoadEvent::Failed { name, reason } => {
                let message = format!("'{}' failed: {}", name, reason);
                match self.bars().remove(name) {
                    Some(bar) => bar.abandon_with_message(format!("{} {}", style("✗").red(), message)),
                    None => self.line(format!("  {} {}", style("[FAIL]").red(), message)),
                }
            }
        }
    }

    /// Stop any spinners still running (their loads were abandoned)
    pub fn finish(&self) {
        for (_, bar) in self.bars().drain() {
            bar.finish_and_clear();
        }
    }

    fn line(&self, message: String) {
        match self.multi {
            Some(ref multi) => {
                if multi.println(&message).is_err() {
                    println!("{}", message);
                }
            }
            None => println!("{}", message),
        }
    }

    fn bars(&self) -> std::sync::MutexGuard<'_, HashMap<String, ProgressBar>> {
        self.bars.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
