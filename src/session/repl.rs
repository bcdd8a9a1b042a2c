//! Interactive read-eval-print loop on top of a [`SessionDriver`]

use super::bindings::BindingSet;
use super::driver::SessionDriver;
use super::evaluator::Evaluator;
use crate::error::{TrymodError, TrymodResult};
use console::style;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Line-editor settings for the loop
#[derive(Debug, Clone)]
pub struct ReplOptions {
    /// Prompt shown before each submission
    pub prompt: String,
    /// Persistent history file
    pub history: PathBuf,
}

/// REPL commands handled without the evaluator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Exit,
    Help,
}

impl Command {
    fn parse(input: &str) -> Option<Self> {
        match input.trim() {
            ".exit" => Some(Self::Exit),
            ".help" => Some(Self::Help),
            _ => None,
        }
    }
}

/// Run the loop until `.exit`, Ctrl-D, or the evaluator goes away
pub async fn run<E: Evaluator>(driver: &SessionDriver<E>, options: &ReplOptions) -> TrymodResult<()> {
    let mut editor = DefaultEditor::new()
        .map_err(|e| TrymodError::User(format!("Failed to create line editor: {}", e)))?;

    if options.history.exists() {
        if let Err(e) = editor.load_history(&options.history) {
            warn!("Could not read history {}: {}", options.history.display(), e);
        }
    }

    let result = read_eval_print(&mut editor, driver, &options.prompt).await;
    save_history(&mut editor, &options.history);
    result
}

/// What the loop does after a line has been handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Exit,
}

async fn read_eval_print<E: Evaluator>(
    editor: &mut DefaultEditor,
    driver: &SessionDriver<E>,
    prompt: &str,
) -> TrymodResult<()> {
    loop {
        let line = match editor.readline(prompt) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => {
                println!("{}", style("(To exit, press Ctrl+D or type .exit)").dim());
                continue;
            }
            Err(ReadlineError::Eof) => return Ok(()),
            Err(e) => return Err(TrymodError::User(format!("Failed to read input: {}", e))),
        };

        if line.trim().is_empty() {
            continue;
        }
        record_history(editor, &line);

        if handle_line(driver, &line).await? == Flow::Exit {
            return Ok(());
        }
    }
}

/// Run one line: a REPL command or a submission.
///
/// Submission errors are printed and the session goes on; any other error
/// ends the loop.
async fn handle_line<E: Evaluator>(driver: &SessionDriver<E>, line: &str) -> TrymodResult<Flow> {
    match Command::parse(line) {
        Some(Command::Exit) => return Ok(Flow::Exit),
        Some(Command::Help) => {
            print!("{}", help_text(driver.bindings()));
            return Ok(Flow::Continue);
        }
        None => {}
    }

    tokio::select! {
        result = driver.submit(line) => match result {
            Ok(outcome) => println!("{}", outcome.value()),
            Err(e) if e.is_submission_error() => eprintln!("{}", style(e).red()),
            Err(e) => return Err(e),
        },
        _ = tokio::signal::ctrl_c() => {
            debug!("Submission interrupted");
            eprintln!("{}", style("Interrupted").yellow());
        }
    }
    Ok(Flow::Continue)
}

fn help_text(bindings: &BindingSet) -> String {
    let mut text = String::from(".exit    Exit the REPL\n.help    Print this help message\n");
    if bindings.is_empty() {
        return text;
    }
    text.push_str("\nPackages in scope:\n");
    for package in bindings.iter() {
        let version = package.value.version.as_deref().unwrap_or("unknown");
        text.push_str(&format!(
            "  {} {}@{}\n",
            style(&package.alias).cyan(),
            package.name,
            style(version).dim()
        ));
    }
    text
}

fn record_history(editor: &mut DefaultEditor, line: &str) {
    if let Err(e) = editor.add_history_entry(line) {
        warn!("Could not record history entry: {}", e);
    }
}

fn save_history(editor: &mut DefaultEditor, path: &Path) {
    if let Some(parent) = path.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            warn!("Could not create {}: {}", parent.display(), e);
            return;
        }
    }
    if let Err(e) = editor.save_history(path) {
        warn!("Could not write history {}: {}", path.display(), e);
    }
}
