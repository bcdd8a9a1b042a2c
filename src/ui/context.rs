//! Terminal detection: spinners and framed output only for a person at a TTY

use std::io::IsTerminal;

/// Variables set by CI runners, whose logs should stay plain
const CI_VARS: &[&str] = &["CI", "GITHUB_ACTIONS", "GITLAB_CI", "BUILDKITE", "TF_BUILD"];

/// How output should be rendered for this run
#[derive(Debug, Clone, Copy)]
pub struct UiContext {
    fancy: bool,
}

impl UiContext {
    /// Fancy output when stdin and stdout are terminals outside CI
    pub fn detect() -> Self {
        let tty = std::io::stdin().is_terminal() && std::io::stdout().is_terminal();
        Self {
            fancy: tty && !running_in_ci(|var| std::env::var_os(var).is_some()),
        }
    }

    /// Plain line-per-event output (`--non-interactive`, tests)
    pub fn non_interactive() -> Self {
        Self { fancy: false }
    }

    /// Spinners, cliclack framing
    pub fn use_fancy_output(&self) -> bool {
        self.fancy
    }

    /// Whether the REPL should render values with ANSI colors
    pub fn use_colors(&self) -> bool {
        self.fancy && console::colors_enabled()
    }
}

fn running_in_ci(is_set: impl Fn(&str) -> bool) -> bool {
    CI_VARS.iter().any(|var| is_set(var))
}
