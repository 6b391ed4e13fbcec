//! Status lines on stderr.
//!
//! Lines are a right-aligned verb followed by a value, e.g.
//! `  Watching /var/www/html (.css, .js)`.

use std::fmt::Display;

use console::{Style, Term};
use livesync_config::Config;

/// Width the status label is right-aligned to.
const LABEL_WIDTH: usize = 10;

/// Terminal output formatter.
pub(crate) struct Output {
    term: Term,
    label: Style,
    yellow: Style,
    red: Style,
}

impl Output {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self {
            term: Term::stderr(),
            label: Style::new().green().bold(),
            yellow: Style::new().yellow(),
            red: Style::new().red(),
        }
    }

    /// Print a `label value` status line with the label highlighted.
    pub(crate) fn status(&self, label: &str, value: impl Display) {
        let padded = format!("{label:>LABEL_WIDTH$}");
        let _ = self
            .term
            .write_line(&format!("{} {value}", self.label.apply_to(padded)));
    }

    /// Print what `serve` is about to do.
    pub(crate) fn startup(&self, config: &Config) {
        for (label, value) in startup_lines(config) {
            self.status(label, value);
        }
    }

    /// Print a warning message (yellow).
    pub(crate) fn warning(&self, msg: &str) {
        let _ = self.term.write_line(&self.yellow.apply_to(msg).to_string());
    }

    /// Print an error message (red).
    pub(crate) fn error(&self, msg: &str) {
        let _ = self.term.write_line(&self.red.apply_to(msg).to_string());
    }
}

/// Status lines summarizing a `serve` run.
fn startup_lines(config: &Config) -> Vec<(&'static str, String)> {
    let extensions = config
        .watch_resolved
        .extensions
        .iter()
        .map(|ext| format!(".{ext}"))
        .collect::<Vec<_>>()
        .join(", ");

    vec![
        (
            "Watching",
            format!("{} ({extensions})", config.watch_resolved.root.display()),
        ),
        (
            "Listening",
            format!("{}:{}", config.server.host, config.server.port),
        ),
        ("Clients", config.connection_url()),
    ]
}
