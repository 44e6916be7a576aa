//! Colored terminal output.

use std::path::Path;

use console::{Style, Term};

/// Terminal output formatter. Everything goes to stderr.
pub(crate) struct Output {
    term: Term,
    green: Style,
    yellow: Style,
    red: Style,
    dim: Style,
}

impl Output {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self {
            term: Term::stderr(),
            green: Style::new().green(),
            yellow: Style::new().yellow(),
            red: Style::new().red(),
            dim: Style::new().dim(),
        }
    }

    pub(crate) fn info(&self, msg: &str) {
        let _ = self.term.write_line(msg);
    }

    /// Print a dimmed `label: value` line.
    pub(crate) fn detail(&self, label: &str, value: &str) {
        let _ = self
            .term
            .write_line(&format!("{} {value}", self.dim.apply_to(format!("{label}:"))));
    }

    /// Print a green "Wrote <path>" line.
    pub(crate) fn wrote(&self, path: &Path) {
        let _ = self.term.write_line(
            &self
                .green
                .apply_to(format!("Wrote {}", path.display()))
                .to_string(),
        );
    }

    pub(crate) fn warning(&self, msg: &str) {
        let _ = self.term.write_line(&self.yellow.apply_to(msg).to_string());
    }

    pub(crate) fn error(&self, msg: &str) {
        let _ = self.term.write_line(&self.red.apply_to(msg).to_string());
    }
}
