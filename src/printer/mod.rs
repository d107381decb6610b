//! Diagnostic printer for the CLI (colored when stderr is a terminal).

use is_terminal::IsTerminal;
use owo_colors::OwoColorize;

use crate::process::{ErrorKind, RunError};

pub struct DiagnosticPrinter {
    pub color: bool,
}

impl Default for DiagnosticPrinter {
    fn default() -> Self {
        Self { color: std::io::stderr().is_terminal() }
    }
}

impl DiagnosticPrinter {
    pub fn render(&self, err: &RunError) -> String {
        let label = match err.kind() {
            ErrorKind::Launch | ErrorKind::PipeAcquisition => "launch failed",
            ErrorKind::PrematureTermination => "terminated",
            ErrorKind::NonZeroExit => "failed",
            ErrorKind::StderrNonEmpty => "stderr",
            ErrorKind::Drain => "output error",
        };
        if self.color {
            format!("{} {}", format!("[{}]", label).red().bold(), err)
        } else {
            format!("[{}] {}", label, err)
        }
    }

    pub fn print(&self, err: &RunError) {
        eprintln!("{}", self.render(err));
    }
}
