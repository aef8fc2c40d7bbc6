//! Terminal rendering of diagnostics.

use crate::diagnostic::{Diagnostic, Severity};

/// Formats a diagnostic into an output string.
pub trait DiagnosticRenderer {
    /// Renders a single diagnostic.
    fn render(&self, diag: &Diagnostic) -> String;
}

/// Renders diagnostics in a rustc-like terminal format:
///
/// ```text
/// warning[A101]: application reads 2 inputs but the fabric has no input ports
///    = note: input routing is skipped
/// ```
pub struct TerminalRenderer {
    /// Whether to use ANSI color codes in output.
    pub color: bool,
}

impl TerminalRenderer {
    /// Creates a new terminal renderer.
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    fn severity_label(&self, severity: Severity) -> String {
        if !self.color {
            return severity.to_string();
        }
        let ansi = match severity {
            Severity::Error => "31",
            Severity::Warning => "33",
            Severity::Note => "36",
        };
        format!("\x1b[1;{ansi}m{severity}\x1b[0m")
    }
}

impl DiagnosticRenderer for TerminalRenderer {
    fn render(&self, diag: &Diagnostic) -> String {
        let mut out = format!(
            "{}[{}]: {}\n",
            self.severity_label(diag.severity),
            diag.code,
            diag.message
        );
        for note in &diag.notes {
            out.push_str(&format!("   = note: {note}\n"));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code::{Category, DiagnosticCode};

    fn sample() -> Diagnostic {
        Diagnostic::warning(DiagnosticCode::new(Category::Compat, 101), "no input ports")
            .with_note("input routing is skipped")
    }

    #[test]
    fn terminal_plain() {
        let out = TerminalRenderer::new(false).render(&sample());
        assert!(out.starts_with("warning[A101]: no input ports\n"));
        assert!(out.contains("= note: input routing is skipped"));
    }

    #[test]
    fn terminal_color_wraps_severity() {
        let out = TerminalRenderer::new(true).render(&sample());
        assert!(out.contains("\x1b[1;33mwarning\x1b[0m"));
    }
}
