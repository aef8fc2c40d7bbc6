//! Collector for the findings of a run's setup phase.

use crate::code::DiagnosticCode;
use crate::diagnostic::{Diagnostic, Severity};
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Default)]
struct Report {
    entries: Vec<Diagnostic>,
    errors: usize,
}

/// Collects diagnostics from the setup phase.
///
/// Architecture, application and configuration checks all report here; the
/// CLI renders the collection once setup finishes. Errors stay counted after
/// [`take_all`](Self::take_all) so a drained sink still reports failure.
#[derive(Default)]
pub struct DiagnosticSink {
    report: Mutex<Report>,
}

impl DiagnosticSink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    // A panicking emitter leaves the vector intact, so poisoning is ignored.
    fn report(&self) -> MutexGuard<'_, Report> {
        self.report.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Records one diagnostic.
    pub fn emit(&self, diag: Diagnostic) {
        let mut report = self.report();
        if diag.severity == Severity::Error {
            report.errors += 1;
        }
        report.entries.push(diag);
    }

    /// Whether any error has been recorded.
    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }

    /// Number of errors recorded so far, including drained ones.
    pub fn error_count(&self) -> usize {
        self.report().errors
    }

    /// Number of pending diagnostics carrying `code`.
    pub fn count(&self, code: DiagnosticCode) -> usize {
        self.report().entries.iter().filter(|d| d.code == code).count()
    }

    /// Drains the pending diagnostics.
    pub fn take_all(&self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.report().entries)
    }

    /// Copies the pending diagnostics.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.report().entries.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code::Category;

    const NO_PORTS: DiagnosticCode = DiagnosticCode::new(Category::Compat, 101);

    fn port_shortage() -> Diagnostic {
        Diagnostic::error(DiagnosticCode::new(Category::Compat, 104), "3 inputs, 2 ports")
    }

    fn no_ports() -> Diagnostic {
        Diagnostic::warning(NO_PORTS, "no input ports")
    }

    #[test]
    fn fresh_sink_is_clean() {
        let sink = DiagnosticSink::new();
        assert!(!sink.has_errors());
        assert!(sink.diagnostics().is_empty());
    }

    #[test]
    fn warnings_do_not_fail_setup() {
        let sink = DiagnosticSink::new();
        sink.emit(no_ports());
        sink.emit(no_ports());
        assert!(!sink.has_errors());
        assert_eq!(sink.count(NO_PORTS), 2);
    }

    #[test]
    fn drained_errors_still_count() {
        let sink = DiagnosticSink::new();
        sink.emit(port_shortage());
        sink.emit(no_ports());
        assert_eq!(sink.take_all().len(), 2);
        assert!(sink.take_all().is_empty());
        assert_eq!(sink.count(NO_PORTS), 0);
        assert!(sink.has_errors());
    }

    #[test]
    fn shared_between_evaluator_threads() {
        let sink = DiagnosticSink::new();
        std::thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| {
                    for _ in 0..25 {
                        sink.emit(port_shortage());
                    }
                });
            }
        });
        assert_eq!(sink.error_count(), 100);
    }
}
