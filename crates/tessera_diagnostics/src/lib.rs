//! Setup-time diagnostics for the mapper.
//!
//! Configuration and compatibility findings that do not abort a run (for
//! example an application that reads input ports the fabric does not expose)
//! are emitted as [`Diagnostic`]s into a thread-safe [`DiagnosticSink`] and
//! rendered by the CLI with [`TerminalRenderer`]. Run-time routing failures
//! are not diagnostics: they only show up as penalty cost.

#![warn(missing_docs)]

pub mod code;
pub mod diagnostic;
pub mod renderer;
pub mod sink;

pub use code::{Category, DiagnosticCode};
pub use diagnostic::{Diagnostic, Severity};
pub use renderer::{DiagnosticRenderer, TerminalRenderer};
pub use sink::DiagnosticSink;
