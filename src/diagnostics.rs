//! Diagnostics and the append-only sink passes report into.
//!
//! No pass throws across a pass boundary: every pass owns (or shares) a
//! [`DiagnosticSink`] and pushes [`Diagnostic`]s into it instead.

use crate::source::Span;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Mutex};

/// Severity of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    /// Blocks further compilation of the affected construct (or, for a few
    /// codes, the whole pipeline).
    Error,
    /// Does not block compilation.
    Warning,
    /// Purely informational (e.g. loop analysis results).
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
        };
        write!(f, "{s}")
    }
}

/// A single compiler diagnostic.
///
/// `code` is namespaced: `S0xx` semantic, `S02x` type checks, `S04x`
/// statement checks, `S05x` module errors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Namespaced diagnostic code, e.g. `"UNDEFINED_VARIABLE"`.
    pub code: String,
    /// Severity.
    pub severity: Severity,
    /// Human-readable message.
    pub message: String,
    /// Primary source location.
    pub location: Span,
    /// Secondary locations for "defined here" / "first call site" style notes.
    pub related_locations: Vec<(String, Span)>,
    /// The module this diagnostic was raised while analysing, used to order
    /// cross-module diagnostics by topological compile order.
    pub module: String,
}

impl Diagnostic {
    /// Creates an error-severity diagnostic.
    pub fn error(code: impl Into<String>, message: impl Into<String>, location: Span, module: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            severity: Severity::Error,
            message: message.into(),
            location,
            related_locations: Vec::new(),
            module: module.into(),
        }
    }

    /// Creates a warning-severity diagnostic.
    pub fn warning(code: impl Into<String>, message: impl Into<String>, location: Span, module: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            severity: Severity::Warning,
            message: message.into(),
            location,
            related_locations: Vec::new(),
            module: module.into(),
        }
    }

    /// Creates an info-severity diagnostic.
    pub fn info(code: impl Into<String>, message: impl Into<String>, location: Span, module: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            severity: Severity::Info,
            message: message.into(),
            location,
            related_locations: Vec::new(),
            module: module.into(),
        }
    }

    /// Attaches a related location (e.g. the first declaration in a
    /// duplicate-declaration error).
    pub fn with_related(mut self, label: impl Into<String>, location: Span) -> Self {
        self.related_locations.push((label.into(), location));
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}] {}:{}: {}",
            self.severity, self.code, self.module, self.location, self.message
        )?;
        for (label, loc) in &self.related_locations {
            write!(f, "\n  note: {label} at {}:{loc}", self.module)?;
        }
        Ok(())
    }
}

/// Append-only, thread-safe diagnostic collector.
///
/// A simple `Mutex`-guarded `Vec` suffices: the pipeline is single-threaded
/// today, but the sink stays safe to share if module analysis is ever
/// parallelized across independent dependency-graph layers.
#[derive(Debug, Clone, Default)]
pub struct DiagnosticSink {
    inner: Arc<Mutex<Vec<Diagnostic>>>,
}

impl DiagnosticSink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a diagnostic.
    pub fn push(&self, diagnostic: Diagnostic) {
        self.inner.lock().expect("diagnostic sink poisoned").push(diagnostic);
    }

    /// True if any `Error`-severity diagnostic has been recorded.
    pub fn has_errors(&self) -> bool {
        self.inner
            .lock()
            .expect("diagnostic sink poisoned")
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    /// Snapshot of every diagnostic recorded so far, in insertion order.
    pub fn all(&self) -> Vec<Diagnostic> {
        self.inner.lock().expect("diagnostic sink poisoned").clone()
    }

    /// Snapshot ordered by `(module compile-order index, location)`, so
    /// diagnostics read out in a stable, deterministic order across modules.
    pub fn into_sorted(&self, module_order: &[String]) -> Vec<Diagnostic> {
        let mut all = self.all();
        all.sort_by_key(|d| {
            let idx = module_order.iter().position(|m| m == &d.module).unwrap_or(usize::MAX);
            (idx, d.location)
        });
        all
    }

    /// Clears every recorded diagnostic.
    pub fn clear(&self) {
        self.inner.lock().expect("diagnostic sink poisoned").clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{Position, Span};

    fn loc() -> Span {
        Span::new(Position::start(), Position::start())
    }

    #[test]
    fn has_errors_false_for_warnings_only() {
        let sink = DiagnosticSink::new();
        sink.push(Diagnostic::warning("W1", "careful", loc(), "m"));
        assert!(!sink.has_errors());
        sink.push(Diagnostic::error("E1", "bad", loc(), "m"));
        assert!(sink.has_errors());
    }

    #[test]
    fn sorted_by_module_order() {
        let sink = DiagnosticSink::new();
        sink.push(Diagnostic::error("E1", "in A", loc(), "A"));
        sink.push(Diagnostic::error("E2", "in C", loc(), "C"));
        sink.push(Diagnostic::error("E3", "in B", loc(), "B"));
        let order = vec!["C".to_string(), "B".to_string(), "A".to_string()];
        let sorted = sink.into_sorted(&order);
        let modules: Vec<_> = sorted.iter().map(|d| d.module.clone()).collect();
        assert_eq!(modules, vec!["C", "B", "A"]);
    }
}
