//! Library-level error type for the Blend65 compiler core.
//!
//! Recoverable, user-facing problems (type mismatches, undefined
//! identifiers, duplicate declarations) are collected into a
//! [`crate::diagnostics::DiagnosticSink`], not returned as `Err`. `Error`
//! covers only the *fatal* conditions that abort the pipeline, plus
//! internal plumbing failures. Internal invariant violations (a basic
//! block with two terminators, a double-defined SSA register) are
//! reserved for `panic!` and never appear here - they indicate compiler
//! bugs, not user errors.

use crate::diagnostics::Diagnostic;
use thiserror::Error;

/// Fatal compiler errors.
#[derive(Error, Debug, Clone)]
pub enum Error {
    /// A module was registered twice under the same name.
    #[error("module `{name}` is already registered (first at {first_path}, again at {second_path})")]
    DuplicateModule {
        /// Offending module name.
        name: String,
        /// File path of the first registration.
        first_path: String,
        /// File path of the second registration.
        second_path: String,
    },

    /// The module dependency graph contains one or more cycles.
    #[error("circular module dependency: {}", cycles.iter().map(|c| c.join(" -> ")).collect::<Vec<_>>().join("; "))]
    CircularDependency {
        /// Every elementary cycle found, each as a module-name path.
        cycles: Vec<Vec<String>>,
    },

    /// A module was referenced (imported, or looked up) that was never
    /// registered.
    #[error("unknown module `{name}`")]
    UnknownModule {
        /// The module name that could not be resolved.
        name: String,
    },

    /// Recursion was detected in the call graph; SFA requires a DAG.
    #[error("recursion detected, compilation aborted: {} affected function(s)", diagnostics.len())]
    Recursion {
        /// One diagnostic per recursive cycle found.
        diagnostics: Vec<Diagnostic>,
    },

    /// Semantic analysis produced one or more fatal (`Error`-severity)
    /// diagnostics; the pipeline stops before IL generation.
    #[error("semantic analysis failed with {} error(s)", diagnostics.len())]
    Semantic {
        /// Every diagnostic collected during the failing pass.
        diagnostics: Vec<Diagnostic>,
    },

    /// Code generation asked for more zero-page or RAM space than is
    /// available under the active [`crate::config::CompileOptions`].
    #[error("{region} overflow: requested {requested} byte(s), only {available} available")]
    StorageOverflow {
        /// Which storage region overflowed (`"zero page"` or `"RAM"`).
        region: String,
        /// Bytes requested.
        requested: usize,
        /// Bytes actually available.
        available: usize,
    },

    /// The external `acme` assembler could not be located or spawned.
    #[error("failed to invoke acme assembler: {0}")]
    AcmeUnavailable(String),

    /// A generic compiler error not covered by a more specific variant.
    #[error("compiler error: {0}")]
    Internal(String),
}

impl Error {
    /// Shorthand for [`Error::Internal`].
    pub fn internal(msg: impl Into<String>) -> Self {
        Error::Internal(msg.into())
    }
}

/// Result type used throughout the Blend65 compiler core.
pub type Result<T> = std::result::Result<T, Error>;
