#![allow(dead_code)]
//! # Blend65
//!
//! The middle-end and back-end core of a compiler for Blend65, a small
//! systems language for the MOS 6502 (Commodore 64). This crate takes
//! parsed module ASTs (lexing/parsing happen upstream, out of scope here)
//! and carries them through semantic analysis, SSA intermediate-language
//! construction, control-flow/loop analysis, multi-module linking, and
//! 6502 code generation, finishing as ACME assembler text and, optionally,
//! an assembled `.prg` binary.
//!
//! ## Pipeline
//!
//! ```text
//! ModuleRegistry -> DependencyGraph -> (topological order)
//!     -> SemanticAnalyzer -> GlobalSymbolTable
//!     -> RecursionChecker (fatal)
//!     -> ILGenerator -> IlModule (merged across modules)
//!     -> LoopAnalyzer (informational)
//!     -> CodeGenerator -> AsmModule
//!     -> AcmeEmitter -> source text -> acme -> .prg
//! ```
//!
//! [`pipeline::compile`] drives the whole thing; everything else in this
//! crate is a single pass usable on its own for testing or tooling.
//!
//! ## Design
//!
//! - No recursion: every function's locals live at a compile-time-known
//!   address ("Static Frame Allocation"), enforced by [`callgraph`] before
//!   any code is generated.
//! - Semantic analysis produces an SSA-form [`il`] rather than walking the
//!   AST again during code generation; [`codegen`] only ever sees IL.
//! - Every pass reports through a shared [`diagnostics::DiagnosticSink`]
//!   instead of returning early on the first problem, so one compilation
//!   attempt surfaces every independent error it can.

pub mod acme;
pub mod ast;
pub mod asmil;
pub mod callgraph;
pub mod codegen;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod globaltable;
pub mod il;
pub mod ilgen;
pub mod loopanalysis;
pub mod modgraph;
pub mod pipeline;
pub mod semantic;
pub mod source;
pub mod symbols;
pub mod typesys;

/// Version of this crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use ast::{BinaryOp, Expr, Item, Literal, Module, Param, Stmt, TypeExpr, UnaryOp};
pub use config::{CompileOptions, Target};
pub use diagnostics::{Diagnostic, DiagnosticSink, Severity};
pub use error::{Error, Result};
pub use il::{IlFunction, IlModule, IlType};
pub use pipeline::{compile, compile_reporting, CompileResult, SourceModule};
pub use typesys::Type;
