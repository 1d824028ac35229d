//! The ACME emitter and invoker: the last two stages of the
//! pipeline, turning a finished [`crate::asmil::AsmModule`] into ACME
//! assembler source text and then, optionally, into a `.prg` binary by
//! spawning the external `acme` process.
//!
//! Both halves are intentionally dumb relative to the rest of the core:
//! the emitter is a pure formatting pass with no 6502 semantics (every
//! byte/cycle decision was already made by [`crate::asmil`]), and the
//! invoker's only job is shelling out and handing back bytes or a warning.

pub mod emitter;
pub mod invoker;

pub use emitter::emit;
pub use invoker::{assemble, AssembleOutcome};
