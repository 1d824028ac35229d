//! ASM-IL: a typed intermediate representation of 6502 assembly text,
//! sitting between the code generator and the ACME emitter.
//!
//! Keeping this layer typed (rather than generating assembly text directly)
//! lets the code generator reason about byte counts and cycle estimates
//! before any text is produced, and lets the emitter stay a pure formatting
//! pass with no knowledge of 6502 semantics.

pub mod addressing;
pub mod builder;
pub mod item;
pub mod module;
pub mod vice;

pub use addressing::AddressingMode;
pub use builder::AsmBuilder;
pub use item::{AsmItem, CommentStyle, DataType, DataValues, LabelType, Operand};
pub use module::{AsmMetadata, AsmModule, LabelEntry};
