//! IL instructions.
//!
//! Represented as a sum type with one variant per opcode, pattern-matched
//! in visitors, rather than a generic `{opcode, operands}` record.

use super::value::{BlockId, IlValue, VReg};
use crate::source::Span;
use std::fmt;

/// Per-instruction metadata that doesn't participate in dataflow.
#[derive(Debug, Clone, Default)]
pub struct InstructionMetadata {
    pub location: Option<Span>,
    /// Set on instructions inside a raster-timing-critical region; consumed
    /// by the (future) scheduler, not acted on by this core.
    pub raster_critical: bool,
    /// For `LOAD_GLOBAL`/`STORE_GLOBAL` against `@map` fields: the map and
    /// field name, so the code generator can recover the absolute address
    /// without re-resolving the symbol table.
    pub map_info: Option<(String, String)>,
    pub source_expr: Option<String>,
    pub estimated_cycles: Option<u32>,
}

/// A single IL instruction.
#[derive(Debug, Clone)]
pub enum Instruction {
    Const { result: VReg, value: IlValue },

    Add { result: VReg, a: IlValue, b: IlValue },
    Sub { result: VReg, a: IlValue, b: IlValue },
    Mul { result: VReg, a: IlValue, b: IlValue },
    Div { result: VReg, a: IlValue, b: IlValue },
    Mod { result: VReg, a: IlValue, b: IlValue },
    Neg { result: VReg, a: IlValue },

    And { result: VReg, a: IlValue, b: IlValue },
    Or { result: VReg, a: IlValue, b: IlValue },
    Xor { result: VReg, a: IlValue, b: IlValue },
    Not { result: VReg, a: IlValue },
    Shl { result: VReg, a: IlValue, b: IlValue },
    Shr { result: VReg, a: IlValue, b: IlValue },

    CmpEq { result: VReg, a: IlValue, b: IlValue },
    CmpNe { result: VReg, a: IlValue, b: IlValue },
    CmpLt { result: VReg, a: IlValue, b: IlValue },
    CmpLe { result: VReg, a: IlValue, b: IlValue },
    CmpGt { result: VReg, a: IlValue, b: IlValue },
    CmpGe { result: VReg, a: IlValue, b: IlValue },

    Load { result: VReg, address: IlValue },
    Store { address: IlValue, value: IlValue },
    LoadGlobal { result: VReg, name: String },
    StoreGlobal { name: String, value: IlValue },

    Jump { target: BlockId },
    Branch { condition: IlValue, then_block: BlockId, else_block: BlockId },
    Return { value: IlValue },
    ReturnVoid,
    Call { callee: String, args: Vec<IlValue>, result: Option<VReg> },

    /// Predecessor values as `(block_id, value)` pairs — block identity is
    /// the stable [`BlockId`] index.
    Phi { result: VReg, incoming: Vec<(BlockId, IlValue)> },

    IntrinsicPeek { result: VReg, address: IlValue },
    IntrinsicPoke { address: IlValue, value: IlValue },
    IntrinsicPeekW { result: VReg, address: IlValue },
    IntrinsicPokeW { address: IlValue, value: IlValue },

    CpuSei,
    CpuCli,
    CpuNop,
    CpuBrk,
    CpuPha,
    CpuPla,
    CpuPhp,
    CpuPlp,

    IntrinsicLo { result: VReg, value: IlValue },
    IntrinsicHi { result: VReg, value: IlValue },

    VolatileRead { result: VReg, address: IlValue },
    VolatileWrite { address: IlValue, value: IlValue },
    OptBarrier,
}

impl Instruction {
    /// The register this instruction defines, if any.
    pub fn result(&self) -> Option<&VReg> {
        match self {
            Instruction::Const { result, .. }
            | Instruction::Add { result, .. }
            | Instruction::Sub { result, .. }
            | Instruction::Mul { result, .. }
            | Instruction::Div { result, .. }
            | Instruction::Mod { result, .. }
            | Instruction::Neg { result, .. }
            | Instruction::And { result, .. }
            | Instruction::Or { result, .. }
            | Instruction::Xor { result, .. }
            | Instruction::Not { result, .. }
            | Instruction::Shl { result, .. }
            | Instruction::Shr { result, .. }
            | Instruction::CmpEq { result, .. }
            | Instruction::CmpNe { result, .. }
            | Instruction::CmpLt { result, .. }
            | Instruction::CmpLe { result, .. }
            | Instruction::CmpGt { result, .. }
            | Instruction::CmpGe { result, .. }
            | Instruction::Load { result, .. }
            | Instruction::LoadGlobal { result, .. }
            | Instruction::Phi { result, .. }
            | Instruction::IntrinsicPeek { result, .. }
            | Instruction::IntrinsicPeekW { result, .. }
            | Instruction::IntrinsicLo { result, .. }
            | Instruction::IntrinsicHi { result, .. }
            | Instruction::VolatileRead { result, .. } => Some(result),
            Instruction::Call { result, .. } => result.as_ref(),
            _ => None,
        }
    }

    /// Mutable counterpart of [`Self::result`], used to attach a source
    /// name to an already-emitted instruction's result register (e.g. so
    /// a `let` binding's register reads back as the variable's name rather
    /// than a bare id).
    pub fn result_mut(&mut self) -> Option<&mut VReg> {
        match self {
            Instruction::Const { result, .. }
            | Instruction::Add { result, .. }
            | Instruction::Sub { result, .. }
            | Instruction::Mul { result, .. }
            | Instruction::Div { result, .. }
            | Instruction::Mod { result, .. }
            | Instruction::Neg { result, .. }
            | Instruction::And { result, .. }
            | Instruction::Or { result, .. }
            | Instruction::Xor { result, .. }
            | Instruction::Not { result, .. }
            | Instruction::Shl { result, .. }
            | Instruction::Shr { result, .. }
            | Instruction::CmpEq { result, .. }
            | Instruction::CmpNe { result, .. }
            | Instruction::CmpLt { result, .. }
            | Instruction::CmpLe { result, .. }
            | Instruction::CmpGt { result, .. }
            | Instruction::CmpGe { result, .. }
            | Instruction::Load { result, .. }
            | Instruction::LoadGlobal { result, .. }
            | Instruction::Phi { result, .. }
            | Instruction::IntrinsicPeek { result, .. }
            | Instruction::IntrinsicPeekW { result, .. }
            | Instruction::IntrinsicLo { result, .. }
            | Instruction::IntrinsicHi { result, .. }
            | Instruction::VolatileRead { result, .. } => Some(result),
            Instruction::Call { result, .. } => result.as_mut(),
            _ => None,
        }
    }

    /// Every value this instruction reads (constants included, for
    /// completeness — callers that only want registers should chain
    /// `.used_registers()`).
    pub fn operands(&self) -> Vec<&IlValue> {
        match self {
            Instruction::Const { value, .. } => vec![value],
            Instruction::Add { a, b, .. }
            | Instruction::Sub { a, b, .. }
            | Instruction::Mul { a, b, .. }
            | Instruction::Div { a, b, .. }
            | Instruction::Mod { a, b, .. }
            | Instruction::And { a, b, .. }
            | Instruction::Or { a, b, .. }
            | Instruction::Xor { a, b, .. }
            | Instruction::Shl { a, b, .. }
            | Instruction::Shr { a, b, .. }
            | Instruction::CmpEq { a, b, .. }
            | Instruction::CmpNe { a, b, .. }
            | Instruction::CmpLt { a, b, .. }
            | Instruction::CmpLe { a, b, .. }
            | Instruction::CmpGt { a, b, .. }
            | Instruction::CmpGe { a, b, .. } => vec![a, b],
            Instruction::Neg { a, .. } | Instruction::Not { a, .. } => vec![a],
            Instruction::Load { address, .. } => vec![address],
            Instruction::Store { address, value } => vec![address, value],
            Instruction::StoreGlobal { value, .. } => vec![value],
            Instruction::Branch { condition, .. } => vec![condition],
            Instruction::Return { value } => vec![value],
            Instruction::Call { args, .. } => args.iter().collect(),
            Instruction::Phi { incoming, .. } => incoming.iter().map(|(_, v)| v).collect(),
            Instruction::IntrinsicPeek { address, .. } | Instruction::IntrinsicPeekW { address, .. } => vec![address],
            Instruction::IntrinsicPoke { address, value } | Instruction::IntrinsicPokeW { address, value } => {
                vec![address, value]
            }
            Instruction::IntrinsicLo { value, .. } | Instruction::IntrinsicHi { value, .. } => vec![value],
            Instruction::VolatileRead { address, .. } => vec![address],
            Instruction::VolatileWrite { address, value } => vec![address, value],
            Instruction::Jump { .. }
            | Instruction::ReturnVoid
            | Instruction::CpuSei
            | Instruction::CpuCli
            | Instruction::CpuNop
            | Instruction::CpuBrk
            | Instruction::CpuPha
            | Instruction::CpuPla
            | Instruction::CpuPhp
            | Instruction::CpuPlp
            | Instruction::LoadGlobal { .. }
            | Instruction::OptBarrier => vec![],
        }
    }

    /// The registers this instruction reads (a subset of [`Self::operands`]).
    pub fn used_registers(&self) -> Vec<&VReg> {
        self.operands().into_iter().filter_map(IlValue::as_register).collect()
    }

    /// Intrinsics marked as barriers report side effects so optimizers
    /// must not reorder or eliminate them, plus ordinary memory/IO
    /// operations that are observable outside the function.
    pub fn has_side_effects(&self) -> bool {
        matches!(
            self,
            Instruction::Store { .. }
                | Instruction::StoreGlobal { .. }
                | Instruction::Call { .. }
                | Instruction::IntrinsicPoke { .. }
                | Instruction::IntrinsicPokeW { .. }
                | Instruction::CpuSei
                | Instruction::CpuCli
                | Instruction::CpuNop
                | Instruction::CpuBrk
                | Instruction::CpuPha
                | Instruction::CpuPla
                | Instruction::CpuPhp
                | Instruction::CpuPlp
                | Instruction::VolatileRead { .. }
                | Instruction::VolatileWrite { .. }
                | Instruction::OptBarrier
        )
    }

    /// Whether this instruction ends a basic block. Every block must have
    /// exactly one, as its final instruction.
    pub fn is_terminator(&self) -> bool {
        matches!(
            self,
            Instruction::Jump { .. } | Instruction::Branch { .. } | Instruction::Return { .. } | Instruction::ReturnVoid
        )
    }

    /// Whether this is a `PHI`; these must precede every other instruction
    /// in their block.
    pub fn is_phi(&self) -> bool {
        matches!(self, Instruction::Phi { .. })
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(result) = self.result() {
            write!(f, "{result} = ")?;
        }
        match self {
            Instruction::Const { value, .. } => write!(f, "const {value}"),
            Instruction::Add { a, b, .. } => write!(f, "add {a}, {b}"),
            Instruction::Sub { a, b, .. } => write!(f, "sub {a}, {b}"),
            Instruction::Mul { a, b, .. } => write!(f, "mul {a}, {b}"),
            Instruction::Div { a, b, .. } => write!(f, "div {a}, {b}"),
            Instruction::Mod { a, b, .. } => write!(f, "mod {a}, {b}"),
            Instruction::Neg { a, .. } => write!(f, "neg {a}"),
            Instruction::And { a, b, .. } => write!(f, "and {a}, {b}"),
            Instruction::Or { a, b, .. } => write!(f, "or {a}, {b}"),
            Instruction::Xor { a, b, .. } => write!(f, "xor {a}, {b}"),
            Instruction::Not { a, .. } => write!(f, "not {a}"),
            Instruction::Shl { a, b, .. } => write!(f, "shl {a}, {b}"),
            Instruction::Shr { a, b, .. } => write!(f, "shr {a}, {b}"),
            Instruction::CmpEq { a, b, .. } => write!(f, "cmp_eq {a}, {b}"),
            Instruction::CmpNe { a, b, .. } => write!(f, "cmp_ne {a}, {b}"),
            Instruction::CmpLt { a, b, .. } => write!(f, "cmp_lt {a}, {b}"),
            Instruction::CmpLe { a, b, .. } => write!(f, "cmp_le {a}, {b}"),
            Instruction::CmpGt { a, b, .. } => write!(f, "cmp_gt {a}, {b}"),
            Instruction::CmpGe { a, b, .. } => write!(f, "cmp_ge {a}, {b}"),
            Instruction::Load { address, .. } => write!(f, "load [{address}]"),
            Instruction::Store { address, value } => write!(f, "store [{address}], {value}"),
            Instruction::LoadGlobal { name, .. } => write!(f, "load_global @{name}"),
            Instruction::StoreGlobal { name, value } => write!(f, "store_global @{name}, {value}"),
            Instruction::Jump { target } => write!(f, "jump {target}"),
            Instruction::Branch { condition, then_block, else_block } => {
                write!(f, "branch {condition}, {then_block}, {else_block}")
            }
            Instruction::Return { value } => write!(f, "return {value}"),
            Instruction::ReturnVoid => write!(f, "return_void"),
            Instruction::Call { callee, args, .. } => {
                write!(f, "call {callee}(")?;
                for (i, a) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{a}")?;
                }
                write!(f, ")")
            }
            Instruction::Phi { incoming, .. } => {
                write!(f, "phi [")?;
                for (i, (block, value)) in incoming.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "({block}, {value})")?;
                }
                write!(f, "]")
            }
            Instruction::IntrinsicPeek { address, .. } => write!(f, "intrinsic_peek {address}"),
            Instruction::IntrinsicPoke { address, value } => write!(f, "intrinsic_poke {address}, {value}"),
            Instruction::IntrinsicPeekW { address, .. } => write!(f, "intrinsic_peekw {address}"),
            Instruction::IntrinsicPokeW { address, value } => write!(f, "intrinsic_pokew {address}, {value}"),
            Instruction::CpuSei => write!(f, "cpu_sei"),
            Instruction::CpuCli => write!(f, "cpu_cli"),
            Instruction::CpuNop => write!(f, "cpu_nop"),
            Instruction::CpuBrk => write!(f, "cpu_brk"),
            Instruction::CpuPha => write!(f, "cpu_pha"),
            Instruction::CpuPla => write!(f, "cpu_pla"),
            Instruction::CpuPhp => write!(f, "cpu_php"),
            Instruction::CpuPlp => write!(f, "cpu_plp"),
            Instruction::IntrinsicLo { value, .. } => write!(f, "intrinsic_lo {value}"),
            Instruction::IntrinsicHi { value, .. } => write!(f, "intrinsic_hi {value}"),
            Instruction::VolatileRead { address, .. } => write!(f, "volatile_read {address}"),
            Instruction::VolatileWrite { address, value } => write!(f, "volatile_write {address}, {value}"),
            Instruction::OptBarrier => write!(f, "opt_barrier"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::il::types::IlType;

    #[test]
    fn barrier_intrinsics_report_side_effects() {
        assert!(Instruction::CpuSei.has_side_effects());
        assert!(Instruction::OptBarrier.has_side_effects());
        let peek = Instruction::IntrinsicPeek {
            result: VReg::new(0, IlType::Byte),
            address: IlValue::const_word(0xD020),
        };
        assert!(!peek.has_side_effects());
    }

    #[test]
    fn terminators_are_identified() {
        assert!(Instruction::ReturnVoid.is_terminator());
        assert!(Instruction::Jump { target: BlockId(1) }.is_terminator());
        assert!(!Instruction::CpuNop.is_terminator());
    }

    #[test]
    fn phi_operands_are_its_incoming_values() {
        let phi = Instruction::Phi {
            result: VReg::new(2, IlType::Byte),
            incoming: vec![
                (BlockId(1), IlValue::const_byte(10)),
                (BlockId(2), IlValue::const_byte(20)),
            ],
        };
        assert_eq!(phi.operands().len(), 2);
    }
}
