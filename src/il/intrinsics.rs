//! The intrinsic function registry.
//!
//! A process-wide read-only table initialized once; lookups are pure.
//! Intrinsic names are resolved through one `lazy_static` table rather
//! than a match arm scattered across the IL generator.

use crate::typesys::Type;
use lazy_static::lazy_static;
use std::collections::HashMap;

/// What kind of lowering an intrinsic call needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntrinsicKind {
    /// Lowers straight to a dedicated IL opcode (`peek`, `sei`, ...).
    Opcode,
    /// Evaluated at IL-generation time and replaced with a `CONST`
    /// (`sizeof`, `length`).
    CompileTimeConstant,
}

/// Static signature of a compiler intrinsic.
#[derive(Debug, Clone)]
pub struct IntrinsicSignature {
    pub name: &'static str,
    pub kind: IntrinsicKind,
    pub param_count: usize,
    pub return_type: Type,
    /// Whether lowering this intrinsic must emit a barrier instruction
    /// (`OPT_BARRIER`/`CPU_SEI`/`CPU_CLI`/`VOLATILE_*`) so optimizers cannot
    /// reorder or eliminate it.
    pub is_barrier: bool,
}

lazy_static! {
    /// Process-wide, read-only. Built once; every lookup is a pure map read.
    pub static ref INTRINSICS: HashMap<&'static str, IntrinsicSignature> = {
        let mut m = HashMap::new();
        let mut add = |name: &'static str, kind: IntrinsicKind, param_count: usize, return_type: Type, is_barrier: bool| {
            m.insert(
                name,
                IntrinsicSignature {
                    name,
                    kind,
                    param_count,
                    return_type,
                    is_barrier,
                },
            );
        };
        add("peek", IntrinsicKind::Opcode, 1, Type::Byte, false);
        add("poke", IntrinsicKind::Opcode, 2, Type::Void, false);
        add("peekw", IntrinsicKind::Opcode, 1, Type::Word, false);
        add("pokew", IntrinsicKind::Opcode, 2, Type::Void, false);
        add("sei", IntrinsicKind::Opcode, 0, Type::Void, true);
        add("cli", IntrinsicKind::Opcode, 0, Type::Void, true);
        add("nop", IntrinsicKind::Opcode, 0, Type::Void, false);
        add("brk", IntrinsicKind::Opcode, 0, Type::Void, true);
        add("pha", IntrinsicKind::Opcode, 0, Type::Void, true);
        add("pla", IntrinsicKind::Opcode, 0, Type::Byte, true);
        add("php", IntrinsicKind::Opcode, 0, Type::Void, true);
        add("plp", IntrinsicKind::Opcode, 0, Type::Void, true);
        add("lo", IntrinsicKind::Opcode, 1, Type::Byte, false);
        add("hi", IntrinsicKind::Opcode, 1, Type::Byte, false);
        add("barrier", IntrinsicKind::Opcode, 0, Type::Void, true);
        add("volatile_read", IntrinsicKind::Opcode, 1, Type::Byte, true);
        add("volatile_write", IntrinsicKind::Opcode, 2, Type::Void, true);
        add("sizeof", IntrinsicKind::CompileTimeConstant, 1, Type::Word, false);
        add("length", IntrinsicKind::CompileTimeConstant, 1, Type::Word, false);
        m
    };
}

/// Looks up an intrinsic by name. Pure; backed by the process-wide table.
pub fn lookup(name: &str) -> Option<&'static IntrinsicSignature> {
    INTRINSICS.get(name)
}

pub fn is_intrinsic(name: &str) -> bool {
    INTRINSICS.contains_key(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peek_is_a_one_argument_byte_opcode_intrinsic() {
        let sig = lookup("peek").unwrap();
        assert_eq!(sig.param_count, 1);
        assert_eq!(sig.return_type, Type::Byte);
        assert_eq!(sig.kind, IntrinsicKind::Opcode);
    }

    #[test]
    fn sei_is_a_barrier() {
        assert!(lookup("sei").unwrap().is_barrier);
        assert!(!lookup("nop").unwrap().is_barrier);
    }

    #[test]
    fn sizeof_is_compile_time() {
        assert_eq!(lookup("sizeof").unwrap().kind, IntrinsicKind::CompileTimeConstant);
    }

    #[test]
    fn unknown_name_is_not_an_intrinsic() {
        assert!(!is_intrinsic("frobnicate"));
    }
}
