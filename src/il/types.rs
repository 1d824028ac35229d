//! IL-level types. Distinct from [`crate::typesys::Type`]
//! because the IL only needs to distinguish storage width/representation,
//! not source-level arrays or function signatures.

use std::fmt;

/// An IL value's storage type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IlType {
    /// 1 byte.
    Byte,
    /// 2 bytes.
    Word,
    /// 1 byte, 0 or 1.
    Bool,
    /// 0 bytes; only valid as a `RETURN_VOID` function's implicit result.
    Void,
}

impl IlType {
    pub fn size_bytes(&self) -> usize {
        match self {
            IlType::Byte => 1,
            IlType::Word => 2,
            IlType::Bool => 1,
            IlType::Void => 0,
        }
    }

    /// Mirrors [`crate::typesys::can_assign`] for the narrower IL type set:
    /// identity, or byte -> word promotion.
    pub fn can_assign_from(&self, from: IlType) -> bool {
        *self == from || (*self == IlType::Word && from == IlType::Byte)
    }

    /// Lowers a source type to its IL representation. Arrays and strings
    /// decay to the pointer-sized `Word` the code generator addresses them
    /// through; `Unresolved`/`Function` have no IL representation and
    /// indicate a bug in an earlier pass if they reach here.
    pub fn from_source_type(ty: &crate::typesys::Type) -> IlType {
        use crate::typesys::Type;
        match ty {
            Type::Byte => IlType::Byte,
            Type::Word | Type::String | Type::Array { .. } => IlType::Word,
            Type::Bool => IlType::Bool,
            Type::Void => IlType::Void,
            Type::Function { .. } | Type::Unresolved => {
                panic!("IlType::from_source_type called on non-lowerable type {ty}")
            }
        }
    }
}

impl fmt::Display for IlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            IlType::Byte => "byte",
            IlType::Word => "word",
            IlType::Bool => "bool",
            IlType::Void => "void",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_promotes_to_word_at_il_level() {
        assert!(IlType::Word.can_assign_from(IlType::Byte));
        assert!(!IlType::Byte.can_assign_from(IlType::Word));
    }
}
