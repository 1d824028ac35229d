//! Virtual registers and IL values.

use super::types::IlType;
use std::fmt;

/// Identifies a basic block within one function. A plain index rather than
/// a pointer — it stays valid across CFG transforms that only
/// reorder/renumber blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(pub usize);

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bb{}", self.0)
    }
}

/// A virtual register. Immutable once defined; SSA guarantees exactly one
/// defining instruction exists for each id across a function.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VReg {
    pub id: u32,
    pub ty: IlType,
    pub name: Option<String>,
}

impl VReg {
    pub fn new(id: u32, ty: IlType) -> Self {
        Self { id, ty, name: None }
    }

    pub fn named(id: u32, ty: IlType, name: impl Into<String>) -> Self {
        Self {
            id,
            ty,
            name: Some(name.into()),
        }
    }
}

impl fmt::Display for VReg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "%{}({})", self.id, name),
            None => write!(f, "%{}", self.id),
        }
    }
}

/// A value an instruction can operate on.
#[derive(Debug, Clone, PartialEq)]
pub enum IlValue {
    Constant { ty: IlType, value: i64 },
    Register(VReg),
    Label { name: String, block_id: BlockId },
    Global { name: String },
    Parameter { index: u32 },
}

impl IlValue {
    pub fn const_byte(value: i64) -> Self {
        IlValue::Constant { ty: IlType::Byte, value }
    }

    pub fn const_word(value: i64) -> Self {
        IlValue::Constant { ty: IlType::Word, value }
    }

    pub fn const_bool(value: bool) -> Self {
        IlValue::Constant {
            ty: IlType::Bool,
            value: value as i64,
        }
    }

    /// The register this value reads, if it is a `Register`.
    pub fn as_register(&self) -> Option<&VReg> {
        match self {
            IlValue::Register(r) => Some(r),
            _ => None,
        }
    }
}

impl fmt::Display for IlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IlValue::Constant { value, .. } => write!(f, "{value}"),
            IlValue::Register(r) => write!(f, "{r}"),
            IlValue::Label { name, block_id } => write!(f, "{name}@{block_id}"),
            IlValue::Global { name } => write!(f, "@{name}"),
            IlValue::Parameter { index } => write!(f, "arg{index}"),
        }
    }
}
