//! Symbols.

use crate::source::Span;
use crate::typesys::Type;

/// What kind of entity a [`Symbol`] names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Variable,
    Parameter,
    Function,
    Constant,
    /// A field of an `@map` hardware register block.
    MapVariable,
    /// A `@zp` global.
    ZpVariable,
}

/// A declared name. Owned by exactly one [`crate::symbols::scope::Scope`].
///
/// Mutation after registration is forbidden except for lazy type backfill:
/// declarations without an explicit annotation start with `Type::Unresolved`
/// and the type resolver pass fills in `ty` once it has inferred a type
/// from the initializer.
#[derive(Debug, Clone)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    pub ty: Type,
    pub is_exported: bool,
    pub is_const: bool,
    pub location: Span,
}

impl Symbol {
    /// Creates a new symbol. `ty` is `Type::Unresolved` until the type
    /// resolver pass backfills it.
    pub fn new(name: impl Into<String>, kind: SymbolKind, location: Span) -> Self {
        Self {
            name: name.into(),
            kind,
            ty: Type::Unresolved,
            is_exported: false,
            is_const: false,
            location,
        }
    }

    /// Builder-style setter for the exported flag.
    pub fn exported(mut self, exported: bool) -> Self {
        self.is_exported = exported;
        self
    }

    /// Builder-style setter for the const flag.
    pub fn constant(mut self, is_const: bool) -> Self {
        self.is_const = is_const;
        self
    }

    /// Builder-style setter for the resolved type.
    pub fn with_type(mut self, ty: Type) -> Self {
        self.ty = ty;
        self
    }

    /// Backfills the type during the type-resolver pass. The only mutation
    /// allowed on a symbol after it has been declared into a scope.
    pub fn backfill_type(&mut self, ty: Type) {
        self.ty = ty;
    }
}
