//! The Blend65 type system.
//!
//! A small closed set of primitive/array/function types with no mutable
//! state beyond a cache of built-ins: a tagged enum with a `size_bytes`
//! method, built around the byte/word promotion rules a 6502 target needs.

use std::fmt;
use std::sync::Arc;

/// A Blend65 type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Type {
    /// 8-bit unsigned integer.
    Byte,
    /// 16-bit unsigned integer.
    Word,
    /// 1-byte boolean (0 or 1).
    Bool,
    /// Zero-sized; only valid as a function return type.
    Void,
    /// Heap-free string type, currently only usable as a `@data` initializer.
    String,
    /// `Array { element, length }`. `length == None` means an unsized
    /// parameter type (only valid in function signatures).
    Array {
        element: Box<Type>,
        length: Option<u32>,
    },
    /// `Function { params, ret }`.
    Function {
        params: Vec<Type>,
        ret: Box<Type>,
    },
    /// Placeholder used before a declaration's type has been resolved.
    Unresolved,
}

impl Type {
    /// Size in bytes: array = `element_size * length` (0 if unsized),
    /// function = 0.
    pub fn size_bytes(&self) -> usize {
        match self {
            Type::Byte => 1,
            Type::Word => 2,
            Type::Bool => 1,
            Type::Void => 0,
            Type::String => 2, // pointer to a @data label
            Type::Array { element, length } => element.size_bytes() * length.unwrap_or(0) as usize,
            Type::Function { .. } => 0,
            Type::Unresolved => 0,
        }
    }

    /// All Blend65 numeric types are unsigned.
    pub fn is_signed(&self) -> bool {
        false
    }

    /// Whether a value of this type may appear as an assignment target's
    /// declared type (everything except `Void` and `Unresolved`).
    pub fn is_assignable(&self) -> bool {
        !matches!(self, Type::Void | Type::Unresolved)
    }

    /// `byte` or `word`.
    pub fn is_numeric(&self) -> bool {
        matches!(self, Type::Byte | Type::Word)
    }

    /// Any `Array { .. }`.
    pub fn is_array(&self) -> bool {
        matches!(self, Type::Array { .. })
    }

    /// Any `Function { .. }`.
    pub fn is_function(&self) -> bool {
        matches!(self, Type::Function { .. })
    }

    /// The element type of an array, or `None` for anything else.
    pub fn array_element_type(&self) -> Option<Type> {
        match self {
            Type::Array { element, .. } => Some((**element).clone()),
            _ => None,
        }
    }

    /// Canonical display name, also accepted by [`get_builtin`].
    pub fn name(&self) -> String {
        match self {
            Type::Byte => "byte".to_string(),
            Type::Word => "word".to_string(),
            Type::Bool => "bool".to_string(),
            Type::Void => "void".to_string(),
            Type::String => "string".to_string(),
            Type::Array { element, length } => match length {
                Some(n) => format!("{}[{}]", element.name(), n),
                None => format!("{}[]", element.name()),
            },
            Type::Function { params, ret } => format!(
                "function({}) -> {}",
                params.iter().map(Type::name).collect::<Vec<_>>().join(", "),
                ret.name()
            ),
            Type::Unresolved => "<unresolved>".to_string(),
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Looks up a built-in primitive type by name (`"byte"`, `"word"`,
/// `"bool"`, `"void"`, `"string"`). Returns `None` for anything else,
/// including user-defined enum/struct names the caller must resolve
/// itself.
pub fn get_builtin(name: &str) -> Option<Type> {
    match name {
        "byte" => Some(Type::Byte),
        "word" => Some(Type::Word),
        "bool" => Some(Type::Bool),
        "void" => Some(Type::Void),
        "string" => Some(Type::String),
        _ => None,
    }
}

/// Structural equality. `Arc`-wrapped so a `Type` is safe to share across
/// call sites that intern types, though `Type` is cheap to clone directly.
pub type SharedType = Arc<Type>;

/// Structural equality between two types.
pub fn are_equal(a: &Type, b: &Type) -> bool {
    a == b
}

/// Result of comparing a source type against a target type for assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compatibility {
    /// The types are identical.
    Identical,
    /// `from` can be promoted to `to` (currently only byte -> word).
    Promotable,
    /// No assignment is possible.
    Incompatible,
}

/// Classifies the assignability of `from` to `to`.
pub fn check_compatibility(from: &Type, to: &Type) -> Compatibility {
    if from == to {
        return Compatibility::Identical;
    }
    if matches!((from, to), (Type::Byte, Type::Word)) {
        return Compatibility::Promotable;
    }
    if let (
        Type::Array {
            element: fe,
            length: fl,
        },
        Type::Array {
            element: te,
            length: tl,
        },
    ) = (from, to)
    {
        if fl == tl && check_compatibility(fe, te) != Compatibility::Incompatible {
            return if fe == te {
                Compatibility::Identical
            } else {
                Compatibility::Promotable
            };
        }
    }
    if let (
        Type::Function {
            params: fp,
            ret: fr,
        },
        Type::Function {
            params: tp,
            ret: tr,
        },
    ) = (from, to)
    {
        if fp == tp && fr == tr {
            return Compatibility::Identical;
        }
    }
    Compatibility::Incompatible
}

/// Whether a value of type `from` may be assigned/passed where `to` is
/// expected: identity, byte -> word promotion, equal-length arrays of
/// assignable elements, or matching function signatures.
pub fn can_assign(from: &Type, to: &Type) -> bool {
    check_compatibility(from, to) != Compatibility::Incompatible
}

/// `0 <= v <= 255`.
pub fn fits_in_byte(v: i64) -> bool {
    (0..=255).contains(&v)
}

/// `0 <= v <= 65535`.
pub fn fits_in_word(v: i64) -> bool {
    (0..=65535).contains(&v)
}

/// The narrowest numeric type that can represent `v`, or `None` if it
/// doesn't fit in either.
pub fn minimum_type_for(v: i64) -> Option<Type> {
    if fits_in_byte(v) {
        Some(Type::Byte)
    } else if fits_in_word(v) {
        Some(Type::Word)
    } else {
        None
    }
}

/// The wider of two numeric types, used for arithmetic/bitwise result
/// typing.
pub fn widen(a: &Type, b: &Type) -> Type {
    match (a, b) {
        (Type::Word, _) | (_, Type::Word) => Type::Word,
        _ => Type::Byte,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_promotes_to_word() {
        assert_eq!(check_compatibility(&Type::Byte, &Type::Word), Compatibility::Promotable);
        assert!(can_assign(&Type::Byte, &Type::Word));
        assert!(!can_assign(&Type::Word, &Type::Byte));
    }

    #[test]
    fn array_sizes_multiply() {
        let arr = Type::Array {
            element: Box::new(Type::Word),
            length: Some(4),
        };
        assert_eq!(arr.size_bytes(), 8);
    }

    #[test]
    fn unsized_array_has_zero_size() {
        let arr = Type::Array {
            element: Box::new(Type::Byte),
            length: None,
        };
        assert_eq!(arr.size_bytes(), 0);
    }

    #[test]
    fn minimum_type_picks_narrowest() {
        assert_eq!(minimum_type_for(10), Some(Type::Byte));
        assert_eq!(minimum_type_for(300), Some(Type::Word));
        assert_eq!(minimum_type_for(100_000), None);
    }

    #[test]
    fn widen_prefers_word() {
        assert_eq!(widen(&Type::Byte, &Type::Word), Type::Word);
        assert_eq!(widen(&Type::Byte, &Type::Byte), Type::Byte);
    }
}
