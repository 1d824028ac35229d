//! Resolves a surface [`crate::ast::TypeExpr`] into a [`crate::typesys::Type`].

use crate::ast::TypeExpr;
use crate::typesys::{self, Type};
use std::collections::HashMap;

/// Maps a user-declared `enum` name to the integer type chosen for its
/// underlying representation. Not a [`Type`] variant in its own right —
/// enums are compiled straight to their narrowest fitting integer type, so
/// this table only needs to live for the duration of one module's analysis.
pub type NamedTypes = HashMap<String, Type>;

/// Resolves `expr` against the builtins plus `named_types`. Returns `None`
/// if `expr.name` is neither a builtin nor a known user type.
pub fn resolve_type_expr(expr: &TypeExpr, named_types: &NamedTypes) -> Option<Type> {
    let base = typesys::get_builtin(&expr.name).or_else(|| named_types.get(&expr.name).cloned())?;
    match expr.array_length {
        Some(len) => Some(Type::Array {
            element: Box::new(base),
            length: Some(len),
        }),
        None => Some(base),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::Span;

    #[test]
    fn resolves_builtin_scalar() {
        let expr = TypeExpr::named("byte", Span::synthetic());
        assert_eq!(resolve_type_expr(&expr, &NamedTypes::new()), Some(Type::Byte));
    }

    #[test]
    fn resolves_array_of_builtin() {
        let expr = TypeExpr {
            name: "word".to_string(),
            array_length: Some(3),
            span: Span::synthetic(),
        };
        let resolved = resolve_type_expr(&expr, &NamedTypes::new()).unwrap();
        assert_eq!(
            resolved,
            Type::Array {
                element: Box::new(Type::Word),
                length: Some(3)
            }
        );
    }

    #[test]
    fn resolves_user_enum_type() {
        let mut named = NamedTypes::new();
        named.insert("Color".to_string(), Type::Byte);
        let expr = TypeExpr::named("Color", Span::synthetic());
        assert_eq!(resolve_type_expr(&expr, &named), Some(Type::Byte));
    }

    #[test]
    fn unknown_name_resolves_to_none() {
        let expr = TypeExpr::named("Nonexistent", Span::synthetic());
        assert_eq!(resolve_type_expr(&expr, &NamedTypes::new()), None);
    }
}
