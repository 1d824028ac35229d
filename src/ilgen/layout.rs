//! `@map` field address layout.
//!
//! Field addresses are assigned by walking a map's declared fields in
//! source order, starting at the map's base address, each field occupying
//! its resolved type's byte width — mirroring how `@data`/`@ram` globals
//! get addresses in the (not-yet-placed) code generator, but computed
//! eagerly here since `@map` fields never move.

use crate::ast::{Item, Module};
use crate::il::IlType;
use crate::semantic::{resolve_type_expr, NamedTypes};
use crate::typesys::Type;
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct MapLayout {
    fields: HashMap<String, HashMap<String, (u16, IlType)>>,
}

impl MapLayout {
    pub fn build(module: &Module, named_types: &NamedTypes) -> Self {
        let mut fields = HashMap::new();
        for item in &module.items {
            if let Item::MapDecl {
                name,
                address,
                fields: decl_fields,
                ..
            } = item
            {
                let mut offset = *address;
                let mut map = HashMap::new();
                for (field_name, type_expr) in decl_fields {
                    let ty = resolve_type_expr(type_expr, named_types).unwrap_or(Type::Byte);
                    let il_ty = IlType::from_source_type(&ty);
                    let size = ty.size_bytes().max(1) as u16;
                    map.insert(field_name.clone(), (offset, il_ty));
                    offset = offset.saturating_add(size);
                }
                fields.insert(name.clone(), map);
            }
        }
        Self { fields }
    }

    pub fn field(&self, map: &str, field: &str) -> Option<(u16, IlType)> {
        self.fields.get(map).and_then(|m| m.get(field)).copied()
    }

    /// Every map name and its field names, for code generators that need to
    /// emit equates without re-walking the AST.
    pub fn maps(&self) -> Vec<(String, Vec<String>)> {
        self.fields
            .iter()
            .map(|(name, fields)| (name.clone(), fields.keys().cloned().collect()))
            .collect()
    }

    /// Folds `other`'s map declarations into `self`. Used by the pipeline
    /// to combine every source module's `@map` layout into the one
    /// whole-program `MapLayout` the code generator expects; a map name
    /// declared in more than one module keeps whichever module's fields
    /// were merged in first (the module registry rejects duplicate module
    /// names, but nothing stops two modules from naming the same map).
    pub fn merge(&mut self, other: MapLayout) {
        for (name, fields) in other.fields {
            self.fields.entry(name).or_insert(fields);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::TypeExpr;
    use crate::source::Span;

    fn span() -> Span {
        Span::synthetic()
    }

    #[test]
    fn fields_are_assigned_consecutive_addresses() {
        let module = Module {
            name: "M".to_string(),
            imports: vec![],
            items: vec![Item::MapDecl {
                name: "Vic".to_string(),
                address: 0xD000,
                is_exported: false,
                fields: vec![
                    ("border".to_string(), TypeExpr::named("byte", span())),
                    ("sprite_x".to_string(), TypeExpr::named("word", span())),
                ],
                span: span(),
            }],
            span: span(),
        };
        let layout = MapLayout::build(&module, &NamedTypes::new());
        assert_eq!(layout.field("Vic", "border"), Some((0xD000, IlType::Byte)));
        assert_eq!(layout.field("Vic", "sprite_x"), Some((0xD001, IlType::Word)));
    }
}
