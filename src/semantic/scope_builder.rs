//! Pass 1: scope & symbol builder.
//!
//! Creates module/function/block/loop scopes mirroring the AST's nesting
//! and declares every named entity into the scope that owns it. Duplicate
//! names are reported with both source locations; everything else about a
//! declaration (its type, whether references to it resolve) is left to
//! later passes.

use crate::ast::{Item, Module, Stmt, StorageClass};
use crate::diagnostics::{Diagnostic, DiagnosticSink};
use crate::symbols::{Scope, ScopeArena, ScopeId, ScopeKind, Symbol, SymbolKind};
use crate::typesys::{self, Type};
use std::collections::HashMap;

use super::type_resolve::{resolve_type_expr, NamedTypes};

/// A `@map` block's field types, keyed by map name then field name.
pub type MapFields = HashMap<String, HashMap<String, Type>>;

/// Everything pass 1 produces for later passes to consume.
pub struct ScopeBuildResult {
    pub scopes: ScopeArena,
    pub module_scope: ScopeId,
    pub function_scopes: HashMap<String, ScopeId>,
    pub named_types: NamedTypes,
    pub map_fields: MapFields,
}

struct Builder<'a> {
    sink: &'a DiagnosticSink,
    module_name: &'a str,
    named_types: NamedTypes,
    map_fields: MapFields,
}

/// Declares `symbol` into `scope`, reporting `DUPLICATE_DECLARATION` with
/// both locations when the name is already taken.
fn declare_or_report(scopes: &mut ScopeArena, scope: ScopeId, symbol: Symbol, sink: &DiagnosticSink, module: &str) {
    let name = symbol.name.clone();
    let new_location = symbol.location;
    if !scopes.declare(scope, symbol) {
        let first_location = scopes.lookup_local(scope, &name).map(|s| s.location);
        let mut diag = Diagnostic::error(
            "DUPLICATE_DECLARATION",
            format!("`{name}` is already declared in this scope"),
            new_location,
            module,
        );
        if let Some(first) = first_location {
            diag = diag.with_related("first declared here", first);
        }
        sink.push(diag);
    }
}

pub fn build(module: &Module, sink: &DiagnosticSink) -> ScopeBuildResult {
    let (mut scopes, module_scope) = ScopeArena::new();
    let mut builder = Builder {
        sink,
        module_name: &module.name,
        named_types: NamedTypes::new(),
        map_fields: MapFields::new(),
    };
    let mut function_scopes = HashMap::new();

    // Enums and maps are registered before functions/variables so a
    // forward-referencing declaration in the same module still resolves.
    for item in &module.items {
        match item {
            Item::EnumDecl { name, variants, .. } => builder.register_enum(name, variants),
            Item::MapDecl { name, fields, .. } => builder.register_map(name, fields),
            _ => {}
        }
    }

    for item in &module.items {
        match item {
            Item::FunctionDecl {
                name,
                params,
                return_type,
                is_exported,
                span,
                body,
                ..
            } => {
                let param_types: Vec<Type> = params
                    .iter()
                    .map(|p| resolve_type_expr(&p.declared_type, &builder.named_types).unwrap_or(Type::Unresolved))
                    .collect();
                let ret_type = match return_type {
                    Some(t) => resolve_type_expr(t, &builder.named_types).unwrap_or(Type::Unresolved),
                    None => Type::Void,
                };
                let fn_type = Type::Function {
                    params: param_types.clone(),
                    ret: Box::new(ret_type),
                };
                let symbol = Symbol::new(name.clone(), SymbolKind::Function, *span)
                    .exported(*is_exported)
                    .with_type(fn_type);
                declare_or_report(&mut scopes, module_scope, symbol, sink, builder.module_name);

                let fn_scope = scopes.create_child(module_scope, ScopeKind::Function);
                scopes.set_function_symbol(fn_scope, name.clone());
                for (param, ty) in params.iter().zip(param_types) {
                    let psym = Symbol::new(param.name.clone(), SymbolKind::Parameter, param.span).with_type(ty);
                    declare_or_report(&mut scopes, fn_scope, psym, sink, builder.module_name);
                }
                function_scopes.insert(name.clone(), fn_scope);
                builder.walk_block(&mut scopes, fn_scope, body);
            }
            Item::VariableDecl {
                name,
                storage,
                is_const,
                is_exported,
                declared_type,
                span,
                ..
            } => {
                let kind = match storage {
                    StorageClass::Zp => SymbolKind::ZpVariable,
                    _ => SymbolKind::Variable,
                };
                let ty = declared_type
                    .as_ref()
                    .and_then(|t| resolve_type_expr(t, &builder.named_types))
                    .unwrap_or(Type::Unresolved);
                let symbol = Symbol::new(name.clone(), kind, *span)
                    .exported(*is_exported)
                    .constant(*is_const)
                    .with_type(ty);
                declare_or_report(&mut scopes, module_scope, symbol, sink, builder.module_name);
            }
            Item::ConstDecl {
                name, is_exported, span, ..
            } => {
                let symbol = Symbol::new(name.clone(), SymbolKind::Constant, *span).exported(*is_exported).constant(true);
                declare_or_report(&mut scopes, module_scope, symbol, sink, builder.module_name);
            }
            Item::EnumDecl {
                name,
                is_exported,
                variants,
                span,
                ..
            } => {
                let ty = builder.named_types.get(name).cloned().unwrap_or(Type::Byte);
                for (variant_name, _) in variants {
                    let symbol = Symbol::new(variant_name.clone(), SymbolKind::Constant, *span)
                        .exported(*is_exported)
                        .constant(true)
                        .with_type(ty.clone());
                    declare_or_report(&mut scopes, module_scope, symbol, sink, builder.module_name);
                }
            }
            Item::MapDecl {
                name, is_exported, span, ..
            } => {
                let symbol = Symbol::new(name.clone(), SymbolKind::MapVariable, *span).exported(*is_exported);
                declare_or_report(&mut scopes, module_scope, symbol, sink, builder.module_name);
            }
        }
    }

    ScopeBuildResult {
        scopes,
        module_scope,
        function_scopes,
        named_types: builder.named_types,
        map_fields: builder.map_fields,
    }
}

impl<'a> Builder<'a> {
    fn register_enum(&mut self, name: &str, variants: &[(String, Option<i64>)]) {
        let mut next_value = 0i64;
        let mut max_value = 0i64;
        for (_, explicit) in variants {
            let value = explicit.unwrap_or(next_value);
            max_value = max_value.max(value);
            next_value = value + 1;
        }
        let ty = typesys::minimum_type_for(max_value).unwrap_or(Type::Word);
        self.named_types.insert(name.to_string(), ty);
    }

    fn register_map(&mut self, name: &str, fields: &[(String, crate::ast::TypeExpr)]) {
        let mut field_types = HashMap::new();
        for (field_name, type_expr) in fields {
            let ty = resolve_type_expr(type_expr, &self.named_types).unwrap_or(Type::Unresolved);
            field_types.insert(field_name.clone(), ty);
        }
        self.map_fields.insert(name.to_string(), field_types);
    }

    /// Declares locals directly in `scope` (used for a function body, or any
    /// block that does not itself introduce a new scope boundary of its own
    /// - the caller is responsible for creating that child scope first).
    fn walk_block(&mut self, scopes: &mut ScopeArena, scope: ScopeId, body: &[Stmt]) {
        for stmt in body {
            self.walk_stmt(scopes, scope, stmt);
        }
    }

    fn walk_stmt(&mut self, scopes: &mut ScopeArena, scope: ScopeId, stmt: &Stmt) {
        match stmt {
            Stmt::VariableDecl {
                name, declared_type, span, ..
            } => {
                let ty = declared_type
                    .as_ref()
                    .and_then(|t| resolve_type_expr(t, &self.named_types))
                    .unwrap_or(Type::Unresolved);
                let symbol = Symbol::new(name.clone(), SymbolKind::Variable, *span).with_type(ty);
                declare_or_report(scopes, scope, symbol, self.sink, self.module_name);
            }
            Stmt::If {
                then_branch, else_branch, ..
            } => {
                let then_scope = scopes.create_child(scope, ScopeKind::Block);
                self.walk_block(scopes, then_scope, then_branch);
                if let Some(else_branch) = else_branch {
                    let else_scope = scopes.create_child(scope, ScopeKind::Block);
                    self.walk_block(scopes, else_scope, else_branch);
                }
            }
            Stmt::While { body, .. } => {
                let loop_scope = scopes.create_child(scope, ScopeKind::Loop);
                self.walk_block(scopes, loop_scope, body);
            }
            Stmt::DoWhile { body, .. } => {
                let loop_scope = scopes.create_child(scope, ScopeKind::Loop);
                self.walk_block(scopes, loop_scope, body);
            }
            Stmt::For {
                counter,
                declared_type,
                body,
                span,
                ..
            } => {
                let loop_scope = scopes.create_child(scope, ScopeKind::Loop);
                let ty = declared_type
                    .as_ref()
                    .and_then(|t| resolve_type_expr(t, &self.named_types))
                    .unwrap_or(Type::Unresolved);
                let symbol = Symbol::new(counter.clone(), SymbolKind::Variable, *span).with_type(ty);
                declare_or_report(scopes, loop_scope, symbol, self.sink, self.module_name);
                self.walk_block(scopes, loop_scope, body);
            }
            Stmt::Switch { cases, default, .. } => {
                for (_, case_body) in cases {
                    let case_scope = scopes.create_child(scope, ScopeKind::Block);
                    self.walk_block(scopes, case_scope, case_body);
                }
                if let Some(default) = default {
                    let default_scope = scopes.create_child(scope, ScopeKind::Block);
                    self.walk_block(scopes, default_scope, default);
                }
            }
            Stmt::Block { body, .. } => {
                let block_scope = scopes.create_child(scope, ScopeKind::Block);
                self.walk_block(scopes, block_scope, body);
            }
            Stmt::Return { .. } | Stmt::Break { .. } | Stmt::Continue { .. } | Stmt::Expression { .. } => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{self, TypeExpr};
    use crate::source::Span;

    fn span() -> Span {
        Span::synthetic()
    }

    #[test]
    fn duplicate_top_level_names_are_reported() {
        let module = Module {
            name: "M".to_string(),
            imports: vec![],
            items: vec![
                Item::ConstDecl {
                    name: "X".to_string(),
                    is_exported: false,
                    value: ast::int_lit(1, span()),
                    span: span(),
                },
                Item::ConstDecl {
                    name: "X".to_string(),
                    is_exported: false,
                    value: ast::int_lit(2, span()),
                    span: span(),
                },
            ],
            span: span(),
        };
        let sink = DiagnosticSink::new();
        build(&module, &sink);
        assert!(sink.has_errors());
        assert_eq!(sink.all()[0].code, "DUPLICATE_DECLARATION");
    }

    #[test]
    fn function_params_and_body_locals_get_scopes() {
        let module = Module {
            name: "M".to_string(),
            imports: vec![],
            items: vec![Item::FunctionDecl {
                name: "f".to_string(),
                params: vec![ast::Param {
                    name: "x".to_string(),
                    declared_type: TypeExpr::named("byte", span()),
                    span: span(),
                }],
                return_type: Some(TypeExpr::named("byte", span())),
                is_exported: false,
                is_interrupt: false,
                body: vec![Stmt::VariableDecl {
                    name: "y".to_string(),
                    is_const: false,
                    declared_type: Some(TypeExpr::named("byte", span())),
                    init: None,
                    span: span(),
                }],
                span: span(),
            }],
            span: span(),
        };
        let sink = DiagnosticSink::new();
        let result = build(&module, &sink);
        assert!(!sink.has_errors());
        let fn_scope = *result.function_scopes.get("f").unwrap();
        assert!(result.scopes.lookup_local(fn_scope, "x").is_some());
        assert!(result.scopes.lookup_local(fn_scope, "y").is_some());
    }

    #[test]
    fn enum_variants_resolve_to_narrowest_integer_type() {
        let module = Module {
            name: "M".to_string(),
            imports: vec![],
            items: vec![Item::EnumDecl {
                name: "Color".to_string(),
                is_exported: false,
                variants: vec![("Red".to_string(), None), ("Green".to_string(), None)],
                span: span(),
            }],
            span: span(),
        };
        let sink = DiagnosticSink::new();
        let result = build(&module, &sink);
        let sym = result.scopes.lookup_local(result.module_scope, "Red").unwrap();
        assert_eq!(sym.ty, Type::Byte);
    }
}
