//! Module-level IL generation: ties the per-module constant/layout passes
//! and the per-function lowerer together into one [`IlModule`].

pub mod consts;
pub mod function;
pub mod layout;

use crate::ast::{Item, Module, StorageClass};
use crate::diagnostics::DiagnosticSink;
use crate::il::{IlGlobal, IlModule, IlType};
use crate::semantic::AnalyzedModule;
use crate::typesys::Type;

use consts::ConstEnv;
use function::FunctionLowering;
use layout::MapLayout;

/// Lowers one analysed source module into IL. Functions whose return type
/// failed to resolve during analysis are skipped (the analyzer already
/// reported a diagnostic); the IL generator trusts that `sink` carries
/// every such failure and never re-derives them.
pub fn generate(module: &Module, analyzed: &AnalyzedModule, sink: &DiagnosticSink) -> IlModule {
    let consts = ConstEnv::build(module);
    let map_layout = MapLayout::build(module, &analyzed.named_types);
    let mut il_module = IlModule::new(module.name.clone());

    for item in &module.items {
        match item {
            Item::FunctionDecl {
                name,
                params,
                return_type,
                is_exported: _,
                is_interrupt,
                body,
                ..
            } => {
                let Some(fn_scope) = analyzed.function_scopes.get(name).copied() else {
                    continue;
                };
                let resolved_params: Option<Vec<Type>> = params
                    .iter()
                    .map(|p| crate::semantic::resolve_type_expr(&p.declared_type, &analyzed.named_types))
                    .collect();
                let Some(resolved_params) = resolved_params else {
                    // Analyzer already reported the unresolved-type diagnostic
                    // against this parameter; skip lowering rather than panic.
                    continue;
                };
                let param_types: Vec<IlType> = resolved_params.iter().map(IlType::from_source_type).collect();

                let ret_ty = return_type
                    .as_ref()
                    .and_then(|t| crate::semantic::resolve_type_expr(t, &analyzed.named_types))
                    .unwrap_or(Type::Void);
                if matches!(ret_ty, Type::Unresolved | Type::Function { .. }) {
                    continue;
                }
                let il_ret_ty = IlType::from_source_type(&ret_ty);

                let mut lowering = FunctionLowering::new(
                    name.clone(),
                    param_types,
                    il_ret_ty,
                    *is_interrupt,
                    &analyzed.scopes,
                    &consts,
                    &analyzed.named_types,
                    &map_layout,
                    sink,
                    &module.name,
                );
                lowering.lower_body(fn_scope, params, body);
                il_module.add_function(lowering.finish());
            }
            Item::VariableDecl {
                name,
                storage,
                is_const,
                is_exported,
                declared_type,
                init,
                ..
            } => {
                if matches!(storage, StorageClass::Map) {
                    // `@map` declarations contribute field equates via
                    // `MapLayout`, not a standalone global.
                    continue;
                }
                let ty = declared_type
                    .as_ref()
                    .and_then(|t| crate::semantic::resolve_type_expr(t, &analyzed.named_types))
                    .unwrap_or(Type::Unresolved);
                if matches!(ty, Type::Unresolved | Type::Function { .. }) {
                    continue;
                }
                let init_value = init.as_ref().and_then(|e| consts.eval(e));
                il_module.add_global(IlGlobal {
                    name: name.clone(),
                    storage: *storage,
                    ty,
                    is_const: *is_const,
                    is_exported: *is_exported,
                    init: init_value,
                });
            }
            Item::ConstDecl { .. } | Item::EnumDecl { .. } => {
                // Folded entirely into `ConstEnv`; neither survives as an IL
                // global — both are compile-time constants.
            }
            Item::MapDecl { .. } => {
                // Folded entirely into `MapLayout`; accessed via member
                // expressions, never as a standalone global.
            }
        }
    }

    il_module
}
