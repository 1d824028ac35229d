//! Passes 2-4: type resolution, reference resolution, and the layered type
//! checker, run as one traversal per function.
//!
//! The four-layer description ("literals -> expressions -> declarations ->
//! statements") is a pedagogical framing, not a requirement to re-walk the
//! tree four times: each layer is a method
//! on [`TypeChecker`] that the one built-in that needs it the most
//! (statements) calls down into, so a single traversal produces the same
//! observable diagnostics a four-pass design would. Scope re-entry mirrors
//! pass 1 exactly by walking each scope's `children` in the same order they
//! were created in (see `ScopeCursor`), rather than keying off AST node
//! identity.

use crate::ast::{BinaryOp, Expr, Item, Literal, Module, Param, Stmt, UnaryOp};
use crate::diagnostics::{Diagnostic, DiagnosticSink};
use crate::globaltable::GlobalSymbolTable;
use crate::source::Span;
use crate::symbols::{ScopeArena, ScopeId, SymbolKind};
use crate::typesys::{self, Compatibility, Type};

use super::scope_builder::{MapFields, ScopeBuildResult};
use super::type_resolve::{resolve_type_expr, NamedTypes};

/// The fully analysed state of one module: its scope tree plus every
/// resolved type, ready for the call graph / loop analysis / IL generator
/// passes to consume.
pub struct AnalyzedModule {
    pub scopes: ScopeArena,
    pub module_scope: ScopeId,
    pub function_scopes: std::collections::HashMap<String, ScopeId>,
    pub named_types: NamedTypes,
    pub map_fields: MapFields,
}

/// Runs every pass over `module` and returns the analysed result whether or
/// not errors were found; errors are collected and the affected construct
/// is typed best-effort so callers check `sink.has_errors()` themselves
/// rather than unwinding mid-analysis.
///
/// `imports` is the cross-module global symbol table as populated by every
/// module this one transitively depends on (the pipeline analyses modules
/// in dependency-graph topological order, so by the time module `M` is
/// analysed every module `M` imports has already registered its exports
/// here). An identifier that the local scope chain can't resolve is tried
/// against each of `module.imports` in turn before it's reported as
/// `UNDEFINED_VARIABLE`, giving an exported symbol from any other module
/// an effect during type checking, not just at final linking.
pub fn analyze(module: &Module, sink: &DiagnosticSink, imports: &GlobalSymbolTable) -> AnalyzedModule {
    let ScopeBuildResult {
        mut scopes,
        module_scope,
        function_scopes,
        named_types,
        map_fields,
    } = super::scope_builder::build(module, sink);

    let imported_modules: Vec<String> = module.imports.iter().map(|i| i.module.clone()).collect();

    for item in &module.items {
        if let Item::FunctionDecl {
            name, return_type, body, ..
        } = item
        {
            let fn_scope = *function_scopes.get(name).expect("scope builder registers every function");
            let return_type = match return_type {
                Some(t) => resolve_type_expr(t, &named_types).unwrap_or(Type::Unresolved),
                None => Type::Void,
            };
            let mut checker = TypeChecker {
                scopes: &mut scopes,
                named_types: &named_types,
                map_fields: &map_fields,
                sink,
                module: &module.name,
                imports,
                imported_modules: &imported_modules,
                loop_depth: 0,
                switch_depth: 0,
                return_type,
                saw_return: false,
            };
            checker.check_block(fn_scope, body);
            if checker.return_type != Type::Void && !checker.saw_return {
                sink.push(Diagnostic::error(
                    "MISSING_RETURN_VALUE",
                    format!("function `{name}` must return a value of type `{}` on every path", checker.return_type),
                    item_span(item),
                    &module.name,
                ));
            }
        }
    }

    AnalyzedModule {
        scopes,
        module_scope,
        function_scopes,
        named_types,
        map_fields,
    }
}

fn item_span(item: &Item) -> Span {
    match item {
        Item::FunctionDecl { span, .. }
        | Item::VariableDecl { span, .. }
        | Item::ConstDecl { span, .. }
        | Item::EnumDecl { span, .. }
        | Item::MapDecl { span, .. } => *span,
    }
}

/// Composes the four checking layers over one function body. Holds the
/// mutable scope arena (for lazy type backfill) plus the loop/switch depth
/// counters pass 4 needs for `break`/`continue` validity.
struct TypeChecker<'a> {
    scopes: &'a mut ScopeArena,
    named_types: &'a NamedTypes,
    map_fields: &'a MapFields,
    sink: &'a DiagnosticSink,
    module: &'a str,
    imports: &'a GlobalSymbolTable,
    imported_modules: &'a [String],
    loop_depth: u32,
    switch_depth: u32,
    return_type: Type,
    saw_return: bool,
}

impl<'a> TypeChecker<'a> {
    fn error(&self, code: &str, message: impl Into<String>, location: Span) {
        self.sink.push(Diagnostic::error(code, message, location, self.module));
    }

    /// Falls back to the imported modules' exports for a name the local
    /// scope chain couldn't resolve.
    fn resolve_external(&self, name: &str) -> Option<Type> {
        self.resolve_external_symbol(name).map(|s| s.ty)
    }

    /// As [`Self::resolve_external`], but returns the whole symbol (kind
    /// included) for call-site checks that need more than just the type.
    fn resolve_external_symbol(&self, name: &str) -> Option<crate::symbols::Symbol> {
        self.imported_modules
            .iter()
            .find_map(|m| self.imports.lookup_in_module(m, name).filter(|s| s.is_exported))
            .cloned()
    }

    /// Walks `stmts` inside `scope`, consuming `scope`'s pre-built children
    /// in creation order for every construct that introduces a nested
    /// scope (mirrors `scope_builder::Builder::walk_stmt`'s creation order).
    fn check_block(&mut self, scope: ScopeId, stmts: &[Stmt]) {
        let mut cursor = 0usize;
        for stmt in stmts {
            self.check_stmt(scope, stmt, &mut cursor);
        }
    }

    fn next_child(&self, scope: ScopeId, cursor: &mut usize) -> ScopeId {
        let child = self.scopes.get(scope).children[*cursor];
        *cursor += 1;
        child
    }

    fn check_stmt(&mut self, scope: ScopeId, stmt: &Stmt, cursor: &mut usize) {
        match stmt {
            Stmt::VariableDecl {
                name, is_const, init, span, ..
            } => {
                let declared = self.scopes.lookup_local(scope, name).map(|s| s.ty.clone());
                let init_ty = init.as_ref().map(|e| self.check_expr(scope, e));
                let final_ty = match (&declared, &init_ty) {
                    (Some(Type::Unresolved) | None, Some(t)) => t.clone(),
                    (Some(t), _) => t.clone(),
                    (None, None) => Type::Unresolved,
                };
                if let (Some(declared), Some(init_ty)) = (&declared, &init_ty) {
                    if *declared != Type::Unresolved && !typesys::can_assign(init_ty, declared) {
                        self.error(
                            "TYPE_MISMATCH",
                            format!("cannot assign `{init_ty}` to `{name}` of type `{declared}`"),
                            *span,
                        );
                    }
                }
                if let Some(sym) = self.scopes.get_mut(scope).symbols.get_mut(name) {
                    sym.ty = final_ty;
                    sym.is_const = *is_const;
                }
            }
            Stmt::If {
                condition,
                then_branch,
                else_branch,
                span,
            } => {
                let cond_ty = self.check_expr(scope, condition);
                self.require_condition_type(&cond_ty, *span);
                let then_scope = self.next_child(scope, cursor);
                self.check_block(then_scope, then_branch);
                if let Some(else_branch) = else_branch {
                    let else_scope = self.next_child(scope, cursor);
                    self.check_block(else_scope, else_branch);
                }
            }
            Stmt::While { condition, body, span } | Stmt::DoWhile { body, condition, span } => {
                let cond_ty = self.check_expr(scope, condition);
                self.require_condition_type(&cond_ty, *span);
                let loop_scope = self.next_child(scope, cursor);
                self.loop_depth += 1;
                self.check_block(loop_scope, body);
                self.loop_depth -= 1;
            }
            Stmt::For {
                start, end, step, body, span, ..
            } => {
                let start_ty = self.check_expr(scope, start);
                let end_ty = self.check_expr(scope, end);
                if !start_ty.is_numeric() || !end_ty.is_numeric() {
                    self.error("FOR_RANGE_TYPE_MISMATCH", "`for` bounds must be numeric", *span);
                }
                if let Some(step) = step {
                    let step_ty = self.check_expr(scope, step);
                    if !step_ty.is_numeric() {
                        self.error("FOR_STEP_INVALID", "`for` step must be numeric", *span);
                    }
                }
                let loop_scope = self.next_child(scope, cursor);
                // `for` counter: byte if both bounds fit in byte, else word.
                let counter_ty = if matches!((&start_ty, &end_ty), (Type::Byte, Type::Byte)) {
                    Type::Byte
                } else {
                    Type::Word
                };
                if let Some(counter_name) = self.scopes.get(loop_scope).symbols.keys().next().cloned() {
                    if let Some(sym) = self.scopes.get_mut(loop_scope).symbols.get_mut(&counter_name) {
                        if sym.ty == Type::Unresolved {
                            sym.ty = counter_ty;
                        }
                    }
                }
                self.loop_depth += 1;
                self.check_block(loop_scope, body);
                self.loop_depth -= 1;
            }
            Stmt::Switch {
                value, cases, default, span, ..
            } => {
                let value_ty = self.check_expr(scope, value);
                if !value_ty.is_numeric() {
                    self.error("SWITCH_CASE_TYPE_MISMATCH", "switch value must be numeric", *span);
                }
                let mut seen_values: Vec<i64> = Vec::new();
                self.switch_depth += 1;
                for (case_expr, case_body) in cases {
                    let case_ty = self.check_expr(scope, case_expr);
                    if !case_ty.is_numeric() || !typesys::can_assign(&case_ty, &value_ty) {
                        self.error(
                            "SWITCH_CASE_TYPE_MISMATCH",
                            "case value must be numeric and assignable to the switch value's type",
                            case_expr.span(),
                        );
                    }
                    if let Expr::Literal { value: Literal::Int(v), .. } = case_expr {
                        if seen_values.contains(v) {
                            self.error(
                                "DUPLICATE_SWITCH_CASE",
                                format!("duplicate case value `{v}`"),
                                case_expr.span(),
                            );
                        }
                        seen_values.push(*v);
                    }
                    let case_scope = self.next_child(scope, cursor);
                    self.check_block(case_scope, case_body);
                }
                if let Some(default) = default {
                    let default_scope = self.next_child(scope, cursor);
                    self.check_block(default_scope, default);
                }
                self.switch_depth -= 1;
            }
            Stmt::Return { value, span } => {
                self.saw_return = true;
                match (value, &self.return_type) {
                    (None, Type::Void) => {}
                    (None, ret) => {
                        self.error(
                            "MISSING_RETURN_VALUE",
                            format!("function returns `{ret}` but this `return` has no value"),
                            *span,
                        );
                    }
                    (Some(_), Type::Void) => {
                        self.error("RETURN_VALUE_IN_VOID", "void function must not return a value", *span);
                        if let Some(v) = value {
                            self.check_expr(scope, v);
                        }
                    }
                    (Some(v), ret) => {
                        let value_ty = self.check_expr(scope, v);
                        if !typesys::can_assign(&value_ty, ret) {
                            self.error(
                                "RETURN_TYPE_MISMATCH",
                                format!("cannot return `{value_ty}` from a function declared to return `{ret}`"),
                                *span,
                            );
                        }
                    }
                }
            }
            Stmt::Break { span } => {
                if self.loop_depth == 0 && self.switch_depth == 0 {
                    self.error("BREAK_OUTSIDE_LOOP", "`break` outside a loop or switch", *span);
                }
            }
            Stmt::Continue { span } => {
                if self.loop_depth == 0 {
                    self.error("CONTINUE_OUTSIDE_LOOP", "`continue` outside a loop", *span);
                }
            }
            Stmt::Expression { expr, .. } => {
                self.check_expr(scope, expr);
            }
            Stmt::Block { body, .. } => {
                let block_scope = self.next_child(scope, cursor);
                self.check_block(block_scope, body);
            }
        }
    }

    fn require_condition_type(&self, ty: &Type, span: Span) {
        if *ty != Type::Bool && !ty.is_numeric() {
            self.error("INVALID_CONDITION_TYPE", format!("condition must be `bool` or numeric, found `{ty}`"), span);
        }
    }

    fn check_expr(&mut self, scope: ScopeId, expr: &Expr) -> Type {
        match expr {
            Expr::Literal { value, span } => {
                if let Literal::Int(v) = value {
                    if typesys::minimum_type_for(*v).is_none() {
                        self.error(
                            "NUMERIC_OVERFLOW",
                            format!("integer literal `{v}` does not fit in a byte or a word (0..=65535)"),
                            *span,
                        );
                    }
                }
                literal_type(value)
            }
            Expr::Identifier { name, span } => match self.scopes.lookup_chain(scope, name) {
                Some(sym) => sym.ty.clone(),
                None => match self.resolve_external(name) {
                    Some(ty) => ty,
                    None => {
                        self.error("UNDEFINED_VARIABLE", format!("undefined identifier `{name}`"), *span);
                        Type::Unresolved
                    }
                },
            },
            Expr::Binary { op, left, right, span } => self.check_binary(scope, *op, left, right, *span),
            Expr::Unary { op, operand, span } => self.check_unary(scope, *op, operand, *span),
            Expr::Call { callee, args, span } => self.check_call(scope, callee, args, *span),
            Expr::Member { base, field, span } => self.check_member(scope, base, field, *span),
            Expr::Index { base, index, span } => self.check_index(scope, base, index, *span),
            Expr::Assignment { target, value, span } => self.check_assignment(scope, target, value, *span),
            Expr::ArrayLiteral { elements, span } => self.check_array_literal(scope, elements, *span),
            Expr::Ternary {
                condition,
                then_value,
                else_value,
                span,
            } => {
                let cond_ty = self.check_expr(scope, condition);
                self.require_condition_type(&cond_ty, *span);
                let then_ty = self.check_expr(scope, then_value);
                let else_ty = self.check_expr(scope, else_value);
                if typesys::check_compatibility(&then_ty, &else_ty) == Compatibility::Incompatible {
                    self.error(
                        "TYPE_MISMATCH",
                        format!("ternary branches have incompatible types `{then_ty}` and `{else_ty}`"),
                        *span,
                    );
                }
                if then_ty.is_numeric() && else_ty.is_numeric() {
                    typesys::widen(&then_ty, &else_ty)
                } else {
                    then_ty
                }
            }
        }
    }

    fn check_binary(&mut self, scope: ScopeId, op: BinaryOp, left: &Expr, right: &Expr, span: Span) -> Type {
        let left_ty = self.check_expr(scope, left);
        let right_ty = self.check_expr(scope, right);
        match op {
            BinaryOp::LogicalAnd | BinaryOp::LogicalOr => {
                if left_ty != Type::Bool || right_ty != Type::Bool {
                    self.error("INVALID_OPERAND", "`&&`/`||` require `bool` operands", span);
                }
                Type::Bool
            }
            BinaryOp::Eq | BinaryOp::Ne => {
                if typesys::check_compatibility(&left_ty, &right_ty) == Compatibility::Incompatible {
                    self.error("INVALID_OPERAND", format!("cannot compare `{left_ty}` and `{right_ty}`"), span);
                }
                Type::Bool
            }
            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
                if !left_ty.is_numeric() || !right_ty.is_numeric() {
                    self.error("INVALID_OPERAND", "comparison requires numeric operands", span);
                }
                Type::Bool
            }
            _ => {
                if !left_ty.is_numeric() || !right_ty.is_numeric() {
                    self.error(
                        "INVALID_OPERAND",
                        format!("arithmetic/bitwise operator requires numeric operands, found `{left_ty}` and `{right_ty}`"),
                        span,
                    );
                    return Type::Unresolved;
                }
                typesys::widen(&left_ty, &right_ty)
            }
        }
    }

    fn check_unary(&mut self, scope: ScopeId, op: UnaryOp, operand: &Expr, span: Span) -> Type {
        let operand_ty = self.check_expr(scope, operand);
        match op {
            UnaryOp::Not => {
                if operand_ty != Type::Bool {
                    self.error("INVALID_OPERAND", "`!` requires a `bool` operand", span);
                }
                Type::Bool
            }
            UnaryOp::BitNot | UnaryOp::Plus | UnaryOp::Neg => {
                if !operand_ty.is_numeric() {
                    self.error("INVALID_OPERAND", format!("`{op:?}` requires a numeric operand, found `{operand_ty}`"), span);
                    return Type::Unresolved;
                }
                operand_ty
            }
            UnaryOp::AddressOf => {
                if !matches!(operand, Expr::Identifier { .. }) {
                    self.error("INVALID_OPERAND", "`@` is only valid on an identifier", span);
                }
                Type::Word
            }
        }
    }

    fn check_call(&mut self, scope: ScopeId, callee: &str, args: &[Expr], span: Span) -> Type {
        if crate::il::intrinsics::is_intrinsic(callee) {
            let sig = crate::il::intrinsics::lookup(callee).expect("checked above");
            if args.len() != sig.param_count {
                self.error(
                    "ARGUMENT_COUNT_MISMATCH",
                    format!("intrinsic `{callee}` expects {} argument(s), found {}", sig.param_count, args.len()),
                    span,
                );
            }
            for arg in args {
                self.check_expr(scope, arg);
            }
            return sig.return_type.clone();
        }

        let sym = self.scopes.lookup_chain(scope, callee).cloned().or_else(|| self.resolve_external_symbol(callee));
        let Some(sym) = sym else {
            self.error("UNDEFINED_VARIABLE", format!("call to undefined function `{callee}`"), span);
            for arg in args {
                self.check_expr(scope, arg);
            }
            return Type::Unresolved;
        };
        let Type::Function { params, ret } = &sym.ty else {
            self.error("INVALID_OPERAND", format!("`{callee}` is not a function"), span);
            for arg in args {
                self.check_expr(scope, arg);
            }
            return Type::Unresolved;
        };
        if sym.kind != SymbolKind::Function {
            self.error("INVALID_OPERAND", format!("`{callee}` is not callable"), span);
        }
        if params.len() != args.len() {
            self.error(
                "ARGUMENT_COUNT_MISMATCH",
                format!("`{callee}` expects {} argument(s), found {}", params.len(), args.len()),
                span,
            );
        }
        for (i, arg) in args.iter().enumerate() {
            let arg_ty = self.check_expr(scope, arg);
            if let Some(param_ty) = params.get(i) {
                if !typesys::can_assign(&arg_ty, param_ty) {
                    self.error(
                        "TYPE_MISMATCH",
                        format!("argument {} to `{callee}` expects `{param_ty}`, found `{arg_ty}`", i + 1),
                        arg.span(),
                    );
                }
            }
        }
        (**ret).clone()
    }

    fn check_member(&mut self, scope: ScopeId, base: &Expr, field: &str, span: Span) -> Type {
        let Expr::Identifier { name: base_name, .. } = base else {
            self.error("INVALID_OPERAND", "member access is only valid on a `@map` symbol", span);
            self.check_expr(scope, base);
            return Type::Unresolved;
        };
        match self.scopes.lookup_chain(scope, base_name) {
            Some(sym) if sym.kind == SymbolKind::MapVariable => {
                match self.map_fields.get(base_name).and_then(|fields| fields.get(field)) {
                    Some(ty) => ty.clone(),
                    None => {
                        self.error("UNDEFINED_VARIABLE", format!("`{base_name}` has no field `{field}`"), span);
                        Type::Unresolved
                    }
                }
            }
            Some(_) => {
                self.error("INVALID_OPERAND", format!("`{base_name}` is not a `@map` symbol"), span);
                Type::Unresolved
            }
            None => {
                self.error("UNDEFINED_VARIABLE", format!("undefined identifier `{base_name}`"), span);
                Type::Unresolved
            }
        }
    }

    fn check_index(&mut self, scope: ScopeId, base: &Expr, index: &Expr, span: Span) -> Type {
        let base_ty = self.check_expr(scope, base);
        let index_ty = self.check_expr(scope, index);
        if !index_ty.is_numeric() {
            self.error("INVALID_OPERAND", "array index must be numeric", span);
        }
        match base_ty.array_element_type() {
            Some(elem) => elem,
            None => {
                self.error("INVALID_OPERAND", format!("cannot index non-array type `{base_ty}`"), span);
                Type::Unresolved
            }
        }
    }

    fn check_assignment(&mut self, scope: ScopeId, target: &Expr, value: &Expr, span: Span) -> Type {
        let target_ty = match target {
            Expr::Identifier { name, .. } => match self.scopes.lookup_chain(scope, name) {
                Some(sym) if sym.is_const => {
                    self.error("INVALID_ASSIGNMENT_TARGET", format!("cannot assign to `const` `{name}`"), span);
                    sym.ty.clone()
                }
                Some(sym) => sym.ty.clone(),
                None => match self.resolve_external(name) {
                    Some(ty) => ty,
                    None => {
                        self.error("UNDEFINED_VARIABLE", format!("undefined identifier `{name}`"), span);
                        Type::Unresolved
                    }
                },
            },
            Expr::Member { .. } => self.check_expr(scope, target),
            Expr::Index { .. } => self.check_expr(scope, target),
            _ => {
                self.error("INVALID_ASSIGNMENT_TARGET", "assignment target must be an identifier, map field, or array index", span);
                self.check_expr(scope, target)
            }
        };
        let value_ty = self.check_expr(scope, value);
        if target_ty != Type::Unresolved && !typesys::can_assign(&value_ty, &target_ty) {
            self.error(
                "TYPE_MISMATCH",
                format!("cannot assign `{value_ty}` to target of type `{target_ty}`"),
                span,
            );
        }
        target_ty
    }

    fn check_array_literal(&mut self, scope: ScopeId, elements: &[Expr], span: Span) -> Type {
        if elements.is_empty() {
            self.error("EMPTY_ARRAY_NO_TYPE", "empty array literal needs an explicit type annotation", span);
            return Type::Array {
                element: Box::new(Type::Unresolved),
                length: Some(0),
            };
        }
        let mut widest = self.check_expr(scope, &elements[0]);
        for element in &elements[1..] {
            let ty = self.check_expr(scope, element);
            if typesys::check_compatibility(&ty, &widest) == Compatibility::Incompatible
                && typesys::check_compatibility(&widest, &ty) == Compatibility::Incompatible
            {
                self.error(
                    "ARRAY_ELEMENT_TYPE_MISMATCH",
                    format!("array elements must share a promotable type; found `{widest}` and `{ty}`"),
                    span,
                );
            } else if ty.is_numeric() && widest.is_numeric() {
                widest = typesys::widen(&widest, &ty);
            }
        }
        Type::Array {
            element: Box::new(widest),
            length: Some(elements.len() as u32),
        }
    }
}

fn literal_type(value: &Literal) -> Type {
    match value {
        Literal::Int(v) => typesys::minimum_type_for(*v).unwrap_or(Type::Word),
        Literal::Bool(_) => Type::Bool,
        Literal::Str(_) => Type::String,
    }
}

#[allow(dead_code)]
fn param_types(params: &[Param], named_types: &NamedTypes) -> Vec<Type> {
    params
        .iter()
        .map(|p| resolve_type_expr(&p.declared_type, named_types).unwrap_or(Type::Unresolved))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{self, BinaryOp, Item, Param, TypeExpr};

    fn span() -> Span {
        Span::synthetic()
    }

    fn simple_function(name: &str, return_type: Option<TypeExpr>, body: Vec<Stmt>) -> Item {
        Item::FunctionDecl {
            name: name.to_string(),
            params: vec![],
            return_type,
            is_exported: false,
            is_interrupt: false,
            body,
            span: span(),
        }
    }

    #[test]
    fn undefined_variable_is_reported() {
        let module = Module {
            name: "M".to_string(),
            imports: vec![],
            items: vec![simple_function(
                "f",
                None,
                vec![Stmt::Expression {
                    expr: ast::ident("missing", span()),
                    span: span(),
                }],
            )],
            span: span(),
        };
        let sink = DiagnosticSink::new();
        analyze(&module, &sink, &GlobalSymbolTable::new());
        assert!(sink.has_errors());
        assert_eq!(sink.all()[0].code, "UNDEFINED_VARIABLE");
    }

    #[test]
    fn break_outside_loop_is_rejected() {
        let module = Module {
            name: "M".to_string(),
            imports: vec![],
            items: vec![simple_function("f", None, vec![Stmt::Break { span: span() }])],
            span: span(),
        };
        let sink = DiagnosticSink::new();
        analyze(&module, &sink, &GlobalSymbolTable::new());
        assert!(sink.all().iter().any(|d| d.code == "BREAK_OUTSIDE_LOOP"));
    }

    #[test]
    fn break_inside_while_is_accepted() {
        let module = Module {
            name: "M".to_string(),
            imports: vec![],
            items: vec![simple_function(
                "f",
                None,
                vec![Stmt::While {
                    condition: ast::int_lit(1, span()),
                    body: vec![Stmt::Break { span: span() }],
                    span: span(),
                }],
            )],
            span: span(),
        };
        let sink = DiagnosticSink::new();
        analyze(&module, &sink, &GlobalSymbolTable::new());
        assert!(!sink.has_errors());
    }

    #[test]
    fn return_type_mismatch_is_reported() {
        let module = Module {
            name: "M".to_string(),
            imports: vec![],
            items: vec![simple_function(
                "f",
                None,
                vec![Stmt::Return {
                    value: Some(ast::int_lit(1, span())),
                    span: span(),
                }],
            )],
            span: span(),
        };
        let sink = DiagnosticSink::new();
        analyze(&module, &sink, &GlobalSymbolTable::new());
        assert!(sink.all().iter().any(|d| d.code == "RETURN_VALUE_IN_VOID"));
    }

    #[test]
    fn call_argument_count_mismatch_is_reported() {
        let callee = simple_function(
            "g",
            Some(TypeExpr::named("byte", span())),
            vec![Stmt::Return {
                value: Some(ast::int_lit(1, span())),
                span: span(),
            }],
        );
        let caller = Item::FunctionDecl {
            name: "f".to_string(),
            params: vec![Param {
                name: "a".to_string(),
                declared_type: TypeExpr::named("byte", span()),
                span: span(),
            }],
            return_type: None,
            is_exported: false,
            is_interrupt: false,
            body: vec![Stmt::Expression {
                expr: ast::call("g", vec![ast::int_lit(1, span())], span()),
                span: span(),
            }],
            span: span(),
        };
        let module = Module {
            name: "M".to_string(),
            imports: vec![],
            items: vec![callee, caller],
            span: span(),
        };
        let sink = DiagnosticSink::new();
        analyze(&module, &sink, &GlobalSymbolTable::new());
        assert!(sink.all().iter().any(|d| d.code == "ARGUMENT_COUNT_MISMATCH"));
    }

    #[test]
    fn literal_out_of_word_range_is_reported_as_numeric_overflow() {
        let module = Module {
            name: "M".to_string(),
            imports: vec![],
            items: vec![simple_function(
                "f",
                None,
                vec![Stmt::Expression {
                    expr: ast::int_lit(100_000, span()),
                    span: span(),
                }],
            )],
            span: span(),
        };
        let sink = DiagnosticSink::new();
        analyze(&module, &sink, &GlobalSymbolTable::new());
        assert!(sink.all().iter().any(|d| d.code == "NUMERIC_OVERFLOW"));
    }

    #[test]
    fn logical_and_requires_bool_operands() {
        let module = Module {
            name: "M".to_string(),
            imports: vec![],
            items: vec![simple_function(
                "f",
                None,
                vec![Stmt::Expression {
                    expr: ast::binary(BinaryOp::LogicalAnd, ast::int_lit(1, span()), ast::int_lit(0, span()), span()),
                    span: span(),
                }],
            )],
            span: span(),
        };
        let sink = DiagnosticSink::new();
        analyze(&module, &sink, &GlobalSymbolTable::new());
        assert!(sink.all().iter().any(|d| d.code == "INVALID_OPERAND"));
    }
}
