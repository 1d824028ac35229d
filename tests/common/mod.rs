//! Shared AST-building helpers for the integration test files in this
//! directory. Every builder takes a synthetic span since these trees are
//! constructed directly rather than parsed from text.

#![allow(dead_code)]

use blend65::{BinaryOp, Expr, Item, Module, Param, Stmt, TypeExpr};

pub fn span() -> blend65::source::Span {
    blend65::source::Span::synthetic()
}

pub fn module(name: &str, imports: Vec<&str>, items: Vec<Item>) -> Module {
    Module {
        name: name.to_string(),
        imports: imports
            .into_iter()
            .map(|m| blend65::ast::Import {
                module: m.to_string(),
                span: span(),
            })
            .collect(),
        items,
        span: span(),
    }
}

pub fn function(name: &str, params: Vec<Param>, return_type: Option<TypeExpr>, body: Vec<Stmt>) -> Item {
    Item::FunctionDecl {
        name: name.to_string(),
        params,
        return_type,
        is_exported: true,
        is_interrupt: false,
        body,
        span: span(),
    }
}

pub fn byte_type() -> TypeExpr {
    TypeExpr::named("byte", span())
}

pub fn ret(value: Expr) -> Stmt {
    Stmt::Return {
        value: Some(value),
        span: span(),
    }
}

pub fn bin(op: BinaryOp, l: Expr, r: Expr) -> Expr {
    blend65::ast::binary(op, l, r, span())
}

pub fn int(v: i64) -> Expr {
    blend65::ast::int_lit(v, span())
}

pub fn id(name: &str) -> Expr {
    blend65::ast::ident(name, span())
}

pub fn call(name: &str, args: Vec<Expr>) -> Expr {
    blend65::ast::call(name, args, span())
}
