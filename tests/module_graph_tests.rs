//! Module dependency graph and cross-module symbol visibility (spec
//! scenarios S2 and S6).

mod common;

use blend65::modgraph::{DependencyGraph, ModuleRegistry};
use blend65::pipeline::{compile, SourceModule};
use blend65::{CompileOptions, Error};
use common::*;

// ====================
// S2 — topological compile order
// ====================

#[test]
fn topological_order_places_leaves_first() {
    let a = module("a", vec!["b"], vec![]);
    let b = module("b", vec!["c"], vec![]);
    let c = module("c", vec![], vec![]);

    let options = CompileOptions::text_only();
    let result = compile(
        vec![SourceModule::new("a", a), SourceModule::new("b", b), SourceModule::new("c", c)],
        &options,
    )
    .unwrap();
    assert_eq!(result.compile_order, vec!["c", "b", "a"]);
}

#[test]
fn circular_module_dependency_is_rejected() {
    let mut registry = ModuleRegistry::new();
    registry.register("a".into(), module("a", vec!["b"], vec![]), None).unwrap();
    registry.register("b".into(), module("b", vec!["a"], vec![]), None).unwrap();

    let mut graph = DependencyGraph::new();
    graph.add_edge("a".into(), "b".into(), span());
    graph.add_edge("b".into(), "a".into(), span());

    assert!(graph.has_cycles());
    assert!(!graph.detect_cycles().is_empty());
    assert!(graph.topological_order().is_err());
}

#[test]
fn duplicate_module_registration_is_fatal() {
    let mut registry = ModuleRegistry::new();
    registry.register("a".into(), module("a", vec![], vec![]), Some("a1.b65".into())).unwrap();
    let err = registry
        .register("a".into(), module("a", vec![], vec![]), Some("a2.b65".into()))
        .unwrap_err();
    assert!(matches!(err, Error::DuplicateModule { .. }));
}

// ====================
// S6 — cross-module visibility
// ====================

#[test]
fn exported_function_is_visible_cross_module_but_private_helper_is_not() {
    let helper = blend65::Item::FunctionDecl {
        name: "helper".to_string(),
        params: vec![],
        return_type: Some(byte_type()),
        is_exported: false,
        is_interrupt: false,
        body: vec![ret(int(1))],
        span: span(),
    };
    let foo = function("foo", vec![], Some(byte_type()), vec![ret(call("helper", vec![]))]);

    let a = module("a", vec![], vec![helper, foo]);
    let b_main = function(
        "main",
        vec![],
        None,
        vec![blend65::Stmt::Expression {
            expr: call("foo", vec![]),
            span: span(),
        }],
    );
    let b = module("b", vec!["a"], vec![b_main]);

    let options = CompileOptions::text_only();
    let result = compile(vec![SourceModule::new("a", a), SourceModule::new("b", b)], &options).unwrap();
    assert!(result.diagnostics.iter().all(|d| d.severity != blend65::diagnostics::Severity::Error));
}
