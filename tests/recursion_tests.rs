//! End-to-end recursion detection (spec scenario S1 and friends): direct,
//! mutual, and indirect cycles in the call graph must abort compilation
//! before any IL or assembly is produced, each tagged with the right
//! diagnostic code.

mod common;

use blend65::pipeline::{compile, SourceModule};
use blend65::{CompileOptions, Error, Stmt};
use common::*;

// ====================
// Direct recursion
// ====================

#[test]
fn direct_recursion_is_fatal_and_names_static_frame_allocation() {
    let f = function(
        "f",
        vec![],
        Some(byte_type()),
        vec![ret(bin(blend65::BinaryOp::Add, call("f", vec![]), int(1)))],
    );
    let m = module("demo", vec![], vec![f]);
    let err = compile(vec![SourceModule::new("demo", m)], &CompileOptions::text_only()).unwrap_err();

    match err {
        Error::Semantic { diagnostics } => {
            let recursion = diagnostics
                .iter()
                .find(|d| d.code == "DIRECT_RECURSION")
                .expect("DIRECT_RECURSION diagnostic");
            assert!(recursion.message.contains("Static Frame Allocation"));
        }
        other => panic!("expected Error::Semantic, got {other:?}"),
    }
}

// ====================
// Mutual recursion
// ====================

#[test]
fn mutual_recursion_between_two_functions_is_reported() {
    let a = function("a", vec![], Some(byte_type()), vec![ret(call("b", vec![]))]);
    let b = function("b", vec![], Some(byte_type()), vec![ret(call("a", vec![]))]);
    let m = module("demo", vec![], vec![a, b]);
    let err = compile(vec![SourceModule::new("demo", m)], &CompileOptions::text_only()).unwrap_err();

    match err {
        Error::Semantic { diagnostics } => {
            assert!(diagnostics.iter().any(|d| d.code == "MUTUAL_RECURSION"));
        }
        other => panic!("expected Error::Semantic, got {other:?}"),
    }
}

// ====================
// Indirect recursion
// ====================

#[test]
fn indirect_recursion_through_three_functions_is_reported() {
    let a = function("a", vec![], Some(byte_type()), vec![ret(call("b", vec![]))]);
    let b = function("b", vec![], Some(byte_type()), vec![ret(call("c", vec![]))]);
    let c = function("c", vec![], Some(byte_type()), vec![ret(call("a", vec![]))]);
    let m = module("demo", vec![], vec![a, b, c]);
    let err = compile(vec![SourceModule::new("demo", m)], &CompileOptions::text_only()).unwrap_err();

    match err {
        Error::Semantic { diagnostics } => {
            assert!(diagnostics.iter().any(|d| d.code == "INDIRECT_RECURSION"));
        }
        other => panic!("expected Error::Semantic, got {other:?}"),
    }
}

// ====================
// Non-recursive programs are unaffected
// ====================

#[test]
fn non_recursive_call_chain_compiles_clean() {
    let helper = function("helper", vec![], Some(byte_type()), vec![ret(int(1))]);
    let main = function(
        "main",
        vec![],
        None,
        vec![Stmt::Expression {
            expr: call("helper", vec![]),
            span: span(),
        }],
    );
    let m = module("demo", vec![], vec![helper, main]);
    let result = compile(vec![SourceModule::new("demo", m)], &CompileOptions::text_only()).unwrap();
    assert!(result.diagnostics.iter().all(|d| d.code != "DIRECT_RECURSION"));
}
