//! Loop-carried induction variable recognition (spec scenario S4):
//!
//! ```text
//! let i: byte = 0;
//! while i < 10 {
//!     let j: byte = i * 4;
//!     i = i + 1;
//! }
//! ```
//!
//! expects one natural loop with `i` a basic induction variable
//! (`initial = 0, stride = 1`) and `j` derived from `i` (`stride = 4,
//! offset = 0`).

mod common;

use blend65::diagnostics::DiagnosticSink;
use blend65::globaltable::GlobalSymbolTable;
use common::*;

#[test]
fn while_loop_recognizes_basic_and_derived_induction_variables() {
    let body = vec![
        blend65::Stmt::VariableDecl {
            name: "i".to_string(),
            is_const: false,
            declared_type: Some(byte_type()),
            init: Some(int(0)),
            span: span(),
        },
        blend65::Stmt::While {
            condition: bin(blend65::BinaryOp::Lt, id("i"), int(10)),
            body: vec![
                blend65::Stmt::VariableDecl {
                    name: "j".to_string(),
                    is_const: false,
                    declared_type: Some(byte_type()),
                    init: Some(bin(blend65::BinaryOp::Mul, id("i"), int(4))),
                    span: span(),
                },
                blend65::Stmt::Expression {
                    expr: blend65::Expr::Assignment {
                        target: Box::new(id("i")),
                        value: Box::new(bin(blend65::BinaryOp::Add, id("i"), int(1))),
                        span: span(),
                    },
                    span: span(),
                },
            ],
            span: span(),
        },
        blend65::Stmt::Return { value: None, span: span() },
    ];
    let f = function("run", vec![], None, body);
    let m = module("demo", vec![], vec![f]);

    let sink = DiagnosticSink::new();
    let globals = GlobalSymbolTable::new();
    let analyzed = blend65::semantic::analyze(&m, &sink, &globals);
    assert!(!sink.has_errors(), "unexpected semantic errors: {:?}", sink.all());

    let il = blend65::ilgen::generate(&m, &analyzed, &sink);
    assert!(!sink.has_errors(), "unexpected IL generation errors: {:?}", sink.all());

    let function = il.functions.get("run").expect("run lowered to IL");
    let result = blend65::loopanalysis::analyze(function);
    assert_eq!(result.loops.len(), 1, "expected exactly one natural loop");

    let loop_info = &result.loops[0];
    let (_, basic_iv) = loop_info
        .induction_variables
        .basic
        .iter()
        .find(|(name, _)| name.as_str() == "i")
        .expect("`i` recognized as a basic induction variable");
    assert_eq!(basic_iv.initial_value, 0);
    assert_eq!(basic_iv.stride, 1);

    let (_, derived_iv) = loop_info
        .induction_variables
        .derived
        .iter()
        .find(|(name, _)| name.as_str() == "j")
        .expect("`j` recognized as a derived induction variable");
    assert_eq!(derived_iv.stride, 4);
    assert_eq!(derived_iv.offset, 0);
}
