//! Ternary lowering to a 4-block PHI merge (spec scenario S3).

mod common;

use blend65::diagnostics::DiagnosticSink;
use blend65::globaltable::GlobalSymbolTable;
use blend65::il::{Instruction, IlValue};
use common::*;

#[test]
fn ternary_return_lowers_to_phi_merge_block() {
    let body = vec![ret(blend65::Expr::Ternary {
        condition: Box::new(bin(blend65::BinaryOp::Lt, id("x"), int(5))),
        then_value: Box::new(int(10)),
        else_value: Box::new(int(20)),
        span: span(),
    })];
    let f = blend65::Item::FunctionDecl {
        name: "pick".to_string(),
        params: vec![blend65::Param {
            name: "x".to_string(),
            declared_type: byte_type(),
            span: span(),
        }],
        return_type: Some(byte_type()),
        is_exported: true,
        is_interrupt: false,
        body,
        span: span(),
    };
    let m = module("demo", vec![], vec![f]);

    let sink = DiagnosticSink::new();
    let globals = GlobalSymbolTable::new();
    let analyzed = blend65::semantic::analyze(&m, &sink, &globals);
    assert!(!sink.has_errors(), "unexpected semantic errors: {:?}", sink.all());

    let il = blend65::ilgen::generate(&m, &analyzed, &sink);
    assert!(!sink.has_errors(), "unexpected IL generation errors: {:?}", sink.all());

    let function = il.functions.get("pick").expect("pick lowered to IL");
    assert!(
        function.blocks_in_layout_order().len() >= 4,
        "ternary lowering must produce at least 4 basic blocks (predecessor/then/else/merge)"
    );

    let merge_block = function
        .blocks_in_layout_order()
        .iter()
        .find(|b| b.phis().next().is_some())
        .expect("a block with a PHI merge exists");

    let first = &merge_block.instructions[0].instruction;
    let Instruction::Phi { incoming, .. } = first else {
        panic!("merge block's first instruction must be a PHI, got {first:?}");
    };
    assert_eq!(incoming.len(), 2);
    let values: Vec<i64> = incoming
        .iter()
        .filter_map(|(_, v)| match v {
            IlValue::Constant { value, .. } => Some(*value),
            _ => None,
        })
        .collect();
    assert!(values.contains(&10) && values.contains(&20));

    let terminator = merge_block.terminator().expect("merge block has a terminator");
    assert!(matches!(terminator, Instruction::Return { .. }));
}
