//! Full-pipeline code generation: BASIC stub framing, storage-class
//! layout, VICE label export, and the "ACME missing degrades to a
//! warning" contract from spec table 7 (scenario S5's surrounding cases).

mod common;

use blend65::ast::StorageClass;
use blend65::pipeline::{compile, SourceModule};
use blend65::{CompileOptions, Item, TypeExpr};
use common::*;

fn program_with_globals() -> blend65::Module {
    let score = Item::VariableDecl {
        name: "score".to_string(),
        storage: StorageClass::Zp,
        is_const: false,
        is_exported: false,
        declared_type: Some(byte_type()),
        init: None,
        span: span(),
    };
    let high_score = Item::VariableDecl {
        name: "high_score".to_string(),
        storage: StorageClass::Data,
        is_const: false,
        is_exported: true,
        declared_type: Some(TypeExpr::named("word", span())),
        init: Some(int(1000)),
        span: span(),
    };
    let buffer = Item::VariableDecl {
        name: "buffer".to_string(),
        storage: StorageClass::Ram,
        is_const: false,
        is_exported: false,
        declared_type: Some(byte_type()),
        init: None,
        span: span(),
    };
    let main = function("main", vec![], None, vec![]);
    module("demo", vec![], vec![score, high_score, buffer, main])
}

// ====================
// BASIC stub + origin framing (S5)
// ====================

#[test]
fn basic_stub_and_origin_appear_in_emitted_text() {
    let m = program_with_globals();
    let options = CompileOptions::text_only();
    let result = compile(vec![SourceModule::new("demo", m)], &options).unwrap();

    assert!(result.asm_text.contains("!to \"demo.prg\""));
    assert!(result.asm_text.contains("* = $0801"));
    assert!(result.asm_module.labels.contains_key("_start"));
    assert!(result.asm_module.labels.contains_key("_main"));
    assert!(result.asm_module.labels.contains_key("high_score"));
}

// ====================
// Storage-class layout
// ====================

#[test]
fn zero_page_and_ram_globals_get_distinct_addresses() {
    let m = program_with_globals();
    let options = CompileOptions::text_only();
    let result = compile(vec![SourceModule::new("demo", m)], &options).unwrap();
    assert!(result.asm_module.metadata.zp_bytes_used >= 1);
    assert!(result.asm_module.metadata.ram_bytes_used >= 1);
}

// ====================
// VICE label export
// ====================

#[test]
fn vice_labels_are_emitted_when_requested() {
    let m = program_with_globals();
    let options = CompileOptions {
        emit_vice_labels: true,
        ..CompileOptions::text_only()
    };
    let result = compile(vec![SourceModule::new("demo", m)], &options).unwrap();
    let labels = result.vice_labels.expect("vice labels requested");
    assert!(labels.contains("_main"));
    assert!(labels.lines().all(|l| l.starts_with("al C:")));
}

// ====================
// ACME unavailable degrades to a warning (spec table 7)
// ====================

#[test]
fn missing_acme_binary_degrades_to_text_only_warning() {
    let m = program_with_globals();
    let options = CompileOptions {
        invoke_acme: true,
        acme_path: "blend65-nonexistent-acme-binary".into(),
        ..CompileOptions::default()
    };
    let result = compile(vec![SourceModule::new("demo", m)], &options).unwrap();
    assert!(result.binary.is_none());
    assert!(result.acme_warning.is_some());
}
