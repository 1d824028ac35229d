//! Top-level code generator: turns a lowered [`IlModule`] into one finished
//! [`AsmModule`].
//!
//! Orchestrates, in order: global address assignment (`layout`), the BASIC
//! autostart stub, the entry point, per-storage-class global emission, and
//! per-function instruction selection (`function`), finishing with summary
//! metadata comments. A single driver walks a lowered module section by
//! section and hands each section to a narrower, single-purpose helper.

pub mod layout;
pub mod function;

use std::collections::HashMap;

use crate::ast::StorageClass;
use crate::config::CompileOptions;
use crate::error::Result;
use crate::il::{IlModule, IlType};
use crate::ilgen::layout::MapLayout;
use crate::asmil::{AsmBuilder, AsmModule, LabelType};

use layout::{build_function_layouts, GlobalLayout};
use function::FunctionCodeGen;

/// The 12-byte `10 SYS <code_start>` BASIC line that makes a `.prg` loadable
/// with `RUN` instead of `SYS <addr>` at the monitor. `code_start` is
/// rendered as ASCII decimal digits, exactly as the BASIC tokenizer expects
/// its `SYS` argument.
fn basic_stub_bytes(origin: u16, code_start: u16) -> Vec<u8> {
    let digits = code_start.to_string();
    // Layout: [next-line ptr lo/hi][line number lo/hi][SYS token][digits][0][0,0]
    // No space between the SYS token and the digits — the BASIC tokenizer
    // doesn't need one, and the canonical 12-byte stub (4-digit code_start)
    // has no room for one: `code_start` is defined as `origin + stub_len`,
    // so an extra byte here would place `_start` one byte inside the stub.
    let body_len = 2 + 2 + 1 + digits.len() + 1;
    let next_line_ptr = origin.wrapping_add(body_len as u16);

    let mut bytes = Vec::with_capacity(body_len + 2);
    bytes.push((next_line_ptr & 0xFF) as u8);
    bytes.push((next_line_ptr >> 8) as u8);
    bytes.push(0x0A); // line number 10, low byte
    bytes.push(0x00); // line number 10, high byte
    bytes.push(0x9E); // SYS token
    bytes.extend(digits.bytes());
    bytes.push(0x00); // end of statement
    bytes.push(0x00); // end of program, low byte
    bytes.push(0x00); // end of program, high byte
    bytes
}

/// Generates the finished [`AsmModule`] for one lowered program.
///
/// `module` is assumed to already be the fully linked, whole-program IL
/// (the pipeline lowers and merges every source module before calling
/// this); code generation itself has no notion of separate modules, only
/// one flat set of functions and globals.
pub fn generate(module: &IlModule, map_layout: &MapLayout, options: &CompileOptions) -> Result<AsmModule> {
    let mut globals = GlobalLayout::build(module, options)?;
    let mut builder = AsmBuilder::new(module.name.clone(), options.origin, options.target);

    builder.section(format!("blend65 generated code for `{}`", module.name));
    builder.blank();

    if options.emit_basic_stub {
        builder.begin_data();
        builder.byte(basic_stub_bytes(options.origin, options.code_start));
        builder.begin_code();
        builder.origin(options.code_start);
    }

    emit_entry_point(&mut builder, module, &globals, options);

    emit_map_equates(&mut builder, map_layout);
    emit_data_globals(&mut builder, module, &mut globals);
    emit_uninitialized_globals(&mut builder, module, &globals);

    let frame_start = builder.current_address().max(globals.ram_cursor);
    // The return-value slot sits right after every global, ahead of any
    // function frame; every function shares it because SFA's no-recursion
    // guarantee means at most one call is ever in flight writing it.
    let return_slot = (frame_start, frame_start + 1);
    let function_layouts = build_function_layouts(module, return_slot.1 + 1);

    emit_functions(&mut builder, module, &globals, &function_layouts, return_slot);

    emit_footer(&mut builder, options);

    Ok(builder.finish())
}

fn emit_entry_point(builder: &mut AsmBuilder, module: &IlModule, globals: &GlobalLayout, options: &CompileOptions) {
    builder.begin_code();
    builder.label("_start", LabelType::Function, true);

    // Zero-initialize `@zp` globals: the zero page otherwise holds whatever
    // the KERNAL and BASIC left behind at reset, not a defined value.
    let zp_names: Vec<&str> = module
        .globals
        .values()
        .filter(|g| matches!(g.storage, StorageClass::Zp))
        .map(|g| g.name.as_str())
        .collect();
    if !zp_names.is_empty() {
        builder.lda_imm(0);
        let mut sorted = zp_names;
        sorted.sort();
        for name in sorted {
            if let Some(slot) = globals.slot(name) {
                for offset in 0..slot.size {
                    builder.sta_zp((slot.address + offset) as u8);
                }
            }
        }
    }

    if let Some(entry) = module.entry_point.as_deref().or_else(|| module.functions.contains_key("main").then_some("main")) {
        builder.jsr_label(format!("_{entry}"));
    }
    builder.rts();
}

fn emit_map_equates(builder: &mut AsmBuilder, map_layout: &MapLayout) {
    let mut maps = map_layout.maps();
    if maps.is_empty() {
        return;
    }
    builder.begin_code();
    builder.blank();
    builder.section("memory-mapped equates");
    maps.sort_by(|a, b| a.0.cmp(&b.0));
    for (map_name, fields) in &maps {
        let mut fields = fields.clone();
        fields.sort();
        for field in fields {
            if let Some((address, _)) = map_layout.field(map_name, &field) {
                builder.raw(format!("{map_name}_{field} = ${address:04X}"));
            }
        }
    }
}

fn emit_data_globals(builder: &mut AsmBuilder, module: &IlModule, globals: &mut GlobalLayout) {
    let mut names: Vec<&String> = module
        .globals
        .keys()
        .filter(|n| matches!(module.globals[*n].storage, StorageClass::Data))
        .collect();
    names.sort();
    if names.is_empty() {
        return;
    }

    builder.begin_data();
    builder.blank();
    builder.section("initialized data");
    for name in names {
        let global = &module.globals[name];
        let address = builder.current_address();
        builder.label(name.clone(), LabelType::Global, global.is_exported);
        let value = global.init.unwrap_or(0);
        let size = global.ty.size_bytes().max(1) as u16;
        if size >= 2 {
            builder.word(vec![value as u16]);
        } else {
            builder.byte(vec![value as u8]);
        }
        globals.set_slot(name, address, size);
    }
}

fn emit_uninitialized_globals(builder: &mut AsmBuilder, module: &IlModule, globals: &GlobalLayout) {
    let mut names: Vec<&String> = module
        .globals
        .keys()
        .filter(|n| matches!(module.globals[*n].storage, StorageClass::None | StorageClass::Ram))
        .collect();
    names.sort();
    if names.is_empty() {
        return;
    }

    builder.begin_code();
    builder.blank();
    builder.section("global variables (uninitialized)");
    for name in names {
        if let Some(slot) = globals.slot(name) {
            builder.raw(format!("{name} = ${:04X}", slot.address));
        }
    }
}

fn emit_functions(
    builder: &mut AsmBuilder,
    module: &IlModule,
    globals: &GlobalLayout,
    function_layouts: &HashMap<String, layout::FunctionLayout>,
    return_slot: (u16, u16),
) {
    let mut names: Vec<&String> = module.functions.keys().collect();
    names.sort();
    for name in names {
        let function = &module.functions[name];
        let Some(fn_layout) = function_layouts.get(name) else { continue };
        let exported = function.name == "main" || module.entry_point.as_deref() == Some(name.as_str());
        let mut codegen = FunctionCodeGen::new(builder, globals, fn_layout, function_layouts, return_slot);
        codegen.generate(function, exported);
    }
}

fn emit_footer(builder: &mut AsmBuilder, options: &CompileOptions) {
    let metadata = builder.metadata();
    builder.blank();
    builder.section(format!(
        "summary: {} function(s), {} global(s), {} code byte(s), {} data byte(s), {} zp byte(s) of {} available",
        metadata.function_count,
        metadata.global_count,
        metadata.estimated_code_size,
        metadata.estimated_data_size,
        metadata.zp_bytes_used,
        options.zero_page_capacity(),
    ));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Target;
    use crate::il::{IlFunction, IlGlobal};
    use crate::typesys::Type;

    fn empty_map_layout() -> MapLayout {
        MapLayout::build(
            &crate::ast::Module {
                name: "m".to_string(),
                imports: vec![],
                items: vec![],
                span: crate::source::Span::synthetic(),
            },
            &crate::semantic::NamedTypes::new(),
        )
    }

    #[test]
    fn basic_stub_encodes_sys_line() {
        let bytes = basic_stub_bytes(0x0801, 0x080D);
        assert_eq!(bytes.len(), 12, "canonical autostart stub is 12 bytes");
        assert_eq!(bytes[2], 0x0A); // line number 10
        assert_eq!(bytes[4], 0x9E); // SYS token
        let digits: String = bytes[5..5 + "2061".len()].iter().map(|b| *b as char).collect();
        assert_eq!(digits, "2061");
        assert_eq!(bytes[9], 0x00); // end of statement
        assert_eq!(&bytes[10..12], &[0x00, 0x00]); // end of program
    }

    #[test]
    fn basic_stub_length_matches_the_default_code_start_offset() {
        // `CompileOptions::default()`'s `code_start` (`$080D`) is defined as
        // `origin + stub_len`; the stub must actually be that long so
        // `_start` lands immediately after it rather than inside it.
        let options = CompileOptions::default();
        let bytes = basic_stub_bytes(options.origin, options.code_start);
        assert_eq!(options.origin + bytes.len() as u16, options.code_start);
    }

    #[test]
    fn generates_an_entry_point_even_with_no_main() {
        let module = IlModule::new("empty");
        let options = CompileOptions::text_only();
        let asm = generate(&module, &empty_map_layout(), &options).unwrap();
        assert!(asm.labels.contains_key("_start"));
        assert_eq!(asm.target, Target::C64);
    }

    #[test]
    fn calls_main_when_present() {
        let mut module = IlModule::new("prog");
        let main = IlFunction::new("main", vec![], IlType::Void, false);
        module.add_function(main);
        let options = CompileOptions::text_only();
        let asm = generate(&module, &empty_map_layout(), &options).unwrap();
        assert!(asm.labels.contains_key("_main"));
    }

    #[test]
    fn data_globals_get_contiguous_addresses_with_initial_values() {
        let mut module = IlModule::new("prog");
        module.add_global(IlGlobal {
            name: "high_score".to_string(),
            storage: StorageClass::Data,
            ty: Type::Word,
            is_const: false,
            is_exported: true,
            init: Some(42),
        });
        let options = CompileOptions::text_only();
        let asm = generate(&module, &empty_map_layout(), &options).unwrap();
        assert!(asm.labels.contains_key("high_score"));
    }
}
