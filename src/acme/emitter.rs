//! Renders a finished [`AsmModule`] as ACME assembler source text.
//!
//! A single `match`-driven walk over an ordered item list, each arm
//! formatting one line, with no lookahead or backpatching needed because
//! every item already carries everything it needs to render itself.

use crate::asmil::{AddressingMode, AsmItem, AsmModule, CommentStyle, DataType, DataValues, LabelType, Operand};

/// Renders `module` as ACME source text, ready to hand to [`super::invoker::assemble`]
/// or write straight to a `.asm` file.
pub fn emit(module: &AsmModule) -> String {
    let mut out = String::new();
    out.push_str(&format!("!to \"{}.prg\", cbm\n", module.name));
    out.push('\n');

    for item in &module.items {
        emit_item(&mut out, item);
    }

    out
}

fn emit_item(out: &mut String, item: &AsmItem) {
    match item {
        AsmItem::Instruction {
            mnemonic,
            mode,
            operand,
            comment,
            ..
        } => {
            let operand_text = render_operand(*mode, operand.as_ref());
            let mut line = if operand_text.is_empty() {
                format!("    {mnemonic}")
            } else {
                format!("    {mnemonic} {operand_text}")
            };
            if let Some(c) = comment {
                line = format!("{line:<24} ; {c}");
            }
            out.push_str(&line);
            out.push('\n');
        }
        AsmItem::Label { name, label_type, .. } => {
            match label_type {
                LabelType::MapEquate => {} // equates are rendered via `Raw` by the code generator
                _ => {
                    out.push_str(name);
                    out.push_str(":\n");
                }
            }
        }
        AsmItem::Data { data_type, values, comment } => {
            let directive = render_data(*data_type, values);
            let mut line = format!("    {directive}");
            if let Some(c) = comment {
                line = format!("{line:<24} ; {c}");
            }
            out.push_str(&line);
            out.push('\n');
        }
        AsmItem::Origin { address } => {
            out.push_str(&format!("* = ${address:04X}\n"));
        }
        AsmItem::Comment { text, style } => match style {
            CommentStyle::Line => out.push_str(&format!("; {text}\n")),
            CommentStyle::Section => {
                let banner = "-".repeat(text.len() + 4);
                out.push_str(&format!("; {banner}\n; - {text} -\n; {banner}\n"));
            }
        },
        AsmItem::BlankLine => out.push('\n'),
        AsmItem::Raw { text } => {
            out.push_str(text);
            out.push('\n');
        }
    }
}

fn render_operand(mode: AddressingMode, operand: Option<&Operand>) -> String {
    let Some(operand) = operand else {
        return String::new();
    };
    let core = match operand {
        Operand::Immediate(v) => format!("#${v:02X}"),
        Operand::Address(addr) => match mode {
            AddressingMode::ZeroPage | AddressingMode::ZeroPageX | AddressingMode::ZeroPageY | AddressingMode::IndirectX | AddressingMode::IndirectY => {
                format!("${addr:02X}")
            }
            _ => format!("${addr:04X}"),
        },
        Operand::Label(name) => name.clone(),
    };
    match mode {
        AddressingMode::ZeroPageX | AddressingMode::AbsoluteX => format!("{core},x"),
        AddressingMode::ZeroPageY | AddressingMode::AbsoluteY => format!("{core},y"),
        AddressingMode::IndirectX => format!("({core},x)"),
        AddressingMode::IndirectY => format!("({core}),y"),
        AddressingMode::Indirect => format!("({core})"),
        _ => core,
    }
}

fn render_data(data_type: DataType, values: &DataValues) -> String {
    match (data_type, values) {
        (DataType::Byte, DataValues::Bytes(v)) => {
            let joined = v.iter().map(|b| format!("${b:02X}")).collect::<Vec<_>>().join(", ");
            format!("!byte {joined}")
        }
        (DataType::Word, DataValues::Words(v)) => {
            let joined = v.iter().map(|w| format!("${w:04X}")).collect::<Vec<_>>().join(", ");
            format!("!word {joined}")
        }
        (DataType::Text, DataValues::Text(s)) => format!("!text {:?}", s),
        (DataType::Fill, DataValues::Fill { count, value }) => format!("!fill {count}, ${value:02X}"),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asmil::AsmBuilder;
    use crate::config::Target;

    #[test]
    fn emits_to_directive_and_origin() {
        let mut b = AsmBuilder::new("demo", 0x0801, Target::C64);
        b.origin(0x0801);
        let module = b.finish();
        let text = emit(&module);
        assert!(text.starts_with("!to \"demo.prg\", cbm\n"));
        assert!(text.contains("* = $0801\n"));
    }

    #[test]
    fn immediate_and_absolute_operands_render_with_dollar_prefix() {
        let mut b = AsmBuilder::new("demo", 0x0801, Target::C64);
        b.lda_imm(0x2A);
        b.sta_abs(0xD020);
        let module = b.finish();
        let text = emit(&module);
        assert!(text.contains("LDA #$2A"));
        assert!(text.contains("STA $D020"));
    }

    #[test]
    fn labels_render_flush_left_with_colon() {
        let mut b = AsmBuilder::new("demo", 0x0801, Target::C64);
        b.label("_main", LabelType::Function, true);
        b.rts();
        let module = b.finish();
        let text = emit(&module);
        assert!(text.contains("_main:\n"));
    }

    #[test]
    fn data_directives_use_acme_bang_syntax() {
        let mut b = AsmBuilder::new("demo", 0x0801, Target::C64);
        b.byte(vec![1, 2, 3]);
        b.word(vec![0x1234]);
        b.text_null_terminated("hi");
        let module = b.finish();
        let text = emit(&module);
        assert!(text.contains("!byte $01, $02, $03"));
        assert!(text.contains("!word $1234"));
        assert!(text.contains("!text"));
    }
}
