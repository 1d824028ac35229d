//! The ASM-IL module builder.
//!
//! Exposes one typed helper per (mnemonic, addressing-mode) combination the
//! code generator needs (`lda_imm`, `sta_abs`, `jsr`, `rts`, ...) plus data
//! directives and structural helpers. Every emit advances `current_address`
//! and folds into `AsmModule::metadata`, so the running byte/cycle counts
//! stay accurate as items are appended.

use super::addressing::{self, AddressingMode};
use super::item::{AsmItem, CommentStyle, DataType, DataValues, LabelType, Operand};
use super::module::{AsmMetadata, AsmModule, LabelEntry};
use crate::config::Target;
use crate::source::Span;

/// Builds one [`AsmModule`] item at a time, tracking the running address
/// and byte-count metadata as it goes.
pub struct AsmBuilder {
    module: AsmModule,
    current_address: u16,
    /// Once `true`, subsequent emits count toward `estimated_data_size`
    /// instead of `estimated_code_size` — toggled by [`Self::begin_data`]
    /// / [`Self::begin_code`], which the code generator calls around each
    /// globals/function section.
    in_data_section: bool,
}

impl AsmBuilder {
    pub fn new(name: impl Into<String>, origin: u16, target: Target) -> Self {
        Self {
            module: AsmModule::new(name, origin, target),
            current_address: origin,
            in_data_section: false,
        }
    }

    pub fn current_address(&self) -> u16 {
        self.current_address
    }

    pub fn begin_code(&mut self) {
        self.in_data_section = false;
    }

    pub fn begin_data(&mut self) {
        self.in_data_section = true;
    }

    fn account(&mut self, bytes: usize) {
        self.current_address = self.current_address.wrapping_add(bytes as u16);
        if self.in_data_section {
            self.module.metadata.estimated_data_size += bytes;
        } else {
            self.module.metadata.estimated_code_size += bytes;
        }
    }

    fn push_instruction(
        &mut self,
        mnemonic: &'static str,
        mode: AddressingMode,
        operand: Option<Operand>,
        comment: Option<String>,
        source_location: Option<Span>,
    ) {
        let bytes = addressing::bytes(mnemonic, mode);
        let cycles = addressing::cycles(mnemonic, mode).unwrap_or(2);
        self.account(bytes as usize);
        self.module.items.push(AsmItem::Instruction {
            mnemonic,
            mode,
            operand,
            cycles,
            bytes,
            comment,
            source_location,
        });
    }

    // -- Load/store ---------------------------------------------------

    pub fn lda_imm(&mut self, value: u8) {
        self.push_instruction("LDA", AddressingMode::Immediate, Some(Operand::Immediate(value)), None, None);
    }

    pub fn lda_abs(&mut self, address: u16) {
        self.push_instruction("LDA", AddressingMode::Absolute, Some(Operand::Address(address)), None, None);
    }

    pub fn lda_zp(&mut self, address: u8) {
        self.push_instruction("LDA", AddressingMode::ZeroPage, Some(Operand::Address(address as u16)), None, None);
    }

    pub fn lda_label(&mut self, label: impl Into<String>) {
        self.push_instruction("LDA", AddressingMode::Absolute, Some(Operand::Label(label.into())), None, None);
    }

    pub fn ldx_imm(&mut self, value: u8) {
        self.push_instruction("LDX", AddressingMode::Immediate, Some(Operand::Immediate(value)), None, None);
    }

    pub fn ldy_imm(&mut self, value: u8) {
        self.push_instruction("LDY", AddressingMode::Immediate, Some(Operand::Immediate(value)), None, None);
    }

    pub fn sta_abs(&mut self, address: u16) {
        self.push_instruction("STA", AddressingMode::Absolute, Some(Operand::Address(address)), None, None);
    }

    pub fn sta_zp(&mut self, address: u8) {
        self.push_instruction("STA", AddressingMode::ZeroPage, Some(Operand::Address(address as u16)), None, None);
    }

    pub fn sta_label(&mut self, label: impl Into<String>) {
        self.push_instruction("STA", AddressingMode::Absolute, Some(Operand::Label(label.into())), None, None);
    }

    pub fn sta_abs_x(&mut self, address: u16) {
        self.push_instruction("STA", AddressingMode::AbsoluteX, Some(Operand::Address(address)), None, None);
    }

    pub fn lda_abs_x(&mut self, address: u16) {
        self.push_instruction("LDA", AddressingMode::AbsoluteX, Some(Operand::Address(address)), None, None);
    }

    // -- Arithmetic / bitwise (accumulator-implicit, per 6502 ISA) -----

    pub fn clc(&mut self) {
        self.push_instruction("CLC", AddressingMode::Implied, None, None, None);
    }

    pub fn sec(&mut self) {
        self.push_instruction("SEC", AddressingMode::Implied, None, None, None);
    }

    pub fn adc_imm(&mut self, value: u8) {
        self.push_instruction("ADC", AddressingMode::Immediate, Some(Operand::Immediate(value)), None, None);
    }

    pub fn adc_abs(&mut self, address: u16) {
        self.push_instruction("ADC", AddressingMode::Absolute, Some(Operand::Address(address)), None, None);
    }

    pub fn sbc_imm(&mut self, value: u8) {
        self.push_instruction("SBC", AddressingMode::Immediate, Some(Operand::Immediate(value)), None, None);
    }

    pub fn sbc_abs(&mut self, address: u16) {
        self.push_instruction("SBC", AddressingMode::Absolute, Some(Operand::Address(address)), None, None);
    }

    pub fn and_imm(&mut self, value: u8) {
        self.push_instruction("AND", AddressingMode::Immediate, Some(Operand::Immediate(value)), None, None);
    }

    pub fn and_abs(&mut self, address: u16) {
        self.push_instruction("AND", AddressingMode::Absolute, Some(Operand::Address(address)), None, None);
    }

    pub fn ora_imm(&mut self, value: u8) {
        self.push_instruction("ORA", AddressingMode::Immediate, Some(Operand::Immediate(value)), None, None);
    }

    pub fn ora_abs(&mut self, address: u16) {
        self.push_instruction("ORA", AddressingMode::Absolute, Some(Operand::Address(address)), None, None);
    }

    pub fn eor_imm(&mut self, value: u8) {
        self.push_instruction("EOR", AddressingMode::Immediate, Some(Operand::Immediate(value)), None, None);
    }

    pub fn eor_abs(&mut self, address: u16) {
        self.push_instruction("EOR", AddressingMode::Absolute, Some(Operand::Address(address)), None, None);
    }

    pub fn asl_acc(&mut self) {
        self.push_instruction("ASL", AddressingMode::Accumulator, None, None, None);
    }

    pub fn lsr_acc(&mut self) {
        self.push_instruction("LSR", AddressingMode::Accumulator, None, None, None);
    }

    pub fn rol_acc(&mut self) {
        self.push_instruction("ROL", AddressingMode::Accumulator, None, None, None);
    }

    pub fn ror_acc(&mut self) {
        self.push_instruction("ROR", AddressingMode::Accumulator, None, None, None);
    }

    pub fn cmp_imm(&mut self, value: u8) {
        self.push_instruction("CMP", AddressingMode::Immediate, Some(Operand::Immediate(value)), None, None);
    }

    pub fn cmp_abs(&mut self, address: u16) {
        self.push_instruction("CMP", AddressingMode::Absolute, Some(Operand::Address(address)), None, None);
    }

    // -- Control flow ---------------------------------------------------

    pub fn jmp_label(&mut self, label: impl Into<String>) {
        self.push_instruction("JMP", AddressingMode::Absolute, Some(Operand::Label(label.into())), None, None);
    }

    pub fn jsr_label(&mut self, label: impl Into<String>) {
        self.push_instruction("JSR", AddressingMode::Absolute, Some(Operand::Label(label.into())), None, None);
    }

    pub fn rts(&mut self) {
        self.push_instruction("RTS", AddressingMode::Implied, None, None, None);
    }

    pub fn beq_label(&mut self, label: impl Into<String>) {
        self.push_instruction("BEQ", AddressingMode::Relative, Some(Operand::Label(label.into())), None, None);
    }

    pub fn bne_label(&mut self, label: impl Into<String>) {
        self.push_instruction("BNE", AddressingMode::Relative, Some(Operand::Label(label.into())), None, None);
    }

    pub fn bcc_label(&mut self, label: impl Into<String>) {
        self.push_instruction("BCC", AddressingMode::Relative, Some(Operand::Label(label.into())), None, None);
    }

    pub fn bcs_label(&mut self, label: impl Into<String>) {
        self.push_instruction("BCS", AddressingMode::Relative, Some(Operand::Label(label.into())), None, None);
    }

    // -- Stack / CPU intrinsics ------------------------------------------

    pub fn pha(&mut self) {
        self.push_instruction("PHA", AddressingMode::Implied, None, None, None);
    }

    pub fn pla(&mut self) {
        self.push_instruction("PLA", AddressingMode::Implied, None, None, None);
    }

    pub fn php(&mut self) {
        self.push_instruction("PHP", AddressingMode::Implied, None, None, None);
    }

    pub fn plp(&mut self) {
        self.push_instruction("PLP", AddressingMode::Implied, None, None, None);
    }

    pub fn sei(&mut self) {
        self.push_instruction("SEI", AddressingMode::Implied, None, None, None);
    }

    pub fn cli(&mut self) {
        self.push_instruction("CLI", AddressingMode::Implied, None, None, None);
    }

    pub fn nop(&mut self) {
        self.push_instruction("NOP", AddressingMode::Implied, None, None, None);
    }

    pub fn brk(&mut self) {
        self.push_instruction("BRK", AddressingMode::Implied, None, None, None);
    }

    // -- Data directives --------------------------------------------------

    pub fn byte(&mut self, values: Vec<u8>) {
        self.account(values.len());
        self.module.items.push(AsmItem::Data {
            data_type: DataType::Byte,
            values: DataValues::Bytes(values),
            comment: None,
        });
    }

    pub fn word(&mut self, values: Vec<u16>) {
        self.account(values.len() * 2);
        self.module.items.push(AsmItem::Data {
            data_type: DataType::Word,
            values: DataValues::Words(values),
            comment: None,
        });
    }

    /// A single word-sized reference to a label's eventual address (a
    /// pointer table entry), resolved to a numeric value by ACME itself.
    pub fn word_label(&mut self, label: impl Into<String>) {
        self.account(2);
        self.module.items.push(AsmItem::Raw {
            text: format!("!word {}", label.into()),
        });
    }

    pub fn text(&mut self, s: impl Into<String>) {
        let s = s.into();
        self.account(s.len());
        self.module.items.push(AsmItem::Data {
            data_type: DataType::Text,
            values: DataValues::Text(s),
            comment: None,
        });
    }

    pub fn text_null_terminated(&mut self, s: impl Into<String>) {
        let mut s = s.into();
        s.push('\0');
        self.account(s.len());
        self.module.items.push(AsmItem::Data {
            data_type: DataType::Text,
            values: DataValues::Text(s),
            comment: None,
        });
    }

    pub fn fill(&mut self, count: u32, value: u8) {
        self.account(count as usize);
        self.module.items.push(AsmItem::Data {
            data_type: DataType::Fill,
            values: DataValues::Fill { count, value },
            comment: None,
        });
    }

    /// Zero-initialized reservation — `fill` with a zero byte.
    pub fn zero(&mut self, count: u32) {
        self.fill(count, 0);
    }

    /// Alias for `zero`, for reservations whose intent isn't "this is
    /// literally zero" but "this is uninitialized storage".
    pub fn reserve(&mut self, count: u32) {
        self.zero(count);
    }

    // -- Structural helpers -----------------------------------------------

    pub fn label(&mut self, name: impl Into<String>, label_type: LabelType, exported: bool) {
        let name = name.into();
        let address = self.current_address;
        self.module.labels.insert(
            name.clone(),
            LabelEntry {
                label_type,
                exported,
                address: Some(address),
            },
        );
        self.module.items.push(AsmItem::Label {
            name,
            label_type,
            exported,
            address: Some(address),
        });
        match label_type {
            LabelType::Function => self.module.metadata.function_count += 1,
            LabelType::Global | LabelType::MapEquate => self.module.metadata.global_count += 1,
            LabelType::Local => {}
        }
    }

    pub fn origin(&mut self, address: u16) {
        self.current_address = address;
        self.module.items.push(AsmItem::Origin { address });
    }

    pub fn section(&mut self, title: impl Into<String>) {
        self.module.items.push(AsmItem::Comment {
            text: title.into(),
            style: CommentStyle::Section,
        });
    }

    pub fn comment(&mut self, text: impl Into<String>) {
        self.module.items.push(AsmItem::Comment {
            text: text.into(),
            style: CommentStyle::Line,
        });
    }

    pub fn blank(&mut self) {
        self.module.items.push(AsmItem::BlankLine);
    }

    pub fn raw(&mut self, text: impl Into<String>) {
        self.module.items.push(AsmItem::Raw { text: text.into() });
    }

    pub fn add_zp_bytes(&mut self, n: usize) {
        self.module.metadata.zp_bytes_used += n;
    }

    pub fn add_ram_bytes(&mut self, n: usize) {
        self.module.metadata.ram_bytes_used += n;
    }

    pub fn metadata(&self) -> &AsmMetadata {
        &self.module.metadata
    }

    pub fn finish(self) -> AsmModule {
        self.module
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lda_imm_advances_address_by_two() {
        let mut b = AsmBuilder::new("m", 0x0801, Target::C64);
        let start = b.current_address();
        b.lda_imm(5);
        assert_eq!(b.current_address(), start + 2);
        assert_eq!(b.metadata().estimated_code_size, 2);
    }

    #[test]
    fn label_records_the_current_address() {
        let mut b = AsmBuilder::new("m", 0x0801, Target::C64);
        b.lda_imm(1);
        b.label("_start", LabelType::Function, true);
        let module = b.finish();
        assert_eq!(module.labels["_start"].address, Some(0x0803));
        assert_eq!(module.metadata.function_count, 1);
    }

    #[test]
    fn data_section_bytes_are_tracked_separately() {
        let mut b = AsmBuilder::new("m", 0x0801, Target::C64);
        b.begin_code();
        b.lda_imm(1);
        b.begin_data();
        b.byte(vec![1, 2, 3]);
        let module = b.finish();
        assert_eq!(module.metadata.estimated_code_size, 2);
        assert_eq!(module.metadata.estimated_data_size, 3);
    }
}
