//! Per-function instruction selection: lowers one [`IlFunction`]'s basic
//! blocks, in layout order, into [`AsmItem`]s via [`AsmBuilder`] (spec
//! §4.9 step 6).
//!
//! PHIs are eliminated by the standard naive out-of-SSA technique: each
//! PHI's incoming `(pred, value)` pairs become a copy-into-the-PHI's-home
//! instruction appended to the end of `pred`, just before its terminator.
//! This can double-write a value that's also read by a sibling PHI in the
//! same predecessor (the classic "lost-copy"/swap hazard); this compiler
//! accepts that limitation rather than building the full parallel-copy
//! scheduler a production SSA destructor would need.
//!
//! 16-bit values have no hardware multiply/divide on the 6502, so `Mul`,
//! `Div`, and `Mod` lower to calls to fixed runtime-support labels
//! (`__mul8`/`__mul16`/`__div8`/`__div16`/`__mod8`/`__mod16`) that a linked
//! runtime library is expected to provide — the same approach cc65's
//! standard library takes, and consistent with this core's stance that the
//! runtime/linking environment is an external collaborator.

use std::collections::HashMap;

use crate::il::{BasicBlock, BlockId, IlFunction, IlType, IlValue, Instruction, VReg};

use super::layout::{FunctionLayout, GlobalLayout};
use crate::asmil::{AsmBuilder, LabelType};

/// Zero-page scratch reserved by the code generator itself, inside the
/// range `CompileOptions::zero_page_range` always leaves free (it ends at
/// `$FA`, never allocating into `$FA..=$FF`).
const PTR_LO: u8 = 0xFA;
const PTR_HI: u8 = 0xFB;
const ARG_LO: u8 = 0xFC;
const ARG_HI: u8 = 0xFD;
const SHIFT_CNT: u8 = 0xFE;

/// Either a compile-time-known byte or the address of one, used to drive
/// the right addressing-mode helper without every call site matching on
/// `IlValue` itself.
#[derive(Debug, Clone, Copy)]
enum ValueLoc {
    Imm(u8),
    Addr(u16),
}

pub struct FunctionCodeGen<'a> {
    builder: &'a mut AsmBuilder,
    globals: &'a GlobalLayout,
    layout: &'a FunctionLayout,
    layouts: &'a HashMap<String, FunctionLayout>,
    return_slot: (u16, u16),
    label_counter: u32,
}

impl<'a> FunctionCodeGen<'a> {
    pub fn new(
        builder: &'a mut AsmBuilder,
        globals: &'a GlobalLayout,
        layout: &'a FunctionLayout,
        layouts: &'a HashMap<String, FunctionLayout>,
        return_slot: (u16, u16),
    ) -> Self {
        Self {
            builder,
            globals,
            layout,
            layouts,
            return_slot,
            label_counter: 0,
        }
    }

    fn fresh_label(&mut self, hint: &str) -> String {
        let n = self.label_counter;
        self.label_counter += 1;
        format!("{}_{}{}", self.layout.label, hint, n)
    }

    pub fn generate(&mut self, function: &IlFunction, exported: bool) {
        self.builder.begin_code();
        self.builder.blank();
        self.builder.section(format!("function {}", function.name));
        self.builder.label(self.layout.label.clone(), LabelType::Function, exported);

        let phi_copies = collect_phi_copies(function);

        let blocks = function.blocks_in_layout_order();
        for (i, block) in blocks.iter().enumerate() {
            if i > 0 {
                let label = self.block_label(function, block.id);
                self.builder.label(label, LabelType::Local, false);
            }
            self.emit_block(function, block, phi_copies.get(&block.id));
        }
    }

    fn block_label(&self, function: &IlFunction, id: BlockId) -> String {
        let _ = function;
        format!("{}_bb{}", self.layout.label, id.0)
    }

    fn emit_block(&mut self, function: &IlFunction, block: &BasicBlock, copies: Option<&Vec<(VReg, IlValue)>>) {
        for record in &block.instructions {
            if record.instruction.is_phi() {
                continue;
            }
            if record.instruction.is_terminator() {
                if let Some(copies) = copies {
                    for (dest, value) in copies {
                        self.emit_copy(dest, value);
                    }
                }
                self.emit_terminator(function, &record.instruction);
            } else {
                self.emit_instruction(&record.instruction);
            }
        }
    }

    fn emit_copy(&mut self, dest: &VReg, value: &IlValue) {
        match dest.ty {
            IlType::Word => {
                let (lo, hi) = self.word_loc(value);
                let (dest_lo, dest_hi) = self.word_home(dest);
                self.lda(lo);
                self.builder.sta_abs(dest_lo);
                self.lda(hi);
                self.builder.sta_abs(dest_hi);
            }
            _ => {
                let loc = self.byte_loc(value);
                let dest_addr = self.byte_home(dest);
                self.lda(loc);
                self.sta(dest_addr);
            }
        }
    }

    // -- Location resolution ----------------------------------------------

    fn home(&self, vreg: &VReg) -> (u16, IlType) {
        *self
            .layout
            .homes
            .get(&vreg.id)
            .unwrap_or_else(|| panic!("no home assigned for %{} in {}", vreg.id, self.layout.label))
    }

    fn byte_home(&self, vreg: &VReg) -> u16 {
        self.home(vreg).0
    }

    fn word_home(&self, vreg: &VReg) -> (u16, u16) {
        let (addr, _) = self.home(vreg);
        (addr, addr + 1)
    }

    fn global_address(&self, name: &str) -> u16 {
        self.globals
            .slot(name)
            .unwrap_or_else(|| panic!("no storage assigned for global `{name}`"))
            .address
    }

    fn byte_loc(&self, value: &IlValue) -> ValueLoc {
        match value {
            IlValue::Constant { value, .. } => ValueLoc::Imm(*value as u8),
            IlValue::Register(vreg) => ValueLoc::Addr(self.byte_home(vreg)),
            IlValue::Global { name } => ValueLoc::Imm(self.global_address(name) as u8),
            IlValue::Parameter { index } => {
                let (addr, _) = self.layout.param_homes[*index as usize];
                ValueLoc::Addr(addr)
            }
            IlValue::Label { .. } => ValueLoc::Imm(0),
        }
    }

    fn word_loc(&self, value: &IlValue) -> (ValueLoc, ValueLoc) {
        match value {
            IlValue::Constant { value, .. } => (ValueLoc::Imm(*value as u8), ValueLoc::Imm((*value >> 8) as u8)),
            IlValue::Register(vreg) => {
                let (lo, hi) = self.word_home(vreg);
                (ValueLoc::Addr(lo), ValueLoc::Addr(hi))
            }
            IlValue::Global { name } => {
                let addr = self.global_address(name);
                (ValueLoc::Imm(addr as u8), ValueLoc::Imm((addr >> 8) as u8))
            }
            IlValue::Parameter { index } => {
                let (addr, _) = self.layout.param_homes[*index as usize];
                (ValueLoc::Addr(addr), ValueLoc::Addr(addr + 1))
            }
            IlValue::Label { .. } => (ValueLoc::Imm(0), ValueLoc::Imm(0)),
        }
    }

    fn value_is_word(&self, value: &IlValue) -> bool {
        match value {
            IlValue::Constant { ty, .. } => *ty == IlType::Word,
            IlValue::Register(vreg) => vreg.ty == IlType::Word,
            IlValue::Global { .. } => true,
            IlValue::Parameter { index } => self.layout.param_homes[*index as usize].1 == IlType::Word,
            IlValue::Label { .. } => true,
        }
    }

    // -- Small helpers over the builder's typed mnemonics -------------------

    fn lda(&mut self, loc: ValueLoc) {
        match loc {
            ValueLoc::Imm(v) => self.builder.lda_imm(v),
            ValueLoc::Addr(a) if a <= 0xFF => self.builder.lda_zp(a as u8),
            ValueLoc::Addr(a) => self.builder.lda_abs(a),
        }
    }

    fn sta(&mut self, addr: u16) {
        if addr <= 0xFF {
            self.builder.sta_zp(addr as u8);
        } else {
            self.builder.sta_abs(addr);
        }
    }

    /// Materializes `address`'s value into the `PTR_LO`/`PTR_HI` indirect
    /// pointer, for byte/word loads and stores through a runtime-computed
    /// address (array/map/pointer access), per spec's `(indirect),y` mode.
    fn materialize_pointer(&mut self, address: &IlValue) {
        let (lo, hi) = self.word_loc(address);
        self.lda(lo);
        self.builder.sta_zp(PTR_LO);
        self.lda(hi);
        self.builder.sta_zp(PTR_HI);
    }

    fn load_indirect_byte_to_a(&mut self, address: &IlValue) {
        self.materialize_pointer(address);
        self.builder.ldy_imm(0);
        self.builder.raw("LDA (PTR),Y".to_string());
    }

    fn store_indirect_byte_from_a(&mut self, address: &IlValue) {
        self.materialize_pointer(address);
        self.builder.ldy_imm(0);
        self.builder.raw("STA (PTR),Y".to_string());
    }

    // -- Non-terminator instructions ----------------------------------------

    fn emit_instruction(&mut self, instr: &Instruction) {
        match instr {
            Instruction::Const { result, value } => self.emit_copy(result, value),

            Instruction::Add { result, a, b } => self.emit_add_sub(result, a, b, false),
            Instruction::Sub { result, a, b } => self.emit_add_sub(result, a, b, true),
            Instruction::Mul { result, a, b } => self.emit_runtime_binop(result, a, b, "mul"),
            Instruction::Div { result, a, b } => self.emit_runtime_binop(result, a, b, "div"),
            Instruction::Mod { result, a, b } => self.emit_runtime_binop(result, a, b, "mod"),
            Instruction::Neg { result, a } => self.emit_neg(result, a),

            Instruction::And { result, a, b } => self.emit_bitwise(result, a, b, Bitwise::And),
            Instruction::Or { result, a, b } => self.emit_bitwise(result, a, b, Bitwise::Or),
            Instruction::Xor { result, a, b } => self.emit_bitwise(result, a, b, Bitwise::Xor),
            Instruction::Not { result, a } => self.emit_not(result, a),
            Instruction::Shl { result, a, b } => self.emit_shift(result, a, b, true),
            Instruction::Shr { result, a, b } => self.emit_shift(result, a, b, false),

            Instruction::CmpEq { result, a, b } => self.emit_compare(result, a, b, Cmp::Eq),
            Instruction::CmpNe { result, a, b } => self.emit_compare(result, a, b, Cmp::Ne),
            Instruction::CmpLt { result, a, b } => self.emit_compare(result, a, b, Cmp::Lt),
            Instruction::CmpLe { result, a, b } => self.emit_compare(result, a, b, Cmp::Le),
            Instruction::CmpGt { result, a, b } => self.emit_compare(result, a, b, Cmp::Gt),
            Instruction::CmpGe { result, a, b } => self.emit_compare(result, a, b, Cmp::Ge),

            Instruction::Load { result, address } => self.emit_load(result, address),
            Instruction::Store { address, value } => self.emit_store(address, value),
            Instruction::LoadGlobal { result, name } => self.emit_load_global(result, name),
            Instruction::StoreGlobal { name, value } => self.emit_store_global(name, value),

            Instruction::Call { callee, args, result } => self.emit_call(callee, args, result.as_ref()),
            Instruction::Phi { .. } => unreachable!("PHIs are skipped by emit_block"),

            Instruction::IntrinsicPeek { result, address } => self.emit_load(result, address),
            Instruction::IntrinsicPoke { address, value } => self.emit_store(address, value),
            Instruction::IntrinsicPeekW { result, address } => self.emit_load(result, address),
            Instruction::IntrinsicPokeW { address, value } => self.emit_store(address, value),

            Instruction::CpuSei => self.builder.sei(),
            Instruction::CpuCli => self.builder.cli(),
            Instruction::CpuNop => self.builder.nop(),
            Instruction::CpuBrk => self.builder.brk(),
            Instruction::CpuPha => self.builder.pha(),
            Instruction::CpuPla => self.builder.pla(),
            Instruction::CpuPhp => self.builder.php(),
            Instruction::CpuPlp => self.builder.plp(),

            Instruction::IntrinsicLo { result, value } => {
                let (lo, _) = self.word_loc(value);
                self.lda(lo);
                self.sta(self.byte_home(result));
            }
            Instruction::IntrinsicHi { result, value } => {
                let (_, hi) = self.word_loc(value);
                self.lda(hi);
                self.sta(self.byte_home(result));
            }

            Instruction::VolatileRead { result, address } => self.emit_load(result, address),
            Instruction::VolatileWrite { address, value } => self.emit_store(address, value),
            Instruction::OptBarrier => self.builder.comment("opt_barrier: no reordering across this point"),

            Instruction::Jump { .. } | Instruction::Branch { .. } | Instruction::Return { .. } | Instruction::ReturnVoid => {
                unreachable!("terminators are handled by emit_terminator")
            }
        }
    }

    fn emit_load(&mut self, result: &VReg, address: &IlValue) {
        if result.ty == IlType::Word {
            self.load_indirect_byte_to_a(address);
            let (lo, hi) = self.word_home(result);
            self.sta(lo);
            self.builder.raw("INY".to_string());
            self.builder.raw("LDA (PTR),Y".to_string());
            self.sta(hi);
        } else {
            self.load_indirect_byte_to_a(address);
            self.sta(self.byte_home(result));
        }
    }

    fn emit_store(&mut self, address: &IlValue, value: &IlValue) {
        if self.value_is_word(value) {
            let (lo, hi) = self.word_loc(value);
            self.lda(lo);
            self.store_indirect_byte_from_a(address);
            self.lda(hi);
            self.builder.raw("INY".to_string());
            self.builder.raw("STA (PTR),Y".to_string());
        } else {
            let loc = self.byte_loc(value);
            self.lda(loc);
            self.store_indirect_byte_from_a(address);
        }
    }

    fn emit_load_global(&mut self, result: &VReg, name: &str) {
        let addr = self.global_address(name);
        if result.ty == IlType::Word {
            self.lda(ValueLoc::Addr(addr));
            let (lo, hi) = self.word_home(result);
            self.sta(lo);
            self.lda(ValueLoc::Addr(addr + 1));
            self.sta(hi);
        } else {
            self.lda(ValueLoc::Addr(addr));
            self.sta(self.byte_home(result));
        }
    }

    fn emit_store_global(&mut self, name: &str, value: &IlValue) {
        let addr = self.global_address(name);
        if self.value_is_word(value) {
            let (lo, hi) = self.word_loc(value);
            self.lda(lo);
            self.sta(addr);
            self.lda(hi);
            self.sta(addr + 1);
        } else {
            let loc = self.byte_loc(value);
            self.lda(loc);
            self.sta(addr);
        }
    }

    fn emit_call(&mut self, callee: &str, args: &[IlValue], result: Option<&VReg>) {
        if let Some(callee_layout) = self.layouts.get(callee) {
            for (arg, (addr, ty)) in args.iter().zip(callee_layout.param_homes.iter()) {
                if *ty == IlType::Word {
                    let (lo, hi) = self.word_loc(arg);
                    self.lda(lo);
                    self.sta(*addr);
                    self.lda(hi);
                    self.sta(addr + 1);
                } else {
                    let loc = self.byte_loc(arg);
                    self.lda(loc);
                    self.sta(*addr);
                }
            }
            self.builder.jsr_label(callee_layout.label.clone());
        } else {
            self.builder.jsr_label(format!("_{callee}"));
        }
        if let Some(result) = result {
            if result.ty == IlType::Word {
                self.lda(ValueLoc::Addr(self.return_slot.0));
                let (lo, hi) = self.word_home(result);
                self.sta(lo);
                self.lda(ValueLoc::Addr(self.return_slot.1));
                self.sta(hi);
            } else {
                self.lda(ValueLoc::Addr(self.return_slot.0));
                self.sta(self.byte_home(result));
            }
        }
    }

    // -- Arithmetic -----------------------------------------------------------

    fn emit_add_sub(&mut self, result: &VReg, a: &IlValue, b: &IlValue, subtract: bool) {
        if result.ty == IlType::Word {
            let (a_lo, a_hi) = self.word_loc(a);
            let (b_lo, b_hi) = self.word_loc(b);
            let (dest_lo, dest_hi) = self.word_home(result);
            self.lda(a_lo);
            if subtract {
                self.builder.sec();
            } else {
                self.builder.clc();
            }
            self.apply_byte_op(b_lo, subtract);
            self.sta(dest_lo);
            self.lda(a_hi);
            self.apply_byte_op(b_hi, subtract);
            self.sta(dest_hi);
        } else {
            let a_loc = self.byte_loc(a);
            let b_loc = self.byte_loc(b);
            self.lda(a_loc);
            if subtract {
                self.builder.sec();
            } else {
                self.builder.clc();
            }
            self.apply_byte_op(b_loc, subtract);
            self.sta(self.byte_home(result));
        }
    }

    fn apply_byte_op(&mut self, loc: ValueLoc, subtract: bool) {
        match (loc, subtract) {
            (ValueLoc::Imm(v), false) => self.builder.adc_imm(v),
            (ValueLoc::Addr(a), false) => self.builder.adc_abs(a),
            (ValueLoc::Imm(v), true) => self.builder.sbc_imm(v),
            (ValueLoc::Addr(a), true) => self.builder.sbc_abs(a),
        }
    }

    fn emit_neg(&mut self, result: &VReg, a: &IlValue) {
        if result.ty == IlType::Word {
            let (lo, hi) = self.word_loc(a);
            let (dest_lo, dest_hi) = self.word_home(result);
            self.lda(lo);
            self.builder.eor_imm(0xFF);
            self.builder.clc();
            self.builder.adc_imm(1);
            self.sta(dest_lo);
            self.lda(hi);
            self.builder.eor_imm(0xFF);
            self.builder.adc_imm(0);
            self.sta(dest_hi);
        } else {
            let loc = self.byte_loc(a);
            self.lda(loc);
            self.builder.eor_imm(0xFF);
            self.builder.clc();
            self.builder.adc_imm(1);
            self.sta(self.byte_home(result));
        }
    }

    fn emit_bitwise(&mut self, result: &VReg, a: &IlValue, b: &IlValue, op: Bitwise) {
        if result.ty == IlType::Word {
            let (a_lo, a_hi) = self.word_loc(a);
            let (b_lo, b_hi) = self.word_loc(b);
            let (dest_lo, dest_hi) = self.word_home(result);
            self.lda(a_lo);
            self.apply_bitwise(b_lo, op);
            self.sta(dest_lo);
            self.lda(a_hi);
            self.apply_bitwise(b_hi, op);
            self.sta(dest_hi);
        } else {
            let a_loc = self.byte_loc(a);
            let b_loc = self.byte_loc(b);
            self.lda(a_loc);
            self.apply_bitwise(b_loc, op);
            self.sta(self.byte_home(result));
        }
    }

    fn apply_bitwise(&mut self, loc: ValueLoc, op: Bitwise) {
        match (op, loc) {
            (Bitwise::And, ValueLoc::Imm(v)) => self.builder.and_imm(v),
            (Bitwise::And, ValueLoc::Addr(a)) => self.builder.and_abs(a),
            (Bitwise::Or, ValueLoc::Imm(v)) => self.builder.ora_imm(v),
            (Bitwise::Or, ValueLoc::Addr(a)) => self.builder.ora_abs(a),
            (Bitwise::Xor, ValueLoc::Imm(v)) => self.builder.eor_imm(v),
            (Bitwise::Xor, ValueLoc::Addr(a)) => self.builder.eor_abs(a),
        }
    }

    fn emit_not(&mut self, result: &VReg, a: &IlValue) {
        // `Not` only applies to `bool`: `0x01 XOR 0x01 = 0`, `0x00
        // XOR 0x01 = 1` — logical NOT on the canonical 0/1 encoding.
        let loc = self.byte_loc(a);
        self.lda(loc);
        self.builder.eor_imm(0x01);
        self.sta(self.byte_home(result));
    }

    fn emit_shift(&mut self, result: &VReg, a: &IlValue, b: &IlValue, left: bool) {
        let is_word = result.ty == IlType::Word;
        let a_first_loc = if is_word { self.word_loc(a).0 } else { self.byte_loc(a) };
        let dest = if is_word { self.word_home(result).0 } else { self.byte_home(result) };

        // Load the shift count into X, the conventional 6502 loop-counter
        // register, then repeat a single-bit shift.
        match self.byte_loc(b) {
            ValueLoc::Imm(count) => self.builder.ldx_imm(count),
            ValueLoc::Addr(addr) => {
                self.lda(ValueLoc::Addr(addr));
                self.builder.sta_zp(SHIFT_CNT);
                self.builder.raw("LDX SHIFT_CNT".to_string());
            }
        }
        let loop_label = self.fresh_label("shift_loop");
        let done_label = self.fresh_label("shift_done");
        self.builder.raw(format!("CPX #0"));
        self.builder.beq_label(done_label.clone());
        self.builder.label(loop_label.clone(), LabelType::Local, false);

        if is_word {
            let (lo, hi) = self.word_home(result);
            // Seed the destination once before the shift loop so each
            // iteration operates on its own home, not the source's.
            let (a_lo, a_hi) = self.word_loc(a);
            self.lda(a_lo);
            self.sta(lo);
            self.lda(a_hi);
            self.sta(hi);
            if left {
                self.builder.raw(format!("ASL {lo:#06X}", lo = lo));
                self.builder.raw(format!("ROL {hi:#06X}", hi = hi));
            } else {
                self.builder.raw(format!("LSR {hi:#06X}", hi = hi));
                self.builder.raw(format!("ROR {lo:#06X}", lo = lo));
            }
        } else {
            self.lda(a_first_loc);
            self.sta(dest);
            if left {
                self.builder.asl_acc();
            } else {
                self.builder.lsr_acc();
            }
            self.sta(dest);
        }
        self.builder.raw("DEX".to_string());
        self.builder.bne_label(loop_label);
        self.builder.label(done_label, LabelType::Local, false);
    }

    fn emit_compare(&mut self, result: &VReg, a: &IlValue, b: &IlValue, cmp: Cmp) {
        let is_word = self.value_is_word(a) || self.value_is_word(b);
        let true_label = self.fresh_label("cmp_true");
        let done_label = self.fresh_label("cmp_done");

        if is_word {
            let (a_lo, a_hi) = self.word_loc(a);
            let (b_lo, b_hi) = self.word_loc(b);
            let hi_ne_label = self.fresh_label("cmp_hi_ne");
            self.lda(a_hi);
            self.cmp(b_hi);
            self.builder.bne_label(hi_ne_label.clone());
            self.lda(a_lo);
            self.cmp(b_lo);
            self.builder.jmp_label(done_label.clone());
            self.builder.label(hi_ne_label, LabelType::Local, false);
            self.builder.label(done_label.clone(), LabelType::Local, false);
        } else {
            let a_loc = self.byte_loc(a);
            let b_loc = self.byte_loc(b);
            self.lda(a_loc);
            self.cmp(b_loc);
        }

        match cmp {
            Cmp::Eq => self.builder.beq_label(true_label.clone()),
            Cmp::Ne => self.builder.bne_label(true_label.clone()),
            Cmp::Lt => self.builder.bcc_label(true_label.clone()),
            Cmp::Ge => self.builder.bcs_label(true_label.clone()),
            Cmp::Le => {
                self.builder.beq_label(true_label.clone());
                self.builder.bcc_label(true_label.clone());
            }
            Cmp::Gt => {
                let not_equal = self.fresh_label("cmp_ne_branch");
                let after = self.fresh_label("cmp_gt_after");
                self.builder.bne_label(not_equal.clone());
                self.builder.jmp_label(after.clone());
                self.builder.label(not_equal, LabelType::Local, false);
                self.builder.bcs_label(true_label.clone());
                self.builder.label(after, LabelType::Local, false);
            }
        }
        self.builder.lda_imm(0);
        let merge = self.fresh_label("cmp_merge");
        self.builder.jmp_label(merge.clone());
        self.builder.label(true_label, LabelType::Local, false);
        self.builder.lda_imm(1);
        self.builder.label(merge, LabelType::Local, false);
        self.sta(self.byte_home(result));
    }

    fn cmp(&mut self, loc: ValueLoc) {
        match loc {
            ValueLoc::Imm(v) => self.builder.cmp_imm(v),
            ValueLoc::Addr(a) => self.builder.cmp_abs(a),
        }
    }

    fn emit_runtime_binop(&mut self, result: &VReg, a: &IlValue, b: &IlValue, op: &str) {
        let is_word = result.ty == IlType::Word;
        let width = if is_word { "16" } else { "8" };
        if is_word {
            let (a_lo, a_hi) = self.word_loc(a);
            let (b_lo, b_hi) = self.word_loc(b);
            self.lda(a_lo);
            self.builder.sta_zp(PTR_LO);
            self.lda(a_hi);
            self.builder.sta_zp(PTR_HI);
            self.lda(b_lo);
            self.builder.sta_zp(ARG_LO);
            self.lda(b_hi);
            self.builder.sta_zp(ARG_HI);
        } else {
            let a_loc = self.byte_loc(a);
            let b_loc = self.byte_loc(b);
            self.lda(a_loc);
            self.builder.sta_zp(PTR_LO);
            self.lda(b_loc);
            self.builder.sta_zp(ARG_LO);
        }
        self.builder.jsr_label(format!("__{op}{width}"));
        if is_word {
            let (dest_lo, dest_hi) = self.word_home(result);
            self.lda(ValueLoc::Addr(self.return_slot.0));
            self.sta(dest_lo);
            self.lda(ValueLoc::Addr(self.return_slot.1));
            self.sta(dest_hi);
        } else {
            self.lda(ValueLoc::Addr(self.return_slot.0));
            self.sta(self.byte_home(result));
        }
    }

    // -- Terminators ------------------------------------------------------

    fn emit_terminator(&mut self, function: &IlFunction, instr: &Instruction) {
        match instr {
            Instruction::Jump { target } => {
                let label = self.block_label(function, *target);
                self.builder.jmp_label(label);
            }
            Instruction::Branch { condition, then_block, else_block } => {
                let loc = self.byte_loc(condition);
                self.lda(loc);
                self.builder.raw("CMP #0".to_string());
                let then_label = self.block_label(function, *then_block);
                let else_label = self.block_label(function, *else_block);
                self.builder.bne_label(then_label);
                self.builder.jmp_label(else_label);
            }
            Instruction::Return { value } => {
                if self.value_is_word(value) {
                    let (lo, hi) = self.word_loc(value);
                    self.lda(lo);
                    self.sta(self.return_slot.0);
                    self.lda(hi);
                    self.sta(self.return_slot.1);
                } else {
                    let loc = self.byte_loc(value);
                    self.lda(loc);
                    self.sta(self.return_slot.0);
                }
                self.builder.rts();
            }
            Instruction::ReturnVoid => self.builder.rts(),
            _ => unreachable!("non-terminator reached emit_terminator"),
        }
    }
}

#[derive(Clone, Copy)]
enum Bitwise {
    And,
    Or,
    Xor,
}

#[derive(Clone, Copy)]
enum Cmp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

/// Pre-pass: gathers every PHI's incoming edges into copies to emit at the
/// end of the corresponding predecessor block.
fn collect_phi_copies(function: &IlFunction) -> HashMap<BlockId, Vec<(VReg, IlValue)>> {
    let mut copies: HashMap<BlockId, Vec<(VReg, IlValue)>> = HashMap::new();
    for block in function.blocks_in_layout_order() {
        for record in block.phis() {
            if let Instruction::Phi { result, incoming } = &record.instruction {
                for (pred, value) in incoming {
                    copies.entry(*pred).or_default().push((result.clone(), value.clone()));
                }
            }
        }
    }
    copies
}
