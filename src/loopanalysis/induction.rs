//! Induction variable recognition.

use super::natural_loops::Loop;
use crate::il::{IlFunction, IlValue, Instruction, VReg};
use std::collections::HashMap;

/// A variable updated by a constant amount on every iteration: `i <- i + c`
/// or `i <- i - c`, reached by exactly one definition before the loop.
#[derive(Debug, Clone)]
pub struct BasicInductionVar {
    pub register: VReg,
    pub initial_value: i64,
    pub stride: i64,
}

/// A variable computed as `base * stride + offset` where `base` is a basic
/// induction variable of the same loop.
#[derive(Debug, Clone)]
pub struct DerivedInductionVar {
    pub register: VReg,
    pub base: VReg,
    pub stride: i64,
    pub offset: i64,
}

#[derive(Debug, Clone, Default)]
pub struct InductionVariables {
    pub basic: HashMap<String, BasicInductionVar>,
    pub derived: HashMap<String, DerivedInductionVar>,
}

fn reg_key(reg: &VReg) -> String {
    reg.name.clone().unwrap_or_else(|| format!("%{}", reg.id))
}

/// A register known to be an affine function `base * stride + offset` of a
/// loop's basic induction variable, used while scanning the loop body so a
/// multi-instruction chain (e.g. `t = i*k` then `j = t+m`) composes into one
/// derived IV instead of only recognizing a single defining instruction.
type LinearFn = (VReg, i64, i64);

/// Finds basic and derived induction variables of `loop_` in `function`.
///
/// Basic IVs come from PHI nodes at the loop header: one incoming value
/// from outside the loop (the initial value, must be a constant) and one
/// from inside the loop whose defining instruction is `phi +/- constant`.
///
/// Derived IVs are non-PHI instructions computing an affine function of a
/// basic IV: `i*k`, `k*i`, `i+m`, `m+i`, `i-m`, composed through chained
/// `MUL`/`ADD`/`SUB` instructions so `j = i*k + m` (lowered as a temporary
/// `MUL` feeding an `ADD`) is recognized as one derived IV, not two. `j = i`
/// with no arithmetic at all never reaches this pass: SSA has no copy
/// instruction, so such an assignment simply reuses `i`'s own register
/// under its existing name rather than defining a new one.
pub fn compute(function: &IlFunction, loop_: &Loop) -> InductionVariables {
    let mut result = InductionVariables::default();
    let mut known: HashMap<u32, LinearFn> = HashMap::new();
    // The instruction that re-derives each basic IV's own next value (e.g.
    // `i.next = i + 1`) is technically an affine function of `i` too, but it
    // isn't a *derived* variable — it's `i` itself, one iteration ahead — so
    // its register is excluded from the derived-IV scan below.
    let mut basic_update_ids: std::collections::HashSet<u32> = std::collections::HashSet::new();

    let header = function.block(loop_.header);
    for record in header.phis() {
        let Instruction::Phi { result: phi_reg, incoming } = &record.instruction else {
            continue;
        };
        let mut initial: Option<i64> = None;
        let mut update_reg: Option<&VReg> = None;
        for (block, value) in incoming {
            if loop_.body_blocks.contains(block) {
                update_reg = value.as_register();
            } else if let IlValue::Constant { value: v, .. } = value {
                initial = Some(*v);
            }
        }
        let (Some(initial_value), Some(update_reg)) = (initial, update_reg) else {
            continue;
        };
        if let Some(stride) = step_from_update(function, loop_, phi_reg, update_reg) {
            result.basic.insert(
                reg_key(phi_reg),
                BasicInductionVar {
                    register: phi_reg.clone(),
                    initial_value,
                    stride,
                },
            );
            known.insert(phi_reg.id, (phi_reg.clone(), 1, 0));
            basic_update_ids.insert(update_reg.id);
        }
    }

    let mut block_ids: Vec<_> = loop_.body_blocks.iter().copied().collect();
    block_ids.sort_by_key(|b| b.0);
    for block_id in block_ids {
        for record in &function.block(block_id).instructions {
            if record.instruction.is_phi() {
                continue;
            }
            let Some(dest) = record.instruction.result() else {
                continue;
            };
            if basic_update_ids.contains(&dest.id) {
                continue;
            }
            let linear = match &record.instruction {
                Instruction::Mul { a, b, .. } => affine_operands(&known, a, b, |(base, s, o), k| (base, s * k, o * k)),
                Instruction::Add { a, b, .. } => affine_operands(&known, a, b, |(base, s, o), m| (base, s, o + m)),
                Instruction::Sub { a, b, .. } => {
                    // Only `i - m`: a register minus a constant. `m - i` would
                    // flip the stride's sign and isn't one of the recognized
                    // derived forms.
                    match (a.as_register().and_then(|r| known.get(&r.id)), as_const(b)) {
                        (Some((base, s, o)), Some(m)) => Some((base.clone(), *s, o - m)),
                        _ => None,
                    }
                }
                _ => None,
            };
            if let Some((base, stride, offset)) = linear {
                known.insert(dest.id, (base.clone(), stride, offset));
                result.derived.insert(
                    reg_key(dest),
                    DerivedInductionVar {
                        register: dest.clone(),
                        base,
                        stride,
                        offset,
                    },
                );
            }
        }
    }

    result
}

fn as_const(v: &IlValue) -> Option<i64> {
    match v {
        IlValue::Constant { value, .. } => Some(*value),
        _ => None,
    }
}

/// Tries `a` as the known induction-variable operand and `b` as the
/// constant, then the reverse, combining whichever side matches with
/// `combine(linear, constant)`.
fn affine_operands(known: &HashMap<u32, LinearFn>, a: &IlValue, b: &IlValue, combine: impl Fn(LinearFn, i64) -> LinearFn) -> Option<LinearFn> {
    if let (Some(r), Some(k)) = (a.as_register().and_then(|r| known.get(&r.id)), as_const(b)) {
        return Some(combine(r.clone(), k));
    }
    if let (Some(k), Some(r)) = (as_const(a), b.as_register().and_then(|r| known.get(&r.id))) {
        return Some(combine(r.clone(), k));
    }
    None
}

/// Finds the instruction defining `update_reg` inside the loop body and, if
/// it is `phi_reg +/- constant`, returns the signed stride.
fn step_from_update(function: &IlFunction, loop_: &Loop, phi_reg: &VReg, update_reg: &VReg) -> Option<i64> {
    for &block_id in &loop_.body_blocks {
        for record in &function.block(block_id).instructions {
            let Some(result) = record.instruction.result() else {
                continue;
            };
            if result.id != update_reg.id {
                continue;
            }
            return match &record.instruction {
                Instruction::Add { a, b, .. } => add_constant_step(phi_reg, a, b),
                Instruction::Sub { a, b, .. } => match (a.as_register(), b) {
                    (Some(r), IlValue::Constant { value, .. }) if r.id == phi_reg.id => Some(-*value),
                    _ => None,
                },
                _ => None,
            };
        }
    }
    None
}

fn add_constant_step(phi_reg: &VReg, a: &IlValue, b: &IlValue) -> Option<i64> {
    match (a.as_register(), b.as_register()) {
        (Some(r), _) if r.id == phi_reg.id => match b {
            IlValue::Constant { value, .. } => Some(*value),
            _ => None,
        },
        (_, Some(r)) if r.id == phi_reg.id => match a {
            IlValue::Constant { value, .. } => Some(*value),
            _ => None,
        },
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::il::{IlType, InstructionMetadata};

    /// `let i:byte=0; while i<10 { let j:byte=i*4; i=i+1; }`
    fn counted_loop() -> (IlFunction, Loop) {
        let mut f = IlFunction::new("f", vec![], IlType::Void, false);
        let header = f.new_block("header");
        let body = f.new_block("body");
        let exit = f.new_block("exit");
        f.connect(f.entry_block_id, header);
        f.connect(header, body);
        f.connect(header, exit);
        f.connect(body, header);

        let i0 = f.fresh_vreg(IlType::Byte);
        f.block_mut(f.entry_block_id).push(
            0,
            Instruction::Const {
                result: i0.clone(),
                value: IlValue::const_byte(0),
            },
            InstructionMetadata::default(),
        );
        f.block_mut(f.entry_block_id).terminate(1, Instruction::Jump { target: header }, InstructionMetadata::default());

        let i_phi = VReg::named(f.fresh_vreg(IlType::Byte).id, IlType::Byte, "i");
        let i_next = VReg::named(f.fresh_vreg(IlType::Byte).id, IlType::Byte, "i.next");
        f.block_mut(header).push_phi(
            2,
            Instruction::Phi {
                result: i_phi.clone(),
                incoming: vec![(f.entry_block_id, IlValue::Register(i0)), (body, IlValue::Register(i_next.clone()))],
            },
            InstructionMetadata::default(),
        );
        let cond = f.fresh_vreg(IlType::Bool);
        f.block_mut(header).push(
            3,
            Instruction::CmpLt {
                result: cond.clone(),
                a: IlValue::Register(i_phi.clone()),
                b: IlValue::const_byte(10),
            },
            InstructionMetadata::default(),
        );
        f.block_mut(header).terminate(
            4,
            Instruction::Branch {
                condition: IlValue::Register(cond),
                then_block: body,
                else_block: exit,
            },
            InstructionMetadata::default(),
        );

        let j = VReg::named(f.fresh_vreg(IlType::Byte).id, IlType::Byte, "j");
        f.block_mut(body).push(
            5,
            Instruction::Mul {
                result: j,
                a: IlValue::Register(i_phi.clone()),
                b: IlValue::const_byte(4),
            },
            InstructionMetadata::default(),
        );
        f.block_mut(body).push(
            6,
            Instruction::Add {
                result: i_next,
                a: IlValue::Register(i_phi),
                b: IlValue::const_byte(1),
            },
            InstructionMetadata::default(),
        );
        f.block_mut(body).terminate(7, Instruction::Jump { target: header }, InstructionMetadata::default());
        f.block_mut(exit).terminate(8, Instruction::ReturnVoid, InstructionMetadata::default());

        let mut body_blocks = std::collections::HashSet::new();
        body_blocks.insert(header);
        body_blocks.insert(body);
        let loop_ = Loop {
            header,
            back_edge_sources: vec![body],
            body_blocks,
        };
        (f, loop_)
    }

    #[test]
    fn basic_induction_variable_i_has_initial_zero_and_stride_one() {
        let (f, loop_) = counted_loop();
        let ivs = compute(&f, &loop_);
        let i = ivs.basic.get("i").expect("i is a basic induction variable");
        assert_eq!(i.initial_value, 0);
        assert_eq!(i.stride, 1);
    }

    #[test]
    fn derived_induction_variable_j_tracks_i_times_four() {
        let (f, loop_) = counted_loop();
        let ivs = compute(&f, &loop_);
        let j = ivs.derived.get("j").expect("j is a derived induction variable");
        assert_eq!(j.stride, 4);
        assert_eq!(j.offset, 0);
        assert_eq!(j.base.name.as_deref(), Some("i"));
    }
}
