//! Loop-invariant instruction detection.

use super::natural_loops::Loop;
use crate::il::{IlFunction, IlValue};
use std::collections::{HashMap, HashSet};

/// Computes, to a fixpoint, the set of instruction ids inside `loop_` that
/// are loop-invariant: every operand is a constant, defined outside the
/// loop, or itself invariant. Instructions with side effects (calls,
/// volatile memory ops, CPU intrinsics) are conservatively excluded.
pub fn compute(function: &IlFunction, loop_: &Loop) -> HashSet<u32> {
    // Maps a defined register id to (defining instruction id, defining block in loop?).
    let mut def_block: HashMap<u32, crate::il::BlockId> = HashMap::new();
    let mut def_instruction: HashMap<u32, u32> = HashMap::new();
    for block in &function.blocks {
        for record in &block.instructions {
            if let Some(result) = record.instruction.result() {
                def_block.insert(result.id, block.id);
                def_instruction.insert(result.id, record.id);
            }
        }
    }

    let mut invariant: HashSet<u32> = HashSet::new();
    let mut changed = true;
    while changed {
        changed = false;
        for &block_id in &loop_.body_blocks {
            let block = function.block(block_id);
            for record in &block.instructions {
                if invariant.contains(&record.id) {
                    continue;
                }
                if record.instruction.is_phi() || record.instruction.has_side_effects() || record.instruction.is_terminator() {
                    continue;
                }
                let Some(_) = record.instruction.result() else {
                    continue;
                };
                let all_invariant = record.instruction.operands().into_iter().all(|operand| is_operand_invariant(operand, loop_, &def_block, &def_instruction, &invariant));
                if all_invariant {
                    invariant.insert(record.id);
                    changed = true;
                }
            }
        }
    }
    invariant
}

fn is_operand_invariant(
    operand: &IlValue,
    loop_: &Loop,
    def_block: &HashMap<u32, crate::il::BlockId>,
    def_instruction: &HashMap<u32, u32>,
    invariant: &HashSet<u32>,
) -> bool {
    match operand {
        IlValue::Constant { .. } | IlValue::Global { .. } | IlValue::Parameter { .. } | IlValue::Label { .. } => true,
        IlValue::Register(r) => match def_block.get(&r.id) {
            Some(block) if loop_.body_blocks.contains(block) => {
                def_instruction.get(&r.id).is_some_and(|id| invariant.contains(id))
            }
            _ => true, // defined outside the loop (or a parameter with no local def)
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::il::{IlType, Instruction, InstructionMetadata};
    use std::collections::HashSet as Set;

    #[test]
    fn constant_add_outside_loop_operands_is_invariant() {
        let mut f = IlFunction::new("f", vec![], IlType::Void, false);
        let header = f.new_block("header");
        f.connect(f.entry_block_id, header);
        let x = f.fresh_vreg(IlType::Byte);
        f.block_mut(f.entry_block_id).push(
            0,
            Instruction::Const {
                result: x.clone(),
                value: crate::il::IlValue::const_byte(5),
            },
            InstructionMetadata::default(),
        );
        f.block_mut(f.entry_block_id).terminate(1, Instruction::Jump { target: header }, InstructionMetadata::default());
        let y = f.fresh_vreg(IlType::Byte);
        f.block_mut(header).push(
            2,
            Instruction::Add {
                result: y,
                a: crate::il::IlValue::Register(x),
                b: crate::il::IlValue::const_byte(1),
            },
            InstructionMetadata::default(),
        );
        f.block_mut(header).terminate(3, Instruction::ReturnVoid, InstructionMetadata::default());

        let mut body = Set::new();
        body.insert(header);
        let loop_ = Loop {
            header,
            back_edge_sources: vec![],
            body_blocks: body,
        };
        let invariant = compute(&f, &loop_);
        assert!(invariant.contains(&2));
    }
}
