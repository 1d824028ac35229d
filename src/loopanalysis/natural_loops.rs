//! Natural loop discovery.

use super::dominators::Dominance;
use crate::il::{BlockId, IlFunction};
use std::collections::HashSet;

/// A natural loop found via a back edge `source -> header`.
#[derive(Debug, Clone)]
pub struct Loop {
    pub header: BlockId,
    pub back_edge_sources: Vec<BlockId>,
    pub body_blocks: HashSet<BlockId>,
}

/// Scans every edge in `function`; an edge `t -> h` where `h` dominates `t`
/// is a back edge. Loops sharing a header are merged: multiple back edges
/// into the same header form one natural loop, per the standard
/// definition.
pub fn find_natural_loops(function: &IlFunction, dominance: &Dominance) -> Vec<Loop> {
    let mut by_header: std::collections::HashMap<BlockId, Loop> = std::collections::HashMap::new();

    for block in &function.blocks {
        for &succ in &block.successors {
            if dominance.dominates(succ, block.id) {
                let body = loop_body(function, block.id, succ);
                let entry = by_header.entry(succ).or_insert_with(|| Loop {
                    header: succ,
                    back_edge_sources: Vec::new(),
                    body_blocks: HashSet::new(),
                });
                entry.back_edge_sources.push(block.id);
                entry.body_blocks.extend(body);
            }
        }
    }

    let mut loops: Vec<Loop> = by_header.into_values().collect();
    loops.sort_by_key(|l| l.header.0);
    loops
}

/// `{header} ∪ reachable(source, without crossing header)` against the
/// reverse graph (predecessors).
fn loop_body(function: &IlFunction, source: BlockId, header: BlockId) -> HashSet<BlockId> {
    let mut body = HashSet::new();
    body.insert(header);
    if source == header {
        return body;
    }
    let mut stack = vec![source];
    body.insert(source);
    while let Some(id) = stack.pop() {
        for &pred in &function.block(id).predecessors {
            if pred != header && body.insert(pred) {
                stack.push(pred);
            }
        }
    }
    body
}

#[cfg(test)]
mod tests {
    use super::super::dominators;
    use super::*;
    use crate::il::{IlType, Instruction, InstructionMetadata};

    fn while_loop() -> IlFunction {
        // entry -> header -> (body -> header | exit)
        let mut f = IlFunction::new("f", vec![], IlType::Void, false);
        let header = f.new_block("header");
        let body = f.new_block("body");
        let exit = f.new_block("exit");
        f.connect(f.entry_block_id, header);
        f.connect(header, body);
        f.connect(header, exit);
        f.connect(body, header);
        let cond = f.fresh_vreg(IlType::Bool);
        f.block_mut(f.entry_block_id).terminate(0, Instruction::Jump { target: header }, InstructionMetadata::default());
        f.block_mut(header).terminate(
            1,
            Instruction::Branch {
                condition: crate::il::IlValue::Register(cond),
                then_block: body,
                else_block: exit,
            },
            InstructionMetadata::default(),
        );
        f.block_mut(body).terminate(2, Instruction::Jump { target: header }, InstructionMetadata::default());
        f.block_mut(exit).terminate(3, Instruction::ReturnVoid, InstructionMetadata::default());
        f
    }

    #[test]
    fn while_loop_is_found_with_header_and_body() {
        let f = while_loop();
        let dominance = dominators::compute(&f);
        let loops = find_natural_loops(&f, &dominance);
        assert_eq!(loops.len(), 1);
        let header = BlockId(1);
        let body = BlockId(2);
        assert_eq!(loops[0].header, header);
        assert!(loops[0].body_blocks.contains(&header));
        assert!(loops[0].body_blocks.contains(&body));
        assert!(!loops[0].body_blocks.contains(&BlockId(3)));
    }
}
