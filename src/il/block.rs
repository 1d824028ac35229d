//! Basic blocks.

use super::instruction::{Instruction, InstructionMetadata};
use super::value::BlockId;

/// One recorded instruction plus its metadata.
#[derive(Debug, Clone)]
pub struct InstructionRecord {
    pub id: u32,
    pub instruction: Instruction,
    pub metadata: InstructionMetadata,
}

/// A basic block: a straight-line run of instructions ending in exactly one
/// terminator. PHI instructions, if any, lead the block.
#[derive(Debug, Clone)]
pub struct BasicBlock {
    pub id: BlockId,
    pub label: String,
    pub instructions: Vec<InstructionRecord>,
    pub predecessors: Vec<BlockId>,
    pub successors: Vec<BlockId>,
}

impl BasicBlock {
    pub fn new(id: BlockId, label: impl Into<String>) -> Self {
        Self {
            id,
            label: label.into(),
            instructions: Vec::new(),
            predecessors: Vec::new(),
            successors: Vec::new(),
        }
    }

    /// Appends a PHI instruction. Panics (internal invariant violation, not
    /// a user error) if a non-PHI instruction has already been pushed:
    /// every PHI must precede all other instructions in its block.
    pub fn push_phi(&mut self, id: u32, instruction: Instruction, metadata: InstructionMetadata) {
        assert!(instruction.is_phi(), "push_phi called with a non-PHI instruction");
        assert!(
            self.instructions.iter().all(|r| r.instruction.is_phi()),
            "PHI pushed after a non-PHI instruction in block {}",
            self.label
        );
        self.instructions.push(InstructionRecord { id, instruction, metadata });
    }

    /// Appends an ordinary (non-terminator, non-PHI) instruction. Panics if
    /// the block already has a terminator.
    pub fn push(&mut self, id: u32, instruction: Instruction, metadata: InstructionMetadata) {
        assert!(
            !self.has_terminator(),
            "instruction pushed after block {}'s terminator",
            self.label
        );
        self.instructions.push(InstructionRecord { id, instruction, metadata });
    }

    /// Sets this block's terminator. Panics if one is already present.
    pub fn terminate(&mut self, id: u32, instruction: Instruction, metadata: InstructionMetadata) {
        assert!(instruction.is_terminator(), "terminate called with a non-terminator instruction");
        assert!(!self.has_terminator(), "block {} already has a terminator", self.label);
        self.instructions.push(InstructionRecord { id, instruction, metadata });
    }

    pub fn has_terminator(&self) -> bool {
        self.instructions.last().is_some_and(|r| r.instruction.is_terminator())
    }

    pub fn terminator(&self) -> Option<&Instruction> {
        self.instructions.last().map(|r| &r.instruction).filter(|i| i.is_terminator())
    }

    pub fn phis(&self) -> impl Iterator<Item = &InstructionRecord> {
        self.instructions.iter().take_while(|r| r.instruction.is_phi())
    }

    /// Replaces a previously pushed PHI's incoming list in place. Used when
    /// lowering a loop header: the PHI is created before the loop body (and
    /// its back edge) is known, then patched once the latch block(s) exist.
    pub fn patch_phi_incoming(&mut self, id: u32, incoming: Vec<(BlockId, super::value::IlValue)>) {
        let record = self
            .instructions
            .iter_mut()
            .find(|r| r.id == id)
            .unwrap_or_else(|| panic!("no instruction with id {id} in block {}", self.label));
        match &mut record.instruction {
            Instruction::Phi { incoming: slot, .. } => *slot = incoming,
            _ => panic!("patch_phi_incoming called on a non-PHI instruction"),
        }
    }

    /// Records a CFG edge `self -> to`. Idempotent.
    pub fn add_successor(&mut self, to: BlockId) {
        if !self.successors.contains(&to) {
            self.successors.push(to);
        }
    }

    pub fn add_predecessor(&mut self, from: BlockId) {
        if !self.predecessors.contains(&from) {
            self.predecessors.push(from);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::il::instruction::Instruction;

    #[test]
    #[should_panic(expected = "already has a terminator")]
    fn double_terminator_panics() {
        let mut block = BasicBlock::new(BlockId(0), "entry");
        block.terminate(0, Instruction::ReturnVoid, InstructionMetadata::default());
        block.terminate(1, Instruction::ReturnVoid, InstructionMetadata::default());
    }

    #[test]
    #[should_panic(expected = "after block")]
    fn push_after_terminator_panics() {
        let mut block = BasicBlock::new(BlockId(0), "entry");
        block.terminate(0, Instruction::ReturnVoid, InstructionMetadata::default());
        block.push(
            1,
            Instruction::CpuNop,
            InstructionMetadata::default(),
        );
    }

    #[test]
    fn successors_are_deduplicated() {
        let mut block = BasicBlock::new(BlockId(0), "entry");
        block.add_successor(BlockId(1));
        block.add_successor(BlockId(1));
        assert_eq!(block.successors.len(), 1);
    }
}
