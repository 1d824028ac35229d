//! IL functions.

use super::block::BasicBlock;
use super::types::IlType;
use super::value::BlockId;

/// One function's IL body.
#[derive(Debug, Clone)]
pub struct IlFunction {
    pub name: String,
    pub param_types: Vec<IlType>,
    pub return_type: IlType,
    pub blocks: Vec<BasicBlock>,
    pub entry_block_id: BlockId,
    pub is_interrupt: bool,
    next_vreg: u32,
    next_instruction_id: u32,
}

impl IlFunction {
    /// Creates a function with a single entry block (the first block
    /// created is always the entry).
    pub fn new(name: impl Into<String>, param_types: Vec<IlType>, return_type: IlType, is_interrupt: bool) -> Self {
        let entry = BasicBlock::new(BlockId(0), "entry");
        Self {
            name: name.into(),
            param_types,
            return_type,
            blocks: vec![entry],
            entry_block_id: BlockId(0),
            is_interrupt,
            next_vreg: 0,
            next_instruction_id: 0,
        }
    }

    pub fn fresh_vreg(&mut self, ty: IlType) -> super::value::VReg {
        let id = self.next_vreg;
        self.next_vreg += 1;
        super::value::VReg::new(id, ty)
    }

    pub fn fresh_instruction_id(&mut self) -> u32 {
        let id = self.next_instruction_id;
        self.next_instruction_id += 1;
        id
    }

    /// Appends a new, empty block and returns its id.
    pub fn new_block(&mut self, label: impl Into<String>) -> BlockId {
        let id = BlockId(self.blocks.len());
        self.blocks.push(BasicBlock::new(id, label));
        id
    }

    pub fn block(&self, id: BlockId) -> &BasicBlock {
        &self.blocks[id.0]
    }

    pub fn block_mut(&mut self, id: BlockId) -> &mut BasicBlock {
        &mut self.blocks[id.0]
    }

    /// Links `from -> to`, updating both blocks' edge lists.
    pub fn connect(&mut self, from: BlockId, to: BlockId) {
        self.blocks[from.0].add_successor(to);
        self.blocks[to.0].add_predecessor(from);
    }

    /// Every virtual register defined across this function's blocks, used
    /// by the SSA well-formedness check.
    pub fn defined_registers(&self) -> Vec<&super::value::VReg> {
        self.blocks
            .iter()
            .flat_map(|b| &b.instructions)
            .filter_map(|r| r.instruction.result())
            .collect()
    }

    /// Blocks in layout (creation) order, which is also the order the code
    /// generator lowers them in.
    pub fn blocks_in_layout_order(&self) -> &[BasicBlock] {
        &self.blocks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_block_is_the_first_created() {
        let f = IlFunction::new("main", vec![], IlType::Void, false);
        assert_eq!(f.entry_block_id, BlockId(0));
        assert_eq!(f.blocks.len(), 1);
    }

    #[test]
    fn fresh_vreg_ids_are_monotonic() {
        let mut f = IlFunction::new("main", vec![], IlType::Void, false);
        let a = f.fresh_vreg(IlType::Byte);
        let b = f.fresh_vreg(IlType::Word);
        assert_eq!(a.id, 0);
        assert_eq!(b.id, 1);
    }
}
