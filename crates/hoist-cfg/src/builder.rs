// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! BlockBuilder - helper for graph construction during lowering.

use hoist_ast::{NodeId, Span};

use crate::{
    BasicBlock, BlockId, HandlerContext, Instr, InstrKind, MethodGraph, Position, SuspendKind,
    SuspensionId, SuspensionPoint, Terminator,
};

pub struct BlockBuilder {
    graph: MethodGraph,
    current_block: BlockId,
    /// Innermost protected region's handler block is last.
    handlers: Vec<BlockId>,
    /// Blocks reached from the entry by the edges emitted so far.
    live: Vec<bool>,
}

impl BlockBuilder {
    /// Starts a graph with the entry block and both exits allocated.
    pub fn new(method: String, var_count: usize) -> Self {
        let mut graph = MethodGraph {
            method,
            blocks: Vec::new(),
            entry: BlockId(0),
            return_exit: BlockId(1),
            throw_exit: BlockId(2),
            suspensions: Vec::new(),
            var_count,
            reachable: Vec::new(),
        };
        for (i, terminator) in [Terminator::Unreachable, Terminator::Return, Terminator::Unwind]
            .into_iter()
            .enumerate()
        {
            graph.blocks.push(BasicBlock {
                id: BlockId(i as u32),
                instrs: Vec::new(),
                terminator,
                handler: None,
            });
        }

        let live = vec![false; graph.blocks.len()];
        let mut builder = Self {
            graph,
            current_block: BlockId(0),
            handlers: Vec::new(),
            live,
        };
        builder.mark_live(BlockId(0));
        builder
    }

    pub fn return_exit(&self) -> BlockId {
        self.graph.return_exit
    }

    pub fn throw_exit(&self) -> BlockId {
        self.graph.throw_exit
    }

    /// New block, protected by whatever handler is innermost right now.
    pub fn create_block(&mut self) -> BlockId {
        let id = BlockId(self.graph.blocks.len() as u32);
        self.graph.blocks.push(BasicBlock {
            id,
            instrs: Vec::new(),
            terminator: Terminator::Unreachable,
            handler: self.handlers.last().copied(),
        });
        self.live.push(false);
        id
    }

    pub fn switch_to_block(&mut self, block: BlockId) {
        self.current_block = block;
    }

    /// Continue in a fresh block after an unconditional jump.
    pub fn start_dead_block(&mut self) {
        let block = self.create_block();
        self.switch_to_block(block);
    }

    pub fn push_handler(&mut self, handler: BlockId) {
        self.handlers.push(handler);
    }

    pub fn pop_handler(&mut self) {
        self.handlers.pop();
    }

    /// Where an exception raised right now goes.
    pub fn current_handler(&self) -> BlockId {
        self.handlers.last().copied().unwrap_or(self.graph.throw_exit)
    }

    pub fn push(&mut self, kind: InstrKind, node: NodeId, span: Span) {
        let block = &mut self.graph.blocks[self.current_block.index()];
        block.instrs.push(Instr { kind, node, span });
    }

    /// Record a suspension point at the current position.
    pub fn suspend(
        &mut self,
        kind: SuspendKind,
        node: NodeId,
        span: Span,
        handler: HandlerContext,
    ) -> SuspensionId {
        let id = SuspensionId(self.graph.suspensions.len() as u32);
        let position = Position {
            block: self.current_block,
            offset: self.graph.blocks[self.current_block.index()].instrs.len(),
        };
        self.push(InstrKind::Suspend(id), node, span);
        self.graph.suspensions.push(SuspensionPoint {
            id,
            kind,
            node,
            span,
            position,
            handler,
        });
        id
    }

    pub fn terminate(&mut self, term: Terminator) {
        let block = &mut self.graph.blocks[self.current_block.index()];
        block.terminator = term;
        if self.is_live(self.current_block) {
            for edge in self.graph.blocks[self.current_block.index()].successors() {
                self.mark_live(edge.target);
            }
        }
    }

    /// Whether any edge emitted so far leads from the entry to the current
    /// block. Every edge into a block exists by the time lowering switches
    /// to it, so this matches the finished graph's reachability.
    pub fn current_block_live(&self) -> bool {
        self.is_live(self.current_block)
    }

    fn is_live(&self, block: BlockId) -> bool {
        self.live.get(block.index()).copied().unwrap_or(false)
    }

    fn mark_live(&mut self, block: BlockId) {
        let mut stack = vec![block];
        while let Some(id) = stack.pop() {
            match self.live.get_mut(id.index()) {
                Some(seen) if !*seen => *seen = true,
                _ => continue,
            }
            let successors = self.graph.blocks[id.index()].successors();
            stack.extend(successors.into_iter().map(|edge| edge.target));
        }
    }

    /// Check if the current block still has the default Unreachable terminator.
    pub fn current_block_unterminated(&self) -> bool {
        matches!(
            self.graph.blocks[self.current_block.index()].terminator,
            Terminator::Unreachable
        )
    }

    pub fn finish(self) -> MethodGraph {
        let mut graph = self.graph;
        graph.compute_reachability();
        graph
    }
}
