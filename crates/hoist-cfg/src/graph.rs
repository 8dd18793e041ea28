// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! Method body graph - basic blocks, edges, and suspension points.

use hoist_ast::{NodeId, Span, VarId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockId(pub u32);

impl BlockId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SuspensionId(pub u32);

impl SuspensionId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A graph position: instruction `offset` within `block`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Position {
    pub block: BlockId,
    pub offset: usize,
}

/// Control-flow graph of one method body.
#[derive(Debug, Clone)]
pub struct MethodGraph {
    pub method: String,
    pub blocks: Vec<BasicBlock>,
    pub entry: BlockId,
    /// Normal completion (`return`, `yield break`, falling off the end).
    pub return_exit: BlockId,
    /// Exceptions that leave the method.
    pub throw_exit: BlockId,
    /// Indexed by `SuspensionId`.
    pub suspensions: Vec<SuspensionPoint>,
    /// Size of the method's variable table.
    pub var_count: usize,
    pub(crate) reachable: Vec<bool>,
}

/// Basic block: instructions in order, then one terminator.
#[derive(Debug, Clone)]
pub struct BasicBlock {
    pub id: BlockId,
    pub instrs: Vec<Instr>,
    pub terminator: Terminator,
    /// Where an exception raised anywhere in this block goes.
    pub handler: Option<BlockId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instr {
    pub kind: InstrKind,
    /// Bound tree node this instruction was lowered from.
    pub node: NodeId,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstrKind {
    Def(VarId),
    Use(VarId),
    Suspend(SuspensionId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Terminator {
    Goto {
        target: BlockId,
    },
    Branch {
        then_block: BlockId,
        else_block: BlockId,
    },
    /// Catch dispatch: any one of the targets.
    Switch {
        targets: Vec<BlockId>,
    },
    /// End of a finally body: resume whichever exit entered it, or keep
    /// unwinding.
    EndFinally {
        targets: Vec<BlockId>,
        unwind: BlockId,
    },
    Throw {
        target: BlockId,
    },
    Return,
    /// The exception leaves the method.
    Unwind,
    /// No successor; the default for blocks nothing flows out of.
    Unreachable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeKind {
    Unconditional,
    CondTrue,
    CondFalse,
    Exceptional,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    pub target: BlockId,
    pub kind: EdgeKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SuspendKind {
    /// Generator resumption (`yield return`).
    Yield,
    /// Asynchronous resumption (`await`, `await foreach`, `await using`).
    Await,
}

/// The innermost exception-handling construct around a suspension point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandlerContext {
    None,
    /// Protected body of a `try` that has catch clauses.
    TryWithCatch,
    Catch,
    Finally,
}

#[derive(Debug, Clone)]
pub struct SuspensionPoint {
    pub id: SuspensionId,
    pub kind: SuspendKind,
    pub node: NodeId,
    pub span: Span,
    pub position: Position,
    pub handler: HandlerContext,
}

impl BasicBlock {
    /// Outgoing edges, deduplicated, in a stable order.
    pub fn successors(&self) -> Vec<Edge> {
        let mut edges = Vec::new();
        let mut push = |target, kind| {
            let edge = Edge { target, kind };
            if !edges.contains(&edge) {
                edges.push(edge);
            }
        };
        match &self.terminator {
            Terminator::Goto { target } => push(*target, EdgeKind::Unconditional),
            Terminator::Branch { then_block, else_block } => {
                push(*then_block, EdgeKind::CondTrue);
                push(*else_block, EdgeKind::CondFalse);
            }
            Terminator::Switch { targets } => {
                for t in targets {
                    push(*t, EdgeKind::Unconditional);
                }
            }
            Terminator::EndFinally { targets, unwind } => {
                for t in targets {
                    push(*t, EdgeKind::Unconditional);
                }
                push(*unwind, EdgeKind::Exceptional);
            }
            Terminator::Throw { target } => push(*target, EdgeKind::Exceptional),
            Terminator::Return | Terminator::Unwind | Terminator::Unreachable => {}
        }
        if let Some(handler) = self.handler {
            push(handler, EdgeKind::Exceptional);
        }
        edges
    }
}

impl MethodGraph {
    pub fn block(&self, id: BlockId) -> &BasicBlock {
        &self.blocks[id.index()]
    }

    pub fn suspension(&self, id: SuspensionId) -> &SuspensionPoint {
        &self.suspensions[id.index()]
    }

    pub fn is_reachable(&self, id: BlockId) -> bool {
        self.reachable.get(id.index()).copied().unwrap_or(false)
    }

    pub fn instr_at(&self, pos: Position) -> Option<&Instr> {
        self.blocks.get(pos.block.index())?.instrs.get(pos.offset)
    }

    /// Predecessor lists, indexed by block.
    pub fn predecessors(&self) -> Vec<Vec<BlockId>> {
        let mut preds = vec![Vec::new(); self.blocks.len()];
        for block in &self.blocks {
            for edge in block.successors() {
                if let Some(list) = preds.get_mut(edge.target.index()) {
                    if !list.contains(&block.id) {
                        list.push(block.id);
                    }
                }
            }
        }
        preds
    }

    /// Recompute which blocks the entry reaches over any edge kind.
    pub fn compute_reachability(&mut self) {
        let mut reachable = vec![false; self.blocks.len()];
        let mut stack = vec![self.entry];
        while let Some(id) = stack.pop() {
            match reachable.get_mut(id.index()) {
                Some(seen) if !*seen => *seen = true,
                _ => continue,
            }
            for edge in self.blocks[id.index()].successors() {
                stack.push(edge.target);
            }
        }
        self.reachable = reachable;
    }

    pub fn reachable_suspensions(&self) -> impl Iterator<Item = &SuspensionPoint> {
        self.suspensions.iter().filter(|s| self.is_reachable(s.position.block))
    }
}
