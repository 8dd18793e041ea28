// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! Backwards may-be-live analysis with a forward may-be-defined companion.

use std::collections::BTreeSet;

use hoist_ast::VarId;
use hoist_cfg::{BasicBlock, InstrKind, MethodGraph, SuspensionId};
use tracing::{debug, debug_span, trace};

use crate::bitset::BitSet;
use crate::dataflow::solve_forward;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Liveness {
    pub live_in: Vec<BitSet>,
    pub live_out: Vec<BitSet>,
    /// Variables that may have been defined on entry to each block.
    pub defined_in: Vec<BitSet>,
    /// Live set immediately after each suspension point, indexed by id.
    pub live_after: Vec<BitSet>,
    /// Variables both live after and possibly defined at each suspension.
    pub live_across: Vec<BitSet>,
    /// Per variable, the suspension points its live range contains.
    pub crossings: Vec<BTreeSet<SuspensionId>>,
}

impl Liveness {
    /// Suspension points `var` is live across.
    pub fn crossed(&self, var: VarId) -> &BTreeSet<SuspensionId> {
        static EMPTY: BTreeSet<SuspensionId> = BTreeSet::new();
        self.crossings.get(var.index()).unwrap_or(&EMPTY)
    }

    pub fn is_crossing(&self, var: VarId) -> bool {
        !self.crossed(var).is_empty()
    }

    /// Variables live across `id`, in id order.
    pub fn across(&self, id: SuspensionId) -> Vec<VarId> {
        self.live_across
            .get(id.index())
            .map(|set| set.iter().map(|i| VarId(i as u32)).collect())
            .unwrap_or_default()
    }
}

/// Live set at the start of `block`, given the live set at its end and the
/// live-in of its exception handler. Calls `visit(offset, live_after)` for
/// every instruction, last to first.
fn walk_block(
    block: &BasicBlock,
    live_out: &BitSet,
    handler_live: &BitSet,
    mut visit: impl FnMut(usize, &BitSet),
) -> BitSet {
    let mut live = live_out.clone();
    live.union_with(handler_live);
    for (offset, instr) in block.instrs.iter().enumerate().rev() {
        visit(offset, &live);
        match instr.kind {
            InstrKind::Def(var) => live.clear(var.index()),
            InstrKind::Use(var) => live.set(var.index()),
            InstrKind::Suspend(_) => {}
        }
        // An exception may leave the block before this instruction.
        live.union_with(handler_live);
    }
    live
}

/// Terminator successors of a block; the block's handler is not included.
fn normal_successors(graph: &MethodGraph, block: &BasicBlock) -> Vec<usize> {
    let mut without_handler = block.clone();
    without_handler.handler = None;
    without_handler
        .successors()
        .into_iter()
        .map(|e| e.target.index())
        .filter(|i| *i < graph.blocks.len())
        .collect()
}

pub fn compute_liveness(graph: &MethodGraph) -> Liveness {
    let _span = debug_span!("liveness", method = %graph.method).entered();
    let n = graph.blocks.len();
    let var_count = graph.var_count;
    let empty = BitSet::new_empty(var_count);

    let successors: Vec<Vec<usize>> = graph
        .blocks
        .iter()
        .map(|b| normal_successors(graph, b))
        .collect();

    let mut live_in: Vec<BitSet> = (0..n).map(|_| empty.clone()).collect();
    let mut live_out: Vec<BitSet> = (0..n).map(|_| empty.clone()).collect();

    let mut changed = true;
    let mut rounds = 0usize;
    while changed {
        changed = false;
        rounds += 1;
        for b_idx in (0..n).rev() {
            let block = &graph.blocks[b_idx];
            if !graph.is_reachable(block.id) {
                continue;
            }

            let mut out = empty.clone();
            for succ in &successors[b_idx] {
                out.union_with(&live_in[*succ]);
            }
            let handler_live = block
                .handler
                .and_then(|h| live_in.get(h.index()))
                .cloned()
                .unwrap_or_else(|| empty.clone());
            let in_set = walk_block(block, &out, &handler_live, |_, _| {});

            if out != live_out[b_idx] {
                live_out[b_idx] = out;
                changed = true;
            }
            if in_set != live_in[b_idx] {
                live_in[b_idx] = in_set;
                changed = true;
            }
        }
    }
    trace!(rounds, "liveness converged");

    // May-be-defined: parameters are ordinary Defs in the entry block.
    let (defined_in, _) = solve_forward(
        graph,
        empty.clone(),
        empty.clone(),
        |acc, incoming| acc.union_with(incoming),
        |block, state| {
            let mut out = state.clone();
            for instr in &block.instrs {
                if let InstrKind::Def(var) = instr.kind {
                    out.set(var.index());
                }
            }
            out
        },
    );

    let mut live_after: Vec<BitSet> = graph.suspensions.iter().map(|_| empty.clone()).collect();
    for block in &graph.blocks {
        if !graph.is_reachable(block.id) || !block.instrs.iter().any(is_suspend) {
            continue;
        }
        let handler_live = block
            .handler
            .map(|h| live_in[h.index()].clone())
            .unwrap_or_else(|| empty.clone());
        walk_block(block, &live_out[block.id.index()], &handler_live, |offset, live| {
            if let InstrKind::Suspend(id) = block.instrs[offset].kind {
                if let Some(slot) = live_after.get_mut(id.index()) {
                    *slot = live.clone();
                }
            }
        });
    }

    let mut live_across = Vec::with_capacity(graph.suspensions.len());
    let mut crossings: Vec<BTreeSet<SuspensionId>> = (0..var_count).map(|_| BTreeSet::new()).collect();
    for point in &graph.suspensions {
        let mut across = live_after[point.id.index()].clone();
        if graph.is_reachable(point.position.block) {
            across.intersect_with(&defined_at(graph, &defined_in, point.position.block.index(), point.position.offset));
        }
        for var in across.iter() {
            crossings[var].insert(point.id);
        }
        live_across.push(across);
    }

    debug!(
        blocks = n,
        suspensions = graph.suspensions.len(),
        crossing = crossings.iter().filter(|c| !c.is_empty()).count(),
        "live ranges computed"
    );

    Liveness {
        live_in,
        live_out,
        defined_in,
        live_after,
        live_across,
        crossings,
    }
}

fn is_suspend(instr: &hoist_cfg::Instr) -> bool {
    matches!(instr.kind, InstrKind::Suspend(_))
}

/// May-be-defined set just before `offset` in block `b_idx`.
fn defined_at(graph: &MethodGraph, defined_in: &[BitSet], b_idx: usize, offset: usize) -> BitSet {
    let mut defined = defined_in[b_idx].clone();
    for instr in graph.blocks[b_idx].instrs.iter().take(offset) {
        if let InstrKind::Def(var) = instr.kind {
            defined.set(var.index());
        }
    }
    defined
}
