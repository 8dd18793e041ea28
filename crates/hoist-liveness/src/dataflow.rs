// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! Worklist solver for forward analyses over a method graph.

use std::collections::VecDeque;

use hoist_cfg::{BasicBlock, MethodGraph};

/// Computes a forward dataflow fixpoint.
///
/// `entry` seeds the entry block, every other block starts at `bottom`.
/// Unreachable blocks are ignored and left as `bottom`. Returns the state
/// at each block's entry and exit.
pub fn solve_forward<State, MeetInto, TransferBlock>(
    graph: &MethodGraph,
    entry: State,
    bottom: State,
    mut meet_into: MeetInto,
    mut transfer_block: TransferBlock,
) -> (Vec<State>, Vec<State>)
where
    State: Clone + PartialEq,
    MeetInto: FnMut(&mut State, &State),
    TransferBlock: FnMut(&BasicBlock, &State) -> State,
{
    let n = graph.blocks.len();
    let mut in_states: Vec<State> = (0..n).map(|_| bottom.clone()).collect();
    let mut out_states: Vec<State> = (0..n).map(|_| bottom.clone()).collect();
    // A block's transfer runs at least once even if its IN never moves off
    // `bottom`.
    let mut visited = vec![false; n];

    let start = graph.entry.index();
    if start >= n || !graph.is_reachable(graph.entry) {
        return (in_states, out_states);
    }

    in_states[start] = entry;
    out_states[start] = transfer_block(&graph.blocks[start], &in_states[start]);
    visited[start] = true;
    let mut work = VecDeque::from([start]);

    while let Some(b_idx) = work.pop_front() {
        let out = out_states[b_idx].clone();
        for edge in graph.blocks[b_idx].successors() {
            let succ = edge.target.index();
            if succ >= n || !graph.is_reachable(edge.target) {
                continue;
            }

            // IN_succ = meet(IN_succ, OUT_pred) for each predecessor.
            let mut new_in = in_states[succ].clone();
            meet_into(&mut new_in, &out);
            let first_visit = !visited[succ];
            if new_in == in_states[succ] && !first_visit {
                continue;
            }
            in_states[succ] = new_in;
            visited[succ] = true;

            // OUT_succ is derived purely from IN_succ via the block transfer.
            let new_out = transfer_block(&graph.blocks[succ], &in_states[succ]);
            if new_out != out_states[succ] || first_visit {
                out_states[succ] = new_out;
                work.push_back(succ);
            }
        }
    }

    (in_states, out_states)
}
