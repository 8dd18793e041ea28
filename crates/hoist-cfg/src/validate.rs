// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! Structural validation of a built graph.

use std::collections::HashSet;

use hoist_ast::{NodeId, VarId};
use thiserror::Error;

use crate::{BlockId, InstrKind, MethodGraph, Position, SuspensionId};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("entry block {0:?} does not exist")]
    MissingEntry(BlockId),
    #[error("edge {from:?} -> {to:?} leaves the graph")]
    EdgeOutOfRange { from: BlockId, to: BlockId },
    #[error("block {0:?} is stored at the wrong index")]
    MisplacedBlock(BlockId),
    #[error("suspension point {0:?} is not attached to its Suspend instruction")]
    DetachedSuspension(SuspensionId),
    #[error("Suspend instruction at {0:?} has no matching suspension point")]
    StraySuspend(Position),
    #[error("two suspension points share node {0:?}")]
    DuplicateSuspensionNode(NodeId),
    #[error("variable {0:?} is outside the variable table")]
    VariableOutOfRange(VarId),
    #[error("reachability is stale")]
    StaleReachability,
}

/// Check the structural invariants every consumer of the graph relies on.
pub fn validate(graph: &MethodGraph) -> Result<(), GraphError> {
    let block_count = graph.blocks.len();
    if graph.entry.index() >= block_count {
        return Err(GraphError::MissingEntry(graph.entry));
    }
    if graph.reachable.len() != block_count {
        return Err(GraphError::StaleReachability);
    }

    for (index, block) in graph.blocks.iter().enumerate() {
        if block.id.index() != index {
            return Err(GraphError::MisplacedBlock(block.id));
        }
        for edge in block.successors() {
            if edge.target.index() >= block_count {
                return Err(GraphError::EdgeOutOfRange {
                    from: block.id,
                    to: edge.target,
                });
            }
        }

        for (offset, instr) in block.instrs.iter().enumerate() {
            let position = Position {
                block: block.id,
                offset,
            };
            match instr.kind {
                InstrKind::Def(var) | InstrKind::Use(var) => {
                    if var.index() >= graph.var_count {
                        return Err(GraphError::VariableOutOfRange(var));
                    }
                }
                InstrKind::Suspend(id) => {
                    let attached = graph
                        .suspensions
                        .get(id.index())
                        .is_some_and(|s| s.id == id && s.position == position);
                    if !attached {
                        return Err(GraphError::StraySuspend(position));
                    }
                }
            }
        }
    }

    let mut nodes = HashSet::new();
    for (index, point) in graph.suspensions.iter().enumerate() {
        let attached = point.id.index() == index
            && matches!(
                graph.instr_at(point.position).map(|i| i.kind),
                Some(InstrKind::Suspend(id)) if id == point.id
            );
        if !attached {
            return Err(GraphError::DetachedSuspension(point.id));
        }
        if !nodes.insert(point.node) {
            return Err(GraphError::DuplicateSuspensionNode(point.node));
        }
    }

    Ok(())
}
