// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! Method body graph - basic blocks over `Def`/`Use`/`Suspend` instructions.
//!
//! The graph is the common input of the region classifier and the live-range
//! analyzer. Suspension points are distinguished positions inside blocks.

mod builder;
mod display;
mod graph;
mod validate;

pub mod lower;

pub use builder::BlockBuilder;
pub use graph::{
    BasicBlock, BlockId, Edge, EdgeKind, HandlerContext, Instr, InstrKind, MethodGraph, Position,
    SuspendKind, SuspensionId, SuspensionPoint, Terminator,
};
pub use lower::{build_graph, LoweringError};
pub use validate::{validate, GraphError};

#[cfg(test)]
mod tests;
