// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Bound tree for resumable-method analysis.
//!
//! This crate defines the already type-checked method bodies the analyzer
//! consumes: variables with their storage classes, statements, expressions,
//! and the suspension constructs (`await`, `yield return`, `await foreach`,
//! `await using`) that mark resumable points.

pub mod build;
pub mod expr;
pub mod method;
pub mod span;
pub mod stmt;

pub use build::MethodBuilder;
pub use method::{Method, MethodKind, StorageClass, VarId, Variable};
pub use span::{LineMap, Span};

/// Unique identifier for bound tree nodes within one method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct NodeId(pub u32);

impl NodeId {
    pub const DUMMY: NodeId = NodeId(u32::MAX);
}
