// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Live-range analysis over method graphs.
//!
//! A variable's live range contains a suspension point when the variable
//! may be defined there and may be read again after resumption. Those
//! variables must survive in the generated state.

mod bitset;
mod dataflow;
mod liveness;

pub use bitset::BitSet;
pub use dataflow::solve_forward;
pub use liveness::{compute_liveness, Liveness};
