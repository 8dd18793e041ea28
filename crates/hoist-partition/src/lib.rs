// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! Hoisting partition - which locals move into the generated state.
//!
//! A local whose live range contains a suspension point has to survive the
//! suspension, so the state-machine rewrite stores it in a state slot and
//! saves/restores it around every suspension it spans. Everything else stays
//! an ordinary stack local.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use hoist_ast::{Method, VarId};
use hoist_cfg::{MethodGraph, SuspensionId};
use hoist_check::{CheckError, CheckErrorKind};
use hoist_liveness::Liveness;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Storage {
    /// Persisted in the generated state across suspensions.
    Hoisted,
    /// Ordinary stack local.
    Transient,
}

impl fmt::Display for Storage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Storage::Hoisted => write!(f, "hoisted"),
            Storage::Transient => write!(f, "transient"),
        }
    }
}

/// A field of the generated state holding one hoisted local.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateSlot {
    pub index: u32,
    pub var: VarId,
    pub name: String,
    /// Suspension points the local is saved and restored around.
    pub spans: Vec<SuspensionId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HoistingVerdict {
    /// Total over the method's variables.
    pub storage: BTreeMap<VarId, Storage>,
    /// Hoisted locals live across each suspension point.
    pub resume_sets: BTreeMap<SuspensionId, Vec<VarId>>,
    /// One slot per hoisted local, in declaration order.
    pub slots: Vec<StateSlot>,
    /// Some crossing local was rejected and left transient.
    pub degraded: bool,
}

impl HoistingVerdict {
    /// Fallback for a method that could not be analyzed. Keyed by table
    /// position, since a rejected table may misnumber its entries.
    pub fn all_transient(method: &Method) -> Self {
        Self {
            storage: (0..method.variables.len())
                .map(|i| (VarId(i as u32), Storage::Transient))
                .collect(),
            resume_sets: BTreeMap::new(),
            slots: Vec::new(),
            degraded: true,
        }
    }

    pub fn storage_of(&self, var: VarId) -> Option<Storage> {
        self.storage.get(&var).copied()
    }

    pub fn is_hoisted(&self, var: VarId) -> bool {
        self.storage_of(var) == Some(Storage::Hoisted)
    }

    pub fn hoisted(&self) -> impl Iterator<Item = VarId> + '_ {
        self.storage
            .iter()
            .filter(|(_, s)| **s == Storage::Hoisted)
            .map(|(v, _)| *v)
    }
}

/// Assign every variable of `method` to hoisted or transient storage.
pub fn partition(
    method: &Method,
    graph: &MethodGraph,
    liveness: &Liveness,
    errors: &[CheckError],
) -> HoistingVerdict {
    let rejected: BTreeSet<VarId> = errors
        .iter()
        .filter_map(|e| match &e.kind {
            CheckErrorKind::CrossSuspensionRef { var, .. } => Some(*var),
            _ => None,
        })
        .collect();

    let mut verdict = HoistingVerdict {
        degraded: !rejected.is_empty(),
        ..HoistingVerdict::default()
    };

    for var in &method.variables {
        let storage = if liveness.is_crossing(var.id) && !rejected.contains(&var.id) {
            Storage::Hoisted
        } else {
            Storage::Transient
        };
        verdict.storage.insert(var.id, storage);
        if storage == Storage::Hoisted {
            verdict.slots.push(StateSlot {
                index: verdict.slots.len() as u32,
                var: var.id,
                name: var.name.clone(),
                spans: liveness.crossed(var.id).iter().copied().collect(),
            });
        }
    }

    for point in &graph.suspensions {
        let live: Vec<VarId> = liveness
            .across(point.id)
            .into_iter()
            .filter(|v| verdict.is_hoisted(*v))
            .collect();
        verdict.resume_sets.insert(point.id, live);
    }

    debug!(
        method = %method.name,
        hoisted = verdict.slots.len(),
        degraded = verdict.degraded,
        "partitioned locals"
    );
    verdict
}
