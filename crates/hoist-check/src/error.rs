// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Suspension-point check errors.

use hoist_ast::{MethodKind, Span, StorageClass, VarId};
use hoist_cfg::{HandlerContext, SuspendKind, SuspensionId};
use hoist_regions::{RegionId, RegionKind};
use thiserror::Error;

/// A check error (or warning) found in one method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckError {
    pub kind: CheckErrorKind,
    /// Primary position.
    pub span: Span,
}

/// A suspension point referenced by a check error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuspensionSite {
    pub id: SuspensionId,
    pub kind: SuspendKind,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
}

/// The kind of check error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckErrorKind {
    /// A ref-like local is live across a suspension point.
    #[error("{storage} `{name}` cannot be preserved across a suspension point")]
    CrossSuspensionRef {
        var: VarId,
        name: String,
        storage: StorageClass,
        crossed: Vec<SuspensionSite>,
    },

    /// Suspension somewhere inside an unsafe context.
    #[error("cannot suspend inside an {}", .region_kind.describe())]
    SuspensionInUnsafe {
        region: RegionId,
        region_kind: RegionKind,
        sites: Vec<SuspensionSite>,
    },

    /// Suspension while a lock is held.
    #[error("suspension point inside a lock statement")]
    SuspensionInLock {
        region: RegionId,
        sites: Vec<SuspensionSite>,
    },

    /// The method kind does not support this kind of suspension.
    #[error("`{kind}` is not allowed in an {method_kind}")]
    SuspensionNotAllowed {
        kind: SuspendKind,
        method_kind: MethodKind,
    },

    /// The iterator could not resume at this yield.
    #[error("cannot yield a value in the body of a {context}")]
    YieldInHandler { context: HandlerContext },

    /// No path from the method entry reaches this suspension.
    #[error("unreachable {kind} point")]
    UnreachableSuspension { kind: SuspendKind },
}

impl CheckErrorKind {
    pub fn severity(&self) -> Severity {
        match self {
            CheckErrorKind::SuspensionInLock { .. } => Severity::Warning,
            _ => Severity::Error,
        }
    }

    /// Position in the error code table, used as the tie breaker when
    /// ordering errors at the same span.
    pub fn rank(&self) -> u8 {
        match self {
            CheckErrorKind::CrossSuspensionRef { .. } => 1,
            CheckErrorKind::SuspensionInUnsafe { .. } => 2,
            CheckErrorKind::SuspensionInLock { .. } => 3,
            CheckErrorKind::SuspensionNotAllowed { .. } => 4,
            CheckErrorKind::YieldInHandler { .. } => 5,
            CheckErrorKind::UnreachableSuspension { .. } => 6,
        }
    }

    /// Suspension points the error points at besides its primary span.
    pub fn sites(&self) -> &[SuspensionSite] {
        match self {
            CheckErrorKind::CrossSuspensionRef { crossed, .. } => crossed,
            CheckErrorKind::SuspensionInUnsafe { sites, .. }
            | CheckErrorKind::SuspensionInLock { sites, .. } => sites,
            _ => &[],
        }
    }
}

impl CheckError {
    pub fn is_error(&self) -> bool {
        self.kind.severity() == Severity::Error
    }
}

impl std::fmt::Display for CheckError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.kind)
    }
}

impl std::error::Error for CheckError {}
