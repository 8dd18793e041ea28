// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Suspension-point constraint checking.
//!
//! Joins the region tree and the live ranges of one method:
//! - ref-like locals must not be live across a suspension point
//! - unsafe contexts must not contain suspension points at all
//! - lock statements containing suspension points are suspicious
//! - suspensions must suit the method kind and their handler context

mod error;

pub use error::{CheckError, CheckErrorKind, Severity, SuspensionSite};

use hoist_ast::Method;
use hoist_cfg::{HandlerContext, MethodGraph, SuspendKind, SuspensionPoint};
use hoist_liveness::Liveness;
use hoist_regions::{Constraint, RegionTree};
use tracing::{debug, debug_span};

/// Which optional checks run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckOptions {
    pub mutex_scope_warnings: bool,
    pub report_unreachable_suspensions: bool,
}

impl Default for CheckOptions {
    fn default() -> Self {
        Self {
            mutex_scope_warnings: true,
            report_unreachable_suspensions: true,
        }
    }
}

/// Suspension-point checker for one method.
pub struct SuspensionChecker<'a> {
    method: &'a Method,
    graph: &'a MethodGraph,
    regions: &'a RegionTree,
    liveness: &'a Liveness,
    options: CheckOptions,
    errors: Vec<CheckError>,
}

/// Check one method. Errors come back ordered by primary span, then code,
/// then message.
pub fn check(
    method: &Method,
    graph: &MethodGraph,
    regions: &RegionTree,
    liveness: &Liveness,
    options: CheckOptions,
) -> Vec<CheckError> {
    SuspensionChecker::new(method, graph, regions, liveness, options).run()
}

fn site(point: &SuspensionPoint) -> SuspensionSite {
    SuspensionSite {
        id: point.id,
        kind: point.kind,
        span: point.span,
    }
}

impl<'a> SuspensionChecker<'a> {
    pub fn new(
        method: &'a Method,
        graph: &'a MethodGraph,
        regions: &'a RegionTree,
        liveness: &'a Liveness,
        options: CheckOptions,
    ) -> Self {
        Self {
            method,
            graph,
            regions,
            liveness,
            options,
            errors: Vec::new(),
        }
    }

    pub fn run(mut self) -> Vec<CheckError> {
        let _span = debug_span!("check", method = %self.method.name).entered();

        self.check_ref_locals();
        self.check_regions();
        let graph = self.graph;
        for point in &graph.suspensions {
            self.check_suspension(point);
        }

        self.errors.sort_by(|a, b| {
            (a.span.start, a.span.end, a.kind.rank())
                .cmp(&(b.span.start, b.span.end, b.kind.rank()))
                .then_with(|| a.kind.to_string().cmp(&b.kind.to_string()))
        });
        debug!(
            errors = self.errors.iter().filter(|e| e.is_error()).count(),
            warnings = self.errors.iter().filter(|e| !e.is_error()).count(),
            "checked suspension points"
        );
        self.errors
    }

    /// Liveness only: a ref-like local is rejected when its live range
    /// contains a suspension point.
    fn check_ref_locals(&mut self) {
        for var in &self.method.variables {
            if !var.storage.is_restricted() {
                continue;
            }
            let crossed: Vec<_> = self
                .liveness
                .crossed(var.id)
                .iter()
                .map(|id| site(self.graph.suspension(*id)))
                .collect();
            if crossed.is_empty() {
                continue;
            }
            self.errors.push(CheckError {
                kind: CheckErrorKind::CrossSuspensionRef {
                    var: var.id,
                    name: var.name.clone(),
                    storage: var.storage,
                    crossed,
                },
                span: var.span,
            });
        }
    }

    /// Lexical only: one error per region by its own tags, whatever the
    /// liveness or reachability of the suspensions inside.
    fn check_regions(&mut self) {
        for region in self.regions.regions() {
            let sites: Vec<_> = self
                .regions
                .suspensions_in(region.id)
                .into_iter()
                .map(|id| site(self.graph.suspension(id)))
                .collect();
            if sites.is_empty() {
                continue;
            }
            if region.tags.contains(Constraint::Unsafe) {
                self.errors.push(CheckError {
                    kind: CheckErrorKind::SuspensionInUnsafe {
                        region: region.id,
                        region_kind: region.kind,
                        sites: sites.clone(),
                    },
                    span: region.span,
                });
            }
            if region.tags.contains(Constraint::MutexScope) && self.options.mutex_scope_warnings {
                self.errors.push(CheckError {
                    kind: CheckErrorKind::SuspensionInLock {
                        region: region.id,
                        sites,
                    },
                    span: region.span,
                });
            }
        }
    }

    fn check_suspension(&mut self, point: &SuspensionPoint) {
        let allowed = match point.kind {
            SuspendKind::Await => self.method.kind.allows_await(),
            SuspendKind::Yield => self.method.kind.allows_yield(),
        };
        if !allowed {
            self.errors.push(CheckError {
                kind: CheckErrorKind::SuspensionNotAllowed {
                    kind: point.kind,
                    method_kind: self.method.kind,
                },
                span: point.span,
            });
        } else if point.kind == SuspendKind::Yield && point.handler != HandlerContext::None {
            self.errors.push(CheckError {
                kind: CheckErrorKind::YieldInHandler {
                    context: point.handler,
                },
                span: point.span,
            });
        }

        if self.options.report_unreachable_suspensions
            && !self.graph.is_reachable(point.position.block)
        {
            self.errors.push(CheckError {
                kind: CheckErrorKind::UnreachableSuspension { kind: point.kind },
                span: point.span,
            });
        }
    }
}

#[cfg(test)]
mod tests;
