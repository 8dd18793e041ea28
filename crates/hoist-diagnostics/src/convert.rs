// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Conversions from phase-specific errors to unified diagnostics.

use hoist_cfg::{GraphError, LoweringError, SuspendKind};
use hoist_check::{CheckError, CheckErrorKind, Severity as CheckSeverity};

use crate::{Diagnostic, ToDiagnostic};

const MALFORMED: &str = "malformed method body";

impl ToDiagnostic for CheckError {
    fn to_diagnostic(&self) -> Diagnostic {
        let message = self.kind.to_string();
        let diag = match self.kind.severity() {
            CheckSeverity::Error => Diagnostic::error(message),
            CheckSeverity::Warning => Diagnostic::warning(message),
        };

        match &self.kind {
            CheckErrorKind::CrossSuspensionRef { name, crossed, .. } => {
                let mut diag = diag
                    .with_code("H0001")
                    .with_primary(self.span, format!("`{}` declared here", name));
                for site in crossed {
                    diag = diag.with_secondary(
                        site.span,
                        format!("`{}` is still live across this {}", name, site.kind),
                    );
                }
                diag.with_note("resumable state cannot hold references or stack-only values")
                    .with_help(format!(
                        "finish using `{}` before suspending, or create it again after resuming",
                        name
                    ))
            }

            CheckErrorKind::SuspensionInUnsafe {
                region_kind, sites, ..
            } => {
                let mut diag = diag.with_code("H0002").with_primary(
                    self.span,
                    format!("{} starts here", region_kind.describe()),
                );
                for site in sites {
                    diag = diag.with_secondary(site.span, format!("{} here", site.kind));
                }
                diag.with_help("move the suspension point out of the unsafe context")
            }

            CheckErrorKind::SuspensionInLock { sites, .. } => {
                let mut diag = diag
                    .with_code("H0003")
                    .with_primary(self.span, "lock held here");
                for site in sites {
                    diag = diag.with_secondary(site.span, format!("{} while the lock is held", site.kind));
                }
                if sites.iter().any(|s| s.kind == SuspendKind::Await) {
                    diag = diag.with_note(
                        "the method may resume on another thread, and the lock stays held until then",
                    );
                }
                diag.with_help("release the lock before suspending")
            }

            CheckErrorKind::SuspensionNotAllowed { kind, .. } => {
                let help = match kind {
                    SuspendKind::Await => "mark the method `async`",
                    SuspendKind::Yield => "return an iterator type from the method",
                };
                diag.with_code("H0004")
                    .with_primary(self.span, format!("`{}` used here", kind))
                    .with_help(help)
            }

            CheckErrorKind::YieldInHandler { context } => diag
                .with_code("H0005")
                .with_primary(self.span, format!("yield inside a {}", context))
                .with_note("an iterator cannot resume in the middle of exception handling"),

            CheckErrorKind::UnreachableSuspension { kind } => diag
                .with_code("H0006")
                .with_primary(self.span, format!("this {} is never reached", kind))
                .with_note("no path from the method entry reaches this point"),
        }
    }
}

impl ToDiagnostic for LoweringError {
    fn to_diagnostic(&self) -> Diagnostic {
        Diagnostic::error(MALFORMED)
            .with_code("H0007")
            .with_primary(self.span(), self.to_string())
    }
}

/// Graph errors carry no source position; callers attach the method span.
impl ToDiagnostic for GraphError {
    fn to_diagnostic(&self) -> Diagnostic {
        Diagnostic::error(MALFORMED)
            .with_code("H0007")
            .with_note(self.to_string())
    }
}
