// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Analysis driver.
//!
//! Runs the per-method pipeline (build graph → validate → classify regions
//! → liveness → check → partition) and turns the result into diagnostics
//! and a hoisting verdict.

pub mod config;
pub mod input;

pub use config::{CheckConfig, ConfigError};
pub use input::SourceFile;

use hoist_ast::Method;
use hoist_cfg::{build_graph, validate, MethodGraph};
use hoist_check::check;
use hoist_diagnostics::{sort_diagnostics, Diagnostic, Severity, ToDiagnostic};
use hoist_liveness::compute_liveness;
use hoist_partition::{partition, HoistingVerdict};
use hoist_regions::classify;
use rayon::prelude::*;
use tracing::{debug, debug_span, warn};

/// Everything the analyzer produced for one method.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub method: String,
    /// `None` when the body could not be lowered.
    pub graph: Option<MethodGraph>,
    pub diagnostics: Vec<Diagnostic>,
    pub verdict: HoistingVerdict,
}

impl Analysis {
    fn failed(method: &Method, diagnostic: Diagnostic) -> Self {
        Self {
            method: method.name.clone(),
            graph: None,
            diagnostics: vec![diagnostic],
            verdict: HoistingVerdict::all_transient(method),
        }
    }

    pub fn is_failed(&self) -> bool {
        self.graph.is_none()
    }

    pub fn error_count(&self) -> usize {
        self.count(Severity::Error)
    }

    pub fn warning_count(&self) -> usize {
        self.count(Severity::Warning)
    }

    /// Emission must stop for this method.
    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }

    fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }
}

fn lower(method: &Method) -> Result<MethodGraph, Diagnostic> {
    let graph = {
        let _span = debug_span!("build_graph").entered();
        build_graph(method).map_err(|e| e.to_diagnostic())?
    };
    validate(&graph).map_err(|e| {
        e.to_diagnostic()
            .with_primary(method.span, format!("while analyzing `{}`", method.name))
    })?;
    Ok(graph)
}

/// Analyze one method.
pub fn analyze(method: &Method, config: &CheckConfig) -> Analysis {
    let _span = debug_span!("analyze", method = %method.name).entered();

    let graph = match lower(method) {
        Ok(graph) => graph,
        Err(diagnostic) => {
            warn!(method = %method.name, "method body is malformed");
            return Analysis::failed(method, diagnostic);
        }
    };
    debug!(
        blocks = graph.blocks.len(),
        suspensions = graph.suspensions.len(),
        "built graph"
    );

    let regions = {
        let _span = debug_span!("classify").entered();
        classify(method, &graph)
    };
    let liveness = compute_liveness(&graph);
    let errors = check(method, &graph, &regions, &liveness, config.check_options());
    let verdict = {
        let _span = debug_span!("partition").entered();
        partition(method, &graph, &liveness, &errors)
    };

    let mut diagnostics: Vec<Diagnostic> = errors
        .iter()
        .map(|e| e.to_diagnostic())
        .map(|d| if config.deny_warnings { d.promote() } else { d })
        .collect();
    sort_diagnostics(&mut diagnostics);

    let analysis = Analysis {
        method: method.name.clone(),
        graph: Some(graph),
        diagnostics,
        verdict,
    };
    debug!(
        errors = analysis.error_count(),
        warnings = analysis.warning_count(),
        hoisted = analysis.verdict.slots.len(),
        "analyzed method"
    );
    analysis
}

/// Analyze methods in parallel. Results come back in input order.
pub fn analyze_batch(methods: &[Method], config: &CheckConfig) -> Vec<Analysis> {
    let _span = debug_span!("analyze_batch", methods = methods.len()).entered();
    methods.par_iter().map(|m| analyze(m, config)).collect()
}
