// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! `hoist graph`: print the control-flow graph of every method, followed by
//! the region constraints in effect at each suspension point.

use std::path::Path;

use anyhow::Result;
use hoist_cfg::build_graph;
use hoist_diagnostics::formatter::DiagnosticFormatter;
use hoist_diagnostics::ToDiagnostic;
use hoist_regions::classify;

use super::load_source_file;

/// Returns false if some method could not be lowered.
pub fn run(path: &Path) -> Result<bool> {
    let file = load_source_file(path)?;
    let file_name = path.display().to_string();
    let formatter = DiagnosticFormatter::new(&file.source).with_file_name(&file_name);

    let mut ok = true;
    for method in &file.methods {
        match build_graph(method) {
            Ok(graph) => {
                println!("{}", graph);
                let regions = classify(method, &graph);
                for point in &graph.suspensions {
                    let tags = regions.suspension_constraints(point.id);
                    if !tags.is_empty() {
                        let tags: Vec<String> = tags.iter().map(|t| t.to_string()).collect();
                        println!("// {} under {}", point.id, tags.join(", "));
                    }
                }
                println!();
            }
            Err(err) => {
                eprintln!("{}", formatter.format(&err.to_diagnostic()));
                ok = false;
            }
        }
    }
    Ok(ok)
}
