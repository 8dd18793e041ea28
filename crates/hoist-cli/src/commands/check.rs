// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! `hoist check`: analyze every method of a file and report diagnostics.

use std::path::Path;

use anyhow::Result;
use hoist_ast::Method;
use hoist_compiler::{analyze_batch, Analysis, CheckConfig};
use hoist_diagnostics::formatter::DiagnosticFormatter;
use hoist_diagnostics::json::{to_json_report, to_json_string};
use hoist_diagnostics::Diagnostic;

use super::load_source_file;
use crate::{output, Format};

/// Returns whether the file passed (no errors).
pub fn run(path: &Path, config: &CheckConfig, format: Format) -> Result<bool> {
    let file = load_source_file(path)?;
    let analyses = analyze_batch(&file.methods, config);
    let file_name = path.display().to_string();

    let errors: usize = analyses.iter().map(Analysis::error_count).sum();
    let warnings: usize = analyses.iter().map(Analysis::warning_count).sum();

    match format {
        Format::Json => {
            let diagnostics: Vec<Diagnostic> = analyses
                .iter()
                .flat_map(|a| a.diagnostics.iter().cloned())
                .collect();
            let report = to_json_report(&diagnostics, &file.source, &file_name, "check");
            println!("{}", to_json_string(&report));
        }
        Format::Text => {
            let formatter = DiagnosticFormatter::new(&file.source).with_file_name(&file_name);
            for analysis in &analyses {
                for diagnostic in &analysis.diagnostics {
                    eprintln!("{}", formatter.format(diagnostic));
                }
            }
            // Results are in input order.
            for (analysis, method) in analyses.iter().zip(&file.methods) {
                print_verdict(analysis, method);
            }
            if errors > 0 {
                eprintln!("{}", output::banner_fail("Check", errors));
            } else {
                eprintln!("{}", output::banner_ok("Check", warnings));
            }
        }
    }

    Ok(errors == 0)
}

fn print_verdict(analysis: &Analysis, method: &Method) {
    let name = output::method_name(&method.name);
    if analysis.is_failed() {
        println!("{}: not analyzed", name);
        return;
    }
    let hoisted: Vec<&str> = analysis
        .verdict
        .hoisted()
        .filter_map(|var| method.variable(var).map(|v| v.name.as_str()))
        .collect();
    if hoisted.is_empty() {
        println!("{}: no {} locals", name, output::hoisted());
    } else {
        println!("{}: {} {}", name, output::hoisted(), hoisted.join(", "));
    }
    if analysis.verdict.degraded {
        println!("  some locals were rejected and left on the stack");
    }
}
