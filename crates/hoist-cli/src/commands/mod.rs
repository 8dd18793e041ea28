// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! CLI command implementations.

pub mod check;
pub mod explain;
pub mod graph;

use std::path::Path;

use anyhow::{Context, Result};
use hoist_compiler::SourceFile;

/// Read and parse a JSON input file.
pub fn load_source_file(path: &Path) -> Result<SourceFile> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let file = SourceFile::from_json_str(&json)
        .with_context(|| format!("parsing {}", path.display()))?;
    tracing::debug!(path = %path.display(), methods = file.methods.len(), "loaded input");
    Ok(file)
}
