// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! `hoist explain`: describe an error code.

use anyhow::{bail, Result};
use colored::Colorize;
use hoist_diagnostics::codes::ErrorCodeRegistry;

pub fn run(code: &str) -> Result<()> {
    let registry = ErrorCodeRegistry::default();
    let code = code.to_ascii_uppercase();
    let Some(info) = registry.get(&code) else {
        let known: Vec<_> = registry.all().iter().map(|e| e.code).collect();
        bail!("unknown error code `{}` (known codes: {})", code, known.join(", "));
    };

    println!("{}: {}", info.code.bold(), info.title);
    println!("category: {}", info.category);
    println!();
    println!("{}", info.explanation);
    Ok(())
}
