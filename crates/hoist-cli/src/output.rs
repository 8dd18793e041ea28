// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! CLI output styling.
//!
//! Respects NO_COLOR and FORCE_COLOR. Colors are disabled when output is
//! piped.

use colored::{ColoredString, Colorize};

/// Initialize color support. Call once at startup.
pub fn init() {
    if std::env::var_os("NO_COLOR").is_some() {
        colored::control::set_override(false);
    } else if std::env::var_os("FORCE_COLOR").is_some() {
        colored::control::set_override(true);
    }
}

pub fn error_label() -> ColoredString {
    "error".red().bold()
}

pub fn method_name(name: &str) -> ColoredString {
    name.bold()
}

pub fn banner_ok(phase: &str, warnings: usize) -> String {
    let msg = match warnings {
        0 => format!("{} OK", phase),
        1 => format!("{} OK: 1 warning", phase),
        n => format!("{} OK: {} warnings", phase, n),
    };
    format!("{} {} {}", "===".dimmed(), msg.green().bold(), "===".dimmed())
}

pub fn banner_fail(phase: &str, count: usize) -> String {
    let msg = if count == 1 {
        format!("{} FAILED: 1 error", phase)
    } else {
        format!("{} FAILED: {} errors", phase, count)
    };
    format!("{} {} {}", "===".dimmed(), msg.red().bold(), "===".dimmed())
}

pub fn hoisted() -> ColoredString {
    "hoisted".cyan()
}
