// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Terminal formatter for diagnostics.
//!
//! ```text
//! error[H0001]: ref local `x` cannot be preserved across a suspension point
//!   --> Program.cs:3:13
//!    |
//!  3 |     ref int x = ref y;
//!    |             ^ `x` declared here
//!  4 |     await F();
//!    |     --------- `x` is still live across this await
//!    |
//!    = note: resumable state cannot hold references or stack-only values
//! ```

use std::collections::BTreeMap;

use colored::Colorize;
use hoist_ast::LineMap;

use crate::{Diagnostic, LabelStyle, Severity};

pub struct DiagnosticFormatter<'a> {
    source: &'a str,
    file_name: Option<&'a str>,
    line_map: LineMap,
}

struct AnnotatedLine {
    line_num: usize,
    text: String,
    annotations: Vec<Annotation>,
}

struct Annotation {
    col_start: usize,
    col_end: usize,
    style: LabelStyle,
    message: Option<String>,
}

impl<'a> DiagnosticFormatter<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            file_name: None,
            line_map: LineMap::new(source),
        }
    }

    pub fn with_file_name(mut self, name: &'a str) -> Self {
        self.file_name = Some(name);
        self
    }

    pub fn format(&self, diagnostic: &Diagnostic) -> String {
        let mut out = String::new();
        self.format_header(&mut out, diagnostic);

        let annotated = self.collect_annotated_lines(diagnostic);
        if annotated.is_empty() {
            self.format_footer(&mut out, diagnostic);
            return out;
        }

        let start = diagnostic
            .primary_span()
            .or_else(|| diagnostic.labels.first().map(|l| l.span))
            .map(|s| s.start)
            .unwrap_or_default();
        let (line, col) = self.line_map.line_col(start);
        out.push_str(&format!(
            "  {} {}:{}:{}\n",
            "-->".blue(),
            self.file_name.unwrap_or("<source>"),
            line,
            col
        ));

        let max_line = annotated.last().map(|a| a.line_num).unwrap_or(1);
        let gutter = max_line.to_string().len().max(2);

        out.push_str(&format!("{} {}\n", " ".repeat(gutter + 1), "|".blue()));
        let mut prev: Option<usize> = None;
        for line in &annotated {
            if prev.is_some_and(|p| line.line_num > p + 1) {
                out.push_str(&format!("{} {}\n", " ".repeat(gutter), "...".blue()));
            }
            out.push_str(&format!(
                "{:>width$} {} {}\n",
                line.line_num.to_string().blue().bold(),
                "|".blue(),
                line.text,
                width = gutter + 1,
            ));
            self.format_annotations(&mut out, line, gutter);
            prev = Some(line.line_num);
        }

        if !diagnostic.notes.is_empty() || diagnostic.help.is_some() {
            out.push_str(&format!("{} {}\n", " ".repeat(gutter + 1), "|".blue()));
        }
        self.format_footer(&mut out, diagnostic);
        out
    }

    /// Format several diagnostics separated by blank lines.
    pub fn format_all(&self, diagnostics: &[Diagnostic]) -> String {
        diagnostics
            .iter()
            .map(|d| self.format(d))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn format_header(&self, out: &mut String, diagnostic: &Diagnostic) {
        let severity = match diagnostic.severity {
            Severity::Error => "error".red().bold(),
            Severity::Warning => "warning".yellow().bold(),
            Severity::Note => "note".blue().bold(),
        };
        match &diagnostic.code {
            Some(code) => out.push_str(&format!(
                "{}[{}]: {}\n",
                severity,
                code.0.as_str().bold(),
                diagnostic.message.bold()
            )),
            None => out.push_str(&format!("{}: {}\n", severity, diagnostic.message.bold())),
        }
    }

    fn format_footer(&self, out: &mut String, diagnostic: &Diagnostic) {
        let indent = " ".repeat(3);
        for note in &diagnostic.notes {
            out.push_str(&format!("{}{} {}: {}\n", indent, "=".cyan(), "note".cyan().bold(), note));
        }
        if let Some(help) = &diagnostic.help {
            out.push_str(&format!("{}{} {}: {}\n", indent, "=".cyan(), "help".cyan().bold(), help));
        }
    }

    fn collect_annotated_lines(&self, diagnostic: &Diagnostic) -> Vec<AnnotatedLine> {
        let mut lines: BTreeMap<usize, AnnotatedLine> = BTreeMap::new();

        for label in &diagnostic.labels {
            let (line_num, col_start) = self.line_map.line_col(label.span.start);
            let (end_line, col_end) = self.line_map.line_col(label.span.end);
            let text = self.line_map.line(self.source, line_num).unwrap_or("");

            // Multi-line spans underline the rest of their first line.
            let col_end = if end_line == line_num {
                col_end
            } else {
                text.len() + 1
            };

            let entry = lines.entry(line_num).or_insert_with(|| AnnotatedLine {
                line_num,
                text: text.to_string(),
                annotations: Vec::new(),
            });
            entry.annotations.push(Annotation {
                col_start,
                col_end: col_end.max(col_start + 1),
                style: label.style,
                message: label.message.clone(),
            });
        }

        lines.into_values().collect()
    }

    fn format_annotations(&self, out: &mut String, line: &AnnotatedLine, gutter: usize) {
        let mut sorted: Vec<&Annotation> = line.annotations.iter().collect();
        sorted.sort_by_key(|a| (a.style != LabelStyle::Primary, a.col_start));

        let width = line.text.len() + 10;
        let mut underline = vec![' '; width];
        let mut messages: Vec<(usize, LabelStyle, &str)> = Vec::new();

        for ann in sorted {
            let ch = match ann.style {
                LabelStyle::Primary => '^',
                LabelStyle::Secondary => '-',
            };
            let start = ann.col_start - 1;
            let end = (ann.col_end - 1).min(width);
            for slot in underline.iter_mut().take(end).skip(start) {
                if *slot == ' ' {
                    *slot = ch;
                }
            }
            if let Some(msg) = ann.message.as_deref().filter(|m| !m.is_empty()) {
                messages.push((start + 1, ann.style, msg));
            }
        }

        let underline: String = underline.into_iter().collect::<String>().trim_end().to_string();
        if underline.is_empty() {
            return;
        }
        let pipe = format!("{} {}", " ".repeat(gutter + 1), "|".blue());
        let underline = color_underline(&underline);

        match messages.as_slice() {
            [] => out.push_str(&format!("{} {}\n", pipe, underline)),
            [(_, style, msg)] => out.push_str(&format!(
                "{} {} {}\n",
                pipe,
                underline,
                style_message(*style, msg)
            )),
            _ => {
                out.push_str(&format!("{} {}\n", pipe, underline));
                for (col, style, msg) in messages.iter().rev() {
                    out.push_str(&format!(
                        "{} {}{} {}\n",
                        pipe,
                        " ".repeat(col.saturating_sub(1)),
                        style_message(*style, "|"),
                        style_message(*style, msg),
                    ));
                }
            }
        }
    }
}

fn style_message(style: LabelStyle, msg: &str) -> String {
    match style {
        LabelStyle::Primary => msg.red().bold().to_string(),
        LabelStyle::Secondary => msg.blue().to_string(),
    }
}

/// Color runs of `^` red and runs of `-` blue.
fn color_underline(s: &str) -> String {
    let mut result = String::new();
    let mut run = String::new();
    let mut current = None;

    for ch in s.chars() {
        let kind = matches!(ch, '^' | '-').then_some(ch);
        if kind != current && !run.is_empty() {
            result.push_str(&flush_run(&run, current));
            run.clear();
        }
        run.push(ch);
        current = kind;
    }
    if !run.is_empty() {
        result.push_str(&flush_run(&run, current));
    }
    result
}

fn flush_run(run: &str, kind: Option<char>) -> String {
    match kind {
        Some('^') => run.red().bold().to_string(),
        Some('-') => run.blue().to_string(),
        _ => run.to_string(),
    }
}
