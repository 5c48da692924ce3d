use std::io::IsTerminal;

use colored::Colorize;
use serde::Serialize;
use tocsmith_core::{OutlineEntry, OutlineTree, SkippedLine};

use crate::prelude::{eprintln, println, *};

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Indented text format (2 spaces per level)
    Indented,
    /// Markdown nested list format
    Markdown,
    /// JSON format with structured data
    Json,
}

/// JSON shape of a rendered outline.
#[derive(Debug, Serialize)]
pub struct OutlineOutput<'a> {
    pub page_count: usize,
    pub entry_count: usize,
    pub entries: Vec<OutlineEntry>,
    pub skipped: &'a [SkippedLine],
}

fn walk(entries: &[OutlineEntry], depth: usize, line: &mut impl FnMut(usize, &OutlineEntry)) {
    for entry in entries {
        line(depth, entry);
        walk(&entry.children, depth + 1, line);
    }
}

/// Indentation follows nesting depth, not the heading level, so a level 1
/// entry followed by a level 4 entry is indented one step.
pub fn format_indented(entries: &[OutlineEntry]) -> String {
    let mut out = Vec::new();
    walk(entries, 0, &mut |depth, entry| {
        out.push(f!(
            "{}{} (p. {})",
            "  ".repeat(depth),
            entry.title,
            entry.page_index + 1
        ));
    });
    out.join("\n")
}

pub fn format_markdown(entries: &[OutlineEntry]) -> String {
    let mut out = Vec::new();
    walk(entries, 0, &mut |depth, entry| {
        out.push(f!(
            "{}* {}  [page {}]",
            "  ".repeat(depth),
            entry.title,
            entry.page_index + 1
        ));
    });
    out.join("\n")
}

pub fn format_json(outline: &OutlineTree, page_count: usize, skipped: &[SkippedLine]) -> Result<String> {
    let output = OutlineOutput {
        page_count,
        entry_count: outline.len(),
        entries: outline.nested(),
        skipped,
    };
    serde_json::to_string_pretty(&output).map_err(|e| eyre!("JSON serialization failed: {}", e))
}

/// Print an outline to stdout. On a terminal a short header and the
/// skipped lines go to stderr so piped output stays clean.
pub fn print_outline(
    outline: &OutlineTree,
    page_count: usize,
    skipped: &[SkippedLine],
    format: OutputFormat,
) -> Result<()> {
    if format == OutputFormat::Json {
        println!("{}", format_json(outline, page_count, skipped)?);
        return Ok(());
    }

    let entries = outline.nested();
    let content = match format {
        OutputFormat::Markdown => format_markdown(&entries),
        _ => format_indented(&entries),
    };

    if std::io::stdout().is_terminal() {
        eprintln!(
            "{}: {}  {}: {}",
            "Entries".green(),
            outline.len().to_string().bright_yellow().bold(),
            "Pages".green(),
            page_count.to_string().bright_yellow()
        );
        for line in content.lines() {
            println!("{}", line.white());
        }
        for skip in skipped {
            eprintln!(
                "{} line {}: {:?} ({})",
                "skipped".yellow(),
                skip.line,
                skip.text,
                skip.reason
            );
        }
    } else if !content.is_empty() {
        println!("{}", content);
    }

    Ok(())
}
