//! Steps shared by every subcommand that reads a PDF and writes a
//! bookmarked copy.

use std::path::{Path, PathBuf};

use colored::Colorize;
use serde::Serialize;
use tocsmith_core::batch::DEFAULT_OUTPUT_SUFFIX;
use tocsmith_core::{build_outline, Heading, TocOptions, TocReport, TocSource};
use tocsmith_pdf::BookmarkWriter;

use crate::prelude::{eprintln, println, *};
use crate::render::{print_outline, OutputFormat};

/// Where a table of contents comes from on the command line.
#[derive(Debug, Clone, clap::Args)]
pub struct TocArgs {
    /// Read the table of contents from this file
    #[arg(long, env = "TOCSMITH_TOC_FILE", conflicts_with = "toc")]
    pub toc_file: Option<PathBuf>,

    /// Table of contents text, one heading per line
    #[arg(long)]
    pub toc: Option<String>,

    /// Added to every book page number to get the PDF page
    #[arg(long, env = "TOCSMITH_PAGE_OFFSET", default_value = "0", allow_hyphen_values = true)]
    pub page_offset: i64,

    /// Skip TOC lines shorter than this many characters
    #[arg(long, env = "TOCSMITH_MIN_LEN", default_value = "1")]
    pub min_len: usize,
}

impl TocArgs {
    pub fn source(&self) -> TocSource {
        match (&self.toc, &self.toc_file) {
            (Some(text), _) => TocSource::Inline(text.clone()),
            (None, Some(path)) => TocSource::File(path.clone()),
            (None, None) => TocSource::None,
        }
    }

    pub fn options(&self) -> TocOptions {
        TocOptions {
            page_offset: self.page_offset,
            min_len: self.min_len,
        }
    }
}

/// What to do with the resulting outline.
#[derive(Debug, Clone, clap::Args)]
pub struct OutputArgs {
    /// Output path (default: <dir>/<stem>.bookmarked.pdf next to the input)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Print the outline instead of writing a PDF
    #[arg(long)]
    pub dry_run: bool,

    /// Format used by --dry-run
    #[arg(long, env = "TOCSMITH_FORMAT", default_value = "indented")]
    pub format: OutputFormat,
}

#[derive(Debug, Clone, Serialize)]
pub struct Outcome {
    pub output: PathBuf,
    pub page_count: usize,
    pub entries: usize,
}

/// `<dir>/<stem>.bookmarked.pdf` next to `input`.
pub fn default_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");
    input.with_file_name(f!("{stem}{DEFAULT_OUTPUT_SUFFIX}"))
}

pub fn read_pdf(path: &Path) -> Result<Vec<u8>> {
    if !path.is_file() {
        return Err(Error::FileNotFound(path.to_path_buf()).into());
    }
    std::fs::read(path).wrap_err_with(|| f!("Failed to read {}", path.display()))
}

/// Load the TOC text for `source`, or `None` when there is no source.
pub fn read_toc(source: &TocSource) -> Result<Option<String>> {
    match source {
        TocSource::Inline(text) => Ok(Some(text.clone())),
        TocSource::File(path) => {
            if !path.is_file() {
                return Err(Error::FileNotFound(path.clone()).into());
            }
            std::fs::read_to_string(path)
                .map(Some)
                .wrap_err_with(|| f!("Failed to read TOC file {}", path.display()))
        }
        TocSource::None => Ok(None),
    }
}

pub fn log_skipped(report: &TocReport) {
    for skip in &report.skipped {
        log::debug!("skipped TOC line {} ({}): {:?}", skip.line, skip.reason, skip.text);
    }
    log::debug!(
        "parsed {} headings, skipped {} lines",
        report.headings.len(),
        report.skipped.len()
    );
}

/// Build the outline for `headings` and write a bookmarked copy of the PDF
/// held in `bytes` to `output`, creating parent directories as needed.
pub fn write_bookmarked(bytes: &[u8], headings: Vec<Heading>, output: &Path) -> Result<Outcome> {
    let mut writer = BookmarkWriter::from_bytes(bytes)?;
    let page_count = writer.page_count();
    let outline = build_outline(headings, page_count);
    writer.add_outline(&outline)?;
    let mut written = Vec::new();
    writer.write_to(&mut written)?;

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .wrap_err_with(|| f!("Failed to create {}", parent.display()))?;
    }
    std::fs::write(output, written).wrap_err_with(|| f!("Failed to write {}", output.display()))?;

    Ok(Outcome {
        output: output.to_path_buf(),
        page_count,
        entries: outline.len(),
    })
}

/// Either print the outline (`--dry-run`) or write the bookmarked PDF.
pub async fn deliver(
    input: &Path,
    bytes: Vec<u8>,
    report: TocReport,
    args: &OutputArgs,
    verbose: bool,
) -> Result<()> {
    if args.dry_run {
        let meta = tokio::task::spawn_blocking(move || tocsmith_pdf::info(&bytes)).await??;
        let outline = build_outline(report.headings, meta.page_count);
        return print_outline(&outline, meta.page_count, &report.skipped, args.format);
    }

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(input));
    let outcome = tokio::task::spawn_blocking(move || write_bookmarked(&bytes, report.headings, &output))
        .await??;

    if verbose {
        eprintln!(
            "{} outline entries over {} pages",
            outcome.entries.to_string().bright_yellow(),
            outcome.page_count
        );
    }
    println!("{} {}", "Wrote:".green(), outcome.output.display());
    Ok(())
}
