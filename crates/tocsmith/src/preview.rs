use std::io::Read;

use tocsmith_core::{build_outline, parse_toc_report};

use crate::bookmark::{log_skipped, read_toc, TocArgs};
use crate::prelude::*;
use crate::render::{print_outline, OutputFormat};

#[derive(Debug, Clone, clap::Args)]
pub struct PreviewOptions {
    #[command(flatten)]
    pub toc: TocArgs,

    /// Page count of the target document (default: the highest TOC page)
    #[arg(long, env = "TOCSMITH_PAGES")]
    pub pages: Option<usize>,

    /// Output format: indented, markdown, or json (default: indented)
    #[arg(long, env = "TOCSMITH_OUTPUT", default_value = "indented")]
    pub output: OutputFormat,
}

/// Parse a TOC (from `--toc`, `--toc-file` or stdin) and print the outline
/// it would produce.
pub async fn run(options: PreviewOptions, _global: crate::Global) -> Result<()> {
    let text = match read_toc(&options.toc.source())? {
        Some(text) => text,
        None => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .wrap_err("Failed to read TOC from stdin")?;
            text
        }
    };

    let report = parse_toc_report(&text, &options.toc.options());
    log_skipped(&report);

    let page_count = options.pages.unwrap_or_else(|| highest_page(&report.headings));
    let outline = build_outline(report.headings, page_count);
    print_outline(&outline, page_count, &report.skipped, options.output)
}

fn highest_page(headings: &[tocsmith_core::Heading]) -> usize {
    headings.iter().map(|h| h.page() as usize).max().unwrap_or(0)
}
