use std::path::PathBuf;

use tocsmith_core::{parse_toc_report, TocReport};

use crate::bookmark::{deliver, log_skipped, read_pdf, read_toc, OutputArgs, TocArgs};
use crate::prelude::{eprintln, *};

#[derive(Debug, Clone, clap::Args)]
pub struct ApplyOptions {
    /// Source PDF
    #[clap(env = "TOCSMITH_PDF")]
    pub pdf: PathBuf,

    #[command(flatten)]
    pub toc: TocArgs,

    #[command(flatten)]
    pub output: OutputArgs,
}

pub async fn run(options: ApplyOptions, global: crate::Global) -> Result<()> {
    let bytes = read_pdf(&options.pdf)?;

    let report = match read_toc(&options.toc.source())? {
        Some(text) => {
            let report = parse_toc_report(&text, &options.toc.options());
            log_skipped(&report);
            if report.headings.is_empty() {
                eprintln!("No headings; output will be a copy without outline.");
            }
            report
        }
        None => {
            eprintln!("No TOC source provided. Producing a copy without outline.");
            TocReport::default()
        }
    };

    deliver(&options.pdf, bytes, report, &options.output, global.verbose).await
}
