use std::path::PathBuf;

use tocsmith_core::{ClassifierConfig, TocReport};

use crate::bookmark::{deliver, read_pdf, OutputArgs};
use crate::prelude::{eprintln, *};

#[derive(Debug, Clone, clap::Args)]
pub struct DetectOptions {
    /// Source PDF
    #[clap(env = "TOCSMITH_PDF")]
    pub pdf: PathBuf,

    /// Ignore text boxes shorter than this many characters
    #[arg(long, env = "TOCSMITH_DETECT_MIN_LEN", default_value = "3")]
    pub min_len: usize,

    #[command(flatten)]
    pub output: OutputArgs,
}

/// Infer headings from font sizes and write (or print) the outline.
pub async fn run(options: DetectOptions, global: crate::Global) -> Result<()> {
    let bytes = read_pdf(&options.pdf)?;
    let config = ClassifierConfig::default().with_min_len(options.min_len);

    let headings = tokio::task::spawn_blocking({
        let bytes = bytes.clone();
        move || tocsmith_pdf::detect_headings(&bytes, &config)
    })
    .await??;

    log::debug!("detected {} headings in {}", headings.len(), options.pdf.display());
    if headings.is_empty() {
        eprintln!("No headings detected; output will be a copy without outline.");
    }

    let report = TocReport {
        headings,
        skipped: Vec::new(),
    };
    deliver(&options.pdf, bytes, report, &options.output, global.verbose).await
}
