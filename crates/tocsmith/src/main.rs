use crate::prelude::*;
use clap::Parser;

mod apply;
mod batch;
mod bookmark;
mod detect;
mod error;
mod prelude;
mod preview;
mod render;
#[cfg(test)]
mod testing;

#[derive(Debug, clap::Parser)]
#[command(
    author,
    version,
    about,
    long_about = "Add bookmark outlines to PDFs from a pasted table of contents or from font sizes"
)]
pub struct App {
    #[command(subcommand)]
    pub command: SubCommands,

    #[clap(flatten)]
    global: Global,
}

#[derive(Debug, Clone, clap::Args)]
pub struct Global {
    /// Whether to display additional information.
    #[clap(long, env = "TOCSMITH_VERBOSE", global = true, default_value = "false")]
    verbose: bool,
}

#[derive(Debug, clap::Parser)]
pub enum SubCommands {
    /// Write a bookmarked copy of a PDF from a table of contents
    Apply(crate::apply::ApplyOptions),

    /// Infer headings from font sizes and write a bookmarked copy
    Detect(crate::detect::DetectOptions),

    /// Run every task in a TOML batch file
    Batch(crate::batch::BatchOptions),

    /// Print the outline a table of contents would produce
    Preview(crate::preview::PreviewOptions),
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    color_eyre::install()?;

    let app = App::parse();

    match app.command {
        SubCommands::Apply(options) => crate::apply::run(options, app.global).await,
        SubCommands::Detect(options) => crate::detect::run(options, app.global).await,
        SubCommands::Batch(options) => crate::batch::run(options, app.global).await,
        SubCommands::Preview(options) => crate::preview::run(options, app.global).await,
    }
    .map_err(|err: color_eyre::eyre::Report| eyre!(err))
}
