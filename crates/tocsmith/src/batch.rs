use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use tocsmith_core::{parse_toc_report, BatchConfig, ResolvedTask, TocReport, TocSource};

use crate::bookmark::{log_skipped, read_pdf, read_toc, write_bookmarked, Outcome};
use crate::prelude::{eprintln, println, *};

#[derive(Debug, Clone, clap::Args)]
pub struct BatchOptions {
    /// Path to the TOML batch configuration
    #[clap(env = "TOCSMITH_CONFIG")]
    pub config: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Status {
    Written(usize),
    Skipped,
    Failed,
}

/// Print a line without tearing the spinner.
fn say(spinner: Option<&ProgressBar>, line: String) {
    match spinner {
        Some(s) => s.suspend(|| println!("{line}")),
        None => println!("{line}"),
    }
}

fn warn(spinner: Option<&ProgressBar>, line: String) {
    match spinner {
        Some(s) => s.suspend(|| eprintln!("{line}")),
        None => eprintln!("{line}"),
    }
}

fn set_spinner_msg(spinner: Option<&ProgressBar>, msg: impl Into<String>) {
    if let Some(s) = spinner {
        s.set_message(msg.into());
    }
}

/// Read, parse and write a single task. Runs on a blocking thread.
fn process_task(task: &ResolvedTask) -> Result<(Outcome, Vec<String>)> {
    let mut notes = Vec::new();
    let bytes = read_pdf(&task.input)?;

    let report = match read_toc(&task.toc)? {
        Some(text) => parse_toc_report(&text, &task.options),
        None => {
            notes.push("No TOC source provided. Producing a copy without outline.".to_string());
            TocReport::default()
        }
    };
    log_skipped(&report);
    if report.headings.is_empty() && task.toc != TocSource::None {
        notes.push("No headings; output will be a copy without outline.".to_string());
    }

    let outcome = write_bookmarked(&bytes, report.headings, &task.output)?;
    Ok((outcome, notes))
}

pub async fn run(options: BatchOptions, global: crate::Global) -> Result<()> {
    if !options.config.is_file() {
        return Err(Error::ConfigNotFound(options.config.clone()).into());
    }
    let source = std::fs::read_to_string(&options.config)
        .wrap_err_with(|| f!("Failed to read {}", options.config.display()))?;
    let config = BatchConfig::from_toml_str(&source)?;
    let base_dir = options
        .config
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let tasks = config.resolve(base_dir);

    let spinner = std::io::stderr().is_terminal().then(|| {
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            spinner.set_style(style);
        }
        spinner.enable_steady_tick(std::time::Duration::from_millis(100));
        spinner
    });

    let total = tasks.len();
    let mut statuses: Vec<(usize, Status, String)> = Vec::with_capacity(total);

    for resolved in tasks {
        let task = match resolved {
            Ok(task) => task,
            Err(err) => {
                let index = err.index();
                say(spinner.as_ref(), f!("[Task {index}] Skipped: {err}"));
                statuses.push((index, Status::Skipped, String::new()));
                continue;
            }
        };

        log::debug!("resolved task {}: {:?}", task.index, task);
        set_spinner_msg(spinner.as_ref(), f!("Task {}/{}: {}", task.index, total, task.input.display()));
        say(
            spinner.as_ref(),
            f!(
                "[Task {}] Running: src={} out={} toc={} offset={} min_len={}",
                task.index,
                task.input.display(),
                task.output.display(),
                task.toc.describe(),
                task.options.page_offset,
                task.options.min_len
            ),
        );

        let index = task.index;
        let result = tokio::task::spawn_blocking(move || process_task(&task)).await?;
        match result {
            Ok((outcome, notes)) => {
                for note in notes {
                    say(spinner.as_ref(), note);
                }
                say(spinner.as_ref(), f!("{} {}", "Wrote:".green(), outcome.output.display()));
                statuses.push((index, Status::Written(outcome.entries), outcome.output.display().to_string()));
            }
            Err(err) => {
                warn(spinner.as_ref(), f!("[Task {index}] {} {err:#}", "Failed:".red()));
                statuses.push((index, Status::Failed, String::new()));
            }
        }
    }

    if let Some(s) = spinner {
        s.finish_and_clear();
    }

    if global.verbose {
        print_summary(&statuses);
    }

    let failures = statuses
        .iter()
        .filter(|(_, status, _)| !matches!(status, Status::Written(_)))
        .count();
    if failures > 0 {
        return Err(Error::TasksFailed(failures).into());
    }
    println!("{}", "All tasks completed successfully".green());
    Ok(())
}

fn print_summary(statuses: &[(usize, Status, String)]) {
    let mut table = new_table();
    table.add_row(prettytable::row![
        "Task".bold().cyan(),
        "Status".bold().cyan(),
        "Entries".bold().cyan(),
        "Output".bold().cyan()
    ]);
    for (index, status, output) in statuses {
        let (label, entries) = match status {
            Status::Written(n) => ("written".green(), n.to_string()),
            Status::Skipped => ("skipped".yellow(), String::new()),
            Status::Failed => ("failed".red(), String::new()),
        };
        table.add_row(prettytable::row![index, label, entries, output]);
    }
    table.printstd();
}
