//! Batch job configuration.
//!
//! A batch file is TOML with an optional `[defaults]` table and one
//! `[[tasks]]` entry per PDF:
//!
//! ```toml
//! [defaults]
//! page_offset = 0
//! min_len = 3
//! input_prefix = "input"
//! output_prefix = "output"
//! output_suffix = ".bookmarked.pdf"
//!
//! [[tasks]]
//! input_file = "book1.pdf"
//! toc = """
//! 1 Introduction 1
//! 1.1 Background 3
//! """
//! page_offset = 10
//!
//! [[tasks]]
//! input_file = "book2.pdf"
//! toc_file = "book2.toc.txt"
//! ```
//!
//! Everything here is path arithmetic. Reading and writing files is left to
//! the caller.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::toc::TocOptions;

pub const DEFAULT_OUTPUT_SUFFIX: &str = ".bookmarked.pdf";

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("Invalid batch config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("No tasks found in config (expected a [[tasks]] array)")]
    NoTasks,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskError {
    #[error("missing 'input_file'")]
    MissingInputFile { index: usize },
}

impl TaskError {
    /// 1-based index of the task that failed to resolve.
    pub fn index(&self) -> usize {
        match self {
            TaskError::MissingInputFile { index } => *index,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchDefaults {
    pub page_offset: i64,
    pub min_len: usize,
    pub input_prefix: String,
    pub output_prefix: String,
    pub output_suffix: String,
}

impl Default for BatchDefaults {
    fn default() -> Self {
        BatchDefaults {
            page_offset: 0,
            min_len: 3,
            input_prefix: String::new(),
            output_prefix: String::new(),
            output_suffix: DEFAULT_OUTPUT_SUFFIX.to_string(),
        }
    }
}

impl BatchDefaults {
    fn suffix(&self) -> &str {
        match self.output_suffix.trim() {
            "" => DEFAULT_OUTPUT_SUFFIX,
            suffix => suffix,
        }
    }
}

/// One `[[tasks]]` entry as written in the file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSpec {
    pub input_file: Option<String>,
    pub toc: Option<String>,
    pub toc_file: Option<String>,
    pub page_offset: Option<i64>,
    pub min_len: Option<usize>,
}

/// Where a task's table of contents comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TocSource {
    Inline(String),
    File(PathBuf),
    /// No TOC: the document is copied without an outline.
    None,
}

impl TocSource {
    /// Short description for progress messages.
    pub fn describe(&self) -> String {
        match self {
            TocSource::Inline(_) => "inline".to_string(),
            TocSource::File(path) => path.display().to_string(),
            TocSource::None => "<none>".to_string(),
        }
    }
}

/// A task with every path and option made concrete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTask {
    /// 1-based position in the `tasks` array.
    pub index: usize,
    pub input: PathBuf,
    pub output: PathBuf,
    pub toc: TocSource,
    pub options: TocOptions,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchConfig {
    #[serde(default)]
    pub defaults: BatchDefaults,
    #[serde(default)]
    pub tasks: Vec<TaskSpec>,
}

impl BatchConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, BatchError> {
        let config: BatchConfig = toml::from_str(source)?;
        if config.tasks.is_empty() {
            return Err(BatchError::NoTasks);
        }
        Ok(config)
    }

    /// Resolve every task against `base_dir`, normally the directory holding
    /// the config file. A broken task does not stop the others from
    /// resolving.
    pub fn resolve(&self, base_dir: &Path) -> Vec<Result<ResolvedTask, TaskError>> {
        let input_base = join_prefix(base_dir, &self.defaults.input_prefix);
        let output_base = join_prefix(base_dir, &self.defaults.output_prefix);

        self.tasks
            .iter()
            .enumerate()
            .map(|(i, task)| self.resolve_task(i + 1, task, base_dir, &input_base, &output_base))
            .collect()
    }

    fn resolve_task(
        &self,
        index: usize,
        task: &TaskSpec,
        base_dir: &Path,
        input_base: &Path,
        output_base: &Path,
    ) -> Result<ResolvedTask, TaskError> {
        let input_file = task
            .input_file
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(TaskError::MissingInputFile { index })?;

        let stem = Path::new(input_file)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("output");

        let toc = match (&task.toc, &task.toc_file) {
            (Some(inline), _) if !inline.trim().is_empty() => TocSource::Inline(inline.clone()),
            (_, Some(file)) if !file.trim().is_empty() => {
                TocSource::File(join_prefix(base_dir, file.trim()))
            }
            _ => TocSource::None,
        };

        Ok(ResolvedTask {
            index,
            input: input_base.join(input_file),
            output: output_base.join(format!("{stem}{}", self.defaults.suffix())),
            toc,
            options: TocOptions {
                page_offset: task.page_offset.unwrap_or(self.defaults.page_offset),
                min_len: task.min_len.unwrap_or(self.defaults.min_len),
            },
        })
    }
}

/// `base/prefix`, or `base` itself for a blank prefix. Absolute prefixes
/// replace the base.
fn join_prefix(base: &Path, prefix: &str) -> PathBuf {
    match prefix.trim() {
        "" => base.to_path_buf(),
        prefix => base.join(prefix),
    }
}
