//! Core library for tocsmith
//!
//! This crate implements the **Functional Core** of tocsmith, following the
//! Functional Core - Imperative Shell architectural pattern.
//!
//! # Architecture Overview
//!
//! tocsmith is split into three crates:
//!
//! - **`tocsmith_core`** (this crate): heading inference, TOC parsing and outline
//!   assembly with zero I/O
//! - **`tocsmith_pdf`**: reads page content and writes outlines with `lopdf`
//! - **`tocsmith`**: the CLI (the Imperative Shell)
//!
//! ## Functional Core Principles
//!
//! All functions in this crate adhere to these principles:
//!
//! - **Pure functions**: Same input always produces the same output
//! - **No side effects**: No file system access, no process state
//! - **Testable**: Tested with fixture data, no PDFs required
//!
//! # Module Organization
//!
//! - [`heading`]: The [`Heading`] value and its canonical ordering
//! - [`candidate`]: Text fragments measured on a page
//! - [`classify`]: Font-size quantile classification of candidates into headings
//! - [`toc`]: Parsing of pasted table-of-contents text
//! - [`outline`]: The level-stack algorithm that nests headings
//! - [`batch`]: TOML batch job configuration
//!
//! # Example Usage
//!
//! ```rust
//! use tocsmith_core::{build_outline, parse_toc, TocOptions};
//!
//! let text = "1 Introduction 1\n1.1 Background 2\n2 Methods 5\n";
//! let headings = parse_toc(text, &TocOptions::default());
//! let outline = build_outline(headings, 10);
//!
//! assert_eq!(outline.roots().len(), 2);
//! assert_eq!(outline.children(0).len(), 1);
//! ```

pub mod batch;
pub mod candidate;
pub mod classify;
pub mod heading;
pub mod outline;
pub mod toc;

pub use batch::{BatchConfig, BatchError, ResolvedTask, TaskError, TocSource};
pub use candidate::TextCandidate;
pub use classify::{classify, ClassifierConfig};
pub use heading::{is_canonical, sort_canonical, Heading, HeadingLevel};
pub use outline::{assemble, build_outline, OutlineEntry, OutlineNode, OutlineTree};
pub use toc::{
    parse_line, parse_toc, parse_toc_report, Numbering, SkipReason, SkippedLine, TocOptions, TocReport,
};
