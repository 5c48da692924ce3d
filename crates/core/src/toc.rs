//! Table-of-contents text parsing.
//!
//! Each usable line ends in a book page number and may start with a
//! numbering token and an emphasis marker:
//!
//! ```text
//! *1.2  Declaring values and variables   4
//! ^ ^^^ ^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^  ^
//! | |   title                            page
//! | numbering (level 2)
//! emphasis marker
//! ```
//!
//! Lines that do not end in a page number are skipped, never reported as
//! errors.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::heading::{sort_canonical, Heading, MAX_LEVEL};

static EMPHASIS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\*+\s*").unwrap());

static TRAILING_PAGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?P<page>[0-9]{1,5})\s*$").unwrap());

static NUMBERING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^\s*(?:",
        r"(?P<cjk>第\s*[0-9]+[一二三四五六七八九十百千]*[章节部分编]?)",
        r"|(?P<dotted>(?:[0-9]+\.)+[0-9]+)",
        r"|(?P<integer>[0-9]+)",
        r")?\s*"
    ))
    .unwrap()
});

static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

static LINE_BREAK_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\r\n|\r|\n").unwrap());

/// A recognised leading numbering token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "token", rename_all = "snake_case")]
pub enum Numbering {
    /// `第1章`, `第 2 节`, `第3部` ...
    CjkChapter(String),
    /// `1.2`, `3.4.1` ...
    Dotted(String),
    /// A bare `7`.
    Integer(String),
}

impl Numbering {
    /// Recognise a numbering token at the start of `body`.
    ///
    /// Returns the token and the byte offset where the remainder starts
    /// (leading and trailing whitespace around the token included).
    pub fn recognize(body: &str) -> (Option<Numbering>, usize) {
        let Some(caps) = NUMBERING_RE.captures(body) else {
            return (None, 0);
        };
        let end = caps.get(0).map_or(0, |m| m.end());
        let numbering = if let Some(m) = caps.name("cjk") {
            Some(Numbering::CjkChapter(m.as_str().to_string()))
        } else if let Some(m) = caps.name("dotted") {
            Some(Numbering::Dotted(m.as_str().to_string()))
        } else {
            caps.name("integer")
                .map(|m| Numbering::Integer(m.as_str().to_string()))
        };
        (numbering, end)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Numbering::CjkChapter(s) | Numbering::Dotted(s) | Numbering::Integer(s) => s,
        }
    }

    /// Outline level implied by this numbering shape.
    pub fn level(&self) -> u8 {
        match self {
            Numbering::CjkChapter(_) => 1,
            Numbering::Dotted(s) => {
                let dots = s.matches('.').count();
                (dots + 1).clamp(1, MAX_LEVEL as usize) as u8
            }
            Numbering::Integer(_) => 1,
        }
    }

    /// Level for an optional numbering; unnumbered lines are top level.
    pub fn level_of(numbering: Option<&Numbering>) -> u8 {
        numbering.map_or(1, Numbering::level)
    }
}

impl fmt::Display for Numbering {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TocOptions {
    /// Added to every parsed book page to get the document page.
    pub page_offset: i64,
    /// Trimmed lines shorter than this (in characters) are skipped.
    pub min_len: usize,
}

impl Default for TocOptions {
    fn default() -> Self {
        TocOptions {
            page_offset: 0,
            min_len: 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    TooShort,
    NoPageNumber,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::TooShort => write!(f, "shorter than the minimum length"),
            SkipReason::NoPageNumber => write!(f, "no trailing page number"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedLine {
    /// 1-based line number inside the TOC text.
    pub line: usize,
    pub text: String,
    pub reason: SkipReason,
}

/// Result of parsing a TOC block, including the lines that were dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TocReport {
    pub headings: Vec<Heading>,
    pub skipped: Vec<SkippedLine>,
}

/// Parse a single TOC line into a heading, or say why it was skipped.
pub fn parse_line(line: &str, page_offset: i64) -> Result<Heading, SkipReason> {
    let line = line.trim();

    let (emphasis, line) = match EMPHASIS_RE.find(line) {
        Some(m) => {
            let stars = "*".repeat(m.as_str().matches('*').count());
            (stars, line[m.end()..].trim_start())
        }
        None => (String::new(), line),
    };

    let page_match = TRAILING_PAGE_RE
        .captures(line)
        .ok_or(SkipReason::NoPageNumber)?;
    let page_text = page_match
        .name("page")
        .ok_or(SkipReason::NoPageNumber)?;
    let book_page: i64 = page_text
        .as_str()
        .parse()
        .map_err(|_| SkipReason::NoPageNumber)?;

    // A bare page number leaves an empty body and an empty title.
    let body = line[..page_text.start()].trim_end();

    let (numbering, rest_start) = Numbering::recognize(body);
    let rest = body[rest_start..].trim();

    let combined = match &numbering {
        Some(n) => format!("{} {}", n.as_str().trim(), rest),
        None => rest.to_string(),
    };
    let mut title = WHITESPACE_RE
        .replace_all(combined.trim(), " ")
        .into_owned();
    if title.is_empty() {
        title = body.trim().to_string();
    }
    title.insert_str(0, &emphasis);

    let level = Numbering::level_of(numbering.as_ref());
    Ok(Heading::new(
        title,
        (book_page + page_offset).max(1),
        level as i64,
    ))
}

/// Parse a pasted table of contents into canonically ordered headings.
pub fn parse_toc(text: &str, options: &TocOptions) -> Vec<Heading> {
    parse_toc_report(text, options).headings
}

/// Like [`parse_toc`], but also reports which non-blank lines were skipped and why.
pub fn parse_toc_report(text: &str, options: &TocOptions) -> TocReport {
    let mut report = TocReport::default();

    // Lone `\r` separators count too, as in text pasted from older Mac sources.
    for (idx, raw) in LINE_BREAK_RE.split(text).enumerate() {
        let line = raw.trim();
        let outcome = if line.chars().count() < options.min_len {
            Err(SkipReason::TooShort)
        } else {
            parse_line(line, options.page_offset)
        };

        match outcome {
            Ok(heading) => report.headings.push(heading),
            Err(reason) if !line.is_empty() => report.skipped.push(SkippedLine {
                line: idx + 1,
                text: line.to_string(),
                reason,
            }),
            Err(_) => {}
        }
    }

    sort_canonical(&mut report.headings);
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heading::is_canonical;

    fn parse(text: &str, page_offset: i64) -> Vec<Heading> {
        parse_toc(
            text,
            &TocOptions {
                page_offset,
                ..TocOptions::default()
            },
        )
    }

    // -- Numbering -----------------------------------------------------------

    #[test]
    fn test_numbering_cjk_chapter() {
        let (n, end) = Numbering::recognize("第1章 基础");
        assert_eq!(n, Some(Numbering::CjkChapter("第1章".to_string())));
        assert_eq!(&"第1章 基础"[end..], "基础");
        assert_eq!(n.unwrap().level(), 1);
    }

    #[test]
    fn test_numbering_cjk_requires_arabic_digits() {
        let (n, end) = Numbering::recognize("第一章 绪论");
        assert_eq!(n, None);
        assert_eq!(end, 0);
    }

    #[test]
    fn test_numbering_dotted_levels() {
        assert_eq!(Numbering::Dotted("1.1".into()).level(), 2);
        assert_eq!(Numbering::Dotted("1.2.3".into()).level(), 3);
        assert_eq!(Numbering::Dotted("1.2.3.4.5.6.7.8".into()).level(), 6);
    }

    #[test]
    fn test_numbering_dotted_preferred_over_integer() {
        let (n, _) = Numbering::recognize("3.4.1 Lexing");
        assert_eq!(n, Some(Numbering::Dotted("3.4.1".to_string())));
    }

    #[test]
    fn test_numbering_integer() {
        let (n, _) = Numbering::recognize("2 进阶");
        assert_eq!(n, Some(Numbering::Integer("2".to_string())));
        assert_eq!(Numbering::level_of(n.as_ref()), 1);
    }

    #[test]
    fn test_numbering_absent() {
        let (n, _) = Numbering::recognize("Appendix A");
        assert!(n.is_none());
        assert_eq!(Numbering::level_of(None), 1);
    }

    // -- parse_line ----------------------------------------------------------

    #[test]
    fn test_parse_line_cjk_chapter() {
        let h = parse_line("第1章 基础 1", 0).unwrap();
        assert_eq!(h.page(), 1);
        assert_eq!(h.level().as_u8(), 1);
        assert!(h.title().contains("第1章"));
        assert!(h.title().contains("基础"));
    }

    #[test]
    fn test_parse_line_without_page_number() {
        assert_eq!(parse_line("Preface", 0), Err(SkipReason::NoPageNumber));
        assert_eq!(parse_line("", 0), Err(SkipReason::NoPageNumber));
    }

    #[test]
    fn test_parse_line_bare_number_keeps_empty_title() {
        let h = parse_line("  42 ", 0).unwrap();
        assert_eq!(h.title(), "");
        assert_eq!(h.page(), 42);
        assert_eq!(h.level().as_u8(), 1);
    }

    #[test]
    fn test_parse_toc_bare_number_line_is_a_heading() {
        let hs = parse("1 Intro 1\n   42\n", 0);
        assert_eq!(hs.len(), 2);
        assert_eq!(hs[1].title(), "");
        assert_eq!(hs[1].page(), 42);
    }

    #[test]
    fn test_parse_toc_splits_on_carriage_returns() {
        let hs = parse("1 A 1\r2 B 2\r", 0);
        assert_eq!(hs.len(), 2);
        assert_eq!(hs[0].title(), "1 A");
        assert_eq!(hs[0].page(), 1);
        assert_eq!(hs[1].title(), "2 B");
        assert_eq!(hs[1].page(), 2);

        let mixed = parse("1 A 1\r\n2 B 2\n3 C 3\r", 0);
        assert_eq!(mixed.len(), 3);
    }

    #[test]
    fn test_parse_toc_report_line_numbers_with_crlf() {
        let report = parse_toc_report("Contents\r\n\r\n1 Intro 1\rnoise", &TocOptions::default());
        assert_eq!(report.headings.len(), 1);
        let lines: Vec<usize> = report.skipped.iter().map(|s| s.line).collect();
        assert_eq!(lines, vec![1, 4]);
    }

    #[test]
    fn test_parse_line_numbering_only_keeps_numbering() {
        let h = parse_line("1.1 3", 0).unwrap();
        assert_eq!(h.title(), "1.1");
        assert_eq!(h.page(), 3);
        assert_eq!(h.level().as_u8(), 2);
    }

    #[test]
    fn test_parse_line_negative_offset_clamps_to_first_page() {
        let h = parse_line("Foreword 2", -10).unwrap();
        assert_eq!(h.page(), 1);
    }

    #[test]
    fn test_parse_line_page_run_limited_to_five_digits() {
        let h = parse_line("Index 123456", 0).unwrap();
        assert_eq!(h.page(), 23456);
        assert_eq!(h.title(), "Index 1");
    }

    #[test]
    fn test_parse_line_collapses_whitespace() {
        let h = parse_line("第1章   基础\t 1", 0).unwrap();
        assert_eq!(h.title(), "第1章 基础");
        let h = parse_line("1.1\tScala解释器 \t 3 ", 0).unwrap();
        assert_eq!(h.title(), "1.1 Scala解释器");
        let h = parse_line("Getting    started   quickly 7", 0).unwrap();
        assert_eq!(h.title(), "Getting started quickly");
    }

    #[test]
    fn test_parse_line_emphasis_marker() {
        let h = parse_line("*1.1 subdirectory 12", 0).unwrap();
        assert_eq!(h.title(), "*1.1 subdirectory");
        assert_eq!(h.level().as_u8(), 2);

        let h = parse_line("* 2 星标章节 13", 0).unwrap();
        assert_eq!(h.title(), "*2 星标章节");

        let h = parse_line("** Starred twice 5", 0).unwrap();
        assert_eq!(h.title(), "**Starred twice");
    }

    #[test]
    fn test_parse_line_ignores_non_ascii_digits() {
        assert_eq!(parse_line("Chapter ٣", 0), Err(SkipReason::NoPageNumber));
    }

    // -- parse_toc -----------------------------------------------------------

    #[test]
    fn test_parse_toc_basic_offset() {
        let toc = "第1章 基础 1\n1.1 Scala解释器 3\n1.2 声明值和变量 4\n2 进阶 10";
        let hs = parse(toc, 14);
        let pages: Vec<u32> = hs.iter().map(|h| h.page()).collect();
        assert_eq!(pages, vec![15, 17, 18, 24]);
        assert_eq!(hs[0].level().as_u8(), 1);
        assert!(hs[1].level().as_u8() >= 2);
    }

    #[test]
    fn test_parse_toc_robust_trailing_spaces_and_tabs() {
        let toc = ["第1章   基础\t 1", " 1.1\tScala解释器 \t 3 ", "附录 A  100"].join("\n");
        let hs = parse(&toc, 0);
        assert_eq!(hs[0].page(), 1);
        assert_eq!(hs[1].page(), 3);
        assert!(hs
            .iter()
            .any(|h| h.title().starts_with("附录") && h.level().as_u8() == 1));
    }

    #[test]
    fn test_parse_toc_preserve_asterisk_prefix() {
        let toc = [
            "*1.1 subdirectory 12",
            "* 1.2 another subdirectory 13",
            "1.3 normal 14",
        ]
        .join("\n");
        let hs = parse(&toc, 0);
        let titles: Vec<&str> = hs.iter().map(|h| h.title()).collect();
        assert!(titles[0].starts_with('*') && titles[0].contains("subdirectory"));
        assert!(titles[1].starts_with('*') && titles[1].contains("another subdirectory"));
        assert!(!titles[2].starts_with('*'));
    }

    #[test]
    fn test_parse_toc_preserve_numbering_prefix_in_title() {
        let toc = [
            "第1章 计算机系统概述 1",
            "1.1 操作系统的基本概念 2",
            "2 其他章节 10",
        ]
        .join("\n");
        let hs = parse(&toc, 0);
        let titles: Vec<&str> = hs.iter().map(|h| h.title()).collect();
        assert!(titles
            .iter()
            .any(|t| t.starts_with("第1章 ") && t.contains("计算机系统概述")));
        assert!(titles
            .iter()
            .any(|t| t.starts_with("1.1 ") && t.contains("操作系统的基本概念")));
        assert!(titles
            .iter()
            .any(|t| t.starts_with("2 ") && t.contains("其他章节")));
    }

    #[test]
    fn test_parse_toc_preserve_numbering_with_asterisk() {
        let hs = parse("*1.1 星标小节 12\n* 2 星标章节 13", 0);
        let titles: Vec<&str> = hs.iter().map(|h| h.title()).collect();
        assert!(titles
            .iter()
            .any(|t| t.starts_with("*1.1 ") && t.contains("星标小节")));
        assert!(titles
            .iter()
            .any(|t| t.starts_with("*2 ") && t.contains("星标章节")));
    }

    #[test]
    fn test_parse_toc_skips_noise_lines() {
        let toc = "\nContents\n\n1 Introduction 1\n   \nRunning header text\n";
        let hs = parse(toc, 0);
        assert_eq!(hs.len(), 1);
        assert_eq!(hs[0].title(), "1 Introduction");
    }

    #[test]
    fn test_parse_toc_empty_input() {
        assert!(parse("", 0).is_empty());
        assert!(parse("\n\n  \n", 3).is_empty());
    }

    #[test]
    fn test_parse_toc_output_is_canonical() {
        let toc = "Zebra 9\n2.1 Later 5\napple 5\n1 Early 5\nFirst 1";
        let hs = parse(toc, 0);
        assert!(is_canonical(&hs));
        let titles: Vec<&str> = hs.iter().map(|h| h.title()).collect();
        assert_eq!(titles, vec!["First", "1 Early", "apple", "2.1 Later", "Zebra"]);
    }

    #[test]
    fn test_parse_toc_min_len() {
        let options = TocOptions {
            page_offset: 0,
            min_len: 8,
        };
        let hs = parse_toc("Intro 1\nBackground 2", &options);
        assert_eq!(hs.len(), 1);
        assert_eq!(hs[0].title(), "Background");
    }

    #[test]
    fn test_parse_toc_report_lists_skipped_lines() {
        let report = parse_toc_report(
            "Contents\n\n1 Intro 1\nSee also",
            &TocOptions::default(),
        );
        assert_eq!(report.headings.len(), 1);
        assert_eq!(
            report.skipped,
            vec![
                SkippedLine {
                    line: 1,
                    text: "Contents".to_string(),
                    reason: SkipReason::NoPageNumber,
                },
                SkippedLine {
                    line: 4,
                    text: "See also".to_string(),
                    reason: SkipReason::NoPageNumber,
                },
            ]
        );
    }

    #[test]
    fn test_parse_toc_report_too_short() {
        let options = TocOptions {
            page_offset: 0,
            min_len: 5,
        };
        let report = parse_toc_report("A 1", &options);
        assert!(report.headings.is_empty());
        assert_eq!(report.skipped[0].reason, SkipReason::TooShort);
    }
}
