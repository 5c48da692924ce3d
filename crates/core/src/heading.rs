use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Deepest level an outline entry may have.
pub const MAX_LEVEL: u8 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct HeadingLevel(u8);

impl HeadingLevel {
    /// Heading level 1 -- useful as a default fallback when clamping.
    pub const H1: Self = HeadingLevel(1);

    /// Build a level from any integer, saturating into `1..=6`.
    pub fn clamped(value: i64) -> Self {
        HeadingLevel(value.clamp(1, MAX_LEVEL as i64) as u8)
    }

    pub fn as_u8(&self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for HeadingLevel {
    type Error = InvalidHeadingLevel;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if (1..=MAX_LEVEL).contains(&value) {
            Ok(HeadingLevel(value))
        } else {
            Err(InvalidHeadingLevel)
        }
    }
}

impl From<HeadingLevel> for u8 {
    fn from(level: HeadingLevel) -> Self {
        level.0
    }
}

impl fmt::Display for HeadingLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "H{}", self.0)
    }
}

#[derive(Debug, Error)]
#[error("Heading level must be between 1 and 6")]
pub struct InvalidHeadingLevel;

/// One classified outline entry: a title, the 1-based page it points at, and
/// its nesting level.
///
/// Values are normalised on construction and never change afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Heading {
    title: String,
    page: u32,
    level: HeadingLevel,
}

impl Heading {
    /// Create a heading, clamping `page` to `>= 1` and `level` to `1..=6`.
    pub fn new(title: impl Into<String>, page: i64, level: i64) -> Self {
        Heading {
            title: title.into(),
            page: page.clamp(1, u32::MAX as i64) as u32,
            level: HeadingLevel::clamped(level),
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn level(&self) -> HeadingLevel {
        self.level
    }

    /// Compare two headings by `(page, level, lowercased title)`.
    pub fn canonical_cmp(&self, other: &Heading) -> Ordering {
        self.page
            .cmp(&other.page)
            .then(self.level.cmp(&other.level))
            .then_with(|| self.title.to_lowercase().cmp(&other.title.to_lowercase()))
    }
}

/// Sort headings into the order every producer emits and the outline builder
/// expects. The sort is stable, so ties keep their input order.
pub fn sort_canonical(headings: &mut [Heading]) {
    headings.sort_by(Heading::canonical_cmp);
}

/// Returns `true` if `headings` is already in canonical order.
pub fn is_canonical(headings: &[Heading]) -> bool {
    headings
        .windows(2)
        .all(|pair| pair[0].canonical_cmp(&pair[1]) != Ordering::Greater)
}
