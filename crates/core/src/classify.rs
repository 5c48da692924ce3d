//! Heading-level inference from font geometry.
//!
//! Sizes are compared against per-document quantiles instead of fixed point
//! sizes, so a 9pt body text and an 11pt body text both work. Text close to
//! the top of the page is promoted by one level.

use serde::{Deserialize, Serialize};

use crate::candidate::TextCandidate;
use crate::heading::{sort_canonical, Heading};

/// Tunables for [`classify`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Candidates whose trimmed text is shorter than this (in characters) are ignored.
    pub min_len: usize,
    /// Sizes at or above this quantile become level 1.
    pub primary_quantile: f64,
    /// Sizes at or above this quantile become level 2; everything else is level 3.
    pub secondary_quantile: f64,
    /// Candidates whose top coordinate exceeds this are promoted. Tuned for an
    /// A4 page (842pt tall).
    pub top_region_y: f64,
    /// How many levels a top-of-page candidate is promoted by.
    pub top_boost: i64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        ClassifierConfig {
            min_len: 3,
            primary_quantile: 0.85,
            secondary_quantile: 0.70,
            top_region_y: 700.0,
            top_boost: 1,
        }
    }
}

impl ClassifierConfig {
    pub fn with_min_len(mut self, min_len: usize) -> Self {
        self.min_len = min_len;
        self
    }
}

/// Nearest-rank quantile: `sorted[floor(q * (n - 1))]`.
///
/// `sorted` must be in ascending order. Returns `None` for an empty slice.
pub fn quantile(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let q = q.clamp(0.0, 1.0);
    let idx = (q * (sorted.len() - 1) as f64).floor() as usize;
    sorted.get(idx.min(sorted.len() - 1)).copied()
}

/// Size thresholds computed for one document.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub primary: f64,
    pub secondary: f64,
}

impl Thresholds {
    /// Compute thresholds from the glyph sizes of `candidates`. `None` when
    /// there is nothing to measure.
    pub fn from_candidates<'a>(
        candidates: impl IntoIterator<Item = &'a TextCandidate>,
        config: &ClassifierConfig,
    ) -> Option<Self> {
        let mut sizes: Vec<f64> = candidates
            .into_iter()
            .map(|c| c.average_glyph_size)
            .collect();
        sizes.sort_by(f64::total_cmp);

        Some(Thresholds {
            primary: quantile(&sizes, config.primary_quantile)?,
            secondary: quantile(&sizes, config.secondary_quantile)?,
        })
    }

    fn base_level(&self, size: f64) -> i64 {
        if size >= self.primary {
            1
        } else if size >= self.secondary {
            2
        } else {
            3
        }
    }
}

/// Turn the text candidates of one whole document into canonically ordered
/// headings.
///
/// All pages must be scanned before calling this: the thresholds depend on
/// the complete sample set. Empty or unusable input yields an empty list.
pub fn classify(candidates: &[TextCandidate], config: &ClassifierConfig) -> Vec<Heading> {
    let kept: Vec<&TextCandidate> = candidates
        .iter()
        .filter(|c| c.is_measurable() && c.text.trim().chars().count() >= config.min_len)
        .collect();

    let Some(thresholds) = Thresholds::from_candidates(kept.iter().copied(), config) else {
        return Vec::new();
    };

    let mut headings: Vec<Heading> = kept
        .into_iter()
        .map(|c| {
            let mut level = thresholds.base_level(c.average_glyph_size);
            if c.top_y > config.top_region_y {
                level -= config.top_boost;
            }
            Heading::new(c.text.trim(), c.page as i64, level)
        })
        .collect();

    sort_canonical(&mut headings);
    headings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heading::is_canonical;

    fn body(page: u32, text: &str, size: f64) -> TextCandidate {
        TextCandidate::new(page, text, size, 400.0)
    }

    #[test]
    fn test_quantile_nearest_rank() {
        let sorted: Vec<f64> = (1..=11).map(|v| v as f64).collect();
        // floor(0.7 * 10) = 7, floor(0.85 * 10) = 8
        assert_eq!(quantile(&sorted, 0.70), Some(8.0));
        assert_eq!(quantile(&sorted, 0.85), Some(9.0));
        assert_eq!(quantile(&sorted, 0.0), Some(1.0));
        assert_eq!(quantile(&sorted, 1.0), Some(11.0));
    }

    #[test]
    fn test_quantile_empty() {
        assert_eq!(quantile(&[], 0.5), None);
    }

    #[test]
    fn test_quantile_single_sample() {
        assert_eq!(quantile(&[12.0], 0.85), Some(12.0));
    }

    #[test]
    fn test_classify_empty_input() {
        assert!(classify(&[], &ClassifierConfig::default()).is_empty());
    }

    #[test]
    fn test_classify_all_candidates_too_short() {
        let candidates = vec![body(1, "ab", 20.0), body(1, "  x  ", 10.0)];
        assert!(classify(&candidates, &ClassifierConfig::default()).is_empty());
    }

    #[test]
    fn test_classify_drops_unmeasurable_candidates() {
        let candidates = vec![body(1, "Nothing to see", 0.0), body(1, "NaN size", f64::NAN)];
        assert!(classify(&candidates, &ClassifierConfig::default()).is_empty());
    }

    #[test]
    fn test_classify_levels_from_quantiles() {
        // Ten samples: q70 index 6, q85 index 7 on the sorted sizes.
        let mut candidates: Vec<TextCandidate> = (0..7)
            .map(|i| body(2, &format!("body text {i}"), 10.0))
            .collect();
        candidates.push(body(1, "Section title", 14.0));
        candidates.push(body(1, "Chapter title", 20.0));
        candidates.push(body(1, "Part title", 24.0));

        let headings = classify(&candidates, &ClassifierConfig::default());
        assert_eq!(headings.len(), 10);

        let level_of = |title: &str| {
            headings
                .iter()
                .find(|h| h.title() == title)
                .map(|h| h.level().as_u8())
                .unwrap()
        };
        // sorted: [10 x7, 14, 20, 24]; q70 = sorted[6] = 10, q85 = sorted[7] = 14
        assert_eq!(level_of("Part title"), 1);
        assert_eq!(level_of("Chapter title"), 1);
        assert_eq!(level_of("Section title"), 1);
        assert_eq!(level_of("body text 0"), 2);
    }

    #[test]
    fn test_classify_three_tiers() {
        let mut candidates: Vec<TextCandidate> = (0..6)
            .map(|i| body(3, &format!("small {i}"), 8.0))
            .collect();
        candidates.extend((0..2).map(|i| body(3, &format!("medium {i}"), 12.0)));
        candidates.extend((0..2).map(|i| body(3, &format!("large {i}"), 18.0)));
        // sorted: [8 x6, 12, 12, 18, 18]; q70 -> idx 6 = 12, q85 -> idx 7 = 12

        let headings = classify(&candidates, &ClassifierConfig::default());
        for h in &headings {
            let expected = if h.title().starts_with("small") { 3 } else { 1 };
            assert_eq!(h.level().as_u8(), expected, "{}", h.title());
        }
    }

    #[test]
    fn test_classify_top_of_page_boost() {
        let mut candidates: Vec<TextCandidate> = (0..9)
            .map(|i| body(1, &format!("paragraph {i}"), 10.0))
            .collect();
        candidates.push(TextCandidate::new(1, "Running header", 8.0, 780.0));

        let headings = classify(&candidates, &ClassifierConfig::default());
        let header = headings
            .iter()
            .find(|h| h.title() == "Running header")
            .unwrap();
        // base level 3 (below both thresholds), promoted to 2.
        assert_eq!(header.level().as_u8(), 2);
    }

    #[test]
    fn test_classify_boost_never_goes_below_one() {
        let candidates = vec![TextCandidate::new(1, "Title page", 30.0, 800.0)];
        let headings = classify(&candidates, &ClassifierConfig::default());
        assert_eq!(headings[0].level().as_u8(), 1);
    }

    #[test]
    fn test_classify_output_is_canonical() {
        let candidates = vec![
            TextCandidate::new(3, "zeta", 10.0, 100.0),
            TextCandidate::new(1, "Gamma", 22.0, 750.0),
            TextCandidate::new(2, "beta", 10.0, 100.0),
            TextCandidate::new(1, "alpha", 10.0, 100.0),
        ];
        let headings = classify(&candidates, &ClassifierConfig::default());
        assert!(is_canonical(&headings));
        assert_eq!(headings[0].page(), 1);
        assert_eq!(headings.last().unwrap().page(), 3);
    }

    #[test]
    fn test_classify_trims_titles() {
        let candidates = vec![body(1, "   Padded   ", 12.0)];
        let headings = classify(&candidates, &ClassifierConfig::default());
        assert_eq!(headings[0].title(), "Padded");
    }

    #[test]
    fn test_classify_custom_min_len() {
        let candidates = vec![body(1, "Hi", 12.0)];
        let config = ClassifierConfig::default().with_min_len(2);
        assert_eq!(classify(&candidates, &config).len(), 1);
    }

    #[test]
    fn test_classify_custom_top_region() {
        let candidates = vec![
            TextCandidate::new(1, "low body", 10.0, 100.0),
            TextCandidate::new(1, "low body 2", 10.0, 100.0),
            TextCandidate::new(1, "Letter top", 10.0, 650.0),
        ];
        let config = ClassifierConfig {
            top_region_y: 600.0,
            ..ClassifierConfig::default()
        };
        let headings = classify(&candidates, &config);
        // All sizes equal: base level 1 everywhere, boost clamps at 1.
        assert!(headings.iter().all(|h| h.level().as_u8() == 1));
    }
}
