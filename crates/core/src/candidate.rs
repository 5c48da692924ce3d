use serde::{Deserialize, Serialize};

/// One text fragment found on a page by the page-content extractor.
///
/// `top_y` is in PDF page space, so larger values are nearer the top edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextCandidate {
    pub page: u32,
    pub text: String,
    pub average_glyph_size: f64,
    pub top_y: f64,
}

impl TextCandidate {
    pub fn new(page: u32, text: impl Into<String>, average_glyph_size: f64, top_y: f64) -> Self {
        TextCandidate {
            page,
            text: text.into(),
            average_glyph_size,
            top_y,
        }
    }

    /// A candidate is measurable when it carries a usable glyph size.
    pub fn is_measurable(&self) -> bool {
        self.average_glyph_size.is_finite() && self.average_glyph_size > 0.0
    }
}
