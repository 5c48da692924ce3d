//! Page-content extraction.
//!
//! Turns each page's content stream into [`TextCandidate`]s for the
//! classifier:
//!
//! ```text
//! content ops  ->  TextSpan[]  ->  TextLine[]  ->  TextBox[]  ->  TextCandidate[]
//!   (per page)     state machine   same baseline   vertical gaps   first line + sizes
//! ```
//!
//! Glyph widths are not read from the font programs. Widths are estimated
//! from the font size, which is enough to decide where words break.

use tocsmith_core::TextCandidate;

use crate::backend::{decode_pdf_string, ContentOp, FontInfo, Operand, PageId, PdfBackend};
use crate::PdfError;

/// Spans whose baselines differ by at most this many points share a line.
const Y_TOLERANCE: f32 = 1.0;

/// Estimated glyph advance as a fraction of the font size.
const APPROX_CHAR_WIDTH_RATIO: f32 = 0.5;

/// Horizontal gap (points) between spans on one line that reads as a space.
const MIN_WORD_GAP: f32 = 1.5;

/// A vertical gap larger than this multiple of the font size ends a text box.
const BOX_GAP_FACTOR: f32 = 1.4;

/// Lines whose sizes differ by at least this much never share a box.
const SIZE_CHANGE: f32 = 0.5;

/// A run of text shown by one operator.
#[derive(Debug, Clone, PartialEq)]
pub struct TextSpan {
    pub text: String,
    pub x: f32,
    /// Baseline, in page space.
    pub y: f32,
    pub width: f32,
    pub font_size: f32,
}

/// Spans that share a baseline, left to right.
#[derive(Debug, Clone, PartialEq)]
pub struct TextLine {
    pub spans: Vec<TextSpan>,
    pub y: f32,
    /// Size covering the most characters on the line.
    pub font_size: f32,
}

impl TextLine {
    fn from_spans(mut spans: Vec<TextSpan>) -> Self {
        spans.sort_by(|a, b| a.x.total_cmp(&b.x));
        let y = spans.first().map_or(0.0, |s| s.y);
        let font_size = dominant_size(&spans);
        TextLine {
            spans,
            y,
            font_size,
        }
    }

    /// Line text with spaces where spans are visibly apart.
    ///
    /// No space is inserted between two characters of a script written
    /// without word spacing (CJK, Thai ...).
    pub fn text(&self) -> String {
        let mut out = String::new();
        let mut prev: Option<&TextSpan> = None;

        for span in &self.spans {
            if let Some(p) = prev {
                let gap = span.x - (p.x + p.width);
                let joined = match (out.chars().next_back(), span.text.chars().next()) {
                    (Some(l), Some(f)) => {
                        l.is_whitespace()
                            || f.is_whitespace()
                            || (is_spaceless_script_char(l) && is_spaceless_script_char(f))
                    }
                    _ => true,
                };
                if gap >= MIN_WORD_GAP && !joined {
                    out.push(' ');
                }
            }
            out.push_str(&span.text);
            prev = Some(span);
        }

        out
    }
}

/// Consecutive lines that read as one paragraph or heading.
#[derive(Debug, Clone, PartialEq)]
pub struct TextBox {
    pub lines: Vec<TextLine>,
}

impl TextBox {
    /// Character-weighted average font size over every span in the box.
    pub fn average_glyph_size(&self) -> f64 {
        let (weighted, chars) = self
            .lines
            .iter()
            .flat_map(|l| &l.spans)
            .fold((0.0_f64, 0_usize), |(sum, n), span| {
                let count = span.text.chars().count();
                (sum + span.font_size as f64 * count as f64, n + count)
            });
        if chars == 0 {
            0.0
        } else {
            weighted / chars as f64
        }
    }

    /// Top edge of the box: first baseline plus its font size.
    pub fn top_y(&self) -> f64 {
        self.lines
            .first()
            .map_or(0.0, |l| (l.y + l.font_size) as f64)
    }

    /// The box as a classifier sample: the first line's text stands for the
    /// whole box. `None` when there is nothing to show.
    pub fn to_candidate(&self, page: u32) -> Option<TextCandidate> {
        let text = self.lines.first()?.text().trim().to_string();
        if text.is_empty() {
            return None;
        }
        Some(TextCandidate::new(
            page,
            text,
            self.average_glyph_size(),
            self.top_y(),
        ))
    }
}

/// Returns `true` if `c` belongs to a script written without inter-word
/// spaces.
pub fn is_spaceless_script_char(c: char) -> bool {
    matches!(
        c as u32,
        // CJK Unified Ideographs, Extension A, Extension B
        0x4E00..=0x9FFF
        | 0x3400..=0x4DBF
        | 0x20000..=0x2A6DF
        // CJK Compatibility Ideographs
        | 0xF900..=0xFAFF
        // Hiragana, Katakana, Katakana Phonetic Extensions
        | 0x3040..=0x30FF
        | 0x31F0..=0x31FF
        // Hangul
        | 0xAC00..=0xD7AF
        | 0x1100..=0x11FF
        | 0x3130..=0x318F
        // CJK Symbols and Punctuation, Fullwidth Forms
        | 0x3000..=0x303F
        | 0xFF00..=0xFFEF
        // Thai, Lao, Tibetan, Myanmar, Khmer
        | 0x0E00..=0x0EFF
        | 0x0F00..=0x0FFF
        | 0x1000..=0x109F
        | 0x1780..=0x17FF
    )
}

fn dominant_size(spans: &[TextSpan]) -> f32 {
    let mut counts: Vec<(i32, usize)> = Vec::new();
    for span in spans {
        let key = (span.font_size * 100.0).round() as i32;
        let chars = span.text.chars().count();
        match counts.iter_mut().find(|(k, _)| *k == key) {
            Some((_, n)) => *n += chars,
            None => counts.push((key, chars)),
        }
    }
    counts
        .into_iter()
        .max_by_key(|&(_, n)| n)
        .map_or(0.0, |(k, _)| k as f32 / 100.0)
}

// ---------------------------------------------------------------------------
// Text-state machine
// ---------------------------------------------------------------------------

const IDENTITY: [f32; 6] = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

/// Text state tracked while walking one page's content stream.
#[derive(Debug, Clone)]
struct TextState {
    font_key: Vec<u8>,
    font_size: f32,
    /// [a, b, c, d, e, f]
    matrix: [f32; 6],
    line_matrix: [f32; 6],
    horiz_scale: f32,
    char_spacing: f32,
    word_spacing: f32,
    rise: f32,
    leading: f32,
}

impl Default for TextState {
    fn default() -> Self {
        TextState {
            font_key: Vec::new(),
            font_size: 0.0,
            matrix: IDENTITY,
            line_matrix: IDENTITY,
            horiz_scale: 1.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            rise: 0.0,
            leading: 0.0,
        }
    }
}

impl TextState {
    fn begin_text(&mut self) {
        self.matrix = IDENTITY;
        self.line_matrix = IDENTITY;
    }

    fn set_matrix(&mut self, m: [f32; 6]) {
        self.matrix = m;
        self.line_matrix = m;
    }

    /// `Td`: translate the line matrix by `(tx, ty)` in text space.
    fn move_line(&mut self, tx: f32, ty: f32) {
        let m = self.line_matrix;
        self.line_matrix[4] = m[0] * tx + m[2] * ty + m[4];
        self.line_matrix[5] = m[1] * tx + m[3] * ty + m[5];
        self.matrix = self.line_matrix;
    }

    fn next_line(&mut self) {
        self.move_line(0.0, -self.leading);
    }

    /// Rendered size: the font size scaled by the matrix's vertical axis.
    fn rendered_size(&self) -> f32 {
        let scale = (self.matrix[1].powi(2) + self.matrix[3].powi(2)).sqrt();
        (self.font_size * scale).abs()
    }

    fn glyph_advance(&self) -> f32 {
        self.font_size * APPROX_CHAR_WIDTH_RATIO * self.horiz_scale
    }

    fn advance(&mut self, tx: f32) {
        self.matrix[4] += tx * self.matrix[0];
        self.matrix[5] += tx * self.matrix[1];
    }

    fn advance_over(&mut self, text: &str) {
        let tx: f32 = text
            .chars()
            .map(|c| {
                let spacing = if c == ' ' { self.word_spacing } else { 0.0 };
                self.glyph_advance() + self.char_spacing + spacing
            })
            .sum();
        self.advance(tx);
    }

    fn span(&self, text: String, x: f32, y: f32) -> TextSpan {
        let scale = (self.matrix[0].powi(2) + self.matrix[1].powi(2)).sqrt();
        TextSpan {
            width: text.chars().count() as f32 * self.glyph_advance() * scale,
            text,
            x,
            y,
            font_size: self.rendered_size(),
        }
    }
}

/// Walks a page's operators and collects the shown text.
struct PageScanner<'a> {
    backend: &'a dyn PdfBackend,
    page: PageId,
    fonts: Vec<FontInfo>,
    state: TextState,
    spans: Vec<TextSpan>,
}

impl<'a> PageScanner<'a> {
    fn new(backend: &'a dyn PdfBackend, page: PageId, fonts: Vec<FontInfo>) -> Self {
        PageScanner {
            backend,
            page,
            fonts,
            state: TextState::default(),
            spans: Vec::new(),
        }
    }

    fn decode(&self, operand: &Operand) -> String {
        match operand {
            Operand::Str(bytes) => {
                let font = self.fonts.iter().find(|f| f.key == self.state.font_key);
                let decoded = self.backend.decode_text(font, bytes);
                if decoded.is_empty() {
                    decode_pdf_string(bytes)
                } else {
                    decoded
                }
            }
            _ => String::new(),
        }
    }

    fn step(&mut self, op: &ContentOp) {
        let state = &mut self.state;
        match op.operator.as_str() {
            "BT" => state.begin_text(),
            // Font state survives ET; some producers rely on it.
            "ET" => {}
            "Tf" => self.set_font(op),
            "Tm" => {
                let m: Vec<f32> = op.operands.iter().filter_map(Operand::as_number).collect();
                if let &[a, b, c, d, e, f] = m.as_slice() {
                    state.set_matrix([a, b, c, d, e, f]);
                }
            }
            "Td" => {
                if let (Some(tx), Some(ty)) = (op.number(0), op.number(1)) {
                    state.move_line(tx, ty);
                }
            }
            "TD" => {
                if let (Some(tx), Some(ty)) = (op.number(0), op.number(1)) {
                    state.leading = -ty;
                    state.move_line(tx, ty);
                }
            }
            "T*" => state.next_line(),
            "TL" => {
                if let Some(v) = op.number(0) {
                    state.leading = v;
                }
            }
            "Tc" => {
                if let Some(v) = op.number(0) {
                    state.char_spacing = v;
                }
            }
            "Tw" => {
                if let Some(v) = op.number(0) {
                    state.word_spacing = v;
                }
            }
            "Tz" => {
                if let Some(v) = op.number(0) {
                    state.horiz_scale = v / 100.0;
                }
            }
            "Ts" => {
                if let Some(v) = op.number(0) {
                    state.rise = v;
                }
            }
            "Tj" => {
                if let Some(operand) = op.operands.first() {
                    self.show(operand);
                }
            }
            "'" => {
                state.next_line();
                if let Some(operand) = op.operands.first() {
                    self.show(operand);
                }
            }
            "\"" => {
                if let [aw, ac, operand] = &op.operands[..] {
                    if let Some(aw) = aw.as_number() {
                        state.word_spacing = aw;
                    }
                    if let Some(ac) = ac.as_number() {
                        state.char_spacing = ac;
                    }
                    state.next_line();
                    self.show(operand);
                }
            }
            "TJ" => {
                if let Some(Operand::Array(items)) = op.operands.first() {
                    self.show_array(items);
                }
            }
            _ => {}
        }
    }

    fn set_font(&mut self, op: &ContentOp) {
        let key = match op.operands.first() {
            Some(Operand::Name(n)) | Some(Operand::Str(n)) => n.clone(),
            _ => return,
        };
        if !self.fonts.iter().any(|f| f.key == key) {
            log::trace!(
                "page {:?}: font {} not in resources",
                self.page,
                String::from_utf8_lossy(&key)
            );
        }
        self.state.font_key = key;
        self.state.font_size = op.number(1).unwrap_or(0.0);
    }

    fn show(&mut self, operand: &Operand) {
        let text = self.decode(operand);
        if text.is_empty() {
            return;
        }
        let (x, y) = (self.state.matrix[4], self.state.matrix[5] + self.state.rise);
        self.spans.push(self.state.span(text.clone(), x, y));
        self.state.advance_over(&text);
    }

    /// `TJ`: strings interleaved with adjustments in thousandths of text
    /// space. A large enough negative adjustment is a word gap.
    fn show_array(&mut self, items: &[Operand]) {
        let mut buf = String::new();
        let mut start_x = self.state.matrix[4];
        let y = self.state.matrix[5] + self.state.rise;

        for item in items {
            if let Some(adjust) = item.as_number() {
                let tx = -adjust / 1000.0 * self.state.font_size * self.state.horiz_scale;
                if tx > self.state.glyph_advance() * 0.3 && !buf.is_empty() {
                    buf.push(' ');
                }
                self.state.advance(tx);
                continue;
            }

            let fragment = self.decode(item);
            if buf.is_empty() {
                start_x = self.state.matrix[4];
            }
            buf.push_str(&fragment);
            self.state.advance_over(&fragment);
        }

        let text = buf.trim_end();
        if !text.is_empty() {
            self.spans.push(self.state.span(text.to_string(), start_x, y));
        }
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Walk one page's content stream and return every shown span.
///
/// Handles `BT ET Tf Tm Td TD T* TL Tc Tw Tz Ts Tj TJ ' "`; every other
/// operator is ignored.
pub fn extract_page_spans(backend: &dyn PdfBackend, page: PageId) -> Result<Vec<TextSpan>, PdfError> {
    let raw = backend.page_content(page)?;
    let ops = backend.decode_content(&raw)?;
    let fonts = backend.page_fonts(page).unwrap_or_default();

    let mut scanner = PageScanner::new(backend, page, fonts);
    for op in &ops {
        scanner.step(op);
    }
    Ok(scanner.spans)
}

/// Group spans into lines, top of the page first.
pub fn group_spans_into_lines(mut spans: Vec<TextSpan>) -> Vec<TextLine> {
    spans.sort_by(|a, b| b.y.total_cmp(&a.y).then(a.x.total_cmp(&b.x)));

    let mut lines = Vec::new();
    let mut current: Vec<TextSpan> = Vec::new();

    for span in spans {
        let same_line = current
            .first()
            .is_some_and(|first| (first.y - span.y).abs() <= Y_TOLERANCE);
        if !same_line && !current.is_empty() {
            lines.push(TextLine::from_spans(std::mem::take(&mut current)));
        }
        current.push(span);
    }
    if !current.is_empty() {
        lines.push(TextLine::from_spans(current));
    }

    lines
}

/// Group lines into boxes. A box ends at a wide vertical gap or a change of
/// font size.
pub fn group_lines_into_boxes(lines: Vec<TextLine>) -> Vec<TextBox> {
    let mut boxes = Vec::new();
    let mut current: Vec<TextLine> = Vec::new();

    for line in lines {
        let breaks = current.last().is_some_and(|prev| {
            let gap = (prev.y - line.y).abs();
            gap > prev.font_size * BOX_GAP_FACTOR || (prev.font_size - line.font_size).abs() >= SIZE_CHANGE
        });
        if breaks {
            boxes.push(TextBox {
                lines: std::mem::take(&mut current),
            });
        }
        current.push(line);
    }
    if !current.is_empty() {
        boxes.push(TextBox { lines: current });
    }

    boxes
}

/// Candidates for one page, in reading order.
pub fn extract_page_candidates(
    backend: &dyn PdfBackend,
    page_number: u32,
    page: PageId,
) -> Result<Vec<TextCandidate>, PdfError> {
    let spans = extract_page_spans(backend, page)?;
    let lines = group_spans_into_lines(spans);
    Ok(group_lines_into_boxes(lines)
        .iter()
        .filter_map(|b| b.to_candidate(page_number))
        .collect())
}

/// Candidates for the whole document, page by page.
pub fn extract_candidates(backend: &dyn PdfBackend) -> Result<Vec<TextCandidate>, PdfError> {
    let mut candidates = Vec::new();
    for (page_number, page) in backend.pages() {
        let found = extract_page_candidates(backend, page_number, page)?;
        log::debug!("page {page_number}: {} text boxes", found.len());
        candidates.extend(found);
    }
    Ok(candidates)
}
