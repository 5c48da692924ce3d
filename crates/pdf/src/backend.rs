use std::collections::BTreeMap;

use lopdf::content::Content;

use crate::{DocumentMetadata, PdfError};

/// A page identifier mirroring `lopdf::ObjectId`: (object number, generation number).
pub type PageId = (u32, u16);

/// A font declared in a page's `/Resources`.
#[derive(Debug, Clone, Default)]
pub struct FontInfo {
    /// Resource key as used by `Tf` (e.g. `b"F1"`).
    pub key: Vec<u8>,
    /// `/Encoding` name, when the font declares one by name.
    pub encoding: Option<String>,
}

/// A content-stream operand, reduced to what the text extractor needs.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Number(f32),
    Name(Vec<u8>),
    Str(Vec<u8>),
    Array(Vec<Operand>),
    Other,
}

impl Operand {
    pub fn as_number(&self) -> Option<f32> {
        match self {
            Operand::Number(n) => Some(*n),
            _ => None,
        }
    }
}

impl From<&lopdf::Object> for Operand {
    fn from(obj: &lopdf::Object) -> Self {
        match obj {
            lopdf::Object::Integer(i) => Operand::Number(*i as f32),
            lopdf::Object::Real(f) => Operand::Number(*f),
            lopdf::Object::Name(n) => Operand::Name(n.clone()),
            lopdf::Object::String(s, _) => Operand::Str(s.clone()),
            lopdf::Object::Array(items) => Operand::Array(items.iter().map(Operand::from).collect()),
            _ => Operand::Other,
        }
    }
}

/// A single content-stream operation (operator + operands).
#[derive(Debug, Clone)]
pub struct ContentOp {
    pub operator: String,
    pub operands: Vec<Operand>,
}

impl ContentOp {
    /// Numeric operand at `idx`, if present and numeric.
    pub fn number(&self, idx: usize) -> Option<f32> {
        self.operands.get(idx).and_then(Operand::as_number)
    }
}

/// Decode a PDF string without font information.
///
/// UTF-16BE with a BOM first, then UTF-8, then Latin-1 as a last resort.
pub fn decode_pdf_string(bytes: &[u8]) -> String {
    if let Some(payload) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = payload
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }

    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}

/// Read access to a PDF's pages and content streams.
///
/// The text extractor only talks to this trait so it can be driven by
/// hand-written operator lists in tests.
pub trait PdfBackend {
    /// 1-based page number to page object id, in page order.
    fn pages(&self) -> BTreeMap<u32, PageId>;

    fn page_fonts(&self, page: PageId) -> Result<Vec<FontInfo>, PdfError>;

    /// Raw content bytes for a page, all content streams concatenated.
    fn page_content(&self, page: PageId) -> Result<Vec<u8>, PdfError>;

    fn decode_content(&self, data: &[u8]) -> Result<Vec<ContentOp>, PdfError>;

    /// Decode a shown string in `font`, the font selected by the last `Tf`.
    fn decode_text(&self, font: Option<&FontInfo>, bytes: &[u8]) -> String;
}

/// [`PdfBackend`] backed by a loaded [`lopdf::Document`].
pub struct LopdfBackend {
    doc: lopdf::Document,
}

impl LopdfBackend {
    /// Parse a PDF from memory. Encrypted documents are rejected.
    pub fn load_bytes(data: &[u8]) -> Result<Self, PdfError> {
        let doc = lopdf::Document::load_mem(data).map_err(|e| PdfError::Parse(e.to_string()))?;

        if doc.is_encrypted() {
            return Err(PdfError::Encrypted);
        }

        Ok(Self { doc })
    }

    pub fn page_count(&self) -> usize {
        self.doc.get_pages().len()
    }

    /// Give up the backend and keep the parsed document for writing.
    pub fn into_document(self) -> lopdf::Document {
        self.doc
    }

    /// Document information dictionary plus the page count.
    pub fn metadata(&self) -> DocumentMetadata {
        DocumentMetadata {
            title: self.info_entry(b"Title"),
            author: self.info_entry(b"Author"),
            creator: self.info_entry(b"Creator"),
            page_count: self.page_count(),
        }
    }

    fn info_dict(&self) -> Option<&lopdf::Dictionary> {
        match self.doc.trailer.get(b"Info").ok()? {
            lopdf::Object::Reference(id) => self.doc.get_dictionary(*id).ok(),
            lopdf::Object::Dictionary(d) => Some(d),
            _ => None,
        }
    }

    fn info_entry(&self, key: &[u8]) -> Option<String> {
        match self.info_dict()?.get(key).ok()? {
            lopdf::Object::String(bytes, _) => Some(decode_pdf_string(bytes)),
            lopdf::Object::Name(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
            _ => None,
        }
    }
}

impl PdfBackend for LopdfBackend {
    fn pages(&self) -> BTreeMap<u32, PageId> {
        self.doc.get_pages()
    }

    fn page_fonts(&self, page: PageId) -> Result<Vec<FontInfo>, PdfError> {
        let fonts = self
            .doc
            .get_page_fonts(page)
            .map_err(|e| PdfError::Parse(format!("cannot get page fonts: {e}")))?;

        Ok(fonts
            .iter()
            .map(|(key, dict)| FontInfo {
                key: key.clone(),
                encoding: dict
                    .get(b"Encoding")
                    .ok()
                    .and_then(|o| o.as_name().ok())
                    .map(|n| String::from_utf8_lossy(n).into_owned()),
            })
            .collect())
    }

    fn page_content(&self, page: PageId) -> Result<Vec<u8>, PdfError> {
        self.doc
            .get_page_content(page)
            .map_err(|e| PdfError::Parse(format!("cannot get page content: {e}")))
    }

    fn decode_content(&self, data: &[u8]) -> Result<Vec<ContentOp>, PdfError> {
        let content = Content::decode(data)
            .map_err(|e| PdfError::Parse(format!("content stream decode error: {e}")))?;

        Ok(content
            .operations
            .into_iter()
            .map(|op| ContentOp {
                operands: op.operands.iter().map(Operand::from).collect(),
                operator: op.operator,
            })
            .collect())
    }

    fn decode_text(&self, font: Option<&FontInfo>, bytes: &[u8]) -> String {
        // Identity-H/V fonts show 2-byte codes; many producers make them Unicode.
        let identity = font
            .and_then(|f| f.encoding.as_deref())
            .is_some_and(|enc| enc.contains("Identity"));
        if identity && !bytes.is_empty() && bytes.len() % 2 == 0 {
            let units: Vec<u16> = bytes
                .chunks_exact(2)
                .map(|c| u16::from_be_bytes([c[0], c[1]]))
                .collect();
            let decoded = String::from_utf16_lossy(&units);
            if !decoded.chars().all(|c| c == '\u{FFFD}' || c == '\0') {
                return decoded;
            }
        }

        decode_pdf_string(bytes)
    }
}
