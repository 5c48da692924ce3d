//! Outline (bookmark) writing.
//!
//! The source document is kept as is, page objects included, so writing a
//! bookmarked copy never re-renders content. Only the catalog's `/Outlines`
//! and `/PageMode` entries change.

use std::io::Write;

use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, StringFormat};

use tocsmith_core::OutlineTree;

use crate::backend::LopdfBackend;
use crate::PdfError;

/// Refers to an entry added with [`BookmarkWriter::add_outline_entry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutlineHandle(usize);

#[derive(Debug)]
struct PendingEntry {
    title: String,
    page_index: usize,
    parent: Option<usize>,
    children: Vec<usize>,
}

pub struct BookmarkWriter {
    doc: Document,
    page_ids: Vec<ObjectId>,
    entries: Vec<PendingEntry>,
    roots: Vec<usize>,
}

impl BookmarkWriter {
    /// Load a PDF and drop any outline it already has.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PdfError> {
        let mut doc = LopdfBackend::load_bytes(bytes)?.into_document();
        let page_ids: Vec<ObjectId> = doc.get_pages().into_values().collect();

        let catalog = catalog_mut(&mut doc)?;
        if catalog.remove(b"Outlines").is_some() {
            if catalog
                .get(b"PageMode")
                .and_then(Object::as_name)
                .is_ok_and(|mode| mode == b"UseOutlines")
            {
                catalog.remove(b"PageMode");
            }
            let pruned = doc.prune_objects();
            log::debug!("dropped existing outline ({} objects)", pruned.len());
        }

        Ok(BookmarkWriter {
            doc,
            page_ids,
            entries: Vec::new(),
            roots: Vec::new(),
        })
    }

    pub fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Append an outline entry pointing at the zero-based `page_index`.
    ///
    /// Entries become the last child of `parent`, or the last top-level
    /// entry. Out-of-range page indices are clamped to the last page.
    pub fn add_outline_entry(
        &mut self,
        title: &str,
        page_index: usize,
        parent: Option<OutlineHandle>,
    ) -> Result<OutlineHandle, PdfError> {
        let idx = self.entries.len();
        match parent {
            Some(OutlineHandle(p)) => self
                .entries
                .get_mut(p)
                .ok_or(PdfError::UnknownParent(p))?
                .children
                .push(idx),
            None => self.roots.push(idx),
        }

        self.entries.push(PendingEntry {
            title: title.to_string(),
            page_index: page_index.min(self.page_ids.len().saturating_sub(1)),
            parent: parent.map(|OutlineHandle(p)| p),
            children: Vec::new(),
        });
        Ok(OutlineHandle(idx))
    }

    /// Add every node of `outline` in emission order, parents first.
    pub fn add_outline(&mut self, outline: &OutlineTree) -> Result<(), PdfError> {
        let mut handles: Vec<OutlineHandle> = Vec::with_capacity(outline.len());
        for node in outline.nodes() {
            let parent = node.parent.and_then(|idx| handles.get(idx).copied());
            handles.push(self.add_outline_entry(node.heading.title(), node.page_index, parent)?);
        }
        Ok(())
    }

    /// Serialize the document with its new outline. Every entry is open.
    pub fn write_to<W: Write>(mut self, out: &mut W) -> Result<(), PdfError> {
        if !self.entries.is_empty() {
            self.build_outline()?;
        }
        self.doc
            .save_to(out)
            .map_err(|e| PdfError::Write(e.to_string()))?;
        Ok(())
    }

    fn build_outline(&mut self) -> Result<(), PdfError> {
        let root_id = self.doc.new_object_id();
        let ids: Vec<ObjectId> = self
            .entries
            .iter()
            .map(|_| self.doc.new_object_id())
            .collect();

        // Open entries count every visible descendant. Children always come
        // after their parent, so a reverse pass sees them first.
        let mut visible = vec![0_i64; self.entries.len()];
        for idx in (0..self.entries.len()).rev() {
            visible[idx] = self.entries[idx]
                .children
                .iter()
                .map(|&c| 1 + visible[c])
                .sum();
        }

        for (idx, entry) in self.entries.iter().enumerate() {
            let siblings = match entry.parent {
                Some(p) => &self.entries[p].children,
                None => &self.roots,
            };
            let pos = siblings.iter().position(|&s| s == idx).unwrap_or(0);

            let mut dict = dictionary! {
                "Title" => encode_text_string(&entry.title),
                "Parent" => entry.parent.map_or(root_id, |p| ids[p]),
            };
            if let Some(&page_id) = self.page_ids.get(entry.page_index) {
                dict.set("Dest", vec![Object::Reference(page_id), "Fit".into()]);
            }
            if pos > 0 {
                dict.set("Prev", ids[siblings[pos - 1]]);
            }
            if let Some(&next) = siblings.get(pos + 1) {
                dict.set("Next", ids[next]);
            }
            if let (Some(&first), Some(&last)) = (entry.children.first(), entry.children.last()) {
                dict.set("First", ids[first]);
                dict.set("Last", ids[last]);
                dict.set("Count", visible[idx]);
            }
            self.doc.objects.insert(ids[idx], Object::Dictionary(dict));
        }

        let total: i64 = self.roots.iter().map(|&r| 1 + visible[r]).sum();
        let (first, last) = match (self.roots.first(), self.roots.last()) {
            (Some(&f), Some(&l)) => (ids[f], ids[l]),
            _ => return Ok(()),
        };
        self.doc.objects.insert(
            root_id,
            Object::Dictionary(dictionary! {
                "Type" => "Outlines",
                "First" => first,
                "Last" => last,
                "Count" => total,
            }),
        );

        let catalog = catalog_mut(&mut self.doc)?;
        catalog.set("Outlines", root_id);
        catalog.set("PageMode", "UseOutlines");
        Ok(())
    }
}

fn catalog_mut(doc: &mut Document) -> Result<&mut Dictionary, PdfError> {
    let root_id = doc.trailer.get(b"Root")?.as_reference()?;
    Ok(doc.get_object_mut(root_id)?.as_dict_mut()?)
}

/// A PDF text string: literal for ASCII, UTF-16BE with a BOM otherwise.
pub fn encode_text_string(text: &str) -> Object {
    if text.is_ascii() {
        return Object::String(text.as_bytes().to_vec(), StringFormat::Literal);
    }
    let mut bytes = vec![0xFE, 0xFF];
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    Object::String(bytes, StringFormat::Hexadecimal)
}
