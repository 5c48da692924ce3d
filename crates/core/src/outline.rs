use serde::{Deserialize, Serialize};

use crate::heading::Heading;

/// Build a tree from a flat, ordered sequence of leveled items.
///
/// Items are visited in input order. Before an item is created, every open
/// ancestor whose level is `>=` the item's level is closed, so the remaining
/// top of the stack (if any) is a strictly shallower item and becomes the
/// parent. Skipped levels are allowed: a level 4 item right after a level 1
/// item nests directly under it.
///
/// `create` receives the item and its parent handle and returns the handle of
/// the new node. Handles are returned in creation order, which always places
/// a parent before its children.
pub fn assemble<T, H, L, F>(items: impl IntoIterator<Item = T>, mut level_of: L, mut create: F) -> Vec<H>
where
    H: Clone,
    L: FnMut(&T) -> u8,
    F: FnMut(T, Option<&H>) -> H,
{
    let mut stack: Vec<(u8, H)> = Vec::new();
    let mut handles = Vec::new();

    for item in items {
        let level = level_of(&item);

        while let Some((top_level, _)) = stack.last() {
            if *top_level >= level {
                stack.pop();
            } else {
                break;
            }
        }

        let handle = create(item, stack.last().map(|(_, h)| h));
        stack.push((level, handle.clone()));
        handles.push(handle);
    }

    handles
}

/// One outline entry, linked to its parent by index into the owning
/// [`OutlineTree`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutlineNode {
    pub heading: Heading,
    /// Zero-based page index, always inside the target document.
    pub page_index: usize,
    pub parent: Option<usize>,
}

/// Arena of outline nodes in emission order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutlineTree {
    nodes: Vec<OutlineNode>,
}

/// Nested, owned view of an outline used for previews and JSON output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutlineEntry {
    pub title: String,
    pub page_index: usize,
    pub level: u8,
    pub children: Vec<OutlineEntry>,
}

impl OutlineTree {
    pub fn nodes(&self) -> &[OutlineNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Indices of the top-level nodes.
    pub fn roots(&self) -> Vec<usize> {
        self.children_where(|parent| parent.is_none())
    }

    /// Indices of the direct children of `index`, in order.
    pub fn children(&self, index: usize) -> Vec<usize> {
        self.children_where(|parent| parent == Some(index))
    }

    /// Number of ancestors above `index` (roots have depth 0).
    pub fn depth(&self, index: usize) -> usize {
        let mut depth = 0;
        let mut current = self.nodes.get(index).and_then(|n| n.parent);
        while let Some(parent) = current {
            depth += 1;
            current = self.nodes[parent].parent;
        }
        depth
    }

    pub fn nested(&self) -> Vec<OutlineEntry> {
        self.roots()
            .into_iter()
            .map(|idx| self.entry_at(idx))
            .collect()
    }

    fn entry_at(&self, index: usize) -> OutlineEntry {
        let node = &self.nodes[index];
        OutlineEntry {
            title: node.heading.title().to_string(),
            page_index: node.page_index,
            level: node.heading.level().as_u8(),
            children: self
                .children(index)
                .into_iter()
                .map(|child| self.entry_at(child))
                .collect(),
        }
    }

    fn children_where(&self, pred: impl Fn(Option<usize>) -> bool) -> Vec<usize> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| pred(n.parent))
            .map(|(i, _)| i)
            .collect()
    }
}

/// Clamp a 1-based page number into `0..page_count` as a zero-based index.
pub fn page_index(page: u32, page_count: usize) -> usize {
    (page as usize)
        .saturating_sub(1)
        .min(page_count.saturating_sub(1))
}

/// Assemble canonically ordered headings into an outline for a document with
/// `page_count` pages.
///
/// The input is not re-sorted: the shape of the tree follows input order.
pub fn build_outline(headings: impl IntoIterator<Item = Heading>, page_count: usize) -> OutlineTree {
    let mut nodes: Vec<OutlineNode> = Vec::new();

    assemble(
        headings,
        |h: &Heading| h.level().as_u8(),
        |heading, parent: Option<&usize>| {
            nodes.push(OutlineNode {
                page_index: page_index(heading.page(), page_count),
                heading,
                parent: parent.copied(),
            });
            nodes.len() - 1
        },
    );

    OutlineTree { nodes }
}
