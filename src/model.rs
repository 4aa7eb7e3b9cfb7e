//! Extracted document model.
//!
//! This is the intermediate representation shared by extraction, snapshot
//! storage and comparison: one record per page, each holding the classified
//! titles, key/value text pairs, rectangles and barcodes. The JSON shape is
//! stable — snapshots written by one version must load in the next.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::geometry::BBox;

/// A text span with uniform font attributes, as stored in the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextDatum {
    /// The span text (titles and keys are trimmed, values keep leading space)
    pub text: String,
    /// Font size in points, rounded to one decimal
    pub size: f64,
    /// Base font name (e.g., "Helvetica-Bold")
    pub font: String,
    /// Fill color packed as 0xRRGGBB
    pub color: u32,
    /// Opacity, 0-255
    pub alpha: u32,
    /// Bounding box with floored coordinates
    pub bbox: BBox,
}

/// A key paired with its (possibly still unresolved) value span.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyValue {
    pub key_data: TextDatum,
    pub value_data: Option<TextDatum>,
}

/// A vector-drawn rectangle with the text accumulated inside it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rectangle {
    /// Concatenation of contained span texts, in encounter order, no separator
    pub text: String,
    pub bbox: BBox,
}

/// A decoded barcode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Barcode {
    pub bbox: BBox,
    pub text: String,
}

/// Everything extracted from a single page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageRecord {
    /// Spans whose font size exceeds the title threshold, in reading order
    pub titles: Vec<TextDatum>,
    /// Key → key/value pair; a duplicate key overwrites in place
    pub text_data: IndexMap<String, KeyValue>,
    /// Rectangles in drawing order; populated before span classification
    pub rectangles: Vec<Rectangle>,
    /// Barcodes in decode order, appended by the final barcode pass
    pub barcodes: Vec<Barcode>,
}

/// A full extraction result: `"page_<n>"` → [`PageRecord`], in page order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExtractedDocument {
    pages: IndexMap<String, PageRecord>,
}

impl ExtractedDocument {
    /// Create an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// The snapshot key for a zero-based page index.
    pub fn page_key(index: usize) -> String {
        format!("page_{index}")
    }

    /// Number of pages in the document.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Insert an empty record for a page, returning a mutable reference to it.
    pub fn insert_page(&mut self, index: usize) -> &mut PageRecord {
        self.pages
            .entry(Self::page_key(index))
            .or_insert_with(PageRecord::default)
    }

    /// Look up a page record by index.
    pub fn page(&self, index: usize) -> Option<&PageRecord> {
        self.pages.get(Self::page_key(index).as_str())
    }

    /// Mutable page lookup by index.
    pub fn page_mut(&mut self, index: usize) -> Option<&mut PageRecord> {
        self.pages.get_mut(Self::page_key(index).as_str())
    }

    /// Look up a page record by its snapshot key (`"page_0"`, ...).
    pub fn page_by_key(&self, key: &str) -> Option<&PageRecord> {
        self.pages.get(key)
    }

    /// Iterate `(key, record)` pairs in page order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &PageRecord)> {
        self.pages.iter()
    }
}
