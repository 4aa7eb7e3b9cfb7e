//! Extraction engine: drives per-page iteration and span classification.
//!
//! One [`Extractor`] instance handles one document. The pending-key state is
//! explicit instance state and carries across page boundaries within that
//! document (a trailing key on page N is resolved into page N's record by the
//! first qualifying span of page N+1), but never across documents.

use crate::barcode;
use crate::error::Result;
use crate::geometry::{self, floor_bbox};
use crate::model::{ExtractedDocument, KeyValue, Rectangle, TextDatum};
use crate::source::{DocumentSource, PageRasterizer, RawPage, RawSpan};

/// Font size above which a span is classified as a title.
pub const TITLE_SIZE_THRESHOLD: f64 = 10.0;

/// Options for document extraction.
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Rasterization resolution for the barcode pass
    pub dpi: u32,
    /// Column count used when extending value bounding boxes
    pub columns: u32,
}

impl ExtractOptions {
    /// Create new extract options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the rasterization DPI.
    pub fn with_dpi(mut self, dpi: u32) -> Self {
        self.dpi = dpi;
        self
    }

    /// Set the column count.
    pub fn with_columns(mut self, columns: u32) -> Self {
        self.columns = columns.max(1);
        self
    }
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self { dpi: 72, columns: 1 }
    }
}

/// A key waiting for its value span, remembered with the page it was seen on.
#[derive(Debug, Clone)]
struct PendingKey {
    page: usize,
    key: String,
}

/// Single-document extraction engine.
///
/// Create one extractor per document; the pending-key state must not be
/// shared across concurrent extractions.
pub struct Extractor {
    options: ExtractOptions,
    page_width: Option<i64>,
    pending: Option<PendingKey>,
    doc: ExtractedDocument,
}

impl Extractor {
    /// Create a new extractor.
    pub fn new(options: ExtractOptions) -> Self {
        Self {
            options,
            page_width: None,
            pending: None,
            doc: ExtractedDocument::new(),
        }
    }

    /// Extract titles, key/value pairs and rectangles from every page.
    pub fn extract<S: DocumentSource>(mut self, source: &S) -> Result<ExtractedDocument> {
        for index in 0..source.page_count() {
            let page = source.page(index)?;
            self.extract_page(index, &page)?;
        }
        Ok(self.doc)
    }

    /// Extract everything, including the barcode pass over rasterized pages.
    pub fn extract_with_raster<S, R>(mut self, source: &S, raster: &R) -> Result<ExtractedDocument>
    where
        S: DocumentSource,
        R: PageRasterizer,
    {
        for index in 0..source.page_count() {
            let page = source.page(index)?;
            self.extract_page(index, &page)?;
        }
        barcode::decode_document(&mut self.doc, raster, self.options.dpi)?;
        Ok(self.doc)
    }

    fn extract_page(&mut self, index: usize, page: &RawPage) -> Result<()> {
        // Assumes a uniform page width across the document; the last page
        // seen wins, matching the reference behavior.
        self.page_width = Some(page.width.round() as i64);
        self.doc.insert_page(index);

        // Rectangles first: span classification needs them for containment
        self.add_rectangles(index, page);

        for block in &page.blocks {
            for line in &block.lines {
                for span in &line.spans {
                    let text = span.text.trim();
                    if text.is_empty() {
                        continue;
                    }
                    if span.size > TITLE_SIZE_THRESHOLD {
                        self.add_title(index, span)?;
                    } else {
                        self.add_text(index, span)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn add_rectangles(&mut self, index: usize, page: &RawPage) {
        let Some(record) = self.doc.page_mut(index) else {
            return;
        };
        for rect in &page.rects {
            let bbox = [
                rect[0].ceil() as i64,
                rect[1].ceil() as i64,
                rect[2].floor() as i64,
                rect[3].floor() as i64,
            ];
            // Rectangles touching a page edge are decorative noise
            if bbox.contains(&0) {
                continue;
            }
            record.rectangles.push(Rectangle {
                text: String::new(),
                bbox,
            });
        }
    }

    fn add_title(&mut self, index: usize, span: &RawSpan) -> Result<()> {
        let extended = geometry::extend_bbox(&span.bbox, self.page_width, self.options.columns, true)?;
        let datum = text_datum(span.text.trim(), span, &extended);
        if let Some(record) = self.doc.page_mut(index) {
            record.titles.push(datum);
        }
        Ok(())
    }

    fn add_text(&mut self, index: usize, span: &RawSpan) -> Result<()> {
        let text = span.text.trim().to_string();

        if self.pending.is_some() && self.try_add_to_rectangle(index, span, &text) {
            return Ok(());
        }

        if let Some(colon) = text.find(':') {
            let key = text[..colon].trim().to_string();
            let key_text = &text[..=colon];
            let value_text = &text[colon + 1..];

            self.pending = Some(PendingKey {
                page: index,
                key: key.clone(),
            });

            // The key keeps the tight glyph box; only the value reaches out
            // to the column boundary.
            let key_data = text_datum(key_text, span, &geometry::to_quad(&span.bbox)?);
            let extended =
                geometry::extend_bbox(&span.bbox, self.page_width, self.options.columns, false)?;
            let value_data = if value_text.is_empty() {
                None
            } else {
                Some(text_datum(value_text, span, &extended))
            };

            if let Some(record) = self.doc.page_mut(index) {
                record.text_data.insert(key, KeyValue { key_data, value_data });
            }
        } else if let Some(pending) = self.pending.take() {
            let extended =
                geometry::extend_bbox(&span.bbox, self.page_width, self.options.columns, false)?;
            let value_data = text_datum(&text, span, &extended);
            // The value resolves into the page where its key was recorded,
            // which may be an earlier page.
            if let Some(entry) = self
                .doc
                .page_mut(pending.page)
                .and_then(|p| p.text_data.get_mut(&pending.key))
            {
                entry.value_data = Some(value_data);
            } else {
                log::warn!("pending key '{}' vanished before resolution", pending.key);
            }
        } else {
            self.pending = Some(PendingKey {
                page: index,
                key: text.clone(),
            });
            let key_data = text_datum(&text, span, &geometry::to_quad(&span.bbox)?);
            if let Some(record) = self.doc.page_mut(index) {
                record.text_data.insert(
                    text,
                    KeyValue {
                        key_data,
                        value_data: None,
                    },
                );
            }
        }
        Ok(())
    }

    /// Accumulate the span text into the first enclosing rectangle of the
    /// current page, if any. The pending key is left untouched.
    fn try_add_to_rectangle(&mut self, index: usize, span: &RawSpan, text: &str) -> bool {
        let Ok(span_box) = geometry::to_quad(&span.bbox) else {
            return false;
        };
        let Some(record) = self.doc.page_mut(index) else {
            return false;
        };
        for rect in &mut record.rectangles {
            let outer = [
                rect.bbox[0] as f64,
                rect.bbox[1] as f64,
                rect.bbox[2] as f64,
                rect.bbox[3] as f64,
            ];
            if geometry::bbox_contains(&outer, &span_box) {
                rect.text.push_str(text);
                return true;
            }
        }
        false
    }
}

/// Build a [`TextDatum`] from a span, with an explicit bbox.
fn text_datum(text: &str, span: &RawSpan, bbox: &[f64; 4]) -> TextDatum {
    TextDatum {
        text: text.to_string(),
        size: (span.size * 10.0).round() / 10.0,
        font: span.font.clone(),
        color: span.color,
        alpha: span.alpha,
        bbox: floor_bbox(bbox),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{MemorySource, RawBlock, RawLine};

    fn span(text: &str, size: f64, bbox: [f64; 4]) -> RawSpan {
        RawSpan {
            text: text.to_string(),
            size,
            font: "Helvetica".to_string(),
            color: 0,
            alpha: 255,
            bbox: bbox.to_vec(),
        }
    }

    fn page_with_spans(spans: Vec<RawSpan>) -> RawPage {
        let mut page = RawPage::new(612.0, 792.0);
        page.blocks.push(RawBlock {
            lines: vec![RawLine { spans }],
        });
        page
    }

    fn extract(pages: Vec<RawPage>) -> ExtractedDocument {
        let source = MemorySource::new(pages);
        Extractor::new(ExtractOptions::default())
            .extract(&source)
            .unwrap()
    }

    #[test]
    fn test_title_classification() {
        let page = page_with_spans(vec![span("Invoice", 18.0, [72.0, 40.0, 150.0, 60.0])]);
        let doc = extract(vec![page]);
        let record = doc.page(0).unwrap();
        assert_eq!(record.titles.len(), 1);
        assert_eq!(record.titles[0].text, "Invoice");
        // Extended to the full page width
        assert_eq!(record.titles[0].bbox, [72, 40, 612, 60]);
        assert!(record.text_data.is_empty());
    }

    #[test]
    fn test_title_threshold_is_exclusive() {
        let page = page_with_spans(vec![span("Not a title", 10.0, [72.0, 40.0, 150.0, 50.0])]);
        let doc = extract(vec![page]);
        assert!(doc.page(0).unwrap().titles.is_empty());
    }

    #[test]
    fn test_colon_split_keeps_exact_texts() {
        let page = page_with_spans(vec![span("Name: John", 9.0, [30.0, 100.0, 90.0, 110.0])]);
        let doc = extract(vec![page]);
        let entry = &doc.page(0).unwrap().text_data["Name"];
        assert_eq!(entry.key_data.text, "Name:");
        assert_eq!(entry.key_data.bbox, [30, 100, 90, 110]);
        let value = entry.value_data.as_ref().unwrap();
        assert_eq!(value.text, " John");
        // Value bbox extended to the single-column (full page) width
        assert_eq!(value.bbox, [30, 100, 612, 110]);
    }

    #[test]
    fn test_colon_split_at_first_colon() {
        let page = page_with_spans(vec![span("Time: 10:30", 9.0, [30.0, 100.0, 90.0, 110.0])]);
        let doc = extract(vec![page]);
        let entry = &doc.page(0).unwrap().text_data["Time"];
        assert_eq!(entry.key_data.text, "Time:");
        assert_eq!(entry.value_data.as_ref().unwrap().text, " 10:30");
    }

    #[test]
    fn test_colon_without_value_leaves_none() {
        let page = page_with_spans(vec![span("Name:", 9.0, [30.0, 100.0, 60.0, 110.0])]);
        let doc = extract(vec![page]);
        let entry = &doc.page(0).unwrap().text_data["Name"];
        assert!(entry.value_data.is_none());
    }

    #[test]
    fn test_pending_key_resolved_by_next_span() {
        let page = page_with_spans(vec![
            span("Name", 9.0, [30.0, 100.0, 60.0, 110.0]),
            span("John", 9.0, [120.0, 100.0, 160.0, 110.0]),
        ]);
        let doc = extract(vec![page]);
        let entry = &doc.page(0).unwrap().text_data["Name"];
        assert_eq!(entry.key_data.text, "Name");
        assert_eq!(entry.value_data.as_ref().unwrap().text, "John");
    }

    #[test]
    fn test_pending_key_carries_across_pages() {
        let first = page_with_spans(vec![span("Carrier", 9.0, [30.0, 700.0, 90.0, 710.0])]);
        let second = page_with_spans(vec![span("FedEx", 9.0, [30.0, 40.0, 80.0, 50.0])]);
        let doc = extract(vec![first, second]);
        // The value lands on the page where the key was recorded
        let entry = &doc.page(0).unwrap().text_data["Carrier"];
        assert_eq!(entry.value_data.as_ref().unwrap().text, "FedEx");
        assert!(doc.page(1).unwrap().text_data.is_empty());
    }

    #[test]
    fn test_unresolved_key_stays_none() {
        let page = page_with_spans(vec![span("Orphan", 9.0, [30.0, 100.0, 90.0, 110.0])]);
        let doc = extract(vec![page]);
        assert!(doc.page(0).unwrap().text_data["Orphan"].value_data.is_none());
    }

    #[test]
    fn test_rectangle_accumulates_contained_text() {
        let mut page = page_with_spans(vec![
            // Establishes a pending key
            span("Notes", 9.0, [30.0, 100.0, 70.0, 110.0]),
            // Contained in the rectangle below
            span("hello ", 9.0, [60.0, 210.0, 120.0, 220.0]),
            span("world", 9.0, [60.0, 230.0, 110.0, 240.0]),
        ]);
        page.rects.push([50.0, 200.0, 300.0, 260.0]);
        let doc = extract(vec![page]);
        let record = doc.page(0).unwrap();
        assert_eq!(record.rectangles.len(), 1);
        // Trimmed texts concatenated without separator
        assert_eq!(record.rectangles[0].text, "helloworld");
        // The pending key survives rectangle accumulation
        assert!(record.text_data["Notes"].value_data.is_none());
        assert_eq!(record.text_data.len(), 1);
    }

    #[test]
    fn test_contained_span_without_pending_key_becomes_key() {
        let mut page = page_with_spans(vec![span("inside", 9.0, [60.0, 210.0, 120.0, 220.0])]);
        page.rects.push([50.0, 200.0, 300.0, 260.0]);
        let doc = extract(vec![page]);
        let record = doc.page(0).unwrap();
        assert_eq!(record.rectangles[0].text, "");
        assert!(record.text_data.contains_key("inside"));
    }

    #[test]
    fn test_zero_edge_rectangles_discarded() {
        let mut page = RawPage::new(612.0, 792.0);
        page.rects.push([0.0, 10.0, 100.0, 50.0]);
        page.rects.push([10.0, 10.0, 100.0, 50.0]);
        let doc = extract(vec![page]);
        let record = doc.page(0).unwrap();
        assert_eq!(record.rectangles.len(), 1);
        assert_eq!(record.rectangles[0].bbox, [10, 10, 100, 50]);
    }

    #[test]
    fn test_rectangle_corners_rounded_inward() {
        let mut page = RawPage::new(612.0, 792.0);
        page.rects.push([10.4, 10.6, 100.7, 50.2]);
        let doc = extract(vec![page]);
        assert_eq!(doc.page(0).unwrap().rectangles[0].bbox, [11, 11, 100, 50]);
    }

    #[test]
    fn test_size_rounded_to_one_decimal() {
        let page = page_with_spans(vec![span("Size: test", 9.26, [30.0, 100.0, 90.0, 110.0])]);
        let doc = extract(vec![page]);
        assert_eq!(doc.page(0).unwrap().text_data["Size"].key_data.size, 9.3);
    }

    #[test]
    fn test_extraction_is_idempotent() {
        let build = || {
            let mut page = page_with_spans(vec![
                span("Heading", 14.0, [72.0, 40.0, 160.0, 60.0]),
                span("Name: John", 9.0, [30.0, 100.0, 90.0, 110.0]),
            ]);
            page.rects.push([50.0, 200.0, 300.0, 260.0]);
            vec![page]
        };
        let a = serde_json::to_string(&extract(build())).unwrap();
        let b = serde_json::to_string(&extract(build())).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_multi_column_value_extension() {
        let source = MemorySource::new(vec![page_with_spans(vec![span(
            "Total: 42",
            9.0,
            [320.0, 100.0, 360.0, 110.0],
        )])]);
        let doc = Extractor::new(ExtractOptions::new().with_columns(2))
            .extract(&source)
            .unwrap();
        let value = doc.page(0).unwrap().text_data["Total"]
            .value_data
            .as_ref()
            .unwrap();
        // 612 / 2 = 306 < x1, so the column width is added once more
        assert_eq!(value.bbox, [320, 100, 612, 110]);
    }
}
