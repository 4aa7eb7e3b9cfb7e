//! Document source abstraction.
//!
//! Provides a trait-based interface between the extraction heuristics and the
//! concrete PDF library, so the classifier can be driven by a real document
//! ([`crate::pdf::PdfSource`]) or by fixture pages held in memory.

use image::GrayImage;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A run of text with uniform font attributes, as reported by the PDF layer.
///
/// The bbox is kept as a raw vector: arity is validated downstream so a
/// malformed box surfaces as [`Error::MalformedBbox`](crate::Error) rather
/// than being silently reshaped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawSpan {
    pub text: String,
    /// Effective font size in points
    pub size: f64,
    /// Base font name
    pub font: String,
    /// Fill color packed as 0xRRGGBB
    pub color: u32,
    /// Opacity, 0-255
    pub alpha: u32,
    /// `(x1, y1, x2, y2)`, top-left origin
    pub bbox: Vec<f64>,
}

/// A line of spans sharing one baseline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawLine {
    pub spans: Vec<RawSpan>,
}

/// A block of lines (one `BT..ET` region in a real PDF).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawBlock {
    pub lines: Vec<RawLine>,
}

/// Everything the extractor needs from one page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawPage {
    pub width: f64,
    pub height: f64,
    /// Text content in native reading order
    pub blocks: Vec<RawBlock>,
    /// Vector-drawn rectangles, top-left origin, unfiltered
    pub rects: Vec<[f64; 4]>,
}

impl RawPage {
    /// Create an empty page with the given dimensions.
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            blocks: Vec::new(),
            rects: Vec::new(),
        }
    }
}

/// Abstract interface for structured page access.
pub trait DocumentSource {
    /// Number of pages in the document.
    fn page_count(&self) -> usize;

    /// Structured content of one page (zero-based index).
    fn page(&self, index: usize) -> Result<RawPage>;
}

/// Whole-document page rasterization for the barcode pass.
///
/// Modeled as a single conversion over all pages, mirroring how a poppler
/// style converter renders a document in one call.
pub trait PageRasterizer {
    /// Render every page to an 8-bit grayscale image at the given DPI.
    fn rasterize_pages(&self, dpi: u32) -> Result<Vec<GrayImage>>;
}

/// In-memory document source for fixtures and tests.
///
/// Implements both [`DocumentSource`] and [`PageRasterizer`]; pages without a
/// stored image rasterize to a blank white page at the requested DPI.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    pages: Vec<RawPage>,
    images: Vec<Option<GrayImage>>,
}

impl MemorySource {
    /// Create a source from structured pages.
    pub fn new(pages: Vec<RawPage>) -> Self {
        let images = vec![None; pages.len()];
        Self { pages, images }
    }

    /// Attach a pre-rendered image to a page.
    ///
    /// The image is returned as-is by [`PageRasterizer::rasterize_pages`],
    /// regardless of the requested DPI.
    pub fn set_page_image(&mut self, index: usize, image: GrayImage) {
        if index < self.images.len() {
            self.images[index] = Some(image);
        }
    }

    /// Add a page, returning its index.
    pub fn push_page(&mut self, page: RawPage) -> usize {
        self.pages.push(page);
        self.images.push(None);
        self.pages.len() - 1
    }
}

impl DocumentSource for MemorySource {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page(&self, index: usize) -> Result<RawPage> {
        self.pages
            .get(index)
            .cloned()
            .ok_or(Error::PageOutOfRange(index, self.pages.len()))
    }
}

impl PageRasterizer for MemorySource {
    fn rasterize_pages(&self, dpi: u32) -> Result<Vec<GrayImage>> {
        let scale = f64::from(dpi) / 72.0;
        let mut out = Vec::with_capacity(self.pages.len());
        for (page, image) in self.pages.iter().zip(self.images.iter()) {
            match image {
                Some(img) => out.push(img.clone()),
                None => {
                    let w = ((page.width * scale).round() as u32).max(1);
                    let h = ((page.height * scale).round() as u32).max(1);
                    out.push(GrayImage::from_pixel(w, h, image::Luma([255u8])));
                }
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_source_page_lookup() {
        let source = MemorySource::new(vec![RawPage::new(612.0, 792.0)]);
        assert_eq!(source.page_count(), 1);
        assert_eq!(source.page(0).unwrap().width, 612.0);
        assert!(matches!(
            source.page(1),
            Err(Error::PageOutOfRange(1, 1))
        ));
    }

    #[test]
    fn test_memory_source_blank_raster() {
        let source = MemorySource::new(vec![RawPage::new(612.0, 792.0)]);
        let images = source.rasterize_pages(72).unwrap();
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].dimensions(), (612, 792));
        assert_eq!(images[0].get_pixel(0, 0).0, [255]);
    }

    #[test]
    fn test_memory_source_stored_image_wins() {
        let mut source = MemorySource::new(vec![RawPage::new(612.0, 792.0)]);
        source.set_page_image(0, GrayImage::from_pixel(10, 10, image::Luma([0u8])));
        let images = source.rasterize_pages(300).unwrap();
        assert_eq!(images[0].dimensions(), (10, 10));
    }

    #[test]
    fn test_raw_page_fixture_round_trip() {
        let json = r#"{
            "width": 612.0,
            "height": 792.0,
            "blocks": [
                {"lines": [{"spans": [{
                    "text": "Name: John",
                    "size": 9.0,
                    "font": "Helvetica",
                    "color": 0,
                    "alpha": 255,
                    "bbox": [30.0, 100.0, 90.0, 110.0]
                }]}]}
            ],
            "rects": [[50.0, 200.0, 300.0, 260.0]]
        }"#;
        let page: RawPage = serde_json::from_str(json).unwrap();
        assert_eq!(page.blocks[0].lines[0].spans[0].text, "Name: John");
        assert_eq!(page.rects.len(), 1);
    }
}
