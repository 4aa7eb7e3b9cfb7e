//! # pdfsnap
//!
//! Visual-regression testing for generated PDF documents.
//!
//! pdfsnap extracts a structural snapshot from a PDF (titles, key/value
//! pairs, boxed regions and barcodes, each with pixel bounding boxes),
//! persists it as JSON, and compares later renditions against that master
//! with a positional tolerance.
//!
//! ## Quick Start
//!
//! ```no_run
//! use pdfsnap::{extract_file, snapshot, CompareOptions, Comparator};
//!
//! fn main() -> pdfsnap::Result<()> {
//!     // Extract the reference document and store it as the master
//!     let master = extract_file("fixtures/master.pdf")?;
//!     snapshot::save("fixtures/master_data.json", &master)?;
//!
//!     // Check a candidate rendition against it
//!     let candidate = extract_file("output/invoice_0042.pdf")?;
//!     let report = Comparator::new(CompareOptions::default()).compare(&master, &candidate);
//!     report.into_result()?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Structural snapshots**: titles, key/value pairs, rectangles, barcodes
//! - **Tolerant comparison**: absolute pixel tolerance, or strict mode
//! - **Stable JSON**: insertion-ordered maps, reproducible snapshot files
//! - **Barcode pass**: pages rasterized via pdfium and scanned with rxing
//!   (behind the default `raster` feature)

pub mod barcode;
pub mod compare;
pub mod error;
pub mod extract;
pub mod fixtures;
pub mod geometry;
pub mod model;
pub mod pdf;
pub mod snapshot;
pub mod source;
pub mod table;

#[cfg(feature = "raster")]
pub mod raster;

// Re-export commonly used types
pub use compare::{CompareOptions, CompareReport, Comparator, Mismatch};
pub use error::{Error, Result};
pub use extract::{ExtractOptions, Extractor, TITLE_SIZE_THRESHOLD};
pub use fixtures::{testing_file_paths, HarnessPaths};
pub use model::{Barcode, ExtractedDocument, KeyValue, PageRecord, Rectangle, TextDatum};
pub use pdf::PdfSource;
pub use source::{DocumentSource, MemorySource, PageRasterizer, RawPage};

#[cfg(feature = "raster")]
pub use raster::PdfiumRasterizer;

use std::path::Path;

/// Extract a structural snapshot from a PDF file with default options.
///
/// Runs the text and rectangle passes only; use
/// [`extract_file_with_barcodes`] to include the barcode pass.
///
/// # Example
///
/// ```no_run
/// use pdfsnap::extract_file;
///
/// let doc = extract_file("document.pdf").unwrap();
/// println!("Pages: {}", doc.page_count());
/// ```
pub fn extract_file<P: AsRef<Path>>(path: P) -> Result<ExtractedDocument> {
    extract_file_with_options(path, ExtractOptions::default())
}

/// Extract a structural snapshot from a PDF file with custom options.
pub fn extract_file_with_options<P: AsRef<Path>>(
    path: P,
    options: ExtractOptions,
) -> Result<ExtractedDocument> {
    let source = PdfSource::open(path)?;
    Extractor::new(options).extract(&source)
}

/// Extract a structural snapshot from PDF bytes.
pub fn extract_bytes(data: &[u8]) -> Result<ExtractedDocument> {
    let source = PdfSource::from_bytes(data)?;
    Extractor::new(ExtractOptions::default()).extract(&source)
}

/// Extract a structural snapshot including decoded barcodes.
///
/// Pages are rasterized with pdfium at the DPI from `options` and scanned
/// for barcodes after the text pass.
#[cfg(feature = "raster")]
pub fn extract_file_with_barcodes<P: AsRef<Path>>(
    path: P,
    options: ExtractOptions,
) -> Result<ExtractedDocument> {
    let path = path.as_ref();
    let source = PdfSource::open(path)?;
    let rasterizer = PdfiumRasterizer::open(path)?;
    Extractor::new(options).extract_with_raster(&source, &rasterizer)
}

/// Compare a candidate extraction against a master with default options.
pub fn compare(master: &ExtractedDocument, candidate: &ExtractedDocument) -> CompareReport {
    Comparator::new(CompareOptions::default()).compare(master, candidate)
}

/// Extract a candidate file and compare it against an in-memory master.
pub fn check_file<P: AsRef<Path>>(
    master: &ExtractedDocument,
    path: P,
    extract_options: ExtractOptions,
    compare_options: CompareOptions,
) -> Result<CompareReport> {
    let candidate = extract_file_with_options(path, extract_options)?;
    Ok(Comparator::new(compare_options).compare(master, &candidate))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{MemorySource, RawBlock, RawLine, RawSpan};

    fn one_page_source() -> MemorySource {
        let mut page = RawPage::new(612.0, 792.0);
        page.blocks.push(RawBlock {
            lines: vec![RawLine {
                spans: vec![RawSpan {
                    text: "Name: John".to_string(),
                    size: 9.0,
                    font: "Helvetica".to_string(),
                    color: 0,
                    alpha: 255,
                    bbox: vec![30.0, 100.0, 90.0, 110.0],
                }],
            }],
        });
        MemorySource::new(vec![page])
    }

    #[test]
    fn test_compare_matches_self() {
        let doc = Extractor::new(ExtractOptions::default())
            .extract(&one_page_source())
            .unwrap();
        assert!(compare(&doc, &doc).is_match());
    }

    #[test]
    fn test_extract_bytes_rejects_garbage() {
        assert!(extract_bytes(b"not a pdf").is_err());
    }
}
