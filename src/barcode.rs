//! Barcode decoding over rasterized pages.
//!
//! Runs once after text extraction: every page is rendered to an 8-bit
//! grayscale image and scanned for barcodes. Decoded payloads are appended to
//! the owning page's record in decode order, with a bounding box computed
//! from the decoder's reported points (floored mins, ceiled maxes).

use image::GrayImage;
use rxing::helpers::detect_multiple_in_luma;

use crate::error::Result;
use crate::model::{Barcode, ExtractedDocument};
use crate::source::PageRasterizer;

/// Decode all barcodes in one page image.
///
/// A page with nothing decodable yields an empty list; decoder failures are
/// logged and treated the same way.
pub fn decode_page(image: &GrayImage) -> Vec<Barcode> {
    let (width, height) = image.dimensions();
    let results = match detect_multiple_in_luma(image.as_raw().clone(), width, height) {
        Ok(results) => results,
        Err(e) => {
            log::debug!("barcode scan found nothing: {e}");
            return Vec::new();
        }
    };

    results
        .iter()
        .map(|result| {
            let mut x1 = f32::MAX;
            let mut y1 = f32::MAX;
            let mut x2 = f32::MIN;
            let mut y2 = f32::MIN;
            for point in result.getPoints() {
                x1 = x1.min(point.x);
                y1 = y1.min(point.y);
                x2 = x2.max(point.x);
                y2 = y2.max(point.y);
            }
            let bbox = if x1 <= x2 {
                [
                    x1.floor() as i64,
                    y1.floor() as i64,
                    x2.ceil() as i64,
                    y2.ceil() as i64,
                ]
            } else {
                [0, 0, 0, 0]
            };
            Barcode {
                bbox,
                text: result.getText().to_string(),
            }
        })
        .collect()
}

/// Rasterize the whole document and append decoded barcodes to each page.
pub fn decode_document<R: PageRasterizer>(
    doc: &mut ExtractedDocument,
    raster: &R,
    dpi: u32,
) -> Result<()> {
    let images = raster.rasterize_pages(dpi)?;
    for (index, image) in images.iter().enumerate() {
        let barcodes = decode_page(image);
        match doc.page_mut(index) {
            Some(record) => record.barcodes.extend(barcodes),
            None => log::warn!("rasterizer produced page {index} with no extracted record"),
        }
    }
    Ok(())
}
