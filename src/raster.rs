//! Pdfium-backed page rasterization.
//!
//! Renders whole documents to grayscale images for the barcode pass. Requires
//! the `raster` feature and a pdfium shared library, loaded from the working
//! directory first and the system library path second.

use std::path::{Path, PathBuf};

use image::GrayImage;
use pdfium_render::prelude::*;

use crate::error::{Error, Result};
use crate::source::PageRasterizer;

/// PDF points per inch.
const POINTS_PER_INCH: f32 = 72.0;

/// Renders the pages of one PDF file via pdfium.
pub struct PdfiumRasterizer {
    pdfium: Pdfium,
    path: PathBuf,
}

impl PdfiumRasterizer {
    /// Bind the pdfium library and attach it to a PDF file.
    ///
    /// The document itself is loaded lazily on each
    /// [`rasterize_pages`](PageRasterizer::rasterize_pages) call.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bindings = Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library())
            .map_err(|e| Error::Raster(format!("failed to bind pdfium library: {e}")))?;
        Ok(Self {
            pdfium: Pdfium::new(bindings),
            path: path.as_ref().to_path_buf(),
        })
    }
}

impl PageRasterizer for PdfiumRasterizer {
    fn rasterize_pages(&self, dpi: u32) -> Result<Vec<GrayImage>> {
        let document = self
            .pdfium
            .load_pdf_from_file(&self.path, None)
            .map_err(|e| Error::Raster(format!("failed to load {}: {e}", self.path.display())))?;

        let scale = dpi as f32 / POINTS_PER_INCH;
        let mut images = Vec::with_capacity(document.pages().len() as usize);
        for page in document.pages().iter() {
            let pixel_width = (page.width().value * scale) as i32;
            let pixel_height = (page.height().value * scale) as i32;
            let bitmap = page
                .render_with_config(
                    &PdfRenderConfig::new()
                        .set_target_width(pixel_width)
                        .set_target_height(pixel_height),
                )
                .map_err(|e| Error::Raster(format!("failed to render page: {e}")))?;
            images.push(bitmap.as_image().to_luma8());
        }
        Ok(images)
    }
}
