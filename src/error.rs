//! Error types for the pdfsnap library.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for pdfsnap operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur during extraction, comparison and snapshot I/O.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error when reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Error parsing PDF structure.
    #[error("PDF parsing error: {0}")]
    PdfParse(String),

    /// The PDF document is encrypted and cannot be processed.
    #[error("Document is encrypted")]
    Encrypted,

    /// Page index is out of range.
    #[error("Page {0} is out of range (document has {1} pages)")]
    PageOutOfRange(usize, usize),

    /// A bounding box was extended before any page width was recorded.
    #[error("Page width is not defined")]
    PageWidthUnknown,

    /// A bounding box did not have exactly four coordinates.
    #[error("Bounding box must contain exactly 4 values, got {0}")]
    MalformedBbox(usize),

    /// Page rasterization failed.
    #[error("Rasterization error: {0}")]
    Raster(String),

    /// Snapshot serialization or deserialization failed.
    #[error("Snapshot error: {0}")]
    Snapshot(#[from] serde_json::Error),

    /// The folder holding candidate files does not exist.
    #[error("The folder {0} doesn't exist")]
    FixturesNotFound(PathBuf),

    /// A candidate document diverged from the master snapshot.
    #[error("Comparison failed:\n{0}")]
    Mismatch(String),
}

impl From<lopdf::Error> for Error {
    fn from(err: lopdf::Error) -> Self {
        match err {
            lopdf::Error::IO(e) => Error::Io(e),
            lopdf::Error::Decryption(_) => Error::Encrypted,
            _ => Error::PdfParse(err.to_string()),
        }
    }
}
