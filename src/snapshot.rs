//! Master snapshot persistence.
//!
//! The master extraction is stored as one pretty-printed JSON file. It is
//! regenerated from the reference PDF at the start of every session and
//! always overwritten, never incrementally updated.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use crate::error::Result;
use crate::model::ExtractedDocument;

/// Write a master snapshot, replacing any existing file.
pub fn save<P: AsRef<Path>>(path: P, doc: &ExtractedDocument) -> Result<()> {
    let file = File::create(path.as_ref())?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, doc)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

/// Load a master snapshot.
pub fn load<P: AsRef<Path>>(path: P) -> Result<ExtractedDocument> {
    let file = File::open(path.as_ref())?;
    let reader = BufReader::new(file);
    Ok(serde_json::from_reader(reader)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{KeyValue, TextDatum};

    fn sample_doc() -> ExtractedDocument {
        let mut doc = ExtractedDocument::new();
        let page = doc.insert_page(0);
        page.text_data.insert(
            "Name".to_string(),
            KeyValue {
                key_data: TextDatum {
                    text: "Name:".to_string(),
                    size: 9.0,
                    font: "Helvetica".to_string(),
                    color: 0,
                    alpha: 255,
                    bbox: [30, 100, 90, 110],
                },
                value_data: None,
            },
        );
        doc
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("master_data.json");

        let doc = sample_doc();
        save(&path, &doc).unwrap();
        let loaded = load(&path).unwrap();
        assert_eq!(loaded, doc);
    }

    #[test]
    fn test_save_overwrites_existing_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("master_data.json");

        save(&path, &sample_doc()).unwrap();
        let empty = ExtractedDocument::new();
        save(&path, &empty).unwrap();

        let loaded = load(&path).unwrap();
        assert_eq!(loaded.page_count(), 0);
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load(dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, crate::Error::Io(_)));
    }
}
