//! Tolerant structural comparison between two extracted documents.
//!
//! The comparison walks the master document field by field and records every
//! divergence as a typed [`Mismatch`]. Counts (pages, titles, barcodes) must
//! match exactly; positions are compared within an absolute pixel tolerance
//! unless strict mode is enabled. All mismatches are collected into one
//! [`CompareReport`] rather than failing on the first.

use std::fmt;

use crate::error::{Error, Result};
use crate::geometry::bbox_within_tolerance;
use crate::model::{ExtractedDocument, PageRecord, TextDatum};

/// Options for document comparison.
#[derive(Debug, Clone)]
pub struct CompareOptions {
    /// Maximum absolute per-coordinate bbox difference, in pixels
    pub tolerance: i64,
    /// Require bit-exact coordinates
    pub strict: bool,
}

impl CompareOptions {
    /// Create new compare options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the positional tolerance in pixels.
    pub fn with_tolerance(mut self, tolerance: i64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Require bit-exact bbox coordinates.
    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }
}

impl Default for CompareOptions {
    fn default() -> Self {
        Self {
            tolerance: 5,
            strict: false,
        }
    }
}

/// A single recorded divergence between master and candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mismatch {
    PageCount { master: usize, candidate: usize },
    MissingPage { page: String },
    TitleCount { page: String, master: usize, candidate: usize },
    TitleMoved { page: String, text: String },
    MissingKey { page: String, key: String },
    KeyAttribute { page: String, key: String, attribute: &'static str, candidate: String },
    KeyMoved { page: String, key: String },
    MissingValue { page: String, key: String },
    ValueAttribute { page: String, key: String, attribute: &'static str, candidate: String },
    ValueMoved { page: String, key: String },
    BarcodeCount { page: String, master: usize, candidate: usize },
    BarcodeText { page: String, master: String, candidate: String },
    BarcodeMoved { page: String, text: String },
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mismatch::PageCount { master, candidate } => {
                write!(f, "Number of pages doesn't match ({master} vs {candidate})")
            }
            Mismatch::MissingPage { page } => write!(f, "[{page}] page is missing"),
            Mismatch::TitleCount { page, master, candidate } => {
                write!(f, "[{page}] Number of titles doesn't match ({master} vs {candidate})")
            }
            Mismatch::TitleMoved { page, text } => {
                write!(f, "[{page}] The title '{text}' is out of place")
            }
            Mismatch::MissingKey { page, key } => write!(f, "[{page}] Missing '{key}' key"),
            Mismatch::KeyAttribute { page, key, attribute, candidate } => {
                write!(f, "[{page}] The {attribute} '{candidate}' of {key} is different")
            }
            Mismatch::KeyMoved { page, key } => {
                write!(f, "[{page}] The key '{key}' is out of place")
            }
            Mismatch::MissingValue { page, key } => {
                write!(f, "[{page}] Missing value for '{key}' key")
            }
            Mismatch::ValueAttribute { page, key, attribute, candidate } => {
                write!(f, "[{page}] The value {attribute} '{candidate}' of {key} is different")
            }
            Mismatch::ValueMoved { page, key } => {
                write!(f, "[{page}] The value of '{key}' is out of place")
            }
            Mismatch::BarcodeCount { page, master, candidate } => {
                write!(f, "[{page}] Number of barcodes doesn't match ({master} vs {candidate})")
            }
            Mismatch::BarcodeText { page, master, candidate } => {
                write!(f, "[{page}] Barcode '{candidate}' doesn't match '{master}'")
            }
            Mismatch::BarcodeMoved { page, text } => {
                write!(f, "[{page}] Barcode '{text}' is out of place")
            }
        }
    }
}

/// Result of comparing a candidate document against a master.
#[derive(Debug, Clone, Default)]
pub struct CompareReport {
    /// Every recorded divergence, in check order
    pub mismatches: Vec<Mismatch>,
}

impl CompareReport {
    /// True when the candidate matched the master.
    pub fn is_match(&self) -> bool {
        self.mismatches.is_empty()
    }

    /// Convert the report into a `Result`, failing when mismatches exist.
    pub fn into_result(self) -> Result<()> {
        if self.is_match() {
            Ok(())
        } else {
            Err(Error::Mismatch(self.to_string()))
        }
    }
}

impl fmt::Display for CompareReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, mismatch) in self.mismatches.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{mismatch}")?;
        }
        Ok(())
    }
}

/// Document comparator.
pub struct Comparator {
    options: CompareOptions,
}

impl Comparator {
    /// Create a comparator with the given options.
    pub fn new(options: CompareOptions) -> Self {
        Self { options }
    }

    /// Compare a candidate extraction against the master snapshot.
    pub fn compare(&self, master: &ExtractedDocument, candidate: &ExtractedDocument) -> CompareReport {
        let mut report = CompareReport::default();

        if master.page_count() != candidate.page_count() {
            report.mismatches.push(Mismatch::PageCount {
                master: master.page_count(),
                candidate: candidate.page_count(),
            });
            // Page records cannot be aligned past this point
            return report;
        }

        for (page_key, master_page) in master.iter() {
            let Some(candidate_page) = candidate.page_by_key(page_key) else {
                report.mismatches.push(Mismatch::MissingPage {
                    page: page_key.clone(),
                });
                continue;
            };
            self.compare_titles(page_key, master_page, candidate_page, &mut report);
            self.compare_text_data(page_key, master_page, candidate_page, &mut report);
            self.compare_barcodes(page_key, master_page, candidate_page, &mut report);
        }

        report
    }

    fn bbox_ok(&self, a: &[i64; 4], b: &[i64; 4]) -> bool {
        bbox_within_tolerance(a, b, self.options.tolerance, self.options.strict)
    }

    fn compare_titles(
        &self,
        page: &str,
        master: &PageRecord,
        candidate: &PageRecord,
        report: &mut CompareReport,
    ) {
        if master.titles.len() != candidate.titles.len() {
            report.mismatches.push(Mismatch::TitleCount {
                page: page.to_string(),
                master: master.titles.len(),
                candidate: candidate.titles.len(),
            });
            return;
        }

        for (master_title, candidate_title) in master.titles.iter().zip(&candidate.titles) {
            if !self.bbox_ok(&master_title.bbox, &candidate_title.bbox) {
                report.mismatches.push(Mismatch::TitleMoved {
                    page: page.to_string(),
                    text: candidate_title.text.clone(),
                });
            }
        }
    }

    fn compare_text_data(
        &self,
        page: &str,
        master: &PageRecord,
        candidate: &PageRecord,
        report: &mut CompareReport,
    ) {
        for (key, master_entry) in &master.text_data {
            let Some(candidate_entry) = candidate.text_data.get(key) else {
                report.mismatches.push(Mismatch::MissingKey {
                    page: page.to_string(),
                    key: key.clone(),
                });
                continue;
            };

            self.compare_key_datum(page, key, &master_entry.key_data, &candidate_entry.key_data, report);

            if let Some(master_value) = &master_entry.value_data {
                match &candidate_entry.value_data {
                    Some(candidate_value) => {
                        self.compare_value_datum(page, key, master_value, candidate_value, report);
                    }
                    None => report.mismatches.push(Mismatch::MissingValue {
                        page: page.to_string(),
                        key: key.clone(),
                    }),
                }
            }
        }
    }

    fn compare_key_datum(
        &self,
        page: &str,
        key: &str,
        master: &TextDatum,
        candidate: &TextDatum,
        report: &mut CompareReport,
    ) {
        let mut attr = |attribute: &'static str, value: String| {
            report.mismatches.push(Mismatch::KeyAttribute {
                page: page.to_string(),
                key: key.to_string(),
                attribute,
                candidate: value,
            });
        };

        if master.text != candidate.text {
            attr("text", candidate.text.clone());
        }
        if master.size != candidate.size {
            attr("size", candidate.size.to_string());
        }
        if master.font != candidate.font {
            attr("font", candidate.font.clone());
        }
        if master.color != candidate.color {
            attr("color", candidate.color.to_string());
        }
        if master.alpha != candidate.alpha {
            attr("alpha", candidate.alpha.to_string());
        }
        if !self.bbox_ok(&master.bbox, &candidate.bbox) {
            report.mismatches.push(Mismatch::KeyMoved {
                page: page.to_string(),
                key: key.to_string(),
            });
        }
    }

    /// Value spans compare everything except the text itself: free-form
    /// values (dates, totals) are expected to change between documents.
    fn compare_value_datum(
        &self,
        page: &str,
        key: &str,
        master: &TextDatum,
        candidate: &TextDatum,
        report: &mut CompareReport,
    ) {
        let mut attr = |attribute: &'static str, value: String| {
            report.mismatches.push(Mismatch::ValueAttribute {
                page: page.to_string(),
                key: key.to_string(),
                attribute,
                candidate: value,
            });
        };

        if master.size != candidate.size {
            attr("size", candidate.size.to_string());
        }
        if master.font != candidate.font {
            attr("font", candidate.font.clone());
        }
        if master.color != candidate.color {
            attr("color", candidate.color.to_string());
        }
        if master.alpha != candidate.alpha {
            attr("alpha", candidate.alpha.to_string());
        }
        if !self.bbox_ok(&master.bbox, &candidate.bbox) {
            report.mismatches.push(Mismatch::ValueMoved {
                page: page.to_string(),
                key: key.to_string(),
            });
        }
    }

    fn compare_barcodes(
        &self,
        page: &str,
        master: &PageRecord,
        candidate: &PageRecord,
        report: &mut CompareReport,
    ) {
        if master.barcodes.len() != candidate.barcodes.len() {
            report.mismatches.push(Mismatch::BarcodeCount {
                page: page.to_string(),
                master: master.barcodes.len(),
                candidate: candidate.barcodes.len(),
            });
            return;
        }

        // Order-sensitive: barcodes pair by list position
        for (master_barcode, candidate_barcode) in master.barcodes.iter().zip(&candidate.barcodes) {
            if master_barcode.text != candidate_barcode.text {
                report.mismatches.push(Mismatch::BarcodeText {
                    page: page.to_string(),
                    master: master_barcode.text.clone(),
                    candidate: candidate_barcode.text.clone(),
                });
            }
            if !self.bbox_ok(&master_barcode.bbox, &candidate_barcode.bbox) {
                report.mismatches.push(Mismatch::BarcodeMoved {
                    page: page.to_string(),
                    text: candidate_barcode.text.clone(),
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Barcode, KeyValue};

    fn datum(text: &str, bbox: [i64; 4]) -> TextDatum {
        TextDatum {
            text: text.to_string(),
            size: 9.0,
            font: "Helvetica".to_string(),
            color: 0,
            alpha: 255,
            bbox,
        }
    }

    fn doc_with_key(bbox: [i64; 4]) -> ExtractedDocument {
        let mut doc = ExtractedDocument::new();
        let page = doc.insert_page(0);
        page.text_data.insert(
            "Name".to_string(),
            KeyValue {
                key_data: datum("Name:", bbox),
                value_data: Some(datum(" John", [bbox[0], bbox[1], 612, bbox[3]])),
            },
        );
        doc
    }

    fn compare(master: &ExtractedDocument, candidate: &ExtractedDocument) -> CompareReport {
        Comparator::new(CompareOptions::default()).compare(master, candidate)
    }

    #[test]
    fn test_identical_documents_match() {
        let master = doc_with_key([30, 100, 90, 110]);
        let report = compare(&master, &master.clone());
        assert!(report.is_match());
        assert!(report.into_result().is_ok());
    }

    #[test]
    fn test_shift_within_tolerance_matches() {
        let master = doc_with_key([30, 100, 90, 110]);
        let candidate = doc_with_key([33, 103, 93, 113]);
        assert!(compare(&master, &candidate).is_match());
    }

    #[test]
    fn test_shift_beyond_tolerance_fails() {
        let master = doc_with_key([30, 100, 90, 110]);
        let candidate = doc_with_key([40, 100, 100, 110]);
        let report = compare(&master, &candidate);
        assert!(!report.is_match());
        assert!(report
            .mismatches
            .iter()
            .any(|m| matches!(m, Mismatch::KeyMoved { .. })));
    }

    #[test]
    fn test_strict_rejects_one_pixel_shift() {
        let master = doc_with_key([30, 100, 90, 110]);
        let candidate = doc_with_key([31, 100, 90, 110]);
        let report = Comparator::new(CompareOptions::new().strict()).compare(&master, &candidate);
        assert!(!report.is_match());
    }

    #[test]
    fn test_page_count_mismatch_short_circuits() {
        let master = doc_with_key([30, 100, 90, 110]);
        let mut candidate = master.clone();
        candidate.insert_page(1);
        let report = compare(&master, &candidate);
        assert_eq!(
            report.mismatches,
            vec![Mismatch::PageCount {
                master: 1,
                candidate: 2
            }]
        );
    }

    #[test]
    fn test_missing_key_reported_and_others_still_checked() {
        let mut master = doc_with_key([30, 100, 90, 110]);
        master.page_mut(0).unwrap().text_data.insert(
            "Total".to_string(),
            KeyValue {
                key_data: datum("Total:", [30, 140, 90, 150]),
                value_data: None,
            },
        );
        let candidate = doc_with_key([30, 100, 200, 110]);
        let report = compare(&master, &candidate);
        assert!(report
            .mismatches
            .iter()
            .any(|m| matches!(m, Mismatch::MissingKey { key, .. } if key == "Total")));
        // The shared key was still compared (collect-all policy)
        assert!(report
            .mismatches
            .iter()
            .any(|m| matches!(m, Mismatch::KeyMoved { .. })));
    }

    #[test]
    fn test_value_text_not_compared() {
        let master = doc_with_key([30, 100, 90, 110]);
        let mut candidate = doc_with_key([30, 100, 90, 110]);
        candidate.page_mut(0).unwrap().text_data["Name"]
            .value_data
            .as_mut()
            .unwrap()
            .text = " Jane".to_string();
        assert!(compare(&master, &candidate).is_match());
    }

    #[test]
    fn test_key_attribute_mismatch_reported() {
        let master = doc_with_key([30, 100, 90, 110]);
        let mut candidate = doc_with_key([30, 100, 90, 110]);
        candidate.page_mut(0).unwrap().text_data["Name"].key_data.font = "Courier".to_string();
        let report = compare(&master, &candidate);
        assert_eq!(report.mismatches.len(), 1);
        assert!(matches!(
            &report.mismatches[0],
            Mismatch::KeyAttribute { attribute: "font", .. }
        ));
    }

    #[test]
    fn test_title_count_skips_pairwise_check() {
        let mut master = ExtractedDocument::new();
        master.insert_page(0).titles.push(datum("A", [0, 0, 612, 20]));
        let mut candidate = ExtractedDocument::new();
        candidate.insert_page(0);
        let report = compare(&master, &candidate);
        assert_eq!(report.mismatches.len(), 1);
        assert!(matches!(report.mismatches[0], Mismatch::TitleCount { .. }));
    }

    #[test]
    fn test_barcodes_compared_by_order() {
        let mut master = ExtractedDocument::new();
        {
            let page = master.insert_page(0);
            page.barcodes.push(Barcode { bbox: [10, 10, 60, 30], text: "A".into() });
            page.barcodes.push(Barcode { bbox: [10, 50, 60, 70], text: "B".into() });
        }
        let mut candidate = ExtractedDocument::new();
        {
            let page = candidate.insert_page(0);
            page.barcodes.push(Barcode { bbox: [10, 50, 60, 70], text: "B".into() });
            page.barcodes.push(Barcode { bbox: [10, 10, 60, 30], text: "A".into() });
        }
        let report = compare(&master, &candidate);
        // Same multiset, wrong order: both positions mismatch
        assert!(!report.is_match());
        assert!(report
            .mismatches
            .iter()
            .any(|m| matches!(m, Mismatch::BarcodeText { .. })));
    }

    #[test]
    fn test_report_display_lists_every_mismatch() {
        let master = doc_with_key([30, 100, 90, 110]);
        let mut candidate = doc_with_key([30, 100, 90, 110]);
        {
            let entry = &mut candidate.page_mut(0).unwrap().text_data["Name"];
            entry.key_data.font = "Courier".to_string();
            entry.key_data.size = 11.0;
        }
        let report = compare(&master, &candidate);
        let rendered = report.to_string();
        assert!(rendered.contains("font"));
        assert!(rendered.contains("size"));
        assert_eq!(rendered.lines().count(), 2);
    }
}
