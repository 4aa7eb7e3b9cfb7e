//! Bounding box helpers.
//!
//! Bounding boxes are `(x1, y1, x2, y2)` in page coordinate space with the
//! origin at the top-left corner. Extraction floors coordinates to integers;
//! the raw boxes reported by the PDF layer stay in floating point until then.

use crate::error::{Error, Result};

/// An integer bounding box as stored in the extracted document.
pub type BBox = [i64; 4];

/// Extend a bounding box so its right edge reaches a column or page boundary.
///
/// The right edge is set to the full page width when `full` is true, otherwise
/// to `floor(page_width / columns)`, and that width is added repeatedly until
/// the box is no longer inverted. Source spans report a tight box around the
/// rendered glyphs; comparisons need one that reaches the column boundary.
pub fn extend_bbox(
    bbox: &[f64],
    page_width: Option<i64>,
    columns: u32,
    full: bool,
) -> Result<[f64; 4]> {
    let page_width = page_width.ok_or(Error::PageWidthUnknown)?;
    let width = if full {
        page_width
    } else {
        page_width / i64::from(columns.max(1))
    };

    let [x1, y1, _, y2] = to_quad(bbox)?;

    let mut x2 = width as f64;
    while x2 < x1 {
        x2 += width as f64;
    }

    Ok([x1, y1, x2, y2])
}

/// True iff `inner` lies entirely within `outer` (edges inclusive).
pub fn bbox_contains(outer: &[f64; 4], inner: &[f64; 4]) -> bool {
    outer[0] <= inner[0] && outer[1] <= inner[1] && outer[2] >= inner[2] && outer[3] >= inner[3]
}

/// Coordinate-wise bbox equality with an absolute pixel slack.
///
/// Strict mode requires bit-exact coordinates. Non-strict mode requires equal
/// arity and every coordinate pair to differ by at most `tolerance`.
pub fn bbox_within_tolerance(a: &[i64], b: &[i64], tolerance: i64, strict: bool) -> bool {
    if strict {
        return a == b;
    }

    if a.len() != b.len() {
        return false;
    }

    a.iter().zip(b.iter()).all(|(x, y)| (x - y).abs() <= tolerance)
}

/// Floor every coordinate of a raw bbox to an integer [`BBox`].
pub fn floor_bbox(bbox: &[f64]) -> BBox {
    let mut out = [0i64; 4];
    for (slot, value) in out.iter_mut().zip(bbox.iter()) {
        *slot = value.floor() as i64;
    }
    out
}

/// Validate that a raw bbox has exactly four coordinates.
pub fn to_quad(bbox: &[f64]) -> Result<[f64; 4]> {
    match bbox {
        [x1, y1, x2, y2] => Ok([*x1, *y1, *x2, *y2]),
        other => Err(Error::MalformedBbox(other.len())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extend_bbox_full_width() {
        let bbox = [30.0, 10.0, 80.0, 22.0];
        let extended = extend_bbox(&bbox, Some(612), 2, true).unwrap();
        assert_eq!(extended, [30.0, 10.0, 612.0, 22.0]);
    }

    #[test]
    fn test_extend_bbox_column_width() {
        let bbox = [30.0, 10.0, 80.0, 22.0];
        let extended = extend_bbox(&bbox, Some(612), 2, false).unwrap();
        assert_eq!(extended, [30.0, 10.0, 306.0, 22.0]);
    }

    #[test]
    fn test_extend_bbox_repeats_until_past_left_edge() {
        // A span starting in the right column: one column width (306) is less
        // than x1, so the width is added again.
        let bbox = [320.0, 10.0, 400.0, 22.0];
        let extended = extend_bbox(&bbox, Some(612), 2, false).unwrap();
        assert_eq!(extended, [320.0, 10.0, 612.0, 22.0]);
    }

    #[test]
    fn test_extend_bbox_requires_page_width() {
        let bbox = [30.0, 10.0, 80.0, 22.0];
        let err = extend_bbox(&bbox, None, 1, true).unwrap_err();
        assert!(matches!(err, Error::PageWidthUnknown));
    }

    #[test]
    fn test_extend_bbox_rejects_malformed_input() {
        let err = extend_bbox(&[1.0, 2.0, 3.0], Some(612), 1, true).unwrap_err();
        assert!(matches!(err, Error::MalformedBbox(3)));
    }

    #[test]
    fn test_bbox_contains() {
        let outer = [0.0, 0.0, 100.0, 100.0];
        assert!(bbox_contains(&outer, &[10.0, 10.0, 50.0, 50.0]));
        assert!(!bbox_contains(&outer, &[10.0, 10.0, 150.0, 50.0]));
        // Edges are inclusive
        assert!(bbox_contains(&outer, &[0.0, 0.0, 100.0, 100.0]));
    }

    #[test]
    fn test_bbox_within_tolerance() {
        let a = [10, 20, 100, 40];
        let b = [12, 18, 104, 44];
        assert!(bbox_within_tolerance(&a, &b, 5, false));
        assert!(!bbox_within_tolerance(&a, &b, 3, false));
    }

    #[test]
    fn test_bbox_tolerance_monotonicity() {
        let a = [10, 20, 100, 40];
        let b = [13, 20, 100, 40];
        for t in 3..20 {
            assert!(bbox_within_tolerance(&a, &b, t, false));
        }
    }

    #[test]
    fn test_bbox_strict_requires_exact() {
        let a = [10, 20, 100, 40];
        let b = [10, 20, 100, 41];
        assert!(!bbox_within_tolerance(&a, &b, 5, true));
        assert!(bbox_within_tolerance(&a, &a, 0, true));
    }

    #[test]
    fn test_bbox_tolerance_arity_mismatch() {
        assert!(!bbox_within_tolerance(&[1, 2, 3, 4], &[1, 2, 3], 5, false));
    }

    #[test]
    fn test_floor_bbox() {
        assert_eq!(floor_bbox(&[1.9, 2.1, 3.7, 4.0]), [1, 2, 3, 4]);
    }
}
