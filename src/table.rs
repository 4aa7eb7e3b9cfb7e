//! Grid-view configuration converter.
//!
//! Turns a tabular UI configuration (column order, sorting, highlight and
//! filter rules) into the nested message the list consumer expects. The
//! highlight/condition cells use a tiny comma-joined grammar,
//! `type=value[=rgba(r,g,b,a)]`, where `equals` is the only recognized type;
//! anything that does not match is silently dropped.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// One row of the grid configuration, as the UI reports it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GridRow {
    #[serde(rename = "Columns View", default)]
    pub columns_view: String,
    #[serde(rename = "Sort By", default)]
    pub sort_by: String,
    #[serde(rename = "Highlight By", default)]
    pub highlight_by: String,
    #[serde(rename = "Condition", default)]
    pub condition: String,
    #[serde(rename = "Row Height", default)]
    pub row_height: String,
    #[serde(rename = "Lines per page", default)]
    pub lines_per_page: String,
}

/// Backend binding for a column view name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnBinding {
    /// Backend column index (e.g., "so_list_so_number")
    pub index: String,
    /// Filter key the conditions are stored under (e.g., "so_no")
    pub filter: String,
}

/// Recognized condition kinds. Only `equals` exists in the grammar today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConditionKind {
    Equals,
}

/// A parsed condition or highlight rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    #[serde(rename = "type")]
    pub kind: ConditionKind,
    pub value: String,
    /// Present for highlight rules (empty string when no color was given),
    /// absent for plain filter conditions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

/// A column reference with its position in the view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnEntry {
    pub index: String,
    pub sort: u32,
}

/// The sort clause.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBy {
    pub direction: String,
    pub index: String,
}

/// The nested message sent downstream. Keys that were never populated are
/// omitted, matching the consumer's expectations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GridMessage {
    pub module: String,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub columns: Vec<ColumnEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_by: Option<OrderBy>,
    #[serde(skip_serializing_if = "IndexMap::is_empty", default)]
    pub conditions_data: IndexMap<String, Vec<Condition>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row_height: Option<String>,
    #[serde(skip_serializing_if = "IndexMap::is_empty", default)]
    pub color_conditions: IndexMap<String, Vec<Condition>>,
}

/// Convert grid rows plus column bindings into a [`GridMessage`].
pub fn convert(rows: &[GridRow], bindings: &IndexMap<String, ColumnBinding>) -> GridMessage {
    let mut message = GridMessage {
        module: "SO".to_string(),
        ..GridMessage::default()
    };
    let mut sort = 0u32;

    for row in rows {
        let filter_key = bindings.get(&row.columns_view).map(|b| b.filter.clone());

        // Any cell value that names a bound column adds a column entry;
        // in practice only the "Columns View" cell ever does.
        for cell in [
            &row.columns_view,
            &row.sort_by,
            &row.highlight_by,
            &row.condition,
            &row.row_height,
            &row.lines_per_page,
        ] {
            if let Some(binding) = bindings.get(cell.as_str()) {
                message.columns.push(ColumnEntry {
                    index: binding.index.clone(),
                    sort,
                });
                sort += 1;
            }
        }

        if !row.lines_per_page.is_empty() {
            message.page_size = Some(row.lines_per_page.clone());
        }
        if !row.row_height.is_empty() {
            message.row_height = Some(row.row_height.clone());
        }
        if !row.sort_by.is_empty() {
            message.order_by = Some(OrderBy {
                direction: row.sort_by.clone(),
                index: bindings
                    .get(&row.columns_view)
                    .map(|b| b.index.clone())
                    .unwrap_or_default(),
            });
        }
        if let Some(filter) = &filter_key {
            if !row.condition.is_empty() {
                let conditions = parse_conditions(&row.condition)
                    .into_iter()
                    .map(|c| Condition {
                        kind: c.kind,
                        value: c.value,
                        color: None,
                    })
                    .collect();
                message.conditions_data.insert(filter.clone(), conditions);
            }
            if !row.highlight_by.is_empty() {
                let conditions = parse_conditions(&row.highlight_by)
                    .into_iter()
                    .map(|c| Condition {
                        color: Some(c.color.unwrap_or_default()),
                        ..c
                    })
                    .collect();
                message.color_conditions.insert(filter.clone(), conditions);
            }
        }
    }

    message
}

/// Scan a rule string for `equals=<value>[=<...>rgba(r,g,b,a)]` occurrences.
///
/// A value is one word character followed by one or more digits. The color
/// segment is optional: when an `=` follows the value, the remainder is
/// scanned lazily for the first well-formed `rgba(...)` literal, which is
/// consumed through its closing parenthesis; if none parses, the rule ends at
/// the value. Unmatched text is skipped.
pub fn parse_conditions(input: &str) -> Vec<Condition> {
    const MARKER: &str = "equals=";

    let bytes = input.as_bytes();
    let mut out = Vec::new();
    let mut pos = 0;

    while let Some(found) = input[pos..].find(MARKER) {
        let start = pos + found;
        let value_start = start + MARKER.len();

        let Some(value_end) = parse_value(bytes, value_start) else {
            pos = start + 1;
            continue;
        };
        let value = input[value_start..value_end].to_string();
        let mut end = value_end;
        let mut color = None;

        if bytes.get(end) == Some(&b'=') {
            if let Some((rgba_start, rgba_end)) = find_rgba(input, end + 1) {
                color = Some(input[rgba_start..rgba_end].to_string());
                end = rgba_end;
            }
        }

        out.push(Condition {
            kind: ConditionKind::Equals,
            value,
            color,
        });
        pos = end;
    }

    out
}

/// One word character followed by one or more digits; returns the end offset.
fn parse_value(bytes: &[u8], start: usize) -> Option<usize> {
    let first = *bytes.get(start)?;
    if !(first.is_ascii_alphanumeric() || first == b'_') {
        return None;
    }
    let mut end = start + 1;
    while bytes.get(end).is_some_and(|b| b.is_ascii_digit()) {
        end += 1;
    }
    if end == start + 1 {
        return None;
    }
    Some(end)
}

/// Find the first well-formed `rgba(d,d,d,d[.d])` literal at or after `from`.
fn find_rgba(input: &str, from: usize) -> Option<(usize, usize)> {
    let mut pos = from;
    while let Some(found) = input[pos..].find("rgba(") {
        let start = pos + found;
        if let Some(end) = parse_rgba(input.as_bytes(), start) {
            return Some((start, end));
        }
        pos = start + 1;
    }
    None
}

fn parse_rgba(bytes: &[u8], start: usize) -> Option<usize> {
    let mut pos = start + "rgba(".len();

    for component in 0..4 {
        let digits_start = pos;
        while bytes.get(pos).is_some_and(|b| b.is_ascii_digit()) {
            pos += 1;
        }
        if pos == digits_start {
            return None;
        }
        // Only the alpha component may carry a decimal part
        if component == 3 && bytes.get(pos) == Some(&b'.') {
            pos += 1;
            let frac_start = pos;
            while bytes.get(pos).is_some_and(|b| b.is_ascii_digit()) {
                pos += 1;
            }
            if pos == frac_start {
                return None;
            }
        }
        let expected = if component < 3 { b',' } else { b')' };
        if bytes.get(pos) != Some(&expected) {
            return None;
        }
        pos += 1;
    }

    Some(pos)
}
