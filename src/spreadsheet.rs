use crate::cell::CellValue;
use crate::error::{LabError, Result};
use chrono::NaiveDate;

pub const DATE_COLUMN: &str = "date";
pub const VALUE_COLUMN: &str = "value";
pub const TEST_TYPE_COLUMN: &str = "test_type";

/// One data row of the upload.
///
/// The three columns the application works with are resolved into typed
/// fields when the upload is parsed; `cells` keeps every column in sheet order
/// for the table and the exports.
#[derive(Clone, Debug, PartialEq)]
pub struct Record {
    pub date: NaiveDate,
    pub test_type: String,
    pub value: Option<f64>,
    pub cells: Vec<CellValue>,
}

/// The normalized, schema-checked contents of an uploaded sheet.
#[derive(Clone, Debug, PartialEq)]
pub struct RowSet {
    columns: Vec<String>,
    records: Vec<Record>,
}

/// Normalizes a header: trimmed, lowercased, spaces replaced with underscores.
pub fn normalize_header(raw: &str) -> String {
    raw.trim().to_lowercase().replace(' ', "_")
}

impl RowSet {
    /// Validates a raw grid and lifts it into typed records.
    ///
    /// `rows` yields `(sheet_row, cells)` pairs where `sheet_row` is the 1-based
    /// row number shown to the user in error messages. Rows with only blank
    /// cells are skipped. A row whose date or value cannot be coerced, or that
    /// carries more fields than there are headers, rejects the whole upload.
    /// `test_type` is kept exactly as written.
    pub fn from_grid<I>(headers: &[String], rows: I) -> Result<RowSet>
    where
        I: IntoIterator<Item = (usize, Vec<CellValue>)>,
    {
        let columns: Vec<String> = headers
            .iter()
            .enumerate()
            .map(|(i, h)| {
                let name = normalize_header(h);
                if name.is_empty() {
                    format!("unnamed_{}", i)
                } else {
                    name
                }
            })
            .collect();

        let date_idx = required_column(&columns, DATE_COLUMN)?;
        let value_idx = required_column(&columns, VALUE_COLUMN)?;
        let test_type_idx = required_column(&columns, TEST_TYPE_COLUMN)?;

        let mut records = Vec::new();
        for (sheet_row, mut cells) in rows {
            if cells.iter().skip(columns.len()).any(|c| !c.is_blank()) {
                return Err(LabError::parse(format!(
                    "row {}: has {} fields but the header names only {} columns",
                    sheet_row,
                    cells.len(),
                    columns.len()
                )));
            }
            cells.resize(columns.len(), CellValue::Empty);
            if cells.iter().all(CellValue::is_blank) {
                continue;
            }

            let date = cells[date_idx].as_date().ok_or_else(|| {
                LabError::parse(format!(
                    "row {}: cannot read '{}' as a date",
                    sheet_row, cells[date_idx]
                ))
            })?;
            let value = cells[value_idx].as_number(sheet_row)?;
            let test_type = cells[test_type_idx].to_string();

            cells[date_idx] = CellValue::Date(date);
            cells[value_idx] = value.map_or(CellValue::Empty, CellValue::Number);

            records.push(Record {
                date,
                test_type,
                value,
                cells,
            });
        }

        Ok(RowSet { columns, records })
    }

    /// Normalized column names in sheet order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// A new row set with the same columns, holding the records that satisfy
    /// `keep`, in their original order.
    pub fn retain_copy<F>(&self, mut keep: F) -> RowSet
    where
        F: FnMut(&Record) -> bool,
    {
        RowSet {
            columns: self.columns.clone(),
            records: self.records.iter().filter(|r| keep(r)).cloned().collect(),
        }
    }
}

fn required_column(columns: &[String], name: &str) -> Result<usize> {
    columns.iter().position(|c| c == name).ok_or_else(|| {
        LabError::parse(format!(
            "missing required column '{}' (found: {})",
            name,
            columns.join(", ")
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.to_string())
    }

    #[test]
    fn headers_are_normalized_before_lookup() {
        assert_eq!(normalize_header("  Test Type "), "test_type");
        assert_eq!(normalize_header("DATE"), "date");
        assert_eq!(normalize_header("Lab  Id"), "lab__id");

        let set = RowSet::from_grid(
            &headers(&[" Date", "Test Type", "VALUE", ""]),
            vec![(2, vec![text("2024-01-01"), text("pH"), CellValue::Number(6.5)])],
        )
        .unwrap();
        assert_eq!(set.columns(), ["date", "test_type", "value", "unnamed_3"]);
        assert_eq!(set.records()[0].cells.len(), 4);
        assert_eq!(set.records()[0].cells[0], CellValue::Date(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()));
    }

    #[test]
    fn blank_rows_are_skipped() {
        let set = RowSet::from_grid(
            &headers(&["date", "test_type", "value"]),
            vec![
                (2, vec![text("2024-01-01"), text("N"), CellValue::Number(12.0)]),
                (3, vec![CellValue::Empty, text("  "), CellValue::Empty]),
                (4, vec![]),
            ],
        )
        .unwrap();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn unreadable_date_rejects_the_upload() {
        let err = RowSet::from_grid(
            &headers(&["date", "test_type", "value"]),
            vec![
                (2, vec![text("2024-01-01"), text("N"), CellValue::Number(12.0)]),
                (3, vec![text("yesterday"), text("N"), CellValue::Number(11.0)]),
            ],
        )
        .unwrap_err();
        assert!(matches!(err, LabError::Parse(ref m) if m.contains("row 3") && m.contains("yesterday")));
    }

    #[test]
    fn missing_value_is_allowed_but_text_value_is_not() {
        let set = RowSet::from_grid(
            &headers(&["date", "test_type", "value"]),
            vec![(2, vec![text("2024-01-01"), text("N"), CellValue::Empty])],
        )
        .unwrap();
        assert_eq!(set.records()[0].value, None);

        let err = RowSet::from_grid(
            &headers(&["date", "test_type", "value"]),
            vec![(2, vec![text("2024-01-01"), text("N"), text("high")])],
        )
        .unwrap_err();
        assert!(matches!(err, LabError::Parse(_)));
    }

    #[test]
    fn categories_keep_their_exact_spelling() {
        let set = RowSet::from_grid(
            &headers(&["date", "test_type", "value"]),
            vec![
                (2, vec![text("2024-01-01"), text("pH "), CellValue::Number(6.5)]),
                (3, vec![text("2024-01-02"), text("pH"), CellValue::Number(6.6)]),
            ],
        )
        .unwrap();
        assert_eq!(set.records()[0].test_type, "pH ");
        assert_eq!(set.records()[1].test_type, "pH");
    }

    #[test]
    fn surplus_fields_reject_the_upload() {
        let err = RowSet::from_grid(
            &headers(&["date", "test_type", "value"]),
            vec![(4, vec![text("2024-01-01"), text("N"), CellValue::Number(1.0), text("stray")])],
        )
        .unwrap_err();
        assert!(matches!(err, LabError::Parse(ref m) if m.contains("row 4") && m.contains("4 fields")));

        // Trailing empty fields are harmless.
        let set = RowSet::from_grid(
            &headers(&["date", "test_type", "value"]),
            vec![(2, vec![text("2024-01-01"), text("N"), CellValue::Number(1.0), CellValue::Empty])],
        )
        .unwrap();
        assert_eq!(set.records()[0].cells.len(), 3);
    }

    #[test]
    fn required_columns_are_enforced() {
        let err = RowSet::from_grid(&headers(&["when", "test_type", "value"]), Vec::new()).unwrap_err();
        assert!(matches!(err, LabError::Parse(ref m) if m.contains("'date'")));
    }
}
