use crate::cell::{CellValue, date_to_excel_serial, datetime_to_excel_serial};
use crate::error::Result;
use crate::spreadsheet::RowSet;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Serialize;

/// File name offered for the CSV download.
pub const CSV_FILE_NAME: &str = "filtered_results.csv";

/// File name offered for the XLSX download.
pub const XLSX_FILE_NAME: &str = "filtered_results.xlsx";

/// Row-major, display-ready rendering of a row set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableView {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl TableView {
    /// Renders every column of every record, in original order.
    pub fn from_rows(rows: &RowSet) -> Self {
        TableView {
            columns: rows.columns().to_vec(),
            rows: rows
                .records()
                .iter()
                .map(|r| r.cells.iter().map(|c| c.to_string()).collect())
                .collect(),
        }
    }
}

/// Convert a row set to CSV format
///
/// The header row carries the normalized column names and each record becomes
/// one line. Values containing commas, quotes or newlines are quoted and
/// escaped as RFC 4180 describes. An empty row set still yields the header.
///
/// # Arguments
/// * `rows` - The (filtered) row set to export
///
/// # Returns
/// * `Result<Vec<u8>>` - UTF-8 CSV content or an error
///
/// # Examples
/// ```
/// use labsheet::downloader::to_csv;
/// use labsheet::loader::from_csv;
///
/// let rows = from_csv(b"date,test_type,value,note\n2024-01-01,pH,6.5,\"dry, windy\"\n").unwrap();
/// let csv = String::from_utf8(to_csv(&rows).unwrap()).unwrap();
/// assert_eq!(csv, "date,test_type,value,note\n2024-01-01,pH,6.5,\"dry, windy\"\n");
/// ```
pub fn to_csv(rows: &RowSet) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(rows.columns())?;
    for record in rows.records() {
        writer.write_record(record.cells.iter().map(|c| c.to_string()))?;
    }
    writer
        .into_inner()
        .map_err(|e| std::io::Error::other(e.to_string()).into())
}

/// Encodes CSV bytes as a `data:` URI usable in a download link.
pub fn csv_data_uri(csv: &[u8]) -> String {
    format!("data:text/csv;base64,{}", STANDARD.encode(csv))
}

/// Convert a row set to XLSX format
///
/// Writes a single worksheet with a bold header row. Dates are stored as real
/// Excel dates formatted `yyyy-mm-dd` (timestamps as `yyyy-mm-dd hh:mm:ss`), numbers as numbers and everything else
/// as text, so the export can be uploaded again unchanged.
///
/// # Arguments
/// * `rows` - The (filtered) row set to export
///
/// # Returns
/// * `Result<Vec<u8>>` - XLSX file content as bytes or an error
pub fn to_xlsx(rows: &RowSet) -> Result<Vec<u8>> {
    use rust_xlsxwriter::{Format, Workbook};

    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();
    let date_format = Format::new().set_num_format("yyyy-mm-dd");
    let datetime_format = Format::new().set_num_format("yyyy-mm-dd hh:mm:ss");

    let worksheet = workbook.add_worksheet();
    worksheet.set_name("Filtered Results")?;

    for (c, name) in rows.columns().iter().enumerate() {
        worksheet.write_string_with_format(0, c as u16, name, &header_format)?;
    }

    for (r, record) in rows.records().iter().enumerate() {
        let row = (r + 1) as u32;
        for (c, cell) in record.cells.iter().enumerate() {
            let col = c as u16;
            match cell {
                CellValue::Empty => {}
                CellValue::Text(s) => {
                    worksheet.write_string(row, col, s)?;
                }
                CellValue::Number(n) => {
                    worksheet.write_number(row, col, *n)?;
                }
                CellValue::Bool(b) => {
                    worksheet.write_boolean(row, col, *b)?;
                }
                CellValue::Date(d) => {
                    worksheet.write_number_with_format(row, col, date_to_excel_serial(*d), &date_format)?;
                }
                CellValue::DateTime(dt) => {
                    worksheet.write_number_with_format(
                        row,
                        col,
                        datetime_to_excel_serial(*dt),
                        &datetime_format,
                    )?;
                }
            }
        }
    }
    worksheet.autofit();

    Ok(workbook.save_to_buffer()?)
}
