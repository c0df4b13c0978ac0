use crate::cell::{CellValue, serial_to_cell};
use crate::error::{LabError, Result};
use crate::spreadsheet::RowSet;
use calamine::{Data, Reader, open_workbook_auto_from_rs};
use std::io::Cursor;
use std::path::Path;

/// Zip container (xlsx, xlsm, xlsb, ods) and OLE2 compound file (xls).
const WORKBOOK_MAGIC: [&[u8]; 2] = [b"PK\x03\x04", b"\xD0\xCF\x11\xE0"];

/// Parse an uploaded spreadsheet into a row set
///
/// CSV uploads are recognised by their `.csv` extension (or, when the browser
/// sends no file name, by not looking like a workbook). Everything else goes
/// through calamine's format detection, and only the first worksheet is read.
///
/// # Arguments
/// * `file_name` - Client-side file name, if the browser sent one
/// * `bytes` - Raw upload
///
/// # Returns
/// * `Result<RowSet>` - The validated rows, or `MissingFile` / `Parse`
///
/// # Examples
/// ```
/// use labsheet::loader::load_upload;
///
/// let csv = b"Date,Test Type,Value\n2024-01-01,pH,6.5\n";
/// let rows = load_upload(Some("results.csv"), csv).unwrap();
/// assert_eq!(rows.len(), 1);
/// assert_eq!(rows.columns(), ["date", "test_type", "value"]);
/// ```
pub fn load_upload(file_name: Option<&str>, bytes: &[u8]) -> Result<RowSet> {
    if bytes.is_empty() {
        return Err(LabError::MissingFile);
    }

    let extension = file_name
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase());

    let is_csv = match extension.as_deref() {
        Some("csv") => true,
        None => !WORKBOOK_MAGIC.iter().any(|magic| bytes.starts_with(magic)),
        Some(_) => false,
    };

    let rows = if is_csv {
        from_csv(bytes)?
    } else {
        from_workbook(bytes)?
    };
    log::debug!(
        "parsed upload {:?}: {} columns, {} rows",
        file_name,
        rows.columns().len(),
        rows.len()
    );
    Ok(rows)
}

/// Reads CSV bytes: first record is the header row.
pub fn from_csv(bytes: &[u8]) -> Result<RowSet> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(bytes);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| LabError::parse(format!("not a readable CSV file: {}", e)))?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let mut rows = Vec::new();
    for (i, result) in reader.records().enumerate() {
        let record =
            result.map_err(|e| LabError::parse(format!("CSV row {}: {}", i + 2, e)))?;
        rows.push((i + 2, record.iter().map(CellValue::from_text).collect()));
    }

    RowSet::from_grid(&headers, rows)
}

/// Reads the first worksheet of any workbook format calamine understands.
pub fn from_workbook(bytes: &[u8]) -> Result<RowSet> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))
        .map_err(|e| LabError::parse(format!("not a valid spreadsheet: {}", e)))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| LabError::parse("workbook contains no sheets"))?
        .map_err(|e| LabError::parse(format!("cannot read first sheet: {}", e)))?;

    // Row numbers in messages follow the sheet, not the used range.
    let first_row = range.start().map(|(row, _)| row as usize).unwrap_or(0);

    let mut grid = range
        .rows()
        .enumerate()
        .map(|(i, row)| (first_row + i + 1, row.iter().map(convert_cell).collect::<Vec<_>>()))
        .skip_while(|(_, cells)| cells.iter().all(CellValue::is_blank));

    let (_, header_cells) = grid
        .next()
        .ok_or_else(|| LabError::parse("sheet is empty: no header row found"))?;
    let headers: Vec<String> = header_cells.iter().map(|c| c.to_string()).collect();

    RowSet::from_grid(&headers, grid)
}

fn convert_cell(data: &Data) -> CellValue {
    match data {
        Data::Empty => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Float(f) => CellValue::Number(*f),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) => serial_to_cell(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
        Data::Error(e) => CellValue::Text(e.to_string()),
    }
}
