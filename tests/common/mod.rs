#![allow(dead_code)]

use labsheet::pipeline::{Upload, UploadForm};
use labsheet::FilterParams;
use rust_xlsxwriter::{Format, Workbook};

/// A value placed in a fixture workbook.
pub enum Fixture<'a> {
    Text(&'a str),
    Number(f64),
    /// Excel serial written with a `yyyy-mm-dd` number format.
    Date(f64),
    /// Excel serial written with a `yyyy-mm-dd hh:mm` number format.
    DateTime(f64),
}

/// Builds an xlsx workbook in memory with one sheet holding `rows`.
pub fn workbook(rows: &[Vec<Fixture>]) -> Vec<u8> {
    let mut workbook = Workbook::new();
    let date_format = Format::new().set_num_format("yyyy-mm-dd");
    let datetime_format = Format::new().set_num_format("yyyy-mm-dd hh:mm");
    let sheet = workbook.add_worksheet();

    for (r, row) in rows.iter().enumerate() {
        for (c, cell) in row.iter().enumerate() {
            let (r, c) = (r as u32, c as u16);
            match cell {
                Fixture::Text(s) => {
                    sheet.write_string(r, c, *s).unwrap();
                }
                Fixture::Number(n) => {
                    sheet.write_number(r, c, *n).unwrap();
                }
                Fixture::Date(serial) => {
                    sheet.write_number_with_format(r, c, *serial, &date_format).unwrap();
                }
                Fixture::DateTime(serial) => {
                    sheet.write_number_with_format(r, c, *serial, &datetime_format).unwrap();
                }
            }
        }
    }

    workbook.save_to_buffer().unwrap()
}

/// The worked example: two pH readings and one nitrogen reading, with
/// headers in the untidy form people actually type them.
pub fn lab_workbook() -> Vec<u8> {
    use Fixture::*;
    workbook(&[
        vec![Text(" Date "), Text("Test Type"), Text("Value"), Text("Sample Site")],
        vec![Text("2024-01-01"), Text("pH"), Number(6.5), Text("North field")],
        vec![Text("2024-02-01"), Text("pH"), Number(6.8), Text("North field")],
        vec![Text("2024-01-15"), Text("N"), Number(12.0), Text("Creek, east bank")],
    ])
}

pub fn form(bytes: Vec<u8>, test_type: &str, start: &str, end: &str) -> UploadForm {
    UploadForm {
        file: Some(Upload {
            file_name: Some("lab_results.xlsx".to_string()),
            bytes,
        }),
        params: FilterParams {
            test_type: test_type.to_string(),
            start_date: start.to_string(),
            end_date: end.to_string(),
        },
    }
}
