use crate::error::{LabError, Result};
use chrono::{Duration, NaiveDate, NaiveDateTime, Timelike};
use std::fmt;

/// Text layouts accepted for the `date` column besides native spreadsheet dates.
const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];
const DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"];

const DATE_DISPLAY: &str = "%Y-%m-%d";
const DATETIME_DISPLAY: &str = "%Y-%m-%d %H:%M:%S";

/// Largest serial Excel can display (9999-12-31).
const MAX_EXCEL_SERIAL: f64 = 2_958_465.0;
const SECONDS_PER_DAY: f64 = 86_400.0;

/// A single uploaded cell after it has been lifted out of the source format.
#[derive(Clone, Debug, PartialEq)]
pub enum CellValue {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

impl CellValue {
    /// Builds a cell from raw text, as found in CSV uploads.
    ///
    /// Text is only given a type when that typed value displays exactly as
    /// written, so `6.5`, `true` and `2024-01-01 12:00:00` are typed while
    /// `007`, `TRUE` and ` 6.5` stay text. Exports therefore read back
    /// unchanged.
    pub fn from_text(raw: &str) -> Self {
        if raw.trim().is_empty() {
            return CellValue::Empty;
        }

        let candidates = [
            raw.parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .map(CellValue::Number),
            raw.parse::<bool>().ok().map(CellValue::Bool),
            NaiveDate::parse_from_str(raw, DATE_DISPLAY)
                .ok()
                .map(CellValue::Date),
            NaiveDateTime::parse_from_str(raw, DATETIME_DISPLAY)
                .ok()
                .map(CellValue::DateTime),
        ];

        candidates
            .into_iter()
            .flatten()
            .find(|typed| typed.to_string() == raw)
            .unwrap_or_else(|| CellValue::Text(raw.to_string()))
    }

    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Coerces the cell to a calendar date, dropping any time of day.
    ///
    /// Numbers are read as Excel date serials.
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            CellValue::Date(d) => Some(*d),
            CellValue::DateTime(dt) => Some(dt.date()),
            CellValue::Number(n) => excel_serial_to_date(*n),
            CellValue::Text(s) => parse_date_text(s.trim()),
            CellValue::Empty | CellValue::Bool(_) => None,
        }
    }

    /// Coerces the cell to a number; `None` means the cell is blank.
    ///
    /// `sheet_row` only labels the error.
    pub fn as_number(&self, sheet_row: usize) -> Result<Option<f64>> {
        let parsed = match self {
            CellValue::Empty => return Ok(None),
            CellValue::Number(n) => Some(*n),
            CellValue::Text(s) if s.trim().is_empty() => return Ok(None),
            CellValue::Text(s) => s.trim().parse::<f64>().ok(),
            CellValue::Bool(_) | CellValue::Date(_) | CellValue::DateTime(_) => None,
        };
        parsed.map(Some).ok_or_else(|| {
            LabError::parse(format!("row {}: cannot read '{}' as a number", sheet_row, self))
        })
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Text(s) => f.write_str(s),
            CellValue::Number(n) => write!(f, "{}", format_number(*n)),
            CellValue::Bool(b) => write!(f, "{}", b),
            CellValue::Date(d) => write!(f, "{}", d.format(DATE_DISPLAY)),
            CellValue::DateTime(dt) => write!(f, "{}", dt.format(DATETIME_DISPLAY)),
        }
    }
}

/// Formats a number the way a spreadsheet shows it: integral values carry no
/// fractional part.
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

fn excel_epoch() -> NaiveDate {
    // Day 0 is 1899-12-30 once Excel's phantom 1900-02-29 is accounted for.
    NaiveDate::from_ymd_opt(1899, 12, 30).unwrap_or_default()
}

fn serial_in_range(serial: f64) -> bool {
    serial.is_finite() && (1.0..=MAX_EXCEL_SERIAL).contains(&serial)
}

/// Converts an Excel 1900-system serial (fractional days) to a date.
pub fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial_in_range(serial) {
        return None;
    }
    excel_epoch().checked_add_signed(Duration::days(serial.floor() as i64))
}

/// Converts an Excel serial to a timestamp, rounded to the second.
pub fn excel_serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial_in_range(serial) {
        return None;
    }
    let seconds = (serial * SECONDS_PER_DAY).round() as i64;
    excel_epoch()
        .and_hms_opt(0, 0, 0)?
        .checked_add_signed(Duration::seconds(seconds))
}

/// Lifts a spreadsheet serial into a cell: a date when it falls on
/// midnight, a timestamp otherwise.
pub fn serial_to_cell(serial: f64) -> CellValue {
    match excel_serial_to_datetime(serial) {
        Some(dt) if dt.num_seconds_from_midnight() == 0 => CellValue::Date(dt.date()),
        Some(dt) => CellValue::DateTime(dt),
        None => CellValue::Number(serial),
    }
}

/// Inverse of [`excel_serial_to_date`] for whole days.
pub fn date_to_excel_serial(date: NaiveDate) -> f64 {
    (date - excel_epoch()).num_days() as f64
}

pub fn datetime_to_excel_serial(dt: NaiveDateTime) -> f64 {
    date_to_excel_serial(dt.date()) + f64::from(dt.num_seconds_from_midnight()) / SECONDS_PER_DAY
}

fn parse_date_text(s: &str) -> Option<NaiveDate> {
    if s.is_empty() {
        return None;
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
                .map(|dt| dt.date())
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn noon(y: i32, m: u32, d: u32) -> NaiveDateTime {
        ymd(y, m, d).and_hms_opt(12, 0, 0).unwrap()
    }

    #[test]
    fn text_dates_in_supported_layouts() {
        assert_eq!(CellValue::Text("2024-01-15".into()).as_date(), Some(ymd(2024, 1, 15)));
        assert_eq!(CellValue::Text("2024/01/15".into()).as_date(), Some(ymd(2024, 1, 15)));
        assert_eq!(CellValue::Text("01/15/2024".into()).as_date(), Some(ymd(2024, 1, 15)));
        assert_eq!(
            CellValue::Text("2024-01-15 08:30:00".into()).as_date(),
            Some(ymd(2024, 1, 15))
        );
        assert_eq!(CellValue::DateTime(noon(2024, 1, 15)).as_date(), Some(ymd(2024, 1, 15)));
        assert_eq!(CellValue::Text("soon".into()).as_date(), None);
    }

    #[test]
    fn excel_serials_map_to_calendar_dates() {
        assert_eq!(excel_serial_to_date(45292.0), Some(ymd(2024, 1, 1)));
        assert_eq!(excel_serial_to_date(44986.75), Some(ymd(2023, 3, 1)));
        assert_eq!(excel_serial_to_date(0.0), None);
        assert_eq!(excel_serial_to_date(f64::NAN), None);
        assert_eq!(date_to_excel_serial(ymd(2024, 1, 1)), 45292.0);
    }

    #[test]
    fn serials_keep_their_time_of_day() {
        assert_eq!(serial_to_cell(45292.0), CellValue::Date(ymd(2024, 1, 1)));
        assert_eq!(serial_to_cell(45292.5), CellValue::DateTime(noon(2024, 1, 1)));
        assert_eq!(datetime_to_excel_serial(noon(2024, 1, 1)), 45292.5);
        assert_eq!(serial_to_cell(-3.0), CellValue::Number(-3.0));
    }

    #[test]
    fn numbers_display_like_a_spreadsheet() {
        assert_eq!(CellValue::Number(12.0).to_string(), "12");
        assert_eq!(CellValue::Number(6.5).to_string(), "6.5");
        assert_eq!(CellValue::Date(ymd(2024, 2, 1)).to_string(), "2024-02-01");
        assert_eq!(CellValue::DateTime(noon(2024, 2, 1)).to_string(), "2024-02-01 12:00:00");
        assert_eq!(CellValue::Empty.to_string(), "");
    }

    #[test]
    fn csv_text_is_typed_only_when_it_reads_back_identically() {
        assert_eq!(CellValue::from_text("6.8"), CellValue::Number(6.8));
        assert_eq!(CellValue::from_text("12"), CellValue::Number(12.0));
        assert_eq!(CellValue::from_text("true"), CellValue::Bool(true));
        assert_eq!(CellValue::from_text("2024-01-01"), CellValue::Date(ymd(2024, 1, 1)));
        assert_eq!(
            CellValue::from_text("2024-01-01 12:00:00"),
            CellValue::DateTime(noon(2024, 1, 1))
        );
        assert_eq!(CellValue::from_text("  "), CellValue::Empty);

        for raw in ["007", "TRUE", "12.50", " 6.5", "1e3", "NaN", "pH "] {
            assert_eq!(CellValue::from_text(raw), CellValue::Text(raw.into()), "{raw}");
        }
    }

    #[test]
    fn non_numeric_value_is_a_parse_error_naming_the_row() {
        assert_eq!(CellValue::Text(" 6.5 ".into()).as_number(2).unwrap(), Some(6.5));
        assert_eq!(CellValue::Empty.as_number(2).unwrap(), None);
        let err = CellValue::Text("high".into()).as_number(7).unwrap_err();
        assert!(matches!(err, LabError::Parse(ref m) if m.contains("row 7") && m.contains("high")));
    }
}
