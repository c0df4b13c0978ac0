use crate::error::{LabError, Result};
use crate::spreadsheet::{Record, RowSet};
use chrono::NaiveDate;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

lazy_static! {
    static ref ISO_DATE_REGEX: Regex = Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap();
}

/// Filter fields exactly as they arrive from the form.
///
/// An empty `test_type` and blank dates mean "no constraint". A non-empty
/// `test_type` is compared byte for byte, surrounding spaces included.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterParams {
    #[serde(default)]
    pub test_type: String,
    #[serde(default)]
    pub start_date: String,
    #[serde(default)]
    pub end_date: String,
}

/// Parsed, typed filter predicates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    pub test_type: Option<String>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl Filter {
    /// Parses the form fields. Date bounds must be `YYYY-MM-DD`.
    pub fn from_params(params: &FilterParams) -> Result<Filter> {
        Ok(Filter {
            test_type: Some(params.test_type.clone()).filter(|t| !t.is_empty()),
            start: non_blank(&params.start_date).map(parse_iso_date).transpose()?,
            end: non_blank(&params.end_date).map(parse_iso_date).transpose()?,
        })
    }

    pub fn is_unconstrained(&self) -> bool {
        self.test_type.is_none() && self.start.is_none() && self.end.is_none()
    }

    /// Whether a record satisfies every active predicate. Bounds are inclusive.
    pub fn matches(&self, record: &Record) -> bool {
        if let Some(test_type) = &self.test_type {
            if record.test_type != *test_type {
                return false;
            }
        }
        if let Some(start) = self.start {
            if record.date < start {
                return false;
            }
        }
        if let Some(end) = self.end {
            if record.date > end {
                return false;
            }
        }
        true
    }

    /// Rows satisfying all predicates, original order preserved.
    pub fn apply(&self, rows: &RowSet) -> RowSet {
        rows.retain_copy(|record| self.matches(record))
    }
}

/// Distinct `test_type` values in first-seen order, for the selector.
pub fn categories(rows: &RowSet) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    for record in rows.records() {
        if !record.test_type.is_empty() && !seen.contains(&record.test_type) {
            seen.push(record.test_type.clone());
        }
    }
    seen
}

/// Parses a strict ISO calendar date (`YYYY-MM-DD`).
pub fn parse_iso_date(raw: &str) -> Result<NaiveDate> {
    if !ISO_DATE_REGEX.is_match(raw) {
        return Err(LabError::InvalidDate(raw.to_string()));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| LabError::InvalidDate(raw.to_string()))
}

fn non_blank(s: &str) -> Option<&str> {
    let trimmed = s.trim();
    if trimmed.is_empty() { None } else { Some(trimmed) }
}
