use crate::downloader::{self, TableView};
use crate::error::{LabError, Result};
use crate::filter::{self, Filter, FilterParams};
use crate::graph::LineChart;
use crate::loader;
use crate::spreadsheet::RowSet;

/// An uploaded file as received from the form.
#[derive(Debug, Clone, Default)]
pub struct Upload {
    pub file_name: Option<String>,
    pub bytes: Vec<u8>,
}

/// Everything one form submission carries.
#[derive(Debug, Clone, Default)]
pub struct UploadForm {
    pub file: Option<Upload>,
    pub params: FilterParams,
}

/// The filtered rows together with the filter that produced them.
#[derive(Debug, Clone)]
pub struct Filtered {
    pub filter: Filter,
    pub rows: RowSet,
}

impl Filtered {
    /// Line chart of the result; `None` when nothing matched.
    pub fn chart(&self) -> Option<LineChart> {
        LineChart::from_rows(&self.rows, self.filter.test_type.as_deref())
    }

    /// Display table; `None` when nothing matched.
    pub fn table(&self) -> Option<TableView> {
        if self.rows.is_empty() {
            None
        } else {
            Some(TableView::from_rows(&self.rows))
        }
    }

    pub fn csv(&self) -> Result<Vec<u8>> {
        downloader::to_csv(&self.rows)
    }

    pub fn xlsx(&self) -> Result<Vec<u8>> {
        downloader::to_xlsx(&self.rows)
    }
}

/// Result of one request's worth of work.
///
/// `options` is filled as soon as the upload parsed, so the selector is
/// populated even when a date bound turns out to be invalid.
#[derive(Debug)]
pub struct Outcome {
    pub options: Vec<String>,
    pub result: Result<Filtered>,
}

/// Parse the upload, extract categories and apply the filter
///
/// Each call re-reads the uploaded bytes; nothing is kept between requests.
///
/// # Arguments
/// * `form` - The submitted file and filter fields
///
/// # Returns
/// * `Outcome` - Selector options plus the filtered rows or the error that
///   stopped processing
pub fn process(form: &UploadForm) -> Outcome {
    let upload = match &form.file {
        Some(upload) if !upload.bytes.is_empty() => upload,
        _ => return failed(Vec::new(), LabError::MissingFile),
    };

    let rows = match loader::load_upload(upload.file_name.as_deref(), &upload.bytes) {
        Ok(rows) => rows,
        Err(e) => return failed(Vec::new(), e),
    };
    let options = filter::categories(&rows);

    let filter = match Filter::from_params(&form.params) {
        Ok(filter) => filter,
        Err(e) => return failed(options, e),
    };

    let filtered = filter.apply(&rows);
    log::info!(
        "filtered {:?}: {} of {} rows kept ({:?})",
        upload.file_name,
        filtered.len(),
        rows.len(),
        filter
    );

    Outcome {
        options,
        result: Ok(Filtered {
            filter,
            rows: filtered,
        }),
    }
}

fn failed(options: Vec<String>, error: LabError) -> Outcome {
    log::warn!("upload rejected: {}", error);
    Outcome {
        options,
        result: Err(error),
    }
}
