use thiserror::Error;

/// Errors raised while turning an upload into filtered output.
///
/// Every variant is caught at the request boundary and shown to the user as a
/// plain-text message; none of them stop the server.
#[derive(Debug, Error)]
pub enum LabError {
    /// The form was submitted without a file (or with an empty one).
    #[error("No file uploaded.")]
    MissingFile,

    /// The upload is not a readable spreadsheet or breaks the expected schema.
    #[error("{0}")]
    Parse(String),

    /// A date-range bound is not a `YYYY-MM-DD` calendar date.
    #[error("invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),

    /// The request body could not be read as a multipart form.
    #[error("malformed form submission: {0}")]
    Multipart(String),

    #[error("CSV export failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("XLSX export failed: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl LabError {
    pub(crate) fn parse(msg: impl Into<String>) -> Self {
        LabError::Parse(msg.into())
    }

    /// Message shown in the page's error region.
    ///
    /// A missing upload reads as-is; everything else is prefixed the way the
    /// form has always reported processing failures.
    pub fn user_message(&self) -> String {
        match self {
            LabError::MissingFile => self.to_string(),
            other => format!("Error processing file: {}", other),
        }
    }
}

pub type Result<T> = std::result::Result<T, LabError>;
