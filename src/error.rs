use thiserror::Error;

use crate::window::BillingMonth;

#[derive(Error, Debug)]
pub enum NetMeterError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[cfg(feature = "xlsx")]
    #[error("Spreadsheet error: {0}")]
    Workbook(#[from] calamine::Error),

    #[error("Archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Unsupported file type: {0} (expected .csv, .xlsx, .xls or .ods)")]
    UnsupportedFile(String),

    #[error("Workbook has no worksheets")]
    EmptyWorkbook,

    #[error("File has no header row")]
    MissingHeader,

    #[error("Unknown account: {0}")]
    UnknownAccount(String),

    #[error("Invalid month: {0} (expected YYYY-MM)")]
    InvalidMonth(String),

    #[error("Please select at least one account")]
    NoAccountsSelected,

    #[error("Start month {from} must not be after end month {to}")]
    InvertedRange { from: BillingMonth, to: BillingMonth },

    #[error("PDF error: {0}")]
    Pdf(String),

    #[error("Settings error: {0}")]
    Settings(String),
}

pub type Result<T> = std::result::Result<T, NetMeterError>;
