use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Year {0} appears more than once in the report")]
    DuplicateYear(i32),

    #[error("Unsupported year {0}: must be between 2000 and 2099")]
    UnsupportedYear(i32),

    #[error("Report contains no year blocks")]
    EmptyReport,

    #[error("Invalid month {0}: must be between 1 and 12")]
    InvalidMonth(u32),

    #[error("Invalid date label '{0}': expected a month abbreviation and two-digit year (e.g. Mar/21)")]
    InvalidDateLabel(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Total mismatch on {date}: total row ({total}) != sum of products ({products}), difference {difference}")]
    TotalMismatch {
        date: String,
        total: f64,
        products: f64,
        difference: f64,
    },

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ReportError>;
