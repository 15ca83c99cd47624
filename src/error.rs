//! Error types shared by the feature pipeline and the data helpers

use crate::data::DataType;
use thiserror::Error;

/// Result alias for library operations
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors raised by feature derivation, data-quality checks and evaluation.
///
/// Every error is local to the call that produced it; nothing here is fatal
/// to the process.
#[derive(Debug, Error)]
pub enum Error {
    /// Missing or malformed record field, bad IP string, unparsable timestamp
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Numeric check requested on a column whose declared type is not numeric
    #[error("column `{column}` is not numeric (declared type {dtype})")]
    NonNumericColumn { column: String, dtype: DataType },

    /// Prediction and label sequences differ in length
    #[error("dimension mismatch: {predictions} predictions vs {labels} labels")]
    DimensionMismatch { predictions: usize, labels: usize },

    /// Column name not present in the dataset
    #[error("unknown column `{0}`")]
    UnknownColumn(String),

    /// Pre-fit preprocessing table is incomplete or inconsistent
    #[error("invalid preprocessing table: {0}")]
    InvalidPreprocessing(String),
}

impl Error {
    pub(crate) fn invalid_input(msg: impl Into<String>) -> Self {
        Error::InvalidInput(msg.into())
    }

    /// Whether the caller supplied bad data (as opposed to a broken setup).
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Error::InvalidPreprocessing(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = Error::NonNumericColumn {
            column: "country".to_string(),
            dtype: DataType::Object,
        };
        assert_eq!(
            err.to_string(),
            "column `country` is not numeric (declared type object)"
        );

        let err = Error::DimensionMismatch {
            predictions: 3,
            labels: 4,
        };
        assert!(err.to_string().contains("3 predictions vs 4 labels"));
    }

    #[test]
    fn test_client_error_classification() {
        assert!(Error::invalid_input("bad ip").is_client_error());
        assert!(!Error::InvalidPreprocessing("missing range".into()).is_client_error());
    }
}
