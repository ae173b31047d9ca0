//! Row source errors

use thiserror::Error;

/// Failure reported by a row source
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RowSourceError {
    #[error("ordinal {ordinal} out of range for {field_count} columns")]
    OrdinalOutOfRange { ordinal: usize, field_count: usize },

    #[error("no current row")]
    NoCurrentRow,

    #[error("read failed: {0}")]
    Read(String),
}

impl RowSourceError {
    /// Create a read failure
    pub fn read(reason: impl Into<String>) -> Self {
        RowSourceError::Read(reason.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = RowSourceError::OrdinalOutOfRange {
            ordinal: 3,
            field_count: 2,
        };
        assert_eq!(err.to_string(), "ordinal 3 out of range for 2 columns");
        assert_eq!(RowSourceError::read("socket closed").to_string(), "read failed: socket closed");
    }
}
