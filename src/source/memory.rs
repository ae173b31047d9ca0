//! Vector-backed row source

use std::time::Duration;

use super::{AsyncRowSource, RowReader, RowSource, RowSourceError};
use crate::value::SqlValue;

/// An in-memory row source.
///
/// Rows shorter than the column list read as NULL in the missing positions.
#[derive(Debug, Clone)]
pub struct MemoryRowSource {
    columns: Vec<String>,
    rows: Vec<Vec<SqlValue>>,
    cursor: Option<usize>,
    next: usize,
    fail_at: Option<usize>,
    async_delay: Option<Duration>,
    advances: usize,
}

impl MemoryRowSource {
    /// Create a source over the given column names and rows
    pub fn new<S: Into<String>>(columns: impl IntoIterator<Item = S>, rows: Vec<Vec<SqlValue>>) -> Self {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows,
            cursor: None,
            next: 0,
            fail_at: None,
            async_delay: None,
            advances: 0,
        }
    }

    /// Fail with a read error when advancing onto the given row index
    pub fn fail_at(mut self, row: usize) -> Self {
        self.fail_at = Some(row);
        self
    }

    /// Sleep before every async advance
    pub fn with_async_delay(mut self, delay: Duration) -> Self {
        self.async_delay = Some(delay);
        self
    }

    /// Number of successful or failed advance calls so far
    pub fn advances(&self) -> usize {
        self.advances
    }

    fn current(&self) -> Result<&[SqlValue], RowSourceError> {
        self.cursor
            .and_then(|i| self.rows.get(i))
            .map(|r| r.as_slice())
            .ok_or(RowSourceError::NoCurrentRow)
    }

    fn check_ordinal(&self, ordinal: usize) -> Result<(), RowSourceError> {
        if ordinal >= self.columns.len() {
            return Err(RowSourceError::OrdinalOutOfRange {
                ordinal,
                field_count: self.columns.len(),
            });
        }
        Ok(())
    }
}

impl RowReader for MemoryRowSource {
    fn field_count(&self) -> usize {
        self.columns.len()
    }

    fn field_name(&self, ordinal: usize) -> Option<&str> {
        self.columns.get(ordinal).map(String::as_str)
    }

    fn is_null(&self, ordinal: usize) -> Result<bool, RowSourceError> {
        self.check_ordinal(ordinal)?;
        Ok(self.current()?.get(ordinal).map_or(true, SqlValue::is_null))
    }

    fn value(&self, ordinal: usize) -> Result<SqlValue, RowSourceError> {
        self.check_ordinal(ordinal)?;
        Ok(self
            .current()?
            .get(ordinal)
            .cloned()
            .unwrap_or(SqlValue::Null))
    }
}

impl RowSource for MemoryRowSource {
    fn advance(&mut self) -> Result<bool, RowSourceError> {
        self.advances += 1;
        let next = self.next;
        if self.fail_at == Some(next) {
            return Err(RowSourceError::read(format!("injected failure at row {}", next)));
        }
        if next < self.rows.len() {
            self.cursor = Some(next);
            self.next += 1;
            Ok(true)
        } else {
            self.cursor = None;
            Ok(false)
        }
    }
}

impl AsyncRowSource for MemoryRowSource {
    async fn advance_async(&mut self) -> Result<bool, RowSourceError> {
        if let Some(delay) = self.async_delay {
            tokio::time::sleep(delay).await;
        }
        self.advance()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> MemoryRowSource {
        MemoryRowSource::new(
            ["id", "name"],
            vec![
                vec![SqlValue::Int(1), SqlValue::from("a")],
                vec![SqlValue::Int(2)],
            ],
        )
    }

    #[test]
    fn test_iterates_in_order() {
        let mut src = source();
        assert!(src.advance().unwrap());
        assert_eq!(src.value(0).unwrap(), SqlValue::Int(1));
        assert!(src.advance().unwrap());
        assert_eq!(src.value(0).unwrap(), SqlValue::Int(2));
        assert!(!src.advance().unwrap());
    }

    #[test]
    fn test_short_row_reads_null() {
        let mut src = source();
        src.advance().unwrap();
        src.advance().unwrap();
        assert!(src.is_null(1).unwrap());
        assert_eq!(src.value(1).unwrap(), SqlValue::Null);
    }

    #[test]
    fn test_no_current_row() {
        let src = source();
        assert_eq!(src.value(0), Err(RowSourceError::NoCurrentRow));
    }

    #[test]
    fn test_ordinal_out_of_range() {
        let mut src = source();
        src.advance().unwrap();
        assert!(matches!(
            src.value(5),
            Err(RowSourceError::OrdinalOutOfRange { ordinal: 5, field_count: 2 })
        ));
    }

    #[test]
    fn test_injected_failure() {
        let mut src = source().fail_at(1);
        assert!(src.advance().unwrap());
        assert!(src.advance().is_err());
    }

    #[tokio::test]
    async fn test_async_advance() {
        let mut src = source().with_async_delay(Duration::from_millis(1));
        assert!(src.advance_async().await.unwrap());
        assert!(src.advance_async().await.unwrap());
        assert!(!src.advance_async().await.unwrap());
        assert_eq!(src.advances(), 3);
    }
}
