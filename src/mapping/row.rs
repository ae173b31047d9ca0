//! Untyped, ordered row

use indexmap::IndexMap;
use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::column::normalize;
use crate::errors::ConversionError;
use crate::value::{FromSqlValue, SqlValue};

/// A row that keeps every column name and value in source order.
///
/// Ordinals match the row source exactly, repeated names included. Name
/// lookup is case-insensitive, folded the same way as [`ColumnIndex`], and
/// resolves a repeated name to its first occurrence.
///
/// [`ColumnIndex`]: crate::column::ColumnIndex
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    columns: Vec<(String, SqlValue)>,
    /// Folded name → first ordinal
    names: IndexMap<String, usize>,
}

impl Row {
    /// Create an empty row
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty row with room for `capacity` columns
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            columns: Vec::with_capacity(capacity),
            names: IndexMap::with_capacity(capacity),
        }
    }

    /// Append a column at the next ordinal
    pub fn insert(&mut self, name: impl Into<String>, value: SqlValue) {
        let name = name.into();
        let ordinal = self.columns.len();
        self.names.entry(normalize(&name)).or_insert(ordinal);
        self.columns.push((name, value));
    }

    /// Ordinal of the first column with this name
    pub fn ordinal(&self, name: &str) -> Option<usize> {
        self.names.get(&normalize(name)).copied()
    }

    /// Value by column name
    pub fn get(&self, name: &str) -> Option<&SqlValue> {
        self.ordinal(name).and_then(|ordinal| self.value_at(ordinal))
    }

    /// Value by ordinal
    pub fn value_at(&self, ordinal: usize) -> Option<&SqlValue> {
        self.columns.get(ordinal).map(|(_, v)| v)
    }

    /// Column name and value by ordinal
    pub fn get_index(&self, ordinal: usize) -> Option<(&str, &SqlValue)> {
        self.columns.get(ordinal).map(|(k, v)| (k.as_str(), v))
    }

    /// Typed value by column name; NULL follows the type's null rule
    pub fn get_as<T: FromSqlValue>(&self, name: &str) -> Result<Option<T>, ConversionError> {
        match self.get(name) {
            None => Ok(None),
            Some(SqlValue::Null) => Ok(T::null_value()),
            Some(value) => T::from_sql(value).map(Some),
        }
    }

    /// Column names in order, repeats included
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(k, _)| k.as_str())
    }

    /// Iterate (name, value) pairs in order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &SqlValue)> {
        self.columns.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of columns
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Returns true if the row has no columns
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Serializes as an object in column order. A repeated name is emitted
/// once per occurrence.
impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for (name, value) in &self.columns {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}
