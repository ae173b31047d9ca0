//! Conversion from [`SqlValue`] into destination field types

use chrono::{DateTime, Utc};

use super::SqlValue;
use crate::errors::ConversionError;

/// A Rust type that a column value can be assigned into.
///
/// `null_value` decides the NULL rule: `Some(empty)` for reference and
/// nullable destinations, `None` for value types, which turns a NULL into a
/// cast error at materialization time.
pub trait FromSqlValue: Sized + Send + 'static {
    /// Destination type name reported in binding and cast errors
    fn type_name() -> &'static str;

    /// Convert a non-null value
    fn from_sql(value: &SqlValue) -> Result<Self, ConversionError>;

    /// The value assigned when the column holds SQL NULL
    fn null_value() -> Option<Self> {
        None
    }
}

fn mismatch<T: FromSqlValue>(value: &SqlValue) -> ConversionError {
    ConversionError::TypeMismatch {
        expected: T::type_name(),
        found: value.type_name(),
    }
}

fn narrow<T>(wide: i64) -> Result<T, ConversionError>
where
    T: FromSqlValue + TryFrom<i64>,
{
    T::try_from(wide).map_err(|_| ConversionError::OutOfRange {
        expected: T::type_name(),
        value: wide.to_string(),
    })
}

impl FromSqlValue for bool {
    fn type_name() -> &'static str {
        "bool"
    }

    fn from_sql(value: &SqlValue) -> Result<Self, ConversionError> {
        match value {
            SqlValue::Bool(b) => Ok(*b),
            SqlValue::Int(0) => Ok(false),
            SqlValue::Int(1) => Ok(true),
            _ => Err(mismatch::<Self>(value)),
        }
    }
}

impl FromSqlValue for i64 {
    fn type_name() -> &'static str {
        "bigint"
    }

    fn from_sql(value: &SqlValue) -> Result<Self, ConversionError> {
        match value {
            SqlValue::Int(i) => Ok(*i),
            SqlValue::Bool(b) => Ok(i64::from(*b)),
            _ => Err(mismatch::<Self>(value)),
        }
    }
}

macro_rules! impl_narrow_int {
    ($($ty:ty => $name:literal),* $(,)?) => {
        $(
            impl FromSqlValue for $ty {
                fn type_name() -> &'static str {
                    $name
                }

                fn from_sql(value: &SqlValue) -> Result<Self, ConversionError> {
                    match value {
                        SqlValue::Int(i) => narrow::<Self>(*i),
                        SqlValue::Bool(b) => Ok(<$ty>::from(*b)),
                        _ => Err(mismatch::<Self>(value)),
                    }
                }
            }
        )*
    };
}

impl_narrow_int!(i16 => "smallint", i32 => "int", u32 => "uint", u64 => "ubigint");

impl FromSqlValue for f64 {
    fn type_name() -> &'static str {
        "double"
    }

    fn from_sql(value: &SqlValue) -> Result<Self, ConversionError> {
        match value {
            SqlValue::Float(x) => Ok(*x),
            SqlValue::Int(i) => Ok(*i as f64),
            _ => Err(mismatch::<Self>(value)),
        }
    }
}

impl FromSqlValue for f32 {
    fn type_name() -> &'static str {
        "real"
    }

    fn from_sql(value: &SqlValue) -> Result<Self, ConversionError> {
        match value {
            SqlValue::Float(x) => Ok(*x as f32),
            SqlValue::Int(i) => Ok(*i as f32),
            _ => Err(mismatch::<Self>(value)),
        }
    }
}

impl FromSqlValue for String {
    fn type_name() -> &'static str {
        "string"
    }

    fn from_sql(value: &SqlValue) -> Result<Self, ConversionError> {
        match value {
            SqlValue::Text(s) => Ok(s.clone()),
            SqlValue::Bytes(_) | SqlValue::Null => Err(mismatch::<Self>(value)),
            other => Ok(other.to_string()),
        }
    }

    fn null_value() -> Option<Self> {
        Some(String::new())
    }
}

impl FromSqlValue for Vec<u8> {
    fn type_name() -> &'static str {
        "bytes"
    }

    fn from_sql(value: &SqlValue) -> Result<Self, ConversionError> {
        match value {
            SqlValue::Bytes(b) => Ok(b.clone()),
            SqlValue::Text(s) => Ok(s.as_bytes().to_vec()),
            _ => Err(mismatch::<Self>(value)),
        }
    }

    fn null_value() -> Option<Self> {
        Some(Vec::new())
    }
}

impl FromSqlValue for DateTime<Utc> {
    fn type_name() -> &'static str {
        "timestamp"
    }

    fn from_sql(value: &SqlValue) -> Result<Self, ConversionError> {
        match value {
            SqlValue::Timestamp(t) => Ok(*t),
            SqlValue::Text(s) => DateTime::parse_from_rfc3339(s)
                .map(|t| t.with_timezone(&Utc))
                .map_err(|e| ConversionError::custom(format!("invalid timestamp '{}': {}", s, e))),
            _ => Err(mismatch::<Self>(value)),
        }
    }
}

impl FromSqlValue for SqlValue {
    fn type_name() -> &'static str {
        "any"
    }

    fn from_sql(value: &SqlValue) -> Result<Self, ConversionError> {
        Ok(value.clone())
    }

    fn null_value() -> Option<Self> {
        Some(SqlValue::Null)
    }
}

impl<T: FromSqlValue> FromSqlValue for Option<T> {
    fn type_name() -> &'static str {
        T::type_name()
    }

    fn from_sql(value: &SqlValue) -> Result<Self, ConversionError> {
        T::from_sql(value).map(Some)
    }

    fn null_value() -> Option<Self> {
        Some(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_int_narrowing() {
        assert_eq!(i32::from_sql(&SqlValue::Int(42)), Ok(42));
        assert!(matches!(
            i32::from_sql(&SqlValue::Int(i64::MAX)),
            Err(ConversionError::OutOfRange { expected: "int", .. })
        ));
        assert!(u32::from_sql(&SqlValue::Int(-1)).is_err());
    }

    #[test]
    fn test_type_mismatch() {
        let err = i32::from_sql(&SqlValue::from("abc")).unwrap_err();
        assert_eq!(
            err,
            ConversionError::TypeMismatch {
                expected: "int",
                found: "text"
            }
        );
    }

    #[test]
    fn test_null_rules() {
        assert_eq!(i32::null_value(), None);
        assert_eq!(bool::null_value(), None);
        assert_eq!(String::null_value(), Some(String::new()));
        assert_eq!(Option::<i32>::null_value(), Some(None));
        assert_eq!(Vec::<u8>::null_value(), Some(Vec::new()));
    }

    #[test]
    fn test_string_from_scalars() {
        assert_eq!(String::from_sql(&SqlValue::Int(5)).unwrap(), "5");
        assert!(String::from_sql(&SqlValue::Bytes(vec![1])).is_err());
    }

    #[test]
    fn test_timestamp_from_text() {
        let t = DateTime::<Utc>::from_sql(&SqlValue::from("2024-01-02T03:04:05Z")).unwrap();
        assert_eq!(t.to_rfc3339(), "2024-01-02T03:04:05+00:00");
        assert!(DateTime::<Utc>::from_sql(&SqlValue::from("yesterday")).is_err());
    }

    #[test]
    fn test_option_type_name() {
        assert_eq!(Option::<i64>::type_name(), "bigint");
        assert_eq!(Option::<i64>::from_sql(&SqlValue::Int(3)).unwrap(), Some(3));
    }
}
