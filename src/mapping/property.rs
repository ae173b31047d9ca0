//! Property mappings

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::errors::{BoxError, ConversionError};
use crate::value::{FromSqlValue, SqlValue};

/// Value transform applied to non-null column values before conversion
pub(crate) type Transform = Arc<dyn Fn(SqlValue) -> Result<SqlValue, BoxError> + Send + Sync>;

/// Outcome of assigning a value into a field
pub(crate) enum AssignError {
    /// NULL reached a destination without an empty value
    NullIntoValueType,
    /// The value could not be converted
    Conversion(ConversionError),
}

/// Assigns an optional value (`None` = SQL NULL) into the target
pub(crate) type Assigner<T> = Arc<dyn Fn(&mut T, Option<&SqlValue>) -> Result<(), AssignError> + Send + Sync>;

/// One destination field of a mapping specification
pub struct PropertyMapping<T> {
    pub(crate) field: String,
    pub(crate) alias: String,
    pub(crate) dest_type: &'static str,
    pub(crate) nullable: bool,
    pub(crate) required: bool,
    pub(crate) transform: Option<(String, Transform)>,
    /// Identifies setter logic in the fingerprint
    pub(crate) setter_id: Option<String>,
    pub(crate) assign: Assigner<T>,
}

impl<T: 'static> PropertyMapping<T> {
    pub(crate) fn new<V, F>(field: String, setter: F) -> Self
    where
        V: FromSqlValue,
        F: Fn(&mut T, V) + Send + Sync + 'static,
    {
        let assign: Assigner<T> = Arc::new(move |target: &mut T, value: Option<&SqlValue>| -> Result<(), AssignError> {
            let converted = match value {
                None => V::null_value().ok_or(AssignError::NullIntoValueType)?,
                Some(v) => V::from_sql(v).map_err(AssignError::Conversion)?,
            };
            setter(target, converted);
            Ok(())
        });

        Self {
            alias: field.clone(),
            field,
            dest_type: V::type_name(),
            nullable: V::null_value().is_some(),
            required: false,
            transform: None,
            setter_id: None,
            assign,
        }
    }
}

impl<T> PropertyMapping<T> {
    /// Destination field name
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Active source column alias
    pub fn alias(&self) -> &str {
        &self.alias
    }

    /// Declared destination type
    pub fn dest_type(&self) -> &'static str {
        self.dest_type
    }

    /// Whether NULL maps to an empty value rather than a cast error
    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    /// Whether a missing column is an error
    pub fn is_required(&self) -> bool {
        self.required
    }

    /// Identifier of the attached transform
    pub fn transform_id(&self) -> Option<&str> {
        self.transform.as_ref().map(|(id, _)| id.as_str())
    }

    /// Identifier of the setter logic, if declared
    pub fn setter_id(&self) -> Option<&str> {
        self.setter_id.as_deref()
    }

    /// Immutable description of this mapping
    pub fn export(&self) -> PropertyExport {
        PropertyExport {
            field: self.field.clone(),
            alias: self.alias.clone(),
            dest_type: self.dest_type,
            nullable: self.nullable,
            required: self.required,
            transform: self.transform_id().map(str::to_string),
            setter: self.setter_id.clone(),
        }
    }
}

impl<T> Clone for PropertyMapping<T> {
    fn clone(&self) -> Self {
        Self {
            field: self.field.clone(),
            alias: self.alias.clone(),
            dest_type: self.dest_type,
            nullable: self.nullable,
            required: self.required,
            transform: self.transform.clone(),
            setter_id: self.setter_id.clone(),
            assign: Arc::clone(&self.assign),
        }
    }
}

impl<T> fmt::Debug for PropertyMapping<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyMapping")
            .field("field", &self.field)
            .field("alias", &self.alias)
            .field("dest_type", &self.dest_type)
            .field("nullable", &self.nullable)
            .field("required", &self.required)
            .field("transform", &self.transform_id())
            .field("setter", &self.setter_id)
            .finish()
    }
}

/// Exported, data-only view of a property mapping
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PropertyExport {
    pub field: String,
    pub alias: String,
    pub dest_type: &'static str,
    pub nullable: bool,
    pub required: bool,
    pub transform: Option<String>,
    pub setter: Option<String>,
}
