//! Mapping specification and its builder

use std::any::type_name;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use super::property::{PropertyExport, PropertyMapping, Transform};
use super::{Shape, Target};
use crate::errors::{BoxError, MapError, MapResult};
use crate::fingerprint::{Fingerprint, FingerprintBuilder};
use crate::value::{FromSqlValue, SqlValue};

/// Default key column of a pair target
pub const DEFAULT_KEY_ALIAS: &str = "Key";

/// Default value column of a pair target
pub const DEFAULT_VALUE_ALIAS: &str = "Value";

/// Validated, immutable mapping specification for target type `T`
pub struct MappingSpec<T> {
    properties: Vec<PropertyMapping<T>>,
    key_alias: String,
    value_alias: String,
}

impl<T: Target> MappingSpec<T> {
    /// Start building a specification
    pub fn builder() -> MappingSpecBuilder<T> {
        MappingSpecBuilder::new()
    }

    /// Specification with no property mappings (untyped, scalar and pair targets)
    pub fn empty() -> Self {
        Self {
            properties: Vec::new(),
            key_alias: DEFAULT_KEY_ALIAS.to_string(),
            value_alias: DEFAULT_VALUE_ALIAS.to_string(),
        }
    }

    /// Property mappings in declaration order
    pub fn properties(&self) -> &[PropertyMapping<T>] {
        &self.properties
    }

    /// Alias of the key column for pair targets
    pub fn key_alias(&self) -> &str {
        &self.key_alias
    }

    /// Alias of the value column for pair targets
    pub fn value_alias(&self) -> &str {
        &self.value_alias
    }

    /// Name identifying the target type
    pub fn target_name(&self) -> &'static str {
        type_name::<T>()
    }

    /// Ordered export of every property mapping
    pub fn export(&self) -> Vec<PropertyExport> {
        self.properties.iter().map(PropertyMapping::export).collect()
    }

    /// Fingerprint of target identity, shape and exported mappings
    pub fn fingerprint(&self) -> Fingerprint {
        let mut builder = FingerprintBuilder::new("rowcast.mapping");
        builder
            .str(self.target_name())
            .str(T::shape().name())
            .str(&self.key_alias)
            .str(&self.value_alias)
            .u64(self.properties.len() as u64);
        for p in &self.properties {
            builder
                .str(&p.field)
                .str(&p.alias)
                .str(p.dest_type)
                .u8(u8::from(p.nullable))
                .u8(u8::from(p.required))
                .opt_str(p.transform_id())
                .opt_str(p.setter_id());
        }
        builder.finish()
    }
}

impl<T> Clone for MappingSpec<T> {
    fn clone(&self) -> Self {
        Self {
            properties: self.properties.clone(),
            key_alias: self.key_alias.clone(),
            value_alias: self.value_alias.clone(),
        }
    }
}

impl<T> fmt::Debug for MappingSpec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MappingSpec")
            .field("target", &type_name::<T>())
            .field("properties", &self.properties)
            .field("key_alias", &self.key_alias)
            .field("value_alias", &self.value_alias)
            .finish()
    }
}

/// Fluent builder for [`MappingSpec`].
///
/// `alias`, `transform` and `required` modify the most recently declared
/// field. Problems are collected and reported together by `build`.
pub struct MappingSpecBuilder<T> {
    properties: Vec<PropertyMapping<T>>,
    key_alias: String,
    value_alias: String,
    problems: Vec<String>,
}

impl<T: Target> MappingSpecBuilder<T> {
    fn new() -> Self {
        Self {
            properties: Vec::new(),
            key_alias: DEFAULT_KEY_ALIAS.to_string(),
            value_alias: DEFAULT_VALUE_ALIAS.to_string(),
            problems: Vec::new(),
        }
    }

    /// Declare a destination field; its alias defaults to the field name.
    ///
    /// The setter closure is not part of the fingerprint. Two specifications
    /// for the same target whose fields differ only in setter logic share one
    /// compiled mapper unless [`setter_id`](Self::setter_id) tells them apart.
    pub fn field<V, F>(mut self, name: impl Into<String>, setter: F) -> Self
    where
        V: FromSqlValue,
        F: Fn(&mut T, V) + Send + Sync + 'static,
    {
        self.properties.push(PropertyMapping::new(name.into(), setter));
        self
    }

    /// Read the last declared field from a differently named column
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        let alias = alias.into();
        match self.properties.last_mut() {
            Some(p) => p.alias = alias,
            None => self.problems.push(format!("alias '{}' declared before any field", alias)),
        }
        self
    }

    /// Transform non-null values of the last declared field before conversion.
    ///
    /// `id` identifies the transform in the fingerprint; two specifications
    /// that differ only in transform logic must use different ids.
    pub fn transform<F, E>(mut self, id: impl Into<String>, f: F) -> Self
    where
        F: Fn(SqlValue) -> Result<SqlValue, E> + Send + Sync + 'static,
        E: Into<BoxError>,
    {
        let id = id.into();
        let transform: Transform =
            Arc::new(move |v: SqlValue| -> Result<SqlValue, BoxError> { f(v).map_err(Into::into) });
        match self.properties.last_mut() {
            Some(p) if p.transform.is_some() => self
                .problems
                .push(format!("field '{}' declares more than one transform", p.field)),
            Some(p) => p.transform = Some((id, transform)),
            None => self.problems.push(format!("transform '{}' declared before any field", id)),
        }
        self
    }

    /// Identify the setter logic of the last declared field in the fingerprint
    pub fn setter_id(mut self, id: impl Into<String>) -> Self {
        let id = id.into();
        match self.properties.last_mut() {
            Some(p) => p.setter_id = Some(id),
            None => self.problems.push(format!("setter id '{}' declared before any field", id)),
        }
        self
    }

    /// Make a missing column an error for the last declared field
    pub fn required(mut self) -> Self {
        match self.properties.last_mut() {
            Some(p) => p.required = true,
            None => self.problems.push("required() declared before any field".to_string()),
        }
        self
    }

    /// Override the key column of a pair target
    pub fn key_alias(mut self, alias: impl Into<String>) -> Self {
        self.key_alias = alias.into();
        self
    }

    /// Override the value column of a pair target
    pub fn value_alias(mut self, alias: impl Into<String>) -> Self {
        self.value_alias = alias.into();
        self
    }

    /// Validate and freeze the specification
    pub fn build(self) -> MapResult<MappingSpec<T>> {
        let mut problems = self.problems;
        let mut fields = HashSet::new();
        let mut aliases = HashSet::new();

        for p in &self.properties {
            if p.field.trim().is_empty() {
                problems.push("field name must not be empty".to_string());
            }
            if p.alias.trim().is_empty() {
                problems.push(format!("field '{}' has an empty alias", p.field));
            }
            if !fields.insert(p.field.to_lowercase()) {
                problems.push(format!("duplicate destination field '{}'", p.field));
            }
            if !aliases.insert(p.alias.to_lowercase()) {
                problems.push(format!(
                    "alias '{}' of field '{}' conflicts with another field",
                    p.alias, p.field
                ));
            }
        }

        if let Shape::Pair(_) = T::shape() {
            if self.key_alias.trim().is_empty() || self.value_alias.trim().is_empty() {
                problems.push("pair aliases must not be empty".to_string());
            } else if self.key_alias.eq_ignore_ascii_case(&self.value_alias) {
                problems.push(format!(
                    "pair key and value both read column '{}'",
                    self.key_alias
                ));
            }
        }

        if !problems.is_empty() {
            return Err(MapError::configuration(format!(
                "invalid mapping for {}: {}",
                type_name::<T>(),
                problems.join("; ")
            )));
        }

        Ok(MappingSpec {
            properties: self.properties,
            key_alias: self.key_alias,
            value_alias: self.value_alias,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ConversionError;

    #[derive(Default)]
    struct Person {
        id: i32,
        name: String,
    }

    impl Target for Person {
        fn shape() -> Shape<Self> {
            Shape::structured()
        }
    }

    fn person_spec(name_alias: &str) -> MappingSpec<Person> {
        MappingSpec::<Person>::builder()
            .field("Id", |p: &mut Person, v: i32| p.id = v)
            .field("Name", |p: &mut Person, v: String| p.name = v)
            .alias(name_alias)
            .build()
            .unwrap()
    }

    #[test]
    fn test_export_in_declaration_order() {
        let spec = person_spec("full_name");
        let export = spec.export();
        assert_eq!(export.len(), 2);
        assert_eq!(export[0].field, "Id");
        assert_eq!(export[0].alias, "Id");
        assert_eq!(export[0].dest_type, "int");
        assert_eq!(export[1].alias, "full_name");
    }

    #[test]
    fn test_fingerprint_stable() {
        assert_eq!(
            person_spec("full_name").fingerprint(),
            person_spec("full_name").fingerprint()
        );
    }

    #[test]
    fn test_alias_changes_fingerprint() {
        assert_ne!(
            person_spec("full_name").fingerprint(),
            person_spec("name").fingerprint()
        );
    }

    #[test]
    fn test_transform_id_changes_fingerprint() {
        let plain = person_spec("Name");
        let transformed = MappingSpec::<Person>::builder()
            .field("Id", |p: &mut Person, v: i32| p.id = v)
            .field("Name", |p: &mut Person, v: String| p.name = v)
            .transform("upper", |v: SqlValue| -> Result<SqlValue, ConversionError> { Ok(v) })
            .build()
            .unwrap();
        assert_ne!(plain.fingerprint(), transformed.fingerprint());
    }

    #[test]
    fn test_setter_id_changes_fingerprint() {
        let doubled = || {
            MappingSpec::<Person>::builder()
                .field("Id", |p: &mut Person, v: i32| p.id = v * 2)
                .field("Name", |p: &mut Person, v: String| p.name = v)
        };
        // setter closures alone are invisible to the fingerprint
        assert_eq!(
            person_spec("Name").fingerprint(),
            doubled().build().unwrap().fingerprint()
        );

        let tagged = MappingSpec::<Person>::builder()
            .field("Id", |p: &mut Person, v: i32| p.id = v * 2)
            .setter_id("double")
            .field("Name", |p: &mut Person, v: String| p.name = v)
            .build()
            .unwrap();
        assert_ne!(person_spec("Name").fingerprint(), tagged.fingerprint());
        assert_eq!(tagged.export()[0].setter.as_deref(), Some("double"));
    }

    #[test]
    fn test_duplicate_field_rejected() {
        let err = MappingSpec::<Person>::builder()
            .field("Id", |p: &mut Person, v: i32| p.id = v)
            .alias("a")
            .field("id", |p: &mut Person, v: i32| p.id = v)
            .alias("b")
            .build()
            .unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("duplicate destination field"));
    }

    #[test]
    fn test_conflicting_alias_rejected() {
        let err = MappingSpec::<Person>::builder()
            .field("Id", |p: &mut Person, v: i32| p.id = v)
            .alias("x")
            .field("Name", |p: &mut Person, v: String| p.name = v)
            .alias("X")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("conflicts"));
    }

    #[test]
    fn test_modifier_before_field_rejected() {
        let err = MappingSpec::<Person>::builder()
            .required()
            .field("Id", |p: &mut Person, v: i32| p.id = v)
            .build()
            .unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_empty_alias_rejected() {
        let err = MappingSpec::<Person>::builder()
            .field("Id", |p: &mut Person, v: i32| p.id = v)
            .alias("  ")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("empty alias"));
    }

    #[test]
    fn test_pair_aliases() {
        let spec = MappingSpec::<(String, i64)>::builder()
            .key_alias("code")
            .value_alias("total")
            .build()
            .unwrap();
        assert_eq!(spec.key_alias(), "code");
        assert_eq!(spec.value_alias(), "total");

        let err = MappingSpec::<(String, i64)>::builder()
            .key_alias("same")
            .value_alias("SAME")
            .build()
            .unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_target_identity_in_fingerprint() {
        assert_ne!(
            MappingSpec::<i32>::empty().fingerprint(),
            MappingSpec::<i64>::empty().fingerprint()
        );
    }
}
