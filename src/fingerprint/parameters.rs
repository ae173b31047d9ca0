//! Bound parameter values

use super::{Fingerprint, FingerprintBuilder};
use crate::value::SqlValue;

/// Ordered (name, value) pairs already bound for one invocation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterSet {
    params: Vec<(String, SqlValue)>,
}

impl ParameterSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a parameter
    pub fn with(mut self, name: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        self.push(name, value);
        self
    }

    /// Append a parameter in place
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<SqlValue>) {
        self.params.push((name.into(), value.into()));
    }

    /// Value of the first parameter with the given name
    pub fn get(&self, name: &str) -> Option<&SqlValue> {
        self.params.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Iterate in binding order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &SqlValue)> {
        self.params.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Number of parameters
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Returns true if no parameters are bound
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Fingerprint of names and values in binding order
    pub fn fingerprint(&self) -> Fingerprint {
        let mut builder = FingerprintBuilder::new("rowcast.parameters");
        builder.u64(self.params.len() as u64);
        for (name, value) in &self.params {
            builder.str(name).value(value);
        }
        builder.finish()
    }
}

impl<S: Into<String>, V: Into<SqlValue>> FromIterator<(S, V)> for ParameterSet {
    fn from_iter<I: IntoIterator<Item = (S, V)>>(iter: I) -> Self {
        let mut set = ParameterSet::new();
        for (name, value) in iter {
            set.push(name, value);
        }
        set
    }
}
