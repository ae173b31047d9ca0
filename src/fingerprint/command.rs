//! Command configuration as seen by the caching core

use std::collections::BTreeSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{Fingerprint, FingerprintBuilder};

/// How the command text is interpreted by the executor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    /// Plain query text
    Text,
    /// Stored procedure name
    StoredProcedure,
    /// Whole table by name
    TableDirect,
}

impl CommandKind {
    fn as_str(&self) -> &'static str {
        match self {
            CommandKind::Text => "text",
            CommandKind::StoredProcedure => "stored_procedure",
            CommandKind::TableDirect => "table_direct",
        }
    }
}

/// How null parameter values are bound
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NullMode {
    /// Bind nulls as SQL NULL
    DbNull,
    /// Leave null-valued parameters out of the command
    Omit,
}

impl NullMode {
    fn as_str(&self) -> &'static str {
        match self {
            NullMode::DbNull => "db_null",
            NullMode::Omit => "omit",
        }
    }
}

/// A command definition.
///
/// Inclusion and exclusion lists name parameter properties and are treated
/// as sets: order and duplicates do not affect the fingerprint.
/// `description` and `timeout` are cosmetic and never hashed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandDefinition {
    pub text: String,
    pub kind: CommandKind,
    pub include: BTreeSet<String>,
    pub exclude: BTreeSet<String>,
    pub null_mode: NullMode,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub timeout: Option<Duration>,
}

impl CommandDefinition {
    /// Create a text command
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: CommandKind::Text,
            include: BTreeSet::new(),
            exclude: BTreeSet::new(),
            null_mode: NullMode::DbNull,
            description: None,
            timeout: None,
        }
    }

    /// Create a stored procedure command
    pub fn procedure(name: impl Into<String>) -> Self {
        Self::new(name).kind(CommandKind::StoredProcedure)
    }

    /// Set the command kind
    pub fn kind(mut self, kind: CommandKind) -> Self {
        self.kind = kind;
        self
    }

    /// Add parameter properties to the inclusion list
    pub fn include<S: Into<String>>(mut self, names: impl IntoIterator<Item = S>) -> Self {
        self.include.extend(names.into_iter().map(Into::into));
        self
    }

    /// Add parameter properties to the exclusion list
    pub fn exclude<S: Into<String>>(mut self, names: impl IntoIterator<Item = S>) -> Self {
        self.exclude.extend(names.into_iter().map(Into::into));
        self
    }

    /// Set the null binding mode
    pub fn null_mode(mut self, mode: NullMode) -> Self {
        self.null_mode = mode;
        self
    }

    /// Attach a description
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Attach an execution timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Fingerprint of the hashed configuration
    pub fn fingerprint(&self) -> Fingerprint {
        let mut builder = FingerprintBuilder::new("rowcast.command");
        builder
            .str(&self.text)
            .str(self.kind.as_str())
            .list(self.include.iter().map(String::as_str))
            .list(self.exclude.iter().map(String::as_str))
            .str(self.null_mode.as_str());
        builder.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosmetic_settings_ignored() {
        let a = CommandDefinition::new("select 1");
        let b = CommandDefinition::new("select 1")
            .describe("health check")
            .timeout(Duration::from_secs(3));
        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_hashed_settings_change_fingerprint() {
        let base = CommandDefinition::new("select 1");
        let variants = [
            CommandDefinition::new("select 2"),
            CommandDefinition::new("select 1").kind(CommandKind::StoredProcedure),
            CommandDefinition::new("select 1").include(["Id"]),
            CommandDefinition::new("select 1").exclude(["Id"]),
            CommandDefinition::new("select 1").null_mode(NullMode::Omit),
        ];
        for v in &variants {
            assert_ne!(base.fingerprint(), v.fingerprint(), "{:?}", v);
        }
    }

    #[test]
    fn test_include_exclude_are_distinct() {
        let a = CommandDefinition::new("q").include(["x"]);
        let b = CommandDefinition::new("q").exclude(["x"]);
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_list_order_irrelevant() {
        let a = CommandDefinition::new("q").include(["a", "b"]);
        let b = CommandDefinition::new("q").include(["b", "a", "a"]);
        assert_eq!(a.fingerprint(), b.fingerprint());
    }
}
