//! ObservationScope for begin/complete logging around an operation
//!
//! - Logs BEGIN on creation
//! - Logs COMPLETE or FAILED when finished
//! - Logs INCOMPLETE if dropped unfinished (e.g. unwinding)

use std::time::Instant;

use super::logger::{Logger, Severity};

/// A scope that logs the lifecycle of one operation
///
/// ```ignore
/// let scope = ObservationScope::with_fields("MAPPER_COMPILE", &[("target", name)]);
/// // ... compile ...
/// scope.complete();
/// ```
pub struct ObservationScope<'a> {
    name: &'a str,
    completed: bool,
    fields: Vec<(&'a str, String)>,
    started: Instant,
}

impl<'a> ObservationScope<'a> {
    /// Create a new observation scope; logs `{name}_BEGIN` at TRACE
    pub fn new(name: &'a str) -> Self {
        Self::with_fields(name, &[])
    }

    /// Create a new observation scope with fields repeated on every line
    pub fn with_fields(name: &'a str, fields: &[(&'a str, &str)]) -> Self {
        if Logger::enabled(Severity::Trace) {
            Logger::trace(&format!("{}_BEGIN", name), fields);
        }

        Self {
            name,
            completed: false,
            fields: fields.iter().map(|(k, v)| (*k, v.to_string())).collect(),
            started: Instant::now(),
        }
    }

    /// Mark the scope as successfully completed; logs `{name}_COMPLETE` at INFO
    pub fn complete(self) {
        self.complete_with_fields(&[]);
    }

    /// Complete with additional fields
    pub fn complete_with_fields(mut self, extra_fields: &[(&str, &str)]) {
        self.completed = true;
        if !Logger::enabled(Severity::Info) {
            return;
        }
        let elapsed = self.elapsed_us();
        let mut all_fields = self.field_refs();
        all_fields.push(("elapsed_us", &elapsed));
        all_fields.extend(extra_fields.iter().copied());
        Logger::info(&format!("{}_COMPLETE", self.name), &all_fields);
    }

    /// Mark the scope as failed; logs `{name}_FAILED` at ERROR
    pub fn fail(mut self, reason: &str) {
        self.completed = true;
        let mut all_fields = self.field_refs();
        all_fields.push(("reason", reason));
        Logger::error(&format!("{}_FAILED", self.name), &all_fields);
    }

    /// Check if the scope has been completed
    pub fn is_completed(&self) -> bool {
        self.completed
    }

    fn field_refs(&self) -> Vec<(&str, &str)> {
        self.fields.iter().map(|(k, v)| (*k, v.as_str())).collect()
    }

    fn elapsed_us(&self) -> String {
        self.started.elapsed().as_micros().to_string()
    }
}

impl Drop for ObservationScope<'_> {
    fn drop(&mut self) {
        if !self.completed {
            let mut all_fields = self.field_refs();
            all_fields.push(("reason", "scope dropped without completion"));
            Logger::warn(&format!("{}_INCOMPLETE", self.name), &all_fields);
        }
    }
}
