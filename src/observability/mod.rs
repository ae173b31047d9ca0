//! Observability for rowcast
//!
//! - Structured logging (JSON lines)
//! - Relaxed atomic counters with serializable snapshots
//! - Begin/complete scopes around compilation
//!
//! Observability never changes the outcome of an operation. Logging is
//! synchronous and writes nothing below the configured minimum severity.
//!
//! ```ignore
//! use rowcast::observability::{log_event_with_fields, Event, MetricsRegistry};
//!
//! log_event_with_fields(Event::MapperCompiled, &[("target", "Person")]);
//!
//! let metrics = MetricsRegistry::new();
//! metrics.increment_compilations();
//! ```

mod events;
mod logger;
mod metrics;
mod scope;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use metrics::{MetricsRegistry, MetricsSnapshot};
pub use scope::ObservationScope;

/// Log an event at its default severity
pub fn log_event(event: Event) {
    Logger::log(event.severity(), event.as_str(), &[]);
}

/// Log an event with fields at its default severity
pub fn log_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    Logger::log(event.severity(), event.as_str(), fields);
}

/// Whether an event would be written; lets hot paths skip formatting fields
pub fn event_enabled(event: Event) -> bool {
    Logger::enabled(event.severity())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_event() {
        log_event(Event::ConfigLoaded);
        log_event(Event::ResultCacheHit);
    }

    #[test]
    fn test_log_event_with_fields() {
        log_event_with_fields(Event::ProcessorCreated, &[("fingerprint", "0a1b2c3d4e5f")]);
    }

    #[test]
    fn test_trace_events_follow_threshold() {
        assert_eq!(
            event_enabled(Event::ResultCacheHit),
            Logger::enabled(Severity::Trace)
        );
    }
}
