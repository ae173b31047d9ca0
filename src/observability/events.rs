//! Observable events
//!
//! Events are explicit and typed; each carries its default severity.

use std::fmt;

use super::logger::Severity;

/// Observable events in rowcast
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Configuration
    /// Configuration loaded
    ConfigLoaded,

    // Compilation cache
    /// A row-mapper was compiled and retained
    MapperCompiled,
    /// A cached row-mapper was reused
    MapperReused,
    /// A racing compile lost and its result was dropped
    MapperRaceDiscarded,
    /// A row-mapper was flushed
    MapperFlushed,
    /// A shape resolver was registered
    ResolverRegistered,

    // Result cache
    /// Result served from cache
    ResultCacheHit,
    /// No fresh cached result
    ResultCacheMiss,
    /// Stale result removed
    ResultCacheEvicted,
    /// Result not cached because the cache is full
    ResultCacheFull,

    // Processor registry
    /// A processor was created and registered
    ProcessorCreated,
    /// An existing processor was returned
    ProcessorReused,
    /// A named processor was replaced
    ProcessorReplaced,
    /// A processor was flushed
    ProcessorFlushed,

    // Materialization
    /// A column could not be bound into its field
    ColumnBindingFailed,
    /// Async execution cancelled before materialization
    ExecutionCancelled,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ConfigLoaded => "CONFIG_LOADED",

            Event::MapperCompiled => "MAPPER_COMPILED",
            Event::MapperReused => "MAPPER_REUSED",
            Event::MapperRaceDiscarded => "MAPPER_RACE_DISCARDED",
            Event::MapperFlushed => "MAPPER_FLUSHED",
            Event::ResolverRegistered => "RESOLVER_REGISTERED",

            Event::ResultCacheHit => "RESULT_CACHE_HIT",
            Event::ResultCacheMiss => "RESULT_CACHE_MISS",
            Event::ResultCacheEvicted => "RESULT_CACHE_EVICTED",
            Event::ResultCacheFull => "RESULT_CACHE_FULL",

            Event::ProcessorCreated => "PROCESSOR_CREATED",
            Event::ProcessorReused => "PROCESSOR_REUSED",
            Event::ProcessorReplaced => "PROCESSOR_REPLACED",
            Event::ProcessorFlushed => "PROCESSOR_FLUSHED",

            Event::ColumnBindingFailed => "COLUMN_BINDING_FAILED",
            Event::ExecutionCancelled => "EXECUTION_CANCELLED",
        }
    }

    /// Default severity for this event
    pub fn severity(&self) -> Severity {
        match self {
            Event::MapperReused
            | Event::ResultCacheHit
            | Event::ResultCacheMiss
            | Event::ProcessorReused => Severity::Trace,
            Event::ResultCacheFull | Event::ColumnBindingFailed | Event::ExecutionCancelled => Severity::Warn,
            _ => Severity::Info,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
