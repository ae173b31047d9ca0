//! Query processors and their registry
//!
//! A [`QueryProcessor`] is one compiled pipeline: a command, the row-mapper
//! compiled for its mapping, an optional result cache and the column shape
//! learned from earlier executions. The [`ProcessorRegistry`] keeps one
//! processor per pipeline fingerprint or explicit name.

mod context;
mod executor;
mod processor;
mod registry;

pub use context::{ExecutionContext, ReaderLease};
pub use executor::CommandExecutor;
pub use processor::{ProcessorOptions, QueryOutput, QueryProcessor};
pub use registry::{ProcessorKey, ProcessorRegistry};
