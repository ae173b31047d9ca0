//! rowcast - compiled row mapping and result caching for data-access layers
//!
//! A mapping specification is compiled once into a reusable row-mapper and
//! cached by a deterministic configuration fingerprint. Query processors
//! bind a command to a compiled mapper, optionally cache result sequences
//! by parameter fingerprint, and are kept as singletons by the registry.

pub mod column;
pub mod compiler;
pub mod config;
pub mod errors;
pub mod fingerprint;
pub mod mapping;
pub mod observability;
pub mod processor;
pub mod result_cache;
pub mod source;
pub mod value;

pub use column::{ColumnIndex, ColumnSnapshot};
pub use compiler::{CompilationCache, CompiledRowMapper, MappedRows, RowMaterializer, ShapeResolver};
pub use config::{CachePolicySetting, RowcastConfig};
pub use errors::{BoxError, ConversionError, MapError, MapResult};
pub use fingerprint::{CommandDefinition, CommandKind, Fingerprint, NullMode, ParameterSet};
pub use mapping::{MappingSpec, Row, Shape, Target};
pub use processor::{
    CommandExecutor, ExecutionContext, ProcessorKey, ProcessorOptions, ProcessorRegistry, QueryOutput, QueryProcessor,
};
pub use result_cache::{CachePolicy, ResultCache};
pub use source::{AsyncRowSource, MemoryRowSource, RowReader, RowSource, RowSourceError};
pub use value::{FromSqlValue, SqlValue};
