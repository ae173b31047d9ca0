//! Query processor: one compiled pipeline

use std::fmt;
use std::sync::{Arc, RwLock};

use super::context::ExecutionContext;
use super::executor::CommandExecutor;
use crate::column::{ColumnIndex, ColumnSnapshot};
use crate::compiler::{CompiledRowMapper, MappedRows};
use crate::errors::{MapError, MapResult};
use crate::fingerprint::{CommandDefinition, Fingerprint, ParameterSet};
use crate::mapping::Target;
use crate::observability::{log_event_with_fields, Event};
use crate::result_cache::{CachePolicy, CacheStats, ResultCache};

/// Construction options for a processor
#[derive(Debug, Clone, Default)]
pub struct ProcessorOptions {
    /// Result cache policy; `None` falls back to the configured default
    pub cache_policy: Option<CachePolicy>,
    /// Register under an explicit name instead of the fingerprint
    pub name: Option<String>,
    /// Entry bound for the result cache
    pub max_cached_results: Option<usize>,
}

impl ProcessorOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache results under the given policy
    pub fn cached(mut self, policy: CachePolicy) -> Self {
        self.cache_policy = Some(policy);
        self
    }

    /// Register under an explicit name
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn max_cached_results(mut self, max: usize) -> Self {
        self.max_cached_results = Some(max);
        self
    }
}

/// Result of one execution
#[derive(Debug, Clone)]
pub struct QueryOutput<T> {
    pub rows: Arc<Vec<T>>,
    pub columns: ColumnSnapshot,
    /// Served from the result cache without executing
    pub from_cache: bool,
}

/// A command bound to a compiled row-mapper, an optional result cache and
/// the column shape learned from earlier executions
pub struct QueryProcessor<T> {
    command: CommandDefinition,
    mapper: Arc<CompiledRowMapper<T>>,
    results: Option<ResultCache<Vec<T>>>,
    columns: RwLock<Option<ColumnSnapshot>>,
    fingerprint: Fingerprint,
}

impl<T: Target> QueryProcessor<T> {
    /// Create a processor; `results` enables result caching
    pub fn new(
        command: CommandDefinition,
        mapper: Arc<CompiledRowMapper<T>>,
        results: Option<ResultCache<Vec<T>>>,
    ) -> Self {
        let fingerprint = pipeline_fingerprint(&command.fingerprint(), &mapper.fingerprint());
        Self {
            command,
            mapper,
            results,
            columns: RwLock::new(None),
            fingerprint,
        }
    }

    /// Fingerprint of command configuration × mapping configuration
    pub fn fingerprint(&self) -> Fingerprint {
        self.fingerprint
    }

    pub fn command(&self) -> &CommandDefinition {
        &self.command
    }

    pub fn mapper(&self) -> &Arc<CompiledRowMapper<T>> {
        &self.mapper
    }

    /// Column shape recorded by the last successful execution
    pub fn column_snapshot(&self) -> Option<ColumnSnapshot> {
        self.columns.read().ok().and_then(|c| c.clone())
    }

    /// Result cache statistics, if results are cached
    pub fn result_stats(&self) -> Option<CacheStats> {
        self.results.as_ref().map(ResultCache::stats)
    }

    /// The result cache, if results are cached
    pub fn results(&self) -> Option<&ResultCache<Vec<T>>> {
        self.results.as_ref()
    }

    /// Execute synchronously, consulting the result cache first
    pub fn execute<E: CommandExecutor>(
        &self,
        ctx: &ExecutionContext,
        executor: &E,
        params: &ParameterSet,
    ) -> MapResult<QueryOutput<T>> {
        let key = self.results.as_ref().map(|_| params.fingerprint());
        if let Some(output) = self.cached(key.as_ref())? {
            return Ok(output);
        }
        if ctx.is_cancelled() {
            return Err(MapError::Cancelled);
        }

        let mapped = {
            let _lease = ctx.lease();
            let mut source = executor
                .execute(&self.command, params)
                .map_err(MapError::execution)?;
            self.mapper.map_rows(&mut source, self.seed_index())?
        };
        self.store(key, mapped)
    }

    /// Execute asynchronously.
    ///
    /// The context's token cancels the command and any pending row fetch.
    pub async fn execute_async<E: CommandExecutor>(
        &self,
        ctx: &ExecutionContext,
        executor: &E,
        params: &ParameterSet,
    ) -> MapResult<QueryOutput<T>> {
        let key = self.results.as_ref().map(|_| params.fingerprint());
        if let Some(output) = self.cached(key.as_ref())? {
            return Ok(output);
        }

        let mapped = {
            let _lease = ctx.lease();
            let cancel = ctx.cancellation();
            let mut source = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    log_event_with_fields(
                        Event::ExecutionCancelled,
                        &[("fingerprint", &self.fingerprint.short()), ("request_id", &ctx.request_id().to_string())],
                    );
                    return Err(MapError::Cancelled);
                }
                source = executor.execute_async(&self.command, params) => source.map_err(MapError::execution)?,
            };
            self.mapper
                .map_rows_async(&mut source, self.seed_index(), cancel)
                .await?
        };
        self.store(key, mapped)
    }

    fn cached(&self, key: Option<&Fingerprint>) -> MapResult<Option<QueryOutput<T>>> {
        let (Some(results), Some(key)) = (&self.results, key) else {
            return Ok(None);
        };
        Ok(results.get(key)?.map(|rows| QueryOutput {
            rows,
            columns: self.column_snapshot().unwrap_or_default(),
            from_cache: true,
        }))
    }

    fn store(&self, key: Option<Fingerprint>, mapped: MappedRows<T>) -> MapResult<QueryOutput<T>> {
        self.record_columns(&mapped.columns);
        let rows = Arc::new(mapped.rows);
        if let (Some(results), Some(key)) = (&self.results, key) {
            results.insert(key, Arc::clone(&rows))?;
        }
        Ok(QueryOutput {
            rows,
            columns: mapped.columns,
            from_cache: false,
        })
    }

    fn seed_index(&self) -> ColumnIndex {
        match self.column_snapshot() {
            Some(snapshot) => ColumnIndex::from_snapshot(&snapshot),
            None => ColumnIndex::new(),
        }
    }

    fn record_columns(&self, snapshot: &ColumnSnapshot) {
        if snapshot.field_count() == 0 {
            return;
        }
        if let Ok(mut columns) = self.columns.write() {
            if columns.as_ref() != Some(snapshot) {
                *columns = Some(snapshot.clone());
            }
        }
    }
}

impl<T> fmt::Debug for QueryProcessor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryProcessor")
            .field("fingerprint", &self.fingerprint)
            .field("command", &self.command)
            .field("mapper", &self.mapper)
            .field("results", &self.results)
            .finish()
    }
}

/// Identity of a pipeline built from a command and a mapping
pub(crate) fn pipeline_fingerprint(command: &Fingerprint, mapping: &Fingerprint) -> Fingerprint {
    Fingerprint::combine("rowcast.processor", &[*command, *mapping])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::CompilationCache;
    use crate::errors::BoxError;
    use crate::mapping::MappingSpec;
    use crate::source::MemoryRowSource;
    use crate::value::SqlValue;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingExecutor {
        calls: AtomicUsize,
    }

    impl CountingExecutor {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
            }
        }

        fn source(&self, params: &ParameterSet) -> MemoryRowSource {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let n = params.get("n").and_then(SqlValue::as_i64).unwrap_or(0);
            MemoryRowSource::new(["n"], (0..n).map(|i| vec![SqlValue::Int(i)]).collect())
        }
    }

    impl CommandExecutor for CountingExecutor {
        type Source = MemoryRowSource;
        type Error = BoxError;

        fn execute(&self, _command: &CommandDefinition, params: &ParameterSet) -> Result<MemoryRowSource, BoxError> {
            Ok(self.source(params))
        }

        async fn execute_async(
            &self,
            _command: &CommandDefinition,
            params: &ParameterSet,
        ) -> Result<MemoryRowSource, BoxError> {
            Ok(self.source(params))
        }
    }

    fn processor(policy: Option<CachePolicy>) -> QueryProcessor<i64> {
        let cache = CompilationCache::new();
        let mapper = cache.get_or_compile(&MappingSpec::<i64>::empty()).unwrap();
        QueryProcessor::new(
            CommandDefinition::new("select n from numbers"),
            mapper,
            policy.map(ResultCache::new),
        )
    }

    #[test]
    fn test_execute_without_cache() {
        let p = processor(None);
        let exec = CountingExecutor::new();
        let ctx = ExecutionContext::new();
        let params = ParameterSet::new().with("n", 3i64);

        let out = p.execute(&ctx, &exec, &params).unwrap();
        assert_eq!(*out.rows, vec![0, 1, 2]);
        assert!(!out.from_cache);
        p.execute(&ctx, &exec, &params).unwrap();
        assert_eq!(exec.calls.load(Ordering::SeqCst), 2);
        assert_eq!(ctx.open_readers(), 0);
    }

    #[test]
    fn test_execute_with_permanent_cache() {
        let p = processor(Some(CachePolicy::Permanent));
        let exec = CountingExecutor::new();
        let ctx = ExecutionContext::new();
        let params = ParameterSet::new().with("n", 2i64);

        let first = p.execute(&ctx, &exec, &params).unwrap();
        let second = p.execute(&ctx, &exec, &params).unwrap();
        assert!(second.from_cache);
        assert!(Arc::ptr_eq(&first.rows, &second.rows));
        assert_eq!(exec.calls.load(Ordering::SeqCst), 1);

        let other = ParameterSet::new().with("n", 4i64);
        assert_eq!(p.execute(&ctx, &exec, &other).unwrap().rows.len(), 4);
        assert_eq!(exec.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_column_snapshot_recorded() {
        let p = processor(None);
        assert!(p.column_snapshot().is_none());
        let exec = CountingExecutor::new();
        p.execute(&ExecutionContext::new(), &exec, &ParameterSet::new().with("n", 1i64))
            .unwrap();
        assert_eq!(p.column_snapshot().unwrap().get("N"), Some(0));
    }

    #[test]
    fn test_cancelled_context_does_not_execute() {
        let p = processor(None);
        let exec = CountingExecutor::new();
        let ctx = ExecutionContext::new();
        ctx.cancel();
        let err = p.execute(&ctx, &exec, &ParameterSet::new()).unwrap_err();
        assert!(matches!(err, MapError::Cancelled));
        assert_eq!(exec.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_execute_async_uses_cache() {
        let p = processor(Some(CachePolicy::RepeatedRequestLimit(1)));
        let exec = CountingExecutor::new();
        let ctx = ExecutionContext::new();
        let params = ParameterSet::new().with("n", 2i64);

        assert!(!p.execute_async(&ctx, &exec, &params).await.unwrap().from_cache);
        assert!(p.execute_async(&ctx, &exec, &params).await.unwrap().from_cache);
        assert!(!p.execute_async(&ctx, &exec, &params).await.unwrap().from_cache);
        assert_eq!(exec.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_fingerprint_combines_command_and_mapping() {
        let a = processor(None);
        let cache = CompilationCache::new();
        let b = QueryProcessor::new(
            CommandDefinition::new("select n from other"),
            cache.get_or_compile(&MappingSpec::<i64>::empty()).unwrap(),
            None,
        );
        assert_ne!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint(), processor(None).fingerprint());
    }
}
