//! Processor registry
//!
//! At most one live processor per pipeline fingerprint, or per explicit
//! name. A name takes precedence over the fingerprint, which lets hosts
//! alias a pipeline or replace it on purpose.

use std::any::Any;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use super::processor::{pipeline_fingerprint, ProcessorOptions, QueryProcessor};
use crate::compiler::CompilationCache;
use crate::config::RowcastConfig;
use crate::errors::{MapError, MapResult};
use crate::fingerprint::{CommandDefinition, Fingerprint};
use crate::mapping::{MappingSpec, Target};
use crate::observability::{event_enabled, log_event_with_fields, Event, MetricsRegistry};
use crate::result_cache::ResultCache;

/// Registry key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ProcessorKey {
    Fingerprint(Fingerprint),
    Name(String),
}

impl ProcessorKey {
    /// Name if given, otherwise the pipeline fingerprint
    pub fn for_pipeline(name: Option<String>, fingerprint: Fingerprint) -> Self {
        match name {
            Some(name) => ProcessorKey::Name(name),
            None => ProcessorKey::Fingerprint(fingerprint),
        }
    }
}

impl fmt::Display for ProcessorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessorKey::Fingerprint(fp) => write!(f, "fp:{}", fp.short()),
            ProcessorKey::Name(name) => write!(f, "name:{}", name),
        }
    }
}

struct RegistryEntry {
    /// Fingerprint of the processor's compiled mapper
    mapper: Fingerprint,
    processor: Arc<dyn Any + Send + Sync>,
}

/// Table of singleton pipelines
pub struct ProcessorRegistry {
    processors: RwLock<HashMap<ProcessorKey, RegistryEntry>>,
    compiler: Arc<CompilationCache>,
    config: RowcastConfig,
    metrics: Arc<MetricsRegistry>,
}

impl ProcessorRegistry {
    /// Registry with default configuration
    pub fn new() -> Self {
        Self::with_config(RowcastConfig::default())
    }

    /// Registry with its own compilation cache built from `config`
    pub fn with_config(config: RowcastConfig) -> Self {
        let metrics = Arc::new(MetricsRegistry::new());
        let compiler = Arc::new(CompilationCache::with_config(&config, Arc::clone(&metrics)));
        Self {
            processors: RwLock::new(HashMap::new()),
            compiler,
            config,
            metrics,
        }
    }

    /// The compilation cache used for new processors
    pub fn compiler(&self) -> &Arc<CompilationCache> {
        &self.compiler
    }

    pub fn config(&self) -> &RowcastConfig {
        &self.config
    }

    /// Metrics shared with the compilation cache and result caches
    pub fn metrics(&self) -> &Arc<MetricsRegistry> {
        &self.metrics
    }

    /// Return the processor registered under `key`, or build one with
    /// `factory` and register it.
    ///
    /// The factory runs outside the lock. When two callers race, the first
    /// registration wins and both receive it.
    pub fn get_or_create<T, F>(&self, key: ProcessorKey, factory: F) -> MapResult<Arc<QueryProcessor<T>>>
    where
        T: Target,
        F: FnOnce(&Self) -> MapResult<QueryProcessor<T>>,
    {
        if let Some(existing) = self.lookup::<T>(&key)? {
            if event_enabled(Event::ProcessorReused) {
                log_event_with_fields(Event::ProcessorReused, &[("key", &key.to_string())]);
            }
            return Ok(existing);
        }

        let created = Arc::new(factory(self)?);

        let mut processors = self
            .processors
            .write()
            .map_err(|_| MapError::poisoned("processor registry"))?;
        match processors.entry(key) {
            Entry::Occupied(existing) => downcast::<T>(existing.key(), existing.get()),
            Entry::Vacant(slot) => {
                let key = slot.key().to_string();
                slot.insert(RegistryEntry {
                    mapper: created.mapper().fingerprint(),
                    processor: Arc::clone(&created) as Arc<dyn Any + Send + Sync>,
                });
                drop(processors);
                self.metrics.increment_processors_created();
                log_event_with_fields(
                    Event::ProcessorCreated,
                    &[
                        ("fingerprint", &created.fingerprint().short()),
                        ("key", &key),
                        ("shape", created.mapper().shape_name()),
                    ],
                );
                Ok(created)
            }
        }
    }

    /// Processor for a command and mapping, keyed by `options.name` if set
    /// and by the pipeline fingerprint otherwise
    pub fn processor<T: Target>(
        &self,
        command: CommandDefinition,
        spec: &MappingSpec<T>,
        options: ProcessorOptions,
    ) -> MapResult<Arc<QueryProcessor<T>>> {
        let fingerprint = pipeline_fingerprint(&command.fingerprint(), &spec.fingerprint());
        let key = ProcessorKey::for_pipeline(options.name.clone(), fingerprint);
        self.get_or_create(key, move |registry| registry.build(command, spec, &options))
    }

    /// Build an unregistered processor with this registry's caches
    pub fn build<T: Target>(
        &self,
        command: CommandDefinition,
        spec: &MappingSpec<T>,
        options: &ProcessorOptions,
    ) -> MapResult<QueryProcessor<T>> {
        let mapper = self.compiler.get_or_compile(spec)?;
        let results = options
            .cache_policy
            .or_else(|| self.config.default_policy())
            .map(|policy| {
                ResultCache::new(policy)
                    .with_max_entries(
                        options
                            .max_cached_results
                            .unwrap_or(self.config.result_cache_max_entries),
                    )
                    .with_metrics(Arc::clone(&self.metrics))
            });
        Ok(QueryProcessor::new(command, mapper, results))
    }

    /// Register `processor` under `name`, replacing any existing entry
    pub fn replace<T: Target>(
        &self,
        name: impl Into<String>,
        processor: QueryProcessor<T>,
    ) -> MapResult<Arc<QueryProcessor<T>>> {
        let name = name.into();
        let processor = Arc::new(processor);
        let previous = self
            .processors
            .write()
            .map_err(|_| MapError::poisoned("processor registry"))?
            .insert(
                ProcessorKey::Name(name.clone()),
                RegistryEntry {
                    mapper: processor.mapper().fingerprint(),
                    processor: Arc::clone(&processor) as Arc<dyn Any + Send + Sync>,
                },
            );
        log_event_with_fields(
            Event::ProcessorReplaced,
            &[
                ("fingerprint", &processor.fingerprint().short()),
                ("name", &name),
                ("replaced", if previous.is_some() { "true" } else { "false" }),
            ],
        );
        Ok(processor)
    }

    /// Look up a registered processor
    pub fn get<T: Target>(&self, key: &ProcessorKey) -> MapResult<Option<Arc<QueryProcessor<T>>>> {
        self.lookup(key)
    }

    fn lookup<T: Target>(&self, key: &ProcessorKey) -> MapResult<Option<Arc<QueryProcessor<T>>>> {
        let processors = self
            .processors
            .read()
            .map_err(|_| MapError::poisoned("processor registry"))?;
        processors.get(key).map(|entry| downcast::<T>(key, entry)).transpose()
    }

    /// Evict a processor and its compiled mapper.
    ///
    /// The next request recompiles and starts with an empty result cache.
    /// Holders of the evicted processor keep a working instance.
    pub fn flush(&self, key: &ProcessorKey) -> MapResult<bool> {
        let removed = self
            .processors
            .write()
            .map_err(|_| MapError::poisoned("processor registry"))?
            .remove(key);
        let Some(entry) = removed else {
            return Ok(false);
        };
        self.compiler.flush(&entry.mapper)?;
        self.metrics.increment_processors_flushed();
        log_event_with_fields(Event::ProcessorFlushed, &[("key", &key.to_string())]);
        Ok(true)
    }

    /// Whether a processor is registered under `key`
    pub fn contains(&self, key: &ProcessorKey) -> bool {
        self.processors
            .read()
            .map(|p| p.contains_key(key))
            .unwrap_or(false)
    }

    /// Number of registered processors
    pub fn len(&self) -> usize {
        self.processors.read().map(|p| p.len()).unwrap_or(0)
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every processor; compiled mappers stay cached
    pub fn clear(&self) -> MapResult<()> {
        self.processors
            .write()
            .map_err(|_| MapError::poisoned("processor registry"))?
            .clear();
        Ok(())
    }
}

impl Default for ProcessorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn downcast<T: Target>(key: &ProcessorKey, entry: &RegistryEntry) -> MapResult<Arc<QueryProcessor<T>>> {
    Arc::clone(&entry.processor)
        .downcast::<QueryProcessor<T>>()
        .map_err(|_| {
            MapError::configuration(format!(
                "processor {} is registered for a different target type than {}",
                key,
                std::any::type_name::<T>()
            ))
        })
}
