//! Compilation cache
//!
//! Retains one compiled row-mapper per mapping fingerprint for the lifetime
//! of the cache, or until flushed.
//!
//! Compilation runs outside the lock. Two callers racing on the same
//! fingerprint may both compile; the first insert wins and the loser's
//! mapper is dropped, so every caller ends up with the retained instance.

use std::any::{Any, TypeId};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use super::mapper::CompiledRowMapper;
use super::resolver::{resolve_shape, ShapeResolver};
use crate::config::RowcastConfig;
use crate::errors::{MapError, MapResult};
use crate::fingerprint::Fingerprint;
use crate::mapping::{MappingSpec, Target};
use crate::observability::{event_enabled, log_event_with_fields, Event, MetricsRegistry, ObservationScope};

struct CacheSlot {
    target: TypeId,
    mapper: Arc<dyn Any + Send + Sync>,
}

type ResolverList<T> = Vec<Arc<dyn ShapeResolver<T>>>;

/// Fingerprint-keyed store of compiled row-mappers
pub struct CompilationCache {
    mappers: RwLock<HashMap<Fingerprint, CacheSlot>>,
    /// `TypeId` of the target → `ResolverList<T>`
    resolvers: RwLock<HashMap<TypeId, Box<dyn Any + Send + Sync>>>,
    enabled: bool,
    metrics: Arc<MetricsRegistry>,
}

impl CompilationCache {
    /// Create an enabled cache with its own metrics
    pub fn new() -> Self {
        Self::with_metrics(true, Arc::new(MetricsRegistry::new()))
    }

    /// Create a cache from configuration
    pub fn with_config(config: &RowcastConfig, metrics: Arc<MetricsRegistry>) -> Self {
        Self::with_metrics(config.compile_cache_enabled, metrics)
    }

    fn with_metrics(enabled: bool, metrics: Arc<MetricsRegistry>) -> Self {
        Self {
            mappers: RwLock::new(HashMap::new()),
            resolvers: RwLock::new(HashMap::new()),
            enabled,
            metrics,
        }
    }

    /// Whether compiled mappers are retained
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Shared metrics
    pub fn metrics(&self) -> &Arc<MetricsRegistry> {
        &self.metrics
    }

    /// Return the retained mapper for `spec`, compiling it if absent.
    ///
    /// With the cache disabled every call compiles and nothing is retained.
    pub fn get_or_compile<T: Target>(&self, spec: &MappingSpec<T>) -> MapResult<Arc<CompiledRowMapper<T>>> {
        let fingerprint = spec.fingerprint();

        if self.enabled {
            if let Some(mapper) = self.lookup::<T>(&fingerprint)? {
                self.metrics.increment_compile_reuse();
                if event_enabled(Event::MapperReused) {
                    log_event_with_fields(Event::MapperReused, &[("fingerprint", &fingerprint.short())]);
                }
                return Ok(mapper);
            }
        }

        let compiled = Arc::new(self.compile(spec, fingerprint)?);
        if !self.enabled {
            return Ok(compiled);
        }

        let mut mappers = self
            .mappers
            .write()
            .map_err(|_| MapError::poisoned("compilation cache"))?;
        match mappers.entry(fingerprint) {
            Entry::Occupied(existing) => {
                let retained = downcast::<T>(existing.get(), &fingerprint)?;
                self.metrics.increment_races_discarded();
                log_event_with_fields(Event::MapperRaceDiscarded, &[("fingerprint", &fingerprint.short())]);
                Ok(retained)
            }
            Entry::Vacant(slot) => {
                slot.insert(CacheSlot {
                    target: TypeId::of::<T>(),
                    mapper: Arc::clone(&compiled) as Arc<dyn Any + Send + Sync>,
                });
                log_event_with_fields(
                    Event::MapperCompiled,
                    &[
                        ("fingerprint", &fingerprint.short()),
                        ("shape", compiled.shape_name()),
                        ("target", spec.target_name()),
                    ],
                );
                Ok(compiled)
            }
        }
    }

    fn lookup<T: Target>(&self, fingerprint: &Fingerprint) -> MapResult<Option<Arc<CompiledRowMapper<T>>>> {
        let mappers = self
            .mappers
            .read()
            .map_err(|_| MapError::poisoned("compilation cache"))?;
        mappers
            .get(fingerprint)
            .map(|slot| downcast::<T>(slot, fingerprint))
            .transpose()
    }

    fn compile<T: Target>(&self, spec: &MappingSpec<T>, fingerprint: Fingerprint) -> MapResult<CompiledRowMapper<T>> {
        let resolvers = self.resolvers_for::<T>()?;
        let short = fingerprint.short();
        let scope = ObservationScope::with_fields(
            "MAPPER_COMPILE",
            &[("fingerprint", &short), ("target", spec.target_name())],
        );

        match resolve_shape(spec, &resolvers) {
            Ok((materialize, shape)) => {
                self.metrics.increment_compilations();
                scope.complete_with_fields(&[("shape", &shape)]);
                Ok(CompiledRowMapper::new(
                    fingerprint,
                    shape,
                    materialize,
                    Arc::clone(&self.metrics),
                ))
            }
            Err(e) => {
                scope.fail(&e.to_string());
                Err(e)
            }
        }
    }

    fn resolvers_for<T: Target>(&self) -> MapResult<ResolverList<T>> {
        let resolvers = self
            .resolvers
            .read()
            .map_err(|_| MapError::poisoned("shape resolvers"))?;
        match resolvers.get(&TypeId::of::<T>()) {
            None => Ok(Vec::new()),
            Some(list) => list
                .downcast_ref::<ResolverList<T>>()
                .cloned()
                .ok_or_else(|| MapError::Internal("resolver list stored under wrong type".to_string())),
        }
    }

    /// Register a shape resolver for target `T`.
    ///
    /// Resolvers are consulted in registration order. Mappers already
    /// compiled for `T` are flushed so the next request sees the resolver.
    pub fn register_resolver<T, R>(&self, resolver: R) -> MapResult<()>
    where
        T: Target,
        R: ShapeResolver<T> + 'static,
    {
        let name = resolver.name().to_string();
        {
            let mut resolvers = self
                .resolvers
                .write()
                .map_err(|_| MapError::poisoned("shape resolvers"))?;
            let list = resolvers
                .entry(TypeId::of::<T>())
                .or_insert_with(|| Box::new(ResolverList::<T>::new()));
            list.downcast_mut::<ResolverList<T>>()
                .ok_or_else(|| MapError::Internal("resolver list stored under wrong type".to_string()))?
                .push(Arc::new(resolver));
        }

        let flushed = {
            let mut mappers = self
                .mappers
                .write()
                .map_err(|_| MapError::poisoned("compilation cache"))?;
            let before = mappers.len();
            mappers.retain(|_, slot| slot.target != TypeId::of::<T>());
            before - mappers.len()
        };

        log_event_with_fields(
            Event::ResolverRegistered,
            &[
                ("flushed", &flushed.to_string()),
                ("resolver", &name),
                ("target", std::any::type_name::<T>()),
            ],
        );
        Ok(())
    }

    /// Whether a mapper is retained for the fingerprint
    pub fn contains(&self, fingerprint: &Fingerprint) -> bool {
        self.mappers
            .read()
            .map(|m| m.contains_key(fingerprint))
            .unwrap_or(false)
    }

    /// Number of retained mappers
    pub fn len(&self) -> usize {
        self.mappers.read().map(|m| m.len()).unwrap_or(0)
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop the mapper for a fingerprint; returns whether one was retained
    pub fn flush(&self, fingerprint: &Fingerprint) -> MapResult<bool> {
        let removed = self
            .mappers
            .write()
            .map_err(|_| MapError::poisoned("compilation cache"))?
            .remove(fingerprint)
            .is_some();
        if removed {
            log_event_with_fields(Event::MapperFlushed, &[("fingerprint", &fingerprint.short())]);
        }
        Ok(removed)
    }

    /// Drop every retained mapper
    pub fn clear(&self) -> MapResult<()> {
        self.mappers
            .write()
            .map_err(|_| MapError::poisoned("compilation cache"))?
            .clear();
        Ok(())
    }
}

impl Default for CompilationCache {
    fn default() -> Self {
        Self::new()
    }
}

fn downcast<T: Target>(slot: &CacheSlot, fingerprint: &Fingerprint) -> MapResult<Arc<CompiledRowMapper<T>>> {
    Arc::clone(&slot.mapper)
        .downcast::<CompiledRowMapper<T>>()
        .map_err(|_| {
            MapError::Internal(format!(
                "fingerprint {} is retained for a different target type",
                fingerprint.short()
            ))
        })
}
