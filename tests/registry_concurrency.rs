//! Registry Concurrency Tests
//!
//! - Racing compilations retain exactly one mapper
//! - Racing processor creation yields one processor
//! - Explicit names take precedence over fingerprints
//! - Flush forces recompilation and a fresh result cache

mod common;

use std::sync::{Arc, Barrier};
use std::thread;

use common::{person_rows, person_spec, PeopleExecutor};
use rowcast::{
    CachePolicy, ColumnIndex, CommandDefinition, CompilationCache, ExecutionContext, ParameterSet, ProcessorKey,
    ProcessorOptions, ProcessorRegistry, SqlValue,
};

fn people() -> CommandDefinition {
    CommandDefinition::new("select id, full_name from people")
}

// =============================================================================
// Compilation Cache
// =============================================================================

#[test]
fn test_two_threads_compile_same_fingerprint() {
    let cache = Arc::new(CompilationCache::new());
    let barrier = Arc::new(Barrier::new(2));

    let handles: Vec<_> = (0..2)
        .map(|_| {
            let cache = Arc::clone(&cache);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                cache.get_or_compile(&person_spec()).unwrap()
            })
        })
        .collect();
    let mappers: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(cache.len(), 1);
    assert!(Arc::ptr_eq(&mappers[0], &mappers[1]));

    let rows = vec![vec![SqlValue::Int(1), SqlValue::from("Alice")]];
    let a = mappers[0].map_rows(&mut person_rows(rows.clone()), ColumnIndex::new()).unwrap();
    let b = mappers[1].map_rows(&mut person_rows(rows), ColumnIndex::new()).unwrap();
    assert_eq!(a.rows, b.rows);

    let snapshot = cache.metrics().snapshot();
    assert_eq!(snapshot.compilations - snapshot.races_discarded, 1);
}

#[test]
fn test_many_threads_share_one_mapper() {
    let cache = Arc::new(CompilationCache::new());
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let cache = Arc::clone(&cache);
            thread::spawn(move || cache.get_or_compile(&person_spec()).unwrap())
        })
        .collect();
    let mappers: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert!(mappers.iter().all(|m| Arc::ptr_eq(m, &mappers[0])));
    assert_eq!(cache.len(), 1);
}

// =============================================================================
// Processor Registry
// =============================================================================

#[test]
fn test_racing_processor_creation() {
    let registry = Arc::new(ProcessorRegistry::new());
    let barrier = Arc::new(Barrier::new(4));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let registry = Arc::clone(&registry);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                registry
                    .processor(people(), &person_spec(), ProcessorOptions::new())
                    .unwrap()
            })
        })
        .collect();
    let processors: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert!(processors.iter().all(|p| Arc::ptr_eq(p, &processors[0])));
    assert_eq!(registry.len(), 1);
    assert_eq!(registry.metrics().snapshot().processors_created, 1);
}

#[test]
fn test_explicit_name_precedence() {
    let registry = ProcessorRegistry::new();
    let spec = person_spec();

    let anonymous = registry.processor(people(), &spec, ProcessorOptions::new()).unwrap();
    let alias = registry
        .processor(people(), &spec, ProcessorOptions::new().named("people.all"))
        .unwrap();
    let again = registry
        .processor(
            CommandDefinition::new("select something else"),
            &spec,
            ProcessorOptions::new().named("people.all"),
        )
        .unwrap();

    assert!(!Arc::ptr_eq(&anonymous, &alias));
    // a registered name wins even when the configuration differs
    assert!(Arc::ptr_eq(&alias, &again));
    assert_eq!(registry.len(), 2);
}

#[test]
fn test_flush_gives_fresh_result_cache() {
    let registry = ProcessorRegistry::new();
    let spec = person_spec();
    let options = || ProcessorOptions::new().cached(CachePolicy::Permanent);
    let exec = PeopleExecutor::new();
    let ctx = ExecutionContext::new();
    let params = ParameterSet::new();

    let p = registry.processor(people(), &spec, options()).unwrap();
    p.execute(&ctx, &exec, &params).unwrap();
    assert!(p.execute(&ctx, &exec, &params).unwrap().from_cache);

    let key = ProcessorKey::Fingerprint(p.fingerprint());
    assert!(registry.flush(&key).unwrap());
    assert_eq!(registry.metrics().snapshot().processors_flushed, 1);

    let fresh = registry.processor(people(), &spec, options()).unwrap();
    assert_eq!(fresh.fingerprint(), p.fingerprint());
    assert!(!fresh.execute(&ctx, &exec, &params).unwrap().from_cache);
    assert_eq!(exec.calls(), 2);
}

#[test]
fn test_concurrent_execution_on_shared_processor() {
    let registry = ProcessorRegistry::new();
    let p = registry
        .processor(people(), &person_spec(), ProcessorOptions::new())
        .unwrap();
    let exec = Arc::new(PeopleExecutor::new());

    let handles: Vec<_> = (1..=6i64)
        .map(|count| {
            let p = Arc::clone(&p);
            let exec = Arc::clone(&exec);
            thread::spawn(move || {
                let ctx = ExecutionContext::new();
                let out = p
                    .execute(&ctx, exec.as_ref(), &ParameterSet::new().with("count", count))
                    .unwrap();
                assert_eq!(ctx.open_readers(), 0);
                out.rows.len() as i64
            })
        })
        .collect();

    let lengths: Vec<i64> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(lengths, vec![1, 2, 3, 4, 5, 6]);
    assert_eq!(exec.calls(), 6);
}
