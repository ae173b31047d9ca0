//! Async Execution and Cancellation Tests
//!
//! - Async execution matches sync output
//! - Cancellation before start never opens the command
//! - Cancellation during row I/O stops materialization
//! - Open readers are released on every path

mod common;

use std::time::Duration;

use common::{person_spec, PeopleExecutor};
use rowcast::{
    CommandDefinition, ExecutionContext, MapError, ParameterSet, ProcessorOptions, ProcessorRegistry,
};
use tokio_util::sync::CancellationToken;

fn people() -> CommandDefinition {
    CommandDefinition::new("select id, full_name from people")
}

#[tokio::test]
async fn test_async_matches_sync() {
    let registry = ProcessorRegistry::new();
    let p = registry
        .processor(people(), &person_spec(), ProcessorOptions::new())
        .unwrap();
    let exec = PeopleExecutor::new();
    let params = ParameterSet::new().with("count", 4i64);

    let sync = p.execute(&ExecutionContext::new(), &exec, &params).unwrap();
    let ctx = ExecutionContext::new();
    let async_out = p.execute_async(&ctx, &exec, &params).await.unwrap();

    assert_eq!(sync.rows, async_out.rows);
    assert_eq!(ctx.open_readers(), 0);
}

#[tokio::test]
async fn test_cancelled_before_start() {
    let registry = ProcessorRegistry::new();
    let p = registry
        .processor(people(), &person_spec(), ProcessorOptions::new())
        .unwrap();
    let exec = PeopleExecutor::new();
    let ctx = ExecutionContext::new();
    ctx.cancel();

    let err = p.execute_async(&ctx, &exec, &ParameterSet::new()).await.unwrap_err();
    assert!(matches!(err, MapError::Cancelled));
    assert_eq!(exec.calls(), 0);
    assert_eq!(ctx.open_readers(), 0);
}

#[tokio::test]
async fn test_cancel_during_row_io() {
    let registry = ProcessorRegistry::new();
    let p = registry
        .processor(people(), &person_spec(), ProcessorOptions::new())
        .unwrap();
    let exec = PeopleExecutor::with_delay(Duration::from_millis(50));
    let token = CancellationToken::new();
    let ctx = ExecutionContext::with_cancellation(token.clone());

    let canceller = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(75)).await;
        token.cancel();
    });

    let params = ParameterSet::new().with("count", 100i64);
    let err = p.execute_async(&ctx, &exec, &params).await.unwrap_err();
    canceller.await.unwrap();

    assert_eq!(err.code(), "ROWCAST_CANCELLED");
    assert_eq!(exec.calls(), 1);
    assert_eq!(ctx.open_readers(), 0);
    // nothing recorded from a cancelled run
    assert!(p.column_snapshot().is_none());
}

/// A cancelled execution leaves the processor usable for other contexts.
#[tokio::test]
async fn test_processor_usable_after_cancel() {
    let registry = ProcessorRegistry::new();
    let p = registry
        .processor(people(), &person_spec(), ProcessorOptions::new())
        .unwrap();
    let exec = PeopleExecutor::new();

    let cancelled = ExecutionContext::new();
    cancelled.cancel();
    assert!(p.execute_async(&cancelled, &exec, &ParameterSet::new()).await.is_err());

    let out = p
        .execute_async(&ExecutionContext::new(), &exec, &ParameterSet::new())
        .await
        .unwrap();
    assert_eq!(out.rows.len(), 2);
    assert_eq!(out.rows[0].name, "person-1");
}
