//! Shared fixtures for integration tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use rowcast::{
    BoxError, CommandDefinition, CommandExecutor, MappingSpec, MemoryRowSource, ParameterSet, Shape, SqlValue, Target,
};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Person {
    pub id: i32,
    pub name: String,
}

impl Target for Person {
    fn shape() -> Shape<Self> {
        Shape::structured()
    }
}

/// `Id -> "Id"`, `Name -> "full_name"`
pub fn person_spec() -> MappingSpec<Person> {
    MappingSpec::<Person>::builder()
        .field("Id", |p: &mut Person, v: i32| p.id = v)
        .field("Name", |p: &mut Person, v: String| p.name = v)
        .alias("full_name")
        .build()
        .unwrap()
}

pub fn person_rows(rows: Vec<Vec<SqlValue>>) -> MemoryRowSource {
    MemoryRowSource::new(["Id", "full_name"], rows)
}

/// Executor serving a fixed person table, counting executions
pub struct PeopleExecutor {
    pub calls: AtomicUsize,
    pub delay: Option<Duration>,
}

impl PeopleExecutor {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            delay: None,
        }
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            delay: Some(delay),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn open(&self, params: &ParameterSet) -> MemoryRowSource {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let count = params.get("count").and_then(SqlValue::as_i64).unwrap_or(2);
        let rows = (1..=count)
            .map(|i| vec![SqlValue::Int(i), SqlValue::from(format!("person-{}", i))])
            .collect();
        let source = person_rows(rows);
        match self.delay {
            Some(delay) => source.with_async_delay(delay),
            None => source,
        }
    }
}

impl CommandExecutor for PeopleExecutor {
    type Source = MemoryRowSource;
    type Error = BoxError;

    fn execute(&self, _command: &CommandDefinition, params: &ParameterSet) -> Result<MemoryRowSource, BoxError> {
        Ok(self.open(params))
    }

    async fn execute_async(
        &self,
        _command: &CommandDefinition,
        params: &ParameterSet,
    ) -> Result<MemoryRowSource, BoxError> {
        Ok(self.open(params))
    }
}
