//! Command executor contract

use std::future::Future;

use crate::errors::BoxError;
use crate::fingerprint::{CommandDefinition, ParameterSet};
use crate::source::AsyncRowSource;

/// Runs a command against a data source and opens a row source over the
/// result. Connection and transaction handling live behind this trait.
pub trait CommandExecutor: Send + Sync {
    type Source: AsyncRowSource;
    type Error: Into<BoxError>;

    /// Execute synchronously
    fn execute(&self, command: &CommandDefinition, params: &ParameterSet) -> Result<Self::Source, Self::Error>;

    /// Execute without blocking the caller's task
    fn execute_async(
        &self,
        command: &CommandDefinition,
        params: &ParameterSet,
    ) -> impl Future<Output = Result<Self::Source, Self::Error>> + Send;
}
