//! Compiled row-mapper

use std::fmt;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::column::{ColumnIndex, ColumnSnapshot};
use crate::errors::{MapError, MapResult};
use crate::fingerprint::Fingerprint;
use crate::observability::{event_enabled, log_event_with_fields, Event, MetricsRegistry};
use crate::source::{AsyncRowSource, RowReader, RowSource};

/// Converts the reader's current row into one target value
pub type RowMaterializer<T> = Box<dyn Fn(&dyn RowReader, &mut ColumnIndex) -> MapResult<T> + Send + Sync>;

/// Materialized rows plus the column shape discovered while reading them
#[derive(Debug, Clone)]
pub struct MappedRows<T> {
    pub rows: Vec<T>,
    pub columns: ColumnSnapshot,
}

/// Reusable conversion routine for one mapping fingerprint.
///
/// Holds no per-execution state; share it freely through `Arc`.
pub struct CompiledRowMapper<T> {
    fingerprint: Fingerprint,
    shape_name: String,
    materialize: RowMaterializer<T>,
    metrics: Arc<MetricsRegistry>,
}

impl<T> CompiledRowMapper<T> {
    pub(crate) fn new(
        fingerprint: Fingerprint,
        shape_name: String,
        materialize: RowMaterializer<T>,
        metrics: Arc<MetricsRegistry>,
    ) -> Self {
        Self {
            fingerprint,
            shape_name,
            materialize,
            metrics,
        }
    }

    /// Fingerprint of the mapping this mapper was compiled from
    pub fn fingerprint(&self) -> Fingerprint {
        self.fingerprint
    }

    /// Shape that produced the materializer, or the claiming resolver's name
    pub fn shape_name(&self) -> &str {
        &self.shape_name
    }

    /// Drain a row source into target values.
    ///
    /// The first failing row aborts the whole call; no partial output is
    /// returned.
    pub fn map_rows<S: RowSource>(&self, source: &mut S, mut index: ColumnIndex) -> MapResult<MappedRows<T>> {
        let mut rows = Vec::new();
        while source.advance()? {
            rows.push(self.materialize_row(&*source, &mut index)?);
        }
        Ok(self.finish(rows, index))
    }

    /// Async variant of [`map_rows`](Self::map_rows).
    ///
    /// Cancellation is observed while waiting on the source; a row that was
    /// already fetched is always materialized completely.
    pub async fn map_rows_async<S: AsyncRowSource>(
        &self,
        source: &mut S,
        mut index: ColumnIndex,
        cancel: &CancellationToken,
    ) -> MapResult<MappedRows<T>> {
        let mut rows = Vec::new();
        loop {
            let advanced = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    let done = rows.len().to_string();
                    log_event_with_fields(
                        Event::ExecutionCancelled,
                        &[("fingerprint", &self.fingerprint.short()), ("rows", &done)],
                    );
                    return Err(MapError::Cancelled);
                }
                advanced = source.advance_async() => advanced?,
            };
            if !advanced {
                break;
            }
            rows.push(self.materialize_row(&*source, &mut index)?);
        }
        Ok(self.finish(rows, index))
    }

    fn materialize_row(&self, reader: &dyn RowReader, index: &mut ColumnIndex) -> MapResult<T> {
        index.observe(reader);
        (self.materialize)(reader, index).map_err(|e| {
            if let Some((field, alias)) = e.field_context() {
                self.metrics.increment_binding_failures();
                if event_enabled(Event::ColumnBindingFailed) {
                    log_event_with_fields(
                        Event::ColumnBindingFailed,
                        &[
                            ("alias", alias),
                            ("code", e.code()),
                            ("field", field),
                            ("fingerprint", &self.fingerprint.short()),
                        ],
                    );
                }
            }
            e
        })
    }

    fn finish(&self, rows: Vec<T>, index: ColumnIndex) -> MappedRows<T> {
        self.metrics.add_rows_materialized(rows.len() as u64);
        MappedRows {
            rows,
            columns: index.export(),
        }
    }
}

impl<T> fmt::Debug for CompiledRowMapper<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledRowMapper")
            .field("fingerprint", &self.fingerprint)
            .field("shape", &self.shape_name)
            .finish()
    }
}
