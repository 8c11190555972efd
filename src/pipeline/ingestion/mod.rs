//! Fetch stage: one raw table per source, persisted unmodified to bronze.

use std::time::Instant;

use chrono::{Duration, NaiveDate};
use metrics::{counter, histogram};
use tracing::{error, info, instrument};

use crate::app::ports::{ScriptRuntime, StatisticalApi};
use crate::constants::R_DATE;
use crate::error::{FetchError, Result, TableError};
use crate::pipeline::sources::{SourceQuery, SourceSpec};
use crate::storage::{Layer, LayerStore};
use crate::table::{Cell, Table};

/// Either the raw table or the reason the source will be skipped.
pub type FetchResult = std::result::Result<Table, FetchError>;

// Roughly ±8000 years; keeps Duration::days away from its panic range.
const MAX_EPOCH_DAYS: i64 = 3_000_000;

pub struct SourceFetcher {
    api: Box<dyn StatisticalApi>,
    runtime: Box<dyn ScriptRuntime>,
}

impl SourceFetcher {
    pub fn new(api: Box<dyn StatisticalApi>, runtime: Box<dyn ScriptRuntime>) -> Self {
        Self { api, runtime }
    }

    /// Upstream failures come back as `Ok(Err(_))`. Only a failed bronze
    /// write is returned as an outer error.
    #[instrument(skip(self, spec, store), fields(source = %spec.source, file = %spec.filename))]
    pub fn fetch(&self, spec: &SourceSpec, store: &LayerStore) -> Result<FetchResult> {
        info!("📡 Fetching {}", spec.filename);
        let started = Instant::now();

        let raw = match self.fetch_raw(&spec.query) {
            Ok(raw) => raw,
            Err(e) => {
                error!(file = %spec.filename, error = %e, "Error fetching data for {}", spec.filename);
                counter!("ipea_fetch_failures_total", "source" => spec.source.as_str()).increment(1);
                return Ok(Err(e));
            }
        };
        histogram!("ipea_fetch_duration_seconds", "source" => spec.source.as_str())
            .record(started.elapsed().as_secs_f64());

        store.save(&raw, Layer::Bronze, &spec.filename)?;
        counter!("ipea_sources_fetched_total", "source" => spec.source.as_str()).increment(1);
        info!("✅ Fetched {} raw rows", raw.len());
        Ok(Ok(raw))
    }

    fn fetch_raw(&self, query: &SourceQuery) -> FetchResult {
        match query {
            SourceQuery::Series { code, year } => self.api.timeseries(code, *year),
            SourceQuery::Territories => self.api.territories(),
            SourceQuery::Script { script } => {
                let table = self.runtime.run_table(script)?;
                Ok(decode_epoch_days(table, R_DATE)?)
            }
        }
    }
}

/// Converts `column` from days since 1970-01-01 to dates, but only when
/// every non-null cell in it is numeric. Other tables pass through.
pub fn decode_epoch_days(table: Table, column: &str) -> std::result::Result<Table, TableError> {
    if table.column_index(column).is_none() {
        return Ok(table);
    }
    let numeric = table
        .column_values(column)?
        .all(|cell| cell.is_null() || matches!(cell, Cell::Int(_) | Cell::Float(_)));
    if !numeric {
        return Ok(table);
    }

    // NaiveDate's default is the Unix epoch.
    let epoch = NaiveDate::default();
    table.map_column(column, |cell| {
        cell.as_i64()
            .filter(|days| days.abs() <= MAX_EPOCH_DAYS)
            .and_then(|days| epoch.checked_add_signed(Duration::days(days)))
            .map(Cell::Date)
            .unwrap_or(Cell::Null)
    })
}
