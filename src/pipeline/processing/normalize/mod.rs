//! Normalize stage: per-source cleaning into `(CodMunIBGE, value)` tables.

pub mod normalizers;
pub mod registry;

use std::collections::HashSet;

use metrics::counter;
use tracing::{debug, error, info, instrument, warn};

use crate::constants::COD_MUN_IBGE;
use crate::error::{NormalizeError, Result, TableError};
use crate::pipeline::sources::{Source, SourceSpec};
use crate::storage::{Layer, LayerStore};
use crate::table::{Cell, Table};

pub use registry::NormalizationRegistry;

/// Either the normalized table or the reason the source will be skipped.
pub type NormalizeResult = std::result::Result<NormalizedTable, NormalizeError>;

/// One municipality and the single value its source contributes.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRecord {
    pub cod_mun_ibge: String,
    pub value: Cell,
}

/// A per-source table keyed by municipality code.
///
/// Keys are strings, never null, and unique: rows without a key are
/// dropped and the first occurrence of a repeated key wins.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedTable {
    source: Source,
    value_column: String,
    records: Vec<NormalizedRecord>,
}

impl NormalizedTable {
    /// Projects `table` onto its `CodMunIBGE` and `value_column` columns.
    pub fn from_table(source: Source, table: &Table, value_column: &str) -> NormalizeResult {
        let key_idx = table.require_column(COD_MUN_IBGE)?;
        let value_idx = table.require_column(value_column)?;

        let mut seen = HashSet::with_capacity(table.len());
        let mut records = Vec::with_capacity(table.len());
        let mut missing_keys = 0usize;
        let mut duplicates = 0usize;

        for row in table.rows() {
            let Some(key) = row[key_idx].to_key() else {
                missing_keys += 1;
                continue;
            };
            if !seen.insert(key.clone()) {
                duplicates += 1;
                continue;
            }
            records.push(NormalizedRecord {
                cod_mun_ibge: key,
                value: row[value_idx].clone(),
            });
        }

        if missing_keys > 0 {
            debug!(source = %source, rows = missing_keys, "Dropped rows without a municipality code");
        }
        if duplicates > 0 {
            warn!(source = %source, rows = duplicates, "Dropped duplicate municipality codes, keeping first occurrence");
        }

        Ok(Self {
            source,
            value_column: value_column.to_string(),
            records,
        })
    }

    pub fn source(&self) -> Source {
        self.source
    }

    pub fn value_column(&self) -> &str {
        &self.value_column
    }

    pub fn records(&self) -> &[NormalizedRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn to_table(&self) -> std::result::Result<Table, TableError> {
        let mut table = Table::new([COD_MUN_IBGE, self.value_column.as_str()])?;
        for record in &self.records {
            table.push_row(vec![Cell::text(record.cod_mun_ibge.as_str()), record.value.clone()])?;
        }
        Ok(table)
    }
}

/// Dispatches raw tables to their source normalizer and persists the
/// result to the silver layer.
#[derive(Default)]
pub struct FieldNormalizer {
    registry: NormalizationRegistry,
}

impl FieldNormalizer {
    pub fn new(registry: NormalizationRegistry) -> Self {
        Self { registry }
    }

    /// Cleaning failures come back as `Ok(Err(_))`. Only a failed silver
    /// write is returned as an outer error.
    #[instrument(skip(self, spec, raw, store), fields(source = %spec.source, file = %spec.filename))]
    pub fn normalize(&self, spec: &SourceSpec, raw: Table, store: &LayerStore) -> Result<NormalizeResult> {
        let raw_rows = raw.len();
        let normalized = match self.registry.normalize(spec.source, raw) {
            Ok(normalized) => normalized,
            Err(e) => {
                error!(file = %spec.filename, error = %e, "Error transforming data for {}", spec.filename);
                counter!("ipea_normalize_failures_total", "source" => spec.source.as_str()).increment(1);
                return Ok(Err(e));
            }
        };

        store.save(&normalized.to_table()?, Layer::Silver, &spec.filename)?;
        info!("🔧 Normalized {} of {} raw rows", normalized.len(), raw_rows);
        Ok(Ok(normalized))
    }
}
