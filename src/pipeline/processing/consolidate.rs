//! Gold stage: left-joins the normalized tables on `CodMunIBGE` and derives
//! the tax burden ratio and the completeness flag.
//!
//! Join order matters. The first table anchors the rows: a municipality
//! missing from it never reaches gold, while one missing from any later
//! table only gets nulls in that table's column. Rows are never dropped
//! for missing values; they are flagged `incomplete` instead.

use std::collections::HashMap;
use std::fmt;

use metrics::counter;
use tracing::{info, instrument, warn};

use crate::constants::{
    COD_MUN_IBGE, GOLD_COLUMNS, GOLD_FILE, HABITANTES, IDHM, MUNICIPIO, PIB, RECEITAS_CORRENTES,
};
use crate::error::{ConsolidationError, PipelineError, Result, TableError};
use crate::pipeline::processing::normalize::NormalizedTable;
use crate::pipeline::sources::SourceSpec;
use crate::storage::{Layer, LayerStore};
use crate::table::{Cell, Table};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataStatus {
    Complete,
    Incomplete,
}

impl DataStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataStatus::Complete => "complete",
            DataStatus::Incomplete => "incomplete",
        }
    }
}

impl fmt::Display for DataStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One municipality in the gold table.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsolidatedRecord {
    pub cod_mun_ibge: String,
    pub municipio: Option<String>,
    pub habitantes: Option<i64>,
    pub idhm: Option<f64>,
    pub receitas_correntes: Option<f64>,
    pub pib: Option<f64>,
    pub carga_tributaria: f64,
    pub data_status: DataStatus,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConsolidatedTable {
    records: Vec<ConsolidatedRecord>,
}

impl ConsolidatedTable {
    pub fn records(&self) -> &[ConsolidatedRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn count_with_status(&self, status: DataStatus) -> usize {
        self.records.iter().filter(|r| r.data_status == status).count()
    }

    /// Gold layout, in canonical column order.
    pub fn to_table(&self) -> std::result::Result<Table, TableError> {
        let mut table = Table::new(GOLD_COLUMNS)?;
        for r in &self.records {
            table.push_row(vec![
                Cell::text(r.cod_mun_ibge.as_str()),
                r.municipio.clone().map(Cell::Text).unwrap_or(Cell::Null),
                r.habitantes.map(Cell::Int).unwrap_or(Cell::Null),
                float_cell(r.idhm),
                float_cell(r.receitas_correntes),
                float_cell(r.pib),
                Cell::Float(r.carga_tributaria),
                Cell::text(r.data_status.as_str()),
            ])?;
        }
        Ok(table)
    }
}

fn float_cell(value: Option<f64>) -> Cell {
    value.map(Cell::Float).unwrap_or(Cell::Null)
}

/// Revenue over GDP. A null or zero GDP yields 0 rather than an unknown
/// ratio; a null revenue counts as 0.
pub fn tax_burden(receitas_correntes: Option<f64>, pib: Option<f64>) -> f64 {
    match pib {
        Some(pib) if pib != 0.0 => receitas_correntes.unwrap_or(0.0) / pib,
        _ => 0.0,
    }
}

/// Complete iff IDHM, GDP and revenue are all present and non-zero.
pub fn classify(idhm: Option<f64>, pib: Option<f64>, receitas_correntes: Option<f64>) -> DataStatus {
    let present = |v: Option<f64>| matches!(v, Some(x) if x != 0.0);
    if present(idhm) && present(pib) && present(receitas_correntes) {
        DataStatus::Complete
    } else {
        DataStatus::Incomplete
    }
}

/// Joined column names plus `(key, cells)` rows in anchor order.
type Joined = (Vec<String>, Vec<(String, Vec<Cell>)>);

fn left_join(tables: &[NormalizedTable]) -> std::result::Result<Joined, ConsolidationError> {
    let (first, rest) = tables.split_first().ok_or(ConsolidationError::NoTables)?;

    let mut columns = vec![first.value_column().to_string()];
    let mut rows: Vec<(String, Vec<Cell>)> = first
        .records()
        .iter()
        .map(|r| (r.cod_mun_ibge.clone(), vec![r.value.clone()]))
        .collect();

    for table in rest {
        let column = table.value_column();
        if column == COD_MUN_IBGE || columns.iter().any(|c| c == column) {
            return Err(ConsolidationError::DuplicateColumn {
                column: column.to_string(),
            });
        }
        let lookup: HashMap<&str, &Cell> = table
            .records()
            .iter()
            .map(|r| (r.cod_mun_ibge.as_str(), &r.value))
            .collect();

        let mut matched = 0usize;
        for (key, cells) in rows.iter_mut() {
            match lookup.get(key.as_str()) {
                Some(cell) => {
                    matched += 1;
                    cells.push((*cell).clone());
                }
                None => cells.push(Cell::Null),
            }
        }
        info!(source = %table.source(), matched, rows = rows.len(), "Joined {}", column);
        columns.push(column.to_string());
    }
    Ok((columns, rows))
}

/// Pure consolidation. Deterministic for a given input order.
pub fn consolidate_tables(tables: &[NormalizedTable]) -> std::result::Result<ConsolidatedTable, ConsolidationError> {
    let (columns, rows) = left_join(tables)?;
    let position = |name: &str| columns.iter().position(|c| c == name);
    let (municipio_i, habitantes_i, idhm_i, receitas_i, pib_i) = (
        position(MUNICIPIO),
        position(HABITANTES),
        position(IDHM),
        position(RECEITAS_CORRENTES),
        position(PIB),
    );

    let mut uncast_population = 0usize;
    let mut records: Vec<ConsolidatedRecord> = rows
        .into_iter()
        .map(|(cod_mun_ibge, cells)| {
            let get = |idx: Option<usize>| idx.map(|i| &cells[i]).filter(|c| !c.is_null());

            let habitantes = get(habitantes_i).and_then(|c| {
                let value = c.as_i64();
                if value.is_none() {
                    uncast_population += 1;
                }
                value
            });
            let idhm = get(idhm_i).and_then(Cell::as_f64);
            let receitas_correntes = get(receitas_i).and_then(Cell::as_f64);
            let pib = get(pib_i).and_then(Cell::as_f64);

            ConsolidatedRecord {
                municipio: get(municipio_i).map(|c| c.to_string()),
                habitantes,
                idhm,
                receitas_correntes,
                pib,
                carga_tributaria: tax_burden(receitas_correntes, pib),
                data_status: classify(idhm, pib, receitas_correntes),
                cod_mun_ibge,
            }
        })
        .collect();

    if uncast_population > 0 {
        warn!(rows = uncast_population, "Non-numeric population values left null in gold");
    }

    // String order; IBGE codes are fixed width so this matches numeric order.
    records.sort_by(|a, b| a.cod_mun_ibge.cmp(&b.cod_mun_ibge));
    Ok(ConsolidatedTable { records })
}

/// Builds the gold table and writes it to the gold layer.
pub struct DatasetConsolidator {
    filename: String,
}

impl Default for DatasetConsolidator {
    fn default() -> Self {
        Self::new(GOLD_FILE)
    }
}

impl DatasetConsolidator {
    pub fn new(filename: &str) -> Self {
        Self {
            filename: filename.to_string(),
        }
    }

    #[instrument(skip(self, tables, store), fields(tables = tables.len(), file = %self.filename))]
    pub fn consolidate(&self, tables: &[NormalizedTable], store: &LayerStore) -> Result<ConsolidatedTable> {
        let gold = consolidate_tables(tables)?;
        store.save(&gold.to_table()?, Layer::Gold, &self.filename)?;

        let complete = gold.count_with_status(DataStatus::Complete);
        let incomplete = gold.count_with_status(DataStatus::Incomplete);
        counter!("ipea_gold_rows_total", "status" => DataStatus::Complete.as_str()).increment(complete as u64);
        counter!("ipea_gold_rows_total", "status" => DataStatus::Incomplete.as_str()).increment(incomplete as u64);
        info!(complete, incomplete, "🏁 Gold table ready");
        Ok(gold)
    }

    /// Rebuilds gold from silver files already on disk, in plan order.
    /// Silver files that are missing or do not parse skip their source.
    /// Other I/O failures abort the rebuild.
    pub fn rebuild_from_silver(&self, plan: &[SourceSpec], store: &LayerStore) -> Result<Option<ConsolidatedTable>> {
        let mut tables = Vec::with_capacity(plan.len());
        for spec in plan {
            let table = match store.load(Layer::Silver, &spec.filename) {
                Ok(Some(table)) => table,
                Ok(None) => {
                    warn!(source = %spec.source, file = %spec.filename, "No silver file, skipping source");
                    continue;
                }
                Err(e @ PipelineError::Csv { .. }) => {
                    warn!(source = %spec.source, file = %spec.filename, error = %e, "Unreadable silver file, skipping source");
                    continue;
                }
                Err(e) => return Err(e),
            };
            match NormalizedTable::from_table(spec.source, &table, spec.source.value_column()) {
                Ok(normalized) => tables.push(normalized),
                Err(e) => warn!(source = %spec.source, file = %spec.filename, error = %e, "Unusable silver file, skipping source"),
            }
        }
        if tables.is_empty() {
            warn!("No silver tables available; gold not rebuilt");
            return Ok(None);
        }
        self.consolidate(&tables, store).map(Some)
    }
}
