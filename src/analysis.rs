//! Summary statistics written next to the gold table.

use tracing::info;

use crate::constants::{
    CARGA_TRIBUTARIA, CORRELATION_FILE, DESCRIPTIVE_STATS_FILE, HABITANTES, IDHM, PIB, RECEITAS_CORRENTES,
};
use crate::error::{Result, TableError};
use crate::pipeline::processing::consolidate::{ConsolidatedRecord, ConsolidatedTable};
use crate::storage::{Layer, LayerStore, StoredFile};
use crate::table::{Cell, Table};

/// Gold columns summarized in the descriptive statistics file.
pub const DESCRIBED_COLUMNS: [&str; 5] = [HABITANTES, IDHM, RECEITAS_CORRENTES, PIB, CARGA_TRIBUTARIA];

/// Gold columns compared in the correlation matrix.
pub const CORRELATED_COLUMNS: [&str; 3] = [IDHM, CARGA_TRIBUTARIA, PIB];

const STATISTICS: [&str; 8] = ["count", "mean", "std", "min", "25%", "50%", "75%", "max"];

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSummary {
    pub count: usize,
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<f64>,
    pub q25: Option<f64>,
    pub median: Option<f64>,
    pub q75: Option<f64>,
    pub max: Option<f64>,
}

impl ColumnSummary {
    fn values(&self) -> [Option<f64>; 8] {
        [
            Some(self.count as f64),
            self.mean,
            self.std,
            self.min,
            self.q25,
            self.median,
            self.q75,
            self.max,
        ]
    }
}

/// Numeric values of a gold column, `None` where the cell is null.
pub fn column(gold: &ConsolidatedTable, name: &str) -> Vec<Option<f64>> {
    let pick: fn(&ConsolidatedRecord) -> Option<f64> = match name {
        HABITANTES => |r| r.habitantes.map(|v| v as f64),
        IDHM => |r| r.idhm,
        RECEITAS_CORRENTES => |r| r.receitas_correntes,
        PIB => |r| r.pib,
        CARGA_TRIBUTARIA => |r| Some(r.carga_tributaria),
        _ => |_| None,
    };
    gold.records().iter().map(pick).collect()
}

/// Quantile of sorted data with linear interpolation between ranks.
pub fn quantile(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let frac = pos - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * frac)
}

pub fn describe(values: &[Option<f64>]) -> ColumnSummary {
    let mut present: Vec<f64> = values.iter().flatten().copied().filter(|v| !v.is_nan()).collect();
    present.sort_by(f64::total_cmp);

    let count = present.len();
    let mean = (count > 0).then(|| present.iter().sum::<f64>() / count as f64);
    let std = match mean {
        Some(mean) if count > 1 => {
            let ss: f64 = present.iter().map(|v| (v - mean).powi(2)).sum();
            Some((ss / (count - 1) as f64).sqrt())
        }
        _ => None,
    };

    ColumnSummary {
        count,
        mean,
        std,
        min: present.first().copied(),
        q25: quantile(&present, 0.25),
        median: quantile(&present, 0.5),
        q75: quantile(&present, 0.75),
        max: present.last().copied(),
    }
}

/// Pearson correlation over the rows where both values are present.
/// Undefined (fewer than two pairs or zero variance) gives `None`.
pub fn pearson(xs: &[Option<f64>], ys: &[Option<f64>]) -> Option<f64> {
    let pairs: Vec<(f64, f64)> = xs
        .iter()
        .zip(ys)
        .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
        .filter(|(x, y)| !x.is_nan() && !y.is_nan())
        .collect();
    if pairs.len() < 2 {
        return None;
    }
    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|(_, y)| y).sum::<f64>() / n;

    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (x, y) in &pairs {
        let (dx, dy) = (x - mean_x, y - mean_y);
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    if sxx == 0.0 || syy == 0.0 {
        return None;
    }
    Some(sxy / (sxx * syy).sqrt())
}

fn optional(value: Option<f64>) -> Cell {
    value.map(Cell::Float).unwrap_or(Cell::Null)
}

/// One row per statistic, one column per described gold column.
pub fn summary_table(gold: &ConsolidatedTable) -> std::result::Result<Table, TableError> {
    let summaries: Vec<ColumnSummary> = DESCRIBED_COLUMNS.iter().map(|c| describe(&column(gold, c))).collect();

    let mut table = Table::new(std::iter::once("statistic").chain(DESCRIBED_COLUMNS))?;
    for (i, stat) in STATISTICS.iter().enumerate() {
        let mut row = vec![Cell::text(*stat)];
        row.extend(summaries.iter().map(|s| optional(s.values()[i])));
        table.push_row(row)?;
    }
    Ok(table)
}

pub fn correlation_matrix(gold: &ConsolidatedTable) -> std::result::Result<Table, TableError> {
    let columns: Vec<Vec<Option<f64>>> = CORRELATED_COLUMNS.iter().map(|c| column(gold, c)).collect();

    let mut table = Table::new(std::iter::once("variable").chain(CORRELATED_COLUMNS))?;
    for (name, xs) in CORRELATED_COLUMNS.iter().zip(&columns) {
        let mut row = vec![Cell::text(*name)];
        row.extend(columns.iter().map(|ys| optional(pearson(xs, ys))));
        table.push_row(row)?;
    }
    Ok(table)
}

/// Writes both reports to the analysis layer.
pub fn write_reports(gold: &ConsolidatedTable, store: &LayerStore) -> Result<Vec<StoredFile>> {
    let summary = store.save(&summary_table(gold)?, Layer::Analysis, DESCRIPTIVE_STATS_FILE)?;
    let correlation = store.save(&correlation_matrix(gold)?, Layer::Analysis, CORRELATION_FILE)?;
    info!("📈 Wrote analysis reports for {} municipalities", gold.len());
    Ok(vec![summary, correlation])
}
