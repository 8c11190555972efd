use super::base::{municipal_series, round_to, SourceNormalizer};
use crate::pipeline::processing::normalize::{NormalizeResult, NormalizedTable};
use crate::pipeline::sources::Source;
use crate::table::{Cell, Table};

/// Normalizer for the IPEA timeseries sources (GDP, current revenue,
/// population). They share one raw layout and differ only in the value
/// column's name and its type/unit fixup.
pub struct SeriesNormalizer {
    source: Source,
    name: &'static str,
    fixup: fn(&Cell) -> Cell,
}

impl SeriesNormalizer {
    /// GDP is reported in thousands of reais.
    pub fn gdp() -> Self {
        Self {
            source: Source::Gdp,
            name: "GDP series",
            fixup: gdp_value,
        }
    }

    pub fn current_revenue() -> Self {
        Self {
            source: Source::CurrentRevenue,
            name: "Current revenue series",
            fixup: revenue_value,
        }
    }

    pub fn population() -> Self {
        Self {
            source: Source::Population,
            name: "Population series",
            fixup: population_value,
        }
    }
}

fn gdp_value(cell: &Cell) -> Cell {
    cell.as_f64()
        .map(|v| Cell::Float(round_to(v * 1000.0, 3)))
        .unwrap_or(Cell::Null)
}

fn revenue_value(cell: &Cell) -> Cell {
    cell.as_f64()
        .map(|v| Cell::Float(round_to(v, 2)))
        .unwrap_or(Cell::Null)
}

// Values that do not cast are kept as they came.
fn population_value(cell: &Cell) -> Cell {
    cell.as_i64().map(Cell::Int).unwrap_or_else(|| cell.clone())
}

impl SourceNormalizer for SeriesNormalizer {
    fn source(&self) -> Source {
        self.source
    }

    fn name(&self) -> &str {
        self.name
    }

    fn normalize(&self, raw: Table) -> NormalizeResult {
        let column = self.source.value_column();
        let table = municipal_series(raw, column)?.map_column(column, self.fixup)?;
        NormalizedTable::from_table(self.source, &table, column)
    }
}
