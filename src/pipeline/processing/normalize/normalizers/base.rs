use once_cell::sync::Lazy;
use regex::Regex;

use crate::constants::{COD_MUN_IBGE, LEVEL_MUNICIPIOS, TS_CODE, TS_LEVEL, TS_RAW_DATE, TS_TERRITORY, TS_VALUE_PREFIX, TS_YEAR};
use crate::error::NormalizeError;
use crate::pipeline::processing::normalize::NormalizeResult;
use crate::pipeline::sources::Source;
use crate::table::{Cell, Table};

/// Base trait for source-specific normalizers
pub trait SourceNormalizer: Send + Sync {
    /// The source this normalizer handles
    fn source(&self) -> Source;

    /// Human-readable name for logs
    fn name(&self) -> &str;

    /// Clean one raw table. Pure: persistence is the caller's job.
    fn normalize(&self, raw: Table) -> NormalizeResult;
}

// "VALUE", "VALUE (Habitante)", "VALUE (R$ (mil), a preços do ano 2010)"
static VALUE_COLUMN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^VALUE(\s*\(.*\))?$").expect("value column pattern is valid"));

/// The timeseries value column carries its unit in the name.
pub fn find_value_column(table: &Table) -> Result<String, NormalizeError> {
    table
        .find_column(|c| VALUE_COLUMN.is_match(c))
        .map(str::to_string)
        .ok_or_else(|| NormalizeError::MissingValueColumn {
            prefix: TS_VALUE_PREFIX.to_string(),
        })
}

/// Shared shape of every IPEA timeseries: municipal rows only, technical
/// columns dropped, territory code and value renamed to canonical names.
pub fn municipal_series(raw: Table, value_column: &str) -> Result<Table, NormalizeError> {
    let raw_value = find_value_column(&raw)?;
    let table = raw
        .filter_eq(TS_LEVEL, &Cell::text(LEVEL_MUNICIPIOS))?
        .drop_columns(&[TS_CODE, TS_RAW_DATE, TS_YEAR, TS_LEVEL])?
        .rename_columns(&[(TS_TERRITORY, COD_MUN_IBGE), (raw_value.as_str(), value_column)])?;
    Ok(table)
}

pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
