use std::time::Duration;

use chrono::{DateTime, Datelike};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, instrument, warn};

use crate::app::ports::StatisticalApi;
use crate::constants::{
    TERR_AREA, TERR_CAPITAL, TERR_ID, TERR_LEVEL, TERR_NAME, TS_CODE, TS_LEVEL, TS_RAW_DATE,
    TS_TERRITORY, TS_VALUE_PREFIX, TS_YEAR,
};
use crate::error::FetchError;
use crate::table::{Cell, Table};

pub const IPEA_ODATA_URL: &str = "http://www.ipeadata.gov.br/api/odata4";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

type ODataRow = Map<String, Value>;

#[derive(Debug, Deserialize)]
struct ODataResponse {
    value: Vec<ODataRow>,
}

/// Blocking client for the IPEA OData v4 API.
pub struct IpeaClient {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl IpeaClient {
    pub fn new() -> Result<Self, FetchError> {
        Self::with_base_url(IPEA_ODATA_URL)
    }

    pub fn with_base_url(base_url: &str) -> Result<Self, FetchError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn get_values(&self, resource: &str) -> Result<Vec<ODataRow>, FetchError> {
        let url = format!("{}/{}", self.base_url, resource);
        debug!(url = %url, "GET");
        let resp = self.client.get(&url).send()?;
        if !resp.status().is_success() {
            return Err(FetchError::Api {
                message: format!("{} returned HTTP {}", url, resp.status().as_u16()),
            });
        }
        let body: ODataResponse = resp.json()?;
        Ok(body.value)
    }

    /// Unit label for the value column, e.g. `R$ (mil)`. Missing metadata
    /// is not fatal: the column is then labelled plain `VALUE`.
    fn unit_label(&self, code: &str) -> Option<String> {
        match self.get_values(&format!("Metadados('{}')", quote(code))) {
            Ok(rows) => rows.first().and_then(unit_from_metadata),
            Err(e) => {
                warn!(series = %code, error = %e, "Could not fetch series metadata");
                None
            }
        }
    }
}

impl StatisticalApi for IpeaClient {
    #[instrument(skip(self))]
    fn timeseries(&self, code: &str, year: Option<i32>) -> Result<Table, FetchError> {
        let rows = self.get_values(&format!("ValoresSerie(SERCODIGO='{}')", quote(code)))?;
        if rows.is_empty() {
            return Err(FetchError::EmptySeries {
                code: code.to_string(),
            });
        }
        let unit = self.unit_label(code);
        series_table(&rows, unit.as_deref(), year)
    }

    #[instrument(skip(self))]
    fn territories(&self) -> Result<Table, FetchError> {
        let rows = self.get_values("Territorios")?;
        territories_table(&rows)
    }
}

// OData string literals escape a quote by doubling it.
fn quote(code: &str) -> String {
    code.replace('\'', "''")
}

fn unit_from_metadata(row: &ODataRow) -> Option<String> {
    let unit = row.get("UNINOME").and_then(Value::as_str)?.trim();
    if unit.is_empty() {
        return None;
    }
    match row.get("MULNOME").and_then(Value::as_str).map(str::trim) {
        Some(mult) if !mult.is_empty() => Some(format!("{} ({})", unit, mult)),
        _ => Some(unit.to_string()),
    }
}

fn field(row: &ODataRow, key: &str) -> Cell {
    row.get(key).map(Cell::from_json).unwrap_or(Cell::Null)
}

fn year_of(raw_date: &str) -> Option<i32> {
    DateTime::parse_from_rfc3339(raw_date)
        .map(|d| d.year())
        .ok()
        .or_else(|| raw_date.get(..4).and_then(|y| y.parse().ok()))
}

/// Lays out `ValoresSerie` rows with the bronze timeseries columns.
pub fn series_table(rows: &[ODataRow], unit: Option<&str>, year: Option<i32>) -> Result<Table, FetchError> {
    let value_column = match unit {
        Some(unit) => format!("{} ({})", TS_VALUE_PREFIX, unit),
        None => TS_VALUE_PREFIX.to_string(),
    };
    let mut table = Table::new([TS_CODE, TS_RAW_DATE, TS_YEAR, TS_LEVEL, TS_TERRITORY, value_column.as_str()])?;

    for row in rows {
        let raw_date = row.get("VALDATA").and_then(Value::as_str).unwrap_or_default();
        let row_year = year_of(raw_date);
        if year.is_some() && row_year != year {
            continue;
        }
        table.push_row(vec![
            field(row, "SERCODIGO"),
            Cell::text(raw_date),
            row_year.map(|y| Cell::Int(y.into())).unwrap_or(Cell::Null),
            field(row, "NIVNOME"),
            field(row, "TERCODIGO"),
            field(row, "VALVALOR"),
        ])?;
    }
    Ok(table)
}

/// Lays out `Territorios` rows with the bronze registry columns.
pub fn territories_table(rows: &[ODataRow]) -> Result<Table, FetchError> {
    let mut table = Table::new([TERR_NAME, TERR_ID, TERR_LEVEL, TERR_AREA, TERR_CAPITAL])?;
    for row in rows {
        table.push_row(vec![
            field(row, "TERNOME"),
            field(row, "TERCODIGO"),
            field(row, "NIVNOME"),
            field(row, "TERAREA"),
            field(row, "TERCAPITAL"),
        ])?;
    }
    Ok(table)
}
