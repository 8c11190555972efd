use crate::error::FetchError;
use crate::table::Table;

/// Tabular statistics API (IPEA timeseries and territory registry).
pub trait StatisticalApi: Send + Sync {
    /// Values of one series, optionally restricted to a single year.
    fn timeseries(&self, code: &str, year: Option<i32>) -> Result<Table, FetchError>;

    /// Every known territorial unit, at every geographic level.
    fn territories(&self) -> Result<Table, FetchError>;
}

/// External statistical-language runtime that evaluates a script and
/// hands back its tabular result.
pub trait ScriptRuntime: Send + Sync {
    fn run_table(&self, script: &str) -> Result<Table, FetchError>;
}
