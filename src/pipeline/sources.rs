use std::fmt;

use crate::constants::{
    GDP_FILE, GDP_SERIES, HABITANTES, IDHM, IDHM_FILE, IDHM_SCRIPT, MUNICIPIO, PIB, POPULATION_FILE,
    POPULATION_SERIES, RECEITAS_CORRENTES, REFERENCE_YEAR, REVENUE_FILE, REVENUE_SERIES,
    TERRITORIES_FILE,
};

/// Stable identity of an upstream dataset. Normalizers are registered
/// against it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Source {
    Gdp,
    CurrentRevenue,
    Population,
    Territories,
    Idhm,
}

impl Source {
    pub const ALL: [Source; 5] = [
        Source::Gdp,
        Source::CurrentRevenue,
        Source::Population,
        Source::Territories,
        Source::Idhm,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Gdp => "gdp",
            Source::CurrentRevenue => "current_revenue",
            Source::Population => "population",
            Source::Territories => "territories",
            Source::Idhm => "idhm",
        }
    }

    /// Canonical name of the single thematic column this source contributes.
    pub fn value_column(&self) -> &'static str {
        match self {
            Source::Gdp => PIB,
            Source::CurrentRevenue => RECEITAS_CORRENTES,
            Source::Population => HABITANTES,
            Source::Territories => MUNICIPIO,
            Source::Idhm => IDHM,
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a source is retrieved upstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceQuery {
    Series { code: String, year: Option<i32> },
    Territories,
    Script { script: String },
}

/// One entry of the fetch plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSpec {
    pub source: Source,
    pub query: SourceQuery,
    /// Used in the bronze and silver layers alike.
    pub filename: String,
}

impl SourceSpec {
    pub fn series(source: Source, code: &str, year: Option<i32>, filename: &str) -> Self {
        Self {
            source,
            query: SourceQuery::Series {
                code: code.to_string(),
                year,
            },
            filename: filename.to_string(),
        }
    }

    pub fn territories(filename: &str) -> Self {
        Self {
            source: Source::Territories,
            query: SourceQuery::Territories,
            filename: filename.to_string(),
        }
    }

    pub fn script(source: Source, script: &str, filename: &str) -> Self {
        Self {
            source,
            query: SourceQuery::Script {
                script: script.to_string(),
            },
            filename: filename.to_string(),
        }
    }
}

/// The fixed plan. Its order is the join order: the first source that
/// normalizes successfully anchors the gold rows.
pub fn default_plan() -> Vec<SourceSpec> {
    let year = Some(REFERENCE_YEAR);
    vec![
        SourceSpec::series(Source::Gdp, GDP_SERIES, year, GDP_FILE),
        SourceSpec::series(Source::CurrentRevenue, REVENUE_SERIES, year, REVENUE_FILE),
        SourceSpec::series(Source::Population, POPULATION_SERIES, year, POPULATION_FILE),
        SourceSpec::territories(TERRITORIES_FILE),
        SourceSpec::script(Source::Idhm, IDHM_SCRIPT, IDHM_FILE),
    ]
}
