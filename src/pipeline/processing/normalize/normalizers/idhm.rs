use chrono::NaiveDate;

use super::base::SourceNormalizer;
use crate::constants::{COD_MUN_IBGE, GEOGRAPHY_MUNICIPALITY, IDHM, REFERENCE_YEAR, R_CODE, R_DATE, R_GEOGRAPHY, R_TERRITORY, R_VALUE};
use crate::pipeline::processing::normalize::{NormalizeResult, NormalizedTable};
use crate::pipeline::sources::Source;
use crate::table::{Cell, Table};

/// Normalizer for the ipeadatar IDHM table. The series holds several
/// census years and geographies; only municipal values at the reference
/// date are kept.
pub struct IdhmNormalizer {
    reference_date: NaiveDate,
}

impl IdhmNormalizer {
    pub fn new(reference_date: NaiveDate) -> Self {
        Self { reference_date }
    }
}

impl Default for IdhmNormalizer {
    fn default() -> Self {
        Self::new(NaiveDate::from_ymd_opt(REFERENCE_YEAR, 1, 1).unwrap_or_default())
    }
}

impl SourceNormalizer for IdhmNormalizer {
    fn source(&self) -> Source {
        Source::Idhm
    }

    fn name(&self) -> &str {
        "IDHM (ipeadatar)"
    }

    fn normalize(&self, raw: Table) -> NormalizeResult {
        let table = raw
            .filter_eq(R_GEOGRAPHY, &Cell::text(GEOGRAPHY_MUNICIPALITY))?
            .filter_eq(R_DATE, &Cell::Date(self.reference_date))?
            .drop_columns(&[R_CODE, R_GEOGRAPHY, R_DATE])?
            .rename_columns(&[(R_TERRITORY, COD_MUN_IBGE), (R_VALUE, IDHM)])?;
        NormalizedTable::from_table(Source::Idhm, &table, IDHM)
    }
}
