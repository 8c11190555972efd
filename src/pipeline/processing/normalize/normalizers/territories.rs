use super::base::SourceNormalizer;
use crate::constants::{COD_MUN_IBGE, LEVEL_MUNICIPIOS, MUNICIPIO, TERR_AREA, TERR_CAPITAL, TERR_ID, TERR_LEVEL, TERR_NAME};
use crate::pipeline::processing::normalize::{NormalizeResult, NormalizedTable};
use crate::pipeline::sources::Source;
use crate::table::{Cell, Table};

/// Normalizer for the territory registry: municipality names by code
pub struct TerritoryNormalizer;

impl SourceNormalizer for TerritoryNormalizer {
    fn source(&self) -> Source {
        Source::Territories
    }

    fn name(&self) -> &str {
        "Territory registry"
    }

    fn normalize(&self, raw: Table) -> NormalizeResult {
        let table = raw
            .filter_eq(TERR_LEVEL, &Cell::text(LEVEL_MUNICIPIOS))?
            .drop_columns(&[TERR_LEVEL, TERR_AREA, TERR_CAPITAL])?
            .rename_columns(&[(TERR_NAME, MUNICIPIO), (TERR_ID, COD_MUN_IBGE)])?;
        NormalizedTable::from_table(Source::Territories, &table, MUNICIPIO)
    }
}
