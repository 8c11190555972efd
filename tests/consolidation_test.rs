use anyhow::Result;
use tempfile::tempdir;

use ipea_etl::config::Config;
use ipea_etl::constants::{COD_MUN_IBGE, GOLD_FILE};
use ipea_etl::pipeline::processing::consolidate::{consolidate_tables, DataStatus, DatasetConsolidator};
use ipea_etl::pipeline::processing::normalize::NormalizedTable;
use ipea_etl::pipeline::sources::Source;
use ipea_etl::storage::{Layer, LayerStore};
use ipea_etl::table::{Cell, Table};

fn normalized(source: Source, rows: Vec<(String, Cell)>) -> NormalizedTable {
    let column = source.value_column();
    let mut table = Table::new([COD_MUN_IBGE, column]).unwrap();
    for (key, value) in rows {
        table.push_row(vec![Cell::Text(key), value]).unwrap();
    }
    NormalizedTable::from_table(source, &table, column).unwrap()
}

/// Sixty municipalities with gaps and zeros sprinkled through every source.
fn sample() -> Vec<NormalizedTable> {
    let codes: Vec<String> = (0..60).rev().map(|i| format!("{}", 1100000 + i * 37)).collect();
    let value = |i: usize, every: usize, base: f64| {
        if i % every == 0 {
            Cell::Null
        } else if i % (every + 1) == 0 {
            Cell::Float(0.0)
        } else {
            Cell::Float(base * (i as f64 + 1.0))
        }
    };

    vec![
        normalized(
            Source::Population,
            codes.iter().enumerate().map(|(i, c)| (c.clone(), Cell::Int(1000 + i as i64))).collect(),
        ),
        normalized(
            Source::Territories,
            codes.iter().map(|c| (c.clone(), Cell::text(format!("Município {}", c)))).collect(),
        ),
        normalized(
            Source::Idhm,
            codes.iter().enumerate().skip(3).map(|(i, c)| (c.clone(), value(i, 7, 0.01))).collect(),
        ),
        normalized(
            Source::Gdp,
            codes.iter().enumerate().map(|(i, c)| (c.clone(), value(i, 5, 1.0e6))).collect(),
        ),
        normalized(
            Source::CurrentRevenue,
            codes.iter().enumerate().map(|(i, c)| (c.clone(), value(i, 4, 1.0e5))).collect(),
        ),
    ]
}

#[test]
fn test_gold_properties_hold_for_every_row() -> Result<()> {
    let gold = consolidate_tables(&sample())?;
    assert_eq!(gold.len(), 60);

    let keys: Vec<&str> = gold.records().iter().map(|r| r.cod_mun_ibge.as_str()).collect();
    let mut sorted = keys.clone();
    sorted.sort();
    sorted.dedup();
    assert_eq!(keys, sorted, "rows must be unique and ordered by code");

    for r in gold.records() {
        match r.pib {
            Some(pib) if pib != 0.0 => {
                assert_eq!(r.carga_tributaria, r.receitas_correntes.unwrap_or(0.0) / pib)
            }
            _ => assert_eq!(r.carga_tributaria, 0.0),
        }

        let non_zero = |v: Option<f64>| v.map_or(false, |x| x != 0.0);
        let expected = if non_zero(r.idhm) && non_zero(r.pib) && non_zero(r.receitas_correntes) {
            DataStatus::Complete
        } else {
            DataStatus::Incomplete
        };
        assert_eq!(r.data_status, expected, "status of {}", r.cod_mun_ibge);
    }

    assert!(gold.count_with_status(DataStatus::Complete) > 0);
    assert!(gold.count_with_status(DataStatus::Incomplete) > 0);
    Ok(())
}

#[test]
fn test_consolidation_is_idempotent_on_disk() -> Result<()> {
    let dir = tempdir()?;
    let config = Config {
        bronze_folder: dir.path().join("b"),
        silver_folder: dir.path().join("s"),
        gold_folder: dir.path().join("g"),
        statistical_analysis_folder: dir.path().join("a"),
    };
    let store = LayerStore::new(&config);
    store.ensure_dirs()?;

    let tables = sample();
    let consolidator = DatasetConsolidator::default();
    let first = consolidator.consolidate(&tables, &store)?;
    let first_bytes = std::fs::read(store.path(Layer::Gold, GOLD_FILE))?;
    let second = consolidator.consolidate(&tables, &store)?;
    let second_bytes = std::fs::read(store.path(Layer::Gold, GOLD_FILE))?;

    assert_eq!(first, second);
    assert_eq!(first_bytes, second_bytes);
    Ok(())
}

#[test]
fn test_writing_gold_requires_existing_folder() {
    let dir = tempdir().unwrap();
    let config = Config {
        bronze_folder: dir.path().join("b"),
        silver_folder: dir.path().join("s"),
        gold_folder: dir.path().join("missing"),
        statistical_analysis_folder: dir.path().join("a"),
    };
    let store = LayerStore::new(&config);
    assert!(DatasetConsolidator::default().consolidate(&sample(), &store).is_err());
}
