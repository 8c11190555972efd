use std::fs;
use std::path::Path;

use anyhow::Result;
use tempfile::tempdir;

use ipea_etl::app::ports::{ScriptRuntime, StatisticalApi};
use ipea_etl::config::Config;
use ipea_etl::constants::*;
use ipea_etl::error::FetchError;
use ipea_etl::pipeline::ingestion::SourceFetcher;
use ipea_etl::pipeline::processing::consolidate::{DataStatus, DatasetConsolidator};
use ipea_etl::pipeline::sources::{default_plan, Source, SourceSpec};
use ipea_etl::pipeline::{Pipeline, SourceOutcome};
use ipea_etl::storage::{Layer, LayerStore};
use ipea_etl::table::{Cell, Table};

/// Serves a small fixed slice of the IPEA catalogue.
struct FakeIpea;

fn series(unit: &str, rows: &[(&str, &str, f64)]) -> Table {
    let value_column = format!("{} ({})", TS_VALUE_PREFIX, unit);
    let mut table = Table::new([TS_CODE, TS_RAW_DATE, TS_YEAR, TS_LEVEL, TS_TERRITORY, value_column.as_str()]).unwrap();
    for (level, code, value) in rows {
        table
            .push_row(vec![
                Cell::text("X"),
                Cell::text("2010-01-01T00:00:00-02:00"),
                Cell::Int(2010),
                Cell::text(*level),
                Cell::text(*code),
                Cell::Float(*value),
            ])
            .unwrap();
    }
    table
}

impl StatisticalApi for FakeIpea {
    fn timeseries(&self, code: &str, _year: Option<i32>) -> Result<Table, FetchError> {
        match code {
            GDP_SERIES => Ok(series(
                "R$ (mil)",
                &[
                    ("Municípios", "3550308", 500000.0),
                    ("Municípios", "1100015", 1234.567),
                    ("Estados", "35", 999.0),
                ],
            )),
            REVENUE_SERIES => Ok(series("R$", &[("Municípios", "3550308", 50000000.0)])),
            POPULATION_SERIES => Ok(series(
                "Habitante",
                &[("Municípios", "3550308", 11253503.0), ("Municípios", "1100015", 24392.0)],
            )),
            _ => Err(FetchError::EmptySeries { code: code.to_string() }),
        }
    }

    fn territories(&self) -> Result<Table, FetchError> {
        let mut table = Table::new([TERR_NAME, TERR_ID, TERR_LEVEL, TERR_AREA, TERR_CAPITAL]).unwrap();
        for (name, id, level) in [
            ("São Paulo", "3550308", "Municípios"),
            ("Alta Floresta D'Oeste", "1100015", "Municípios"),
            ("São Paulo", "35", "Estados"),
        ] {
            table
                .push_row(vec![Cell::text(name), Cell::text(id), Cell::text(level), Cell::Null, Cell::Null])
                .unwrap();
        }
        Ok(table)
    }
}

/// Emits what the IDHM script prints: dates as days since the epoch.
struct FakeR;

impl ScriptRuntime for FakeR {
    fn run_table(&self, _script: &str) -> Result<Table, FetchError> {
        let mut table = Table::new([R_CODE, R_GEOGRAPHY, R_TERRITORY, R_DATE, R_VALUE]).unwrap();
        for (geo, tcode, days, value) in [
            ("Municipality", 3550308, 14610, 0.805),
            ("Municipality", 3550308, 7305, 0.733),
            ("State", 35, 14610, 0.783),
        ] {
            table
                .push_row(vec![
                    Cell::text("ADH_IDHM"),
                    Cell::text(geo),
                    Cell::Int(tcode),
                    Cell::Int(days),
                    Cell::Float(value),
                ])
                .unwrap();
        }
        Ok(table)
    }
}

/// A runtime without R installed.
struct MissingR;

impl ScriptRuntime for MissingR {
    fn run_table(&self, _script: &str) -> Result<Table, FetchError> {
        Err(FetchError::Script {
            status: "exit status: 127".to_string(),
            stderr: "Rscript: command not found".to_string(),
        })
    }
}

fn store_in(root: &Path) -> Result<LayerStore> {
    let config = Config {
        bronze_folder: root.join("Bronze"),
        silver_folder: root.join("Silver"),
        gold_folder: root.join("Gold"),
        statistical_analysis_folder: root.join("Statistical Analysis"),
    };
    let store = LayerStore::new(&config);
    store.ensure_dirs()?;
    Ok(store)
}

#[test]
fn test_full_run_writes_every_layer() -> Result<()> {
    let dir = tempdir()?;
    let store = store_in(dir.path())?;
    let pipeline = Pipeline::new(SourceFetcher::new(Box::new(FakeIpea), Box::new(FakeR)), store.clone());

    let report = pipeline.run(&default_plan())?;
    assert_eq!(report.normalized_count(), 5);

    for spec in default_plan() {
        assert!(store.path(Layer::Bronze, &spec.filename).exists(), "bronze {}", spec.filename);
        assert!(store.path(Layer::Silver, &spec.filename).exists(), "silver {}", spec.filename);
    }
    assert!(store.path(Layer::Gold, GOLD_FILE).exists());

    let gold = report.gold.expect("gold table");
    // GDP anchors the join; the state-level row is filtered out
    assert_eq!(gold.len(), 2);

    let alta_floresta = &gold.records()[0];
    assert_eq!(alta_floresta.cod_mun_ibge, "1100015");
    assert_eq!(alta_floresta.pib, Some(1234567.0));
    assert_eq!(alta_floresta.idhm, None);
    assert_eq!(alta_floresta.carga_tributaria, 0.0);
    assert_eq!(alta_floresta.data_status, DataStatus::Incomplete);

    let sao_paulo = &gold.records()[1];
    assert_eq!(sao_paulo.municipio.as_deref(), Some("São Paulo"));
    assert_eq!(sao_paulo.habitantes, Some(11253503));
    assert_eq!(sao_paulo.idhm, Some(0.805));
    assert_eq!(sao_paulo.pib, Some(500000000.0));
    assert_eq!(sao_paulo.carga_tributaria, 0.1);
    assert_eq!(sao_paulo.data_status, DataStatus::Complete);
    Ok(())
}

#[test]
fn test_missing_series_is_skipped_not_fatal() -> Result<()> {
    let dir = tempdir()?;
    let store = store_in(dir.path())?;
    let pipeline = Pipeline::new(SourceFetcher::new(Box::new(FakeIpea), Box::new(MissingR)), store.clone());

    let plan = vec![
        SourceSpec::series(Source::Gdp, GDP_SERIES, Some(REFERENCE_YEAR), GDP_FILE),
        SourceSpec::series(Source::CurrentRevenue, "NO_SUCH_SERIES", Some(REFERENCE_YEAR), REVENUE_FILE),
        SourceSpec::script(Source::Idhm, IDHM_SCRIPT, IDHM_FILE),
    ];
    let report = pipeline.run(&plan)?;

    assert!(matches!(report.sources[1].outcome, SourceOutcome::SkippedAtFetch { .. }));
    assert!(matches!(report.sources[2].outcome, SourceOutcome::SkippedAtFetch { .. }));
    assert!(!store.path(Layer::Bronze, REVENUE_FILE).exists());

    let gold = report.gold.expect("gold table");
    assert!(gold.records().iter().all(|r| r.receitas_correntes.is_none()));
    assert!(gold.records().iter().all(|r| r.carga_tributaria == 0.0));
    assert_eq!(gold.count_with_status(DataStatus::Incomplete), gold.len());
    Ok(())
}

#[test]
fn test_unexpected_schema_is_skipped_at_normalize() -> Result<()> {
    struct Reshaped;
    impl StatisticalApi for Reshaped {
        fn timeseries(&self, _code: &str, _year: Option<i32>) -> Result<Table, FetchError> {
            Ok(Table::new(["SOMETHING", "ELSE"])?)
        }
        fn territories(&self) -> Result<Table, FetchError> {
            FakeIpea.territories()
        }
    }

    let dir = tempdir()?;
    let store = store_in(dir.path())?;
    let pipeline = Pipeline::new(SourceFetcher::new(Box::new(Reshaped), Box::new(MissingR)), store.clone());
    let plan = vec![
        SourceSpec::territories(TERRITORIES_FILE),
        SourceSpec::series(Source::Gdp, GDP_SERIES, Some(REFERENCE_YEAR), GDP_FILE),
    ];
    let report = pipeline.run(&plan)?;

    assert!(matches!(report.sources[1].outcome, SourceOutcome::SkippedAtNormalize { .. }));
    // The raw table still lands in bronze
    assert!(store.path(Layer::Bronze, GDP_FILE).exists());
    assert!(!store.path(Layer::Silver, GDP_FILE).exists());
    assert_eq!(report.gold.map(|g| g.len()), Some(2));
    Ok(())
}

#[test]
fn test_no_surviving_source_writes_no_gold() -> Result<()> {
    struct Down;
    impl StatisticalApi for Down {
        fn timeseries(&self, code: &str, _year: Option<i32>) -> Result<Table, FetchError> {
            Err(FetchError::EmptySeries { code: code.to_string() })
        }
        fn territories(&self) -> Result<Table, FetchError> {
            Err(FetchError::Api { message: "503 Service Unavailable".to_string() })
        }
    }

    let dir = tempdir()?;
    let store = store_in(dir.path())?;
    let pipeline = Pipeline::new(SourceFetcher::new(Box::new(Down), Box::new(MissingR)), store.clone());
    let report = pipeline.run(&default_plan())?;

    assert_eq!(report.normalized_count(), 0);
    assert_eq!(report.skipped().count(), 5);
    assert!(report.gold.is_none());
    assert!(!store.path(Layer::Gold, GOLD_FILE).exists());
    Ok(())
}

#[test]
fn test_rebuild_from_silver_is_byte_identical() -> Result<()> {
    let dir = tempdir()?;
    let store = store_in(dir.path())?;
    let pipeline = Pipeline::new(SourceFetcher::new(Box::new(FakeIpea), Box::new(FakeR)), store.clone());
    let report = pipeline.run(&default_plan())?;
    let first = fs::read(store.path(Layer::Gold, GOLD_FILE))?;

    let rebuilt = DatasetConsolidator::default()
        .rebuild_from_silver(&default_plan(), &store)?
        .expect("gold table");
    let second = fs::read(store.path(Layer::Gold, GOLD_FILE))?;

    assert_eq!(Some(&rebuilt), report.gold.as_ref());
    assert_eq!(first, second);
    Ok(())
}

#[test]
fn test_rebuild_skips_missing_silver_files() -> Result<()> {
    let dir = tempdir()?;
    let store = store_in(dir.path())?;
    assert!(DatasetConsolidator::default()
        .rebuild_from_silver(&default_plan(), &store)?
        .is_none());
    Ok(())
}

#[test]
fn test_custom_gold_filename() -> Result<()> {
    let dir = tempdir()?;
    let store = store_in(dir.path())?;
    let pipeline = Pipeline::new(SourceFetcher::new(Box::new(FakeIpea), Box::new(FakeR)), store.clone())
        .with_consolidator(DatasetConsolidator::new("Gold_2010.csv"));

    pipeline.run(&default_plan())?;
    assert!(store.path(Layer::Gold, "Gold_2010.csv").exists());
    assert!(!store.path(Layer::Gold, GOLD_FILE).exists());
    Ok(())
}

#[test]
fn test_rebuild_skips_malformed_silver_file() -> Result<()> {
    let dir = tempdir()?;
    let store = store_in(dir.path())?;
    fs::write(
        store.path(Layer::Silver, GDP_FILE),
        "CodMunIBGE,PIB (R$)\n3550308,500000000.0,extra\n",
    )?;
    fs::write(
        store.path(Layer::Silver, POPULATION_FILE),
        "CodMunIBGE,Habitantes\n3550308,11253503\n1100015,24392\n",
    )?;

    let gold = DatasetConsolidator::default()
        .rebuild_from_silver(&default_plan(), &store)?
        .expect("gold table");

    assert_eq!(gold.len(), 2);
    assert!(gold.records().iter().all(|r| r.pib.is_none()));
    assert_eq!(gold.records()[1].habitantes, Some(11253503));
    Ok(())
}
