/// Canonical column names shared across the silver and gold layers

pub const COD_MUN_IBGE: &str = "CodMunIBGE";
pub const MUNICIPIO: &str = "Município";
pub const HABITANTES: &str = "Habitantes";
pub const IDHM: &str = "IDHM";
pub const RECEITAS_CORRENTES: &str = "Receitas Correntes (R$)";
pub const PIB: &str = "PIB (R$)";
pub const CARGA_TRIBUTARIA: &str = "Carga Tributária";
pub const DATA_STATUS: &str = "data_status";

/// Gold column order. Anything else produced by the joins is dropped.
pub const GOLD_COLUMNS: [&str; 8] = [
    COD_MUN_IBGE,
    MUNICIPIO,
    HABITANTES,
    IDHM,
    RECEITAS_CORRENTES,
    PIB,
    CARGA_TRIBUTARIA,
    DATA_STATUS,
];

// Upstream labels
pub const LEVEL_MUNICIPIOS: &str = "Municípios";
pub const GEOGRAPHY_MUNICIPALITY: &str = "Municipality";

// Timeseries columns as delivered to the bronze layer
pub const TS_CODE: &str = "CODE";
pub const TS_RAW_DATE: &str = "RAW DATE";
pub const TS_YEAR: &str = "YEAR";
pub const TS_LEVEL: &str = "NIVNOME";
pub const TS_TERRITORY: &str = "TERCODIGO";
pub const TS_VALUE_PREFIX: &str = "VALUE";

// Territory registry columns
pub const TERR_NAME: &str = "NAME";
pub const TERR_ID: &str = "ID";
pub const TERR_LEVEL: &str = "LEVEL";
pub const TERR_AREA: &str = "AREA";
pub const TERR_CAPITAL: &str = "CAPITAL";

// ipeadatar columns
pub const R_CODE: &str = "code";
pub const R_GEOGRAPHY: &str = "uname";
pub const R_TERRITORY: &str = "tcode";
pub const R_DATE: &str = "date";
pub const R_VALUE: &str = "value";

// Series and files
pub const REFERENCE_YEAR: i32 = 2010;
pub const GDP_SERIES: &str = "PIB_IBGE_5938_37";
pub const REVENUE_SERIES: &str = "RECORRM";
pub const POPULATION_SERIES: &str = "POPTOT";

pub const GDP_FILE: &str = "PIB_2010.csv";
pub const REVENUE_FILE: &str = "RecCorr_2010.csv";
pub const POPULATION_FILE: &str = "População_2010.csv";
pub const TERRITORIES_FILE: &str = "Municípios.csv";
pub const IDHM_FILE: &str = "IDHM_2010.csv";
pub const GOLD_FILE: &str = "CleanData.csv";

pub const DESCRIPTIVE_STATS_FILE: &str = "Descriptive Statistics Initial Analysis.csv";
pub const CORRELATION_FILE: &str = "Correlation Matrix.csv";

/// R script for the IDHM series, which only ipeadatar exposes.
/// Dates are emitted as days since the epoch and decoded on our side.
/// The CSV goes to the file named by `IPEA_ETL_OUTPUT`, never stdout.
pub const IDHM_SCRIPT: &str = r#"
if (!requireNamespace('ipeadatar', quietly = TRUE)) {
    install.packages('ipeadatar', repos = 'http://cran.r-project.org', quiet = TRUE)
}
suppressPackageStartupMessages(library(ipeadatar))
data_IDHM <- ipeadatar::ipeadata(code = 'ADH_IDHM', quiet = TRUE)
data_IDHM$date <- as.numeric(data_IDHM$date)
write.csv(data_IDHM, Sys.getenv('IPEA_ETL_OUTPUT'), row.names = FALSE)
"#;
