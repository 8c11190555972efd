use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument};

use crate::config::Config;
use crate::error::{PipelineError, Result};
use crate::table::Table;

/// Medallion storage tiers, plus the folder for analysis outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Layer {
    Bronze,
    Silver,
    Gold,
    Analysis,
}

impl Layer {
    pub fn as_str(&self) -> &'static str {
        match self {
            Layer::Bronze => "bronze",
            Layer::Silver => "silver",
            Layer::Gold => "gold",
            Layer::Analysis => "analysis",
        }
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A file written by [`LayerStore::save`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub path: PathBuf,
    pub rows: usize,
    /// Hex SHA-256 of the file contents.
    pub sha256: String,
}

/// Writes whole tables to `<layer folder>/<filename>` as CSV.
///
/// Missing folders are not created here; `ensure_dirs` exists for the
/// binary's bootstrap step.
#[derive(Debug, Clone)]
pub struct LayerStore {
    bronze: PathBuf,
    silver: PathBuf,
    gold: PathBuf,
    analysis: PathBuf,
}

impl LayerStore {
    pub fn new(config: &Config) -> Self {
        Self {
            bronze: config.bronze_folder.clone(),
            silver: config.silver_folder.clone(),
            gold: config.gold_folder.clone(),
            analysis: config.statistical_analysis_folder.clone(),
        }
    }

    pub fn dir(&self, layer: Layer) -> &Path {
        match layer {
            Layer::Bronze => &self.bronze,
            Layer::Silver => &self.silver,
            Layer::Gold => &self.gold,
            Layer::Analysis => &self.analysis,
        }
    }

    pub fn path(&self, layer: Layer, filename: &str) -> PathBuf {
        self.dir(layer).join(filename)
    }

    pub fn ensure_dirs(&self) -> Result<()> {
        for layer in [Layer::Bronze, Layer::Silver, Layer::Gold, Layer::Analysis] {
            let dir = self.dir(layer);
            fs::create_dir_all(dir).map_err(|source| PipelineError::Io {
                path: dir.display().to_string(),
                source,
            })?;
        }
        Ok(())
    }

    /// Overwrites any existing file.
    #[instrument(skip(self, table), fields(layer = %layer, rows = table.len()))]
    pub fn save(&self, table: &Table, layer: Layer, filename: &str) -> Result<StoredFile> {
        let path = self.path(layer, filename);

        let mut buf = Vec::new();
        table.write_csv(&mut buf).map_err(|source| PipelineError::Csv {
            path: path.display().to_string(),
            source,
        })?;
        let sha256 = hex::encode(Sha256::digest(&buf));

        fs::write(&path, &buf).map_err(|source| PipelineError::Io {
            path: path.display().to_string(),
            source,
        })?;

        info!(path = %path.display(), sha256 = %sha256, "💾 Saved {} rows", table.len());
        Ok(StoredFile {
            path,
            rows: table.len(),
            sha256,
        })
    }

    /// `None` when the file does not exist.
    pub fn load(&self, layer: Layer, filename: &str) -> Result<Option<Table>> {
        let path = self.path(layer, filename);
        let file = match fs::File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No file in {} layer", layer);
                return Ok(None);
            }
            Err(source) => {
                return Err(PipelineError::Io {
                    path: path.display().to_string(),
                    source,
                })
            }
        };
        let table = Table::read_csv(file).map_err(|source| PipelineError::Csv {
            path: path.display().to_string(),
            source,
        })?;
        Ok(Some(table))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Cell;
    use tempfile::tempdir;

    fn store_in(root: &Path) -> LayerStore {
        LayerStore::new(&Config {
            bronze_folder: root.join("Bronze"),
            silver_folder: root.join("Silver"),
            gold_folder: root.join("Gold"),
            statistical_analysis_folder: root.join("Statistical Analysis"),
        })
    }

    fn table() -> Table {
        let mut t = Table::new(["CodMunIBGE", "IDHM"]).unwrap();
        t.push_row(vec![Cell::text("1100015"), Cell::Float(0.641)]).unwrap();
        t
    }

    #[test]
    fn test_save_overwrites_and_reports_digest() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());
        store.ensure_dirs().unwrap();

        let first = store.save(&table(), Layer::Silver, "IDHM_2010.csv").unwrap();
        let second = store.save(&table(), Layer::Silver, "IDHM_2010.csv").unwrap();
        assert_eq!(first, second);
        assert_eq!(first.sha256.len(), 64);

        let mut bigger = table();
        bigger.push_row(vec![Cell::text("1100023"), Cell::Float(0.702)]).unwrap();
        let third = store.save(&bigger, Layer::Silver, "IDHM_2010.csv").unwrap();
        assert_ne!(third.sha256, first.sha256);

        let loaded = store.load(Layer::Silver, "IDHM_2010.csv").unwrap().unwrap();
        assert_eq!(loaded.len(), 2);
    }

    #[test]
    fn test_save_does_not_create_missing_folders() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());

        let err = store.save(&table(), Layer::Gold, "CleanData.csv").unwrap_err();
        assert!(matches!(err, PipelineError::Io { .. }));
        assert!(!dir.path().join("Gold").exists());
    }

    #[test]
    fn test_load_missing_file_is_none() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());
        store.ensure_dirs().unwrap();
        assert!(store.load(Layer::Bronze, "PIB_2010.csv").unwrap().is_none());
    }
}
