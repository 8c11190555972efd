use std::path::PathBuf;

use crate::error::{PipelineError, Result};

pub const BRONZE_FOLDER_VAR: &str = "BRONZE_FOLDER";
pub const SILVER_FOLDER_VAR: &str = "SILVER_FOLDER";
pub const GOLD_FOLDER_VAR: &str = "GOLD_FOLDER";
pub const STATISTICAL_ANALYSIS_FOLDER_VAR: &str = "STATISTICAL_ANALYSIS_FOLDER";

/// Layer folders. Each one can be overridden through its environment variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub bronze_folder: PathBuf,
    pub silver_folder: PathBuf,
    pub gold_folder: PathBuf,
    pub statistical_analysis_folder: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bronze_folder: PathBuf::from("Bronze"),
            silver_folder: PathBuf::from("Silver"),
            gold_folder: PathBuf::from("Gold"),
            statistical_analysis_folder: PathBuf::from("Statistical Analysis"),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Empty values fall back to the defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let folder = |key: &str, default: PathBuf| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
                .unwrap_or(default)
        };

        let config = Self {
            bronze_folder: folder(BRONZE_FOLDER_VAR, defaults.bronze_folder),
            silver_folder: folder(SILVER_FOLDER_VAR, defaults.silver_folder),
            gold_folder: folder(GOLD_FOLDER_VAR, defaults.gold_folder),
            statistical_analysis_folder: folder(
                STATISTICAL_ANALYSIS_FOLDER_VAR,
                defaults.statistical_analysis_folder,
            ),
        };
        config.validate()?;
        Ok(config)
    }

    /// Bronze and silver files share names, so the layers must not share a folder.
    pub fn validate(&self) -> Result<()> {
        let folders = [
            (BRONZE_FOLDER_VAR, &self.bronze_folder),
            (SILVER_FOLDER_VAR, &self.silver_folder),
            (GOLD_FOLDER_VAR, &self.gold_folder),
            (STATISTICAL_ANALYSIS_FOLDER_VAR, &self.statistical_analysis_folder),
        ];
        for (i, (name, path)) in folders.iter().enumerate() {
            if let Some((other, _)) = folders[..i].iter().find(|(_, p)| p == path) {
                return Err(PipelineError::Config(format!(
                    "{} and {} both point to '{}'",
                    other,
                    name,
                    path.display()
                )));
            }
        }
        Ok(())
    }
}
