use std::collections::HashMap;

use tracing::debug;

use super::normalizers::{IdhmNormalizer, SeriesNormalizer, SourceNormalizer, TerritoryNormalizer};
use super::NormalizeResult;
use crate::error::NormalizeError;
use crate::pipeline::sources::Source;
use crate::table::Table;

/// Source-specific normalization strategies keyed by source identity
pub struct NormalizationRegistry {
    normalizers: HashMap<Source, Box<dyn SourceNormalizer>>,
}

impl NormalizationRegistry {
    /// Registry with every built-in normalizer
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register(Box::new(SeriesNormalizer::gdp()));
        registry.register(Box::new(SeriesNormalizer::current_revenue()));
        registry.register(Box::new(SeriesNormalizer::population()));
        registry.register(Box::new(TerritoryNormalizer));
        registry.register(Box::new(IdhmNormalizer::default()));
        registry
    }

    pub fn empty() -> Self {
        Self {
            normalizers: HashMap::new(),
        }
    }

    /// Replaces any normalizer already registered for the same source
    pub fn register(&mut self, normalizer: Box<dyn SourceNormalizer>) {
        self.normalizers.insert(normalizer.source(), normalizer);
    }

    pub fn get_normalizer(&self, source: Source) -> Option<&dyn SourceNormalizer> {
        self.normalizers.get(&source).map(|n| n.as_ref())
    }

    pub fn normalize(&self, source: Source, raw: Table) -> NormalizeResult {
        match self.get_normalizer(source) {
            Some(normalizer) => {
                debug!(source = %source, normalizer = normalizer.name(), "Normalizing {} raw rows", raw.len());
                normalizer.normalize(raw)
            }
            None => Err(NormalizeError::UnknownSource(source.to_string())),
        }
    }

    /// Registered sources, sorted
    pub fn list_sources(&self) -> Vec<Source> {
        let mut sources: Vec<Source> = self.normalizers.keys().copied().collect();
        sources.sort();
        sources
    }
}

impl Default for NormalizationRegistry {
    fn default() -> Self {
        Self::new()
    }
}
