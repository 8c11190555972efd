//! Sequential bronze → silver → gold pipeline.
//!
//! Each source is fetched and normalized to completion before the next one
//! starts. A source that fails either stage is left out of consolidation;
//! only persistence and consolidation errors stop the run.

pub mod ingestion;
pub mod processing;
pub mod sources;

use std::fmt;

use metrics::counter;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::error::Result;
use crate::storage::LayerStore;
use ingestion::SourceFetcher;
use processing::consolidate::{ConsolidatedTable, DatasetConsolidator};
use processing::normalize::{FieldNormalizer, NormalizedTable};
use sources::{Source, SourceSpec};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceOutcome {
    Normalized { rows: usize },
    SkippedAtFetch { reason: String },
    SkippedAtNormalize { reason: String },
}

impl SourceOutcome {
    pub fn is_normalized(&self) -> bool {
        matches!(self, SourceOutcome::Normalized { .. })
    }
}

impl fmt::Display for SourceOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceOutcome::Normalized { rows } => write!(f, "normalized ({} rows)", rows),
            SourceOutcome::SkippedAtFetch { reason } => write!(f, "skipped at fetch: {}", reason),
            SourceOutcome::SkippedAtNormalize { reason } => write!(f, "skipped at normalize: {}", reason),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SourceReport {
    pub source: Source,
    pub filename: String,
    pub outcome: SourceOutcome,
}

/// What one run produced. `gold` is `None` when no source survived.
#[derive(Debug)]
pub struct PipelineReport {
    pub run_id: Uuid,
    pub sources: Vec<SourceReport>,
    pub gold: Option<ConsolidatedTable>,
}

impl PipelineReport {
    pub fn normalized_count(&self) -> usize {
        self.sources.iter().filter(|s| s.outcome.is_normalized()).count()
    }

    pub fn skipped(&self) -> impl Iterator<Item = &SourceReport> {
        self.sources.iter().filter(|s| !s.outcome.is_normalized())
    }
}

pub struct Pipeline {
    fetcher: SourceFetcher,
    normalizer: FieldNormalizer,
    consolidator: DatasetConsolidator,
    store: LayerStore,
}

impl Pipeline {
    pub fn new(fetcher: SourceFetcher, store: LayerStore) -> Self {
        Self {
            fetcher,
            normalizer: FieldNormalizer::default(),
            consolidator: DatasetConsolidator::default(),
            store,
        }
    }

    pub fn with_consolidator(mut self, consolidator: DatasetConsolidator) -> Self {
        self.consolidator = consolidator;
        self
    }

    pub fn store(&self) -> &LayerStore {
        &self.store
    }

    /// Runs every source in plan order, then consolidates whatever survived.
    #[instrument(skip(self, plan), fields(run_id = tracing::field::Empty))]
    pub fn run(&self, plan: &[SourceSpec]) -> Result<PipelineReport> {
        let run_id = Uuid::new_v4();
        tracing::Span::current().record("run_id", tracing::field::display(run_id));
        info!("🚀 Starting pipeline run with {} sources", plan.len());
        counter!("ipea_pipeline_runs_total").increment(1);

        let mut tables: Vec<NormalizedTable> = Vec::with_capacity(plan.len());
        let mut reports = Vec::with_capacity(plan.len());

        for spec in plan {
            let outcome = match self.process_source(spec)? {
                Ok(table) => {
                    let outcome = SourceOutcome::Normalized { rows: table.len() };
                    tables.push(table);
                    outcome
                }
                Err(outcome) => outcome,
            };
            reports.push(SourceReport {
                source: spec.source,
                filename: spec.filename.clone(),
                outcome,
            });
        }

        let gold = if tables.is_empty() {
            warn!("No source produced a normalized table; skipping consolidation");
            None
        } else {
            Some(self.consolidator.consolidate(&tables, &self.store)?)
        };

        info!(
            normalized = tables.len(),
            skipped = plan.len() - tables.len(),
            "🏁 Pipeline run finished"
        );
        Ok(PipelineReport {
            run_id,
            sources: reports,
            gold,
        })
    }

    /// Fetch then normalize one source. The inner `Err` carries the skip
    /// outcome; the outer one is a persistence failure.
    fn process_source(&self, spec: &SourceSpec) -> Result<std::result::Result<NormalizedTable, SourceOutcome>> {
        let raw = match self.fetcher.fetch(spec, &self.store)? {
            Ok(raw) => raw,
            Err(e) => {
                counter!("ipea_sources_skipped_total", "stage" => "fetch").increment(1);
                return Ok(Err(SourceOutcome::SkippedAtFetch { reason: e.to_string() }));
            }
        };
        match self.normalizer.normalize(spec, raw, &self.store)? {
            Ok(table) => Ok(Ok(table)),
            Err(e) => {
                counter!("ipea_sources_skipped_total", "stage" => "normalize").increment(1);
                Ok(Err(SourceOutcome::SkippedAtNormalize { reason: e.to_string() }))
            }
        }
    }
}
