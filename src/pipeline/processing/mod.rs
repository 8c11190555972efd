// Pipeline processing: per-source normalization and consolidation

pub mod consolidate;
pub mod normalize;
