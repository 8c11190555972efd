// Base trait and shared helpers for source-specific normalizers
pub mod base;

// Individual normalizer implementations
pub mod idhm;
pub mod series;
pub mod territories;

pub use base::SourceNormalizer;
pub use idhm::IdhmNormalizer;
pub use series::SeriesNormalizer;
pub use territories::TerritoryNormalizer;
