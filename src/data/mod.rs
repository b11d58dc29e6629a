/// Data layer: core types and loading.
///
/// Architecture:
/// ```text
///  .parquet / .json / .csv
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → CandidateTable
///   └──────────┘
///        │
///        ▼
///   ┌───────────────┐
///   │ CandidateTable │  Vec<CandidateRecord>, column index
///   └───────────────┘
///        │
///        ▼
///   feature engineering + alignment (see crate::features)
/// ```

pub mod loader;
pub mod model;
