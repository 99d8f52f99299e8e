/// Data layer: schema validation, loading, and filtering.
///
/// Architecture:
/// ```text
///  survey .csv
///       │
///       ▼
///  ┌──────────┐
///  │  loader   │  read rows → validate each against the Schema
///  └──────────┘
///       │
///       ▼
///  ┌──────────┐
///  │  Dataset  │  Vec<Arc<Record>>, unique-value index, skipped rows
///  └──────────┘
///       │
///       ▼
///  ┌──────────┐
///  │  filter   │  apply FilterSpec predicates → ordered indices
///  └──────────┘
/// ```
pub mod filter;
pub mod loader;
pub mod model;
pub mod schema;
