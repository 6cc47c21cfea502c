/// Data layer: core types, loading, filtering, aggregation and export.
///
/// Architecture:
/// ```text
///  URL / path (.xlsx / .csv / .json / .parquet)
///        │
///        ▼
///   ┌─────────────┐
///   │ SourceCache  │  fetch bytes, keep them for a TTL
///   └─────────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse bytes → RawTable
///   └──────────┘
///        │
///        ▼
///   ┌──────────────┐
///   │ EventDataset  │  validated columns, Vec<EventRecord>
///   └──────────────┘
///        │
///        ▼
///   ┌──────────┐     ┌───────────┐
///   │  filter   │ ──▶ │ aggregate  │  counts, pivots, trend
///   └──────────┘     └───────────┘
/// ```

pub mod aggregate;
pub mod dictionary;
pub mod export;
pub mod fetch;
pub mod filter;
pub mod loader;
pub mod model;
