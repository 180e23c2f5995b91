/// Data layer: core types, loading, and filter selection.
///
/// Architecture:
/// ```text
///  clicks.csv / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse + validate header and rows → ClickTable
///   └──────────┘
///        │
///        ▼
///   ┌────────────┐
///   │ ClickTable  │  Vec<ClickRecord>, fixed column schema
///   └────────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  FilterSelection + ranges → validated request
///   └──────────┘
/// ```

pub mod codes;
pub mod filter;
pub mod loader;
pub mod model;
