/// Table layer: row types, loading, and writing.
///
/// Architecture:
/// ```text
///  .fcsv (legacy / markups)
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  skip comments → count columns → typed rows
///   └──────────┘
///        │
///        ▼
///   ┌───────────────┐
///   │ FiducialTable │  Legacy(Vec<LegacyRow>) | Extended(Vec<ExtendedRow>)
///   └───────────────┘
///        │  to_format()
///        ▼
///   ┌──────────┐
///   │  writer   │  header block + 3-decimal rows
///   └──────────┘
/// ```

pub mod loader;
pub mod model;
pub mod writer;
