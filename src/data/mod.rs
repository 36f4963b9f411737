/// Data layer: core types, loading, and filtering.
///
/// Architecture:
/// ```text
///  .csv / .json / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse + validate → RecordStore
///   └──────────┘
///        │
///        ▼
///   ┌─────────────┐
///   │ RecordStore  │  Vec<Record>, bounds + distinct values
///   └─────────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  FilterSelection → FilteredView (row indices)
///   └──────────┘
/// ```

pub mod error;
pub mod filter;
pub mod loader;
pub mod model;

pub use error::IngestError;
pub use filter::{apply, FilterSelection, FilteredView};
pub use model::{Floors, NumericRange, Record, RecordStore, StoreSummary};
