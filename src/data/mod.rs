/// Data layer: core types, parsing, loading, and filtering.
///
/// Architecture:
/// ```text
///  .csv / .json / http
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  fetch + parse (csv_text / JSON) → RecordSet
///   └──────────┘
///        │
///        ▼
///   ┌──────────────┐
///   │ RecordStore   │  full dataset, replaced wholesale per load
///   └──────────────┘
///        │
///        ▼
///   ┌──────────┐
///   │ Selectors │  region / year / search → fresh filtered RecordSet
///   └──────────┘
/// ```

pub mod csv_text;
pub mod loader;
pub mod model;
pub mod schema;
pub mod store;
