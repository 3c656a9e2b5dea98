//! School statistics: load CSV/JSON school datasets, filter them by region,
//! year and name, and aggregate them into chart-ready structures.

pub mod config;
pub mod data;
pub mod engine;
pub mod error;
pub mod state;

pub use config::Config;
pub use data::loader::{load_source, DataSource, Format, Loader};
pub use data::model::{FieldValue, Record, RecordSet};
pub use data::store::{RecordStore, Selectors};
pub use engine::results::AggregationResult;
pub use engine::sections::DashboardReport;
pub use engine::Engine;
pub use error::{LoadError, ParseError};
pub use state::Session;
