pub mod bar;
pub mod series_store;

// Re-export the Bar struct for convenient access (e.g. `use crate::market_data::Bar`).
pub use bar::{Bar, SeriesKey};
pub use series_store::{IndicatorReport, SeriesSnapshot, SeriesStore};
