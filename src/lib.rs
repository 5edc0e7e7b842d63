// =============================================================================
// Aurora TA — progressive technical-analysis engine
// =============================================================================
//
// Incremental swing, zigzag, fair value gap and divergence indicators over
// closed OHLC bars, with caller-owned serialisable state per series and an
// HTTP service in front of them.
// =============================================================================

pub mod api;
pub mod app_state;
pub mod engine;
pub mod error;
pub mod indicators;
pub mod market_data;
pub mod numeric;
pub mod runtime_config;
pub mod types;

pub use engine::{calculate, calculate_progressive, IndicatorKind, ProgressiveResult, ProgressiveState};
pub use error::{EngineError, Result};
pub use market_data::{Bar, SeriesKey};
