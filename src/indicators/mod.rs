// =============================================================================
// Progressive Indicators Module
// =============================================================================
//
// Every indicator here is a stateless capability object plus an explicit,
// serialisable state value owned by the caller.  One series owns one state;
// the engine never keeps hidden per-series memory.
//
//   initialize(history)      = consume(bar) folded over history from empty
//   consume(bar, &mut state) = exactly one new bar, no look-ahead
//
// A bar whose `open_time` is not strictly after the last consumed one is
// rejected before anything in the state is touched.

pub mod divergence;
pub mod fvg;
pub mod swing;
pub mod zigzag;

use std::collections::BTreeMap;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::market_data::Bar;
use crate::types::LineStyle;

pub use divergence::{DivergenceIndicator, DivergenceKind, DivergenceRecord};
pub use fvg::{FvgIndicator, Gap};
pub use swing::{SwingIndicator, SwingPoint};
pub use zigzag::{ZigZagIndicator, ZigZagPivot};

/// Upper bound on any per-series record list (gaps, pivots, swings).
pub const MAX_RECORDS: usize = 500;

/// Flat mapping of output name to value.
pub type Values = BTreeMap<String, Decimal>;

// =============================================================================
// Output
// =============================================================================

/// Visualisation primitive handed to the presentation layer.
///
/// `provisional` marks geometry that may still move as new bars arrive (the
/// open zigzag leg, a dynamic-mode gap) and must not be treated as final.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Shape {
    Box {
        left: i64,
        right: i64,
        top: Decimal,
        bottom: Decimal,
        bullish: bool,
        provisional: bool,
    },
    Line {
        from_time: i64,
        from_price: Decimal,
        to_time: i64,
        to_price: Decimal,
        style: LineStyle,
        provisional: bool,
    },
    Marker {
        time: i64,
        price: Decimal,
        label: String,
    },
}

/// Result of consuming one bar: the value snapshot after the bar plus any
/// shapes the bar produced (confirmed legs, mitigation lines, markers).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndicatorOutput {
    pub values: Values,
    pub shapes: Vec<Shape>,
}

// =============================================================================
// Parameter declarations
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamKind {
    Percent,
    Integer,
    Boolean,
}

/// One declared configuration option.  Defaults and bounds are published as
/// JSON numbers.
#[derive(Debug, Clone, Serialize)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamKind,
    pub default: serde_json::Value,
    #[serde(
        with = "rust_decimal::serde::float_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub min: Option<Decimal>,
    #[serde(
        with = "rust_decimal::serde::float_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub max: Option<Decimal>,
    pub description: &'static str,
}

/// JSON number for a decimal parameter default.
pub(crate) fn decimal_default(value: Decimal) -> serde_json::Value {
    serde_json::Value::from(value.to_f64())
}

// =============================================================================
// Core trait
// =============================================================================

/// Shared contract of every progressive indicator.
pub trait ProgressiveIndicator: Send + Sync {
    type Config: Serialize + DeserializeOwned + Default + Clone + PartialEq + std::fmt::Debug;
    type State: Serialize + DeserializeOwned + Default + Clone + std::fmt::Debug;

    /// Indicator name as used on the API surface.
    fn name(&self) -> &'static str;

    /// Declared options with defaults and ranges.
    fn parameters(&self) -> Vec<ParamSpec>;

    /// Range-check `config`. Called before any state is touched.
    fn validate(&self, config: &Self::Config) -> Result<()>;

    /// Minimum number of bars before output is meaningful.
    fn required_warmup(&self, config: &Self::Config) -> usize;

    /// Process exactly one new bar, updating `state` in place.
    fn consume(&self, bar: &Bar, config: &Self::Config, state: &mut Self::State)
        -> Result<IndicatorOutput>;

    /// Current values derived from `state`.
    fn values(&self, config: &Self::Config, state: &Self::State) -> Values;

    /// Shapes describing the live picture (open gaps, provisional legs).
    fn shapes(&self, config: &Self::Config, state: &Self::State) -> Vec<Shape>;

    fn last_open_time(&self, state: &Self::State) -> Option<i64>;

    fn bars_seen(&self, state: &Self::State) -> u64;

    /// Replay `history` through [`consume`](Self::consume) from the empty state.
    fn initialize(&self, history: &[Bar], config: &Self::Config) -> Result<Self::State> {
        self.validate(config)?;
        let mut state = Self::State::default();
        for bar in history {
            self.consume(bar, config, &mut state)?;
        }
        Ok(state)
    }
}

// =============================================================================
// Helpers shared by the implementations
// =============================================================================

/// Reject `bar` unless it is strictly newer than `last`.
pub(crate) fn ensure_in_order(last: Option<i64>, bar: &Bar) -> Result<()> {
    match last {
        Some(last) if bar.open_time <= last => Err(EngineError::OutOfOrderInput {
            last,
            got: bar.open_time,
        }),
        _ => Ok(()),
    }
}

pub(crate) fn check_decimal_range(name: &str, value: Decimal, min: Decimal, max: Decimal) -> Result<()> {
    if value < min || value > max {
        return Err(EngineError::invalid_config(
            name,
            format!("{value} outside [{min}, {max}]"),
        ));
    }
    Ok(())
}

pub(crate) fn check_int_range(name: &str, value: usize, min: usize, max: usize) -> Result<()> {
    if value < min || value > max {
        return Err(EngineError::invalid_config(
            name,
            format!("{value} outside [{min}, {max}]"),
        ));
    }
    Ok(())
}

/// Compact per-bar record kept in rolling windows.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BarPoint {
    pub index: u64,
    pub open_time: i64,
    pub close_time: i64,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    /// Volume delta, zero when the bar carries none.
    pub delta: Decimal,
}

impl BarPoint {
    pub fn from_bar(index: u64, bar: &Bar) -> Self {
        Self {
            index,
            open_time: bar.open_time,
            close_time: bar.close_time,
            high: bar.high,
            low: bar.low,
            close: bar.close,
            delta: bar.volume_delta().unwrap_or(Decimal::ZERO),
        }
    }
}

pub(crate) fn insert_value(values: &mut Values, name: &str, value: impl Into<Decimal>) {
    values.insert(name.to_string(), value.into());
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn in_order_accepts_first_and_newer_bars() {
        assert!(ensure_in_order(None, &flat(0, dec!(1))).is_ok());
        assert!(ensure_in_order(Some(0), &flat(1, dec!(1))).is_ok());
    }

    #[test]
    fn in_order_rejects_equal_and_older_bars() {
        let err = ensure_in_order(Some(MINUTE), &flat(1, dec!(1))).unwrap_err();
        assert!(matches!(err, EngineError::OutOfOrderInput { .. }));
        assert!(ensure_in_order(Some(5 * MINUTE), &flat(2, dec!(1))).is_err());
    }

    #[test]
    fn range_checks() {
        assert!(check_decimal_range("deviation", dec!(5), dec!(0.1), dec!(50)).is_ok());
        assert!(check_decimal_range("deviation", dec!(0.05), dec!(0.1), dec!(50)).is_err());
        assert!(check_int_range("depth", 0, 1, 100).is_err());
        assert!(check_int_range("depth", 100, 1, 100).is_ok());
    }

    #[test]
    fn shape_serialises_with_type_tag() {
        let shape = Shape::Marker {
            time: 1,
            price: dec!(2),
            label: "H".into(),
        };
        let json = serde_json::to_value(&shape).unwrap();
        assert_eq!(json["type"], "marker");
    }
}
