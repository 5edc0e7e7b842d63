// =============================================================================
// Swing / Pivot Detector — symmetric-window local extrema
// =============================================================================
//
// Index i is a swing HIGH when, over the window [i - L, i + L]:
//   value[i] >  value[j]  for every j on the left
//   value[i] >= value[j]  for every j on the right
// and a swing LOW symmetrically.  The asymmetric comparison means a flat run
// of equal extremes marks only its first index.
//
// Only indices with a full window on both sides qualify, so a series shorter
// than 2L + 1 has no swings.  The progressive form keeps exactly 2L + 1 bars
// and evaluates the centre bar each time the window fills.
// =============================================================================

use std::collections::VecDeque;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{
    check_int_range, ensure_in_order, insert_value, BarPoint, IndicatorOutput, ParamKind,
    ParamSpec, ProgressiveIndicator, Shape, Values, MAX_RECORDS,
};
use crate::error::Result;
use crate::market_data::Bar;
use crate::types::PivotKind;

// =============================================================================
// Types
// =============================================================================

/// One sample of a numeric series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub index: u64,
    pub value: Decimal,
    pub timestamp: i64,
}

/// A confirmed local extremum. Never mutated after creation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SwingPoint {
    pub index: u64,
    pub value: Decimal,
    pub kind: PivotKind,
    pub timestamp: i64,
}

// =============================================================================
// Pure scan
// =============================================================================

fn is_extreme(value_at: &impl Fn(usize) -> Decimal, i: usize, lookback: usize, kind: PivotKind) -> bool {
    let v = value_at(i);
    let beats = |other: Decimal, strict: bool| match (kind, strict) {
        (PivotKind::High, true) => v > other,
        (PivotKind::High, false) => v >= other,
        (PivotKind::Low, true) => v < other,
        (PivotKind::Low, false) => v <= other,
    };
    (1..=lookback).all(|k| beats(value_at(i - k), true) && beats(value_at(i + k), false))
}

/// Indices of `kind` extrema over a series of length `len`.
fn scan(len: usize, lookback: usize, value_at: impl Fn(usize) -> Decimal, kind: PivotKind) -> Vec<usize> {
    if lookback == 0 || len < 2 * lookback + 1 {
        return Vec::new();
    }
    (lookback..len - lookback)
        .filter(|&i| is_extreme(&value_at, i, lookback, kind))
        .collect()
}

/// Detect swing highs and lows over a single series, in index order.
pub fn detect_swings(series: &[SeriesPoint], lookback: usize) -> Vec<SwingPoint> {
    let value_at = |i: usize| series[i].value;
    let mut out: Vec<SwingPoint> = scan(series.len(), lookback, value_at, PivotKind::High)
        .into_iter()
        .map(|i| swing_at(&series[i], PivotKind::High))
        .chain(
            scan(series.len(), lookback, value_at, PivotKind::Low)
                .into_iter()
                .map(|i| swing_at(&series[i], PivotKind::Low)),
        )
        .collect();
    out.sort_by_key(|s| s.index);
    out
}

fn swing_at(p: &SeriesPoint, kind: PivotKind) -> SwingPoint {
    SwingPoint {
        index: p.index,
        value: p.value,
        kind,
        timestamp: p.timestamp,
    }
}

/// Price swings: highs scanned over bar highs, lows over bar lows.
///
/// An outside bar may be both; the High is listed first.
pub fn detect_price_swings(bars: &[BarPoint], lookback: usize) -> Vec<SwingPoint> {
    let highs = scan(bars.len(), lookback, |i| bars[i].high, PivotKind::High);
    let lows = scan(bars.len(), lookback, |i| bars[i].low, PivotKind::Low);

    let mut out: Vec<SwingPoint> = highs
        .into_iter()
        .map(|i| SwingPoint {
            index: bars[i].index,
            value: bars[i].high,
            kind: PivotKind::High,
            timestamp: bars[i].open_time,
        })
        .chain(lows.into_iter().map(|i| SwingPoint {
            index: bars[i].index,
            value: bars[i].low,
            kind: PivotKind::Low,
            timestamp: bars[i].open_time,
        }))
        .collect();
    // Stable sort keeps High before Low on the same bar.
    out.sort_by_key(|s| s.index);
    out
}

/// Volume-delta series of a bar window.
pub fn delta_series(bars: &[BarPoint]) -> Vec<SeriesPoint> {
    bars.iter()
        .map(|b| SeriesPoint {
            index: b.index,
            value: b.delta,
            timestamp: b.open_time,
        })
        .collect()
}

// =============================================================================
// Progressive form
// =============================================================================

fn default_lookback() -> usize {
    5
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SwingConfig {
    #[serde(default = "default_lookback")]
    pub lookback: usize,
}

impl Default for SwingConfig {
    fn default() -> Self {
        Self {
            lookback: default_lookback(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SwingState {
    window: VecDeque<BarPoint>,
    swings: VecDeque<SwingPoint>,
    last_high: Option<SwingPoint>,
    last_low: Option<SwingPoint>,
    swing_count: u64,
    bars_seen: u64,
    last_open_time: Option<i64>,
}

impl SwingState {
    /// Retained swings, oldest first.
    pub fn swings(&self) -> impl Iterator<Item = &SwingPoint> {
        self.swings.iter()
    }
}

/// Progressive swing detector over bar highs and lows.
pub struct SwingIndicator;

impl ProgressiveIndicator for SwingIndicator {
    type Config = SwingConfig;
    type State = SwingState;

    fn name(&self) -> &'static str {
        "swing"
    }

    fn parameters(&self) -> Vec<ParamSpec> {
        vec![ParamSpec {
            name: "lookback",
            kind: ParamKind::Integer,
            default: serde_json::json!(default_lookback()),
            min: Some(Decimal::ONE),
            max: Some(Decimal::from(100)),
            description: "Bars required on each side of a swing",
        }]
    }

    fn validate(&self, config: &SwingConfig) -> Result<()> {
        check_int_range("lookback", config.lookback, 1, 100)
    }

    fn required_warmup(&self, config: &SwingConfig) -> usize {
        2 * config.lookback + 1
    }

    fn consume(&self, bar: &Bar, config: &SwingConfig, state: &mut SwingState) -> Result<IndicatorOutput> {
        self.validate(config)?;
        ensure_in_order(state.last_open_time, bar)?;

        let span = 2 * config.lookback + 1;
        state.window.push_back(BarPoint::from_bar(state.bars_seen, bar));
        while state.window.len() > span {
            state.window.pop_front();
        }
        state.bars_seen += 1;
        state.last_open_time = Some(bar.open_time);

        let mut shapes = Vec::new();
        if state.window.len() == span {
            let window: Vec<BarPoint> = state.window.iter().copied().collect();
            for swing in detect_price_swings(&window, config.lookback) {
                debug!(index = swing.index, kind = %swing.kind, value = %swing.value, "swing confirmed");
                shapes.push(Shape::Marker {
                    time: swing.timestamp,
                    price: swing.value,
                    label: swing.kind.to_string(),
                });
                match swing.kind {
                    PivotKind::High => state.last_high = Some(swing),
                    PivotKind::Low => state.last_low = Some(swing),
                }
                state.swings.push_back(swing);
                state.swing_count += 1;
            }
            while state.swings.len() > MAX_RECORDS {
                state.swings.pop_front();
            }
        }

        Ok(IndicatorOutput {
            values: self.values(config, state),
            shapes,
        })
    }

    fn values(&self, _config: &SwingConfig, state: &SwingState) -> Values {
        let mut values = Values::new();
        if let Some(h) = state.last_high {
            insert_value(&mut values, "swing_high", h.value);
        }
        if let Some(l) = state.last_low {
            insert_value(&mut values, "swing_low", l.value);
        }
        insert_value(&mut values, "swing_count", state.swing_count);
        values
    }

    fn shapes(&self, _config: &SwingConfig, _state: &SwingState) -> Vec<Shape> {
        Vec::new()
    }

    fn last_open_time(&self, state: &SwingState) -> Option<i64> {
        state.last_open_time
    }

    fn bars_seen(&self, state: &SwingState) -> u64 {
        state.bars_seen
    }
}
