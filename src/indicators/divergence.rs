// =============================================================================
// Divergence Matcher — price swings vs. volume-delta swings
// =============================================================================
//
// Pairs same-kind swings of a first series (price) and checks what a second
// series (volume delta) did at the nearest swings of the same kind:
//
//   Bullish:  price lower low    AND  delta higher-or-equal low
//   Bearish:  price higher high  AND  delta lower-or-equal high
//
// Pairs are sought at most `max_lookback / 10` positions back in the
// per-kind swing list.  The scaling is integer division, so the smallest
// allowed `max_lookback` of 10 still looks one swing back.
//
// Hidden (continuation) variants exist in the record type but are not
// matched here; `nearest_swing` is public for callers who want them.
// =============================================================================

use std::collections::VecDeque;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::swing::{delta_series, detect_price_swings, detect_swings};
use super::{
    check_int_range, ensure_in_order, insert_value, BarPoint, IndicatorOutput, ParamKind,
    ParamSpec, ProgressiveIndicator, Shape, SwingPoint, Values, MAX_RECORDS,
};
use crate::error::Result;
use crate::market_data::Bar;
use crate::types::{LineStyle, PivotKind};

/// Raw lookback is scaled down by this factor to get the pair window.
const LOOKBACK_SCALE: usize = 10;

// =============================================================================
// Types
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DivergenceKind {
    Bullish,
    Bearish,
    HiddenBullish,
    HiddenBearish,
}

impl DivergenceKind {
    /// Numeric code used in flat value maps.
    pub fn code(self) -> i64 {
        match self {
            Self::Bullish | Self::HiddenBullish => 1,
            Self::Bearish | Self::HiddenBearish => -1,
        }
    }
}

/// One price/delta disagreement. Derived data, recomputed on every call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DivergenceRecord {
    pub kind: DivergenceKind,
    pub start_index: u64,
    pub end_index: u64,
    pub price_start: Decimal,
    pub price_end: Decimal,
    pub series_start: Decimal,
    pub series_end: Decimal,
    /// Timestamp of the later price swing.
    pub timestamp: i64,
    /// Timestamp of the earlier price swing.
    pub start_timestamp: i64,
}

// =============================================================================
// Matching
// =============================================================================

/// Swing of `kind` closest to `target_index`; the first one wins a tie.
pub fn nearest_swing(swings: &[SwingPoint], kind: PivotKind, target_index: u64) -> Option<&SwingPoint> {
    let mut best: Option<(&SwingPoint, u64)> = None;
    for swing in swings.iter().filter(|s| s.kind == kind) {
        let distance = swing.index.abs_diff(target_index);
        if best.map_or(true, |(_, d)| distance < d) {
            best = Some((swing, distance));
        }
    }
    best.map(|(s, _)| s)
}

/// Regular bullish and bearish divergences between `price` and `series`,
/// ordered by end index then start index.
pub fn match_divergences(price: &[SwingPoint], series: &[SwingPoint], max_lookback: usize) -> Vec<DivergenceRecord> {
    let window = max_lookback / LOOKBACK_SCALE;
    let mut out = Vec::new();
    if window == 0 {
        return out;
    }

    for (kind, divergence) in [
        (PivotKind::Low, DivergenceKind::Bullish),
        (PivotKind::High, DivergenceKind::Bearish),
    ] {
        let same_kind: Vec<&SwingPoint> = price.iter().filter(|s| s.kind == kind).collect();
        for (j, later) in same_kind.iter().enumerate() {
            for earlier in &same_kind[j.saturating_sub(window)..j] {
                let price_diverges = match kind {
                    PivotKind::Low => later.value < earlier.value,
                    PivotKind::High => later.value > earlier.value,
                };
                if !price_diverges {
                    continue;
                }
                let (Some(d_earlier), Some(d_later)) = (
                    nearest_swing(series, kind, earlier.index),
                    nearest_swing(series, kind, later.index),
                ) else {
                    continue;
                };
                if d_earlier.index >= d_later.index {
                    continue;
                }
                let series_confirms = match kind {
                    PivotKind::Low => d_later.value >= d_earlier.value,
                    PivotKind::High => d_later.value <= d_earlier.value,
                };
                if series_confirms {
                    out.push(DivergenceRecord {
                        kind: divergence,
                        start_index: earlier.index,
                        end_index: later.index,
                        price_start: earlier.value,
                        price_end: later.value,
                        series_start: d_earlier.value,
                        series_end: d_later.value,
                        timestamp: later.timestamp,
                        start_timestamp: earlier.timestamp,
                    });
                }
            }
        }
    }

    out.sort_by_key(|r| (r.end_index, r.start_index));
    out
}

// =============================================================================
// Progressive form
// =============================================================================

fn default_pivot_lookback() -> usize {
    5
}

fn default_max_lookback() -> usize {
    60
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DivergenceConfig {
    /// Swing window on each side, shared by price and delta.
    #[serde(default = "default_pivot_lookback")]
    pub pivot_lookback: usize,

    /// Raw bar lookback; pairs are sought `max_lookback / 10` swings back.
    #[serde(default = "default_max_lookback")]
    pub max_lookback: usize,
}

impl Default for DivergenceConfig {
    fn default() -> Self {
        Self {
            pivot_lookback: default_pivot_lookback(),
            max_lookback: default_max_lookback(),
        }
    }
}

impl DivergenceConfig {
    fn window_len(&self) -> usize {
        self.max_lookback + 2 * self.pivot_lookback + 1
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DivergenceState {
    window: VecDeque<BarPoint>,
    records: VecDeque<DivergenceRecord>,
    /// (end, start) of the newest record already reported.
    last_key: Option<(u64, u64)>,
    bullish_count: u64,
    bearish_count: u64,
    last_kind: Option<DivergenceKind>,
    bars_seen: u64,
    last_open_time: Option<i64>,
}

impl DivergenceState {
    /// Reported records, oldest first.
    pub fn records(&self) -> impl Iterator<Item = &DivergenceRecord> {
        self.records.iter()
    }
}

fn record_line(record: &DivergenceRecord) -> Shape {
    Shape::Line {
        from_time: record.start_timestamp,
        from_price: record.price_start,
        to_time: record.timestamp,
        to_price: record.price_end,
        style: LineStyle::Solid,
        provisional: false,
    }
}

/// Progressive price/volume-delta divergence over a rolling bar window.
pub struct DivergenceIndicator;

impl ProgressiveIndicator for DivergenceIndicator {
    type Config = DivergenceConfig;
    type State = DivergenceState;

    fn name(&self) -> &'static str {
        "divergence"
    }

    fn parameters(&self) -> Vec<ParamSpec> {
        vec![
            ParamSpec {
                name: "pivotLookback",
                kind: ParamKind::Integer,
                default: serde_json::json!(default_pivot_lookback()),
                min: Some(Decimal::ONE),
                max: Some(Decimal::from(50)),
                description: "Bars required on each side of a price or delta swing",
            },
            ParamSpec {
                name: "maxLookback",
                kind: ParamKind::Integer,
                default: serde_json::json!(default_max_lookback()),
                min: Some(Decimal::from(10)),
                max: Some(Decimal::from(500)),
                description: "Bars searched back for a matching swing pair",
            },
        ]
    }

    fn validate(&self, config: &DivergenceConfig) -> Result<()> {
        check_int_range("pivotLookback", config.pivot_lookback, 1, 50)?;
        check_int_range("maxLookback", config.max_lookback, 10, 500)
    }

    fn required_warmup(&self, config: &DivergenceConfig) -> usize {
        2 * config.pivot_lookback + 1
    }

    fn consume(&self, bar: &Bar, config: &DivergenceConfig, state: &mut DivergenceState) -> Result<IndicatorOutput> {
        self.validate(config)?;
        ensure_in_order(state.last_open_time, bar)?;

        state.window.push_back(BarPoint::from_bar(state.bars_seen, bar));
        while state.window.len() > config.window_len() {
            state.window.pop_front();
        }
        state.bars_seen += 1;
        state.last_open_time = Some(bar.open_time);

        let window: Vec<BarPoint> = state.window.iter().copied().collect();
        let price = detect_price_swings(&window, config.pivot_lookback);
        let delta = detect_swings(&delta_series(&window), config.pivot_lookback);

        let mut shapes = Vec::new();
        for record in match_divergences(&price, &delta, config.max_lookback) {
            let key = (record.end_index, record.start_index);
            if state.last_key.is_some_and(|last| key <= last) {
                continue;
            }
            debug!(
                kind = ?record.kind,
                start = record.start_index,
                end = record.end_index,
                price_end = %record.price_end,
                delta_end = %record.series_end,
                "divergence detected"
            );
            match record.kind {
                DivergenceKind::Bullish | DivergenceKind::HiddenBullish => state.bullish_count += 1,
                DivergenceKind::Bearish | DivergenceKind::HiddenBearish => state.bearish_count += 1,
            }
            state.last_kind = Some(record.kind);
            state.last_key = Some(key);
            shapes.push(record_line(&record));
            state.records.push_back(record);
        }
        while state.records.len() > MAX_RECORDS {
            state.records.pop_front();
        }

        Ok(IndicatorOutput {
            values: self.values(config, state),
            shapes,
        })
    }

    fn values(&self, _config: &DivergenceConfig, state: &DivergenceState) -> Values {
        let mut values = Values::new();
        insert_value(&mut values, "bullish_count", state.bullish_count);
        insert_value(&mut values, "bearish_count", state.bearish_count);
        if let Some(kind) = state.last_kind {
            insert_value(&mut values, "last_divergence", kind.code());
        }
        values
    }

    fn shapes(&self, _config: &DivergenceConfig, state: &DivergenceState) -> Vec<Shape> {
        state.records.iter().map(record_line).collect()
    }

    fn last_open_time(&self, state: &DivergenceState) -> Option<i64> {
        state.last_open_time
    }

    fn bars_seen(&self, state: &DivergenceState) -> u64 {
        state.bars_seen
    }
}
