// =============================================================================
// Fair Value Gap Detector & Mitigation Tracker
// =============================================================================
//
// A fair value gap is a three-bar imbalance.  With the rolling buffer
// [old, middle, current]:
//
//   BULLISH  current.low  > old.high  AND  middle.close > old.high
//            size = (current.low - old.high) / old.high
//            gap  = [old.high, current.low]
//
//   BEARISH  current.high < old.low   AND  middle.close < old.low
//            size = (old.low - current.high) / old.low
//            gap  = [current.high, old.low]
//
// A gap is registered when its size exceeds the threshold: either a fixed
// percentage, or (auto mode) the running mean of (high - low) / low.
//
// Open gaps live in a most-recent-first registry.  A bullish gap is
// mitigated when a bar closes below its bottom, a bearish one when a bar
// closes above its top.  Mitigated gaps leave the registry for good.  The
// registry never holds more than MAX_RECORDS gaps; the oldest go first.
//
// Dynamic mode additionally keeps one shrinking bound pair per side for the
// latest gap, pulled toward price every bar that side is not re-created:
//
//   bullish top    := max(min(close, top), bottom)
//   bearish bottom := min(max(close, bottom), top)
//
// Those bounds repaint and are reported as provisional.
// =============================================================================

use std::collections::VecDeque;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{
    check_decimal_range, check_int_range, decimal_default, ensure_in_order, insert_value,
    IndicatorOutput, ParamKind, ParamSpec, ProgressiveIndicator, Shape, Values, MAX_RECORDS,
};
use crate::error::Result;
use crate::market_data::Bar;
use crate::numeric::{percent_to_fraction, range_fraction, relative_change, serialize_normalized};
use crate::types::LineStyle;

// =============================================================================
// Constants
// =============================================================================

/// Weight of the newest close-time delta in the average bar duration.
const DURATION_SMOOTHING: Decimal = dec!(0.1);

/// Bars in the detection buffer.
const PATTERN_LEN: usize = 3;

// =============================================================================
// Config
// =============================================================================

fn default_true() -> bool {
    true
}

fn default_extend_bars() -> usize {
    20
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FvgConfig {
    /// Minimum gap size in percent of the reference price.
    #[serde(default, serialize_with = "serialize_normalized")]
    pub threshold_percent: Decimal,

    /// Replace the fixed threshold with the mean bar range.
    #[serde(default)]
    pub auto_threshold: bool,

    /// Track shrinking bounds for the latest gap on each side.
    #[serde(default)]
    pub dynamic: bool,

    /// Emit a dashed line at the broken level when a gap mitigates.
    #[serde(default = "default_true")]
    pub show_mitigation_lines: bool,

    /// How many average bar durations open static gaps extend to the right.
    #[serde(default = "default_extend_bars")]
    pub extend_bars: usize,
}

impl Default for FvgConfig {
    fn default() -> Self {
        Self {
            threshold_percent: Decimal::ZERO,
            auto_threshold: false,
            dynamic: false,
            show_mitigation_lines: true,
            extend_bars: default_extend_bars(),
        }
    }
}

// =============================================================================
// Types
// =============================================================================

/// An open or mitigated fair value gap. `top >= bottom` always.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Gap {
    pub top: Decimal,
    pub bottom: Decimal,
    pub is_bullish: bool,
    /// Close time of the bar that completed the pattern.
    pub detected_at: i64,
    /// Close time of the bar two before detection.
    pub anchor_time: i64,
    pub bar_index_at_creation: u64,
    pub mitigated: bool,
}

/// Compact bar kept in the 3-bar detection buffer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
struct PatternBar {
    close_time: i64,
    high: Decimal,
    low: Decimal,
    close: Decimal,
}

/// Dynamic-mode bounds of the latest gap on one side.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DynamicBounds {
    pub top: Decimal,
    pub bottom: Decimal,
    pub anchor_time: i64,
    /// `bar_index_at_creation` of the gap these bounds follow.
    pub gap_index: u64,
}

impl DynamicBounds {
    fn of(gap: &Gap) -> Self {
        Self {
            top: gap.top,
            bottom: gap.bottom,
            anchor_time: gap.anchor_time,
            gap_index: gap.bar_index_at_creation,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FvgState {
    /// Open gaps, most recent first.
    gaps: VecDeque<Gap>,
    window: VecDeque<PatternBar>,

    cum_range: Decimal,
    range_samples: u64,

    bull_dynamic: Option<DynamicBounds>,
    bear_dynamic: Option<DynamicBounds>,

    last_bull_time: Option<i64>,
    last_bear_time: Option<i64>,

    avg_bar_duration: Option<Decimal>,
    last_close_time: Option<i64>,

    bull_count: u64,
    bear_count: u64,
    bull_mitigated: u64,
    bear_mitigated: u64,

    bars_seen: u64,
    last_open_time: Option<i64>,
}

impl FvgState {
    /// Open gaps, most recent first.
    pub fn gaps(&self) -> impl Iterator<Item = &Gap> {
        self.gaps.iter()
    }

    pub fn bull_dynamic(&self) -> Option<DynamicBounds> {
        self.bull_dynamic
    }

    pub fn bear_dynamic(&self) -> Option<DynamicBounds> {
        self.bear_dynamic
    }

    /// Smoothed close-to-close duration in milliseconds.
    pub fn avg_bar_duration(&self) -> Option<Decimal> {
        self.avg_bar_duration
    }

    /// Active threshold as a fraction.
    fn threshold(&self, config: &FvgConfig) -> Decimal {
        if config.auto_threshold {
            if self.range_samples == 0 {
                Decimal::ZERO
            } else {
                self.cum_range / Decimal::from(self.range_samples)
            }
        } else {
            percent_to_fraction(config.threshold_percent)
        }
    }
}

// =============================================================================
// Detection
// =============================================================================

fn detect_bullish(old: &PatternBar, middle: &PatternBar, current: &PatternBar) -> Option<(Decimal, Decimal, Decimal)> {
    if current.low > old.high && middle.close > old.high {
        let size = relative_change(current.low, old.high)?;
        Some((current.low, old.high, size))
    } else {
        None
    }
}

fn detect_bearish(old: &PatternBar, middle: &PatternBar, current: &PatternBar) -> Option<(Decimal, Decimal, Decimal)> {
    if current.high < old.low && middle.close < old.low {
        // (old.low - current.high) / old.low
        let size = relative_change(current.high, old.low)?.abs();
        Some((old.low, current.high, size))
    } else {
        None
    }
}

// =============================================================================
// FvgIndicator
// =============================================================================

/// Fair value gap detector with a live mitigation registry.
pub struct FvgIndicator;

impl FvgIndicator {
    fn update_duration(state: &mut FvgState, close_time: i64) {
        if let Some(prev) = state.last_close_time {
            let delta = Decimal::from(close_time - prev);
            state.avg_bar_duration = Some(match state.avg_bar_duration {
                Some(avg) => avg + DURATION_SMOOTHING * (delta - avg),
                None => delta,
            });
        }
        state.last_close_time = Some(close_time);
    }

    fn register(state: &mut FvgState, gap: Gap, config: &FvgConfig) {
        debug!(
            bullish = gap.is_bullish,
            top = %gap.top,
            bottom = %gap.bottom,
            index = gap.bar_index_at_creation,
            "fair value gap created"
        );
        if gap.is_bullish {
            state.bull_count += 1;
            state.last_bull_time = Some(gap.detected_at);
            if config.dynamic {
                state.bull_dynamic = Some(DynamicBounds::of(&gap));
            }
        } else {
            state.bear_count += 1;
            state.last_bear_time = Some(gap.detected_at);
            if config.dynamic {
                state.bear_dynamic = Some(DynamicBounds::of(&gap));
            }
        }
        state.gaps.push_front(gap);
    }

    /// Close every open gap the bar's close has broken through.
    fn mitigate(state: &mut FvgState, bar: &Bar, config: &FvgConfig, shapes: &mut Vec<Shape>) {
        let close = bar.close;
        let mut broken = Vec::new();
        state.gaps.retain(|gap| {
            let hit = if gap.is_bullish {
                close < gap.bottom
            } else {
                close > gap.top
            };
            if hit {
                broken.push(Gap {
                    mitigated: true,
                    ..*gap
                });
            }
            !hit
        });

        for gap in broken {
            debug!(
                bullish = gap.is_bullish,
                top = %gap.top,
                bottom = %gap.bottom,
                close = %close,
                "fair value gap mitigated"
            );
            let level = if gap.is_bullish {
                state.bull_mitigated += 1;
                if state.bull_dynamic.is_some_and(|d| d.gap_index == gap.bar_index_at_creation) {
                    state.bull_dynamic = None;
                }
                gap.bottom
            } else {
                state.bear_mitigated += 1;
                if state.bear_dynamic.is_some_and(|d| d.gap_index == gap.bar_index_at_creation) {
                    state.bear_dynamic = None;
                }
                gap.top
            };
            if config.show_mitigation_lines {
                shapes.push(Shape::Line {
                    from_time: gap.anchor_time,
                    from_price: level,
                    to_time: bar.close_time,
                    to_price: level,
                    style: LineStyle::Dashed,
                    provisional: false,
                });
            }
        }
    }

    fn box_right_edge(state: &FvgState, config: &FvgConfig) -> i64 {
        let last = state.last_close_time.unwrap_or_default();
        let extension = state
            .avg_bar_duration
            .and_then(|avg| (avg * Decimal::from(config.extend_bars)).round().to_i64())
            .unwrap_or_default();
        last.saturating_add(extension)
    }
}

impl ProgressiveIndicator for FvgIndicator {
    type Config = FvgConfig;
    type State = FvgState;

    fn name(&self) -> &'static str {
        "fvg"
    }

    fn parameters(&self) -> Vec<ParamSpec> {
        vec![
            ParamSpec {
                name: "thresholdPercent",
                kind: ParamKind::Percent,
                default: decimal_default(Decimal::ZERO),
                min: Some(Decimal::ZERO),
                max: Some(Decimal::from(100)),
                description: "Minimum gap size as a percentage of the reference price",
            },
            ParamSpec {
                name: "autoThreshold",
                kind: ParamKind::Boolean,
                default: serde_json::json!(false),
                min: None,
                max: None,
                description: "Use the running mean bar range as the threshold",
            },
            ParamSpec {
                name: "dynamic",
                kind: ParamKind::Boolean,
                default: serde_json::json!(false),
                min: None,
                max: None,
                description: "Shrink the latest gap's bounds toward price each bar",
            },
            ParamSpec {
                name: "showMitigationLines",
                kind: ParamKind::Boolean,
                default: serde_json::json!(true),
                min: None,
                max: None,
                description: "Draw the broken level when a gap is mitigated",
            },
            ParamSpec {
                name: "extendBars",
                kind: ParamKind::Integer,
                default: serde_json::json!(default_extend_bars()),
                min: Some(Decimal::ZERO),
                max: Some(Decimal::from(500)),
                description: "Right extension of open gap boxes, in bars",
            },
        ]
    }

    fn validate(&self, config: &FvgConfig) -> Result<()> {
        check_decimal_range("thresholdPercent", config.threshold_percent, Decimal::ZERO, Decimal::from(100))?;
        check_int_range("extendBars", config.extend_bars, 0, 500)
    }

    fn required_warmup(&self, _config: &FvgConfig) -> usize {
        PATTERN_LEN
    }

    fn consume(&self, bar: &Bar, config: &FvgConfig, state: &mut FvgState) -> Result<IndicatorOutput> {
        self.validate(config)?;
        ensure_in_order(state.last_open_time, bar)?;

        let index = state.bars_seen;
        state.bars_seen += 1;
        state.last_open_time = Some(bar.open_time);
        Self::update_duration(state, bar.close_time);

        if let Some(range) = range_fraction(bar.high, bar.low) {
            state.cum_range += range;
            state.range_samples += 1;
        }

        state.window.push_back(PatternBar {
            close_time: bar.close_time,
            high: bar.high,
            low: bar.low,
            close: bar.close,
        });
        while state.window.len() > PATTERN_LEN {
            state.window.pop_front();
        }

        let mut bull_created = false;
        let mut bear_created = false;
        if state.window.len() == PATTERN_LEN {
            let (old, middle, current) = (state.window[0], state.window[1], state.window[2]);
            let threshold = state.threshold(config);

            if let Some((top, bottom, size)) = detect_bullish(&old, &middle, &current) {
                if size > threshold && state.last_bull_time != Some(current.close_time) {
                    let gap = Gap {
                        top,
                        bottom,
                        is_bullish: true,
                        detected_at: current.close_time,
                        anchor_time: old.close_time,
                        bar_index_at_creation: index,
                        mitigated: false,
                    };
                    Self::register(state, gap, config);
                    bull_created = true;
                }
            }

            if let Some((top, bottom, size)) = detect_bearish(&old, &middle, &current) {
                if size > threshold && state.last_bear_time != Some(current.close_time) {
                    let gap = Gap {
                        top,
                        bottom,
                        is_bullish: false,
                        detected_at: current.close_time,
                        anchor_time: old.close_time,
                        bar_index_at_creation: index,
                        mitigated: false,
                    };
                    Self::register(state, gap, config);
                    bear_created = true;
                }
            }
        }

        if config.dynamic {
            let close = bar.close;
            if !bull_created {
                if let Some(d) = state.bull_dynamic.as_mut() {
                    d.top = close.min(d.top).max(d.bottom);
                }
            }
            if !bear_created {
                if let Some(d) = state.bear_dynamic.as_mut() {
                    d.bottom = close.max(d.bottom).min(d.top);
                }
            }
        }

        let mut shapes = Vec::new();
        Self::mitigate(state, bar, config, &mut shapes);

        state.gaps.truncate(MAX_RECORDS);

        Ok(IndicatorOutput {
            values: self.values(config, state),
            shapes,
        })
    }

    fn values(&self, config: &FvgConfig, state: &FvgState) -> Values {
        let mut values = Values::new();
        insert_value(&mut values, "bullish_count", state.bull_count);
        insert_value(&mut values, "bearish_count", state.bear_count);
        insert_value(&mut values, "bullish_mitigated", state.bull_mitigated);
        insert_value(&mut values, "bearish_mitigated", state.bear_mitigated);
        insert_value(&mut values, "active_gaps", state.gaps.len());
        insert_value(&mut values, "threshold", state.threshold(config));
        if let Some(d) = state.bull_dynamic {
            insert_value(&mut values, "bull_dynamic_top", d.top);
            insert_value(&mut values, "bull_dynamic_bottom", d.bottom);
        }
        if let Some(d) = state.bear_dynamic {
            insert_value(&mut values, "bear_dynamic_top", d.top);
            insert_value(&mut values, "bear_dynamic_bottom", d.bottom);
        }
        values
    }

    fn shapes(&self, config: &FvgConfig, state: &FvgState) -> Vec<Shape> {
        if config.dynamic {
            let right = state.last_close_time.unwrap_or_default();
            return [(state.bull_dynamic, true), (state.bear_dynamic, false)]
                .into_iter()
                .filter_map(|(d, bullish)| {
                    d.map(|d| Shape::Box {
                        left: d.anchor_time,
                        right,
                        top: d.top,
                        bottom: d.bottom,
                        bullish,
                        provisional: true,
                    })
                })
                .collect();
        }

        let right = Self::box_right_edge(state, config);
        state
            .gaps
            .iter()
            .map(|gap| Shape::Box {
                left: gap.anchor_time,
                right,
                top: gap.top,
                bottom: gap.bottom,
                bullish: gap.is_bullish,
                provisional: false,
            })
            .collect()
    }

    fn last_open_time(&self, state: &FvgState) -> Option<i64> {
        state.last_open_time
    }

    fn bars_seen(&self, state: &FvgState) -> u64 {
        state.bars_seen
    }
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::test_support::*;

    /// The three-bar bullish setup: lows [100, 105, 112], highs [102, 108, 115].
    fn bullish_setup() -> Vec<Bar> {
        vec![
            hlc(0, dec!(102), dec!(100), dec!(101)),
            hlc(1, dec!(108), dec!(105), dec!(107)),
            hlc(2, dec!(115), dec!(112), dec!(114)),
        ]
    }

    fn run(bars: &[Bar], config: &FvgConfig) -> (FvgState, Vec<IndicatorOutput>) {
        let mut state = FvgState::default();
        let outputs = bars
            .iter()
            .map(|b| FvgIndicator.consume(b, config, &mut state).unwrap())
            .collect();
        (state, outputs)
    }

    #[test]
    fn bullish_gap_created_from_three_bars() {
        let (state, outputs) = run(&bullish_setup(), &FvgConfig::default());
        let gaps: Vec<&Gap> = state.gaps().collect();
        assert_eq!(gaps.len(), 1);
        let gap = gaps[0];
        assert!(gap.is_bullish);
        assert_eq!(gap.top, dec!(112));
        assert_eq!(gap.bottom, dec!(102));
        assert_eq!(gap.anchor_time, MINUTE - 1);
        assert_eq!(gap.detected_at, 3 * MINUTE - 1);
        assert_eq!(gap.bar_index_at_creation, 2);
        assert!(!gap.mitigated);
        assert_eq!(outputs[2].values["bullish_count"], dec!(1));
        assert_eq!(outputs[2].values["active_gaps"], dec!(1));
    }

    #[test]
    fn bullish_gap_mitigates_on_close_below_bottom() {
        let mut bars = bullish_setup();
        bars.push(hlc(3, dec!(113), dec!(104), dec!(105)));
        bars.push(hlc(4, dec!(113), dec!(100), dec!(101)));
        let (state, outputs) = run(&bars, &FvgConfig::default());

        assert_eq!(state.gaps().count(), 0);
        let last = outputs.last().unwrap();
        assert_eq!(last.values["bullish_mitigated"], dec!(1));
        assert_eq!(last.values["active_gaps"], dec!(0));
        match &last.shapes[..] {
            [Shape::Line { from_time, from_price, to_time, style, .. }] => {
                assert_eq!(*from_time, MINUTE - 1);
                assert_eq!(*from_price, dec!(102));
                assert_eq!(*to_time, 5 * MINUTE - 1);
                assert_eq!(*style, LineStyle::Dashed);
            }
            other => panic!("expected one mitigation line, got {other:?}"),
        }
    }

    #[test]
    fn mitigated_gap_never_returns() {
        let mut bars = bullish_setup();
        bars.push(hlc(3, dec!(104), dec!(99), dec!(101)));
        for i in 4..20 {
            bars.push(hlc(i, dec!(120), dec!(110), dec!(115)));
        }
        let mut state = FvgState::default();
        let cfg = FvgConfig::default();
        for (i, bar) in bars.iter().enumerate() {
            FvgIndicator.consume(bar, &cfg, &mut state).unwrap();
            if i >= 3 {
                assert!(state
                    .gaps()
                    .all(|g| !(g.is_bullish && g.bottom == dec!(102) && g.top == dec!(112))));
            }
        }
    }

    #[test]
    fn mitigation_lines_can_be_disabled() {
        let mut bars = bullish_setup();
        bars.push(hlc(3, dec!(104), dec!(99), dec!(101)));
        let cfg = FvgConfig {
            show_mitigation_lines: false,
            ..FvgConfig::default()
        };
        let (_, outputs) = run(&bars, &cfg);
        assert!(outputs[3].shapes.is_empty());
        assert_eq!(outputs[3].values["bullish_mitigated"], dec!(1));
    }

    #[test]
    fn bearish_gap_bounds_and_mitigation() {
        let bars = vec![
            hlc(0, dec!(200), dec!(190), dec!(192)),
            hlc(1, dec!(188), dec!(180), dec!(182)),
            hlc(2, dec!(178), dec!(170), dec!(172)),
            hlc(3, dec!(195), dec!(185), dec!(191)),
        ];
        let mut state = FvgState::default();
        let cfg = FvgConfig::default();
        for bar in &bars[..3] {
            FvgIndicator.consume(bar, &cfg, &mut state).unwrap();
        }
        let gap = *state.gaps().next().unwrap();
        assert!(!gap.is_bullish);
        assert_eq!(gap.top, dec!(190));
        assert_eq!(gap.bottom, dec!(178));
        assert!(gap.top >= gap.bottom);

        let out = FvgIndicator.consume(&bars[3], &cfg, &mut state).unwrap();
        assert_eq!(out.values["bearish_mitigated"], dec!(1));
        assert_eq!(state.gaps().count(), 0);
    }

    #[test]
    fn fixed_threshold_filters_small_gaps() {
        // Gap size is (112 - 102) / 102 = 9.8%.
        let cfg = FvgConfig {
            threshold_percent: dec!(10),
            ..FvgConfig::default()
        };
        let (state, _) = run(&bullish_setup(), &cfg);
        assert_eq!(state.gaps().count(), 0);

        let cfg = FvgConfig {
            threshold_percent: dec!(9),
            ..FvgConfig::default()
        };
        let (state, _) = run(&bullish_setup(), &cfg);
        assert_eq!(state.gaps().count(), 1);
    }

    #[test]
    fn auto_threshold_is_mean_bar_range() {
        let cfg = FvgConfig {
            auto_threshold: true,
            ..FvgConfig::default()
        };
        let (state, outputs) = run(&bullish_setup(), &cfg);
        // (2/100 + 3/105 + 3/112) / 3 is about 2.5%, well under the 9.8% gap.
        let threshold = outputs[2].values["threshold"];
        assert!(threshold > dec!(0.02) && threshold < dec!(0.03));
        assert_eq!(state.gaps().count(), 1);
    }

    #[test]
    fn degenerate_prices_produce_no_signal() {
        let bars = vec![
            hlc(0, Decimal::ZERO, Decimal::ZERO, Decimal::ZERO),
            hlc(1, dec!(5), dec!(1), dec!(4)),
            hlc(2, dec!(9), dec!(6), dec!(8)),
        ];
        let cfg = FvgConfig {
            auto_threshold: true,
            ..FvgConfig::default()
        };
        let (state, outputs) = run(&bars, &cfg);
        assert_eq!(state.gaps().count(), 0);
        assert_eq!(outputs[2].values["bullish_count"], dec!(0));
    }

    #[test]
    fn dynamic_bounds_shrink_toward_price() {
        let mut bars = bullish_setup();
        bars.push(hlc(3, dec!(113), dec!(106), dec!(108)));
        bars.push(hlc(4, dec!(113), dec!(103), dec!(110)));
        let cfg = FvgConfig {
            dynamic: true,
            ..FvgConfig::default()
        };
        let mut state = FvgState::default();
        for bar in &bars[..3] {
            FvgIndicator.consume(bar, &cfg, &mut state).unwrap();
        }
        let d = state.bull_dynamic().unwrap();
        assert_eq!((d.top, d.bottom), (dec!(112), dec!(102)));

        FvgIndicator.consume(&bars[3], &cfg, &mut state).unwrap();
        let d = state.bull_dynamic().unwrap();
        assert_eq!((d.top, d.bottom), (dec!(108), dec!(102)));

        // Closing back above the shrunk top never re-widens it.
        FvgIndicator.consume(&bars[4], &cfg, &mut state).unwrap();
        let d = state.bull_dynamic().unwrap();
        assert_eq!(d.top, dec!(108));
        assert!(d.top >= d.bottom);

        let shapes = FvgIndicator.shapes(&cfg, &state);
        assert!(matches!(shapes[..], [Shape::Box { provisional: true, bullish: true, .. }]));
    }

    #[test]
    fn dynamic_bounds_clear_on_mitigation() {
        let mut bars = bullish_setup();
        bars.push(hlc(3, dec!(104), dec!(99), dec!(100)));
        let cfg = FvgConfig {
            dynamic: true,
            ..FvgConfig::default()
        };
        let (state, outputs) = run(&bars, &cfg);
        assert!(state.bull_dynamic().is_none());
        assert!(!outputs[3].values.contains_key("bull_dynamic_top"));
    }

    #[test]
    fn bearish_dynamic_bounds_shrink_and_clear() {
        // Bearish gap between 190 (bar 0 low) and 178 (bar 2 high).
        let bars = vec![
            hlc(0, dec!(200), dec!(190), dec!(192)),
            hlc(1, dec!(188), dec!(180), dec!(182)),
            hlc(2, dec!(178), dec!(170), dec!(172)),
            hlc(3, dec!(186), dec!(175), dec!(185)),
            hlc(4, dec!(186), dec!(176), dec!(180)),
            hlc(5, dec!(195), dec!(184), dec!(192)),
        ];
        let cfg = FvgConfig {
            dynamic: true,
            ..FvgConfig::default()
        };
        let mut state = FvgState::default();
        for bar in &bars[..3] {
            FvgIndicator.consume(bar, &cfg, &mut state).unwrap();
        }
        let d = state.bear_dynamic().unwrap();
        assert_eq!((d.top, d.bottom), (dec!(190), dec!(178)));
        assert!(state.bull_dynamic().is_none());

        // A close inside the gap lifts the bottom.
        FvgIndicator.consume(&bars[3], &cfg, &mut state).unwrap();
        let d = state.bear_dynamic().unwrap();
        assert_eq!((d.top, d.bottom), (dec!(190), dec!(185)));

        // Closing lower again never re-widens it.
        let out = FvgIndicator.consume(&bars[4], &cfg, &mut state).unwrap();
        let d = state.bear_dynamic().unwrap();
        assert_eq!((d.top, d.bottom), (dec!(190), dec!(185)));
        assert!(d.top >= d.bottom);
        assert_eq!(out.values["bear_dynamic_bottom"], dec!(185));
        let shapes = FvgIndicator.shapes(&cfg, &state);
        assert!(matches!(shapes[..], [Shape::Box { provisional: true, bullish: false, .. }]));

        // A close above the top mitigates the gap and drops the bounds.
        let out = FvgIndicator.consume(&bars[5], &cfg, &mut state).unwrap();
        assert!(state.bear_dynamic().is_none());
        assert_eq!(state.gaps().count(), 0);
        assert_eq!(out.values["bearish_mitigated"], dec!(1));
        assert!(!out.values.contains_key("bear_dynamic_top"));
    }

    #[test]
    fn parameter_defaults_are_numbers() {
        let json = serde_json::to_value(FvgIndicator.parameters()).unwrap();
        for spec in json.as_array().unwrap() {
            assert!(spec["default"].is_boolean() || spec["default"].is_number(), "{spec}");
            if let Some(max) = spec.get("max") {
                assert!(max.is_number(), "{spec}");
            }
        }
        assert_eq!(json[0]["name"], "thresholdPercent");
        assert_eq!(json[0]["default"], serde_json::json!(0.0));
    }

    #[test]
    fn registry_is_capped() {
        // A staircase of ever-higher bars opens a bullish gap on every bar
        // from the third one and never closes any.
        let cfg = FvgConfig::default();
        let mut state = FvgState::default();
        for i in 0..(MAX_RECORDS as i64 + 100) {
            let base = Decimal::from(100 + i * 10);
            let bar = hlc(i, base + dec!(2), base, base + dec!(1));
            FvgIndicator.consume(&bar, &cfg, &mut state).unwrap();
            assert!(state.gaps().count() <= MAX_RECORDS);
        }
        assert_eq!(state.gaps().count(), MAX_RECORDS);
        // Most recent first.
        let gaps: Vec<&Gap> = state.gaps().collect();
        assert!(gaps[0].bar_index_at_creation > gaps[1].bar_index_at_creation);
    }

    #[test]
    fn static_boxes_extend_by_average_duration() {
        let cfg = FvgConfig {
            extend_bars: 10,
            ..FvgConfig::default()
        };
        let (state, _) = run(&bullish_setup(), &cfg);
        assert_eq!(state.avg_bar_duration(), Some(Decimal::from(MINUTE)));
        let shapes = FvgIndicator.shapes(&cfg, &state);
        match &shapes[..] {
            [Shape::Box { left, right, provisional, .. }] => {
                assert_eq!(*left, MINUTE - 1);
                assert_eq!(*right, 3 * MINUTE - 1 + 10 * MINUTE);
                assert!(!provisional);
            }
            other => panic!("expected one box, got {other:?}"),
        }
    }

    #[test]
    fn batch_equals_incremental() {
        let bars: Vec<Bar> = (0..120)
            .map(|i| {
                let mid = Decimal::from(1000 + ((i as f64 * 0.4).sin() * 80.0) as i64);
                hlc(i, mid + dec!(3), mid - dec!(3), mid)
            })
            .collect();
        let cfg = FvgConfig::default();
        let full = FvgIndicator.initialize(&bars, &cfg).unwrap();

        let (head, tail) = bars.split_at(50);
        let mut state = FvgIndicator.initialize(head, &cfg).unwrap();
        for bar in tail {
            FvgIndicator.consume(bar, &cfg, &mut state).unwrap();
        }
        assert_eq!(
            serde_json::to_value(&state).unwrap(),
            serde_json::to_value(&full).unwrap()
        );
    }

    #[test]
    fn out_of_order_rejected_without_mutation() {
        let (mut state, _) = run(&bullish_setup(), &FvgConfig::default());
        let before = serde_json::to_value(&state).unwrap();
        let dup = hlc(2, dec!(115), dec!(112), dec!(114));
        assert!(FvgIndicator.consume(&dup, &FvgConfig::default(), &mut state).is_err());
        assert_eq!(serde_json::to_value(&state).unwrap(), before);
    }
}
