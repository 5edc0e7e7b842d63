// =============================================================================
// ZigZag Pivot Tracker — percentage-threshold pivot confirmation
// =============================================================================
//
// Two phases:
//
//   1. **Seeking**: buffer the first 2 * depth bars, then seed the run with
//      whichever of (highest high, lowest low) occurs first.  Equal extremes
//      keep their first occurrence; a bar holding both picks the High.  The
//      buffered bars after the seed are then fed through the tracker.
//
//   2. **Tracking(pivot)**: every bar is handled once.
//
//        - A bar that extends the pivot in its own direction (a higher high
//          after a High, a lower low after a Low) moves the pivot there.
//          The pivot is revised in place and the opposite extreme resets.
//        - From `depth` bars after the pivot on, the running extreme of the
//          opposite kind is followed.  Once it lies on the correct side of
//          the pivot with
//
//              |extreme - pivot.price| / pivot.price * 100 >= deviation
//
//          it becomes the next pivot and the previous one is final.
//
//      A confirmation always lands on the bar that set the extreme, so no
//      bars are kept after they have been handled.
//
// The last pivot repaints while price extends past it.  The leg from it to
// the running extreme is reported as a provisional dashed line.
// =============================================================================

use std::collections::VecDeque;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::{
    check_decimal_range, check_int_range, decimal_default, ensure_in_order, insert_value,
    BarPoint, IndicatorOutput, ParamKind, ParamSpec, ProgressiveIndicator, Shape, Values,
    MAX_RECORDS,
};
use crate::error::Result;
use crate::market_data::Bar;
use crate::numeric::{percent_change, serialize_normalized};
use crate::types::{LineStyle, PivotKind};

// =============================================================================
// Config
// =============================================================================

fn default_deviation() -> Decimal {
    dec!(5.0)
}

fn default_depth() -> usize {
    12
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ZigZagConfig {
    /// Minimum percentage move that confirms the next pivot.
    #[serde(default = "default_deviation", serialize_with = "serialize_normalized")]
    pub deviation: Decimal,

    /// Minimum bars between a pivot and the start of the next scan.
    #[serde(default = "default_depth")]
    pub depth: usize,
}

impl Default for ZigZagConfig {
    fn default() -> Self {
        Self {
            deviation: default_deviation(),
            depth: default_depth(),
        }
    }
}

// =============================================================================
// Types
// =============================================================================

/// A turning point. Consecutive pivots always alternate kind.
///
/// The most recent pivot is provisional: it moves to a later bar while price
/// keeps extending in its direction, until the next pivot is confirmed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZigZagPivot {
    pub index: u64,
    pub timestamp: i64,
    pub price: Decimal,
    pub kind: PivotKind,
    /// Signed percentage change from the previous pivot (zero for the seed).
    pub percent_change: Decimal,
}

/// Running opposite-kind extreme since the scan start.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
struct Extreme {
    index: u64,
    timestamp: i64,
    price: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Tracker {
    current: ZigZagPivot,
    /// Price of the pivot before `current`; `None` while `current` is the seed.
    previous_price: Option<Decimal>,
    extreme: Option<Extreme>,
}

/// What one bar did to the tracker.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Step {
    Hold,
    Revised(ZigZagPivot),
    Confirmed(ZigZagPivot),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
enum Phase {
    Seeking { buffer: Vec<BarPoint> },
    Tracking(Tracker),
}

impl Default for Phase {
    fn default() -> Self {
        Self::Seeking { buffer: Vec::new() }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ZigZagState {
    phase: Phase,
    pivots: VecDeque<ZigZagPivot>,
    pivot_count: u64,
    bars_seen: u64,
    last_open_time: Option<i64>,
}

impl ZigZagState {
    /// Retained pivots, oldest first.  The last one may still be revised.
    pub fn pivots(&self) -> impl Iterator<Item = &ZigZagPivot> {
        self.pivots.iter()
    }

    pub fn is_seeking(&self) -> bool {
        matches!(self.phase, Phase::Seeking { .. })
    }

    /// Bars held for the seed search; zero once tracking.
    pub fn buffered_bars(&self) -> usize {
        match &self.phase {
            Phase::Seeking { buffer } => buffer.len(),
            Phase::Tracking(_) => 0,
        }
    }
}

// =============================================================================
// State machine
// =============================================================================

fn seed_pivot(buffer: &[BarPoint]) -> Option<ZigZagPivot> {
    let mut highest = buffer.first()?;
    let mut lowest = highest;
    for b in buffer {
        if b.high > highest.high {
            highest = b;
        }
        if b.low < lowest.low {
            lowest = b;
        }
    }
    let (bar, price, kind) = if highest.index <= lowest.index {
        (highest, highest.high, PivotKind::High)
    } else {
        (lowest, lowest.low, PivotKind::Low)
    };
    Some(ZigZagPivot {
        index: bar.index,
        timestamp: bar.open_time,
        price,
        kind,
        percent_change: Decimal::ZERO,
    })
}

/// Price of `bar` on the `kind` side.
fn side_price(bar: &BarPoint, kind: PivotKind) -> Decimal {
    match kind {
        PivotKind::High => bar.high,
        PivotKind::Low => bar.low,
    }
}

/// `true` when `price` lies beyond `than` in the `kind` direction.
fn beyond(kind: PivotKind, price: Decimal, than: Decimal) -> bool {
    match kind {
        PivotKind::High => price > than,
        PivotKind::Low => price < than,
    }
}

impl Tracker {
    fn new(seed: ZigZagPivot) -> Self {
        Self {
            current: seed,
            previous_price: None,
            extreme: None,
        }
    }

    /// Advance by one bar newer than `current`.
    fn step(&mut self, bar: &BarPoint, config: &ZigZagConfig) -> Step {
        let kind = self.current.kind;

        let own = side_price(bar, kind);
        if beyond(kind, own, self.current.price) {
            self.current = ZigZagPivot {
                index: bar.index,
                timestamp: bar.open_time,
                price: own,
                kind,
                percent_change: self
                    .previous_price
                    .and_then(|prev| percent_change(own, prev))
                    .unwrap_or(Decimal::ZERO),
            };
            self.extreme = None;
            trace!(index = bar.index, kind = %kind, price = %own, "zigzag pivot revised");
            return Step::Revised(self.current);
        }

        if bar.index < self.current.index + config.depth as u64 {
            return Step::Hold;
        }

        let target = kind.opposite();
        let candidate = side_price(bar, target);
        if !self.extreme.map_or(true, |e| beyond(target, candidate, e.price)) {
            return Step::Hold;
        }
        self.extreme = Some(Extreme {
            index: bar.index,
            timestamp: bar.open_time,
            price: candidate,
        });

        let Some(change) = percent_change(candidate, self.current.price) else {
            return Step::Hold;
        };
        let reached = match target {
            PivotKind::Low => change <= -config.deviation,
            PivotKind::High => change >= config.deviation,
        };
        if !reached {
            return Step::Hold;
        }

        let pivot = ZigZagPivot {
            index: bar.index,
            timestamp: bar.open_time,
            price: candidate,
            kind: target,
            percent_change: change,
        };
        debug!(
            index = pivot.index,
            kind = %pivot.kind,
            price = %pivot.price,
            change_pct = %pivot.percent_change,
            "zigzag pivot confirmed"
        );
        self.previous_price = Some(self.current.price);
        self.current = pivot;
        self.extreme = None;
        Step::Confirmed(pivot)
    }
}

fn leg(from: &ZigZagPivot, to: &ZigZagPivot, provisional: bool) -> Shape {
    Shape::Line {
        from_time: from.timestamp,
        from_price: from.price,
        to_time: to.timestamp,
        to_price: to.price,
        style: LineStyle::Solid,
        provisional,
    }
}

// =============================================================================
// ZigZagIndicator
// =============================================================================

/// Sequential zigzag pivot tracker.
pub struct ZigZagIndicator;

impl ZigZagIndicator {
    /// Append a new pivot.  The leg ending at the previous pivot is final now
    /// and goes into `shapes`.
    fn record(state: &mut ZigZagState, pivot: ZigZagPivot, shapes: &mut Vec<Shape>) {
        let n = state.pivots.len();
        if n >= 2 {
            shapes.push(leg(&state.pivots[n - 2], &state.pivots[n - 1], false));
        }
        state.pivots.push_back(pivot);
        state.pivot_count += 1;
        while state.pivots.len() > MAX_RECORDS {
            state.pivots.pop_front();
        }
    }

    fn apply(state: &mut ZigZagState, step: Step, shapes: &mut Vec<Shape>) {
        match step {
            Step::Hold => {}
            Step::Revised(pivot) => {
                if let Some(last) = state.pivots.back_mut() {
                    *last = pivot;
                }
            }
            Step::Confirmed(pivot) => Self::record(state, pivot, shapes),
        }
    }
}

impl ProgressiveIndicator for ZigZagIndicator {
    type Config = ZigZagConfig;
    type State = ZigZagState;

    fn name(&self) -> &'static str {
        "zigzag"
    }

    fn parameters(&self) -> Vec<ParamSpec> {
        vec![
            ParamSpec {
                name: "deviation",
                kind: ParamKind::Percent,
                default: decimal_default(default_deviation()),
                min: Some(dec!(0.1)),
                max: Some(dec!(50)),
                description: "Percentage move from the last pivot that confirms the next one",
            },
            ParamSpec {
                name: "depth",
                kind: ParamKind::Integer,
                default: serde_json::json!(default_depth()),
                min: Some(Decimal::ONE),
                max: Some(Decimal::from(100)),
                description: "Minimum bar spacing between pivots",
            },
        ]
    }

    fn validate(&self, config: &ZigZagConfig) -> Result<()> {
        check_decimal_range("deviation", config.deviation, dec!(0.1), dec!(50))?;
        check_int_range("depth", config.depth, 1, 100)
    }

    fn required_warmup(&self, config: &ZigZagConfig) -> usize {
        2 * config.depth
    }

    fn consume(&self, bar: &Bar, config: &ZigZagConfig, state: &mut ZigZagState) -> Result<IndicatorOutput> {
        self.validate(config)?;
        ensure_in_order(state.last_open_time, bar)?;

        let point = BarPoint::from_bar(state.bars_seen, bar);
        state.bars_seen += 1;
        state.last_open_time = Some(bar.open_time);

        let mut shapes = Vec::new();
        let phase = std::mem::take(&mut state.phase);
        state.phase = match phase {
            Phase::Seeking { mut buffer } => {
                buffer.push(point);
                if buffer.len() < 2 * config.depth {
                    Phase::Seeking { buffer }
                } else {
                    match seed_pivot(&buffer) {
                        Some(seed) => {
                            debug!(index = seed.index, kind = %seed.kind, price = %seed.price, "zigzag seeded");
                            Self::record(state, seed, &mut shapes);
                            let mut tracker = Tracker::new(seed);
                            for b in buffer.iter().filter(|b| b.index > seed.index) {
                                let step = tracker.step(b, config);
                                Self::apply(state, step, &mut shapes);
                            }
                            Phase::Tracking(tracker)
                        }
                        None => Phase::Seeking { buffer },
                    }
                }
            }
            Phase::Tracking(mut tracker) => {
                let step = tracker.step(&point, config);
                Self::apply(state, step, &mut shapes);
                Phase::Tracking(tracker)
            }
        };

        Ok(IndicatorOutput {
            values: self.values(config, state),
            shapes,
        })
    }

    fn values(&self, _config: &ZigZagConfig, state: &ZigZagState) -> Values {
        let mut values = Values::new();
        if let Some(last) = state.pivots.back() {
            insert_value(&mut values, "last_pivot_price", last.price);
            insert_value(&mut values, "last_pivot_kind", last.kind.code());
            insert_value(&mut values, "last_change_pct", last.percent_change);
        }
        if let Phase::Tracking(Tracker { extreme: Some(e), .. }) = &state.phase {
            insert_value(&mut values, "provisional_price", e.price);
        }
        insert_value(&mut values, "pivot_count", state.pivot_count);
        values
    }

    /// The leg into the last pivot (solid, still repainting) and the dashed
    /// leg from it to the running extreme.
    fn shapes(&self, _config: &ZigZagConfig, state: &ZigZagState) -> Vec<Shape> {
        let mut shapes = Vec::new();
        let n = state.pivots.len();
        if n >= 2 {
            shapes.push(leg(&state.pivots[n - 2], &state.pivots[n - 1], true));
        }
        if let Phase::Tracking(Tracker {
            current,
            extreme: Some(e),
            ..
        }) = &state.phase
        {
            shapes.push(Shape::Line {
                from_time: current.timestamp,
                from_price: current.price,
                to_time: e.timestamp,
                to_price: e.price,
                style: LineStyle::Dashed,
                provisional: true,
            });
        }
        shapes
    }

    fn last_open_time(&self, state: &ZigZagState) -> Option<i64> {
        state.last_open_time
    }

    fn bars_seen(&self, state: &ZigZagState) -> u64 {
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

    fn closes(prices: &[i64]) -> Vec<Bar> {
        prices
            .iter()
            .enumerate()
            .map(|(i, &p)| flat(i as i64, Decimal::from(p)))
            .collect()
    }

    fn run(bars: &[Bar], config: &ZigZagConfig) -> Vec<ZigZagPivot> {
        let state = ZigZagIndicator.initialize(bars, config).unwrap();
        state.pivots().copied().collect()
    }

    #[test]
    fn seeking_until_two_depth_bars() {
        let cfg = ZigZagConfig { deviation: dec!(5), depth: 3 };
        let state = ZigZagIndicator.initialize(&closes(&[100, 101, 102, 103, 104]), &cfg).unwrap();
        assert!(state.is_seeking());
        assert_eq!(state.pivots().count(), 0);
    }

    #[test]
    fn rise_then_fall_confirms_one_alternating_pair() {
        // Seed Low at index 0 (100).  The scan starts at index 2; 106 at
        // index 4 is the first high >= 5% above it.  The next scan starts at
        // index 6, where 100 is 5.66% below 106.
        let bars = closes(&[100, 101, 100, 104, 106, 103, 100, 101]);
        let cfg = ZigZagConfig { deviation: dec!(5), depth: 2 };
        let pivots = run(&bars, &cfg);

        assert_eq!(pivots.len(), 3);
        assert_eq!(pivots[0].kind, PivotKind::Low);
        assert_eq!(pivots[0].index, 0);
        assert_eq!(pivots[1].kind, PivotKind::High);
        assert_eq!(pivots[1].index, 4);
        assert_eq!(pivots[1].price, dec!(106));
        assert_eq!(pivots[1].percent_change, dec!(6));
        assert_eq!(pivots[2].kind, PivotKind::Low);
        assert_eq!(pivots[2].index, 6);
        assert_eq!(pivots[2].price, dec!(100));
        assert!(pivots[2].percent_change <= dec!(-5));
    }

    #[test]
    fn lower_low_revises_last_pivot() {
        // Same run as above, but 99 at index 7 undercuts the Low at index 6.
        let bars = closes(&[100, 101, 100, 104, 106, 103, 100, 99]);
        let cfg = ZigZagConfig { deviation: dec!(5), depth: 2 };
        let mut state = ZigZagIndicator.initialize(&bars[..7], &cfg).unwrap();
        let out = ZigZagIndicator.consume(&bars[7], &cfg, &mut state).unwrap();

        let pivots: Vec<ZigZagPivot> = state.pivots().copied().collect();
        assert_eq!(pivots.len(), 3);
        assert_eq!(pivots[2].kind, PivotKind::Low);
        assert_eq!(pivots[2].index, 7);
        assert_eq!(pivots[2].price, dec!(99));
        assert_eq!(pivots[2].percent_change, percent_change(dec!(99), dec!(106)).unwrap());
        assert_eq!(out.values["pivot_count"], dec!(3));
        assert!(out.shapes.is_empty());
    }

    #[test]
    fn seed_picks_earlier_extreme() {
        let bars = closes(&[100, 120, 90, 95]);
        let cfg = ZigZagConfig { deviation: dec!(50), depth: 2 };
        let pivots = run(&bars, &cfg);
        assert_eq!(pivots.len(), 1);
        assert_eq!(pivots[0].kind, PivotKind::High);
        assert_eq!(pivots[0].index, 1);
    }

    #[test]
    fn pivots_alternate_and_meet_threshold() {
        let prices: Vec<i64> = (0..200)
            .map(|i| 1000 + ((i as f64 * 0.21).sin() * 120.0) as i64 + (i % 7) as i64)
            .collect();
        let cfg = ZigZagConfig { deviation: dec!(3), depth: 3 };
        let pivots = run(&closes(&prices), &cfg);

        // Roughly one swing per half period of the wave.
        assert!(pivots.len() >= 10, "only {} pivots", pivots.len());
        for pair in pivots.windows(2) {
            assert_ne!(pair[0].kind, pair[1].kind);
            assert!(pair[1].index >= pair[0].index + cfg.depth as u64);
            assert!(pair[1].percent_change.abs() >= cfg.deviation);
            match pair[1].kind {
                PivotKind::Low => {
                    assert!(pair[1].price < pair[0].price);
                    assert!(pair[1].percent_change < Decimal::ZERO);
                }
                PivotKind::High => {
                    assert!(pair[1].price > pair[0].price);
                    assert!(pair[1].percent_change > Decimal::ZERO);
                }
            }
        }
    }

    #[test]
    fn continuation_extends_high_instead_of_confirming_low() {
        // After the High at 102, price keeps rising.  No Low may be confirmed
        // above it; the High moves up to 126 instead.
        let bars = closes(&[100, 95, 90, 96, 102, 108, 114, 120, 126]);
        let cfg = ZigZagConfig { deviation: dec!(5), depth: 2 };
        let state = ZigZagIndicator.initialize(&bars, &cfg).unwrap();
        let pivots: Vec<ZigZagPivot> = state.pivots().copied().collect();

        assert_eq!(pivots.len(), 3);
        assert_eq!((pivots[0].kind, pivots[0].index), (PivotKind::High, 0));
        assert_eq!((pivots[1].kind, pivots[1].index), (PivotKind::Low, 2));
        assert_eq!(pivots[1].percent_change, dec!(-10));
        assert_eq!((pivots[2].kind, pivots[2].index), (PivotKind::High, 8));
        assert_eq!(pivots[2].price, dec!(126));
        assert_eq!(pivots[2].percent_change, dec!(40));

        let shapes = ZigZagIndicator.shapes(&cfg, &state);
        assert_eq!(
            shapes,
            vec![Shape::Line {
                from_time: pivots[1].timestamp,
                from_price: dec!(90),
                to_time: pivots[2].timestamp,
                to_price: dec!(126),
                style: LineStyle::Solid,
                provisional: true,
            }]
        );
    }

    #[test]
    fn long_one_way_run_keeps_state_bounded() {
        // Seed High 100, a 2% dip, then a 5000-bar rally.
        let mut prices = vec![100, 99, 98, 99];
        prices.extend((1..=5000).map(|k| 100 + k));
        let bars = closes(&prices);
        let cfg = ZigZagConfig { deviation: dec!(5), depth: 2 };

        let early = ZigZagIndicator.initialize(&bars[..204], &cfg).unwrap();
        let mut state = early.clone();
        for bar in &bars[204..] {
            ZigZagIndicator.consume(bar, &cfg, &mut state).unwrap();
        }

        let pivots: Vec<ZigZagPivot> = state.pivots().copied().collect();
        assert_eq!(pivots.len(), 1);
        assert_eq!(pivots[0].kind, PivotKind::High);
        assert_eq!(pivots[0].price, dec!(5100));
        assert_eq!(state.buffered_bars(), 0);

        let early_len = serde_json::to_string(&early).unwrap().len();
        let late_len = serde_json::to_string(&state).unwrap().len();
        assert!(late_len < early_len + 64, "state grew from {early_len} to {late_len} bytes");
    }

    #[test]
    fn emitted_legs_are_final() {
        let bars = closes(&[100, 101, 100, 104, 106, 103, 100, 101]);
        let cfg = ZigZagConfig { deviation: dec!(5), depth: 2 };
        let mut state = ZigZagIndicator.initialize(&bars[..6], &cfg).unwrap();
        let out = ZigZagIndicator.consume(&bars[6], &cfg, &mut state).unwrap();

        // Confirming the Low at index 6 fixes the leg Low 100 -> High 106.
        assert_eq!(
            out.shapes,
            vec![Shape::Line {
                from_time: bars[0].open_time,
                from_price: dec!(100),
                to_time: bars[4].open_time,
                to_price: dec!(106),
                style: LineStyle::Solid,
                provisional: false,
            }]
        );
    }

    #[test]
    fn parameter_defaults_are_numbers() {
        for spec in ZigZagIndicator.parameters() {
            assert!(spec.default.is_number(), "{} default is {}", spec.name, spec.default);
        }
    }

    #[test]
    fn threshold_is_inclusive() {
        // Exactly 5% from the seed high of 100.
        let bars = closes(&[100, 99, 98, 97, 95, 96]);
        let cfg = ZigZagConfig { deviation: dec!(5), depth: 2 };
        let pivots = run(&bars, &cfg);
        assert_eq!(pivots.len(), 2);
        assert_eq!(pivots[1].price, dec!(95));
        assert_eq!(pivots[1].percent_change, dec!(-5));
    }

    #[test]
    fn depth_blocks_early_confirmation() {
        // The 20% drop right after the seed high is inside the depth window;
        // nothing from index 3 on moves 5% away from 100.
        let bars = closes(&[100, 80, 97, 98, 99, 98]);
        let cfg = ZigZagConfig { deviation: dec!(5), depth: 3 };
        let pivots = run(&bars, &cfg);
        assert_eq!(pivots.len(), 1);
        assert_eq!(pivots[0].index, 0);
    }

    #[test]
    fn provisional_leg_is_flagged() {
        let bars = closes(&[100, 102, 104, 103, 102]);
        let cfg = ZigZagConfig { deviation: dec!(10), depth: 1 };
        let state = ZigZagIndicator.initialize(&bars, &cfg).unwrap();
        let shapes = ZigZagIndicator.shapes(&cfg, &state);
        assert_eq!(shapes.len(), 1);
        assert!(matches!(shapes[0], Shape::Line { provisional: true, .. }));
        let values = ZigZagIndicator.values(&cfg, &state);
        assert_eq!(values["provisional_price"], dec!(104));
    }

    #[test]
    fn incremental_equals_single_pass() {
        let prices: Vec<i64> = (0..150)
            .map(|i| 500 + ((i as f64 * 0.3).cos() * 60.0) as i64)
            .collect();
        let bars = closes(&prices);
        let cfg = ZigZagConfig { deviation: dec!(4), depth: 4 };

        let (head, tail) = bars.split_at(40);
        let mut state = ZigZagIndicator.initialize(head, &cfg).unwrap();
        for bar in tail {
            ZigZagIndicator.consume(bar, &cfg, &mut state).unwrap();
        }
        let full = ZigZagIndicator.initialize(&bars, &cfg).unwrap();

        assert_eq!(
            state.pivots().copied().collect::<Vec<_>>(),
            full.pivots().copied().collect::<Vec<_>>()
        );
        assert_eq!(
            serde_json::to_value(&state).unwrap(),
            serde_json::to_value(&full).unwrap()
        );
    }

    #[test]
    fn out_of_order_bar_leaves_state_untouched() {
        let bars = closes(&[100, 102, 105, 108, 110, 109]);
        let cfg = ZigZagConfig { deviation: dec!(5), depth: 2 };
        let mut state = ZigZagIndicator.initialize(&bars, &cfg).unwrap();
        let before = serde_json::to_value(&state).unwrap();

        let stale = flat(3, dec!(50));
        assert!(ZigZagIndicator.consume(&stale, &cfg, &mut state).is_err());
        assert_eq!(serde_json::to_value(&state).unwrap(), before);
    }

    #[test]
    fn validation_ranges() {
        let ind = ZigZagIndicator;
        assert!(ind.validate(&ZigZagConfig::default()).is_ok());
        assert!(ind.validate(&ZigZagConfig { deviation: dec!(0.05), depth: 12 }).is_err());
        assert!(ind.validate(&ZigZagConfig { deviation: dec!(5), depth: 101 }).is_err());
    }
}
