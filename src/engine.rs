// =============================================================================
// Engine — batch and progressive call shapes over the indicator family
// =============================================================================
//
// Callers name an indicator, pass bars plus a flat JSON config, and (for the
// progressive shape) the state envelope returned by their previous call.
// The envelope records which indicator and config produced it, so a change
// of either re-initialises from the supplied bars instead of mixing states.
//
// Everything here works on copies: a rejected call hands nothing back and
// the caller's envelope stays valid.
// =============================================================================

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{EngineError, Result};
use crate::indicators::{
    DivergenceIndicator, FvgIndicator, ParamSpec, ProgressiveIndicator, Shape, SwingIndicator,
    Values, ZigZagIndicator, MAX_RECORDS,
};
use crate::market_data::Bar;

// =============================================================================
// Indicator catalogue
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndicatorKind {
    Swing,
    ZigZag,
    Fvg,
    Divergence,
}

impl IndicatorKind {
    pub const ALL: [IndicatorKind; 4] = [
        IndicatorKind::Swing,
        IndicatorKind::ZigZag,
        IndicatorKind::Fvg,
        IndicatorKind::Divergence,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Swing => "swing",
            Self::ZigZag => "zigzag",
            Self::Fvg => "fvg",
            Self::Divergence => "divergence",
        }
    }
}

impl fmt::Display for IndicatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IndicatorKind {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| EngineError::UnknownIndicator(s.to_string()))
    }
}

/// Catalogue entry served by the indicator listing.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndicatorInfo {
    pub name: IndicatorKind,
    pub parameters: Vec<ParamSpec>,
    /// Warmup under the default configuration.
    pub warmup: usize,
}

// =============================================================================
// Progressive envelope
// =============================================================================

/// Serialisable state handed back to callers between progressive calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressiveState {
    pub indicator: IndicatorKind,
    /// Normalised config (defaults filled in) the inner state was built with.
    pub config: Value,
    pub last_open_time: Option<i64>,
    pub bars_seen: u64,
    pub inner: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressiveResult {
    pub values: Values,
    pub state: ProgressiveState,
    pub auxiliary: Vec<Shape>,
    pub warming_up: bool,
}

// =============================================================================
// Public call shapes
// =============================================================================

/// Stateless snapshot: replay `bars` from empty and return the final values.
pub fn calculate(kind: IndicatorKind, bars: &[Bar], config: &Value) -> Result<Values> {
    calculate_progressive(kind, bars, config, None).map(|r| r.values)
}

/// Advance `previous` (or an empty state) over the bars it has not seen.
pub fn calculate_progressive(
    kind: IndicatorKind,
    bars: &[Bar],
    config: &Value,
    previous: Option<ProgressiveState>,
) -> Result<ProgressiveResult> {
    match kind {
        IndicatorKind::Swing => run(&SwingIndicator, kind, bars, config, previous),
        IndicatorKind::ZigZag => run(&ZigZagIndicator, kind, bars, config, previous),
        IndicatorKind::Fvg => run(&FvgIndicator, kind, bars, config, previous),
        IndicatorKind::Divergence => run(&DivergenceIndicator, kind, bars, config, previous),
    }
}

/// Parse and range-check `config` for `kind`, returning it with defaults filled in.
pub fn normalize_config(kind: IndicatorKind, config: &Value) -> Result<Value> {
    match kind {
        IndicatorKind::Swing => normalize(&SwingIndicator, config),
        IndicatorKind::ZigZag => normalize(&ZigZagIndicator, config),
        IndicatorKind::Fvg => normalize(&FvgIndicator, config),
        IndicatorKind::Divergence => normalize(&DivergenceIndicator, config),
    }
}

pub fn describe() -> Vec<IndicatorInfo> {
    IndicatorKind::ALL.into_iter().map(describe_one).collect()
}

fn describe_one(kind: IndicatorKind) -> IndicatorInfo {
    fn info<I: ProgressiveIndicator>(ind: &I, kind: IndicatorKind) -> IndicatorInfo {
        IndicatorInfo {
            name: kind,
            parameters: ind.parameters(),
            warmup: ind.required_warmup(&I::Config::default()),
        }
    }
    match kind {
        IndicatorKind::Swing => info(&SwingIndicator, kind),
        IndicatorKind::ZigZag => info(&ZigZagIndicator, kind),
        IndicatorKind::Fvg => info(&FvgIndicator, kind),
        IndicatorKind::Divergence => info(&DivergenceIndicator, kind),
    }
}

// =============================================================================
// Generic driver
// =============================================================================

fn parse_config<I: ProgressiveIndicator>(ind: &I, config: &Value) -> Result<I::Config> {
    let parsed = match config {
        Value::Null => I::Config::default(),
        other => serde_json::from_value(other.clone())
            .map_err(|e| EngineError::invalid_config(ind.name(), e.to_string()))?,
    };
    ind.validate(&parsed)?;
    Ok(parsed)
}

fn normalize<I: ProgressiveIndicator>(ind: &I, config: &Value) -> Result<Value> {
    let parsed = parse_config(ind, config)?;
    Ok(serde_json::to_value(parsed)?)
}

fn restore<I: ProgressiveIndicator>(
    ind: &I,
    kind: IndicatorKind,
    normalized: &Value,
    previous: Option<ProgressiveState>,
) -> Result<I::State> {
    let Some(prev) = previous else {
        return Ok(I::State::default());
    };
    if prev.indicator != kind || &prev.config != normalized {
        warn!(
            indicator = ind.name(),
            previous = %prev.indicator,
            "progressive state built with a different indicator or config, re-initialising"
        );
        return Ok(I::State::default());
    }
    serde_json::from_value(prev.inner).map_err(|e| EngineError::StateMismatch(e.to_string()))
}

fn run<I: ProgressiveIndicator>(
    ind: &I,
    kind: IndicatorKind,
    bars: &[Bar],
    config: &Value,
    previous: Option<ProgressiveState>,
) -> Result<ProgressiveResult> {
    let cfg = parse_config(ind, config)?;
    let normalized = serde_json::to_value(&cfg)?;
    let mut state = restore(ind, kind, &normalized, previous)?;

    let start = match ind.last_open_time(&state) {
        Some(last) => bars.partition_point(|b| b.open_time <= last),
        None => 0,
    };
    let fresh = &bars[start..];

    let mut events: Vec<Shape> = Vec::new();
    for bar in fresh {
        let out = ind.consume(bar, &cfg, &mut state)?;
        events.extend(out.shapes);
    }
    if events.len() > MAX_RECORDS {
        events.drain(..events.len() - MAX_RECORDS);
    }

    let warming_up = ind.bars_seen(&state) < ind.required_warmup(&cfg) as u64;
    let values = if warming_up {
        Values::new()
    } else {
        ind.values(&cfg, &state)
    };
    let mut auxiliary = events;
    auxiliary.extend(ind.shapes(&cfg, &state));

    debug!(
        indicator = ind.name(),
        skipped = start,
        consumed = fresh.len(),
        bars_seen = ind.bars_seen(&state),
        warming_up,
        "progressive calculation"
    );

    Ok(ProgressiveResult {
        values,
        state: ProgressiveState {
            indicator: kind,
            config: normalized,
            last_open_time: ind.last_open_time(&state),
            bars_seen: ind.bars_seen(&state),
            inner: serde_json::to_value(&state)?,
        },
        auxiliary,
        warming_up,
    })
}
