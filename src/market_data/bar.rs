use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Data types
// ---------------------------------------------------------------------------

/// A single closed OHLC bar, optionally carrying buy/sell volume split or a
/// precomputed volume delta.
///
/// Times are epoch milliseconds. The upstream source delivers bars in strictly
/// increasing `open_time` order per series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub interval: String,
    pub open_time: i64,
    pub close_time: i64,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buy_volume: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sell_volume: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta: Option<Decimal>,
}

impl Bar {
    /// Net aggressor volume for the bar: the explicit `delta` when present,
    /// otherwise `buy_volume - sell_volume` when both sides are known.
    pub fn volume_delta(&self) -> Option<Decimal> {
        match (self.delta, self.buy_volume, self.sell_volume) {
            (Some(d), _, _) => Some(d),
            (None, Some(buy), Some(sell)) => Some(buy - sell),
            _ => None,
        }
    }

    pub fn key(&self) -> SeriesKey {
        SeriesKey {
            symbol: self.symbol.clone(),
            interval: self.interval.clone(),
        }
    }
}

/// Composite key that identifies a unique bar series.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct SeriesKey {
    pub symbol: String,
    pub interval: String,
}

impl SeriesKey {
    pub fn new(symbol: impl Into<String>, interval: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into().to_uppercase(),
            interval: interval.into(),
        }
    }
}

impl std::fmt::Display for SeriesKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.symbol, self.interval)
    }
}
