use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::{Bar, SeriesKey};
use crate::engine::{calculate_progressive, normalize_config, IndicatorKind, ProgressiveState};
use crate::error::{EngineError, Result};
use crate::indicators::{Shape, Values};

// ---------------------------------------------------------------------------
// Snapshots
// ---------------------------------------------------------------------------

/// Latest output of one indicator on one series.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndicatorReport {
    pub values: Values,
    pub auxiliary: Vec<Shape>,
    pub warming_up: bool,
    pub bars_seen: u64,
}

/// Read-only view of a series handed to the API layer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesSnapshot {
    pub symbol: String,
    pub interval: String,
    pub bar_count: usize,
    pub last_open_time: Option<i64>,
    pub indicators: BTreeMap<IndicatorKind, IndicatorReport>,
}

#[derive(Default)]
struct SeriesEntry {
    bars: VecDeque<Bar>,
    states: BTreeMap<IndicatorKind, ProgressiveState>,
    reports: BTreeMap<IndicatorKind, IndicatorReport>,
}

impl SeriesEntry {
    fn snapshot(&self, key: &SeriesKey) -> SeriesSnapshot {
        SeriesSnapshot {
            symbol: key.symbol.clone(),
            interval: key.interval.clone(),
            bar_count: self.bars.len(),
            last_open_time: self.bars.back().map(|b| b.open_time),
            indicators: self.reports.clone(),
        }
    }

    fn push(
        &mut self,
        key: &SeriesKey,
        bars: Vec<Bar>,
        enabled: &[(IndicatorKind, Value)],
        max_bars: usize,
    ) -> Result<SeriesSnapshot> {
        let mut last = self.bars.back().map(|b| b.open_time);
        for bar in &bars {
            if let Some(prev) = last {
                if bar.open_time <= prev {
                    warn!(series = %key, last = prev, got = bar.open_time, "rejecting out-of-order bar");
                    return Err(EngineError::OutOfOrderInput {
                        last: prev,
                        got: bar.open_time,
                    });
                }
            }
            last = Some(bar.open_time);
        }

        let bars: Vec<Bar> = bars
            .into_iter()
            .map(|mut b| {
                b.symbol = key.symbol.clone();
                b.interval = key.interval.clone();
                b
            })
            .collect();

        let mut updates = Vec::with_capacity(enabled.len());
        for (kind, config) in enabled {
            let normalized = normalize_config(*kind, config)?;
            let result = match self.states.get(kind) {
                Some(prev) if prev.config == normalized => {
                    calculate_progressive(*kind, &bars, config, Some(prev.clone()))?
                }
                _ => {
                    // New indicator or changed config: rebuild from retained history.
                    let replay: Vec<Bar> = self.bars.iter().chain(bars.iter()).cloned().collect();
                    debug!(series = %key, indicator = %kind, bars = replay.len(), "replaying history");
                    calculate_progressive(*kind, &replay, config, None)?
                }
            };
            updates.push((*kind, result));
        }

        let enabled_kinds: Vec<IndicatorKind> = enabled.iter().map(|(k, _)| *k).collect();
        self.states.retain(|k, _| enabled_kinds.contains(k));
        self.reports.retain(|k, _| enabled_kinds.contains(k));
        for (kind, result) in updates {
            self.reports.insert(
                kind,
                IndicatorReport {
                    values: result.values,
                    auxiliary: result.auxiliary,
                    warming_up: result.warming_up,
                    bars_seen: result.state.bars_seen,
                },
            );
            self.states.insert(kind, result.state);
        }

        self.bars.extend(bars);
        while self.bars.len() > max_bars {
            self.bars.pop_front();
        }

        Ok(self.snapshot(key))
    }
}

// ---------------------------------------------------------------------------
// SeriesStore -- per (symbol, interval) bar history plus indicator states
// ---------------------------------------------------------------------------

/// Thread-safe store of live series.  The outer map lock is held only long
/// enough to find an entry (or, on a first push, to build one); each entry
/// has its own mutex so that writers to one series never block another.
pub struct SeriesStore {
    series: RwLock<HashMap<SeriesKey, Arc<Mutex<SeriesEntry>>>>,
    max_bars: usize,
}

impl SeriesStore {
    /// Create a store that retains at most `max_bars` bars per series.
    pub fn new(max_bars: usize) -> Self {
        Self {
            series: RwLock::new(HashMap::new()),
            max_bars,
        }
    }

    /// Append closed bars to `key` and advance every enabled indicator.
    ///
    /// All-or-nothing: bars must be strictly newer than the stored history
    /// and each indicator must accept them, otherwise nothing is committed.
    /// A series only appears in the store once a push to it succeeds.
    pub fn push_bars(
        &self,
        key: &SeriesKey,
        bars: Vec<Bar>,
        enabled: &[(IndicatorKind, Value)],
    ) -> Result<SeriesSnapshot> {
        let existing = self.series.read().get(key).cloned();
        if let Some(entry) = existing {
            return entry.lock().push(key, bars, enabled, self.max_bars);
        }

        // First push: build the entry outside the map and publish it only if
        // the bars are accepted.  The write lock keeps a concurrent first
        // push from racing it.
        let mut map = self.series.write();
        if let Some(entry) = map.get(key).cloned() {
            drop(map);
            return entry.lock().push(key, bars, enabled, self.max_bars);
        }
        let mut fresh = SeriesEntry::default();
        let snapshot = fresh.push(key, bars, enabled, self.max_bars)?;
        if !fresh.bars.is_empty() {
            info!(series = %key, "new series");
            map.insert(key.clone(), Arc::new(Mutex::new(fresh)));
        }
        Ok(snapshot)
    }

    pub fn snapshot(&self, key: &SeriesKey) -> Option<SeriesSnapshot> {
        let entry = self.series.read().get(key).cloned()?;
        let entry = entry.lock();
        Some(entry.snapshot(key))
    }

    /// Return the most recent `count` bars (oldest-first order).
    pub fn recent_bars(&self, key: &SeriesKey, count: usize) -> Vec<Bar> {
        let Some(entry) = self.series.read().get(key).cloned() else {
            return Vec::new();
        };
        let entry = entry.lock();
        let start = entry.bars.len().saturating_sub(count);
        entry.bars.iter().skip(start).cloned().collect()
    }

    pub fn keys(&self) -> Vec<SeriesKey> {
        self.series.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.series.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
