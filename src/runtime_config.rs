// =============================================================================
// Engine Configuration — Service settings with atomic save
// =============================================================================
//
// Central configuration for the indicator service: where to listen, how much
// history each live series keeps, which indicators run on the live path and
// with which options.
//
// Persistence uses an atomic tmp + rename pattern to prevent corruption on
// crash.  All fields carry `#[serde(default)]` so that adding new fields
// never breaks loading an older config file.
//
// =============================================================================

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::engine::IndicatorKind;
use crate::indicators::divergence::DivergenceConfig;
use crate::indicators::fvg::FvgConfig;
use crate::indicators::swing::SwingConfig;
use crate::indicators::zigzag::ZigZagConfig;
use crate::indicators::{
    DivergenceIndicator, FvgIndicator, ProgressiveIndicator, SwingIndicator, ZigZagIndicator,
};

pub const DEFAULT_CONFIG_PATH: &str = "engine_config.json";

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_bind_addr() -> String {
    "0.0.0.0:3001".to_string()
}

fn default_max_bars_per_series() -> usize {
    500
}

fn default_enabled() -> Vec<IndicatorKind> {
    IndicatorKind::ALL.to_vec()
}

// =============================================================================
// IndicatorConfigs
// =============================================================================

/// Options applied to each indicator on the live series path.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndicatorConfigs {
    #[serde(default)]
    pub swing: SwingConfig,

    #[serde(default)]
    pub zigzag: ZigZagConfig,

    #[serde(default)]
    pub fvg: FvgConfig,

    #[serde(default)]
    pub divergence: DivergenceConfig,
}

impl IndicatorConfigs {
    /// Config of `kind` as the flat JSON mapping the engine accepts.
    pub fn json_for(&self, kind: IndicatorKind) -> Result<Value> {
        let value = match kind {
            IndicatorKind::Swing => serde_json::to_value(&self.swing),
            IndicatorKind::ZigZag => serde_json::to_value(&self.zigzag),
            IndicatorKind::Fvg => serde_json::to_value(&self.fvg),
            IndicatorKind::Divergence => serde_json::to_value(&self.divergence),
        };
        value.with_context(|| format!("failed to serialise {kind} config"))
    }
}

// =============================================================================
// EngineConfig
// =============================================================================

/// Top-level configuration for the indicator service.
///
/// Every field has a serde default so that older JSON files missing new fields
/// will still deserialise correctly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Address the HTTP API listens on.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Bars of history retained per live series.
    #[serde(default = "default_max_bars_per_series")]
    pub max_bars_per_series: usize,

    /// Indicators advanced on every live bar push.
    #[serde(default = "default_enabled")]
    pub enabled_indicators: Vec<IndicatorKind>,

    #[serde(default)]
    pub indicators: IndicatorConfigs,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            max_bars_per_series: default_max_bars_per_series(),
            enabled_indicators: default_enabled(),
            indicators: IndicatorConfigs::default(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a JSON file at `path`.
    ///
    /// If the file does not exist, returns an error so the caller can fall
    /// back to defaults with a warning.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read engine config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse engine config from {}", path.display()))?;
        config.validate()?;

        info!(
            path = %path.display(),
            enabled = ?config.enabled_indicators,
            max_bars = config.max_bars_per_series,
            "engine config loaded"
        );

        Ok(config)
    }

    /// Persist the current configuration to `path` using an atomic write
    /// (write to `.tmp`, then rename).
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        let content = serde_json::to_string_pretty(self)
            .context("failed to serialise engine config to JSON")?;

        let tmp_path = path.with_extension("json.tmp");

        std::fs::write(&tmp_path, &content)
            .with_context(|| format!("failed to write tmp config to {}", tmp_path.display()))?;

        std::fs::rename(&tmp_path, path)
            .with_context(|| format!("failed to rename tmp config to {}", path.display()))?;

        info!(path = %path.display(), "engine config saved (atomic)");
        Ok(())
    }

    /// Apply `TA_BIND_ADDR` if set.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(addr) = std::env::var("TA_BIND_ADDR") {
            if !addr.trim().is_empty() {
                self.bind_addr = addr.trim().to_string();
            }
        }
    }

    /// Range-check every indicator config and the history limit.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            (10..=100_000).contains(&self.max_bars_per_series),
            "max_bars_per_series {} outside [10, 100000]",
            self.max_bars_per_series
        );
        SwingIndicator.validate(&self.indicators.swing)?;
        ZigZagIndicator.validate(&self.indicators.zigzag)?;
        FvgIndicator.validate(&self.indicators.fvg)?;
        DivergenceIndicator.validate(&self.indicators.divergence)?;
        Ok(())
    }

    /// Enabled indicators paired with their JSON configs, in catalogue order.
    pub fn enabled_configs(&self) -> Result<Vec<(IndicatorKind, Value)>> {
        let mut kinds = self.enabled_indicators.clone();
        kinds.sort();
        kinds.dedup();
        kinds
            .into_iter()
            .map(|kind| Ok((kind, self.indicators.json_for(kind)?)))
            .collect()
    }
}
