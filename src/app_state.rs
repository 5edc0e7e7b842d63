// =============================================================================
// Central Application State — Aurora TA service
// =============================================================================
//
// Ties the engine configuration and the live series store together for the
// HTTP handlers.
//
// Thread safety:
//   - Atomic counter for lock-free version tracking.
//   - parking_lot::RwLock for the config and the error log.
//   - The series store manages its own per-series locking.
// =============================================================================

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;
use serde::Serialize;

use crate::market_data::SeriesStore;
use crate::runtime_config::EngineConfig;

// =============================================================================
// Error Record
// =============================================================================

/// A rejected request kept for the health endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorRecord {
    pub message: String,
    /// Machine-readable code, e.g. `out_of_order_input`.
    pub code: Option<String>,
    /// ISO 8601 timestamp.
    pub at: String,
}

// =============================================================================
// AppState
// =============================================================================

/// Maximum number of recent errors to retain.
const MAX_RECENT_ERRORS: usize = 50;

/// Shared across all handlers via `Arc<AppState>`.
pub struct AppState {
    /// Incremented on every committed live bar push.
    pub state_version: AtomicU64,

    pub engine_config: Arc<RwLock<EngineConfig>>,
    pub config_path: PathBuf,

    pub series_store: Arc<SeriesStore>,

    pub recent_errors: RwLock<Vec<ErrorRecord>>,

    /// Instant when the service was started. Used for uptime calculations.
    pub start_time: std::time::Instant,
}

impl AppState {
    pub fn new(config: EngineConfig, config_path: impl Into<PathBuf>) -> Self {
        let series_store = Arc::new(SeriesStore::new(config.max_bars_per_series));
        Self {
            state_version: AtomicU64::new(0),
            engine_config: Arc::new(RwLock::new(config)),
            config_path: config_path.into(),
            series_store,
            recent_errors: RwLock::new(Vec::new()),
            start_time: std::time::Instant::now(),
        }
    }

    /// Increment the global state version and return the new value.
    pub fn increment_version(&self) -> u64 {
        self.state_version.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn current_state_version(&self) -> u64 {
        self.state_version.load(Ordering::SeqCst)
    }

    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Record an error, keeping only the most recent `MAX_RECENT_ERRORS`.
    pub fn push_error(&self, msg: String, code: Option<String>) {
        let record = ErrorRecord {
            message: msg,
            code,
            at: Utc::now().to_rfc3339(),
        };
        let mut errors = self.recent_errors.write();
        errors.push(record);
        if errors.len() > MAX_RECENT_ERRORS {
            let excess = errors.len() - MAX_RECENT_ERRORS;
            errors.drain(..excess);
        }
    }

    pub fn recent_errors(&self) -> Vec<ErrorRecord> {
        self.recent_errors.read().clone()
    }
}
