// =============================================================================
// Shared types used across the Aurora progressive indicator engine
// =============================================================================

use serde::{Deserialize, Serialize};

/// Which side of the range an extremum sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PivotKind {
    High,
    Low,
}

impl PivotKind {
    /// The kind a zigzag leg from `self` must end on.
    pub fn opposite(self) -> Self {
        match self {
            Self::High => Self::Low,
            Self::Low => Self::High,
        }
    }

    /// Numeric code used in flat value maps: High = 1, Low = -1.
    pub fn code(self) -> i64 {
        match self {
            Self::High => 1,
            Self::Low => -1,
        }
    }
}

impl std::fmt::Display for PivotKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::High => write!(f, "High"),
            Self::Low => write!(f, "Low"),
        }
    }
}

/// Stroke style of an auxiliary line. Colours are left to the presentation
/// layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LineStyle {
    Solid,
    Dashed,
}

impl Default for LineStyle {
    fn default() -> Self {
        Self::Solid
    }
}
