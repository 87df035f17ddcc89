//! Error types for environment construction and Q-table persistence.

use thiserror::Error;

use crate::types::{Cell, GridSize};

/// Errors detected while validating an environment configuration.
///
/// Construction fails fast on any of these: once the fixed station layout
/// does not fit the grid, no further invariant can be guaranteed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("at least one charging station is required")]
    NoChargingStations,

    #[error("charging station {0} lies outside the {1} grid")]
    StationOutOfBounds(Cell, GridSize),

    #[error("two charging stations share cell {0}")]
    DuplicateStation(Cell),

    #[error("warehouse {0} lies outside the {1} grid")]
    WarehouseOutOfBounds(Cell, GridSize),

    #[error("warehouse and a charging station share cell {0}")]
    WarehouseOnStation(Cell),

    #[error("low-battery threshold {threshold} must be below max battery {max}")]
    ThresholdAboveMax { threshold: u32, max: u32 },

    #[error("weather zone extent must be at least 1")]
    ZeroWeatherExtent,
}

/// Errors that can occur while saving or loading the Q-table.
#[derive(Debug, Error)]
pub enum TableError {
    #[error("q-table i/o failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed q-table file: {0}")]
    Format(#[from] serde_json::Error),

    #[error("q-table has {found} entries, expected {expected}")]
    ShapeMismatch { expected: usize, found: usize },
}
