//! Configuration for the delivery environment and learning parameters.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::types::{Cell, GridSize};

/// Configuration for the drone delivery environment.
///
/// Controls grid geometry, the fixed warehouse/charging-station layout,
/// battery and charging dynamics, weather-zone tuning, and the Q-learning
/// hyperparameters. Defaults reproduce the reference scenario: a 7×7 grid
/// with three drones. Deserializes with per-field defaults, so a config
/// file only needs to name the fields it overrides.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvConfig {
    // --- Grid layout ---
    /// Grid dimensions.
    pub grid: GridSize,
    /// The single shared warehouse cell.
    pub warehouse: Cell,
    /// One charging station per drone; the number of stations determines
    /// the number of drones.
    pub charging_stations: Vec<Cell>,

    // --- Resources ---
    /// Items stocked in the warehouse at the start of an episode.
    pub warehouse_items: u32,

    // --- Battery ---
    /// Maximum battery level.
    pub max_battery: u32,
    /// Battery level below which a drone must return to its charging
    /// station before anything else.
    pub low_battery_threshold: u32,
    /// Full-charge duration in ticks; actual charging timers are scaled
    /// by the battery deficit.
    pub charging_time: f64,

    // --- Weather ---
    /// A new zone spawns with probability 1/(frequency + 1) per tick.
    pub weather_frequency: u32,
    /// Lifetime of a freshly spawned zone, in ticks.
    pub weather_lifetime: u32,
    /// Maximum width/height of a spawned zone, in cells.
    pub weather_max_extent: usize,

    // --- Learning ---
    /// TD-update learning rate.
    pub alpha: f64,
    /// Discount factor.
    pub gamma: f64,
    /// Initial exploration rate; drivers decay it between episodes.
    pub epsilon: f64,
    /// In training mode recharging is instantaneous (no charging timer),
    /// which keeps episodes short.
    pub training_mode: bool,
}

impl EnvConfig {
    /// Number of drones, one per charging station.
    pub fn num_drones(&self) -> usize {
        self.charging_stations.len()
    }

    /// Validates the configuration.
    ///
    /// Fails when the station/warehouse layout does not fit the grid,
    /// stations overlap, or the battery thresholds are inconsistent.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.charging_stations.is_empty() {
            return Err(ConfigError::NoChargingStations);
        }
        for (i, station) in self.charging_stations.iter().enumerate() {
            if !self.grid.contains(*station) {
                return Err(ConfigError::StationOutOfBounds(*station, self.grid));
            }
            if self.charging_stations[..i].contains(station) {
                return Err(ConfigError::DuplicateStation(*station));
            }
        }
        if !self.grid.contains(self.warehouse) {
            return Err(ConfigError::WarehouseOutOfBounds(self.warehouse, self.grid));
        }
        if self.charging_stations.contains(&self.warehouse) {
            return Err(ConfigError::WarehouseOnStation(self.warehouse));
        }
        if self.low_battery_threshold >= self.max_battery {
            return Err(ConfigError::ThresholdAboveMax {
                threshold: self.low_battery_threshold,
                max: self.max_battery,
            });
        }
        if self.weather_max_extent == 0 {
            return Err(ConfigError::ZeroWeatherExtent);
        }
        Ok(())
    }
}

impl Default for EnvConfig {
    fn default() -> Self {
        let grid = GridSize::new(7, 7);
        Self {
            grid,
            warehouse: Cell::new(grid.rows / 2, grid.cols - 1),
            charging_stations: vec![Cell::new(3, 3), Cell::new(6, 0), Cell::new(0, 6)],
            warehouse_items: 20,
            max_battery: 40,
            low_battery_threshold: 20,
            charging_time: 7.0,
            weather_frequency: 20,
            weather_lifetime: 20,
            weather_max_extent: 3,
            alpha: 0.1,
            gamma: 0.9,
            epsilon: 0.5,
            training_mode: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let cfg = EnvConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.num_drones(), 3);
    }

    #[test]
    fn station_outside_grid_rejected() {
        let cfg = EnvConfig {
            grid: GridSize::new(5, 5),
            warehouse: Cell::new(2, 4),
            charging_stations: vec![Cell::new(3, 3), Cell::new(6, 0)],
            ..EnvConfig::default()
        };
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::StationOutOfBounds(Cell::new(6, 0), cfg.grid))
        );
    }

    #[test]
    fn duplicate_stations_rejected() {
        let cfg = EnvConfig {
            charging_stations: vec![Cell::new(3, 3), Cell::new(3, 3)],
            ..EnvConfig::default()
        };
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::DuplicateStation(Cell::new(3, 3)))
        );
    }

    #[test]
    fn warehouse_on_station_rejected() {
        let cfg = EnvConfig {
            warehouse: Cell::new(3, 3),
            ..EnvConfig::default()
        };
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::WarehouseOnStation(Cell::new(3, 3)))
        );
    }

    #[test]
    fn partial_config_file_fills_defaults() {
        let cfg: EnvConfig =
            serde_json::from_str(r#"{"warehouse_items": 5, "training_mode": false}"#).unwrap();
        assert_eq!(cfg.warehouse_items, 5);
        assert!(!cfg.training_mode);
        assert_eq!(cfg.grid, GridSize::new(7, 7));
        assert_eq!(cfg.max_battery, 40);
    }

    #[test]
    fn threshold_must_be_below_max() {
        let cfg = EnvConfig {
            max_battery: 20,
            low_battery_threshold: 20,
            ..EnvConfig::default()
        };
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::ThresholdAboveMax {
                threshold: 20,
                max: 20
            })
        );
    }
}
