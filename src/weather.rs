//! Stochastic weather hazards.
//!
//! Rectangular zones spawn with a fixed small probability each tick, age,
//! and expire. A drone inside a zone loses one extra battery unit per tick;
//! a drone whose straight-line route would cross two consecutive affected
//! cells plans a detour around the zone instead.

use std::collections::HashSet;

use rand::Rng;

use crate::config::EnvConfig;
use crate::types::{Cell, GridSize, RelativeTarget};
use crate::{generate_id, Id};

/// A transient rectangular hazard zone.
///
/// Covers `height` rows by `width` cols from the anchor cell. Owned
/// exclusively by the environment and discarded when its lifetime reaches
/// zero; never referenced across ticks by any drone.
#[derive(Debug, Clone)]
pub struct WeatherZone {
    /// Stable identifier, for renderers tracking zones across ticks.
    pub id: Id,
    /// Top-left cell of the rectangle.
    pub anchor: Cell,
    /// Extent in columns.
    pub width: usize,
    /// Extent in rows.
    pub height: usize,
    /// Remaining ticks before the zone dissipates.
    pub lifetime: u32,
}

impl WeatherZone {
    /// Returns true if `cell` lies inside this zone's rectangle.
    pub fn covers(&self, cell: Cell) -> bool {
        cell.row >= self.anchor.row
            && cell.row < self.anchor.row + self.height
            && cell.col >= self.anchor.col
            && cell.col < self.anchor.col + self.width
    }
}

/// Spawn, expiry, and hazard queries for the active weather zones.
#[derive(Debug, Clone)]
pub struct WeatherSystem {
    zones: Vec<WeatherZone>,
    frequency: u32,
    lifetime: u32,
    max_extent: usize,
}

impl WeatherSystem {
    /// Creates an empty weather system with the configured tuning.
    pub fn new(config: &EnvConfig) -> Self {
        Self {
            zones: Vec::new(),
            frequency: config.weather_frequency,
            lifetime: config.weather_lifetime,
            max_extent: config.weather_max_extent,
        }
    }

    /// Currently active zones.
    pub fn zones(&self) -> &[WeatherZone] {
        &self.zones
    }

    /// Advances the weather by one tick: maybe spawn one new zone, drop
    /// expired zones, then age the survivors.
    pub fn tick<R: Rng>(&mut self, rng: &mut R, grid: GridSize) {
        if rng.gen_range(0..=self.frequency) == 0 {
            self.spawn(rng, grid);
        }
        self.zones.retain(|zone| zone.lifetime > 0);
        for zone in &mut self.zones {
            zone.lifetime -= 1;
        }
    }

    /// Removes all active zones (episode reset).
    pub fn clear(&mut self) {
        self.zones.clear();
    }

    #[cfg(test)]
    pub(crate) fn push_zone(&mut self, zone: WeatherZone) {
        self.zones.push(zone);
    }

    fn spawn<R: Rng>(&mut self, rng: &mut R, grid: GridSize) {
        let anchor = Cell::new(rng.gen_range(0..grid.rows), rng.gen_range(0..grid.cols));
        self.zones.push(WeatherZone {
            id: generate_id(),
            anchor,
            width: rng.gen_range(1..=self.max_extent),
            height: rng.gen_range(1..=self.max_extent),
            lifetime: self.lifetime,
        });
    }

    /// Returns true if any active zone covers `cell`.
    pub fn covers(&self, cell: Cell) -> bool {
        self.zones.iter().any(|zone| zone.covers(cell))
    }

    /// Extra battery drain at `position`: 1 inside any active zone, else 0.
    pub fn battery_drain(&self, position: Cell) -> u32 {
        u32::from(self.covers(position))
    }

    /// Every cell currently inside any active zone.
    ///
    /// Zones spawned near the far edges may extend past the grid; the
    /// out-of-range cells are harmless since the planner bounds-checks
    /// before consulting the blocked set.
    pub fn blocked_cells(&self) -> HashSet<Cell> {
        let mut cells = HashSet::new();
        for zone in &self.zones {
            for row in zone.anchor.row..zone.anchor.row + zone.height {
                for col in zone.anchor.col..zone.anchor.col + zone.width {
                    cells.insert(Cell::new(row, col));
                }
            }
        }
        cells
    }

    /// Returns true if walking straight from `position` toward `target` in
    /// `direction` would cross at least two consecutive weather-affected
    /// cells.
    ///
    /// A single brush with a hazard is tolerated; it costs one battery unit
    /// but does not justify the churn of replanning.
    pub fn needs_detour(&self, position: Cell, target: Cell, direction: RelativeTarget) -> bool {
        let (dr, dc) = match direction.delta() {
            Some(delta) => delta,
            None => return false,
        };
        let steps = if dr != 0 {
            position.row.abs_diff(target.row)
        } else {
            position.col.abs_diff(target.col)
        };

        let mut consecutive = 0u32;
        let mut cell = position;
        for _ in 0..steps {
            cell = match cell.offset(dr, dc) {
                Some(next) => next,
                None => break,
            };
            if self.covers(cell) {
                consecutive += 1;
                if consecutive >= 2 {
                    return true;
                }
            } else {
                consecutive = 0;
            }
        }
        false
    }
}
