//! Shared resource registry: live positions, assignments, and counters.
//!
//! All mutation goes through the transition engine's commit step; obstacle
//! and target computations are pure reads over the current registry plus the
//! querying drone's own battery/payload state.

use std::collections::HashSet;

use rand::Rng;

use crate::config::EnvConfig;
use crate::types::Cell;

/// Live registry of the shared world facts: the warehouse cell, per-drone
/// charging stations, current drone positions, active delivery assignments,
/// and the resource counters.
///
/// Positions are updated in place as each drone commits its tick, so a
/// later-indexed drone stepped within the same round observes the already
/// moved position of an earlier drone. That sequential visibility is load
/// bearing: it prevents two drones from swapping into each other's vacated
/// cells in one round.
#[derive(Debug, Clone)]
pub struct ResourceRegistry {
    warehouse: Cell,
    charging_stations: Vec<Cell>,
    /// Current position of each drone.
    pub drone_positions: Vec<Cell>,
    /// Active delivery assignment per drone, if any.
    pub delivery_points: Vec<Option<Cell>>,
    /// Undelivered items left in the warehouse. Decrements on pickup and is
    /// never replenished within an episode.
    pub items_remaining: u32,
    /// Completed deliveries per drone; monotonic within an episode.
    pub deliveries_completed: Vec<u32>,
}

impl ResourceRegistry {
    /// Builds the registry for the start of an episode: every drone parked
    /// at its station, no assignments, a full warehouse.
    pub fn new(config: &EnvConfig) -> Self {
        let n = config.num_drones();
        Self {
            warehouse: config.warehouse,
            charging_stations: config.charging_stations.clone(),
            drone_positions: config.charging_stations.clone(),
            delivery_points: vec![None; n],
            items_remaining: config.warehouse_items,
            deliveries_completed: vec![0; n],
        }
    }

    /// The shared warehouse cell.
    pub fn warehouse(&self) -> Cell {
        self.warehouse
    }

    /// The charging station assigned to `drone_index`.
    pub fn station_for(&self, drone_index: usize) -> Cell {
        self.charging_stations[drone_index]
    }

    /// Number of registered drones.
    pub fn num_drones(&self) -> usize {
        self.charging_stations.len()
    }

    /// Computes the obstacle set for one drone, fresh from the live
    /// registry. Never cached: other drones' positions change every tick.
    ///
    /// Included cells:
    /// - every other drone's assigned delivery cell,
    /// - every other drone's charging station,
    /// - this drone's own station, but only while its battery exceeds the
    ///   low threshold and undelivered items remain (otherwise the station
    ///   must stay reachable so the drone can dock),
    /// - every other drone's current position,
    /// - the warehouse, when this drone is laden.
    pub fn obstacles_for(
        &self,
        drone_index: usize,
        battery: u32,
        has_package: bool,
        low_battery_threshold: u32,
    ) -> HashSet<Cell> {
        let mut obstacles = HashSet::new();

        for (i, point) in self.delivery_points.iter().enumerate() {
            if i != drone_index {
                if let Some(cell) = point {
                    obstacles.insert(*cell);
                }
            }
        }

        for (i, station) in self.charging_stations.iter().enumerate() {
            if i != drone_index {
                obstacles.insert(*station);
            }
        }

        if battery > low_battery_threshold && self.items_remaining > 0 {
            obstacles.insert(self.charging_stations[drone_index]);
        }

        for (i, position) in self.drone_positions.iter().enumerate() {
            if i != drone_index {
                obstacles.insert(*position);
            }
        }

        if has_package {
            obstacles.insert(self.warehouse);
        }

        obstacles
    }

    /// Resolves the current goal cell for one drone.
    ///
    /// Priority: charging station when the mission is over for this drone
    /// (nothing left to deliver and nothing carried) or battery is low;
    /// otherwise the assigned delivery cell when laden; otherwise the
    /// warehouse. Pure function of the current counters.
    pub fn target_for(
        &self,
        drone_index: usize,
        battery: u32,
        has_package: bool,
        low_battery_threshold: u32,
    ) -> Cell {
        if (self.items_remaining == 0 && !has_package) || battery < low_battery_threshold {
            return self.charging_stations[drone_index];
        }
        if has_package {
            if let Some(point) = self.delivery_points[drone_index] {
                return point;
            }
        }
        self.warehouse
    }

    /// Records a completed delivery and clears the drone's assignment.
    pub fn record_delivery(&mut self, drone_index: usize) {
        self.deliveries_completed[drone_index] += 1;
        self.delivery_points[drone_index] = None;
    }

    /// Removes one item from the warehouse stock.
    pub fn take_item(&mut self) {
        self.items_remaining -= 1;
    }

    /// Samples a fresh delivery cell for `drone_index` and stores it.
    ///
    /// Rejection-samples uniformly over the grid until the candidate avoids
    /// the warehouse, every charging station, every currently assigned
    /// delivery cell, and every drone's current position.
    pub fn assign_delivery_point<R: Rng>(
        &mut self,
        drone_index: usize,
        grid: crate::types::GridSize,
        rng: &mut R,
    ) -> Cell {
        let cell = loop {
            let candidate = Cell::new(rng.gen_range(0..grid.rows), rng.gen_range(0..grid.cols));
            if candidate != self.warehouse
                && !self.charging_stations.contains(&candidate)
                && !self.delivery_points.contains(&Some(candidate))
                && !self.drone_positions.contains(&candidate)
            {
                break candidate;
            }
        };
        self.delivery_points[drone_index] = Some(cell);
        cell
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn registry() -> ResourceRegistry {
        ResourceRegistry::new(&EnvConfig::default())
    }

    #[test]
    fn obstacles_include_other_drones_and_stations() {
        let reg = registry();
        let obstacles = reg.obstacles_for(0, 39, false, 20);
        // Other drones sit on their own stations, so both show up once.
        assert!(obstacles.contains(&Cell::new(6, 0)));
        assert!(obstacles.contains(&Cell::new(0, 6)));
        // Healthy battery with stock remaining: own station is blocked too.
        assert!(obstacles.contains(&Cell::new(3, 3)));
        // Unladen: the warehouse stays open.
        assert!(!obstacles.contains(&reg.warehouse()));
    }

    #[test]
    fn own_station_reachable_when_battery_low() {
        let reg = registry();
        let obstacles = reg.obstacles_for(0, 10, false, 20);
        assert!(!obstacles.contains(&Cell::new(3, 3)));
    }

    #[test]
    fn own_station_reachable_when_stock_exhausted() {
        let mut reg = registry();
        reg.items_remaining = 0;
        let obstacles = reg.obstacles_for(0, 39, false, 20);
        assert!(!obstacles.contains(&Cell::new(3, 3)));
    }

    #[test]
    fn warehouse_blocked_when_laden() {
        let reg = registry();
        let obstacles = reg.obstacles_for(0, 39, true, 20);
        assert!(obstacles.contains(&reg.warehouse()));
    }

    #[test]
    fn other_delivery_points_are_obstacles() {
        let mut reg = registry();
        reg.delivery_points[1] = Some(Cell::new(2, 2));
        let obstacles = reg.obstacles_for(0, 39, false, 20);
        assert!(obstacles.contains(&Cell::new(2, 2)));
        // A drone's own assignment is never its obstacle.
        let own = reg.obstacles_for(1, 39, false, 20);
        assert!(!own.contains(&Cell::new(2, 2)));
    }

    #[test]
    fn target_priority_order() {
        let mut reg = registry();
        // Plenty of stock, healthy battery, unladen: head for the warehouse.
        assert_eq!(reg.target_for(0, 39, false, 20), reg.warehouse());
        // Low battery beats everything.
        assert_eq!(reg.target_for(0, 5, false, 20), Cell::new(3, 3));
        // Laden with an assignment: the delivery cell.
        reg.delivery_points[0] = Some(Cell::new(1, 1));
        assert_eq!(reg.target_for(0, 39, true, 20), Cell::new(1, 1));
        // Stock exhausted and unladen: back to the station.
        reg.items_remaining = 0;
        assert_eq!(reg.target_for(0, 39, false, 20), Cell::new(3, 3));
    }

    #[test]
    fn target_resolution_is_idempotent() {
        let reg = registry();
        let first = reg.target_for(0, 39, false, 20);
        let second = reg.target_for(0, 39, false, 20);
        assert_eq!(first, second);
    }

    #[test]
    fn sampled_delivery_point_avoids_occupied_cells() {
        let config = EnvConfig::default();
        let mut rng = StdRng::seed_from_u64(7);
        for seed_round in 0..50 {
            let mut reg = ResourceRegistry::new(&config);
            reg.delivery_points[1] = Some(Cell::new(1, 1));
            let cell = reg.assign_delivery_point(0, config.grid, &mut rng);
            assert!(config.grid.contains(cell), "round {}", seed_round);
            assert_ne!(cell, reg.warehouse());
            assert_ne!(cell, Cell::new(1, 1));
            assert!(!config.charging_stations.contains(&cell));
            assert!(!reg.drone_positions.contains(&cell));
            assert_eq!(reg.delivery_points[0], Some(cell));
        }
    }

    #[test]
    fn record_delivery_clears_assignment() {
        let mut reg = registry();
        reg.delivery_points[2] = Some(Cell::new(4, 4));
        reg.record_delivery(2);
        assert_eq!(reg.deliveries_completed[2], 1);
        assert_eq!(reg.delivery_points[2], None);
    }
}
