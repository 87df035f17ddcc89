//! Per-drone state.

use std::collections::VecDeque;

use crate::types::{Cell, RelativeTarget};

/// State of a single drone.
///
/// Position and battery evolve through the transition engine; the obstacle
/// flags, relative target direction, and circumnavigation flag together form
/// the discretized state the learning policy observes. Battery, position,
/// and payload are deliberately excluded from the learned state; they only
/// drive which target and obstacle set get computed.
#[derive(Debug, Clone, PartialEq)]
pub struct DroneState {
    /// Current grid cell.
    pub position: Cell,
    /// Battery level in `[0, max_battery]`. Monotonically non-increasing
    /// except at a recharge event, which resets it to the maximum.
    pub battery: u32,
    /// Adjacency hazard flags as of the last observation.
    pub obstacle_up: bool,
    pub obstacle_down: bool,
    pub obstacle_left: bool,
    pub obstacle_right: bool,
    /// Whether the drone currently carries a package.
    pub has_package: bool,
    /// Ticks remaining before a recharge completes; only ever non-zero
    /// outside training mode.
    pub charging_timer: f64,
    /// Dominant direction toward the current goal cell.
    pub relative_target: RelativeTarget,
    /// Whether a planned detour is currently required.
    pub circumnavigating: bool,
    /// Not-yet-visited cells of the planned detour, front first. Empty when
    /// the drone is not navigating around a hazard or obstacle. May go
    /// stale and is recomputed on a detected collision.
    pub detour_path: VecDeque<Cell>,
}

impl DroneState {
    /// Boot state for a drone parked at its charging station.
    pub fn docked(station: Cell, max_battery: u32) -> Self {
        Self {
            position: station,
            battery: max_battery.saturating_sub(1),
            obstacle_up: false,
            obstacle_down: false,
            obstacle_left: false,
            obstacle_right: false,
            has_package: false,
            charging_timer: 0.0,
            relative_target: RelativeTarget::None,
            circumnavigating: false,
            detour_path: VecDeque::new(),
        }
    }

    /// Returns the obstacle flag for the given direction.
    pub fn obstacle_toward(&self, direction: RelativeTarget) -> bool {
        match direction {
            RelativeTarget::Up => self.obstacle_up,
            RelativeTarget::Down => self.obstacle_down,
            RelativeTarget::Left => self.obstacle_left,
            RelativeTarget::Right => self.obstacle_right,
            RelativeTarget::None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn docked_drone_starts_clean() {
        let state = DroneState::docked(Cell::new(3, 3), 40);
        assert_eq!(state.position, Cell::new(3, 3));
        assert_eq!(state.battery, 39);
        assert!(!state.has_package);
        assert!(!state.circumnavigating);
        assert_eq!(state.relative_target, RelativeTarget::None);
        assert!(state.detour_path.is_empty());
    }

    #[test]
    fn obstacle_toward_reads_flags() {
        let mut state = DroneState::docked(Cell::new(0, 0), 40);
        state.obstacle_left = true;
        assert!(state.obstacle_toward(RelativeTarget::Left));
        assert!(!state.obstacle_toward(RelativeTarget::Right));
        assert!(!state.obstacle_toward(RelativeTarget::None));
    }
}
