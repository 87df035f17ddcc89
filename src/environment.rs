//! The delivery environment and per-drone transition engine.
//!
//! Implements one synchronous tick for one drone: charging countdown,
//! action application, movement with collision rollback, detour replanning,
//! recharge, delivery/pickup, next-state recomputation, and reward
//! assignment. Drones are stepped in fixed index order by the caller; a
//! later-indexed drone observes the already-committed position of an
//! earlier drone in the same round.

use std::collections::HashSet;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::warn;

use crate::config::EnvConfig;
use crate::drone::DroneState;
use crate::error::ConfigError;
use crate::planner;
use crate::policy::{QTable, StateKey};
use crate::registry::ResourceRegistry;
use crate::types::{Action, Cell, RelativeTarget};
use crate::weather::{WeatherSystem, WeatherZone};

/// Reward for taking the circumnavigate action while a detour is required.
const REWARD_DETOUR_TAKEN: f64 = 50.0;
/// Penalty for any other action while a detour is required.
const REWARD_DETOUR_MISSED: f64 = -50.0;
/// Penalty for circumnavigating when no detour is required.
const REWARD_DETOUR_SPURIOUS: f64 = -30.0;
/// Penalty for moving toward a cell already flagged as an obstacle.
const REWARD_INTO_OBSTACLE: f64 = -20.0;
/// Reward for moving in the relative target direction.
const REWARD_TOWARD_TARGET: f64 = 10.0;
/// Penalty for any other directional move.
const REWARD_OFF_COURSE: f64 = -5.0;

/// Result of a single drone tick.
#[derive(Debug, Clone)]
pub struct StepOutcome {
    /// The drone's committed post-tick state.
    pub state: DroneState,
    /// Accumulated reward for this tick.
    pub reward: f64,
    /// True only when the drone's mission is complete: no warehouse items
    /// remain, the drone is unladen, and it is parked at its station.
    pub done: bool,
}

/// The multi-drone delivery environment.
///
/// Owns the grid registry, the weather system, the shared Q-table, and one
/// [`DroneState`] per charging station. Single-threaded and turn-based:
/// every operation runs to completion before the next.
///
/// # Lifecycle
///
/// 1. Build with [`DroneDeliveryEnv::new`] (validates the configuration).
/// 2. Call [`DroneDeliveryEnv::reset`] to start an episode.
/// 3. For each drone in index order, pick an action with
///    [`DroneDeliveryEnv::choose_action`] and apply it with
///    [`DroneDeliveryEnv::step`]; feed the transition back through
///    [`DroneDeliveryEnv::update_q_table`] when training.
#[derive(Debug)]
pub struct DroneDeliveryEnv {
    config: EnvConfig,
    drones: Vec<DroneState>,
    registry: ResourceRegistry,
    weather: WeatherSystem,
    q_table: QTable,
    /// Exploration rate; drivers decay it between episodes.
    pub epsilon: f64,
    rng: StdRng,
    seed: u64,
}

impl DroneDeliveryEnv {
    /// Creates a new environment with the given configuration and RNG seed.
    ///
    /// Fails fast when the configuration cannot support the fixed layout.
    pub fn new(config: EnvConfig, seed: u64) -> Result<Self, ConfigError> {
        config.validate()?;
        let drones = config
            .charging_stations
            .iter()
            .map(|station| DroneState::docked(*station, config.max_battery))
            .collect();
        let registry = ResourceRegistry::new(&config);
        let weather = WeatherSystem::new(&config);
        Ok(Self {
            epsilon: config.epsilon,
            drones,
            registry,
            weather,
            q_table: QTable::new(),
            rng: StdRng::seed_from_u64(seed),
            seed,
            config,
        })
    }

    /// Resets the environment for a new episode and returns the boot state
    /// of every drone.
    ///
    /// Reseeds the RNG (bumping the stored seed so episodes differ but stay
    /// reproducible), clears active weather, and restocks the warehouse.
    /// The learned Q-table survives resets.
    pub fn reset(&mut self) -> Vec<DroneState> {
        self.rng = StdRng::seed_from_u64(self.seed);
        self.seed += 1;
        self.drones = self
            .config
            .charging_stations
            .iter()
            .map(|station| DroneState::docked(*station, self.config.max_battery))
            .collect();
        self.registry = ResourceRegistry::new(&self.config);
        self.weather.clear();
        self.drones.clone()
    }

    /// Selects an action for the given drone state via the shared policy.
    pub fn choose_action(&mut self, state: &DroneState) -> Action {
        self.q_table
            .choose_action(StateKey::from_drone(state), self.epsilon, &mut self.rng)
    }

    /// Applies the one-step TD update for an observed transition.
    pub fn update_q_table(
        &mut self,
        state: &DroneState,
        action: Action,
        reward: f64,
        next_state: &DroneState,
    ) {
        self.q_table.update(
            StateKey::from_drone(state),
            action,
            reward,
            StateKey::from_drone(next_state),
            self.config.alpha,
            self.config.gamma,
        );
    }

    /// Advances one drone by one tick.
    ///
    /// `action` is the raw action value; out-of-range values are logged and
    /// coerced to skip, never fatal.
    pub fn step(&mut self, drone_index: usize, action: usize) -> StepOutcome {
        let mut state = self.drones[drone_index].clone();

        self.weather.tick(&mut self.rng, self.config.grid);

        // Charging countdown: everything else waits for the timer.
        if state.charging_timer > 0.0 {
            state.charging_timer = (state.charging_timer - 1.0).max(0.0);
            self.drones[drone_index] = state.clone();
            return StepOutcome {
                state,
                reward: 0.0,
                done: false,
            };
        }

        // Mission complete: nothing to deliver, nothing carried, parked.
        let station = self.registry.station_for(drone_index);
        if self.registry.items_remaining == 0 && !state.has_package && state.position == station {
            return StepOutcome {
                state,
                reward: 0.0,
                done: true,
            };
        }

        let action = match Action::from_index(action) {
            Some(action) => action,
            None => {
                warn!(
                    drone = drone_index,
                    action,
                    name = Action::name_of(action),
                    "invalid action value, coercing to skip"
                );
                Action::Skip
            }
        };

        let low = self.config.low_battery_threshold;
        let origin = state.position;
        let mut new_pos = origin;
        let mut reward = 0.0;
        state.battery = state.battery.saturating_sub(1);

        if state.circumnavigating {
            if action == Action::Circumnavigate {
                // Crossing below the low-battery threshold invalidates the
                // stored route: the target flips to the charging station.
                if state.battery < low {
                    state.detour_path.clear();
                }
                if state.detour_path.is_empty() {
                    let target = self.registry.target_for(
                        drone_index,
                        state.battery,
                        state.has_package,
                        low,
                    );
                    state.detour_path = self.detour_path(drone_index, origin, target).into();
                }
                if let Some(cell) = state.detour_path.pop_front() {
                    new_pos = cell;
                }
                reward += REWARD_DETOUR_TAKEN;
            } else {
                reward += REWARD_DETOUR_MISSED;
            }
        } else if action == Action::Circumnavigate {
            reward += REWARD_DETOUR_SPURIOUS;
        }

        if action != Action::Circumnavigate {
            state.detour_path.clear();
        }

        // Directional movement, clamped at grid edges. The movement reward
        // is judged against the flags and direction observed last tick.
        match action {
            Action::Up => {
                if new_pos.row > 0 {
                    new_pos.row -= 1;
                }
                reward += directional_reward(
                    state.obstacle_up,
                    state.relative_target == RelativeTarget::Up,
                );
            }
            Action::Down => {
                if new_pos.row + 1 < self.config.grid.rows {
                    new_pos.row += 1;
                }
                reward += directional_reward(
                    state.obstacle_down,
                    state.relative_target == RelativeTarget::Down,
                );
            }
            Action::Left => {
                if new_pos.col > 0 {
                    new_pos.col -= 1;
                }
                reward += directional_reward(
                    state.obstacle_left,
                    state.relative_target == RelativeTarget::Left,
                );
            }
            Action::Right => {
                if new_pos.col + 1 < self.config.grid.cols {
                    new_pos.col += 1;
                }
                reward += directional_reward(
                    state.obstacle_right,
                    state.relative_target == RelativeTarget::Right,
                );
            }
            Action::Skip | Action::Circumnavigate => {}
        }

        // Collision rollback: never move onto an occupied cell.
        let obstacles = self.obstacles(drone_index);
        if obstacles.contains(&new_pos) {
            new_pos = origin;
        }

        // A rollback that left a detouring drone stationary, or a current
        // cell that became an obstacle, forces a full replan. Holding
        // position when no route exists is a normal outcome.
        if (state.circumnavigating && new_pos == origin) || obstacles.contains(&new_pos) {
            let target =
                self.registry
                    .target_for(drone_index, state.battery, state.has_package, low);
            let path = self.detour_path(drone_index, origin, target);
            if !path.is_empty() {
                state.detour_path = path.into();
                if let Some(cell) = state.detour_path.pop_front() {
                    new_pos = cell;
                }
            }
        }

        // Recharge on docking with a sufficiently drained battery. In
        // training mode recharge is instantaneous; otherwise the timer is
        // proportional to the deficit.
        if new_pos == station && state.battery < self.config.max_battery - low {
            let needed = self.config.max_battery - state.battery;
            state.battery = self.config.max_battery;
            if !self.config.training_mode {
                state.charging_timer = (f64::from(needed) / f64::from(self.config.max_battery))
                    * self.config.charging_time;
            }
        }

        // Delivery.
        if state.has_package && self.registry.delivery_points[drone_index] == Some(new_pos) {
            self.registry.record_delivery(drone_index);
            state.has_package = false;
        }

        // Pickup: take an item and draw a fresh delivery assignment.
        if !state.has_package
            && new_pos == self.registry.warehouse()
            && self.registry.items_remaining > 0
        {
            state.has_package = true;
            self.registry.take_item();
            self.registry
                .assign_delivery_point(drone_index, self.config.grid, &mut self.rng);
        }

        // Recompute the observed state for the next tick.
        let target = self
            .registry
            .target_for(drone_index, state.battery, state.has_package, low);
        state.relative_target = RelativeTarget::toward(new_pos, target);

        let obstacles = self.obstacles(drone_index);
        state.obstacle_up = neighbor_blocked(new_pos, -1, 0, &obstacles);
        state.obstacle_down = neighbor_blocked(new_pos, 1, 0, &obstacles);
        state.obstacle_left = neighbor_blocked(new_pos, 0, -1, &obstacles);
        state.obstacle_right = neighbor_blocked(new_pos, 0, 1, &obstacles);

        state.circumnavigating = !state.detour_path.is_empty()
            || self.needs_circumnavigation(origin, target, &state);

        // Commit: publish the new position, then apply weather drain.
        self.registry.drone_positions[drone_index] = new_pos;
        state.battery = state
            .battery
            .saturating_sub(self.weather.battery_drain(new_pos));
        state.position = new_pos;
        self.drones[drone_index] = state.clone();

        StepOutcome {
            state,
            reward,
            done: false,
        }
    }

    /// Plans a shortest path for one drone, excluding `start`, including
    /// `goal`, empty when unreachable.
    ///
    /// With `avoid_weather` the union of all weather-affected cells is
    /// impassable as well; this variant performs no fallback, so callers
    /// can observe that a hazard fully encircles the drone.
    pub fn plan(&self, drone_index: usize, start: Cell, goal: Cell, avoid_weather: bool) -> Vec<Cell> {
        let mut blocked = self.obstacles(drone_index);
        if avoid_weather {
            blocked.extend(self.weather.blocked_cells());
        }
        planner::shortest_path(self.config.grid, start, goal, &blocked)
    }

    /// Weather-avoiding route with a weather-ignoring fallback: a drone
    /// encircled by a hazard trades battery drain for guaranteed progress
    /// instead of stalling.
    fn detour_path(&self, drone_index: usize, start: Cell, goal: Cell) -> Vec<Cell> {
        let path = self.plan(drone_index, start, goal, true);
        if path.is_empty() {
            self.plan(drone_index, start, goal, false)
        } else {
            path
        }
    }

    /// Obstacle set for one drone, computed from the stored (pre-commit)
    /// drone state and the live registry.
    fn obstacles(&self, drone_index: usize) -> HashSet<Cell> {
        let stored = &self.drones[drone_index];
        self.registry.obstacles_for(
            drone_index,
            stored.battery,
            stored.has_package,
            self.config.low_battery_threshold,
        )
    }

    /// Whether a planned detour is required: an obstacle lies directly
    /// toward the target, an obstacle flanks the dominant axis, or the
    /// straight-line route crosses a weather zone.
    fn needs_circumnavigation(&self, position: Cell, target: Cell, state: &DroneState) -> bool {
        if state.obstacle_toward(state.relative_target) {
            return true;
        }
        match state.relative_target {
            RelativeTarget::Up | RelativeTarget::Down
                if state.obstacle_left || state.obstacle_right =>
            {
                return true;
            }
            RelativeTarget::Left | RelativeTarget::Right
                if state.obstacle_up || state.obstacle_down =>
            {
                return true;
            }
            _ => {}
        }
        self.weather
            .needs_detour(position, target, state.relative_target)
    }

    // --- Read-only views for drivers and renderers ---

    /// The environment configuration.
    pub fn config(&self) -> &EnvConfig {
        &self.config
    }

    /// Current state of every drone.
    pub fn drones(&self) -> &[DroneState] {
        &self.drones
    }

    /// Number of drones.
    pub fn num_drones(&self) -> usize {
        self.drones.len()
    }

    /// Active weather zones.
    pub fn weather_zones(&self) -> &[WeatherZone] {
        self.weather.zones()
    }

    /// Undelivered items left in the warehouse.
    pub fn items_remaining(&self) -> u32 {
        self.registry.items_remaining
    }

    /// Completed deliveries per drone.
    pub fn deliveries_completed(&self) -> &[u32] {
        &self.registry.deliveries_completed
    }

    /// Active delivery assignment per drone.
    pub fn delivery_points(&self) -> &[Option<Cell>] {
        &self.registry.delivery_points
    }

    /// The shared Q-table.
    pub fn q_table(&self) -> &QTable {
        &self.q_table
    }

    /// Replaces the Q-table, e.g. with one restored from disk.
    pub fn set_q_table(&mut self, table: QTable) {
        self.q_table = table;
    }
}

fn directional_reward(obstructed: bool, on_course: bool) -> f64 {
    if obstructed {
        REWARD_INTO_OBSTACLE
    } else if on_course {
        REWARD_TOWARD_TARGET
    } else {
        REWARD_OFF_COURSE
    }
}

fn neighbor_blocked(position: Cell, dr: i64, dc: i64, obstacles: &HashSet<Cell>) -> bool {
    position
        .offset(dr, dc)
        .map_or(false, |cell| obstacles.contains(&cell))
}
