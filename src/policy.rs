//! Tabular Q-learning policy shared by all drones.
//!
//! The learned state is deliberately small: four adjacency bits, the
//! relative target direction, and the circumnavigation flag. Battery,
//! position, and payload stay out of the table — they only drive which
//! target and obstacle set get computed — which keeps the table at 960
//! entries and generalizable across drones and episodes.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use rand::Rng;
use tracing::debug;

use crate::drone::DroneState;
use crate::error::TableError;
use crate::types::{Action, RelativeTarget};

/// Dense table length: 2⁴ obstacle combinations × 5 relative directions ×
/// 2 circumnavigation values × 6 actions.
pub const TABLE_LEN: usize = 2 * 2 * 2 * 2 * RelativeTarget::COUNT * 2 * Action::COUNT;

/// The discretized state the policy observes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StateKey {
    pub obstacle_up: bool,
    pub obstacle_down: bool,
    pub obstacle_left: bool,
    pub obstacle_right: bool,
    pub relative_target: RelativeTarget,
    pub circumnavigating: bool,
}

impl StateKey {
    /// Extracts the learned-state fields from a full drone state.
    pub fn from_drone(state: &DroneState) -> Self {
        Self {
            obstacle_up: state.obstacle_up,
            obstacle_down: state.obstacle_down,
            obstacle_left: state.obstacle_left,
            obstacle_right: state.obstacle_right,
            relative_target: state.relative_target,
            circumnavigating: state.circumnavigating,
        }
    }

    /// Row offset of this key into the dense table, C-order over the
    /// dimensions `(up, down, left, right, relative_target, circumnavigate)`.
    ///
    /// The ordering is part of the persisted format; tables trained by
    /// earlier builds stay loadable only while it is unchanged.
    fn base(self) -> usize {
        let mut index = self.obstacle_up as usize;
        index = index * 2 + self.obstacle_down as usize;
        index = index * 2 + self.obstacle_left as usize;
        index = index * 2 + self.obstacle_right as usize;
        index = index * RelativeTarget::COUNT + self.relative_target.index();
        index * 2 + self.circumnavigating as usize
    }
}

/// Dense expected-return table over `(state, action)` pairs.
///
/// Shared across all drones: one policy learns from every drone's
/// transitions. Mutated only by [`QTable::update`], read by action
/// selection.
#[derive(Debug, Clone, PartialEq)]
pub struct QTable {
    values: Vec<f64>,
}

impl QTable {
    /// Creates a zero-initialized table.
    pub fn new() -> Self {
        Self {
            values: vec![0.0; TABLE_LEN],
        }
    }

    /// The six action values for one state.
    pub fn values_for(&self, key: StateKey) -> &[f64] {
        let base = key.base() * Action::COUNT;
        &self.values[base..base + Action::COUNT]
    }

    /// The tabled value of one `(state, action)` pair.
    pub fn get(&self, key: StateKey, action: Action) -> f64 {
        self.values[key.base() * Action::COUNT + action.index()]
    }

    /// The greedy action for `key`, breaking ties toward the lowest index.
    pub fn best_action(&self, key: StateKey) -> Action {
        let values = self.values_for(key);
        let mut best = Action::Up;
        let mut best_value = values[best.index()];
        for action in Action::all() {
            if values[action.index()] > best_value {
                best = action;
                best_value = values[action.index()];
            }
        }
        best
    }

    /// The maximum action value for `key`.
    pub fn max_value(&self, key: StateKey) -> f64 {
        self.values_for(key)
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max)
    }

    /// Epsilon-greedy action selection.
    ///
    /// Explores uniformly with probability `epsilon`, and also whenever all
    /// six values for this state are exactly zero (never yet visited);
    /// otherwise exploits via [`QTable::best_action`].
    pub fn choose_action<R: Rng>(&self, key: StateKey, epsilon: f64, rng: &mut R) -> Action {
        let unexplored = self.values_for(key).iter().all(|v| *v == 0.0);
        if rng.gen::<f64>() < epsilon || unexplored {
            Action::all()[rng.gen_range(0..Action::COUNT)]
        } else {
            self.best_action(key)
        }
    }

    /// One-step TD update:
    /// `Q(s,a) += alpha * (reward + gamma * max_a' Q(s',a') - Q(s,a))`.
    ///
    /// No eligibility trace, no replay buffer; fully synchronous.
    pub fn update(
        &mut self,
        key: StateKey,
        action: Action,
        reward: f64,
        next_key: StateKey,
        alpha: f64,
        gamma: f64,
    ) {
        let best_next = self.max_value(next_key);
        let slot = key.base() * Action::COUNT + action.index();
        let td_target = reward + gamma * best_next;
        let td_error = td_target - self.values[slot];
        self.values[slot] += alpha * td_error;
    }

    /// Saves the table as a dense JSON number array.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), TableError> {
        let file = File::create(path.as_ref())?;
        serde_json::to_writer(BufWriter::new(file), &self.values)?;
        debug!(path = %path.as_ref().display(), entries = self.values.len(), "q-table saved");
        Ok(())
    }

    /// Loads a table saved by [`QTable::save`], validating its shape.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, TableError> {
        let file = File::open(path.as_ref())?;
        let values: Vec<f64> = serde_json::from_reader(BufReader::new(file))?;
        if values.len() != TABLE_LEN {
            return Err(TableError::ShapeMismatch {
                expected: TABLE_LEN,
                found: values.len(),
            });
        }
        debug!(path = %path.as_ref().display(), "q-table loaded");
        Ok(Self { values })
    }
}

impl Default for QTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn key(relative_target: RelativeTarget) -> StateKey {
        StateKey {
            obstacle_up: false,
            obstacle_down: false,
            obstacle_left: false,
            obstacle_right: false,
            relative_target,
            circumnavigating: false,
        }
    }

    #[test]
    fn table_has_expected_size() {
        assert_eq!(TABLE_LEN, 960);
        assert_eq!(QTable::new().values.len(), TABLE_LEN);
    }

    #[test]
    fn base_offset_matches_c_order() {
        // (up, down, left, right, rel, circ) = (1, 0, 1, 0, 2, 1)
        let key = StateKey {
            obstacle_up: true,
            obstacle_down: false,
            obstacle_left: true,
            obstacle_right: false,
            relative_target: RelativeTarget::Left,
            circumnavigating: true,
        };
        let expected = ((((1 * 2 + 0) * 2 + 1) * 2 + 0) * 5 + 2) * 2 + 1;
        assert_eq!(key.base(), expected);
    }

    #[test]
    fn distinct_keys_use_distinct_slots() {
        let mut table = QTable::new();
        let a = key(RelativeTarget::Up);
        let b = key(RelativeTarget::Down);
        table.update(a, Action::Up, 10.0, a, 0.1, 0.9);
        assert_ne!(table.get(a, Action::Up), 0.0);
        assert_eq!(table.get(b, Action::Up), 0.0);
    }

    #[test]
    fn td_update_arithmetic() {
        let mut table = QTable::new();
        let s = key(RelativeTarget::Up);
        let next = key(RelativeTarget::Down);
        // All zero: Q += 0.1 * (10 + 0.9*0 - 0) = 1.0
        table.update(s, Action::Up, 10.0, next, 0.1, 0.9);
        assert!((table.get(s, Action::Up) - 1.0).abs() < 1e-12);
        // Warm the next state, then update again.
        table.update(next, Action::Left, 20.0, s, 0.1, 0.9);
        let best_next = table.max_value(next);
        let before = table.get(s, Action::Up);
        table.update(s, Action::Up, -5.0, next, 0.1, 0.9);
        let expected = before + 0.1 * (-5.0 + 0.9 * best_next - before);
        assert!((table.get(s, Action::Up) - expected).abs() < 1e-12);
    }

    #[test]
    fn chosen_actions_always_in_range() {
        let table = QTable::new();
        let mut rng = StdRng::seed_from_u64(3);
        for epsilon in [0.0, 0.5, 1.0] {
            for _ in 0..200 {
                let action = table.choose_action(key(RelativeTarget::Right), epsilon, &mut rng);
                assert!(action.index() < Action::COUNT);
            }
        }
    }

    #[test]
    fn greedy_selection_with_warmed_table() {
        let mut table = QTable::new();
        let s = key(RelativeTarget::Down);
        table.update(s, Action::Down, 10.0, s, 0.5, 0.9);
        table.update(s, Action::Up, 2.0, s, 0.5, 0.9);
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..50 {
            assert_eq!(table.choose_action(s, 0.0, &mut rng), Action::Down);
        }
    }

    #[test]
    fn unvisited_state_explores_even_without_epsilon() {
        // All-zero values force uniform selection; over many draws every
        // action should appear.
        let table = QTable::new();
        let mut rng = StdRng::seed_from_u64(11);
        let mut seen = [false; Action::COUNT];
        for _ in 0..500 {
            let action = table.choose_action(key(RelativeTarget::Up), 0.0, &mut rng);
            seen[action.index()] = true;
        }
        assert!(seen.iter().all(|s| *s));
    }

    #[test]
    fn best_action_breaks_ties_toward_first_index() {
        let table = QTable::new();
        assert_eq!(table.best_action(key(RelativeTarget::Up)), Action::Up);
    }

    #[test]
    fn save_load_round_trip() {
        let mut table = QTable::new();
        let s = key(RelativeTarget::Left);
        table.update(s, Action::Left, 12.5, s, 0.1, 0.9);
        table.update(s, Action::Skip, -3.0, s, 0.1, 0.9);

        let path = std::env::temp_dir().join(format!("qtable-{}.json", std::process::id()));
        table.save(&path).unwrap();
        let loaded = QTable::load(&path).unwrap();
        std::fs::remove_file(&path).ok();

        for (a, b) in table.values.iter().zip(loaded.values.iter()) {
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn load_rejects_wrong_shape() {
        let path = std::env::temp_dir().join(format!("qtable-bad-{}.json", std::process::id()));
        std::fs::write(&path, "[0.0, 1.0, 2.0]").unwrap();
        let result = QTable::load(&path);
        std::fs::remove_file(&path).ok();
        assert!(matches!(
            result,
            Err(TableError::ShapeMismatch {
                expected: TABLE_LEN,
                found: 3
            })
        ));
    }
}
