//! Episodic Q-learning training driver.
//!
//! Runs single-drone episodes against the environment, feeding every
//! transition through the TD update and decaying the exploration rate
//! between episodes. Multi-drone coordination is an inference-time
//! concern; training on one drone keeps the episodes short and the
//! transitions on-policy.

use std::fmt;

use tracing::info;

use crate::environment::DroneDeliveryEnv;

/// Training schedule: episode count and the epsilon decay curve.
#[derive(Debug, Clone)]
pub struct Trainer {
    /// Number of episodes to run.
    pub num_episodes: usize,
    /// Exploration rate at the first episode.
    pub epsilon_start: f64,
    /// Floor below which epsilon never decays.
    pub epsilon_min: f64,
    /// Multiplicative decay applied after each episode.
    pub epsilon_decay: f64,
    /// Safety cap on ticks per episode; a wandering policy that keeps
    /// recharging could otherwise stall an episode indefinitely.
    pub max_ticks: usize,
}

impl Default for Trainer {
    fn default() -> Self {
        Self {
            num_episodes: 4000,
            epsilon_start: 0.5,
            epsilon_min: 0.01,
            epsilon_decay: 0.997,
            max_ticks: 10_000,
        }
    }
}

/// Summary of a completed training run.
#[derive(Debug, Clone)]
pub struct TrainingReport {
    /// Total reward collected in each episode, in order.
    pub rewards_per_episode: Vec<f64>,
    /// Exploration rate after the final decay.
    pub final_epsilon: f64,
}

impl TrainingReport {
    /// Mean reward over the last `window` episodes (or fewer, early on).
    pub fn windowed_mean(&self, window: usize) -> f64 {
        let n = self.rewards_per_episode.len().min(window);
        if n == 0 {
            return 0.0;
        }
        let tail = &self.rewards_per_episode[self.rewards_per_episode.len() - n..];
        tail.iter().sum::<f64>() / n as f64
    }
}

impl fmt::Display for TrainingReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} episodes, mean reward (last 100): {:.2}, final epsilon: {:.4}",
            self.rewards_per_episode.len(),
            self.windowed_mean(100),
            self.final_epsilon
        )
    }
}

impl Trainer {
    /// Runs the full training schedule against `env` and returns the
    /// per-episode reward trace.
    ///
    /// Each episode resets the environment, then steps drone 0 until its
    /// mission completes, its battery is exhausted, or the tick cap is
    /// reached. The environment's Q-table accumulates across episodes.
    pub fn train(&self, env: &mut DroneDeliveryEnv) -> TrainingReport {
        env.epsilon = self.epsilon_start;
        let mut rewards_per_episode = Vec::with_capacity(self.num_episodes);

        for episode in 0..self.num_episodes {
            let mut state = env.reset().swap_remove(0);
            let mut total_reward = 0.0;

            for _ in 0..self.max_ticks {
                let action = env.choose_action(&state);
                let outcome = env.step(0, action.index());
                env.update_q_table(&state, action, outcome.reward, &outcome.state);
                total_reward += outcome.reward;
                state = outcome.state;
                if outcome.done || state.battery == 0 {
                    break;
                }
            }

            rewards_per_episode.push(total_reward);
            env.epsilon = (env.epsilon * self.epsilon_decay).max(self.epsilon_min);

            if (episode + 1) % 100 == 0 {
                let tail = &rewards_per_episode[rewards_per_episode.len().saturating_sub(100)..];
                let mean = tail.iter().sum::<f64>() / tail.len() as f64;
                info!(
                    episode = episode + 1,
                    mean_reward = format!("{mean:.2}"),
                    epsilon = format!("{:.4}", env.epsilon),
                    "training progress"
                );
            }
        }

        TrainingReport {
            rewards_per_episode,
            final_epsilon: env.epsilon,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EnvConfig;
    use crate::policy::TABLE_LEN;
    use crate::types::{Cell, GridSize};

    fn small_env() -> DroneDeliveryEnv {
        let config = EnvConfig {
            grid: GridSize::new(5, 5),
            warehouse: Cell::new(2, 4),
            charging_stations: vec![Cell::new(4, 0)],
            warehouse_items: 1,
            ..EnvConfig::default()
        };
        DroneDeliveryEnv::new(config, 123).unwrap()
    }

    #[test]
    fn produces_one_reward_per_episode() {
        let mut env = small_env();
        let trainer = Trainer {
            num_episodes: 3,
            max_ticks: 200,
            ..Trainer::default()
        };
        let report = trainer.train(&mut env);
        assert_eq!(report.rewards_per_episode.len(), 3);
    }

    #[test]
    fn epsilon_decays_but_respects_floor() {
        let mut env = small_env();
        let trainer = Trainer {
            num_episodes: 10,
            epsilon_start: 0.5,
            epsilon_min: 0.4,
            epsilon_decay: 0.9,
            max_ticks: 50,
            ..Trainer::default()
        };
        let report = trainer.train(&mut env);
        assert!(report.final_epsilon < 0.5);
        assert!(report.final_epsilon >= 0.4 - 1e-12);
        assert_eq!(env.epsilon, report.final_epsilon);
    }

    #[test]
    fn training_populates_the_table() {
        let mut env = small_env();
        let trainer = Trainer {
            num_episodes: 5,
            max_ticks: 200,
            ..Trainer::default()
        };
        trainer.train(&mut env);

        // At least one state-action pair must have moved off zero. Persist
        // and reload to read the raw values through the public surface.
        let path = std::env::temp_dir().join(format!("trainer-{}.json", std::process::id()));
        env.q_table().save(&path).unwrap();
        let raw = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).ok();
        let values: Vec<f64> = serde_json::from_str(&raw).unwrap();
        assert_eq!(values.len(), TABLE_LEN);
        assert!(values.iter().any(|v| *v != 0.0));
    }

    #[test]
    fn windowed_mean_handles_short_traces() {
        let report = TrainingReport {
            rewards_per_episode: vec![10.0, 20.0],
            final_epsilon: 0.1,
        };
        assert!((report.windowed_mean(100) - 15.0).abs() < 1e-12);
        assert!((report.windowed_mean(1) - 20.0).abs() < 1e-12);
        let empty = TrainingReport {
            rewards_per_episode: Vec::new(),
            final_epsilon: 0.5,
        };
        assert_eq!(empty.windowed_mean(100), 0.0);
    }
}
