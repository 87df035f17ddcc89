//! dronecourier - multi-drone delivery simulation with tabular Q-learning
//!
//! A turn-based grid-world library: drones ferry packages from a shared
//! warehouse to randomly assigned delivery cells while managing battery,
//! avoiding each other, and detouring around transient weather hazards.
//! A single shared Q-table learns the movement policy.

pub mod config;
pub mod drone;
pub mod environment;
pub mod error;
pub mod planner;
pub mod policy;
pub mod registry;
pub mod trainer;
pub mod types;
pub mod weather;

// Re-export the types most drivers touch
pub use config::EnvConfig;
pub use drone::DroneState;
pub use environment::{DroneDeliveryEnv, StepOutcome};
pub use policy::QTable;
pub use trainer::{Trainer, TrainingReport};
pub use types::{Action, Cell, GridSize, RelativeTarget};

/// Identifier type used for weather zones and simulation artifacts.
pub type Id = String;

/// Generates a new unique identifier (UUID v4).
pub fn generate_id() -> Id {
    uuid::Uuid::new_v4().to_string()
}
