// Demonstration: train the Q-learning policy and save the table.
//
// Run from the repo root:
//   cargo run --example train -- --episodes 4000 --out q_table.json

use std::env;
use std::process;

use dronecourier::{DroneDeliveryEnv, EnvConfig, Trainer};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args: Vec<String> = env::args().collect();
    let episodes: usize = arg_value(&args, "--episodes")
        .and_then(|s| s.parse().ok())
        .unwrap_or(4000);
    let seed: u64 = arg_value(&args, "--seed")
        .and_then(|s| s.parse().ok())
        .unwrap_or(42);
    let out = arg_value(&args, "--out").unwrap_or("q_table.json");

    let config = EnvConfig {
        training_mode: true,
        ..EnvConfig::default()
    };
    let mut env = match DroneDeliveryEnv::new(config, seed) {
        Ok(env) => env,
        Err(err) => {
            eprintln!("Invalid configuration: {}", err);
            process::exit(2);
        }
    };

    let trainer = Trainer {
        num_episodes: episodes,
        ..Trainer::default()
    };
    let report = trainer.train(&mut env);
    println!("{}", report);

    if let Err(err) = env.q_table().save(out) {
        eprintln!("Failed to save Q-table to '{}': {}", out, err);
        process::exit(1);
    }
    println!("Q-table saved to {}", out);
}

fn arg_value<'a>(args: &'a [String], key: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == key)
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str())
}
