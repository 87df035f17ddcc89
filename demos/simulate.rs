// Demonstration: run a trained policy greedily and render the grid.
//
// Run from the repo root (after training):
//   cargo run --example simulate -- --table q_table.json --ticks 200

use std::env;
use std::process;

use dronecourier::{Cell, DroneDeliveryEnv, EnvConfig, QTable};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args: Vec<String> = env::args().collect();
    let table_path = arg_value(&args, "--table").unwrap_or("q_table.json");
    let max_ticks: usize = arg_value(&args, "--ticks")
        .and_then(|s| s.parse().ok())
        .unwrap_or(500);
    let seed: u64 = arg_value(&args, "--seed")
        .and_then(|s| s.parse().ok())
        .unwrap_or(7);

    let table = match QTable::load(table_path) {
        Ok(table) => table,
        Err(err) => {
            eprintln!("Failed to load Q-table from '{}': {}", table_path, err);
            process::exit(2);
        }
    };

    let config = EnvConfig {
        training_mode: false,
        ..EnvConfig::default()
    };
    let mut env = match DroneDeliveryEnv::new(config, seed) {
        Ok(env) => env,
        Err(err) => {
            eprintln!("Invalid configuration: {}", err);
            process::exit(2);
        }
    };
    env.set_q_table(table);
    env.epsilon = 0.0; // pure exploitation
    env.reset();

    let n = env.num_drones();
    let mut done = vec![false; n];
    let mut ticks = 0;

    while ticks < max_ticks && !done.iter().all(|d| *d) {
        for drone in 0..n {
            if done[drone] {
                continue;
            }
            let state = env.drones()[drone].clone();
            let action = env.choose_action(&state);
            let outcome = env.step(drone, action.index());
            if outcome.done || outcome.state.battery == 0 {
                done[drone] = true;
            }
        }
        ticks += 1;
        if ticks % 10 == 0 {
            println!("--- tick {} ---", ticks);
            render(&env);
        }
    }

    println!("\nFinished after {} ticks", ticks);
    println!("Items remaining in warehouse: {}", env.items_remaining());
    for (i, count) in env.deliveries_completed().iter().enumerate() {
        let state = &env.drones()[i];
        println!(
            "Drone {}: {} deliveries, battery {}, at {}",
            i, count, state.battery, state.position
        );
    }
}

/// ASCII rendering: W warehouse, C station, 0..9 drones, x delivery
/// points, ~ weather, . empty. Drones draw last so they stay visible.
fn render(env: &DroneDeliveryEnv) {
    let grid = env.config().grid;
    let mut canvas = vec![vec!['.'; grid.cols]; grid.rows];

    for zone in env.weather_zones() {
        for row in zone.anchor.row..(zone.anchor.row + zone.height).min(grid.rows) {
            for col in zone.anchor.col..(zone.anchor.col + zone.width).min(grid.cols) {
                canvas[row][col] = '~';
            }
        }
    }
    for station in &env.config().charging_stations {
        canvas[station.row][station.col] = 'C';
    }
    for point in env.delivery_points().iter().flatten() {
        canvas[point.row][point.col] = 'x';
    }
    let warehouse: Cell = env.config().warehouse;
    canvas[warehouse.row][warehouse.col] = 'W';
    for (i, drone) in env.drones().iter().enumerate() {
        let label = char::from_digit((i % 10) as u32, 10).unwrap_or('?');
        canvas[drone.position.row][drone.position.col] = label;
    }

    for row in canvas {
        println!("{}", row.into_iter().collect::<String>());
    }
}

fn arg_value<'a>(args: &'a [String], key: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == key)
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str())
}
