//! Maya-Sim daemon
//!
//! Loads the simulator configuration, binds the control protocol endpoint,
//! and runs the fixed-tick scheduler until Ctrl-C. An algorithm client
//! connects over TCP and drives the robot one command per tick; rendering
//! and input translation are external consumers of the scheduler's render
//! stream and stop flag.

use maya_sim::config::SimulatorConfig;
use maya_sim::error::{Error, Result};
use maya_sim::protocol::CommandServer;
use maya_sim::scheduler::Scheduler;
use maya_sim::sim::Simulation;
use std::env;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Parse config path from command line arguments.
///
/// Supports:
/// - `maya-sim <path>` (positional)
/// - `maya-sim --config <path>` (flag-based)
/// - `maya-sim -c <path>` (short flag)
///
/// With no argument the built-in classroom defaults are used.
fn parse_config_path() -> Option<String> {
    let args: Vec<String> = env::args().collect();

    // Look for --config or -c flag
    for i in 1..args.len() {
        if (args[i] == "--config" || args[i] == "-c") && i + 1 < args.len() {
            return Some(args[i + 1].clone());
        }
    }

    // Fall back to first positional argument (if it doesn't start with -)
    if args.len() > 1 && !args[1].starts_with('-') {
        return Some(args[1].clone());
    }

    None
}

fn main() -> Result<()> {
    let config = match parse_config_path() {
        Some(path) => SimulatorConfig::load(&path)?,
        None => SimulatorConfig::default(),
    };

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.logging.level.as_str()),
    )
    .init();

    log::info!("maya-sim v{} starting...", env!("CARGO_PKG_VERSION"));
    log::info!(
        "maze: {}x{} cells ({} units/cell), {} sensors, seed {}",
        config.maze.cells_x,
        config.maze.cells_y,
        config.maze.cell_size,
        config.sensors.len(),
        if config.simulation.random_seed == 0 {
            "entropy".to_string()
        } else {
            config.simulation.random_seed.to_string()
        }
    );

    let sim = Simulation::from_config(&config)?;
    let server = CommandServer::bind(&config.network.bind_address, config.network.wire_format)?;

    // Stop flag: the input-translator seam. Ctrl-C raises it; an embedding
    // front-end can share the same flag.
    let stop = Arc::new(AtomicBool::new(false));
    let handler_stop = Arc::clone(&stop);
    ctrlc::set_handler(move || {
        log::info!("received shutdown signal");
        handler_stop.store(true, Ordering::Relaxed);
    })
    .map_err(|e| Error::Other(format!("error setting Ctrl-C handler: {}", e)))?;

    let mut scheduler = Scheduler::new(sim, server, &config.simulation, stop);

    log::info!("simulator running, press Ctrl-C to stop");
    scheduler.run()?;

    log::info!("maya-sim stopped");
    Ok(())
}
