mod autopilot;

use std::time::Duration;

use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use zombie_drift_sim::game::performance::TickBudget;
use zombie_drift_sim::{step, summarize, SimConfig, SimEvent, Simulation, WorldData};

/// Progress log interval, in ticks
const PROGRESS_EVERY: u64 = 300;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    info!("Zombie Drift Simulation v{}", env!("CARGO_PKG_VERSION"));

    let config = SimConfig::load_or_default();
    config.validate()?;
    info!(
        "Configuration loaded: agents={}, tick_rate={}, seed={:?}",
        config.agent_count, config.tick_rate, config.seed
    );

    let world = match &config.world_file {
        Some(path) => {
            info!("Loading world from {}", path);
            WorldData::load(path)?
        }
        None => WorldData::city(),
    };

    let max_ticks = config.max_ticks;
    let mut ticker = interval(Duration::from_secs_f64(1.0 / config.tick_rate as f64));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut budget = TickBudget::new(config.tick_rate);
    let mut sim = Simulation::new(world, config)?;

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let input = autopilot::next_input(&sim);

                budget.tick_start();
                let events = step(&mut sim, &input);
                budget.tick_end(sim.agents.len());

                for event in &events {
                    match event {
                        SimEvent::VehicleWrecked { vehicle, replacement, .. } => {
                            warn!(vehicle, ?replacement, "Vehicle wrecked");
                        }
                        e if !e.is_cosmetic() => debug!(event = ?e, "Step event"),
                        _ => {}
                    }
                }

                if sim.tick % PROGRESS_EVERY == 0 {
                    info!(
                        tick = sim.tick,
                        agents = sim.agents.len(),
                        kills = sim.stats.total_kills(),
                        health = sim.player.health,
                        "{}",
                        budget.status_message()
                    );
                    if budget.status().is_overrun() {
                        warn!("Step time exceeds the frame budget");
                    }
                }

                if sim.is_terminal() {
                    break;
                }
                if max_ticks.is_some_and(|max| sim.tick >= max) {
                    info!("Tick limit reached");
                    break;
                }
            }
            result = &mut shutdown => {
                if let Err(e) = result {
                    warn!("Failed to listen for Ctrl+C: {}", e);
                }
                info!("Shutdown signal received");
                break;
            }
        }
    }

    let summary = summarize(&sim);
    info!(
        phase = ?summary.phase,
        ticks = summary.ticks,
        kills = summary.stats.total_kills(),
        clear_ratio = summary.clear_ratio(),
        "Run finished"
    );
    println!("{}", serde_json::to_string_pretty(&summary)?);

    Ok(())
}
