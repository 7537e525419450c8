//! Run statistics and end-of-run summary

use serde::{Deserialize, Serialize};

use crate::game::state::{RunPhase, Simulation};

/// Counters accumulated while the run advances
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunStats {
    pub kills_by_vehicle: u32,
    pub kills_by_melee: u32,
    /// Agents struck by the driven vehicle above the impact threshold
    pub vehicle_impacts: u32,
    pub melee_hits: u32,
    /// Solid obstacle collisions resolved by the vehicle
    pub wall_impacts: u32,
    pub vehicles_wrecked: u32,
    pub decorations_broken: u32,
    pub player_damage_taken: f32,
    pub vehicle_damage_taken: f32,
}

impl RunStats {
    pub fn total_kills(&self) -> u32 {
        self.kills_by_vehicle + self.kills_by_melee
    }
}

/// Snapshot of a run, built from the final state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub phase: RunPhase,
    pub ticks: u64,
    pub agents_spawned: usize,
    pub agents_remaining: usize,
    pub player_health: f32,
    pub intact_vehicles: usize,
    pub stats: RunStats,
}

impl RunSummary {
    /// Share of the spawned population destroyed (0 when nothing spawned)
    pub fn clear_ratio(&self) -> f32 {
        if self.agents_spawned == 0 {
            return 0.0;
        }
        self.stats.total_kills() as f32 / self.agents_spawned as f32
    }
}

pub fn summarize(sim: &Simulation) -> RunSummary {
    RunSummary {
        phase: sim.phase,
        ticks: sim.tick,
        agents_spawned: sim.spawn_report.spawned,
        agents_remaining: sim.agents.len(),
        player_health: sim.player.health,
        intact_vehicles: sim.vehicles.iter().filter(|v| v.is_intact()).count(),
        stats: sim.stats.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;
    use crate::game::world::WorldData;

    #[test]
    fn test_summary_of_fresh_run() {
        let config = SimConfig {
            seed: Some(3),
            agent_count: 10,
            ..Default::default()
        };
        let sim = Simulation::new(WorldData::city(), config).unwrap();
        let summary = summarize(&sim);
        assert_eq!(summary.phase, RunPhase::Running);
        assert_eq!(summary.ticks, 0);
        assert_eq!(summary.agents_spawned, summary.agents_remaining);
        assert_eq!(summary.intact_vehicles, 3);
        assert_eq!(summary.player_health, 100.0);
        assert_eq!(summary.clear_ratio(), 0.0);
    }

    #[test]
    fn test_clear_ratio_counts_both_sources() {
        let summary = RunSummary {
            phase: RunPhase::Victory,
            ticks: 600,
            agents_spawned: 4,
            agents_remaining: 0,
            player_health: 40.0,
            intact_vehicles: 1,
            stats: RunStats {
                kills_by_vehicle: 3,
                kills_by_melee: 1,
                ..Default::default()
            },
        };
        assert_eq!(summary.stats.total_kills(), 4);
        assert_eq!(summary.clear_ratio(), 1.0);
    }

    #[test]
    fn test_summary_serializes() {
        let summary = RunSummary {
            phase: RunPhase::Defeat,
            ticks: 10,
            agents_spawned: 0,
            agents_remaining: 0,
            player_health: 0.0,
            intact_vehicles: 0,
            stats: RunStats::default(),
        };
        let json = serde_json::to_string(&summary).unwrap();
        assert!(json.contains("\"Defeat\""));
    }
}
