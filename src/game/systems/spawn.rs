use rand::Rng;
use tracing::{debug, warn};

use crate::game::state::{AgentKind, Simulation};
use crate::util::vec2::Vec2;

/// Outcome of a population pass
///
/// Placement is rejection-sampled with a fixed budget, so `spawned` may fall
/// short of `requested` in a cramped world.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpawnReport {
    pub requested: usize,
    pub spawned: usize,
    pub attempts: u64,
}

impl SpawnReport {
    pub fn shortfall(&self) -> usize {
        self.requested.saturating_sub(self.spawned)
    }
}

/// Fill the spawn ring with the configured number of agents
///
/// Each attempt rolls a kind and a point in the ring around the origin and
/// keeps it only when the agent's circle is clear of static geometry.
pub fn populate(sim: &mut Simulation) -> SpawnReport {
    let requested = sim.config.agent_count;
    let budget = requested as u64 * sim.config.spawn_attempts_per_agent as u64;
    let inner = sim.config.spawn_ring_inner;
    let width = sim.config.spawn_ring_width;

    let mut report = SpawnReport {
        requested,
        ..Default::default()
    };

    while report.spawned < requested && report.attempts < budget {
        report.attempts += 1;

        let angle = sim.rng.gen_range(0.0..std::f32::consts::TAU);
        let distance = inner + sim.rng.gen::<f32>() * width;
        let position = Vec2::from_angle(angle) * distance;
        let kind = AgentKind::from_roll(sim.rng.gen::<f32>());

        if sim.world.circle_blocked(position, kind.stats().radius) {
            continue;
        }

        sim.spawn_agent(kind, position);
        report.spawned += 1;
    }

    if report.shortfall() > 0 {
        warn!(
            requested = report.requested,
            spawned = report.spawned,
            attempts = report.attempts,
            "Spawn attempts exhausted before the population was filled"
        );
    } else {
        debug!(spawned = report.spawned, attempts = report.attempts, "Agents spawned");
    }

    report
}

#[cfg(test)]
mod tests {
    use crate::config::SimConfig;
    use crate::game::state::Simulation;
    use crate::game::state::test_support::{building, vehicle_spawn};
    use crate::game::world::WorldData;

    fn config(agent_count: usize) -> SimConfig {
        SimConfig {
            seed: Some(42),
            agent_count,
            ..Default::default()
        }
    }

    #[test]
    fn test_agents_spawn_in_ring_clear_of_buildings() {
        let sim = Simulation::new(WorldData::city(), config(200)).unwrap();
        assert!(sim.spawn_report.spawned > 0);
        assert_eq!(sim.agents.len(), sim.spawn_report.spawned);

        for agent in &sim.agents {
            let d = agent.position.length();
            assert!((800.0..=2000.0 + 1e-3).contains(&d), "distance {}", d);
            assert!(!sim.world.circle_blocked(agent.position, agent.radius));
        }
    }

    #[test]
    fn test_spawn_respects_attempt_budget() {
        // A building covering the whole ring makes every attempt fail
        let data = WorldData {
            buildings: vec![building(-3000.0, -3000.0, 6000.0, 6000.0)],
            decorations: vec![],
            zones: vec![],
            vehicles: vec![vehicle_spawn(0.0, 0.0)],
        };
        let sim = Simulation::new(data, config(50)).unwrap();
        assert_eq!(sim.spawn_report.spawned, 0);
        assert_eq!(sim.spawn_report.attempts, 500);
        assert_eq!(sim.spawn_report.shortfall(), 50);
        assert!(sim.agents.is_empty());
    }

    #[test]
    fn test_same_seed_same_population() {
        let a = Simulation::new(WorldData::city(), config(30)).unwrap();
        let b = Simulation::new(WorldData::city(), config(30)).unwrap();
        let kinds_a: Vec<_> = a.agents.iter().map(|x| (x.kind, x.position)).collect();
        let kinds_b: Vec<_> = b.agents.iter().map(|x| (x.kind, x.position)).collect();
        assert_eq!(kinds_a, kinds_b);
    }

    #[test]
    fn test_zero_agents_requested() {
        let sim = Simulation::new(WorldData::city(), config(0)).unwrap();
        assert_eq!(sim.spawn_report.requested, 0);
        assert_eq!(sim.spawn_report.attempts, 0);
    }
}
