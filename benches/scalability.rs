//! Scalability benchmarks for the simulation core
//!
//! Measures a full step, the crowd grid and line-of-sight queries across
//! horde sizes to check the 60Hz frame budget holds.
//!
//! Run with: cargo bench --bench scalability

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use zombie_drift_sim::game::spatial::{AgentGrid, GridAgent};
use zombie_drift_sim::game::systems::ai;
use zombie_drift_sim::util::vec2::Vec2;
use zombie_drift_sim::{step, ControlInput, SimConfig, Simulation, WorldData};

/// Build a seeded city run with the requested horde size
fn create_sim_with_agents(count: usize, parallel: bool) -> Simulation {
    let config = SimConfig {
        seed: Some(7),
        agent_count: count,
        parallel_perception: parallel,
        ..Default::default()
    };
    Simulation::new(WorldData::city(), config).expect("city world is valid")
}

fn cruise() -> ControlInput {
    ControlInput {
        forward: true,
        right: true,
        ..Default::default()
    }
}

/// Benchmark a full step (all systems) at various horde sizes
fn bench_full_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("full_step");
    group.sample_size(30);

    for count in [100, 250, 500] {
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("parallel", count), &count, |b, &count| {
            let mut sim = create_sim_with_agents(count, true);
            let input = cruise();
            b.iter(|| {
                if sim.is_terminal() {
                    sim.reset().expect("reset");
                }
                black_box(step(&mut sim, &input));
            })
        });
        group.bench_with_input(BenchmarkId::new("sequential", count), &count, |b, &count| {
            let mut sim = create_sim_with_agents(count, false);
            let input = cruise();
            b.iter(|| {
                if sim.is_terminal() {
                    sim.reset().expect("reset");
                }
                black_box(step(&mut sim, &input));
            })
        });
    }
    group.finish();
}

/// Benchmark agent grid build and pair extraction
fn bench_agent_grid(c: &mut Criterion) {
    let mut group = c.benchmark_group("agent_grid");
    group.sample_size(50);

    for count in [100, 500, 1000, 2000] {
        let mut rng = StdRng::seed_from_u64(11);
        let agents: Vec<GridAgent> = (0..count)
            .map(|index| {
                let angle = rng.gen_range(0.0..std::f32::consts::TAU);
                let radius = rng.gen_range(100.0..1500.0);
                GridAgent {
                    index,
                    position: Vec2::from_angle(angle) * radius,
                }
            })
            .collect();

        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("pairs", count), &count, |b, _| {
            let mut grid = AgentGrid::default();
            let mut pairs = Vec::new();
            b.iter(|| {
                grid.clear();
                for agent in &agents {
                    grid.insert(*agent);
                }
                grid.sorted_pairs(&mut pairs);
                black_box(pairs.len())
            })
        });
    }
    group.finish();
}

/// Benchmark perception (distance + line of sight) against the city
fn bench_line_of_sight(c: &mut Criterion) {
    let mut group = c.benchmark_group("line_of_sight");
    group.sample_size(50);

    for count in [100, 500] {
        let sim = create_sim_with_agents(count, false);
        let target = sim.target().position();

        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("perceive", count), &count, |b, _| {
            b.iter(|| {
                let seen = sim
                    .agents
                    .iter()
                    .filter(|agent| ai::perceive(&sim.world, agent, target).sees_target)
                    .count();
                black_box(seen)
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_full_step, bench_agent_grid, bench_line_of_sight);

criterion_main!(benches);
