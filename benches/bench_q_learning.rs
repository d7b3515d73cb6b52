// benches/bench_q_learning.rs
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::SmallRng;
use rand::SeedableRng;

use intersection_rl::control_system::q_learning::{
    Action, Decision, EmergencyFlag, PressureClass, QLearningAgent, StateKey,
};
use intersection_rl::simulation_engine::intersections::Phase;
use intersection_rl::SimConfig;

fn all_states() -> Vec<StateKey> {
    let mut states = Vec::new();
    for phase in [Phase::NorthSouth, Phase::EastWest] {
        for pressure in [PressureClass::HighNs, PressureClass::HighEw, PressureClass::Balanced] {
            for emergency in [EmergencyFlag::Amb, EmergencyFlag::None] {
                states.push(StateKey {
                    phase,
                    pressure,
                    emergency,
                });
            }
        }
    }
    states
}

fn bench_q_learning(c: &mut Criterion) {
    let states = all_states();
    let mut group = c.benchmark_group("q_learning");

    for epsilon in [0.0, 0.1] {
        group.bench_with_input(
            BenchmarkId::new("select_action", epsilon),
            &epsilon,
            |b, &epsilon| {
                let mut agent = QLearningAgent::new(&SimConfig {
                    epsilon,
                    ..SimConfig::default()
                });
                let mut rng = SmallRng::seed_from_u64(1);
                let mut i = 0;
                b.iter(|| {
                    i = (i + 1) % states.len();
                    black_box(agent.select_action(states[i], &mut rng))
                });
            },
        );
    }

    group.bench_function("learn", |b| {
        let mut agent = QLearningAgent::new(&SimConfig::default());
        let mut i = 0;
        b.iter(|| {
            i = (i + 1) % states.len();
            let previous = Decision {
                state: states[i],
                action: Action::Switch,
                reward_mark: 0.0,
            };
            agent.learn(previous, black_box(1.0), states[(i + 5) % states.len()]);
        });
    });

    group.bench_function("serialize_table", |b| {
        let mut agent = QLearningAgent::new(&SimConfig::default());
        for state in &states {
            agent.table.entry(*state).extend = 1.0;
        }
        b.iter(|| black_box(agent.table.to_json()));
    });

    group.finish();
}

criterion_group!(benches, bench_q_learning);
criterion_main!(benches);
