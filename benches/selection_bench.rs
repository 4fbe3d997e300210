use attack_core::balance::{run_selection_simulation, SelectionSimConfig};
use attack_core::controller::{SelectionConfig, SelectionTable};
use attack_core::sim::SimWorld;
use attack_core::{AreaId, AttackBehavior, AttackSetConfig};
use bevy::math::Vec2;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;

const BRUTE: &str = include_str!("../demos/brute.ron");

fn sample_table() -> SelectionTable {
    let mut table = SelectionTable::new();
    table.push("lunge", SelectionConfig::weighted(3.0));
    table.push("grab", SelectionConfig::weighted(2.0));
    table.push("ground_lasers", SelectionConfig::guaranteed(0.0, 3, 0));
    table.push("bone_volley", SelectionConfig::weighted(1.5));
    table
}

fn bench_selection(c: &mut Criterion) {
    let mut table = sample_table();
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(42);

    c.bench_function("selection_table_next", |b| {
        b.iter(|| {
            black_box(table.next(&mut rng));
        })
    });

    let table = sample_table();
    c.bench_function("selection_table_pick_weighted", |b| {
        b.iter(|| {
            black_box(table.pick_weighted(&mut rng));
        })
    });
}

fn bench_controller_tick(c: &mut Criterion) {
    let config = AttackSetConfig::from_ron_str(BRUTE).unwrap();

    // One simulated second at 60 Hz against a circling target
    c.bench_function("controller_tick_60_frames", |b| {
        b.iter(|| {
            let mut world = SimWorld::with_target(Vec2::new(4.0, 0.0));
            world.actor.areas.insert(AreaId::new("aggro"), 9.0);
            world.actor.areas.insert(AreaId::new("grab_zone"), 1.2);
            let mut controller = config.clone().build().unwrap();
            controller.initialize(&world.actor);

            let dt = 1.0 / 60.0;
            for frame in 0..60 {
                let angle = frame as f32 * dt;
                world
                    .actor
                    .set_target_position(Vec2::new(angle.cos(), angle.sin()) * 4.0);
                controller.tick(black_box(dt), &mut world.ctx());
                world.step(dt);
            }
            black_box(world.effects.total_damage());
        })
    });
}

fn bench_balance(c: &mut Criterion) {
    let table = sample_table();
    let config = SelectionSimConfig {
        trials: 200,
        picks_per_trial: 100,
        base_seed: 42,
    };

    c.bench_function("selection_simulation_200x100", |b| {
        b.iter(|| {
            black_box(run_selection_simulation(black_box(&table), &config));
        })
    });
}

criterion_group!(benches, bench_selection, bench_controller_tick, bench_balance);
criterion_main!(benches);
