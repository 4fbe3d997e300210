//! Headless duel: one NPC running an attack set against a circling target.
//!
//! Usage: `attack-sim [attack_set.ron] [seconds]`

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use bevy::math::Vec2;
use tracing::info;

use attack_core::balance::{run_selection_simulation, SelectionSimConfig};
use attack_core::logging::{controller_span, init_tracing, TracingConfig};
use attack_core::sim::SimWorld;
use attack_core::{AreaId, AttackBehavior, AttackSetConfig};

const DEFAULT_ATTACK_SET: &str = "demos/brute.ron";
const DEFAULT_SECONDS: f32 = 30.0;
const FRAME_DT: f32 = 1.0 / 60.0;

const ORBIT_RADIUS: f32 = 5.0;
const ORBIT_SPEED: f32 = 0.6; // radians per second
const DETECTION_RADIUS: f32 = 9.0;
const GRAB_RADIUS: f32 = 1.2;

fn main() -> Result<()> {
    init_tracing(&TracingConfig::default().with_env_override());

    let mut args = std::env::args().skip(1);
    let path = PathBuf::from(args.next().unwrap_or_else(|| DEFAULT_ATTACK_SET.to_string()));
    let seconds: f32 = match args.next() {
        Some(raw) => raw
            .parse()
            .with_context(|| format!("invalid duration `{raw}`"))?,
        None => DEFAULT_SECONDS,
    };

    let config = AttackSetConfig::load(&path)
        .with_context(|| format!("loading attack set {}", path.display()))?;

    let mut world = SimWorld::new();
    if let Some(area) = &config.controller.detection_area {
        world.actor.areas.insert(area.clone(), DETECTION_RADIUS);
    }
    world.actor.areas.insert(AreaId::new("grab_zone"), GRAB_RADIUS);

    let controller_name = config.controller.name.clone();
    let mut controller = config.build().context("building controller")?;
    controller.initialize(&world.actor);

    let _session = controller_span(&controller_name).entered();
    let frames = (seconds / FRAME_DT).ceil() as u32;
    let mut clock = 0.0_f32;
    for _ in 0..frames {
        let angle = clock * ORBIT_SPEED;
        world
            .actor
            .set_target_position(Vec2::new(angle.cos(), angle.sin()) * ORBIT_RADIUS);

        controller.tick(FRAME_DT, &mut world.ctx());
        world.step(FRAME_DT);
        clock += FRAME_DT;
    }

    let mut damage_by_source: BTreeMap<&str, f32> = BTreeMap::new();
    for record in &world.effects.damage {
        *damage_by_source.entry(record.source.as_str()).or_insert(0.0) += record.amount;
    }

    info!(
        seconds,
        total_damage = world.effects.total_damage(),
        projectiles = world.spawner.spawned.len(),
        "duel finished"
    );
    for (source, amount) in &damage_by_source {
        info!(attack = source, amount, "damage dealt");
    }
    info!(stats = %controller.stats().to_json(), "controller stats");

    let report = run_selection_simulation(controller.table(), &SelectionSimConfig::default());
    for entry in &report.entries {
        info!(
            attack = %entry.name,
            expected = entry.expected_share,
            observed = entry.observed_share,
            max_gap = entry.max_gap,
            "selection balance"
        );
    }
    Ok(())
}
