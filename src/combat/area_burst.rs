//! Telegraphed area burst.
//!
//! The actor turns immune, then runs `burst_count` bursts inside a single
//! Active phase. Each burst teleports to a random anchor, shows a warning
//! footprint, fires a damaging laser over that footprint, and pauses. The
//! sequence is a small resumable state machine advanced by `on_tick`, so a
//! cancel between any two ticks stops it cleanly.

use bevy::math::Vec2;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::behavior::{Attack, AttackLogic, RangeGate};
use super::phase::{PhaseControl, PhaseHooks};
use super::{Phase, PhaseDurations};
use crate::actor::{direction_or, Actor, ActorState, AttackContext, TargetInfo};
use crate::constants::ACTIVE_PHASE_TAIL_SECS;
use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AreaBurstConfig {
    pub name: String,
    /// `active` is ignored; it is derived from the burst timings
    pub durations: PhaseDurations,
    pub gate: RangeGate,
    pub burst_count: u32,
    pub telegraph_duration: f32,
    pub laser_duration: f32,
    pub inter_burst_delay: f32,
    /// Offsets from the actor's starting position
    pub anchors: Vec<[f32; 2]>,
    /// Footprint center relative to the anchor: forward, right
    pub footprint_offset: [f32; 2],
    /// Half length along the aim, half width across it
    pub footprint_half_extents: [f32; 2],
    pub damage: f32,
    pub seed: u64,
}

impl Default for AreaBurstConfig {
    fn default() -> Self {
        Self {
            name: "area_burst".into(),
            durations: PhaseDurations::new(0.3, 0.0, 0.6, 4.0),
            gate: RangeGate {
                max_distance: 12.0,
                ..Default::default()
            },
            burst_count: 3,
            telegraph_duration: 0.8,
            laser_duration: 0.3,
            inter_burst_delay: 0.4,
            anchors: vec![[-4.0, 0.0], [4.0, 0.0], [0.0, 4.0], [0.0, -4.0]],
            footprint_offset: [5.0, 0.0],
            footprint_half_extents: [5.0, 0.75],
            damage: 20.0,
            seed: 0x5EED,
        }
    }
}

impl AreaBurstConfig {
    /// Length of one telegraph → laser → delay cycle
    pub fn burst_length(&self) -> f32 {
        self.telegraph_duration + self.laser_duration + self.inter_burst_delay
    }

    /// Active phase cap: every burst plus a small tail
    pub fn active_duration(&self) -> f32 {
        self.burst_count as f32 * self.burst_length() + ACTIVE_PHASE_TAIL_SECS
    }

    pub fn phase_durations(&self) -> PhaseDurations {
        PhaseDurations {
            active: self.active_duration(),
            ..self.durations
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let name = self.name.as_str();
        if let Some(field) = self.durations.invalid_field() {
            return Err(ConfigError::invalid(name, format!("{field} duration must be >= 0")));
        }
        self.gate.validate(name)?;
        if self.burst_count == 0 {
            return Err(ConfigError::invalid(name, "burst_count must be at least 1"));
        }
        if self.anchors.is_empty() {
            return Err(ConfigError::invalid(name, "at least one anchor is required"));
        }
        for (field, value) in [
            ("telegraph_duration", self.telegraph_duration),
            ("laser_duration", self.laser_duration),
            ("inter_burst_delay", self.inter_burst_delay),
            ("damage", self.damage),
            ("footprint_half_extents", self.footprint_half_extents[0]),
            ("footprint_half_extents", self.footprint_half_extents[1]),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::invalid(name, format!("{field} must be finite and >= 0")));
            }
        }
        Ok(())
    }

    pub fn build(self) -> Attack<AreaBurst> {
        let durations = self.phase_durations();
        Attack::new(durations, AreaBurst::new(self))
    }
}

/// Indicator style for the presenter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TelegraphKind {
    Warning, // harmless preview
    Active,  // damaging
}

/// Oriented rectangle covered by one burst
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TelegraphView {
    pub anchor: Vec2,
    pub center: Vec2,
    /// Unit aim direction; the footprint's long axis
    pub axis: Vec2,
    pub half_extents: Vec2,
    pub kind: TelegraphKind,
    pub remaining: f32,
}

impl TelegraphView {
    pub fn contains(&self, point: Vec2) -> bool {
        let local = point - self.center;
        let along = local.dot(self.axis);
        let across = local.dot(self.axis.perp());
        along.abs() <= self.half_extents.x && across.abs() <= self.half_extents.y
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BurstStage {
    Telegraph,
    Laser,
    Delay,
}

/// Area burst attack logic
#[derive(Debug, Clone)]
pub struct AreaBurst {
    config: AreaBurstConfig,
    rng: Xoshiro256PlusPlus,
    home: Option<Vec2>,
    immune: bool,
    burst_index: u32,
    stage: BurstStage,
    stage_remaining: f32,
    hit_this_burst: bool,
    view: Option<TelegraphView>,
    bursts_fired: u32,
}

impl AreaBurst {
    pub fn new(config: AreaBurstConfig) -> Self {
        let rng = Xoshiro256PlusPlus::seed_from_u64(config.seed);
        Self {
            config,
            rng,
            home: None,
            immune: false,
            burst_index: 0,
            stage: BurstStage::Telegraph,
            stage_remaining: 0.0,
            hit_this_burst: false,
            view: None,
            bursts_fired: 0,
        }
    }

    pub fn config(&self) -> &AreaBurstConfig {
        &self.config
    }

    /// Indicator to draw this frame, if any
    pub fn telegraph(&self) -> Option<&TelegraphView> {
        self.view.as_ref()
    }

    /// Lasers fired over the lifetime of this attack
    pub fn bursts_fired(&self) -> u32 {
        self.bursts_fired
    }

    fn begin_burst(&mut self, index: u32, ctx: &mut AttackContext<'_>) {
        let home = self.home.unwrap_or_else(|| ctx.actor.position());
        let offset = self
            .config
            .anchors
            .choose(&mut self.rng)
            .map(|a| Vec2::from(*a))
            .unwrap_or(Vec2::ZERO);
        let anchor = home + offset;
        ctx.actor.set_position(anchor);

        let axis = match ctx.live_target() {
            Some(target) => direction_or(anchor, target.position, ctx.actor.facing()),
            None => ctx.actor.facing(),
        };
        ctx.actor.face_towards(axis);

        let [forward, right] = self.config.footprint_offset;
        self.burst_index = index;
        self.stage = BurstStage::Telegraph;
        self.stage_remaining = self.config.telegraph_duration;
        self.hit_this_burst = false;
        self.view = Some(TelegraphView {
            anchor,
            center: anchor + axis * forward + axis.perp() * -right,
            axis,
            half_extents: Vec2::from(self.config.footprint_half_extents),
            kind: TelegraphKind::Warning,
            remaining: self.stage_remaining,
        });
        trace!(attack = %self.config.name, burst = index, ?anchor, "burst telegraphed");
    }

    fn apply_laser(&mut self, ctx: &mut AttackContext<'_>) {
        if self.hit_this_burst {
            return;
        }
        let (Some(view), Some(target)) = (self.view, ctx.live_target()) else {
            return;
        };
        if view.contains(target.position) {
            ctx.effects
                .apply_damage(target.id, self.config.damage, view.anchor, &self.config.name);
            self.hit_this_burst = true;
            debug!(attack = %self.config.name, burst = self.burst_index, "laser hit");
        }
    }

    /// Move to the next stage; returns false once the last burst is done
    fn next_stage(&mut self, ctx: &mut AttackContext<'_>) -> bool {
        match self.stage {
            BurstStage::Telegraph => {
                self.stage = BurstStage::Laser;
                self.stage_remaining += self.config.laser_duration;
                self.bursts_fired += 1;
                if let Some(view) = self.view.as_mut() {
                    view.kind = TelegraphKind::Active;
                }
                self.apply_laser(ctx);
                true
            }
            BurstStage::Laser => {
                self.stage = BurstStage::Delay;
                self.stage_remaining += self.config.inter_burst_delay;
                self.view = None;
                true
            }
            BurstStage::Delay => {
                let next = self.burst_index + 1;
                if next >= self.config.burst_count {
                    return false;
                }
                let carry = self.stage_remaining;
                self.begin_burst(next, ctx);
                self.stage_remaining += carry;
                true
            }
        }
    }

    /// Restore position and drop immunity. Safe to call repeatedly.
    fn cleanup(&mut self, ctx: &mut AttackContext<'_>) {
        if let Some(home) = self.home.take() {
            ctx.actor.set_position(home);
        }
        if self.immune {
            ctx.actor.revoke_immunity();
            self.immune = false;
        }
        self.view = None;
    }
}

impl<'w> PhaseHooks<AttackContext<'w>> for AreaBurst {
    fn on_warmup_started(&mut self, _ctl: &mut PhaseControl, ctx: &mut AttackContext<'w>) {
        self.home = Some(ctx.actor.position());
        if !self.immune {
            ctx.actor.grant_immunity();
            self.immune = true;
        }
        self.view = None;
        ctx.actor.set_velocity(Vec2::ZERO);
        ctx.actor.request_state(ActorState::Attack);
    }

    fn on_active_started(&mut self, _ctl: &mut PhaseControl, ctx: &mut AttackContext<'w>) {
        self.begin_burst(0, ctx);
    }

    fn on_recovery_started(&mut self, _ctl: &mut PhaseControl, ctx: &mut AttackContext<'w>) {
        self.cleanup(ctx);
    }

    fn on_attack_finished(&mut self, ctx: &mut AttackContext<'w>) {
        self.cleanup(ctx);
    }

    fn on_tick(&mut self, phase: Phase, dt: f32, ctl: &mut PhaseControl, ctx: &mut AttackContext<'w>) {
        if phase != Phase::Active {
            return;
        }
        self.stage_remaining -= dt.max(0.0);
        while self.stage_remaining <= 0.0 {
            if !self.next_stage(ctx) {
                self.cleanup(ctx);
                ctl.force_recovery();
                return;
            }
        }
        if self.stage == BurstStage::Laser {
            self.apply_laser(ctx);
        }
        if let Some(view) = self.view.as_mut() {
            view.remaining = self.stage_remaining;
        }
    }
}

impl AttackLogic for AreaBurst {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn start_gate(&self, actor: &dyn Actor, target: &TargetInfo) -> bool {
        self.config.gate.allows(actor, target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::AttackBehavior;
    use crate::sim::{SimWorld, SIM_TARGET_ID};

    const DT: f32 = 1.0 / 60.0;

    fn one_anchor_config() -> AreaBurstConfig {
        AreaBurstConfig {
            durations: PhaseDurations::new(0.2, 0.0, 0.3, 1.0),
            burst_count: 2,
            telegraph_duration: 0.5,
            laser_duration: 0.2,
            inter_burst_delay: 0.3,
            anchors: vec![[0.0, 2.0]],
            ..Default::default()
        }
    }

    fn run(world: &mut SimWorld, attack: &mut Attack<AreaBurst>, secs: f32) {
        let steps = (secs / DT).round() as usize;
        for _ in 0..steps {
            attack.tick(DT, &mut world.ctx());
            world.step(DT);
        }
    }

    #[test]
    fn test_active_duration_sums_bursts() {
        let config = one_anchor_config();
        let expected = 2.0 * (0.5 + 0.2 + 0.3) + ACTIVE_PHASE_TAIL_SECS;
        assert!((config.active_duration() - expected).abs() < 1e-5);
        assert!((config.phase_durations().active - expected).abs() < 1e-5);
    }

    #[test]
    fn test_immunity_and_relocation() {
        let mut world = SimWorld::with_target(Vec2::new(5.0, 2.0));
        let mut attack = one_anchor_config().build();
        assert!(attack.try_start(&mut world.ctx()));
        assert_eq!(world.actor.immunity, 1, "immune from warmup on");

        run(&mut world, &mut attack, 0.25);
        assert_eq!(attack.phase(), Phase::Active);
        assert_eq!(world.actor.position, Vec2::new(0.0, 2.0), "moved to anchor");
        let view = attack.logic().telegraph().copied().unwrap();
        assert_eq!(view.kind, TelegraphKind::Warning);
    }

    #[test]
    fn test_bursts_hit_once_each_and_restore() {
        let mut world = SimWorld::with_target(Vec2::new(5.0, 2.0));
        let mut attack = one_anchor_config().build();
        attack.try_start(&mut world.ctx());

        run(&mut world, &mut attack, 3.0);
        assert!(!attack.is_running());
        assert_eq!(attack.logic().bursts_fired(), 2);
        let hits = world
            .effects
            .damage
            .iter()
            .filter(|d| d.target == SIM_TARGET_ID)
            .count();
        assert_eq!(hits, 2, "one hit per burst despite multi-tick lasers");
        assert_eq!(world.actor.position, Vec2::ZERO, "home restored");
        assert_eq!(world.actor.immunity, 0);
        assert!(attack.logic().telegraph().is_none());
    }

    #[test]
    fn test_target_outside_footprint_unharmed() {
        let mut world = SimWorld::with_target(Vec2::new(2.0, 0.0));
        let config = AreaBurstConfig {
            footprint_offset: [5.0, 0.0],
            footprint_half_extents: [5.0, 0.5],
            ..one_anchor_config()
        };
        let mut attack = config.build();
        attack.try_start(&mut world.ctx());
        // Aim is fixed at telegraph start; the target then steps aside
        run(&mut world, &mut attack, 0.3);
        world.actor.set_target_position(Vec2::new(2.0, -3.0));
        run(&mut world, &mut attack, 0.6);
        assert_eq!(world.effects.total_damage(), 0.0);
    }

    #[test]
    fn test_cancel_mid_sequence_cleans_up_once() {
        let mut world = SimWorld::with_target(Vec2::new(5.0, 2.0));
        let mut attack = one_anchor_config().build();
        attack.try_start(&mut world.ctx());
        run(&mut world, &mut attack, 0.5);
        assert_eq!(attack.phase(), Phase::Active);

        attack.cancel(false, &mut world.ctx());
        assert!(attack.is_on_cooldown());
        assert_eq!(world.actor.position, Vec2::ZERO);
        assert_eq!(world.actor.immunity, 0);

        attack.cancel(true, &mut world.ctx());
        assert_eq!(world.actor.immunity, 0, "cleanup is idempotent");
    }

    #[test]
    fn test_seeded_anchor_choice_is_deterministic() {
        let pick = |seed: u64| {
            let mut world = SimWorld::with_target(Vec2::new(3.0, 0.0));
            let mut attack = AreaBurstConfig {
                seed,
                ..Default::default()
            }
            .build();
            attack.try_start(&mut world.ctx());
            run(&mut world, &mut attack, 0.35);
            world.actor.position
        };
        assert_eq!(pick(7), pick(7));
    }

    #[test]
    fn test_telegraph_contains() {
        let view = TelegraphView {
            anchor: Vec2::ZERO,
            center: Vec2::new(2.0, 0.0),
            axis: Vec2::X,
            half_extents: Vec2::new(2.0, 0.5),
            kind: TelegraphKind::Active,
            remaining: 0.1,
        };
        assert!(view.contains(Vec2::new(3.5, 0.4)));
        assert!(!view.contains(Vec2::new(3.5, 0.6)));
        assert!(!view.contains(Vec2::new(-0.1, 0.0)));
    }

    #[test]
    fn test_validate_rejects_empty_anchors() {
        let config = AreaBurstConfig {
            anchors: Vec::new(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
        assert!(AreaBurstConfig::default().validate().is_ok());
    }
}
