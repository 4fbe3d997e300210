//! Volley: fixed-cadence shots, grouped into volleys.
//!
//! Shots are either spawned projectiles (with an impulse) or direct damage
//! when no projectile is configured. The Active phase is sized up front from
//! the shot schedule.

use bevy::math::Vec2;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::behavior::{Attack, AttackLogic, RangeGate};
use super::phase::{PhaseControl, PhaseHooks};
use super::{Phase, PhaseDurations};
use crate::actor::{direction_or, Actor, ActorState, AttackContext, ProjectileDescriptor, TargetInfo};
use crate::constants::ACTIVE_PHASE_TAIL_SECS;
use crate::error::ConfigError;

/// When the firing direction is recomputed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AimMode {
    #[default]
    PerAttack,
    PerVolley,
    PerShot,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VolleyConfig {
    pub name: String,
    /// `active` is ignored; it is derived from the shot schedule
    pub durations: PhaseDurations,
    pub gate: RangeGate,
    pub shots_per_volley: u32,
    pub volley_count: u32,
    pub shot_interval: f32,
    pub volley_interval: f32,
    pub aim_mode: AimMode,
    /// `None` fires direct damage instead of spawning
    pub projectile: Option<ProjectileDescriptor>,
    pub projectile_speed: f32,
    pub damage: f32,
    pub max_range: f32,
    pub spawn_offset: f32,
}

impl Default for VolleyConfig {
    fn default() -> Self {
        Self {
            name: "volley".into(),
            durations: PhaseDurations::new(0.6, 0.0, 0.5, 2.5),
            gate: RangeGate {
                min_distance: 3.0,
                max_distance: 14.0,
                ..Default::default()
            },
            shots_per_volley: 3,
            volley_count: 2,
            shot_interval: 0.15,
            volley_interval: 0.6,
            aim_mode: AimMode::PerVolley,
            projectile: Some(ProjectileDescriptor {
                item: "bone_shard".into(),
                damage: 6.0,
            }),
            projectile_speed: 20.0,
            damage: 6.0,
            max_range: 14.0,
            spawn_offset: 0.8,
        }
    }
}

impl VolleyConfig {
    pub fn total_shots(&self) -> u32 {
        self.shots_per_volley.saturating_mul(self.volley_count)
    }

    /// Time from the first shot to the last
    pub fn schedule_length(&self) -> f32 {
        let shots = self.shots_per_volley.max(1) as f32;
        let volleys = self.volley_count.max(1) as f32;
        volleys * (shots - 1.0) * self.shot_interval + (volleys - 1.0) * self.volley_interval
    }

    pub fn active_duration(&self) -> f32 {
        self.schedule_length() + ACTIVE_PHASE_TAIL_SECS
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
        if self.shots_per_volley == 0 || self.volley_count == 0 {
            return Err(ConfigError::invalid(name, "shot and volley counts must be at least 1"));
        }
        for (field, value) in [
            ("shot_interval", self.shot_interval),
            ("volley_interval", self.volley_interval),
            ("projectile_speed", self.projectile_speed),
            ("damage", self.damage),
            ("max_range", self.max_range),
            ("spawn_offset", self.spawn_offset),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::invalid(name, format!("{field} must be finite and >= 0")));
            }
        }
        Ok(())
    }

    pub fn build(self) -> Attack<Volley> {
        let durations = self.phase_durations();
        Attack::new(durations, Volley::new(self))
    }
}

/// Volley attack logic
#[derive(Debug, Clone)]
pub struct Volley {
    config: VolleyConfig,
    fired: u32,
    next_shot_in: f32,
    aim: Vec2,
}

impl Volley {
    pub fn new(config: VolleyConfig) -> Self {
        Self {
            config,
            fired: 0,
            next_shot_in: 0.0,
            aim: Vec2::X,
        }
    }

    pub fn config(&self) -> &VolleyConfig {
        &self.config
    }

    /// Shots fired in the current (or last) run
    pub fn shots_fired(&self) -> u32 {
        self.fired
    }

    fn remaining_shots(&self) -> u32 {
        self.config.total_shots().saturating_sub(self.fired)
    }

    fn reaim(&mut self, ctx: &mut AttackContext<'_>) {
        let origin = ctx.actor.position();
        let fallback = ctx.actor.facing();
        self.aim = match ctx.live_target() {
            Some(target) => direction_or(origin, target.position, fallback),
            None => fallback,
        };
        ctx.actor.face_towards(self.aim);
    }

    fn fire(&mut self, ctx: &mut AttackContext<'_>) {
        let per_volley = self.config.shots_per_volley.max(1);
        let refresh = match self.config.aim_mode {
            AimMode::PerAttack => self.fired == 0,
            AimMode::PerVolley => self.fired % per_volley == 0,
            AimMode::PerShot => true,
        };
        if refresh {
            self.reaim(ctx);
        }

        let origin = ctx.actor.position();
        match &self.config.projectile {
            Some(descriptor) => {
                let spawn_at = origin + self.aim * self.config.spawn_offset;
                let owner = ctx.actor.id();
                if let Some(handle) = ctx.spawner.spawn_projectile(owner, descriptor, spawn_at) {
                    ctx.spawner
                        .apply_impulse(handle, self.aim * self.config.projectile_speed);
                }
            }
            None => {
                if let Some(target) = ctx.live_target() {
                    if target.position.distance(origin) <= self.config.max_range {
                        ctx.effects
                            .apply_damage(target.id, self.config.damage, origin, &self.config.name);
                    }
                }
            }
        }

        self.fired += 1;
        self.next_shot_in += if self.fired % per_volley == 0 {
            self.config.volley_interval
        } else {
            self.config.shot_interval
        };
        trace!(attack = %self.config.name, shot = self.fired, "shot fired");
    }
}

impl<'w> PhaseHooks<AttackContext<'w>> for Volley {
    fn on_warmup_started(&mut self, _ctl: &mut PhaseControl, ctx: &mut AttackContext<'w>) {
        self.fired = 0;
        self.next_shot_in = 0.0;
        ctx.actor.set_velocity(Vec2::ZERO);
        ctx.actor.request_state(ActorState::Attack);
        self.reaim(ctx);
    }

    fn on_active_started(&mut self, ctl: &mut PhaseControl, ctx: &mut AttackContext<'w>) {
        self.next_shot_in = 0.0;
        if self.remaining_shots() > 0 {
            self.fire(ctx);
        }
        if self.remaining_shots() == 0 {
            ctl.force_recovery();
        }
    }

    /// Shots still owed when Active ran out are fired now; a forced
    /// Recovery drops them
    fn on_recovery_started(&mut self, ctl: &mut PhaseControl, ctx: &mut AttackContext<'w>) {
        let owed = self.remaining_shots();
        if self.fired == 0 || owed == 0 {
            return;
        }
        if ctl.was_forced() {
            debug!(attack = %self.config.name, owed, "volley cut short");
            return;
        }
        debug!(attack = %self.config.name, owed, "flushing late shots");
        for _ in 0..owed {
            self.fire(ctx);
        }
    }

    fn on_tick(&mut self, phase: Phase, dt: f32, ctl: &mut PhaseControl, ctx: &mut AttackContext<'w>) {
        if phase != Phase::Active {
            return;
        }
        self.next_shot_in -= dt.max(0.0);
        while self.remaining_shots() > 0 && self.next_shot_in <= 0.0 {
            self.fire(ctx);
        }
        if self.remaining_shots() == 0 {
            ctl.force_recovery();
        }
    }
}

impl AttackLogic for Volley {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn start_gate(&self, actor: &dyn Actor, target: &TargetInfo) -> bool {
        self.config.gate.allows(actor, target)
    }
}
