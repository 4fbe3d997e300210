//! Dash-strike: close the gap, pause, swing.

use bevy::math::Vec2;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::behavior::{Attack, AttackLogic, Dash, DashStatus, RangeGate};
use super::phase::{PhaseControl, PhaseHooks};
use super::{Phase, PhaseDurations};
use crate::actor::{direction_or, Actor, ActorState, AttackContext, TargetInfo};
use crate::constants::DEFAULT_DASH_SPEED;
use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashStrikeConfig {
    pub name: String,
    /// `active` caps the dash plus strike delay
    pub durations: PhaseDurations,
    pub gate: RangeGate,
    pub dash_speed: f32,
    pub min_dash_distance: f32,
    pub max_dash_distance: f32,
    pub strike_delay: f32,
    pub strike_range: f32,
    pub damage: f32,
}

impl Default for DashStrikeConfig {
    fn default() -> Self {
        Self {
            name: "dash_strike".into(),
            durations: PhaseDurations::new(0.35, 0.8, 0.45, 1.2),
            gate: RangeGate {
                min_distance: 2.0,
                max_distance: 7.0,
                max_facing_angle: 60.0,
            },
            dash_speed: DEFAULT_DASH_SPEED,
            min_dash_distance: 1.5,
            max_dash_distance: 6.0,
            strike_delay: 0.12,
            strike_range: 1.5,
            damage: 15.0,
        }
    }
}

impl DashStrikeConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let name = self.name.as_str();
        if let Some(field) = self.durations.invalid_field() {
            return Err(ConfigError::invalid(name, format!("{field} duration must be >= 0")));
        }
        self.gate.validate(name)?;
        for (field, value) in [
            ("dash_speed", self.dash_speed),
            ("min_dash_distance", self.min_dash_distance),
            ("max_dash_distance", self.max_dash_distance),
            ("strike_delay", self.strike_delay),
            ("strike_range", self.strike_range),
            ("damage", self.damage),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::invalid(name, format!("{field} must be finite and >= 0")));
            }
        }
        if self.min_dash_distance > self.max_dash_distance {
            return Err(ConfigError::invalid(name, "min_dash_distance exceeds max_dash_distance"));
        }
        Ok(())
    }

    pub fn build(self) -> Attack<DashStrike> {
        let durations = self.durations;
        Attack::new(durations, DashStrike::new(self))
    }
}

/// Dash-strike attack logic
#[derive(Debug, Clone)]
pub struct DashStrike {
    config: DashStrikeConfig,
    dash: Option<Dash>,
    strike_countdown: Option<f32>,
    last_hit: Option<bool>,
}

impl DashStrike {
    pub fn new(config: DashStrikeConfig) -> Self {
        Self {
            config,
            dash: None,
            strike_countdown: None,
            last_hit: None,
        }
    }

    pub fn config(&self) -> &DashStrikeConfig {
        &self.config
    }

    /// Whether the last strike connected; `None` if it never fired
    pub fn last_hit(&self) -> Option<bool> {
        self.last_hit
    }

    fn strike(&mut self, ctx: &mut AttackContext<'_>) {
        let origin = ctx.actor.position();
        let hit = match ctx.live_target() {
            Some(target) if target.position.distance(origin) <= self.config.strike_range => {
                ctx.effects
                    .apply_damage(target.id, self.config.damage, origin, &self.config.name);
                true
            }
            _ => false,
        };
        self.last_hit = Some(hit);
        debug!(attack = %self.config.name, hit, "strike");
    }

    fn stop(&mut self, ctx: &mut AttackContext<'_>) {
        self.dash = None;
        self.strike_countdown = None;
        ctx.actor.set_velocity(Vec2::ZERO);
    }
}

impl<'w> PhaseHooks<AttackContext<'w>> for DashStrike {
    fn on_warmup_started(&mut self, _ctl: &mut PhaseControl, ctx: &mut AttackContext<'w>) {
        self.stop(ctx);
        self.last_hit = None;
        ctx.actor.request_state(ActorState::Attack);
        if let Some(target) = ctx.live_target() {
            let dir = direction_or(ctx.actor.position(), target.position, ctx.actor.facing());
            ctx.actor.face_towards(dir);
        }
    }

    fn on_active_started(&mut self, _ctl: &mut PhaseControl, ctx: &mut AttackContext<'w>) {
        let toward = match ctx.live_target() {
            Some(target) => target.position,
            None => ctx.actor.position() + ctx.actor.facing() * self.config.max_dash_distance,
        };
        self.dash = Some(Dash::begin(
            &mut *ctx.actor,
            toward,
            self.config.min_dash_distance,
            self.config.max_dash_distance,
            self.config.dash_speed,
        ));
        trace!(attack = %self.config.name, "dash started");
    }

    fn on_recovery_started(&mut self, _ctl: &mut PhaseControl, ctx: &mut AttackContext<'w>) {
        self.stop(ctx);
    }

    fn on_attack_finished(&mut self, ctx: &mut AttackContext<'w>) {
        self.stop(ctx);
    }

    fn on_tick(&mut self, phase: Phase, dt: f32, ctl: &mut PhaseControl, ctx: &mut AttackContext<'w>) {
        if phase != Phase::Active {
            return;
        }
        if let Some(remaining) = self.strike_countdown.as_mut() {
            *remaining -= dt.max(0.0);
            if *remaining <= 0.0 {
                self.strike(ctx);
                ctl.force_recovery();
            }
            return;
        }
        let Some(dash) = self.dash else {
            return;
        };
        if dash.step(&mut *ctx.actor, dt) != DashStatus::Moving {
            self.dash = None;
            if self.config.strike_delay <= 0.0 {
                self.strike(ctx);
                ctl.force_recovery();
            } else {
                self.strike_countdown = Some(self.config.strike_delay);
            }
        }
    }
}

impl AttackLogic for DashStrike {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn start_gate(&self, actor: &dyn Actor, target: &TargetInfo) -> bool {
        self.config.gate.allows(actor, target)
    }
}
