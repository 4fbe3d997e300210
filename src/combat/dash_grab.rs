//! Dash-grab: lunge at the target and hold it if the grab zone connects.
//!
//! Warmup is a stationary telegraph. Active dashes toward where the target
//! stood and ends early on grab-zone overlap, arrival or a wall. Recovery
//! either captures (status + escape window, phase held until resolved) or
//! falls back to the miss lockout.

use bevy::math::Vec2;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::behavior::{Attack, AttackLogic, Dash, DashStatus, RangeGate};
use super::phase::{PhaseControl, PhaseHooks};
use super::{Phase, PhaseDurations};
use crate::actor::{direction_or, Actor, ActorId, ActorState, AreaId, AttackContext, StatusKind, TargetInfo};
use crate::constants::{DEFAULT_DASH_SPEED, DEFAULT_MISS_LOCKOUT_SECS, DEFAULT_POST_GRAB_COOLDOWN_SECS};
use crate::error::ConfigError;

/// How the last grab attempt ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GrabOutcome {
    #[default]
    Pending,
    Missed,  // grab zone empty at Recovery entry
    Escaped, // target broke free inside the window
    Damaged, // window ran out, damage applied
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashGrabConfig {
    pub name: String,
    pub durations: PhaseDurations,
    pub gate: RangeGate,
    pub dash_speed: f32,
    pub min_dash_distance: f32,
    pub max_dash_distance: f32,
    pub grab_area: AreaId,
    /// Duration of the Grabbed status applied on capture
    pub hold_duration: f32,
    pub escape_window: f32,
    pub grab_damage: f32,
    pub post_grab_cooldown: f32,
    pub miss_lockout: f32,
}

impl Default for DashGrabConfig {
    fn default() -> Self {
        Self {
            name: "dash_grab".into(),
            durations: PhaseDurations::new(0.5, 0.6, 0.4, 2.0),
            gate: RangeGate {
                min_distance: 1.5,
                max_distance: 8.0,
                ..Default::default()
            },
            dash_speed: DEFAULT_DASH_SPEED,
            min_dash_distance: 2.0,
            max_dash_distance: 8.0,
            grab_area: AreaId::new("grab_zone"),
            hold_duration: 1.5,
            escape_window: 1.2,
            grab_damage: 25.0,
            post_grab_cooldown: DEFAULT_POST_GRAB_COOLDOWN_SECS,
            miss_lockout: DEFAULT_MISS_LOCKOUT_SECS,
        }
    }
}

impl DashGrabConfig {
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
            ("hold_duration", self.hold_duration),
            ("escape_window", self.escape_window),
            ("grab_damage", self.grab_damage),
            ("post_grab_cooldown", self.post_grab_cooldown),
            ("miss_lockout", self.miss_lockout),
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

    pub fn build(self) -> Attack<DashGrab> {
        let durations = self.durations;
        Attack::new(durations, DashGrab::new(self))
    }
}

/// Dash-grab attack logic
#[derive(Debug, Clone)]
pub struct DashGrab {
    config: DashGrabConfig,
    dash: Option<Dash>,
    captured: Option<ActorId>,
    escape_remaining: f32,
    outcome: GrabOutcome,
}

impl DashGrab {
    pub fn new(config: DashGrabConfig) -> Self {
        Self {
            config,
            dash: None,
            captured: None,
            escape_remaining: 0.0,
            outcome: GrabOutcome::Pending,
        }
    }

    pub fn config(&self) -> &DashGrabConfig {
        &self.config
    }

    pub fn outcome(&self) -> GrabOutcome {
        self.outcome
    }

    /// Target currently held, if any
    pub fn captured(&self) -> Option<ActorId> {
        self.captured
    }

    fn release(&mut self, ctx: &mut AttackContext<'_>) {
        if let Some(target) = self.captured.take() {
            if ctx.effects.has_status(target, StatusKind::Grabbed) {
                ctx.effects.clear_status(target, StatusKind::Grabbed);
            }
        }
    }

    /// Post-grab lockout plus the cosmetic frozen label
    fn resolve(&mut self, outcome: GrabOutcome, ctl: &mut PhaseControl, ctx: &mut AttackContext<'_>) {
        self.outcome = outcome;
        self.captured = None;
        ctx.actor.set_attack_lockout(self.config.post_grab_cooldown);
        ctx.actor.request_state(ActorState::CooldownFrozen);
        ctl.finish_phase();
        debug!(attack = %self.config.name, ?outcome, "grab resolved");
    }
}

impl<'w> PhaseHooks<AttackContext<'w>> for DashGrab {
    fn on_warmup_started(&mut self, _ctl: &mut PhaseControl, ctx: &mut AttackContext<'w>) {
        self.dash = None;
        self.captured = None;
        self.outcome = GrabOutcome::Pending;
        ctx.actor.set_velocity(Vec2::ZERO);
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

    fn on_recovery_started(&mut self, ctl: &mut PhaseControl, ctx: &mut AttackContext<'w>) {
        self.dash = None;
        ctx.actor.set_velocity(Vec2::ZERO);

        let target = ctx
            .live_target()
            .filter(|_| ctx.actor.area_contains_target(&self.config.grab_area));
        match target {
            Some(target) => {
                ctx.effects
                    .apply_status(target.id, StatusKind::Grabbed, self.config.hold_duration);
                self.captured = Some(target.id);
                self.escape_remaining = self.config.escape_window;
                ctl.hold_phase();
                debug!(attack = %self.config.name, target = target.id.0, "target captured");
            }
            None => {
                ctx.actor.set_attack_lockout(self.config.miss_lockout);
                self.outcome = GrabOutcome::Missed;
                debug!(attack = %self.config.name, "grab missed");
            }
        }
    }

    fn on_attack_finished(&mut self, ctx: &mut AttackContext<'w>) {
        self.dash = None;
        ctx.actor.set_velocity(Vec2::ZERO);
        self.release(ctx);
    }

    fn on_tick(&mut self, phase: Phase, dt: f32, ctl: &mut PhaseControl, ctx: &mut AttackContext<'w>) {
        match phase {
            Phase::Active => {
                if ctx.actor.area_contains_target(&self.config.grab_area) {
                    ctx.actor.set_velocity(Vec2::ZERO);
                    ctl.force_recovery();
                    return;
                }
                if let Some(dash) = self.dash {
                    if dash.step(&mut *ctx.actor, dt) != DashStatus::Moving {
                        ctl.force_recovery();
                    }
                }
            }
            Phase::Recovery => {
                let Some(target) = self.captured else {
                    return;
                };
                let target_alive = ctx.live_target().is_some_and(|t| t.id == target);
                if !target_alive || !ctx.effects.has_status(target, StatusKind::Grabbed) {
                    self.release(ctx);
                    self.resolve(GrabOutcome::Escaped, ctl, ctx);
                    return;
                }
                self.escape_remaining -= dt.max(0.0);
                if self.escape_remaining <= 0.0 {
                    let origin = ctx.actor.position();
                    ctx.effects
                        .apply_damage(target, self.config.grab_damage, origin, &self.config.name);
                    ctx.effects.clear_status(target, StatusKind::Grabbed);
                    self.resolve(GrabOutcome::Damaged, ctl, ctx);
                }
            }
            _ => {}
        }
    }
}

impl AttackLogic for DashGrab {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn start_gate(&self, actor: &dyn Actor, target: &TargetInfo) -> bool {
        self.config.gate.allows(actor, target)
    }
}
