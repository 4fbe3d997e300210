//! Uniform attack contract and the timer + logic pairing behind it.
//!
//! [`AttackBehavior`] is the object-safe contract the controller drives.
//! [`Attack`] implements it for any [`AttackLogic`] by owning a
//! [`PhaseTimer`] next to the logic, so the timer can drive the logic's hooks
//! without aliasing.

use bevy::math::Vec2;
use serde::{Deserialize, Serialize};
use tracing::trace;

use super::phase::{PhaseHooks, PhaseTimer};
use super::{Phase, PhaseDurations};
use crate::actor::{Actor, AttackContext, TargetInfo};
use crate::constants::{ARRIVAL_EPSILON, FULL_CIRCLE_DEGREES};
use crate::error::ConfigError;

/// One attack "move" as seen by a scheduler.
pub trait AttackBehavior: Send + Sync {
    /// Selection and debug key
    fn name(&self) -> &str;

    /// One-time binding to the owning actor
    fn initialize(&mut self, _actor: &dyn Actor) {}

    /// Pure predicate, never mutates
    fn can_start(&self, actor: &dyn Actor) -> bool;

    /// Re-validates `can_start`, then enters Warmup. No state change on failure.
    fn try_start(&mut self, ctx: &mut AttackContext<'_>) -> bool;

    fn tick(&mut self, dt: f32, ctx: &mut AttackContext<'_>);

    /// Idle if `clear_cooldown`, else Cooldown. No-op when not running.
    fn cancel(&mut self, clear_cooldown: bool, ctx: &mut AttackContext<'_>);

    /// Warmup/Active → Recovery, for moves whose action ended early
    fn force_enter_recovery(&mut self, ctx: &mut AttackContext<'_>) -> bool;

    fn phase(&self) -> Phase;

    fn is_running(&self) -> bool {
        self.phase().is_running()
    }

    fn is_on_cooldown(&self) -> bool {
        self.phase().is_on_cooldown()
    }
}

/// Attack-specific half of an [`Attack`]: phase hooks plus start gating.
pub trait AttackLogic: Send + Sync + for<'w> PhaseHooks<AttackContext<'w>> {
    fn name(&self) -> &str;

    fn initialize(&mut self, _actor: &dyn Actor) {}

    /// Extra start conditions on top of the base rule (distance, facing cone)
    fn start_gate(&self, _actor: &dyn Actor, _target: &TargetInfo) -> bool {
        true
    }

    /// Lets the attack restart while its own timer is on Cooldown
    fn bypasses_cooldown(&self) -> bool {
        false
    }
}

/// Phase timer bound to one attack's logic
#[derive(Debug, Clone)]
pub struct Attack<L> {
    timer: PhaseTimer,
    logic: L,
}

impl<L: AttackLogic> Attack<L> {
    pub fn new(durations: PhaseDurations, logic: L) -> Self {
        Self {
            timer: PhaseTimer::new(durations),
            logic,
        }
    }

    pub fn logic(&self) -> &L {
        &self.logic
    }

    pub fn logic_mut(&mut self) -> &mut L {
        &mut self.logic
    }

    pub fn timer(&self) -> &PhaseTimer {
        &self.timer
    }
}

impl<L: AttackLogic> AttackBehavior for Attack<L> {
    fn name(&self) -> &str {
        self.logic.name()
    }

    fn initialize(&mut self, actor: &dyn Actor) {
        self.logic.initialize(actor);
    }

    fn can_start(&self, actor: &dyn Actor) -> bool {
        if self.timer.is_running() {
            return false;
        }
        if self.timer.is_on_cooldown() && !self.logic.bypasses_cooldown() {
            return false;
        }
        if !actor.is_alive() || actor.attack_lockout() > 0.0 {
            return false;
        }
        let Some(target) = actor.target().filter(|t| t.alive) else {
            return false;
        };
        self.logic.start_gate(actor, &target)
    }

    fn try_start(&mut self, ctx: &mut AttackContext<'_>) -> bool {
        if !self.can_start(&*ctx.actor) {
            trace!(attack = self.logic.name(), "start rejected");
            return false;
        }
        let started = self.timer.start(&mut self.logic, ctx);
        if started {
            trace!(attack = self.logic.name(), "warmup started");
        }
        started
    }

    fn tick(&mut self, dt: f32, ctx: &mut AttackContext<'_>) {
        if self.timer.is_running() && !ctx.actor.is_alive() {
            trace!(attack = self.logic.name(), "actor gone, aborting");
            self.cancel(true, ctx);
            return;
        }
        self.timer.tick(dt, &mut self.logic, ctx);
    }

    fn cancel(&mut self, clear_cooldown: bool, ctx: &mut AttackContext<'_>) {
        if self.timer.is_running() {
            trace!(attack = self.logic.name(), clear_cooldown, "cancelled");
        }
        self.timer.cancel(clear_cooldown, &mut self.logic, ctx);
    }

    fn force_enter_recovery(&mut self, ctx: &mut AttackContext<'_>) -> bool {
        self.timer.force_recovery(&mut self.logic, ctx)
    }

    fn phase(&self) -> Phase {
        self.timer.phase()
    }
}

// =====================================================
// Shared gates and movement
// =====================================================

/// Distance band plus facing cone a target must satisfy to start an attack
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RangeGate {
    pub min_distance: f32,
    pub max_distance: f32,
    /// Half-angle in degrees; 180 or more disables the cone check
    pub max_facing_angle: f32,
}

impl Default for RangeGate {
    fn default() -> Self {
        Self {
            min_distance: 0.0,
            max_distance: 6.0,
            max_facing_angle: FULL_CIRCLE_DEGREES,
        }
    }
}

impl RangeGate {
    pub fn allows(&self, actor: &dyn Actor, target: &TargetInfo) -> bool {
        let offset = target.position - actor.position();
        let distance = offset.length();
        if distance < self.min_distance || distance > self.max_distance {
            return false;
        }
        if self.max_facing_angle >= FULL_CIRCLE_DEGREES || distance <= f32::EPSILON {
            return true;
        }
        facing_angle_degrees(actor.facing(), offset) <= self.max_facing_angle
    }

    pub fn validate(&self, attack: &str) -> Result<(), ConfigError> {
        if !(self.min_distance >= 0.0) || self.max_distance.is_nan() {
            return Err(ConfigError::invalid(attack, "gate distances must be non-negative"));
        }
        if self.min_distance > self.max_distance {
            return Err(ConfigError::invalid(attack, "gate min_distance exceeds max_distance"));
        }
        if !(self.max_facing_angle >= 0.0) {
            return Err(ConfigError::invalid(attack, "max_facing_angle must be non-negative"));
        }
        Ok(())
    }
}

/// Angle in degrees between the forward vector and the direction to target
pub fn facing_angle_degrees(forward: Vec2, to_target: Vec2) -> f32 {
    let f = forward.normalize_or_zero();
    let d = to_target.normalize_or_zero();
    if f == Vec2::ZERO || d == Vec2::ZERO {
        return 0.0;
    }
    f.dot(d).clamp(-1.0, 1.0).acos().to_degrees()
}

/// Result of advancing a dash by one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DashStatus {
    Moving,
    Arrived,
    Blocked,
}

/// Straight-line dash toward a point fixed at dash start
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dash {
    pub destination: Vec2,
    pub direction: Vec2,
    pub speed: f32,
}

impl Dash {
    /// Aim at `toward`, travelling a distance clamped to `[min, max]`.
    pub fn begin(actor: &mut dyn Actor, toward: Vec2, min: f32, max: f32, speed: f32) -> Self {
        let origin = actor.position();
        let direction = crate::actor::direction_or(origin, toward, actor.facing());
        let distance = origin.distance(toward).clamp(min, max.max(min));
        let dash = Self {
            destination: origin + direction * distance,
            direction,
            speed,
        };
        actor.face_towards(direction);
        actor.set_velocity(direction * speed);
        dash
    }

    /// Stop at the destination once it is within one tick of travel.
    pub fn step(&self, actor: &mut dyn Actor, dt: f32) -> DashStatus {
        if actor.is_blocked() {
            actor.set_velocity(Vec2::ZERO);
            return DashStatus::Blocked;
        }
        let remaining = self.destination - actor.position();
        let reach = self.speed * dt.max(0.0) + ARRIVAL_EPSILON;
        if remaining.length() <= reach || remaining.dot(self.direction) <= 0.0 {
            actor.set_position(self.destination);
            actor.set_velocity(Vec2::ZERO);
            return DashStatus::Arrived;
        }
        DashStatus::Moving
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::ActorState;
    use crate::combat::phase::PhaseControl;
    use crate::sim::SimWorld;

    struct Probe {
        gate_open: bool,
        bypass: bool,
        finished: u32,
    }

    impl Probe {
        fn new() -> Self {
            Self {
                gate_open: true,
                bypass: false,
                finished: 0,
            }
        }
    }

    impl<'w> PhaseHooks<AttackContext<'w>> for Probe {
        fn on_warmup_started(&mut self, _ctl: &mut PhaseControl, ctx: &mut AttackContext<'w>) {
            ctx.actor.request_state(ActorState::Attack);
        }
        fn on_attack_finished(&mut self, _ctx: &mut AttackContext<'w>) {
            self.finished += 1;
        }
    }

    impl AttackLogic for Probe {
        fn name(&self) -> &str {
            "probe"
        }
        fn start_gate(&self, _actor: &dyn Actor, _target: &TargetInfo) -> bool {
            self.gate_open
        }
        fn bypasses_cooldown(&self) -> bool {
            self.bypass
        }
    }

    fn probe(durations: PhaseDurations) -> Attack<Probe> {
        Attack::new(durations, Probe::new())
    }

    #[test]
    fn test_try_start_requires_target() {
        let mut world = SimWorld::new();
        world.actor.target = None;
        let mut attack = probe(PhaseDurations::default());
        assert!(!attack.can_start(&world.actor));
        assert!(!attack.try_start(&mut world.ctx()));
        assert_eq!(attack.phase(), Phase::Idle);
    }

    #[test]
    fn test_try_start_blocked_by_lockout() {
        let mut world = SimWorld::with_target(Vec2::new(2.0, 0.0));
        world.actor.lockout = 0.5;
        let mut attack = probe(PhaseDurations::default());
        assert!(!attack.try_start(&mut world.ctx()));
    }

    #[test]
    fn test_try_start_enters_warmup() {
        let mut world = SimWorld::with_target(Vec2::new(2.0, 0.0));
        let mut attack = probe(PhaseDurations::default());
        assert!(attack.try_start(&mut world.ctx()));
        assert_eq!(attack.phase(), Phase::Warmup);
        assert_eq!(world.actor.state, ActorState::Attack);
        assert!(!attack.can_start(&world.actor), "running attacks cannot start");
    }

    #[test]
    fn test_gate_rejects() {
        let mut world = SimWorld::with_target(Vec2::new(2.0, 0.0));
        let mut attack = probe(PhaseDurations::default());
        attack.logic_mut().gate_open = false;
        assert!(!attack.try_start(&mut world.ctx()));
    }

    #[test]
    fn test_start_then_cancel_keeps_cooldown() {
        let mut world = SimWorld::with_target(Vec2::new(2.0, 0.0));
        let mut attack = probe(PhaseDurations::default());
        assert!(attack.try_start(&mut world.ctx()));
        attack.cancel(false, &mut world.ctx());
        assert!(attack.is_on_cooldown());
        assert!(!attack.is_running());
        assert_eq!(attack.logic().finished, 1);
        assert!(!attack.can_start(&world.actor));
    }

    #[test]
    fn test_bypass_cooldown() {
        let mut world = SimWorld::with_target(Vec2::new(2.0, 0.0));
        let mut attack = probe(PhaseDurations::default());
        attack.logic_mut().bypass = true;
        attack.try_start(&mut world.ctx());
        attack.cancel(false, &mut world.ctx());
        assert!(attack.is_on_cooldown());
        assert!(attack.can_start(&world.actor));
    }

    #[test]
    fn test_dead_actor_cancels_on_tick() {
        let mut world = SimWorld::with_target(Vec2::new(2.0, 0.0));
        let mut attack = probe(PhaseDurations::default());
        attack.try_start(&mut world.ctx());
        world.actor.alive = false;
        attack.tick(0.016, &mut world.ctx());
        assert_eq!(attack.phase(), Phase::Idle);
        assert_eq!(attack.logic().finished, 1);
    }

    #[test]
    fn test_zero_durations_complete_in_one_tick() {
        let mut world = SimWorld::with_target(Vec2::new(2.0, 0.0));
        let mut attack = probe(PhaseDurations::ZERO);
        attack.try_start(&mut world.ctx());
        attack.tick(0.016, &mut world.ctx());
        assert_eq!(attack.phase(), Phase::Idle);
        assert_eq!(attack.logic().finished, 1);
    }

    #[test]
    fn test_range_gate_distance_band() {
        let world = SimWorld::with_target(Vec2::new(5.0, 0.0));
        let target = world.actor.target().unwrap();
        let gate = RangeGate {
            min_distance: 2.0,
            max_distance: 4.0,
            ..Default::default()
        };
        assert!(!gate.allows(&world.actor, &target));
        let wide = RangeGate {
            max_distance: 6.0,
            ..gate
        };
        assert!(wide.allows(&world.actor, &target));
    }

    #[test]
    fn test_range_gate_facing_cone() {
        let mut world = SimWorld::with_target(Vec2::new(-3.0, 0.0));
        world.actor.facing = Vec2::X;
        let target = world.actor.target().unwrap();
        let gate = RangeGate {
            max_facing_angle: 60.0,
            ..Default::default()
        };
        assert!(!gate.allows(&world.actor, &target), "target behind");
        world.actor.facing = Vec2::NEG_X;
        assert!(gate.allows(&world.actor, &target));
    }

    #[test]
    fn test_facing_angle() {
        assert!((facing_angle_degrees(Vec2::X, Vec2::Y) - 90.0).abs() < 1e-3);
        assert!(facing_angle_degrees(Vec2::X, Vec2::new(4.0, 0.0)).abs() < 1e-3);
        assert_eq!(facing_angle_degrees(Vec2::ZERO, Vec2::Y), 0.0);
    }

    #[test]
    fn test_range_gate_validate() {
        assert!(RangeGate::default().validate("a").is_ok());
        let bad = RangeGate {
            min_distance: 5.0,
            max_distance: 1.0,
            ..Default::default()
        };
        assert!(bad.validate("a").is_err());
    }

    #[test]
    fn test_dash_clamps_distance() {
        let mut world = SimWorld::with_target(Vec2::new(20.0, 0.0));
        let dash = Dash::begin(&mut world.actor, Vec2::new(20.0, 0.0), 2.0, 8.0, 10.0);
        assert!((dash.destination.x - 8.0).abs() < 1e-4);
        assert_eq!(world.actor.velocity, Vec2::new(10.0, 0.0));

        let short = Dash::begin(&mut world.actor, Vec2::new(0.5, 0.0), 2.0, 8.0, 10.0);
        assert!((short.destination.x - 2.0).abs() < 1e-4);
    }

    #[test]
    fn test_dash_arrives() {
        let mut world = SimWorld::with_target(Vec2::new(3.0, 0.0));
        let dash = Dash::begin(&mut world.actor, Vec2::new(3.0, 0.0), 0.0, 3.0, 10.0);
        let mut status = DashStatus::Moving;
        for _ in 0..60 {
            world.actor.integrate(1.0 / 60.0);
            status = dash.step(&mut world.actor, 1.0 / 60.0);
            if status != DashStatus::Moving {
                break;
            }
        }
        assert_eq!(status, DashStatus::Arrived);
        assert!((world.actor.position.x - 3.0).abs() < 1e-4);
        assert_eq!(world.actor.velocity, Vec2::ZERO);
    }

    #[test]
    fn test_dash_blocked() {
        let mut world = SimWorld::with_target(Vec2::new(3.0, 0.0));
        let dash = Dash::begin(&mut world.actor, Vec2::new(3.0, 0.0), 0.0, 3.0, 10.0);
        world.actor.blocked = true;
        assert_eq!(dash.step(&mut world.actor, 0.016), DashStatus::Blocked);
        assert_eq!(world.actor.velocity, Vec2::ZERO);
    }
}
