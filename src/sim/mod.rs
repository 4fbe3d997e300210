//! In-memory host for headless simulation.
//!
//! A minimal stand-in for the game world: one kinematic actor with circular
//! areas, a status/damage ledger, and a projectile log. Used by the demo
//! binary, benches and tests.

use std::collections::HashMap;

use bevy::math::Vec2;

use crate::actor::{
    Actor, ActorId, ActorState, AreaId, AttackContext, EffectSink, ProjectileDescriptor,
    ProjectileHandle, Spawner, StatusKind, TargetInfo,
};
use crate::constants::DEFAULT_DETECTION_RANGE;

pub const SIM_ACTOR_ID: ActorId = ActorId(1);
pub const SIM_TARGET_ID: ActorId = ActorId(2);

/// Kinematic actor with circular areas centered on itself
#[derive(Debug, Clone)]
pub struct SimActor {
    pub id: ActorId,
    pub alive: bool,
    pub position: Vec2,
    pub velocity: Vec2,
    pub facing: Vec2,
    pub lockout: f32,
    pub state: ActorState,
    pub state_log: Vec<ActorState>,
    pub target: Option<TargetInfo>,
    /// area → radius
    pub areas: HashMap<AreaId, f32>,
    pub detection_range: f32,
    pub blocked: bool,
    pub immunity: u32,
}

impl Default for SimActor {
    fn default() -> Self {
        Self {
            id: SIM_ACTOR_ID,
            alive: true,
            position: Vec2::ZERO,
            velocity: Vec2::ZERO,
            facing: Vec2::X,
            lockout: 0.0,
            state: ActorState::Idle,
            state_log: Vec::new(),
            target: None,
            areas: HashMap::new(),
            detection_range: DEFAULT_DETECTION_RANGE,
            blocked: false,
            immunity: 0,
        }
    }
}

impl SimActor {
    pub fn with_area(mut self, area: &str, radius: f32) -> Self {
        self.areas.insert(AreaId::new(area), radius);
        self
    }

    pub fn set_target_position(&mut self, position: Vec2) {
        let id = self.target.map(|t| t.id).unwrap_or(SIM_TARGET_ID);
        self.target = Some(TargetInfo {
            id,
            position,
            alive: true,
        });
    }

    /// Integrate velocity and count down the shared lockout
    pub fn integrate(&mut self, dt: f32) {
        self.position += self.velocity * dt;
        if self.lockout > 0.0 {
            self.lockout = (self.lockout - dt).max(0.0);
            if self.lockout == 0.0 && self.state == ActorState::CooldownFrozen {
                self.state = ActorState::Idle;
                self.state_log.push(ActorState::Idle);
            }
        }
    }

    fn live_target_distance(&self) -> Option<f32> {
        self.target
            .filter(|t| t.alive)
            .map(|t| t.position.distance(self.position))
    }
}

impl Actor for SimActor {
    fn id(&self) -> ActorId {
        self.id
    }

    fn is_alive(&self) -> bool {
        self.alive
    }

    fn position(&self) -> Vec2 {
        self.position
    }

    fn set_position(&mut self, position: Vec2) {
        self.position = position;
    }

    fn set_velocity(&mut self, velocity: Vec2) {
        self.velocity = velocity;
    }

    fn facing(&self) -> Vec2 {
        self.facing
    }

    fn face_towards(&mut self, direction: Vec2) {
        if direction.length_squared() > f32::EPSILON {
            self.facing = direction.normalize();
        }
    }

    fn attack_lockout(&self) -> f32 {
        self.lockout
    }

    fn set_attack_lockout(&mut self, seconds: f32) {
        self.lockout = seconds.max(0.0);
    }

    fn state(&self) -> ActorState {
        self.state
    }

    fn request_state(&mut self, state: ActorState) {
        self.state = state;
        self.state_log.push(state);
    }

    fn target(&self) -> Option<TargetInfo> {
        self.target
    }

    fn target_in_range(&self) -> bool {
        self.live_target_distance()
            .is_some_and(|d| d <= self.detection_range)
    }

    fn area_contains_target(&self, area: &AreaId) -> bool {
        match (self.areas.get(area), self.live_target_distance()) {
            (Some(radius), Some(distance)) => distance <= *radius,
            _ => false,
        }
    }

    fn is_blocked(&self) -> bool {
        self.blocked
    }

    fn grant_immunity(&mut self) {
        self.immunity += 1;
    }

    fn revoke_immunity(&mut self) {
        self.immunity = self.immunity.saturating_sub(1);
    }
}

/// One applied damage event
#[derive(Debug, Clone, PartialEq)]
pub struct DamageRecord {
    pub target: ActorId,
    pub amount: f32,
    pub origin: Vec2,
    pub source: String,
}

/// Damage ledger and timed status table
#[derive(Debug, Clone, Default)]
pub struct SimEffects {
    pub damage: Vec<DamageRecord>,
    pub statuses: HashMap<(ActorId, StatusKind), f32>,
    pub status_log: Vec<(ActorId, StatusKind, f32)>,
}

impl SimEffects {
    pub fn total_damage(&self) -> f32 {
        self.damage.iter().map(|d| d.amount).sum()
    }

    pub fn damage_from(&self, source: &str) -> f32 {
        self.damage
            .iter()
            .filter(|d| d.source == source)
            .map(|d| d.amount)
            .sum()
    }

    /// Target struggles free of a grab
    pub fn break_free(&mut self, target: ActorId) {
        self.statuses.remove(&(target, StatusKind::Grabbed));
    }

    pub fn tick(&mut self, dt: f32) {
        for remaining in self.statuses.values_mut() {
            *remaining -= dt;
        }
        self.statuses.retain(|_, remaining| *remaining > 0.0);
    }
}

impl EffectSink for SimEffects {
    fn apply_damage(&mut self, target: ActorId, amount: f32, origin: Vec2, source: &str) {
        self.damage.push(DamageRecord {
            target,
            amount,
            origin,
            source: source.to_string(),
        });
    }

    fn apply_status(&mut self, target: ActorId, status: StatusKind, duration: f32) {
        self.status_log.push((target, status, duration));
        let entry = self.statuses.entry((target, status)).or_insert(0.0);
        *entry = entry.max(duration);
    }

    fn clear_status(&mut self, target: ActorId, status: StatusKind) {
        self.statuses.remove(&(target, status));
    }

    fn has_status(&self, target: ActorId, status: StatusKind) -> bool {
        self.statuses.contains_key(&(target, status))
    }
}

/// One spawned projectile
#[derive(Debug, Clone, PartialEq)]
pub struct SpawnRecord {
    pub handle: ProjectileHandle,
    pub origin: ActorId,
    pub item: String,
    pub position: Vec2,
}

/// Projectile log; hands out sequential handles
#[derive(Debug, Clone, Default)]
pub struct SimSpawner {
    next_handle: u64,
    pub spawned: Vec<SpawnRecord>,
    pub impulses: Vec<(ProjectileHandle, Vec2)>,
}

impl Spawner for SimSpawner {
    fn spawn_projectile(
        &mut self,
        origin: ActorId,
        descriptor: &ProjectileDescriptor,
        position: Vec2,
    ) -> Option<ProjectileHandle> {
        self.next_handle += 1;
        let handle = ProjectileHandle(self.next_handle);
        self.spawned.push(SpawnRecord {
            handle,
            origin,
            item: descriptor.item.clone(),
            position,
        });
        Some(handle)
    }

    fn apply_impulse(&mut self, handle: ProjectileHandle, velocity: Vec2) {
        self.impulses.push((handle, velocity));
    }
}

/// Actor, effects and spawner bundled for driving behaviors
#[derive(Debug, Clone, Default)]
pub struct SimWorld {
    pub actor: SimActor,
    pub effects: SimEffects,
    pub spawner: SimSpawner,
}

impl SimWorld {
    pub fn new() -> Self {
        Self::default()
    }

    /// Actor at the origin facing +X, live target at `position`
    pub fn with_target(position: Vec2) -> Self {
        let mut world = Self::new();
        world.actor.set_target_position(position);
        world
    }

    pub fn ctx(&mut self) -> AttackContext<'_> {
        AttackContext::new(&mut self.actor, &mut self.effects, &mut self.spawner)
    }

    /// Host-side half of a frame: physics integration and status timers
    pub fn step(&mut self, dt: f32) {
        self.actor.integrate(dt);
        self.effects.tick(dt);
    }
}
