//! Host-facing collaborator interfaces.
//!
//! The attack core never owns physics, health or world spawning. It reads and
//! writes the owning actor through [`Actor`], applies damage and statuses
//! through [`EffectSink`], and asks a [`Spawner`] for projectiles. Every
//! mutating behavior call receives these bundled in an [`AttackContext`].

use bevy::math::Vec2;
use serde::{Deserialize, Serialize};

/// Stable identifier of an actor in the host world
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActorId(pub u64);

/// Named spatial region owned by the actor (grab zone, detection area)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AreaId(pub String);

impl AreaId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Presentation state-machine label, consumed by animation/audio
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ActorState {
    #[default]
    Idle,
    Locomotion,
    Attack,
    /// Cosmetic post-attack freeze, left when the shared lockout expires
    CooldownFrozen,
}

/// Timed statuses attacks apply to their target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatusKind {
    Grabbed,
    Stunned,
}

/// Snapshot of the actor's current target
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetInfo {
    pub id: ActorId,
    pub position: Vec2,
    pub alive: bool,
}

/// Opaque handle to a spawned projectile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProjectileHandle(pub u64);

/// What to spawn for a projectile shot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectileDescriptor {
    pub item: String,
    pub damage: f32,
}

/// The owning character as seen by its attacks.
pub trait Actor: Send + Sync {
    fn id(&self) -> ActorId;
    fn is_alive(&self) -> bool;

    fn position(&self) -> Vec2;
    fn set_position(&mut self, position: Vec2);
    /// Velocity intent, integrated by the host physics
    fn set_velocity(&mut self, velocity: Vec2);

    /// Unit forward vector
    fn facing(&self) -> Vec2;
    fn face_towards(&mut self, direction: Vec2);

    /// Remaining shared attack lockout in seconds (counted down by the host)
    fn attack_lockout(&self) -> f32;
    fn set_attack_lockout(&mut self, seconds: f32);

    fn state(&self) -> ActorState;
    /// Advisory label change for the presentation layer
    fn request_state(&mut self, state: ActorState);

    /// Nearest or last-known opposing entity
    fn target(&self) -> Option<TargetInfo>;
    /// Generic "target within range" query used when no detection area exists
    fn target_in_range(&self) -> bool;
    /// Overlap between one of the actor's areas and the current target
    fn area_contains_target(&self, area: &AreaId) -> bool;

    /// True while the host physics reports contact with a wall
    fn is_blocked(&self) -> bool;

    /// Counted damage-immunity subscription
    fn grant_immunity(&mut self);
    fn revoke_immunity(&mut self);
}

/// Damage and status application, implemented by the host health system.
pub trait EffectSink: Send + Sync {
    fn apply_damage(&mut self, target: ActorId, amount: f32, origin: Vec2, source: &str);
    fn apply_status(&mut self, target: ActorId, status: StatusKind, duration: f32);
    fn clear_status(&mut self, target: ActorId, status: StatusKind);
    fn has_status(&self, target: ActorId, status: StatusKind) -> bool;
}

/// World-entity spawning for thrown projectiles.
pub trait Spawner: Send + Sync {
    fn spawn_projectile(
        &mut self,
        origin: ActorId,
        descriptor: &ProjectileDescriptor,
        position: Vec2,
    ) -> Option<ProjectileHandle>;
    fn apply_impulse(&mut self, handle: ProjectileHandle, velocity: Vec2);
}

/// Collaborators handed to every mutating behavior call
pub struct AttackContext<'w> {
    pub actor: &'w mut dyn Actor,
    pub effects: &'w mut dyn EffectSink,
    pub spawner: &'w mut dyn Spawner,
}

impl<'w> AttackContext<'w> {
    pub fn new(
        actor: &'w mut dyn Actor,
        effects: &'w mut dyn EffectSink,
        spawner: &'w mut dyn Spawner,
    ) -> Self {
        Self {
            actor,
            effects,
            spawner,
        }
    }

    /// Live target only; dead or missing targets read as `None`
    pub fn live_target(&self) -> Option<TargetInfo> {
        self.actor.target().filter(|t| t.alive)
    }
}

/// Unit direction from `from` to `to`, or `fallback` when they coincide
pub fn direction_or(from: Vec2, to: Vec2, fallback: Vec2) -> Vec2 {
    let dir = to - from;
    if dir.length_squared() > f32::EPSILON {
        dir.normalize()
    } else {
        fallback
    }
}
