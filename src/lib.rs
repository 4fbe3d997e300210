//! NPC Attack Core Library
//!
//! This crate provides the combat-attack scheduling logic for non-player characters:
//! - Phase timer (Warmup → Active → Recovery → Cooldown) with entry/exit hooks
//! - Attack behaviors bound to a phase timer (dash-grab, area burst, dash-strike, volley)
//! - Attack controller (weighted selection, guarantee intervals, detection gating)
//! - Host-facing traits for actors, damage/effect sinks and projectile spawners
//! - RON attack-set configuration
//! - Monte-Carlo selection balance reports
//! - Bevy plugin and in-memory simulation host

pub mod actor;
pub mod balance;
pub mod combat;
pub mod config;
pub mod constants;
pub mod controller;
pub mod error;
pub mod logging;
pub mod plugin;
pub mod sim;

pub use actor::{
    Actor, ActorId, ActorState, AreaId, AttackContext, EffectSink, ProjectileDescriptor,
    ProjectileHandle, Spawner, StatusKind, TargetInfo,
};
pub use combat::{Attack, AttackBehavior, AttackLogic, Phase, PhaseDurations, PhaseTimer};
pub use config::AttackSetConfig;
pub use controller::{AttackController, DetectionEvent, FinishReason, SelectionConfig};
pub use error::ConfigError;
