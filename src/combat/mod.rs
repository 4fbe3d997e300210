//! Phase-timed attack behaviors.
//!
//! Every attack runs the same lifecycle:
//! `Idle → Warmup → Active → Recovery → Cooldown → Idle`.
//! `Cancel(true)` short-circuits to Idle, `Cancel(false)` to Cooldown, and
//! `force_enter_recovery` is the only other jump (always forward).

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_COOLDOWN_SECS, DEFAULT_RECOVERY_SECS, DEFAULT_WARMUP_SECS};

pub mod area_burst;
pub mod behavior;
pub mod dash_grab;
pub mod dash_strike;
pub mod phase;
pub mod volley;

pub use area_burst::{AreaBurst, AreaBurstConfig, TelegraphKind, TelegraphView};
pub use behavior::{Attack, AttackBehavior, AttackLogic, RangeGate};
pub use dash_grab::{DashGrab, DashGrabConfig, GrabOutcome};
pub use dash_strike::{DashStrike, DashStrikeConfig};
pub use phase::{PhaseControl, PhaseHooks, PhaseTimer};
pub use volley::{AimMode, Volley, VolleyConfig};

/// Attack lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Phase {
    #[default]
    Idle,
    Warmup,   // telegraph, stationary
    Active,   // the move itself
    Recovery, // vulnerable follow-through
    Cooldown, // not running, not startable
}

impl Phase {
    /// Warmup, Active and Recovery count as running
    pub fn is_running(self) -> bool {
        matches!(self, Phase::Warmup | Phase::Active | Phase::Recovery)
    }

    pub fn is_on_cooldown(self) -> bool {
        self == Phase::Cooldown
    }

    /// Fixed successor in the lifecycle
    pub fn next(self) -> Phase {
        match self {
            Phase::Idle => Phase::Idle,
            Phase::Warmup => Phase::Active,
            Phase::Active => Phase::Recovery,
            Phase::Recovery => Phase::Cooldown,
            Phase::Cooldown => Phase::Idle,
        }
    }
}

/// Per-phase durations in seconds (all ≥ 0; Active may be infinite)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhaseDurations {
    pub warmup: f32,
    pub active: f32,
    pub recovery: f32,
    pub cooldown: f32,
}

impl Default for PhaseDurations {
    fn default() -> Self {
        Self {
            warmup: DEFAULT_WARMUP_SECS,
            active: 0.3,
            recovery: DEFAULT_RECOVERY_SECS,
            cooldown: DEFAULT_COOLDOWN_SECS,
        }
    }
}

impl PhaseDurations {
    pub const ZERO: Self = Self {
        warmup: 0.0,
        active: 0.0,
        recovery: 0.0,
        cooldown: 0.0,
    };

    pub fn new(warmup: f32, active: f32, recovery: f32, cooldown: f32) -> Self {
        Self {
            warmup,
            active,
            recovery,
            cooldown,
        }
    }

    /// Duration of a phase; Idle never expires
    pub fn of(&self, phase: Phase) -> f32 {
        match phase {
            Phase::Idle => f32::INFINITY,
            Phase::Warmup => self.warmup,
            Phase::Active => self.active,
            Phase::Recovery => self.recovery,
            Phase::Cooldown => self.cooldown,
        }
    }

    /// Negative or NaN durations clamp to zero
    pub fn sanitized(self) -> Self {
        let clamp = |d: f32| if d.is_nan() { 0.0 } else { d.max(0.0) };
        Self {
            warmup: clamp(self.warmup),
            active: clamp(self.active),
            recovery: clamp(self.recovery),
            cooldown: clamp(self.cooldown),
        }
    }

    /// First offending field name, if any duration is negative or NaN
    pub fn invalid_field(&self) -> Option<&'static str> {
        [
            ("warmup", self.warmup),
            ("active", self.active),
            ("recovery", self.recovery),
            ("cooldown", self.cooldown),
        ]
        .into_iter()
        .find(|(_, d)| d.is_nan() || *d < 0.0)
        .map(|(name, _)| name)
    }
}
