//! Centralized attack constants.
//!
//! Default tunables shared by behavior configs and the controller.
//! Per-behavior defaults that only one attack uses stay in that attack's module.

// =====================================================
// Phase timing
// =====================================================

/// Default telegraph (Warmup) duration in seconds
pub const DEFAULT_WARMUP_SECS: f32 = 0.4;

/// Default Recovery duration in seconds
pub const DEFAULT_RECOVERY_SECS: f32 = 0.5;

/// Default per-attack Cooldown duration in seconds
pub const DEFAULT_COOLDOWN_SECS: f32 = 1.5;

/// Extra Active time appended after the last scheduled shot or burst
pub const ACTIVE_PHASE_TAIL_SECS: f32 = 0.1;

// =====================================================
// Movement
// =====================================================

/// Default dash speed in units per second
pub const DEFAULT_DASH_SPEED: f32 = 18.0;

/// Distance under which a dash counts as arrived
pub const ARRIVAL_EPSILON: f32 = 0.05;

// =====================================================
// Lockouts
// =====================================================

/// Shared lockout applied when an attack falls through without connecting
pub const DEFAULT_MISS_LOCKOUT_SECS: f32 = 0.75;

/// Shared lockout applied after a grab resolves
pub const DEFAULT_POST_GRAB_COOLDOWN_SECS: f32 = 2.0;

// =====================================================
// Targeting
// =====================================================

/// Facing-cone half-angle (degrees) at or above which the cone check is disabled
pub const FULL_CIRCLE_DEGREES: f32 = 180.0;

/// Default detection range when the actor has no detection area
pub const DEFAULT_DETECTION_RANGE: f32 = 12.0;
