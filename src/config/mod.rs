//! Attack-set configuration loaded from RON.
//!
//! One file describes an NPC's whole repertoire:
//!
//! ```ron
//! (
//!     controller: (name: "brute", seed: 7, detection_area: Some("aggro")),
//!     attacks: [
//!         (selection: (weight: 2.0), kind: DashStrike((name: "lunge"))),
//!         (selection: (weight: 0.0, guarantee_interval: 3), kind: AreaBurst(())),
//!     ],
//! )
//! ```

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::actor::{ActorState, AreaId};
use crate::combat::{
    AreaBurstConfig, AttackBehavior, DashGrabConfig, DashStrikeConfig, PhaseDurations, VolleyConfig,
};
use crate::controller::{AttackController, SelectionConfig};
use crate::error::ConfigError;

/// Controller-level settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    pub name: String,
    pub seed: u64,
    pub detection_area: Option<AreaId>,
    /// Start delay, finish delay and rest; `active` is ignored
    pub durations: PhaseDurations,
    pub return_state: Option<ActorState>,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            name: "attack_controller".into(),
            seed: 0,
            detection_area: None,
            durations: PhaseDurations::new(0.0, 0.0, 0.0, 0.5),
            return_state: None,
        }
    }
}

/// Concrete attack and its tunables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttackKind {
    DashGrab(DashGrabConfig),
    AreaBurst(AreaBurstConfig),
    DashStrike(DashStrikeConfig),
    Volley(VolleyConfig),
}

impl AttackKind {
    pub fn name(&self) -> &str {
        match self {
            AttackKind::DashGrab(c) => &c.name,
            AttackKind::AreaBurst(c) => &c.name,
            AttackKind::DashStrike(c) => &c.name,
            AttackKind::Volley(c) => &c.name,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            AttackKind::DashGrab(c) => c.validate(),
            AttackKind::AreaBurst(c) => c.validate(),
            AttackKind::DashStrike(c) => c.validate(),
            AttackKind::Volley(c) => c.validate(),
        }
    }

    pub fn into_behavior(self) -> Box<dyn AttackBehavior> {
        match self {
            AttackKind::DashGrab(c) => Box::new(c.build()),
            AttackKind::AreaBurst(c) => Box::new(c.build()),
            AttackKind::DashStrike(c) => Box::new(c.build()),
            AttackKind::Volley(c) => Box::new(c.build()),
        }
    }
}

/// One registry entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttackEntryConfig {
    #[serde(default)]
    pub selection: SelectionConfig,
    pub kind: AttackKind,
}

/// Full attack repertoire for one NPC
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttackSetConfig {
    pub controller: ControllerConfig,
    pub attacks: Vec<AttackEntryConfig>,
}

impl AttackSetConfig {
    /// Parse and validate
    pub fn from_ron_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = ron::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_ron_str(&source)?;
        info!(
            path = %path.display(),
            attacks = config.attacks.len(),
            "attack set loaded"
        );
        Ok(config)
    }

    pub fn to_ron_string(&self) -> String {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default()).unwrap_or_default()
    }

    /// Rejects malformed numbers and duplicate names. A registry whose
    /// weights sum to zero is allowed and only logged.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(field) = self.controller.durations.invalid_field() {
            return Err(ConfigError::invalid(
                &self.controller.name,
                format!("{field} duration must be >= 0"),
            ));
        }

        let mut seen = HashSet::new();
        for entry in &self.attacks {
            let name = entry.kind.name();
            if !seen.insert(name) {
                return Err(ConfigError::DuplicateName(name.to_string()));
            }
            if !entry.selection.weight.is_finite() || entry.selection.weight < 0.0 {
                return Err(ConfigError::invalid(name, "weight must be finite and >= 0"));
            }
            entry.kind.validate()?;
        }

        let total: f32 = self.attacks.iter().map(|e| e.selection.weight).sum();
        let any_guarantee = self
            .attacks
            .iter()
            .any(|e| e.selection.guarantee_interval > 0);
        if total <= 0.0 && !any_guarantee {
            warn!(controller = %self.controller.name, "attack set has no selectable attack");
        }
        Ok(())
    }

    /// Validate, then construct the controller with every attack registered
    /// in file order.
    pub fn build(self) -> Result<AttackController, ConfigError> {
        self.validate()?;
        let controller = self.controller;
        let mut builder = AttackController::builder(controller.name)
            .seed(controller.seed)
            .durations(controller.durations);
        if let Some(area) = controller.detection_area {
            builder = builder.detection_area(area);
        }
        if let Some(state) = controller.return_state {
            builder = builder.return_state(state);
        }
        for entry in self.attacks {
            builder = builder.register_boxed(entry.kind.into_behavior(), entry.selection);
        }
        Ok(builder.build())
    }
}
