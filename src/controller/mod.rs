//! Attack controller: picks one registered attack at a time and runs it.
//!
//! The controller is itself an [`AttackBehavior`] driven by its own
//! [`PhaseTimer`]. Its Active phase never expires; it lasts exactly as long as
//! the chosen child keeps running. Warmup works as a start delay, Recovery as
//! a finish delay and Cooldown as the rest between attacks.

use std::collections::BTreeMap;
use std::fmt;

use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::actor::{Actor, ActorState, AreaId, AttackContext};
use crate::combat::{AttackBehavior, Phase, PhaseControl, PhaseDurations, PhaseHooks, PhaseTimer};

pub mod registry;

pub use registry::{SelectionConfig, SelectionEntry, SelectionTable};

/// Detection-region edge reported by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DetectionEvent {
    Entered,
    Exited,
}

/// Why the controller's last run ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FinishReason {
    Completed,
    StartFailed(String),
    NothingQueued,
    Interrupted(String),
    Cancelled,
}

impl fmt::Display for FinishReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FinishReason::Completed => write!(f, "attack completed"),
            FinishReason::StartFailed(name) => write!(f, "attack `{name}` failed to start"),
            FinishReason::NothingQueued => write!(f, "no attack queued"),
            FinishReason::Interrupted(reason) => write!(f, "interrupted: {reason}"),
            FinishReason::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Run counters, serialisable for debugging overlays and balance logs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ControllerStats {
    pub runs: u32,
    pub completions: u32,
    pub start_failures: u32,
    pub nothing_queued: u32,
    pub interruptions: u32,
    pub cancellations: u32,
    /// Times each attack was queued
    pub selections: BTreeMap<String, u32>,
}

impl ControllerStats {
    fn record_finish(&mut self, reason: &FinishReason) {
        match reason {
            FinishReason::Completed => self.completions += 1,
            FinishReason::StartFailed(_) => self.start_failures += 1,
            FinishReason::NothingQueued => self.nothing_queued += 1,
            FinishReason::Interrupted(_) => self.interruptions += 1,
            FinishReason::Cancelled => self.cancellations += 1,
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    pub fn from_json(json: &str) -> Option<Self> {
        serde_json::from_str(json).ok()
    }
}

/// Selection and run state driven by the controller's timer
struct ControllerCore {
    name: String,
    behaviors: Vec<Box<dyn AttackBehavior>>,
    table: SelectionTable,
    rng: Xoshiro256PlusPlus,
    current: Option<usize>,
    queued: Option<usize>,
    detection_area: Option<AreaId>,
    target_inside_detection: bool,
    return_state: Option<ActorState>,
    pending_reason: Option<FinishReason>,
    last_finish_reason: Option<FinishReason>,
    /// Child already ticked by `on_tick` this frame
    child_ticked: Option<usize>,
    stats: ControllerStats,
}

impl ControllerCore {
    fn behavior_name(&self, index: usize) -> &str {
        self.behaviors
            .get(index)
            .map(|b| b.name())
            .unwrap_or("<unknown>")
    }

    /// Choose and record the next attack; returns its index
    fn select_next(&mut self, reason: &str) -> Option<usize> {
        let Some(index) = self.table.next(&mut self.rng) else {
            self.queued = None;
            warn!(controller = %self.name, %reason, "no attack candidate");
            return None;
        };
        self.queued = Some(index);
        let name = self.behavior_name(index).to_string();
        debug!(controller = %self.name, attack = %name, %reason, "attack queued");
        *self.stats.selections.entry(name).or_insert(0) += 1;
        Some(index)
    }

    fn queue_next_attack(&mut self, reason: &str, ctx: &mut AttackContext<'_>) {
        let Some(index) = self.select_next(reason) else {
            return;
        };
        let startable = self.behaviors[index].can_start(&*ctx.actor);
        if startable && ctx.actor.state() != ActorState::Attack {
            ctx.actor.request_state(ActorState::Attack);
        }
    }
}

impl<'w> PhaseHooks<AttackContext<'w>> for ControllerCore {
    fn on_warmup_started(&mut self, _ctl: &mut PhaseControl, _ctx: &mut AttackContext<'w>) {
        self.stats.runs += 1;
        self.pending_reason = None;
    }

    fn on_active_started(&mut self, ctl: &mut PhaseControl, ctx: &mut AttackContext<'w>) {
        self.current = self.queued.take();
        let Some(index) = self.current else {
            warn!(controller = %self.name, "active with nothing queued");
            self.pending_reason = Some(FinishReason::NothingQueued);
            ctl.cancel(false);
            return;
        };
        if self.behaviors[index].try_start(ctx) {
            info!(controller = %self.name, attack = self.behavior_name(index), "attack started");
        } else {
            let name = self.behavior_name(index).to_string();
            debug!(controller = %self.name, attack = %name, "attack failed to start");
            self.pending_reason = Some(FinishReason::StartFailed(name));
            ctl.cancel(false);
        }
    }

    fn on_attack_finished(&mut self, ctx: &mut AttackContext<'w>) {
        if let Some(index) = self.current.take() {
            if self.behaviors[index].is_running() {
                self.behaviors[index].cancel(true, ctx);
            }
        }
        let reason = self.pending_reason.take().unwrap_or(FinishReason::Cancelled);
        self.stats.record_finish(&reason);
        info!(controller = %self.name, %reason, "run finished");

        let label = reason.to_string();
        self.last_finish_reason = Some(reason);
        self.queue_next_attack(&label, ctx);

        // Return label overrides the advisory Attack request
        if let Some(state) = self.return_state {
            if ctx.actor.state() == ActorState::Attack {
                ctx.actor.request_state(state);
            }
        }
    }

    fn on_tick(&mut self, phase: Phase, dt: f32, ctl: &mut PhaseControl, ctx: &mut AttackContext<'w>) {
        let Some(index) = self.current else {
            if phase == Phase::Active {
                ctl.force_recovery();
            }
            return;
        };
        if self.behaviors[index].is_running() {
            self.behaviors[index].tick(dt, ctx);
            self.child_ticked = Some(index);
        }
        if phase == Phase::Active && !self.behaviors[index].is_running() {
            self.pending_reason.get_or_insert(FinishReason::Completed);
            ctl.force_recovery();
        }
    }
}

/// Scheduler over a registry of attacks
pub struct AttackController {
    timer: PhaseTimer,
    core: ControllerCore,
}

/// Explicit registry construction for [`AttackController`]
pub struct AttackControllerBuilder {
    name: String,
    seed: u64,
    durations: PhaseDurations,
    detection_area: Option<AreaId>,
    return_state: Option<ActorState>,
    behaviors: Vec<Box<dyn AttackBehavior>>,
    table: SelectionTable,
}

impl AttackControllerBuilder {
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Warmup, recovery and cooldown; `active` is always unbounded
    pub fn durations(mut self, durations: PhaseDurations) -> Self {
        self.durations = durations;
        self
    }

    pub fn detection_area(mut self, area: AreaId) -> Self {
        self.detection_area = Some(area);
        self
    }

    pub fn return_state(mut self, state: ActorState) -> Self {
        self.return_state = Some(state);
        self
    }

    pub fn register<B: AttackBehavior + 'static>(self, behavior: B, selection: SelectionConfig) -> Self {
        self.register_boxed(Box::new(behavior), selection)
    }

    pub fn register_boxed(mut self, behavior: Box<dyn AttackBehavior>, selection: SelectionConfig) -> Self {
        self.table.push(behavior.name(), selection);
        self.behaviors.push(behavior);
        self
    }

    pub fn build(self) -> AttackController {
        let durations = PhaseDurations {
            active: f32::INFINITY,
            ..self.durations
        };
        if self.table.total_weight() <= 0.0
            && self.table.entries().iter().all(|e| e.guarantee_interval == 0)
        {
            warn!(controller = %self.name, "registry has no selectable attack");
        }
        AttackController {
            timer: PhaseTimer::new(durations),
            core: ControllerCore {
                name: self.name,
                behaviors: self.behaviors,
                table: self.table,
                rng: Xoshiro256PlusPlus::seed_from_u64(self.seed),
                current: None,
                queued: None,
                detection_area: self.detection_area,
                target_inside_detection: false,
                return_state: self.return_state,
                pending_reason: None,
                last_finish_reason: None,
                child_ticked: None,
                stats: ControllerStats::default(),
            },
        }
    }
}

impl AttackController {
    pub fn builder(name: impl Into<String>) -> AttackControllerBuilder {
        AttackControllerBuilder {
            name: name.into(),
            seed: 0,
            durations: PhaseDurations::new(0.0, f32::INFINITY, 0.0, 0.5),
            detection_area: None,
            return_state: None,
            behaviors: Vec::new(),
            table: SelectionTable::new(),
        }
    }

    pub fn timer(&self) -> &PhaseTimer {
        &self.timer
    }

    pub fn table(&self) -> &SelectionTable {
        &self.core.table
    }

    pub fn stats(&self) -> &ControllerStats {
        &self.core.stats
    }

    pub fn len(&self) -> usize {
        self.core.behaviors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.core.behaviors.is_empty()
    }

    pub fn behavior(&self, name: &str) -> Option<&dyn AttackBehavior> {
        self.core
            .behaviors
            .iter()
            .find(|b| b.name() == name)
            .map(|b| b.as_ref())
    }

    pub fn current_attack(&self) -> Option<&str> {
        self.core.current.map(|i| self.core.behavior_name(i))
    }

    pub fn queued_attack(&self) -> Option<&str> {
        self.core.queued.map(|i| self.core.behavior_name(i))
    }

    pub fn last_finish_reason(&self) -> Option<&FinishReason> {
        self.core.last_finish_reason.as_ref()
    }

    pub fn is_target_inside_detection(&self) -> bool {
        self.core.target_inside_detection
    }

    /// Plain weighted draw; no guarantee check, no bookkeeping
    pub fn pick_attack(&mut self) -> Option<&str> {
        let index = self.core.table.pick_weighted(&mut self.core.rng)?;
        Some(self.core.behavior_name(index))
    }

    /// Attack whose guarantee interval is due, if any
    pub fn try_get_guaranteed_attack(&self) -> Option<&str> {
        self.core
            .table
            .guaranteed()
            .map(|i| self.core.behavior_name(i))
    }

    /// Replace the queued attack (guarantee first, then weighted)
    pub fn queue_next_attack(&mut self, reason: &str, ctx: &mut AttackContext<'_>) {
        self.core.queue_next_attack(reason, ctx);
    }

    /// Abort any in-flight child and end the current run so selection starts
    /// over on the next tick.
    pub fn force_queue_next_attack(&mut self, reason: &str, ctx: &mut AttackContext<'_>) {
        if let Some(index) = self.core.current {
            self.core.behaviors[index].cancel(true, ctx);
        }
        if self.timer.is_running() {
            info!(controller = %self.core.name, %reason, "forcing re-selection");
            self.core.pending_reason = Some(FinishReason::Interrupted(reason.to_string()));
            self.timer.cancel(true, &mut self.core, ctx);
        } else {
            self.core.queue_next_attack(reason, ctx);
        }
    }

    /// Runtime weight tuning; guarantee counters are kept
    pub fn try_set_attack_weight(&mut self, name: &str, weight: f32) -> bool {
        match self.core.table.find(name) {
            Some(index) => {
                self.core.table.set_weight(index, weight);
                debug!(controller = %self.core.name, attack = name, weight, "weight updated");
                true
            }
            None => false,
        }
    }

    /// Detection enter/exit. Leaving detection aborts a running attack.
    pub fn handle_detection(&mut self, event: DetectionEvent, ctx: &mut AttackContext<'_>) {
        let inside = event == DetectionEvent::Entered;
        if inside == self.core.target_inside_detection {
            return;
        }
        self.core.target_inside_detection = inside;
        debug!(controller = %self.core.name, ?event, "detection changed");
        if !inside && self.timer.is_running() {
            self.force_queue_next_attack("target left detection", ctx);
        }
    }

    fn poll_detection(&mut self, ctx: &mut AttackContext<'_>) {
        let inside = match &self.core.detection_area {
            Some(area) => ctx.actor.area_contains_target(area),
            None => return,
        };
        let event = if inside {
            DetectionEvent::Entered
        } else {
            DetectionEvent::Exited
        };
        self.handle_detection(event, ctx);
    }

    fn target_detected(&self, actor: &dyn Actor) -> bool {
        match self.core.detection_area {
            Some(_) => self.core.target_inside_detection,
            None => actor.target_in_range(),
        }
    }
}

impl AttackBehavior for AttackController {
    fn name(&self) -> &str {
        &self.core.name
    }

    /// Initialize children, read the detection state and queue the first pick
    fn initialize(&mut self, actor: &dyn Actor) {
        for behavior in &mut self.core.behaviors {
            behavior.initialize(actor);
        }
        if let Some(area) = &self.core.detection_area {
            self.core.target_inside_detection = actor.area_contains_target(area);
        }
        self.core.select_next("initial");
    }

    fn can_start(&self, actor: &dyn Actor) -> bool {
        !self.timer.is_running()
            && !self.timer.is_on_cooldown()
            && actor.is_alive()
            && actor.attack_lockout() <= 0.0
            && actor.target().is_some_and(|t| t.alive)
            && self.target_detected(actor)
    }

    fn try_start(&mut self, ctx: &mut AttackContext<'_>) -> bool {
        if !self.can_start(&*ctx.actor) {
            return false;
        }
        self.timer.start(&mut self.core, ctx)
    }

    /// Detection poll, auto-start, own phase update (which ticks the current
    /// child), then cooldown upkeep for idle children.
    fn tick(&mut self, dt: f32, ctx: &mut AttackContext<'_>) {
        if !ctx.actor.is_alive() {
            if self.timer.is_running() {
                self.cancel(true, ctx);
            }
            return;
        }
        self.poll_detection(ctx);
        if self.can_start(&*ctx.actor) {
            self.try_start(ctx);
        }

        self.core.child_ticked = None;
        self.timer.tick(dt, &mut self.core, ctx);

        let skip = self.core.child_ticked.take();
        for (index, behavior) in self.core.behaviors.iter_mut().enumerate() {
            if Some(index) != skip && behavior.is_on_cooldown() {
                behavior.tick(dt, ctx);
            }
        }
    }

    fn cancel(&mut self, clear_cooldown: bool, ctx: &mut AttackContext<'_>) {
        if let Some(index) = self.core.current {
            self.core.behaviors[index].cancel(clear_cooldown, ctx);
        }
        if self.timer.is_running() {
            self.core.pending_reason = Some(FinishReason::Cancelled);
        }
        self.timer.cancel(clear_cooldown, &mut self.core, ctx);
    }

    fn force_enter_recovery(&mut self, ctx: &mut AttackContext<'_>) -> bool {
        if let Some(index) = self.core.current {
            self.core.behaviors[index].force_enter_recovery(ctx);
        }
        self.timer.force_recovery(&mut self.core, ctx)
    }

    fn phase(&self) -> Phase {
        self.timer.phase()
    }
}
