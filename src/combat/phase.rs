//! Four-phase countdown primitive.
//!
//! [`PhaseTimer`] stores only timing state. The owner passes its hooks and a
//! context into every driving call, so the same timer drives plain behaviors,
//! the attack controller and bare test recorders. Hooks cannot re-enter the
//! timer that is calling them; they post requests on a [`PhaseControl`] which
//! the timer applies as soon as the hook returns.
//!
//! Within one tick the phase update always happens before `on_tick`, so
//! behavior-private polling never sees a stale phase.

use super::{Phase, PhaseDurations};

/// Requests a hook may post back to the timer driving it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhaseControl {
    phase: Phase,
    elapsed: f32,
    force_recovery: bool,
    finish_phase: bool,
    hold_phase: bool,
    cancel: Option<bool>,
    forced: bool,
}

impl PhaseControl {
    fn new(phase: Phase, elapsed: f32) -> Self {
        Self {
            phase,
            elapsed,
            force_recovery: false,
            finish_phase: false,
            hold_phase: false,
            cancel: None,
            forced: false,
        }
    }

    /// Phase the hook is running in
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Seconds since that phase was entered
    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    /// True in the entry hook of a Recovery reached through `force_recovery`
    /// rather than by Active running out
    pub fn was_forced(&self) -> bool {
        self.forced
    }

    /// Skip the rest of Warmup/Active and enter Recovery
    pub fn force_recovery(&mut self) {
        self.force_recovery = true;
    }

    /// End the current phase now, as if its duration had elapsed
    pub fn finish_phase(&mut self) {
        self.finish_phase = true;
    }

    /// Keep the current phase past its duration until `finish_phase`
    pub fn hold_phase(&mut self) {
        self.hold_phase = true;
    }

    /// Abort the attack: Idle if `clear_cooldown`, else Cooldown
    pub fn cancel(&mut self, clear_cooldown: bool) {
        self.cancel = Some(clear_cooldown);
    }
}

/// Phase entry/exit callbacks. Every hook has an empty default.
pub trait PhaseHooks<C: ?Sized> {
    fn on_warmup_started(&mut self, _ctl: &mut PhaseControl, _ctx: &mut C) {}
    fn on_active_started(&mut self, _ctl: &mut PhaseControl, _ctx: &mut C) {}
    fn on_recovery_started(&mut self, _ctl: &mut PhaseControl, _ctx: &mut C) {}
    /// Leaving Recovery, or any cancel of a running attack. Fires exactly once per run.
    fn on_attack_finished(&mut self, _ctx: &mut C) {}
    fn on_cooldown_started(&mut self, _ctl: &mut PhaseControl, _ctx: &mut C) {}
    fn on_cooldown_finished(&mut self, _ctx: &mut C) {}
    /// Per-tick work after the phase update; never called while Idle
    fn on_tick(&mut self, _phase: Phase, _dt: f32, _ctl: &mut PhaseControl, _ctx: &mut C) {}
}

impl<C: ?Sized> PhaseHooks<C> for () {}

/// Warmup → Active → Recovery → Cooldown → Idle countdown
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseTimer {
    durations: PhaseDurations,
    phase: Phase,
    elapsed: f32,
    held: bool,
}

impl PhaseTimer {
    pub fn new(durations: PhaseDurations) -> Self {
        Self {
            durations: durations.sanitized(),
            phase: Phase::Idle,
            elapsed: 0.0,
            held: false,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    pub fn durations(&self) -> &PhaseDurations {
        &self.durations
    }

    /// Takes effect from the next phase entry on
    pub fn set_durations(&mut self, durations: PhaseDurations) {
        self.durations = durations.sanitized();
    }

    pub fn is_running(&self) -> bool {
        self.phase.is_running()
    }

    pub fn is_on_cooldown(&self) -> bool {
        self.phase.is_on_cooldown()
    }

    pub fn is_held(&self) -> bool {
        self.held
    }

    /// Seconds left in the current phase (infinite while Idle or held)
    pub fn remaining(&self) -> f32 {
        if self.held {
            return f32::INFINITY;
        }
        (self.durations.of(self.phase) - self.elapsed).max(0.0)
    }

    /// Enter Warmup. Fails only while already running; a caller that bypasses
    /// cooldown may restart from Cooldown.
    pub fn start<C, H>(&mut self, hooks: &mut H, ctx: &mut C) -> bool
    where
        C: ?Sized,
        H: PhaseHooks<C> + ?Sized,
    {
        if self.is_running() {
            return false;
        }
        let ctl = self.enter(Phase::Warmup, hooks, ctx);
        self.settle(ctl, false, hooks, ctx);
        true
    }

    /// Advance by `dt` seconds, passing through every phase whose duration has
    /// elapsed (zero-length phases still fire their entry hook once), then run
    /// `on_tick` for whatever phase is current.
    pub fn tick<C, H>(&mut self, dt: f32, hooks: &mut H, ctx: &mut C)
    where
        C: ?Sized,
        H: PhaseHooks<C> + ?Sized,
    {
        if self.phase == Phase::Idle {
            return;
        }
        if dt.is_finite() && dt > 0.0 {
            self.elapsed += dt;
        }
        let ctl = PhaseControl::new(self.phase, self.elapsed);
        self.settle(ctl, true, hooks, ctx);

        if self.phase == Phase::Idle {
            return;
        }
        let mut ctl = PhaseControl::new(self.phase, self.elapsed);
        hooks.on_tick(self.phase, dt, &mut ctl, ctx);
        self.settle(ctl, true, hooks, ctx);
    }

    /// Abort a running attack. Idempotent: a no-op while Idle, and while on
    /// Cooldown unless `clear_cooldown` is set.
    pub fn cancel<C, H>(&mut self, clear_cooldown: bool, hooks: &mut H, ctx: &mut C)
    where
        C: ?Sized,
        H: PhaseHooks<C> + ?Sized,
    {
        if self.is_running() {
            hooks.on_attack_finished(ctx);
            if clear_cooldown {
                self.reset();
            } else {
                let ctl = self.enter(Phase::Cooldown, hooks, ctx);
                self.settle(ctl, false, hooks, ctx);
            }
        } else if self.is_on_cooldown() && clear_cooldown {
            self.reset();
        }
    }

    /// Jump from Warmup/Active straight to Recovery entry. Returns false from
    /// any other phase.
    pub fn force_recovery<C, H>(&mut self, hooks: &mut H, ctx: &mut C) -> bool
    where
        C: ?Sized,
        H: PhaseHooks<C> + ?Sized,
    {
        if !matches!(self.phase, Phase::Warmup | Phase::Active) {
            return false;
        }
        let ctl = self.enter_with(Phase::Recovery, true, hooks, ctx);
        self.settle(ctl, false, hooks, ctx);
        true
    }

    /// Back to Idle without firing hooks
    pub fn reset(&mut self) {
        self.phase = Phase::Idle;
        self.elapsed = 0.0;
        self.held = false;
    }

    fn enter<C, H>(&mut self, phase: Phase, hooks: &mut H, ctx: &mut C) -> PhaseControl
    where
        C: ?Sized,
        H: PhaseHooks<C> + ?Sized,
    {
        self.enter_with(phase, false, hooks, ctx)
    }

    fn enter_with<C, H>(&mut self, phase: Phase, forced: bool, hooks: &mut H, ctx: &mut C) -> PhaseControl
    where
        C: ?Sized,
        H: PhaseHooks<C> + ?Sized,
    {
        self.phase = phase;
        self.elapsed = 0.0;
        self.held = false;

        let mut ctl = PhaseControl::new(phase, 0.0);
        ctl.forced = forced;
        match phase {
            Phase::Warmup => hooks.on_warmup_started(&mut ctl, ctx),
            Phase::Active => hooks.on_active_started(&mut ctl, ctx),
            Phase::Recovery => hooks.on_recovery_started(&mut ctl, ctx),
            Phase::Cooldown => hooks.on_cooldown_started(&mut ctl, ctx),
            Phase::Idle => {}
        }
        ctl
    }

    fn advance<C, H>(&mut self, hooks: &mut H, ctx: &mut C) -> PhaseControl
    where
        C: ?Sized,
        H: PhaseHooks<C> + ?Sized,
    {
        match self.phase {
            Phase::Idle => return PhaseControl::new(Phase::Idle, 0.0),
            Phase::Recovery => hooks.on_attack_finished(ctx),
            Phase::Cooldown => hooks.on_cooldown_finished(ctx),
            Phase::Warmup | Phase::Active => {}
        }
        self.enter(self.phase.next(), hooks, ctx)
    }

    /// Apply hook requests, then (if `allow_expiry`) keep advancing while the
    /// current phase's duration has elapsed.
    fn settle<C, H>(&mut self, mut ctl: PhaseControl, allow_expiry: bool, hooks: &mut H, ctx: &mut C)
    where
        C: ?Sized,
        H: PhaseHooks<C> + ?Sized,
    {
        loop {
            if let Some(clear_cooldown) = ctl.cancel.take() {
                self.cancel(clear_cooldown, hooks, ctx);
                return;
            }
            if std::mem::take(&mut ctl.hold_phase) {
                self.held = true;
            }
            if std::mem::take(&mut ctl.force_recovery)
                && matches!(self.phase, Phase::Warmup | Phase::Active)
            {
                ctl = self.enter_with(Phase::Recovery, true, hooks, ctx);
                continue;
            }

            let finish = std::mem::take(&mut ctl.finish_phase);
            let expired =
                allow_expiry && !self.held && self.elapsed >= self.durations.of(self.phase);
            if self.phase == Phase::Idle || !(finish || expired) {
                return;
            }
            ctl = self.advance(hooks, ctx);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Records hook calls and optionally posts a request from one hook
    #[derive(Default)]
    struct Recorder {
        events: Vec<String>,
        on_warmup: Option<fn(&mut PhaseControl)>,
        on_active: Option<fn(&mut PhaseControl)>,
        on_recovery: Option<fn(&mut PhaseControl)>,
        on_tick: Option<fn(Phase, &mut PhaseControl)>,
    }

    impl PhaseHooks<()> for Recorder {
        fn on_warmup_started(&mut self, ctl: &mut PhaseControl, _: &mut ()) {
            self.events.push("warmup".into());
            if let Some(f) = self.on_warmup {
                f(ctl);
            }
        }
        fn on_active_started(&mut self, ctl: &mut PhaseControl, _: &mut ()) {
            self.events.push("active".into());
            if let Some(f) = self.on_active {
                f(ctl);
            }
        }
        fn on_recovery_started(&mut self, ctl: &mut PhaseControl, _: &mut ()) {
            self.events.push("recovery".into());
            if let Some(f) = self.on_recovery {
                f(ctl);
            }
        }
        fn on_attack_finished(&mut self, _: &mut ()) {
            self.events.push("finished".into());
        }
        fn on_cooldown_started(&mut self, _: &mut PhaseControl, _: &mut ()) {
            self.events.push("cooldown".into());
        }
        fn on_cooldown_finished(&mut self, _: &mut ()) {
            self.events.push("ready".into());
        }
        fn on_tick(&mut self, phase: Phase, _dt: f32, ctl: &mut PhaseControl, _: &mut ()) {
            self.events.push(format!("tick:{phase:?}"));
            if let Some(f) = self.on_tick {
                f(phase, ctl);
            }
        }
    }

    fn timer(w: f32, a: f32, r: f32, c: f32) -> PhaseTimer {
        PhaseTimer::new(PhaseDurations::new(w, a, r, c))
    }

    fn count(events: &[String], name: &str) -> usize {
        events.iter().filter(|e| *e == name).count()
    }

    #[test]
    fn test_start_enters_warmup() {
        let mut t = timer(0.5, 0.5, 0.5, 0.5);
        let mut rec = Recorder::default();
        assert!(t.start(&mut rec, &mut ()));
        assert_eq!(t.phase(), Phase::Warmup);
        assert_eq!(t.elapsed(), 0.0);
        assert!(t.is_running());
        assert_eq!(rec.events, vec!["warmup"]);
    }

    #[test]
    fn test_start_while_running_fails() {
        let mut t = timer(0.5, 0.5, 0.5, 0.5);
        let mut rec = Recorder::default();
        assert!(t.start(&mut rec, &mut ()));
        assert!(!t.start(&mut rec, &mut ()));
        assert_eq!(count(&rec.events, "warmup"), 1);
    }

    #[test]
    fn test_full_cycle_by_ticks() {
        let mut t = timer(0.1, 0.2, 0.1, 0.3);
        let mut rec = Recorder::default();
        t.start(&mut rec, &mut ());

        t.tick(0.05, &mut rec, &mut ());
        assert_eq!(t.phase(), Phase::Warmup);
        assert!((t.elapsed() - 0.05).abs() < 1e-6);

        t.tick(0.06, &mut rec, &mut ());
        assert_eq!(t.phase(), Phase::Active);
        assert_eq!(t.elapsed(), 0.0, "elapsed resets on transition");

        t.tick(0.2, &mut rec, &mut ());
        assert_eq!(t.phase(), Phase::Recovery);

        t.tick(0.1, &mut rec, &mut ());
        assert_eq!(t.phase(), Phase::Cooldown);
        assert!(t.is_on_cooldown());
        assert!(!t.is_running());

        t.tick(0.3, &mut rec, &mut ());
        assert_eq!(t.phase(), Phase::Idle);
        assert_eq!(count(&rec.events, "finished"), 1);
        assert_eq!(count(&rec.events, "ready"), 1);
    }

    #[test]
    fn test_zero_durations_single_tick() {
        let mut t = timer(0.0, 0.0, 0.0, 0.0);
        let mut rec = Recorder::default();
        t.start(&mut rec, &mut ());
        assert_eq!(t.phase(), Phase::Warmup, "start does not pass through");

        t.tick(1.0 / 60.0, &mut rec, &mut ());
        assert_eq!(t.phase(), Phase::Idle);
        assert_eq!(
            rec.events,
            vec!["warmup", "active", "recovery", "finished", "cooldown", "ready"]
        );
    }

    #[test]
    fn test_on_tick_sees_updated_phase() {
        let mut t = timer(0.1, 1.0, 0.1, 0.1);
        let mut rec = Recorder::default();
        t.start(&mut rec, &mut ());
        t.tick(0.15, &mut rec, &mut ());
        assert_eq!(rec.events.last().map(String::as_str), Some("tick:Active"));
    }

    #[test]
    fn test_on_tick_not_called_when_idle() {
        let mut t = timer(0.1, 0.1, 0.1, 0.1);
        let mut rec = Recorder::default();
        t.tick(0.5, &mut rec, &mut ());
        assert!(rec.events.is_empty());
    }

    #[test]
    fn test_cancel_clear_is_idempotent() {
        let mut t = timer(0.5, 0.5, 0.5, 0.5);
        let mut rec = Recorder::default();
        t.start(&mut rec, &mut ());
        t.tick(0.6, &mut rec, &mut ());

        t.cancel(true, &mut rec, &mut ());
        let after_once = (t.phase(), t.is_running(), rec.events.clone());
        t.cancel(true, &mut rec, &mut ());

        assert_eq!(t.phase(), Phase::Idle);
        assert!(!t.is_running());
        assert_eq!((t.phase(), t.is_running(), rec.events.clone()), after_once);
        assert_eq!(count(&rec.events, "finished"), 1);
    }

    #[test]
    fn test_cancel_keep_cooldown() {
        let mut t = timer(0.0, 0.0, 0.0, 0.0);
        let mut rec = Recorder::default();
        t.start(&mut rec, &mut ());
        t.cancel(false, &mut rec, &mut ());
        assert!(t.is_on_cooldown());
        assert!(!t.is_running());
        assert_eq!(count(&rec.events, "finished"), 1);

        // Cancel(false) on cooldown is a no-op
        t.cancel(false, &mut rec, &mut ());
        assert!(t.is_on_cooldown());
        assert_eq!(count(&rec.events, "finished"), 1);
    }

    #[test]
    fn test_cancel_clear_from_cooldown() {
        let mut t = timer(0.0, 0.0, 0.0, 5.0);
        let mut rec = Recorder::default();
        t.start(&mut rec, &mut ());
        t.tick(0.01, &mut rec, &mut ());
        assert!(t.is_on_cooldown());

        t.cancel(true, &mut rec, &mut ());
        assert_eq!(t.phase(), Phase::Idle);
        assert_eq!(count(&rec.events, "finished"), 1, "no second finish");
    }

    #[test]
    fn test_cancel_when_idle_is_noop() {
        let mut t = timer(0.1, 0.1, 0.1, 0.1);
        let mut rec = Recorder::default();
        t.cancel(true, &mut rec, &mut ());
        t.cancel(false, &mut rec, &mut ());
        assert_eq!(t.phase(), Phase::Idle);
        assert!(rec.events.is_empty());
    }

    #[test]
    fn test_force_recovery_from_warmup() {
        let mut t = timer(1.0, 1.0, 1.0, 1.0);
        let mut rec = Recorder::default();
        t.start(&mut rec, &mut ());
        assert!(t.force_recovery(&mut rec, &mut ()));
        assert_eq!(t.phase(), Phase::Recovery);
        assert_eq!(rec.events, vec!["warmup", "recovery"]);

        assert!(!t.force_recovery(&mut rec, &mut ()), "only forward from Warmup/Active");
    }

    #[test]
    fn test_force_recovery_request_from_tick() {
        let mut t = timer(0.0, 10.0, 0.0, 0.0);
        let mut rec = Recorder {
            on_tick: Some(|phase, ctl| {
                if phase == Phase::Active {
                    ctl.force_recovery();
                }
            }),
            ..Default::default()
        };
        t.start(&mut rec, &mut ());
        t.tick(0.01, &mut rec, &mut ());
        // Recovery and Cooldown are zero-length, so the run completes this tick
        assert_eq!(t.phase(), Phase::Idle);
        assert_eq!(count(&rec.events, "finished"), 1);
    }

    #[test]
    fn test_hold_and_finish_phase() {
        let mut t = timer(0.0, 0.0, 0.1, 0.0);
        let mut rec = Recorder {
            on_recovery: Some(|ctl| ctl.hold_phase()),
            ..Default::default()
        };
        t.start(&mut rec, &mut ());
        t.tick(0.01, &mut rec, &mut ());
        assert_eq!(t.phase(), Phase::Recovery);
        assert!(t.is_held());

        t.tick(5.0, &mut rec, &mut ());
        assert_eq!(t.phase(), Phase::Recovery, "held past its duration");
        assert!(t.remaining().is_infinite());

        rec.on_tick = Some(|phase, ctl| {
            if phase == Phase::Recovery {
                ctl.finish_phase();
            }
        });
        t.tick(0.01, &mut rec, &mut ());
        assert_eq!(t.phase(), Phase::Idle);
    }

    #[test]
    fn test_cancel_request_from_active_hook() {
        let mut t = timer(0.0, 1.0, 1.0, 1.0);
        let mut rec = Recorder {
            on_active: Some(|ctl| ctl.cancel(true)),
            ..Default::default()
        };
        t.start(&mut rec, &mut ());
        t.tick(0.01, &mut rec, &mut ());
        assert_eq!(t.phase(), Phase::Idle);
        assert_eq!(rec.events, vec!["warmup", "active", "finished"]);
    }

    #[test]
    fn test_infinite_active_never_expires() {
        let mut t = timer(0.0, f32::INFINITY, 0.0, 0.0);
        let mut rec = Recorder::default();
        t.start(&mut rec, &mut ());
        for _ in 0..100 {
            t.tick(1000.0, &mut rec, &mut ());
        }
        assert_eq!(t.phase(), Phase::Active);
    }

    #[test]
    fn test_negative_dt_ignored() {
        let mut t = timer(1.0, 1.0, 1.0, 1.0);
        let mut rec = Recorder::default();
        t.start(&mut rec, &mut ());
        t.tick(-5.0, &mut rec, &mut ());
        t.tick(f32::NAN, &mut rec, &mut ());
        assert_eq!(t.elapsed(), 0.0);
        assert_eq!(t.phase(), Phase::Warmup);
    }

    #[test]
    fn test_recovery_entry_reports_forced() {
        struct Entries(Vec<bool>);
        impl PhaseHooks<()> for Entries {
            fn on_recovery_started(&mut self, ctl: &mut PhaseControl, _: &mut ()) {
                self.0.push(ctl.was_forced());
            }
        }

        let mut t = timer(0.0, 0.5, 0.5, 0.0);
        let mut hooks = Entries(Vec::new());
        t.start(&mut hooks, &mut ());
        t.tick(0.1, &mut hooks, &mut ());
        t.tick(0.6, &mut hooks, &mut ());
        assert_eq!(t.phase(), Phase::Recovery);
        t.tick(0.6, &mut hooks, &mut ());
        assert_eq!(t.phase(), Phase::Idle);

        t.start(&mut hooks, &mut ());
        assert!(t.force_recovery(&mut hooks, &mut ()));
        assert_eq!(hooks.0, vec![false, true]);
    }

    #[test]
    fn test_unit_hooks() {
        let mut t = timer(0.0, 0.0, 0.0, 0.0);
        t.start(&mut (), &mut ());
        t.tick(0.1, &mut (), &mut ());
        assert_eq!(t.phase(), Phase::Idle);
    }
}
