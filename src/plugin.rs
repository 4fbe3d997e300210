//! Bevy host integration.
//!
//! An [`AttackScheduler`] component owns one controller together with the
//! host adapters it drives. Each frame detection edges are forwarded first,
//! then every scheduler ticks with `Time::delta_secs()`.

use bevy::prelude::*;

use crate::actor::{Actor, AttackContext, EffectSink, Spawner};
use crate::combat::AttackBehavior;
use crate::controller::{AttackController, DetectionEvent};

pub struct AttackSchedulerPlugin;

impl Plugin for AttackSchedulerPlugin {
    fn build(&self, app: &mut App) {
        app.add_event::<DetectionChanged>().add_systems(
            Update,
            (forward_detection_events, tick_attack_schedulers).chain(),
        );
    }
}

/// Detection-region edge for one scheduler entity
#[derive(Event, Debug, Clone, Copy)]
pub struct DetectionChanged {
    pub entity: Entity,
    pub event: DetectionEvent,
}

/// Controller plus the host adapters it reads and writes
#[derive(Component)]
pub struct AttackScheduler {
    pub controller: AttackController,
    pub actor: Box<dyn Actor>,
    pub effects: Box<dyn EffectSink>,
    pub spawner: Box<dyn Spawner>,
    initialized: bool,
}

impl AttackScheduler {
    pub fn new(
        controller: AttackController,
        actor: Box<dyn Actor>,
        effects: Box<dyn EffectSink>,
        spawner: Box<dyn Spawner>,
    ) -> Self {
        Self {
            controller,
            actor,
            effects,
            spawner,
            initialized: false,
        }
    }

    fn ensure_initialized(&mut self) {
        if !self.initialized {
            self.controller.initialize(&*self.actor);
            self.initialized = true;
        }
    }

    pub fn tick(&mut self, dt: f32) {
        self.ensure_initialized();
        let mut ctx = AttackContext::new(&mut *self.actor, &mut *self.effects, &mut *self.spawner);
        self.controller.tick(dt, &mut ctx);
    }

    pub fn handle_detection(&mut self, event: DetectionEvent) {
        self.ensure_initialized();
        let mut ctx = AttackContext::new(&mut *self.actor, &mut *self.effects, &mut *self.spawner);
        self.controller.handle_detection(event, &mut ctx);
    }
}

/// Route detection events to their scheduler
pub fn forward_detection_events(
    mut events: EventReader<DetectionChanged>,
    mut schedulers: Query<&mut AttackScheduler>,
) {
    for changed in events.read() {
        if let Ok(mut scheduler) = schedulers.get_mut(changed.entity) {
            scheduler.handle_detection(changed.event);
        }
    }
}

/// Advance every scheduler by the frame delta
pub fn tick_attack_schedulers(time: Res<Time>, mut schedulers: Query<&mut AttackScheduler>) {
    let dt = time.delta_secs();
    for mut scheduler in &mut schedulers {
        scheduler.tick(dt);
    }
}
