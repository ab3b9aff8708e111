use super::input::InputChannel;
use super::types::{GameEvent, TickReport, WorldUpdate};
use crate::domain::systems::{collision, physics};
use crate::domain::{
    Arena, Craft, CraftId, CraftSnapshot, EntityStore, Intent, ProjectileSnapshot, SimTuning,
};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// The authoritative arena simulation. Synchronous; the world task drives it.
#[derive(Debug)]
pub struct Simulation {
    arena: Arena,
    tuning: SimTuning,
    store: EntityStore,
    tick: u64,
}

impl Simulation {
    pub fn new(arena: Arena, tuning: SimTuning) -> Self {
        Self {
            arena,
            tuning,
            store: EntityStore::new(),
            tick: 0,
        }
    }

    pub fn arena(&self) -> &Arena {
        &self.arena
    }

    pub fn tuning(&self) -> &SimTuning {
        &self.tuning
    }

    /// Number of completed ticks.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    #[cfg(test)]
    pub(crate) fn store_mut(&mut self) -> &mut EntityStore {
        &mut self.store
    }

    /// Spawns a craft at the arena center. Returns false if the id is already taken.
    pub fn connect(&mut self, craft_id: CraftId) -> bool {
        if self.store.craft(craft_id).is_some() {
            return false;
        }
        let craft = Craft::spawn(craft_id, &self.arena, self.tuning.craft.initial_heading_deg);
        self.store.insert_craft(craft);
        info!(craft_id, "craft joined");
        true
    }

    /// Removes a craft immediately. Removing an absent craft is a no-op.
    pub fn disconnect(&mut self, craft_id: CraftId) -> bool {
        match self.store.remove_craft(craft_id) {
            Some(_) => {
                info!(craft_id, "craft left");
                true
            }
            None => {
                debug!(craft_id, "leave for absent craft ignored");
                false
            }
        }
    }

    /// Replaces the intent of one craft. Unknown or dead craft are ignored.
    pub fn set_intent(&mut self, craft_id: CraftId, intent: Intent) -> bool {
        match self.store.craft_mut(craft_id) {
            Some(craft) if craft.alive => {
                craft.intent = intent;
                true
            }
            _ => false,
        }
    }

    /// Applies a batch of intents and returns how many reached a live craft.
    pub fn apply_intents<I>(&mut self, intents: I) -> usize
    where
        I: IntoIterator<Item = (CraftId, Intent)>,
    {
        let mut applied = 0;
        for (craft_id, intent) in intents {
            if self.set_intent(craft_id, intent) {
                applied += 1;
            } else {
                debug!(craft_id, "input for unknown or destroyed craft dropped");
            }
        }
        applied
    }

    /// Runs one tick: integrate, resolve collisions, prune, snapshot.
    pub fn step(&mut self) -> TickReport {
        let shots_fired = physics::integrate(&mut self.store, &self.tuning);
        let destroyed = collision::resolve(&mut self.store, &self.arena, &self.tuning);
        self.store.prune_dead_crafts();
        self.tick += 1;

        TickReport {
            tick: self.tick,
            shots_fired,
            destroyed,
            update: self.snapshot(),
        }
    }

    /// Full state of every craft and projectile, as of the last completed tick.
    pub fn snapshot(&self) -> WorldUpdate {
        WorldUpdate {
            tick: self.tick,
            crafts: self.store.crafts().map(CraftSnapshot::from).collect(),
            projectiles: self
                .store
                .projectiles()
                .iter()
                .map(ProjectileSnapshot::from)
                .collect(),
        }
    }
}

pub async fn world_task(
    mut events_rx: mpsc::Receiver<GameEvent>,
    input: InputChannel,
    world_tx: broadcast::Sender<WorldUpdate>,
    mut sim: Simulation,
    tick_interval: Duration,
) {
    // One-shot destruction notices for craft whose owners are still connected.
    let mut destroy_notifiers: HashMap<CraftId, oneshot::Sender<()>> = HashMap::new();

    let mut interval = tokio::time::interval(tick_interval);
    // A late tick is followed by catch-up ticks at their nominal times; none are skipped.
    interval.set_missed_tick_behavior(MissedTickBehavior::Burst);
    let slow_tick_budget = tick_interval.mul_f64(0.9);

    info!(
        tick_interval_us = tick_interval.as_micros() as u64,
        arena_radius = sim.arena().radius,
        "world loop started"
    );

    loop {
        interval.tick().await;
        let started = Instant::now();

        // Lifecycle first, so input from a craft that just joined applies this tick.
        loop {
            match events_rx.try_recv() {
                Ok(ev) => apply_event(&mut sim, &input, &mut destroy_notifiers, ev),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    info!(tick = sim.tick(), "lifecycle channel closed; world loop exiting");
                    return;
                }
            }
        }

        sim.apply_intents(input.drain());

        let report = sim.step();
        let tick = report.tick;

        for destruction in &report.destroyed {
            if let Some(tx) = destroy_notifiers.remove(&destruction.craft_id) {
                // The owner may already be gone; nothing to do then.
                let _ = tx.send(());
            }
        }

        // No receivers simply means nobody is connected.
        let _ = world_tx.send(report.update);

        let elapsed = started.elapsed();
        if elapsed > slow_tick_budget {
            warn!(
                tick,
                elapsed_us = elapsed.as_micros() as u64,
                budget_us = slow_tick_budget.as_micros() as u64,
                crafts = sim.store().craft_count(),
                projectiles = sim.store().projectiles().len(),
                "slow tick"
            );
        }
    }
}

fn apply_event(
    sim: &mut Simulation,
    input: &InputChannel,
    destroy_notifiers: &mut HashMap<CraftId, oneshot::Sender<()>>,
    ev: GameEvent,
) {
    match ev {
        GameEvent::Join {
            craft_id,
            destroyed_tx,
        } => {
            if sim.connect(craft_id) {
                destroy_notifiers.insert(craft_id, destroyed_tx);
            } else {
                warn!(craft_id, "duplicate join ignored");
            }
        }
        GameEvent::Leave { craft_id } => {
            sim.disconnect(craft_id);
            // Dropping the sender tells nobody anything; the owner is the one leaving.
            destroy_notifiers.remove(&craft_id);
            input.forget(craft_id);
        }
    }
}
