//! Replays a [`ScenarioSpec`] against a [`MemoryWorld`].
use tracing::{debug, info, warn};
use tracking_content::{ListenerRule, ScenarioSpec, SourceSpec, StepSpec};
use tracking_core::{
    BlockPos, BlockState, Cancellable, CauseKey, CauseTracker, CauseValue, EntityId,
    ListenerBus, Order, PhaseContext, PhaseState, TrackerConfig, TrackingError, UserId,
};

use crate::world::{MemoryWorld, PhysicsRule};

/// Final state of a scenario run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScenarioReport {
    pub name: String,
    pub steps: usize,
    pub blocks: Vec<(BlockPos, BlockState)>,
    pub entities: usize,
    pub audited: usize,
    /// Phases still on the stack after the last step.
    pub open_phases: usize,
}

#[derive(Debug)]
pub struct ScenarioRunner {
    name: String,
    steps: Vec<StepSpec>,
    tracker: CauseTracker,
    world: MemoryWorld,
}

impl ScenarioRunner {
    /// Seeds a fresh world from `spec` and installs its physics and listener
    /// rules.
    pub fn new(spec: &ScenarioSpec, config: TrackerConfig) -> Self {
        let id = spec.world_id();
        let mut world = MemoryWorld::new(id);
        for block in &spec.blocks {
            world.seed(block.pos, block.state);
        }
        for physics in &spec.physics {
            world.add_physics_rule(PhysicsRule::new(physics.trigger, physics.offset, physics.place));
        }
        for rule in &spec.listeners {
            install_listener(world.listeners(), *rule);
        }

        Self {
            name: spec.name.clone(),
            steps: spec.steps.clone(),
            tracker: CauseTracker::new(id, config),
            world,
        }
    }

    pub fn tracker(&self) -> &CauseTracker {
        &self.tracker
    }

    pub fn world(&self) -> &MemoryWorld {
        &self.world
    }

    /// Runs every step in order, stopping at the first error.
    pub fn run(&mut self) -> Result<ScenarioReport, TrackingError> {
        info!(target: "sandbox::scenario", name = %self.name, steps = self.steps.len(), "running scenario");
        let steps = std::mem::take(&mut self.steps);
        for (index, step) in steps.iter().enumerate() {
            debug!(target: "sandbox::scenario", index, step = ?step, "step");
            self.apply(step)?;
        }
        if self.tracker.depth() > 0 {
            warn!(
                target: "sandbox::scenario",
                name = %self.name,
                open = self.tracker.depth(),
                "scenario finished with phases still pushed"
            );
        }
        let count = steps.len();
        self.steps = steps;
        Ok(self.report(count))
    }

    pub fn apply(&mut self, step: &StepSpec) -> Result<(), TrackingError> {
        match step {
            StepSpec::Push {
                state,
                source,
                notifier,
                owner,
                player_simulated,
            } => {
                let context = self.context(*state, source, *notifier, *owner, *player_simulated)?;
                self.tracker.push_phase(*state, context)
            }
            StepSpec::Pop => self.tracker.pop_phase(&mut self.world),
            StepSpec::SetBlock { pos, state, change } => {
                self.world.set_block(&mut self.tracker, *pos, *state, *change)
            }
            StepSpec::BreakBlock { pos, drops } => {
                self.world.break_block(&mut self.tracker, *pos, drops)
            }
            StepSpec::SpawnEntity { pos, kind } => {
                self.world.spawn(&mut self.tracker, *pos, *kind).map(|_| ())
            }
        }
    }

    fn context(
        &self,
        state: PhaseState,
        source: &SourceSpec,
        notifier: Option<u64>,
        owner: Option<u64>,
        player_simulated: Option<u64>,
    ) -> Result<PhaseContext, TrackingError> {
        let builder = match state {
            PhaseState::Explosion => self.tracker.explosion_context(),
            _ => PhaseContext::start().add_capture_kinds(state.default_captures()),
        };
        let mut builder = builder
            .source(self.source_value(source))
            .attribution(notifier.map(UserId), owner.map(UserId));
        if let Some(user) = player_simulated {
            builder = builder.named(CauseKey::PlayerSimulated, CauseValue::Player(UserId(user)));
        }
        Ok(builder.complete()?)
    }

    fn source_value(&self, source: &SourceSpec) -> CauseValue {
        match source {
            SourceSpec::Player(user) => CauseValue::Player(UserId(*user)),
            SourceSpec::Command(name) => CauseValue::Command(name.clone()),
            SourceSpec::Plugin(name) => CauseValue::Plugin(name.clone()),
            SourceSpec::Entity(id) => CauseValue::Entity(EntityId(*id)),
            SourceSpec::Block(pos) => CauseValue::Block(self.world.snapshot(*pos)),
        }
    }

    fn report(&self, steps: usize) -> ScenarioReport {
        ScenarioReport {
            name: self.name.clone(),
            steps,
            blocks: self.world.blocks(),
            entities: self.world.entity_count(),
            audited: self.world.audit().len(),
            open_phases: self.tracker.depth(),
        }
    }
}

/// Translates a declarative rule into a bus listener.
pub fn install_listener(bus: &mut ListenerBus, rule: ListenerRule) {
    match rule {
        ListenerRule::CancelBucket(bucket) => {
            bus.on_change_block(Order::Default, move |event| {
                if event.bucket() == bucket {
                    event.cancel();
                }
            });
        }
        ListenerRule::CancelPost => {
            bus.on_change_block_post(Order::Default, |event| event.cancel());
        }
        ListenerRule::CancelDrops => {
            bus.on_drop_item(Order::Default, |event| event.cancel());
        }
        ListenerRule::CancelSpawns => {
            bus.on_spawn_entity(Order::Default, |event| event.cancel());
        }
        ListenerRule::Replace { pos, state } => {
            bus.on_change_block(Order::Late, move |event| {
                for transaction in event.transactions_mut() {
                    if transaction.pos() == pos {
                        transaction.set_custom(state);
                    }
                }
            });
        }
    }
}

