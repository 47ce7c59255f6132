//! In-memory host world.
//!
//! [`MemoryWorld`] plays the role of the game: it stores blocks and entities,
//! runs a tiny rule-based physics engine, and routes every mutation through
//! the tracker's capture hooks the way real game code would.
use std::collections::{BTreeMap, HashMap, HashSet};

use tracing::{debug, trace};
use tracking_core::{
    AuditEntry, AuditSink, BlockChange, BlockId, BlockPos, BlockSnapshot, BlockState, BlockWorld,
    CauseTracker, ChangeBlockEvent, ChangeBlockPostEvent, ChangeFlag, DropItemEvent, EntityId,
    EntityKind, EntitySnapshot, EventSink, ItemDrop, ListenerBus, SpawnEntityEvent,
    TracingAuditSink, TrackerHost, TrackingError, UpdateFlags, UserId, WorldId,
};

/// "When `trigger` is added, also place `place` at `offset` from it."
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PhysicsRule {
    pub trigger: BlockId,
    pub offset: (i32, i32, i32),
    pub place: BlockState,
}

impl PhysicsRule {
    pub const fn new(trigger: BlockId, offset: (i32, i32, i32), place: BlockState) -> Self {
        Self {
            trigger,
            offset,
            place,
        }
    }

    fn target(&self, pos: BlockPos) -> BlockPos {
        let (dx, dy, dz) = self.offset;
        pos.offset(dx, dy, dz)
    }
}

/// Side effects observed by the world, in the order they happened.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WorldEvent {
    /// A write performed on behalf of the tracker (restore or replacement).
    Written {
        pos: BlockPos,
        state: BlockState,
        flag: ChangeFlag,
    },
    BlockUpdated {
        pos: BlockPos,
        old: BlockState,
        new: BlockState,
    },
    NeighborsNotified {
        pos: BlockPos,
    },
    PhysicsRan {
        pos: BlockPos,
        state: BlockState,
    },
    Spawned {
        id: EntityId,
        kind: EntityKind,
    },
}

/// Owned copy of one audit entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuditRecord {
    pub pos: BlockPos,
    pub change: BlockChange,
    pub original: BlockState,
    pub replacement: BlockState,
    pub source: Option<String>,
    pub notifier: Option<UserId>,
}

#[derive(Debug)]
pub struct MemoryWorld {
    id: WorldId,
    blocks: HashMap<BlockPos, BlockState>,
    block_entities: HashSet<BlockId>,
    physics: Vec<PhysicsRule>,
    entities: BTreeMap<EntityId, EntitySnapshot>,
    next_entity: u64,
    creators: HashMap<BlockPos, UserId>,
    notifiers: HashMap<BlockPos, UserId>,
    listeners: ListenerBus,
    audit: Vec<AuditRecord>,
    audit_log: TracingAuditSink,
    events: Vec<WorldEvent>,
}

impl MemoryWorld {
    pub fn new(id: WorldId) -> Self {
        Self {
            id,
            blocks: HashMap::new(),
            block_entities: HashSet::new(),
            physics: Vec::new(),
            entities: BTreeMap::new(),
            next_entity: 1,
            creators: HashMap::new(),
            notifiers: HashMap::new(),
            listeners: ListenerBus::new(),
            audit: Vec::new(),
            audit_log: TracingAuditSink,
            events: Vec::new(),
        }
    }

    pub fn id(&self) -> WorldId {
        self.id
    }

    /// Places `state` directly, outside of any tracking. Used to seed worlds.
    pub fn seed(&mut self, pos: BlockPos, state: BlockState) {
        self.write_raw(pos, state);
    }

    #[must_use]
    pub fn with_block(mut self, pos: BlockPos, state: BlockState) -> Self {
        self.seed(pos, state);
        self
    }

    pub fn add_physics_rule(&mut self, rule: PhysicsRule) {
        self.physics.push(rule);
    }

    /// Marks `block` as carrying block-entity behavior, which suppresses its
    /// physics.
    pub fn mark_block_entity(&mut self, block: BlockId) {
        self.block_entities.insert(block);
    }

    pub fn listeners(&mut self) -> &mut ListenerBus {
        &mut self.listeners
    }

    pub fn snapshot(&self, pos: BlockPos) -> BlockSnapshot {
        BlockSnapshot::new(self.id, pos, self.block_state(pos))
    }

    /// Game-side block write.
    ///
    /// The original block is offered to the tracker before the world is
    /// modified. When the current phase captures it, physics and
    /// notifications are deferred to the replay; otherwise the change applies
    /// immediately without physics.
    pub fn set_block(
        &mut self,
        tracker: &mut CauseTracker,
        pos: BlockPos,
        state: BlockState,
        change: BlockChange,
    ) -> Result<(), TrackingError> {
        let original = self.snapshot(pos).with_change(change);
        let old = original.state;
        let captured = tracker.capture_block_change(original)?;
        self.write_raw(pos, state);
        if !captured {
            trace!(target: "sandbox::world", pos = %pos, state = %state, "untracked block write");
            self.notify_block_update(pos, old, state, UpdateFlags::DEFAULT);
        }
        Ok(())
    }

    /// Breaks the block at `pos`, dropping `drops`.
    ///
    /// Drops the tracker does not buffer per position become item entities
    /// right away and go through the regular spawn path.
    pub fn break_block(
        &mut self,
        tracker: &mut CauseTracker,
        pos: BlockPos,
        drops: &[ItemDrop],
    ) -> Result<(), TrackingError> {
        self.set_block(tracker, pos, BlockState::AIR, BlockChange::Break)?;
        for drop in drops {
            if !tracker.capture_block_drop(pos, *drop)? {
                let item = self.create_item_entity(pos, drop);
                self.spawn_snapshot(tracker, item)?;
            }
        }
        Ok(())
    }

    /// A block at `pos` spills `drop` as a ready-made item entity, the way
    /// containers empty out when broken.
    pub fn spill_item(
        &mut self,
        tracker: &mut CauseTracker,
        pos: BlockPos,
        drop: ItemDrop,
    ) -> Result<EntityId, TrackingError> {
        let item = self.create_item_entity(pos, &drop);
        let id = item.id;
        if !tracker.capture_block_item_drop(pos, item.clone())? {
            self.spawn_snapshot(tracker, item)?;
        }
        Ok(id)
    }

    /// Game-side entity spawn.
    pub fn spawn(
        &mut self,
        tracker: &mut CauseTracker,
        pos: BlockPos,
        kind: EntityKind,
    ) -> Result<EntityId, TrackingError> {
        let id = self.allocate_entity();
        self.spawn_snapshot(tracker, EntitySnapshot::new(id, kind, pos))?;
        Ok(id)
    }

    fn spawn_snapshot(
        &mut self,
        tracker: &mut CauseTracker,
        entity: EntitySnapshot,
    ) -> Result<(), TrackingError> {
        let captured = if entity.is_item() {
            tracker.capture_item_spawn(entity.clone())?
        } else {
            tracker.capture_entity_spawn(entity.clone())?
        };
        if !captured {
            self.insert_entity(entity);
        }
        Ok(())
    }

    fn allocate_entity(&mut self) -> EntityId {
        let id = EntityId(self.next_entity);
        self.next_entity += 1;
        id
    }

    fn insert_entity(&mut self, entity: EntitySnapshot) {
        self.events.push(WorldEvent::Spawned {
            id: entity.id,
            kind: entity.kind,
        });
        self.entities.insert(entity.id, entity);
    }

    fn write_raw(&mut self, pos: BlockPos, state: BlockState) {
        if state.is_air() {
            self.blocks.remove(&pos);
        } else {
            self.blocks.insert(pos, state);
        }
    }

    pub fn entity(&self, id: EntityId) -> Option<&EntitySnapshot> {
        self.entities.get(&id)
    }

    /// Spawned entities, by id.
    pub fn entities(&self) -> impl Iterator<Item = &EntitySnapshot> + '_ {
        self.entities.values()
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn creator(&self, pos: BlockPos) -> Option<UserId> {
        self.creators.get(&pos).copied()
    }

    pub fn notifier(&self, pos: BlockPos) -> Option<UserId> {
        self.notifiers.get(&pos).copied()
    }

    pub fn audit(&self) -> &[AuditRecord] {
        &self.audit
    }

    pub fn events(&self) -> &[WorldEvent] {
        &self.events
    }

    /// Every non-air block, sorted by position.
    pub fn blocks(&self) -> Vec<(BlockPos, BlockState)> {
        let mut blocks: Vec<_> = self.blocks.iter().map(|(pos, state)| (*pos, *state)).collect();
        blocks.sort_by_key(|(pos, _)| *pos);
        blocks
    }
}

impl BlockWorld for MemoryWorld {
    fn block_state(&self, pos: BlockPos) -> BlockState {
        self.blocks.get(&pos).copied().unwrap_or(BlockState::AIR)
    }

    fn has_block_entity(&self, state: &BlockState) -> bool {
        self.block_entities.contains(&state.block)
    }
}

impl EventSink for MemoryWorld {
    fn post_change_block(&mut self, event: &mut ChangeBlockEvent<'_>) {
        self.listeners.post_change_block(event);
    }

    fn post_change_block_post(&mut self, event: &mut ChangeBlockPostEvent<'_>) {
        self.listeners.post_change_block_post(event);
    }

    fn post_drop_item(&mut self, event: &mut DropItemEvent) {
        self.listeners.post_drop_item(event);
    }

    fn post_spawn_entity(&mut self, event: &mut SpawnEntityEvent) {
        self.listeners.post_spawn_entity(event);
    }
}

impl AuditSink for MemoryWorld {
    fn record_block_change(&mut self, entry: &AuditEntry<'_>) {
        self.audit_log.record_block_change(entry);
        self.audit.push(AuditRecord {
            pos: entry.pos,
            change: entry.change,
            original: entry.original,
            replacement: entry.replacement,
            source: entry.cause.source().map(|source| source.label()),
            notifier: entry.cause.notifier(),
        });
    }
}

impl TrackerHost for MemoryWorld {
    fn write_block(
        &mut self,
        _tracker: &mut CauseTracker,
        pos: BlockPos,
        state: BlockState,
        flag: ChangeFlag,
    ) -> Result<(), TrackingError> {
        self.write_raw(pos, state);
        self.events.push(WorldEvent::Written { pos, state, flag });
        Ok(())
    }

    fn on_block_added(
        &mut self,
        tracker: &mut CauseTracker,
        pos: BlockPos,
        state: BlockState,
    ) -> Result<(), TrackingError> {
        let placements: Vec<(BlockPos, BlockState)> = self
            .physics
            .iter()
            .filter(|rule| rule.trigger == state.block)
            .map(|rule| (rule.target(pos), rule.place))
            .collect();
        if placements.is_empty() {
            return Ok(());
        }
        self.events.push(WorldEvent::PhysicsRan { pos, state });
        for (target, place) in placements {
            debug!(target: "sandbox::physics", from = %pos, to = %target, state = %place, "physics placement");
            self.set_block(tracker, target, place, BlockChange::Place)?;
        }
        Ok(())
    }

    fn notify_block_update(
        &mut self,
        pos: BlockPos,
        old: BlockState,
        new: BlockState,
        _flags: UpdateFlags,
    ) {
        self.events.push(WorldEvent::BlockUpdated { pos, old, new });
    }

    fn notify_neighbors(
        &mut self,
        tracker: &mut CauseTracker,
        pos: BlockPos,
        _old: BlockState,
        _new: BlockState,
        _flags: UpdateFlags,
    ) -> Result<(), TrackingError> {
        for neighbor in pos.neighbors() {
            if let Some((target, user)) = tracker.associate_neighbor_notifier(Some(pos), neighbor)? {
                self.notifiers.insert(target, user);
            }
        }
        self.events.push(WorldEvent::NeighborsNotified { pos });
        Ok(())
    }

    fn create_item_entity(&mut self, pos: BlockPos, drop: &ItemDrop) -> EntitySnapshot {
        let id = self.allocate_entity();
        let kind = EntityKind::Item {
            item: drop.item,
            count: drop.count,
        };
        EntitySnapshot::new(id, kind, pos)
    }

    fn spawn_entity(
        &mut self,
        _tracker: &mut CauseTracker,
        entity: EntitySnapshot,
    ) -> Result<(), TrackingError> {
        trace!(target: "sandbox::world", entity = %entity.id, creator = ?entity.creator, "entity spawned");
        self.insert_entity(entity);
        Ok(())
    }

    fn set_block_creator(&mut self, pos: BlockPos, user: UserId) {
        self.creators.insert(pos, user);
    }
}
