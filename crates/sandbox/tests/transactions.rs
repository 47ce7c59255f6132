//! Replay of captured block changes: event order, rollback and reentrancy.
mod common;

use std::cell::RefCell;
use std::rc::Rc;

use common::*;
use tracking_core::{
    AuditEntry, AuditSink, BlockChange, BlockPos, BlockState, BlockWorld, Cancellable,
    ChangeBlockEvent, ChangeBlockPostEvent, ChangeBucket, ChangeFlag, CauseTracker, DropItemEvent,
    DropKind, EntitySnapshot, EventSink, ItemDrop, ItemId, Order, PhaseState, SpawnEntityEvent,
    TrackerConfig, TrackerHost, TrackingError, UpdateFlags, UserId,
};
use tracking_sandbox::{MemoryWorld, PhysicsRule, WorldEvent};

#[test]
fn test_bucket_events_fire_in_priority_order() {
    let (mut tracker, world) = setup();
    let mut world = world.with_block(at(1), STONE).with_block(at(4), STONE);

    let seen = Rc::new(RefCell::new(Vec::new()));
    let post_sizes = Rc::new(RefCell::new(Vec::new()));
    {
        let seen = Rc::clone(&seen);
        world.listeners().on_change_block(Order::Default, move |event| {
            let positions: Vec<i32> = event.transactions().iter().map(|tx| tx.pos().x).collect();
            seen.borrow_mut().push((event.bucket(), positions));
        });
        let post_sizes = Rc::clone(&post_sizes);
        world.listeners().on_change_block_post(Order::Default, move |event| {
            post_sizes.borrow_mut().push(event.transactions().len());
        });
    }

    push_command(&mut tracker, 7);
    world.set_block(&mut tracker, at(0), DIRT, BlockChange::Place).unwrap();
    world.set_block(&mut tracker, at(1), BlockState::AIR, BlockChange::Break).unwrap();
    world.set_block(&mut tracker, at(2), STONE, BlockChange::Place).unwrap();
    world.set_block(&mut tracker, at(4), DIRT, BlockChange::Modify).unwrap();
    tracker.pop_phase(&mut world).expect("unwind should succeed");

    assert_eq!(
        *seen.borrow(),
        vec![
            (ChangeBucket::Break, vec![1]),
            (ChangeBucket::Modify, vec![4]),
            (ChangeBucket::Place, vec![0, 2]),
        ]
    );
    assert_eq!(*post_sizes.borrow(), vec![4]);

    let applied: Vec<i32> = world.audit().iter().map(|record| record.pos.x).collect();
    assert_eq!(applied, vec![1, 4, 0, 2]);
    assert_eq!(world.audit()[0].source.as_deref(), Some("player user#7"));
}

#[test]
fn test_cancelled_post_event_restores_everything() {
    let (mut tracker, world) = setup();
    let mut world = world.with_block(at(0), STONE);
    world
        .listeners()
        .on_change_block_post(Order::Default, |event| event.cancel());

    push_command(&mut tracker, 7);
    world
        .break_block(&mut tracker, at(0), &[ItemDrop::new(ItemId(4), 1)])
        .unwrap();
    world.set_block(&mut tracker, at(1), DIRT, BlockChange::Place).unwrap();

    // Captured writes are already visible before the phase unwinds.
    assert_eq!(world.block_state(at(0)), BlockState::AIR);
    assert_eq!(world.block_state(at(1)), DIRT);

    tracker.pop_phase(&mut world).expect("unwind should succeed");

    assert_eq!(world.block_state(at(0)), STONE);
    assert_eq!(world.block_state(at(1)), BlockState::AIR);
    assert_eq!(world.entity_count(), 0, "drops of a restored break are cleared");
    assert!(world.audit().is_empty());

    let restores: Vec<WorldEvent> = world
        .events()
        .iter()
        .filter(|event| matches!(event, WorldEvent::Written { .. }))
        .cloned()
        .collect();
    assert_eq!(
        restores,
        vec![
            WorldEvent::Written {
                pos: at(1),
                state: BlockState::AIR,
                flag: ChangeFlag::NONE
            },
            WorldEvent::Written {
                pos: at(0),
                state: STONE,
                flag: ChangeFlag::NONE
            },
        ]
    );
}

#[test]
fn test_cancelled_bucket_only_restores_its_transactions() {
    let (mut tracker, world) = setup();
    let mut world = world.with_block(at(0), STONE);
    world.listeners().on_change_block(Order::Default, |event| {
        if event.bucket() == ChangeBucket::Place {
            event.cancel();
        }
    });

    push_command(&mut tracker, 7);
    world
        .break_block(&mut tracker, at(0), &[ItemDrop::new(ItemId(4), 2)])
        .unwrap();
    world.set_block(&mut tracker, at(1), DIRT, BlockChange::Place).unwrap();
    tracker.pop_phase(&mut world).expect("unwind should succeed");

    assert_eq!(world.block_state(at(0)), BlockState::AIR);
    assert_eq!(world.block_state(at(1)), BlockState::AIR);

    assert_eq!(world.audit().len(), 1);
    assert_eq!(world.audit()[0].change, BlockChange::Break);

    let drops: Vec<_> = world.entities().collect();
    assert_eq!(drops.len(), 1);
    assert_eq!(drops[0].pos, at(0));
    assert!(drops[0].is_item());
}

#[test]
fn test_phase_without_captures_fires_nothing() {
    let (mut tracker, mut world) = setup();
    let fired = Rc::new(RefCell::new(0));
    {
        let fired = Rc::clone(&fired);
        world.listeners().on_change_block_post(Order::Default, move |_| {
            *fired.borrow_mut() += 1;
        });
    }

    push_command(&mut tracker, 7);
    tracker.pop_phase(&mut world).expect("unwind should succeed");

    assert_eq!(*fired.borrow(), 0);
    assert!(world.events().is_empty());
    assert_eq!(tracker.depth(), 0);
    assert_eq!(
        tracker.pop_phase(&mut world),
        Err(TrackingError::PhaseStackUnderflow)
    );
}

#[test]
fn test_custom_replacement_is_written_instead_of_final() {
    let (mut tracker, mut world) = setup();
    world.listeners().on_change_block(Order::Late, |event| {
        for transaction in event.transactions_mut() {
            transaction.set_custom(COBBLE);
        }
    });

    push_command(&mut tracker, 7);
    world.set_block(&mut tracker, at(0), STONE, BlockChange::Place).unwrap();
    tracker.pop_phase(&mut world).expect("unwind should succeed");

    assert_eq!(world.block_state(at(0)), COBBLE);
    assert!(world.events().contains(&WorldEvent::Written {
        pos: at(0),
        state: COBBLE,
        flag: ChangeFlag::ALL
    }));
    assert_eq!(world.audit()[0].replacement, COBBLE);
}

#[test]
fn test_physics_changes_drain_before_the_triggering_update() {
    let (mut tracker, mut world) = setup();
    world.add_physics_rule(PhysicsRule::new(SAND.block, (0, 1, 0), GRAVEL));

    let buckets = Rc::new(RefCell::new(Vec::new()));
    {
        let buckets = Rc::clone(&buckets);
        world.listeners().on_change_block(Order::Default, move |event| {
            let states: Vec<BlockState> = event
                .transactions()
                .iter()
                .map(|tx| tx.final_snapshot().state)
                .collect();
            buckets.borrow_mut().push(states);
        });
    }

    push_command(&mut tracker, 7);
    world.set_block(&mut tracker, at(0), SAND, BlockChange::Place).unwrap();
    tracker.pop_phase(&mut world).expect("unwind should succeed");

    assert_eq!(world.block_state(at(0)), SAND);
    assert_eq!(world.block_state(at(0).up()), GRAVEL);
    assert_eq!(*buckets.borrow(), vec![vec![SAND], vec![GRAVEL]]);

    let updates: Vec<_> = world
        .events()
        .iter()
        .filter_map(|event| match event {
            WorldEvent::BlockUpdated { pos, .. } => Some(*pos),
            _ => None,
        })
        .collect();
    assert_eq!(updates, vec![at(0).up(), at(0)]);
    assert_eq!(tracker.drain_depth(), 0);
    assert_eq!(tracker.depth(), 0);
}

#[test]
fn test_block_entities_skip_physics() {
    let (mut tracker, mut world) = setup();
    world.add_physics_rule(PhysicsRule::new(SAND.block, (0, 1, 0), GRAVEL));
    world.mark_block_entity(SAND.block);

    push_command(&mut tracker, 7);
    world.set_block(&mut tracker, at(0), SAND, BlockChange::Place).unwrap();
    tracker.pop_phase(&mut world).expect("unwind should succeed");

    assert_eq!(world.block_state(at(0).up()), BlockState::AIR);
}

#[test]
fn test_self_replicating_physics_hits_drain_limit() {
    let (mut tracker, mut world) = setup_with(TrackerConfig::new().with_max_drain_depth(4));
    world.add_physics_rule(PhysicsRule::new(SAND.block, (0, 1, 0), SAND));

    push_command(&mut tracker, 7);
    world.set_block(&mut tracker, at(0), SAND, BlockChange::Place).unwrap();

    assert_eq!(
        tracker.pop_phase(&mut world),
        Err(TrackingError::DrainTooDeep {
            state: PhaseState::Command,
            depth: 5
        })
    );
    assert_eq!(tracker.depth(), 0);
    assert_eq!(tracker.drain_depth(), 0);
}

#[test]
fn test_restore_uses_captured_original() {
    let (mut tracker, world) = setup();
    let mut world = world.with_block(at(0), STONE);
    world
        .listeners()
        .on_change_block(Order::Default, |event| event.cancel());

    push_command(&mut tracker, 7);
    world.set_block(&mut tracker, at(0), DIRT, BlockChange::Modify).unwrap();
    world.set_block(&mut tracker, at(0), COBBLE, BlockChange::Modify).unwrap();
    tracker.pop_phase(&mut world).expect("unwind should succeed");

    // Latest capture is restored first, so the oldest original wins.
    assert_eq!(world.block_state(at(0)), STONE);
}

#[test]
fn test_breaking_a_block_credits_no_creator() {
    let (mut tracker, world) = setup();
    let mut world = world.with_block(at(0), STONE);

    push_command(&mut tracker, 7);
    world
        .break_block(&mut tracker, at(0), &[ItemDrop::new(ItemId(4), 1)])
        .unwrap();
    world.set_block(&mut tracker, at(1), DIRT, BlockChange::Place).unwrap();
    tracker.pop_phase(&mut world).expect("unwind should succeed");

    assert_eq!(world.block_state(at(0)), BlockState::AIR);
    assert_eq!(world.creator(at(0)), None);
    assert_eq!(world.creator(at(1)), Some(UserId(7)));
}

#[test]
fn test_spilled_items_follow_a_surviving_break() {
    let (mut tracker, world) = setup();
    let mut world = world.with_block(at(0), STONE);
    let kinds = Rc::new(RefCell::new(Vec::new()));
    {
        let kinds = Rc::clone(&kinds);
        world.listeners().on_drop_item(Order::Default, move |event| {
            kinds.borrow_mut().push((event.kind(), event.entities().len()));
        });
    }

    push_command(&mut tracker, 7);
    world.break_block(&mut tracker, at(0), &[]).unwrap();
    let spilled = world
        .spill_item(&mut tracker, at(0), ItemDrop::new(ItemId(54), 3))
        .unwrap();
    assert_eq!(
        tracker
            .current_context()
            .buffers()
            .drops
            .block_item_drops
            .get(&at(0))
            .len(),
        1
    );
    assert_eq!(world.entity_count(), 0);

    tracker.pop_phase(&mut world).expect("unwind should succeed");

    assert_eq!(*kinds.borrow(), vec![(DropKind::Destruct, 1)]);
    let item = world.entity(spilled).expect("spilled item should be spawned");
    assert!(item.is_item());
    assert_eq!(item.pos, at(0));
}

#[test]
fn test_cancelled_break_clears_spilled_items() {
    let (mut tracker, world) = setup();
    let mut world = world.with_block(at(0), STONE);
    world.listeners().on_change_block(Order::Default, |event| {
        if event.bucket() == ChangeBucket::Break {
            event.cancel();
        }
    });

    push_command(&mut tracker, 7);
    world.break_block(&mut tracker, at(0), &[ItemDrop::new(ItemId(4), 1)]).unwrap();
    world
        .spill_item(&mut tracker, at(0), ItemDrop::new(ItemId(54), 3))
        .unwrap();
    tracker.pop_phase(&mut world).expect("unwind should succeed");

    assert_eq!(world.block_state(at(0)), STONE);
    assert_eq!(world.entity_count(), 0);
}

/// Host whose tracker-issued writes behave like game writes and go through
/// the capture hooks.
struct CapturingHost {
    world: MemoryWorld,
}

impl BlockWorld for CapturingHost {
    fn block_state(&self, pos: BlockPos) -> BlockState {
        self.world.block_state(pos)
    }
}

impl EventSink for CapturingHost {
    fn post_change_block(&mut self, event: &mut ChangeBlockEvent<'_>) {
        self.world.post_change_block(event);
    }

    fn post_change_block_post(&mut self, event: &mut ChangeBlockPostEvent<'_>) {
        self.world.post_change_block_post(event);
    }

    fn post_drop_item(&mut self, event: &mut DropItemEvent) {
        self.world.post_drop_item(event);
    }

    fn post_spawn_entity(&mut self, event: &mut SpawnEntityEvent) {
        self.world.post_spawn_entity(event);
    }
}

impl AuditSink for CapturingHost {
    fn record_block_change(&mut self, entry: &AuditEntry<'_>) {
        self.world.record_block_change(entry);
    }
}

impl TrackerHost for CapturingHost {
    fn write_block(
        &mut self,
        tracker: &mut CauseTracker,
        pos: BlockPos,
        state: BlockState,
        flag: ChangeFlag,
    ) -> Result<(), TrackingError> {
        if flag == ChangeFlag::NONE {
            self.world.write_block(tracker, pos, state, flag)
        } else {
            self.world.set_block(tracker, pos, state, BlockChange::Place)
        }
    }

    fn notify_block_update(
        &mut self,
        pos: BlockPos,
        old: BlockState,
        new: BlockState,
        flags: UpdateFlags,
    ) {
        self.world.notify_block_update(pos, old, new, flags);
    }

    fn create_item_entity(&mut self, pos: BlockPos, drop: &ItemDrop) -> EntitySnapshot {
        self.world.create_item_entity(pos, drop)
    }

    fn spawn_entity(
        &mut self,
        tracker: &mut CauseTracker,
        entity: EntitySnapshot,
    ) -> Result<(), TrackingError> {
        self.world.spawn_entity(tracker, entity)
    }

    fn set_block_creator(&mut self, pos: BlockPos, user: UserId) {
        self.world.set_block_creator(pos, user);
    }
}

#[test]
fn test_replacement_writes_are_not_captured_again() {
    let (mut tracker, mut world) = setup();
    let passes = Rc::new(RefCell::new(0));
    {
        let passes = Rc::clone(&passes);
        world.listeners().on_change_block(Order::Late, move |event| {
            *passes.borrow_mut() += 1;
            for transaction in event.transactions_mut() {
                transaction.set_custom(COBBLE);
            }
        });
    }
    let mut host = CapturingHost { world };

    push_command(&mut tracker, 7);
    host.world
        .set_block(&mut tracker, at(0), STONE, BlockChange::Place)
        .unwrap();
    tracker.pop_phase(&mut host).expect("unwind should succeed");

    assert_eq!(*passes.borrow(), 1);
    assert_eq!(host.world.block_state(at(0)), COBBLE);
    assert!(!tracker.is_restoring());
    assert_eq!(tracker.depth(), 0);
}
