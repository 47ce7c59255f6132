//! Transaction processor: one drain pass over captured block changes.
//!
//! A pass classifies every captured snapshot into a [`ChangeBucket`], fires
//! one [`ChangeBlockEvent`] per non-empty bucket and one aggregate
//! [`ChangeBlockPostEvent`], restores whatever the listeners invalidated and
//! applies the rest. Any block change captured while applying is drained
//! depth-first before the next transaction is applied.
mod bucket;

pub use bucket::{BucketedTransactions, ChangeBucket};

use tracing::{debug, trace, warn};

use crate::capture::DropBuffers;
use crate::cause::{Cause, CauseValue, NamedCauses, SpawnType};
use crate::error::TrackingError;
use crate::event::{Cancellable, ChangeBlockEvent, ChangeBlockPostEvent, DropKind};
use crate::phase::PhaseState;
use crate::spawn::{self, Attribution};
use crate::tracker::CauseTracker;
use crate::world::{
    AuditEntry, BlockPos, BlockSnapshot, BlockState, ChangeFlag, TrackerHost, Transaction,
};

/// Drains `snapshots` captured by `state`.
///
/// `drops` holds the per-position drops captured alongside the snapshots;
/// entries for applied positions are spawned, entries for restored positions
/// are cleared when `state` tracks block-specific drops.
pub(crate) fn drain_block_changes<H: TrackerHost + ?Sized>(
    tracker: &mut CauseTracker,
    host: &mut H,
    state: PhaseState,
    causes: &NamedCauses,
    snapshots: Vec<BlockSnapshot>,
    drops: &mut DropBuffers,
) -> Result<(), TrackingError> {
    if snapshots.is_empty() {
        return Ok(());
    }
    let depth = tracker.enter_drain(state)?;
    trace!(
        target: "tracking::drain",
        state = %state,
        depth,
        snapshots = snapshots.len(),
        "draining captured block changes"
    );
    let result = drain_pass(tracker, host, state, causes, snapshots, drops);
    tracker.exit_drain();
    result
}

fn drain_pass<H: TrackerHost + ?Sized>(
    tracker: &mut CauseTracker,
    host: &mut H,
    state: PhaseState,
    causes: &NamedCauses,
    snapshots: Vec<BlockSnapshot>,
    drops: &mut DropBuffers,
) -> Result<(), TrackingError> {
    let cause = state.block_cause(causes)?;
    let mut batch = BucketedTransactions::group(snapshots.into_iter().map(|original| {
        let final_state = host.block_state(original.pos);
        let bucket = ChangeBucket::classify(&original, final_state);
        let final_ = original.with_state(final_state);
        (bucket, Transaction::new(original, final_))
    }));

    fire_change_events(host, &cause, &mut batch);

    let transactions = batch.transactions();
    restore_invalid(tracker, host, state, transactions, drops)?;

    for transaction in transactions.iter().filter(|tx| tx.is_valid()) {
        apply_transaction(tracker, host, state, causes, &cause, transaction, drops)?;
    }
    Ok(())
}

/// Fires bucket events then the aggregate event and records the outcome on
/// the transactions themselves.
fn fire_change_events<H: TrackerHost + ?Sized>(
    host: &mut H,
    cause: &Cause,
    batch: &mut BucketedTransactions,
) {
    let buckets: Vec<_> = batch.buckets().collect();
    let mut cancelled = Vec::new();
    for (bucket, range) in buckets {
        let mut event = ChangeBlockEvent::new(bucket, cause, &mut batch.transactions_mut()[range.clone()]);
        host.post_change_block(&mut event);
        if event.is_cancelled() {
            debug!(target: "tracking::drain", bucket = %bucket, transactions = range.len(), "bucket cancelled");
            cancelled.push(range);
        }
    }

    let mut post = ChangeBlockPostEvent::new(cause, batch.transactions_mut());
    host.post_change_block_post(&mut post);
    let post_cancelled = post.is_cancelled();

    let transactions = batch.transactions_mut();
    for range in cancelled {
        for transaction in transactions[range].iter_mut().rev() {
            transaction.invalidate();
        }
    }
    if post_cancelled {
        debug!(target: "tracking::drain", transactions = transactions.len(), "aggregate change cancelled");
        for transaction in transactions.iter_mut().rev() {
            transaction.invalidate();
        }
    }
}

/// Restores invalid transactions, latest first.
fn restore_invalid<H: TrackerHost + ?Sized>(
    tracker: &mut CauseTracker,
    host: &mut H,
    state: PhaseState,
    transactions: &[Transaction],
    drops: &mut DropBuffers,
) -> Result<(), TrackingError> {
    let invalid: Vec<&Transaction> = transactions.iter().filter(|tx| !tx.is_valid()).collect();
    for transaction in invalid.into_iter().rev() {
        let original = transaction.original();
        trace!(
            target: "tracking::drain",
            pos = %original.pos,
            state = %original.state,
            "restoring original block"
        );
        write_restoring(tracker, host, original.pos, original.state, ChangeFlag::NONE)?;
        if state.tracks_block_specific_drops() {
            drops.clear_position(original.pos);
        }
    }
    Ok(())
}

/// Issues a tracker-owned write with block capture suspended.
fn write_restoring<H: TrackerHost + ?Sized>(
    tracker: &mut CauseTracker,
    host: &mut H,
    pos: BlockPos,
    state: BlockState,
    flag: ChangeFlag,
) -> Result<(), TrackingError> {
    let previous = tracker.begin_restoring();
    let result = host.write_block(tracker, pos, state, flag);
    tracker.end_restoring(previous);
    result
}

fn apply_transaction<H: TrackerHost + ?Sized>(
    tracker: &mut CauseTracker,
    host: &mut H,
    state: PhaseState,
    causes: &NamedCauses,
    cause: &Cause,
    transaction: &Transaction,
    drops: &mut DropBuffers,
) -> Result<(), TrackingError> {
    let original = transaction.original();
    let replacement = transaction.final_snapshot();
    let pos = original.pos;

    if let Some(custom) = transaction.custom() {
        write_restoring(tracker, host, pos, custom.state, ChangeFlag::ALL)?;
    }

    spawn_block_drops(tracker, host, original, causes, drops)?;

    if tracker.config().audit_block_changes {
        host.record_block_change(&AuditEntry {
            world: original.world,
            pos,
            change: original.change,
            original: original.state,
            replacement: replacement.state,
            cause,
        });
    }

    let change_flag = original.change_flag;
    if change_flag.performs_physics()
        && original.state.block != replacement.state.block
        && !host.has_block_entity(&replacement.state)
    {
        host.on_block_added(tracker, pos, replacement.state)?;
        drain_reentrant(tracker, host, state, causes)?;
    }

    if !replacement.state.is_air() {
        if let Some(user) = state.block_creator(causes) {
            host.set_block_creator(pos, user);
        }
    }

    let update_flags = original.update_flags;
    if update_flags.notifies_clients() {
        host.notify_block_update(pos, original.state, replacement.state, update_flags);
    }
    if change_flag.updates_neighbors() {
        host.notify_neighbors(tracker, pos, original.state, replacement.state, update_flags)?;
    }

    drain_reentrant(tracker, host, state, causes)
}

/// Spawns the drops captured for `original.pos`, attributed to the block.
fn spawn_block_drops<H: TrackerHost + ?Sized>(
    tracker: &mut CauseTracker,
    host: &mut H,
    original: &BlockSnapshot,
    causes: &NamedCauses,
    drops: &mut DropBuffers,
) -> Result<(), TrackingError> {
    let pos = original.pos;
    let mut items: Vec<_> = drops
        .block_drops
        .take_key(&pos)
        .iter()
        .map(|drop| host.create_item_entity(pos, drop))
        .collect();
    items.extend(drops.block_item_drops.take_key(&pos));
    if items.is_empty() {
        return Ok(());
    }

    let cause = Cause::builder(CauseValue::BlockSpawn {
        block: original.clone(),
        spawn_type: SpawnType::BlockSpawning,
    })
    .attribution(causes.notifier(), causes.owner())
    .build();
    spawn::drop_items(
        tracker,
        host,
        DropKind::Destruct,
        &cause,
        items,
        Attribution::from_causes(causes),
    )?;
    Ok(())
}

/// Drains block changes captured into the current phase while a transaction
/// was being applied, before the caller moves on.
fn drain_reentrant<H: TrackerHost + ?Sized>(
    tracker: &mut CauseTracker,
    host: &mut H,
    state: PhaseState,
    causes: &NamedCauses,
) -> Result<(), TrackingError> {
    let buffers = tracker.current_context_mut().buffers_mut();
    let mut snapshots = Vec::new();
    buffers
        .blocks
        .if_present_and_not_empty(|captured| snapshots = std::mem::take(captured));
    if snapshots.is_empty() {
        return Ok(());
    }
    let mut drops = buffers.drops.take();
    drain_block_changes(tracker, host, state, causes, snapshots, &mut drops)?;
    discard_leftover_drops(state, &mut drops);
    Ok(())
}

/// Drops with no surviving transaction at their position are discarded.
pub(crate) fn discard_leftover_drops(state: PhaseState, drops: &mut DropBuffers) {
    let leftover = drops.take();
    if !leftover.is_empty() {
        warn!(
            target: "tracking::drain",
            state = %state,
            block_drops = leftover.block_drops.len(),
            block_item_drops = leftover.block_item_drops.len(),
            "discarding drops without a matching block change"
        );
    }
}
