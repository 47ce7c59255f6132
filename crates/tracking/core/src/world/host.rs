//! Traits the host game implements so the tracker can drive it.
//!
//! Read access lives in [`BlockWorld`], event firing in [`EventSink`],
//! audit logging in [`AuditSink`]. Operations that can re-enter the tracker
//! (anything that may capture new mutations) live in [`TrackerHost`] and
//! receive the tracker explicitly, so host integrations call the capture
//! hooks directly instead of relying on hidden global state.
use tracing::info;

use crate::cause::{Cause, CauseValue};
use crate::error::TrackingError;
use crate::event::EventSink;
use crate::tracker::CauseTracker;

use super::{
    BlockChange, BlockPos, BlockState, ChangeFlag, EntitySnapshot, ItemDrop, UpdateFlags, UserId,
    WorldId,
};

/// Read-only view of the simulated world.
pub trait BlockWorld {
    /// Current state at `pos`. Unloaded or empty positions read as air.
    fn block_state(&self, pos: BlockPos) -> BlockState;

    /// Whether `state` carries block-entity behavior that runs its own setup
    /// later. Physics (`on_block_added`) is skipped for such blocks.
    fn has_block_entity(&self, _state: &BlockState) -> bool {
        false
    }
}

/// One applied block change, as handed to the audit sink.
#[derive(Clone, Debug)]
pub struct AuditEntry<'a> {
    pub world: WorldId,
    pub pos: BlockPos,
    pub change: BlockChange,
    pub original: BlockState,
    pub replacement: BlockState,
    pub cause: &'a Cause,
}

/// Fire-and-forget sink for applied changes.
pub trait AuditSink {
    fn record_block_change(&mut self, entry: &AuditEntry<'_>);
}

/// Full host surface needed to unwind phases.
///
/// Every method that may cause further world mutation receives the tracker so
/// the host can route those mutations through the capture hooks.
pub trait TrackerHost: BlockWorld + EventSink + AuditSink {
    /// Writes `state` at `pos`.
    ///
    /// With [`ChangeFlag::NONE`] this must be a raw write: no physics, no
    /// notifications, no capture. Other flags may behave like a regular game
    /// write. The tracker only calls this while
    /// [`is_restoring`](CauseTracker::is_restoring) holds, so capture
    /// attempts made through `tracker` report `Ok(false)`.
    fn write_block(
        &mut self,
        tracker: &mut CauseTracker,
        pos: BlockPos,
        state: BlockState,
        flag: ChangeFlag,
    ) -> Result<(), TrackingError>;

    /// Block physics for a newly placed block.
    fn on_block_added(
        &mut self,
        _tracker: &mut CauseTracker,
        _pos: BlockPos,
        _state: BlockState,
    ) -> Result<(), TrackingError> {
        Ok(())
    }

    /// Tells observers that the block at `pos` changed.
    fn notify_block_update(
        &mut self,
        _pos: BlockPos,
        _old: BlockState,
        _new: BlockState,
        _flags: UpdateFlags,
    ) {
    }

    /// Propagates a change to the neighbors of `pos`.
    fn notify_neighbors(
        &mut self,
        _tracker: &mut CauseTracker,
        _pos: BlockPos,
        _old: BlockState,
        _new: BlockState,
        _flags: UpdateFlags,
    ) -> Result<(), TrackingError> {
        Ok(())
    }

    /// Materializes a buffered block drop as an item entity (not yet spawned).
    fn create_item_entity(&mut self, pos: BlockPos, drop: &ItemDrop) -> EntitySnapshot;

    /// Spawns `entity` into the world, bypassing capture.
    fn spawn_entity(
        &mut self,
        tracker: &mut CauseTracker,
        entity: EntitySnapshot,
    ) -> Result<(), TrackingError>;

    /// Credits `user` for the block now at `pos`.
    fn set_block_creator(&mut self, _pos: BlockPos, _user: UserId) {}
}

/// [`AuditSink`] that emits one structured `tracing` record per change.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record_block_change(&mut self, entry: &AuditEntry<'_>) {
        let source = entry.cause.source().map(CauseValue::label);
        info!(
            target: "tracking::audit",
            world = %entry.world,
            pos = %entry.pos,
            change = %entry.change,
            original = %entry.original,
            replacement = %entry.replacement,
            source = source.as_deref().unwrap_or("unknown"),
            notifier = ?entry.cause.notifier(),
            "block change applied"
        );
    }
}
