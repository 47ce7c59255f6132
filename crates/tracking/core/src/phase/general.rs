//! General phase: commands, explosions, the base phase and the synthetic
//! unwinding phase.

use tracing::{debug, error};

use crate::capture::CaptureBuffers;
use crate::cause::NamedCauses;
use crate::error::TrackingError;
use crate::spawn::{self, Attribution};
use crate::tracker::CauseTracker;
use crate::transaction;
use crate::world::{EntitySnapshot, TrackerHost};

use super::{PhaseCapabilities, PhaseState, TrackingPhase};

pub(super) fn capabilities(state: PhaseState) -> PhaseCapabilities {
    let base = TrackingPhase::General.default_capabilities();
    match state {
        PhaseState::Command => {
            base | PhaseCapabilities::IGNORES_ITEM_PRE_MERGING
                | PhaseCapabilities::CAPTURES_BLOCK_DROPS
                | PhaseCapabilities::ASSOCIATES_NEIGHBOR_NOTIFIER
        }
        PhaseState::Explosion => base | PhaseCapabilities::CAPTURES_BLOCK_DROPS,
        PhaseState::Complete => PhaseCapabilities::IGNORES_ITEM_PRE_MERGING,
        PhaseState::Unwinding => {
            base | PhaseCapabilities::IGNORES_ITEM_PRE_MERGING
                | PhaseCapabilities::ASSOCIATES_NEIGHBOR_NOTIFIER
                | PhaseCapabilities::UNWINDING_ONLY
        }
        PhaseState::Dispense | PhaseState::FakePlayer => base,
    }
}

pub(super) fn unwind<H: TrackerHost + ?Sized>(
    state: PhaseState,
    tracker: &mut CauseTracker,
    host: &mut H,
    causes: &NamedCauses,
    mut buffers: CaptureBuffers,
) -> Result<(), TrackingError> {
    if !state.requires_post() {
        return Ok(());
    }
    let snapshots = buffers.blocks.take();
    transaction::drain_block_changes(tracker, host, state, causes, snapshots, &mut buffers.drops)?;
    spawn_captured(
        state,
        tracker,
        host,
        causes,
        buffers.entities.take(),
        buffers.items.take(),
    )?;
    transaction::discard_leftover_drops(state, &mut buffers.drops);
    Ok(())
}

/// Fires spawn events for captured entities, then drop events for captured
/// items, spawning whatever survives.
pub(super) fn spawn_captured<H: TrackerHost + ?Sized>(
    state: PhaseState,
    tracker: &mut CauseTracker,
    host: &mut H,
    causes: &NamedCauses,
    entities: Vec<EntitySnapshot>,
    items: Vec<EntitySnapshot>,
) -> Result<(), TrackingError> {
    if entities.is_empty() && items.is_empty() {
        return Ok(());
    }
    let cause = state.spawn_cause(causes)?;
    let attribution = Attribution::from_causes(causes);
    if !entities.is_empty() {
        spawn::spawn_entities(tracker, host, &cause, entities, attribution)?;
    }
    if !items.is_empty() {
        spawn::drop_items(tracker, host, state.drop_kind(), &cause, items, attribution)?;
    }
    Ok(())
}

/// Drains whatever was captured into the post phase while `state` was being
/// unwound, repeating until a round captures nothing new.
pub(crate) fn post_dispatch<H: TrackerHost + ?Sized>(
    tracker: &mut CauseTracker,
    host: &mut H,
    state: PhaseState,
    causes: &NamedCauses,
) -> Result<(), TrackingError> {
    let limit = tracker.config().max_drain_depth;
    let mut round = 0;
    loop {
        let mut captured = tracker.current_context_mut().take_buffers();
        if captured.is_drained() {
            transaction::discard_leftover_drops(state, &mut captured.drops);
            return Ok(());
        }

        round += 1;
        if round > limit {
            error!(
                target: "tracking::phase",
                state = %state,
                rounds = round,
                "post dispatch keeps capturing new mutations"
            );
            return Err(TrackingError::DrainTooDeep {
                state,
                depth: round,
            });
        }

        debug!(
            target: "tracking::phase",
            state = %state,
            round,
            blocks = captured.blocks.len(),
            entities = captured.entities.len(),
            items = captured.items.len(),
            "post dispatch round"
        );

        let snapshots = captured.blocks.take();
        transaction::drain_block_changes(tracker, host, state, causes, snapshots, &mut captured.drops)?;
        spawn_captured(
            state,
            tracker,
            host,
            causes,
            captured.entities.take(),
            captured.items.take(),
        )?;
        transaction::discard_leftover_drops(state, &mut captured.drops);
    }
}
