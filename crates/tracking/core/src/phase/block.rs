//! Block phase: actions a block performs on its own, such as dispensing.

use crate::capture::CaptureBuffers;
use crate::cause::{Cause, CauseValue, NamedCauses, SpawnType};
use crate::error::TrackingError;
use crate::event::DropKind;
use crate::spawn::{self, Attribution};
use crate::tracker::CauseTracker;
use crate::transaction;
use crate::world::{BlockSnapshot, TrackerHost};

use super::{PhaseCapabilities, PhaseState, TrackingPhase};

pub(super) fn capabilities(_state: PhaseState) -> PhaseCapabilities {
    TrackingPhase::Block.default_capabilities()
}

fn dispensing_block(state: PhaseState, causes: &NamedCauses) -> Result<&BlockSnapshot, TrackingError> {
    match causes.source() {
        Some(CauseValue::Block(block)) => Ok(block),
        _ => Err(TrackingError::missing_context(
            state,
            "Could not find a block dispensing items!",
            causes,
        )),
    }
}

/// Everything a dispenser spawns is attributed to the block itself.
pub(super) fn spawn_cause(state: PhaseState, causes: &NamedCauses) -> Result<Cause, TrackingError> {
    let block = dispensing_block(state, causes)?;
    Ok(Cause::builder(CauseValue::BlockSpawn {
        block: block.clone(),
        spawn_type: SpawnType::Dispense,
    })
    .attribution(causes.notifier(), causes.owner())
    .build())
}

pub(super) fn unwind<H: TrackerHost + ?Sized>(
    state: PhaseState,
    tracker: &mut CauseTracker,
    host: &mut H,
    causes: &NamedCauses,
    mut buffers: CaptureBuffers,
) -> Result<(), TrackingError> {
    let cause = spawn_cause(state, causes)?;

    let snapshots = buffers.blocks.take();
    transaction::drain_block_changes(tracker, host, state, causes, snapshots, &mut buffers.drops)?;

    let attribution = Attribution::from_causes(causes);
    let items = buffers.items.take();
    if !items.is_empty() {
        spawn::drop_items(tracker, host, DropKind::Dispense, &cause, items, Attribution::NONE)?;
    }
    let entities = buffers.entities.take();
    if !entities.is_empty() {
        spawn::spawn_entities(tracker, host, &cause, entities, attribution)?;
    }
    transaction::discard_leftover_drops(state, &mut buffers.drops);
    Ok(())
}
