//! Plugin phase: actions performed by a plugin on behalf of a simulated
//! player.

use crate::capture::CaptureBuffers;
use crate::cause::{Cause, CauseKey, CauseValue, NamedCauses};
use crate::error::TrackingError;
use crate::tracker::CauseTracker;
use crate::world::TrackerHost;

use super::{PhaseCapabilities, PhaseState, TrackingPhase, general};

pub(super) fn capabilities(state: PhaseState) -> PhaseCapabilities {
    let base = TrackingPhase::Plugin.default_capabilities();
    match state {
        PhaseState::FakePlayer => base | PhaseCapabilities::CAPTURES_BLOCK_DROPS,
        _ => base,
    }
}

fn simulated_player(state: PhaseState, causes: &NamedCauses) -> Result<&CauseValue, TrackingError> {
    causes.first_named(CauseKey::PlayerSimulated).ok_or_else(|| {
        TrackingError::missing_context(state, "Player simulator not found in cause", causes)
    })
}

/// The plugin source, or the simulated player when the plugin named none.
pub(super) fn source(state: PhaseState, causes: &NamedCauses) -> Result<&CauseValue, TrackingError> {
    match causes.source() {
        Some(source) => Ok(source),
        None => simulated_player(state, causes),
    }
}

/// Block changes name the simulated player alongside the plugin source.
pub(super) fn block_cause(state: PhaseState, causes: &NamedCauses) -> Result<Cause, TrackingError> {
    let player = simulated_player(state, causes)?.clone();
    let source = source(state, causes)?;
    Ok(Cause::builder(source.clone())
        .named(CauseKey::PlayerSimulated, player)
        .attribution(causes.notifier(), causes.owner())
        .build())
}

pub(super) fn unwind<H: TrackerHost + ?Sized>(
    state: PhaseState,
    tracker: &mut CauseTracker,
    host: &mut H,
    causes: &NamedCauses,
    buffers: CaptureBuffers,
) -> Result<(), TrackingError> {
    simulated_player(state, causes)?;
    general::unwind(state, tracker, host, causes, buffers)
}
