//! Phase states, their capture policies and unwind dispatch.
//!
//! Each [`PhaseState`] belongs to one [`TrackingPhase`]. The group supplies
//! the shared default policy and the unwind procedure; individual states
//! adjust the policy through [`PhaseCapabilities`]. Dispatch is a plain
//! `match` on the group, so adding a state means adding a variant and its
//! row in the owning group module.
mod block;
mod context;
mod general;
mod plugin;

pub use context::{PhaseContext, PhaseContextBuilder, PhaseData, UnwindingFrame};
pub(crate) use general::post_dispatch;

use bitflags::bitflags;

use crate::capture::{CaptureBuffers, CaptureKinds};
use crate::cause::{Cause, CauseKey, CauseValue, NamedCauses, SpawnType};
use crate::error::TrackingError;
use crate::event::DropKind;
use crate::tracker::CauseTracker;
use crate::world::{TrackerHost, UserId};

bitflags! {
    /// Policy bits a phase state answers to host integration points.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct PhaseCapabilities: u16 {
        /// Block changes are captured instead of applied immediately.
        const REQUIRES_BLOCK_CAPTURING     = 1 << 0;
        const IGNORES_ITEM_PRE_MERGING     = 1 << 1;
        /// Drops are buffered per block position and tied to the change
        /// that produced them.
        const CAPTURES_BLOCK_DROPS         = 1 << 2;
        const ASSOCIATES_NEIGHBOR_NOTIFIER = 1 << 3;
        const IGNORES_SCHEDULED_UPDATES    = 1 << 4;
        const IGNORES_BLOCK_UPDATE_TICK    = 1 << 5;
        const IGNORES_BLOCK_EVENT          = 1 << 6;
        const CAPTURING_ENTITY_SPAWNS      = 1 << 7;
        const CAPTURING_ENTITY_TICKS       = 1 << 8;
        const CAPTURING_TILE_TICKS         = 1 << 9;
        const CAPTURING_ITEM_SPAWNS        = 1 << 10;
        /// Entity and item spawns are captured instead of applied.
        const CAPTURES_ENTITY_SPAWNS       = 1 << 11;
    }
}

impl PhaseCapabilities {
    /// Bits only the synthetic unwinding state carries.
    pub const UNWINDING_ONLY: Self = Self::IGNORES_SCHEDULED_UPDATES
        .union(Self::IGNORES_BLOCK_UPDATE_TICK)
        .union(Self::IGNORES_BLOCK_EVENT)
        .union(Self::CAPTURING_ENTITY_SPAWNS)
        .union(Self::CAPTURING_ENTITY_TICKS)
        .union(Self::CAPTURING_TILE_TICKS)
        .union(Self::CAPTURING_ITEM_SPAWNS);
}

/// Group of related phase states sharing default policy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display, strum::EnumIter)]
pub enum TrackingPhase {
    General,
    Block,
    Plugin,
}

impl TrackingPhase {
    /// Policy every state of the group starts from.
    pub const fn default_capabilities(self) -> PhaseCapabilities {
        PhaseCapabilities::REQUIRES_BLOCK_CAPTURING.union(PhaseCapabilities::CAPTURES_ENTITY_SPAWNS)
    }
}

/// Kind of game operation a phase wraps.
///
/// States are plain values compared by variant; they carry no data.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display, strum::EnumIter)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PhaseState {
    Command,
    Explosion,
    /// Base no-op phase; nothing is captured.
    Complete,
    /// Synthetic post phase entered while a popped phase is replayed.
    Unwinding,
    Dispense,
    FakePlayer,
}

impl PhaseState {
    pub const fn phase(self) -> TrackingPhase {
        match self {
            Self::Command | Self::Explosion | Self::Complete | Self::Unwinding => {
                TrackingPhase::General
            }
            Self::Dispense => TrackingPhase::Block,
            Self::FakePlayer => TrackingPhase::Plugin,
        }
    }

    pub fn capabilities(self) -> PhaseCapabilities {
        match self.phase() {
            TrackingPhase::General => general::capabilities(self),
            TrackingPhase::Block => block::capabilities(self),
            TrackingPhase::Plugin => plugin::capabilities(self),
        }
    }

    fn has(self, capability: PhaseCapabilities) -> bool {
        self.capabilities().contains(capability)
    }

    pub fn requires_block_capturing(self) -> bool {
        self.has(PhaseCapabilities::REQUIRES_BLOCK_CAPTURING)
    }

    pub fn ignores_item_pre_merging(self) -> bool {
        self.has(PhaseCapabilities::IGNORES_ITEM_PRE_MERGING)
    }

    pub fn tracks_block_specific_drops(self) -> bool {
        self.has(PhaseCapabilities::CAPTURES_BLOCK_DROPS)
    }

    pub fn associates_neighbor_notifier(self) -> bool {
        self.has(PhaseCapabilities::ASSOCIATES_NEIGHBOR_NOTIFIER)
    }

    pub fn ignores_scheduled_updates(self) -> bool {
        self.has(PhaseCapabilities::IGNORES_SCHEDULED_UPDATES)
    }

    pub fn ignores_block_update_tick(self) -> bool {
        self.has(PhaseCapabilities::IGNORES_BLOCK_UPDATE_TICK)
    }

    pub fn ignores_block_event(self) -> bool {
        self.has(PhaseCapabilities::IGNORES_BLOCK_EVENT)
    }

    pub fn already_capturing_entity_spawns(self) -> bool {
        self.has(PhaseCapabilities::CAPTURING_ENTITY_SPAWNS)
    }

    pub fn already_capturing_entity_ticks(self) -> bool {
        self.has(PhaseCapabilities::CAPTURING_ENTITY_TICKS)
    }

    pub fn already_capturing_tile_ticks(self) -> bool {
        self.has(PhaseCapabilities::CAPTURING_TILE_TICKS)
    }

    pub fn already_capturing_item_spawns(self) -> bool {
        self.has(PhaseCapabilities::CAPTURING_ITEM_SPAWNS)
    }

    pub fn captures_entity_spawns(self) -> bool {
        self.has(PhaseCapabilities::CAPTURES_ENTITY_SPAWNS)
    }

    /// Whether popping this state replays captures under a post phase.
    pub const fn requires_post(self) -> bool {
        !matches!(self, Self::Complete | Self::Unwinding)
    }

    /// Buffers a context for this state normally enables.
    pub fn default_captures(self) -> CaptureKinds {
        let mut kinds = CaptureKinds::empty();
        if self.requires_block_capturing() {
            kinds |= CaptureKinds::BLOCKS;
        }
        if self.tracks_block_specific_drops() {
            kinds |= CaptureKinds::BLOCK_DROPS | CaptureKinds::BLOCK_ITEM_DROPS;
        }
        if self.captures_entity_spawns() {
            kinds |= CaptureKinds::ENTITY_CAPTURES;
        }
        kinds
    }

    pub const fn spawn_type(self) -> SpawnType {
        match self {
            Self::Command => SpawnType::Command,
            Self::Explosion => SpawnType::Explosion,
            Self::Dispense => SpawnType::Dispense,
            Self::FakePlayer => SpawnType::Plugin,
            Self::Complete | Self::Unwinding => SpawnType::Custom,
        }
    }

    /// Kind reported on drop events for items captured by this state.
    pub const fn drop_kind(self) -> DropKind {
        match self {
            Self::Dispense => DropKind::Dispense,
            _ => DropKind::Custom,
        }
    }

    /// Cause chain attached to block change events of this state.
    pub fn block_cause(self, causes: &NamedCauses) -> Result<Cause, TrackingError> {
        match self.phase() {
            TrackingPhase::Plugin => plugin::block_cause(self, causes),
            TrackingPhase::General | TrackingPhase::Block => base_cause(self, causes),
        }
    }

    /// Cause chain attached to spawn and drop events of this state.
    pub fn spawn_cause(self, causes: &NamedCauses) -> Result<Cause, TrackingError> {
        match self.phase() {
            TrackingPhase::Block => block::spawn_cause(self, causes),
            TrackingPhase::General => Ok(self.typed_spawn_cause(required_source(self, causes)?, causes)),
            TrackingPhase::Plugin => Ok(self.typed_spawn_cause(plugin::source(self, causes)?, causes)),
        }
    }

    fn typed_spawn_cause(self, source: &CauseValue, causes: &NamedCauses) -> Cause {
        Cause::builder(source.clone())
            .named(CauseKey::SpawnType, CauseValue::SpawnType(self.spawn_type()))
            .attribution(causes.notifier(), causes.owner())
            .build()
    }

    /// User credited for blocks this state places.
    pub fn block_creator(self, causes: &NamedCauses) -> Option<UserId> {
        match self {
            Self::Command => causes
                .source()
                .and_then(CauseValue::user)
                .or_else(|| causes.notifier()),
            Self::FakePlayer => causes
                .first_named(CauseKey::PlayerSimulated)
                .and_then(CauseValue::user),
            _ => None,
        }
    }

    /// Replays the captures of a popped phase.
    pub(crate) fn unwind<H: TrackerHost + ?Sized>(
        self,
        tracker: &mut CauseTracker,
        host: &mut H,
        causes: &NamedCauses,
        buffers: CaptureBuffers,
    ) -> Result<(), TrackingError> {
        match self.phase() {
            TrackingPhase::General => general::unwind(self, tracker, host, causes, buffers),
            TrackingPhase::Block => block::unwind(self, tracker, host, causes, buffers),
            TrackingPhase::Plugin => plugin::unwind(self, tracker, host, causes, buffers),
        }
    }
}

fn required_source(state: PhaseState, causes: &NamedCauses) -> Result<&CauseValue, TrackingError> {
    causes
        .source()
        .ok_or_else(|| TrackingError::missing_context(state, "phase context has no source", causes))
}

fn base_cause(state: PhaseState, causes: &NamedCauses) -> Result<Cause, TrackingError> {
    let source = required_source(state, causes)?;
    Ok(Cause::builder(source.clone())
        .attribution(causes.notifier(), causes.owner())
        .build())
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn item_pre_merging_is_ignored_by_command_complete_and_unwinding() {
        let ignoring: Vec<PhaseState> = PhaseState::iter()
            .filter(|state| state.ignores_item_pre_merging())
            .collect();
        assert_eq!(
            ignoring,
            vec![PhaseState::Command, PhaseState::Complete, PhaseState::Unwinding]
        );
    }

    #[test]
    fn only_complete_skips_block_capturing() {
        for state in PhaseState::iter() {
            assert_eq!(
                state.requires_block_capturing(),
                state != PhaseState::Complete,
                "{state}"
            );
        }
    }

    #[test]
    fn unwinding_only_policies_belong_to_unwinding() {
        for state in PhaseState::iter() {
            let expected = state == PhaseState::Unwinding;
            assert_eq!(state.ignores_scheduled_updates(), expected, "{state}");
            assert_eq!(state.ignores_block_update_tick(), expected, "{state}");
            assert_eq!(state.ignores_block_event(), expected, "{state}");
            assert_eq!(state.already_capturing_entity_spawns(), expected, "{state}");
            assert_eq!(state.already_capturing_entity_ticks(), expected, "{state}");
            assert_eq!(state.already_capturing_tile_ticks(), expected, "{state}");
            assert_eq!(state.already_capturing_item_spawns(), expected, "{state}");
        }
    }

    #[test]
    fn block_drops_are_tracked_by_destructive_states() {
        let tracking: Vec<PhaseState> = PhaseState::iter()
            .filter(|state| state.tracks_block_specific_drops())
            .collect();
        assert_eq!(
            tracking,
            vec![PhaseState::Command, PhaseState::Explosion, PhaseState::FakePlayer]
        );
    }

    #[test]
    fn complete_enables_no_buffers() {
        assert!(PhaseState::Complete.default_captures().is_empty());
        assert!(!PhaseState::Complete.requires_post());
        assert_eq!(
            PhaseState::Command.default_captures(),
            CaptureKinds::BLOCK_CAPTURES | CaptureKinds::ENTITY_CAPTURES
        );
        assert_eq!(
            PhaseState::Dispense.default_captures(),
            CaptureKinds::BLOCKS | CaptureKinds::ENTITY_CAPTURES
        );
    }

    #[test]
    fn states_map_to_their_groups() {
        assert_eq!(PhaseState::Unwinding.phase(), TrackingPhase::General);
        assert_eq!(PhaseState::Dispense.phase(), TrackingPhase::Block);
        assert_eq!(PhaseState::FakePlayer.phase(), TrackingPhase::Plugin);
    }

    #[test]
    fn command_credits_player_source() {
        let mut causes = NamedCauses::new();
        causes.insert_once(CauseKey::Source, CauseValue::Player(UserId(4)));
        assert_eq!(PhaseState::Command.block_creator(&causes), Some(UserId(4)));
        assert_eq!(PhaseState::Explosion.block_creator(&causes), None);
    }

    #[test]
    fn block_cause_requires_a_source() {
        let error = PhaseState::Explosion
            .block_cause(&NamedCauses::new())
            .unwrap_err();
        assert!(matches!(
            error,
            TrackingError::MissingContext {
                state: PhaseState::Explosion,
                ..
            }
        ));
    }
}
