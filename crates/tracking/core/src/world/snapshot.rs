use super::{BlockPos, BlockState, ChangeFlag, UpdateFlags, WorldId};

/// The host's description of why a block is being changed.
///
/// The tag is recorded at capture time and travels with the original
/// snapshot into audit records. Bucket classification uses it only to
/// recognise decay; all other buckets are derived from the states.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, strum::Display, strum::AsRefStr,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case")]
pub enum BlockChange {
    Break,
    #[default]
    Modify,
    Place,
    Decay,
}

/// Immutable record of a block at one position, plus what is needed to
/// restore it.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BlockSnapshot {
    pub world: WorldId,
    pub pos: BlockPos,
    pub state: BlockState,
    pub change: BlockChange,
    pub change_flag: ChangeFlag,
    pub update_flags: UpdateFlags,
}

impl BlockSnapshot {
    pub const fn new(world: WorldId, pos: BlockPos, state: BlockState) -> Self {
        Self {
            world,
            pos,
            state,
            change: BlockChange::Modify,
            change_flag: ChangeFlag::ALL,
            update_flags: UpdateFlags::DEFAULT,
        }
    }

    #[must_use]
    pub const fn with_change(mut self, change: BlockChange) -> Self {
        self.change = change;
        self
    }

    #[must_use]
    pub const fn with_flags(mut self, change_flag: ChangeFlag, update_flags: UpdateFlags) -> Self {
        self.change_flag = change_flag;
        self.update_flags = update_flags;
        self
    }

    /// Same position and metadata, different state.
    #[must_use]
    pub fn with_state(&self, state: BlockState) -> Self {
        Self {
            state,
            ..self.clone()
        }
    }
}

/// A paired (original, final) snapshot of one block position.
///
/// `original` and `final` never change after creation. Listeners may mark a
/// transaction invalid or attach a custom replacement that is applied instead
/// of `final`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transaction {
    original: BlockSnapshot,
    final_: BlockSnapshot,
    custom: Option<BlockSnapshot>,
    valid: bool,
}

impl Transaction {
    pub fn new(original: BlockSnapshot, final_: BlockSnapshot) -> Self {
        Self {
            original,
            final_,
            custom: None,
            valid: true,
        }
    }

    pub fn pos(&self) -> BlockPos {
        self.original.pos
    }

    pub fn original(&self) -> &BlockSnapshot {
        &self.original
    }

    /// The snapshot the world should end up with: the custom replacement when
    /// one was set, otherwise the captured final state.
    pub fn final_snapshot(&self) -> &BlockSnapshot {
        self.custom.as_ref().unwrap_or(&self.final_)
    }

    /// The captured final state, ignoring any custom replacement.
    pub fn default_final(&self) -> &BlockSnapshot {
        &self.final_
    }

    pub fn custom(&self) -> Option<&BlockSnapshot> {
        self.custom.as_ref()
    }

    pub fn set_custom(&mut self, state: BlockState) {
        self.custom = Some(self.final_.with_state(state));
    }

    pub fn clear_custom(&mut self) {
        self.custom = None;
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn set_valid(&mut self, valid: bool) {
        self.valid = valid;
    }

    pub fn invalidate(&mut self) {
        self.valid = false;
    }

    /// True when applying the transaction would leave the block unchanged.
    pub fn is_no_op(&self) -> bool {
        self.custom.is_none() && self.original.state == self.final_.state
    }
}
