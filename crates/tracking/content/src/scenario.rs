//! Data-driven scenario definitions replayed by the sandbox host.
//!
//! A scenario seeds a world, installs physics rules and listener rules, then
//! runs a list of steps: pushing and popping phases and performing world
//! mutations the way game code would while a phase is active.

use tracking_core::{
    BlockChange, BlockId, BlockPos, BlockState, ChangeBucket, EntityKind, ItemDrop, PhaseState,
    WorldId,
};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ScenarioSpec {
    pub name: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub world: u32,
    #[cfg_attr(feature = "serde", serde(default))]
    pub blocks: Vec<BlockSpec>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub physics: Vec<PhysicsSpec>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub listeners: Vec<ListenerRule>,
    pub steps: Vec<StepSpec>,
}

impl ScenarioSpec {
    pub fn world_id(&self) -> WorldId {
        WorldId(self.world)
    }
}

/// A block present before the first step runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BlockSpec {
    pub pos: BlockPos,
    pub state: BlockState,
}

/// "When `trigger` is added, also place `place` at the given offset."
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PhysicsSpec {
    pub trigger: BlockId,
    pub offset: (i32, i32, i32),
    pub place: BlockState,
}

/// Listener behavior installed on the sandbox event bus.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ListenerRule {
    CancelBucket(ChangeBucket),
    CancelPost,
    CancelDrops,
    CancelSpawns,
    /// Replaces the final state of any change at `pos` with `state`.
    Replace { pos: BlockPos, state: BlockState },
}

/// Who or what starts a phase.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SourceSpec {
    Player(u64),
    Command(String),
    Plugin(String),
    Entity(u64),
    /// The block at `pos`, as currently stored in the world.
    Block(BlockPos),
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum StepSpec {
    Push {
        state: PhaseState,
        source: SourceSpec,
        #[cfg_attr(feature = "serde", serde(default))]
        notifier: Option<u64>,
        #[cfg_attr(feature = "serde", serde(default))]
        owner: Option<u64>,
        #[cfg_attr(feature = "serde", serde(default))]
        player_simulated: Option<u64>,
    },
    Pop,
    SetBlock {
        pos: BlockPos,
        state: BlockState,
        #[cfg_attr(feature = "serde", serde(default))]
        change: BlockChange,
    },
    BreakBlock {
        pos: BlockPos,
        #[cfg_attr(feature = "serde", serde(default))]
        drops: Vec<ItemDrop>,
    },
    SpawnEntity {
        pos: BlockPos,
        kind: EntityKind,
    },
}
