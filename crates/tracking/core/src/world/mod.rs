//! Host-facing world vocabulary.
//!
//! The tracker never owns world data. It reads and writes through the traits
//! in [`host`] and moves the small value types defined here between capture
//! buffers, events, and the host.
mod flags;
pub mod host;
mod snapshot;

pub use flags::{ChangeFlag, UpdateFlags};
pub use host::{AuditEntry, AuditSink, BlockWorld, TrackerHost, TracingAuditSink};
pub use snapshot::{BlockChange, BlockSnapshot, Transaction};

use core::fmt;

/// Identifies one simulated world. Each world owns its own tracker.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WorldId(pub u32);

impl fmt::Display for WorldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "world#{}", self.0)
    }
}

/// Integer block coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPos {
    pub const ORIGIN: Self = Self::new(0, 0, 0);

    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Offsets each axis, clamping at the `i32` range.
    #[must_use]
    pub const fn offset(self, dx: i32, dy: i32, dz: i32) -> Self {
        Self::new(
            self.x.saturating_add(dx),
            self.y.saturating_add(dy),
            self.z.saturating_add(dz),
        )
    }

    #[must_use]
    pub const fn up(self) -> Self {
        self.offset(0, 1, 0)
    }

    #[must_use]
    pub const fn down(self) -> Self {
        self.offset(0, -1, 0)
    }

    /// The six face-adjacent positions, in a fixed order.
    pub const fn neighbors(self) -> [Self; 6] {
        [
            self.offset(-1, 0, 0),
            self.offset(1, 0, 0),
            self.offset(0, -1, 0),
            self.offset(0, 1, 0),
            self.offset(0, 0, -1),
            self.offset(0, 0, 1),
        ]
    }
}

impl fmt::Display for BlockPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// Block type identifier. `0` is reserved for air.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BlockId(pub u32);

impl BlockId {
    pub const AIR: Self = Self(0);
}

/// A block type plus its variant data.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BlockState {
    pub block: BlockId,
    pub data: u16,
}

impl BlockState {
    pub const AIR: Self = Self::of(BlockId::AIR);

    pub const fn new(block: BlockId, data: u16) -> Self {
        Self { block, data }
    }

    pub const fn of(block: BlockId) -> Self {
        Self::new(block, 0)
    }

    pub const fn is_air(&self) -> bool {
        self.block.0 == BlockId::AIR.0
    }
}

impl fmt::Display for BlockState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.block.0, self.data)
    }
}

/// A player or offline user that can be credited for a change.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UserId(pub u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "user#{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EntityId(pub u64);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "entity#{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ItemId(pub u32);

/// An item a block produced when it was broken or interacted with.
///
/// Drops are buffered per source position and only become entities once the
/// block change that produced them survives its events.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ItemDrop {
    pub item: ItemId,
    pub count: u16,
}

impl ItemDrop {
    pub const fn new(item: ItemId, count: u16) -> Self {
        Self { item, count }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EntityKind {
    Item { item: ItemId, count: u16 },
    Creature(u32),
    Projectile(u32),
}

/// A not-yet-spawned (or just-spawned) entity as seen by the tracker.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EntitySnapshot {
    pub id: EntityId,
    pub kind: EntityKind,
    pub pos: BlockPos,
    /// User credited with creating this entity, filled in on spawn.
    pub creator: Option<UserId>,
    pub notifier: Option<UserId>,
}

impl EntitySnapshot {
    pub const fn new(id: EntityId, kind: EntityKind, pos: BlockPos) -> Self {
        Self {
            id,
            kind,
            pos,
            creator: None,
            notifier: None,
        }
    }

    pub const fn is_item(&self) -> bool {
        matches!(self.kind, EntityKind::Item { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_clamps_at_the_coordinate_range() {
        let edge = BlockPos::new(i32::MAX, i32::MIN, 0);
        assert_eq!(edge.offset(1, -1, 0), edge);
        assert_eq!(edge.neighbors()[0], BlockPos::new(i32::MAX - 1, i32::MIN, 0));
    }

    #[test]
    fn neighbors_are_face_adjacent() {
        let pos = BlockPos::new(2, 64, -3);
        for neighbor in pos.neighbors() {
            let distance = (neighbor.x - pos.x).abs() + (neighbor.y - pos.y).abs() + (neighbor.z - pos.z).abs();
            assert_eq!(distance, 1, "{neighbor}");
        }
        assert_eq!(pos.up(), BlockPos::new(2, 65, -3));
        assert_eq!(pos.down(), BlockPos::new(2, 63, -3));
    }
}
