//! Typed buffers that accumulate mutations while a phase is active.
//!
//! A buffer that was never enabled for its phase behaves as permanently empty:
//! [`CapturedSupplier::or_empty`] yields an empty slice and
//! [`CapturedSupplier::if_present_and_not_empty`] never calls its consumer.
use std::collections::HashMap;
use std::hash::Hash;

use bitflags::bitflags;

use crate::world::{BlockPos, BlockSnapshot, EntitySnapshot, ItemDrop};

bitflags! {
    /// Which capture buffers a phase context enables.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct CaptureKinds: u8 {
        const BLOCKS           = 1 << 0;
        const BLOCK_DROPS      = 1 << 1;
        const BLOCK_ITEM_DROPS = 1 << 2;
        const ENTITIES         = 1 << 3;
        const ITEMS            = 1 << 4;
    }
}

impl CaptureKinds {
    /// Block changes plus the per-position drop maps that depend on them.
    pub const BLOCK_CAPTURES: Self = Self::BLOCKS
        .union(Self::BLOCK_DROPS)
        .union(Self::BLOCK_ITEM_DROPS);
    pub const ENTITY_CAPTURES: Self = Self::ENTITIES.union(Self::ITEMS);
}

/// Marker returned when pushing into a buffer that was never enabled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CaptureDisabled;

/// Ordered buffer for one kind of captured value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CapturedSupplier<T> {
    captured: Option<Vec<T>>,
}

impl<T> CapturedSupplier<T> {
    pub const fn enabled() -> Self {
        Self {
            captured: Some(Vec::new()),
        }
    }

    pub const fn disabled() -> Self {
        Self { captured: None }
    }

    pub fn with_enabled(enabled: bool) -> Self {
        if enabled {
            Self::enabled()
        } else {
            Self::disabled()
        }
    }

    fn from_vec(enabled: bool, values: Vec<T>) -> Self {
        Self {
            captured: enabled.then_some(values),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.captured.is_some()
    }

    /// Calls `consumer` with the live buffer only if capturing is enabled and
    /// at least one value was captured.
    pub fn if_present_and_not_empty(&mut self, consumer: impl FnOnce(&mut Vec<T>)) {
        if let Some(captured) = self.captured.as_mut() {
            if !captured.is_empty() {
                consumer(captured);
            }
        }
    }

    /// The captured values, or an empty slice when capturing is disabled.
    pub fn or_empty(&self) -> &[T] {
        self.captured.as_deref().unwrap_or(&[])
    }

    pub fn push(&mut self, value: T) -> Result<(), CaptureDisabled> {
        match self.captured.as_mut() {
            Some(captured) => {
                captured.push(value);
                Ok(())
            }
            None => Err(CaptureDisabled),
        }
    }

    /// Moves every captured value out, leaving the buffer enabled and empty.
    pub fn take(&mut self) -> Vec<T> {
        self.captured.as_mut().map(std::mem::take).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.or_empty().len()
    }

    pub fn is_empty(&self) -> bool {
        self.or_empty().is_empty()
    }
}

impl<T> Default for CapturedSupplier<T> {
    fn default() -> Self {
        Self::disabled()
    }
}

/// Multi-valued map buffer (key → ordered list of values).
#[derive(Clone, Debug)]
pub struct CapturedMultiMap<K, V> {
    captured: Option<HashMap<K, Vec<V>>>,
}

impl<K: Eq + Hash, V> CapturedMultiMap<K, V> {
    pub fn enabled() -> Self {
        Self {
            captured: Some(HashMap::new()),
        }
    }

    pub const fn disabled() -> Self {
        Self { captured: None }
    }

    pub fn with_enabled(enabled: bool) -> Self {
        if enabled {
            Self::enabled()
        } else {
            Self::disabled()
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.captured.is_some()
    }

    pub fn if_present_and_not_empty(&mut self, consumer: impl FnOnce(&mut HashMap<K, Vec<V>>)) {
        if let Some(captured) = self.captured.as_mut() {
            if captured.values().any(|values| !values.is_empty()) {
                consumer(captured);
            }
        }
    }

    pub fn put(&mut self, key: K, value: V) -> Result<(), CaptureDisabled> {
        match self.captured.as_mut() {
            Some(captured) => {
                captured.entry(key).or_default().push(value);
                Ok(())
            }
            None => Err(CaptureDisabled),
        }
    }

    pub fn get(&self, key: &K) -> &[V] {
        self.captured
            .as_ref()
            .and_then(|captured| captured.get(key))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Removes and returns every value stored under `key`.
    pub fn take_key(&mut self, key: &K) -> Vec<V> {
        self.captured
            .as_mut()
            .and_then(|captured| captured.remove(key))
            .unwrap_or_default()
    }

    /// Empties the list stored under `key`, returning how many values it held.
    pub fn clear_key(&mut self, key: &K) -> usize {
        self.take_key(key).len()
    }

    /// Moves the whole map out, leaving this buffer enabled and empty.
    pub fn take(&mut self) -> Self {
        match self.captured.as_mut() {
            Some(captured) => Self {
                captured: Some(std::mem::take(captured)),
            },
            None => Self::disabled(),
        }
    }

    /// Total number of values across all keys.
    pub fn len(&self) -> usize {
        self.captured
            .as_ref()
            .map(|captured| captured.values().map(Vec::len).sum())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K: Eq + Hash, V> Default for CapturedMultiMap<K, V> {
    fn default() -> Self {
        Self::disabled()
    }
}

/// Drops keyed by the block position that produced them.
#[derive(Clone, Debug, Default)]
pub struct DropBuffers {
    pub block_drops: CapturedMultiMap<BlockPos, ItemDrop>,
    pub block_item_drops: CapturedMultiMap<BlockPos, EntitySnapshot>,
}

impl DropBuffers {
    pub fn new(kinds: CaptureKinds) -> Self {
        Self {
            block_drops: CapturedMultiMap::with_enabled(kinds.contains(CaptureKinds::BLOCK_DROPS)),
            block_item_drops: CapturedMultiMap::with_enabled(
                kinds.contains(CaptureKinds::BLOCK_ITEM_DROPS),
            ),
        }
    }

    /// Moves every buffered drop out, keeping enablement.
    pub fn take(&mut self) -> Self {
        Self {
            block_drops: self.block_drops.take(),
            block_item_drops: self.block_item_drops.take(),
        }
    }

    /// Discards all drops produced at `pos`.
    pub fn clear_position(&mut self, pos: BlockPos) -> usize {
        self.block_drops.clear_key(&pos) + self.block_item_drops.clear_key(&pos)
    }

    pub fn is_empty(&self) -> bool {
        self.block_drops.is_empty() && self.block_item_drops.is_empty()
    }
}

/// All buffers owned by one phase context.
#[derive(Clone, Debug, Default)]
pub struct CaptureBuffers {
    pub blocks: CapturedSupplier<BlockSnapshot>,
    pub entities: CapturedSupplier<EntitySnapshot>,
    pub items: CapturedSupplier<EntitySnapshot>,
    pub drops: DropBuffers,
}

impl CaptureBuffers {
    pub fn new(kinds: CaptureKinds) -> Self {
        Self {
            blocks: CapturedSupplier::with_enabled(kinds.contains(CaptureKinds::BLOCKS)),
            entities: CapturedSupplier::with_enabled(kinds.contains(CaptureKinds::ENTITIES)),
            items: CapturedSupplier::with_enabled(kinds.contains(CaptureKinds::ITEMS)),
            drops: DropBuffers::new(kinds),
        }
    }

    pub fn kinds(&self) -> CaptureKinds {
        let mut kinds = CaptureKinds::empty();
        kinds.set(CaptureKinds::BLOCKS, self.blocks.is_enabled());
        kinds.set(CaptureKinds::ENTITIES, self.entities.is_enabled());
        kinds.set(CaptureKinds::ITEMS, self.items.is_enabled());
        kinds.set(CaptureKinds::BLOCK_DROPS, self.drops.block_drops.is_enabled());
        kinds.set(
            CaptureKinds::BLOCK_ITEM_DROPS,
            self.drops.block_item_drops.is_enabled(),
        );
        kinds
    }

    /// Moves every buffered value out, leaving the same buffers enabled.
    pub fn take(&mut self) -> Self {
        Self {
            blocks: CapturedSupplier::from_vec(self.blocks.is_enabled(), self.blocks.take()),
            entities: CapturedSupplier::from_vec(self.entities.is_enabled(), self.entities.take()),
            items: CapturedSupplier::from_vec(self.items.is_enabled(), self.items.take()),
            drops: self.drops.take(),
        }
    }

    /// True when nothing that still needs replaying is buffered.
    pub fn is_drained(&self) -> bool {
        self.blocks.is_empty() && self.entities.is_empty() && self.items.is_empty()
    }
}
