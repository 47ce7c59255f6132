use bitflags::bitflags;

bitflags! {
    /// Describes which side effects a block write is allowed to trigger.
    ///
    /// Restores of cancelled transactions always use [`ChangeFlag::NONE`];
    /// custom replacements are written with [`ChangeFlag::ALL`].
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct ChangeFlag: u8 {
        /// Run block physics (`on_block_added`) when the block type changes.
        const PHYSICS   = 1 << 0;
        /// Propagate the change to neighboring blocks.
        const NEIGHBORS = 1 << 1;
    }
}

impl ChangeFlag {
    pub const NONE: Self = Self::empty();
    pub const ALL: Self = Self::all();

    pub const fn performs_physics(self) -> bool {
        self.contains(Self::PHYSICS)
    }

    pub const fn updates_neighbors(self) -> bool {
        self.contains(Self::NEIGHBORS)
    }
}

impl Default for ChangeFlag {
    fn default() -> Self {
        Self::ALL
    }
}

bitflags! {
    /// Notification flags carried alongside a block change.
    ///
    /// `CLIENTS` is the bit that gates the "block changed" notification issued
    /// after a transaction is applied.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct UpdateFlags: u8 {
        const NEIGHBORS   = 1 << 0;
        const CLIENTS     = 1 << 1;
        const NO_RERENDER = 1 << 2;
    }
}

impl UpdateFlags {
    pub const DEFAULT: Self = Self::NEIGHBORS.union(Self::CLIENTS);

    pub const fn notifies_clients(self) -> bool {
        self.contains(Self::CLIENTS)
    }
}

impl Default for UpdateFlags {
    fn default() -> Self {
        Self::DEFAULT
    }
}
