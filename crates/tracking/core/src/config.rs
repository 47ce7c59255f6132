/// Tracker configuration constants and tunable limits.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TrackerConfig {
    /// Maximum nesting of drain passes on one call stack.
    ///
    /// Each re-entrant drain (physics callbacks, custom replacements, post
    /// dispatch rounds) counts as one level. Exceeding the limit is reported
    /// as [`crate::TrackingError::DrainTooDeep`].
    pub max_drain_depth: usize,

    /// Maximum number of phases that may be stacked above the base phase.
    pub max_phase_depth: usize,

    /// Whether applied block changes are forwarded to the audit sink.
    pub audit_block_changes: bool,
}

impl TrackerConfig {
    // ===== runtime-tunable defaults =====
    pub const DEFAULT_MAX_DRAIN_DEPTH: usize = 32;
    pub const DEFAULT_MAX_PHASE_DEPTH: usize = 64;

    pub const fn new() -> Self {
        Self {
            max_drain_depth: Self::DEFAULT_MAX_DRAIN_DEPTH,
            max_phase_depth: Self::DEFAULT_MAX_PHASE_DEPTH,
            audit_block_changes: true,
        }
    }

    #[must_use]
    pub const fn with_max_drain_depth(mut self, max_drain_depth: usize) -> Self {
        self.max_drain_depth = max_drain_depth;
        self
    }

    #[must_use]
    pub const fn with_max_phase_depth(mut self, max_phase_depth: usize) -> Self {
        self.max_phase_depth = max_phase_depth;
        self
    }

    #[must_use]
    pub const fn with_audit(mut self, audit_block_changes: bool) -> Self {
        self.audit_block_changes = audit_block_changes;
        self
    }
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self::new()
    }
}
