//! Error types for the tracking engine.
//!
//! Cancellation is never an error: cancelled events are ordinary outcomes
//! that drive rollback. Errors here describe integration bugs (missing
//! context, unbalanced phase stacks, runaway recursion) or failures reported
//! by the host while writing to its world.
//!
//! # Design Principles
//!
//! - **Fail fast**: missing context is reported with the phase and the
//!   causes it was given, never papered over
//! - **Severity Classification**: errors are categorized so hosts can decide
//!   whether to keep ticking the world
//! - **No retries**: the tracker replays deterministically and propagates
//!   every failure to its caller

use crate::capture::CaptureKinds;
use crate::cause::CauseKey;
use crate::phase::PhaseState;
use crate::world::{BlockPos, EntityId};

/// Severity level of an error, used for categorization and recovery strategies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorSeverity {
    /// The host rejected a write; the world is still consistent.
    Recoverable,

    /// A caller handed the tracker malformed input.
    Validation,

    /// Integration bug: the phase machinery was driven incorrectly.
    Internal,

    /// The tracker can no longer guarantee a consistent world.
    Fatal,
}

impl ErrorSeverity {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Recoverable => "recoverable",
            Self::Validation => "validation",
            Self::Internal => "internal",
            Self::Fatal => "fatal",
        }
    }

    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Recoverable)
    }

    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Internal | Self::Fatal)
    }
}

/// Common trait for all tracking errors.
pub trait TrackerError: core::fmt::Display + core::fmt::Debug {
    fn severity(&self) -> ErrorSeverity;

    /// Stable identifier for metrics and tests.
    fn error_code(&self) -> &'static str {
        core::any::type_name::<Self>()
    }
}

/// Errors raised while building a phase context.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ContextError {
    #[error("cause '{key}' was already set on this context")]
    DuplicateCause { key: CauseKey },
}

impl TrackerError for ContextError {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Validation
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::DuplicateCause { .. } => "CONTEXT_DUPLICATE_CAUSE",
        }
    }
}

/// Failures reported by the host world.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum WorldError {
    #[error("position {pos} is outside the loaded world")]
    OutOfBounds { pos: BlockPos },

    #[error("write at {pos} rejected: {reason}")]
    WriteRejected { pos: BlockPos, reason: String },

    #[error("spawn of {entity} rejected: {reason}")]
    SpawnRejected { entity: EntityId, reason: String },
}

impl TrackerError for WorldError {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Recoverable
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::OutOfBounds { .. } => "WORLD_OUT_OF_BOUNDS",
            Self::WriteRejected { .. } => "WORLD_WRITE_REJECTED",
            Self::SpawnRejected { .. } => "WORLD_SPAWN_REJECTED",
        }
    }
}

/// Errors surfaced by the cause tracker.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum TrackingError {
    #[error("{state} phase: {message} (context: {causes})")]
    MissingContext {
        state: PhaseState,
        message: &'static str,
        causes: String,
    },

    #[error("{state} phase captures {kind:?} but its context did not enable that buffer")]
    MissingCapture {
        state: PhaseState,
        kind: CaptureKinds,
    },

    #[error("cannot pop the base phase")]
    PhaseStackUnderflow,

    #[error("phase stack depth {depth} exceeds limit {limit} while pushing {state}")]
    PhaseStackOverflow {
        state: PhaseState,
        depth: usize,
        limit: usize,
    },

    #[error("{state} is managed by the tracker and cannot be pushed or popped directly")]
    ReservedPhase { state: PhaseState },

    #[error("unwinding {state} left {leaked} nested phase(s) on the stack")]
    UnbalancedPhaseStack { state: PhaseState, leaked: usize },

    #[error("drain recursion too deep: {state} reached depth {depth}")]
    DrainTooDeep { state: PhaseState, depth: usize },

    #[error(transparent)]
    Context(#[from] ContextError),

    #[error(transparent)]
    World(#[from] WorldError),
}

impl TrackingError {
    pub fn missing_context(
        state: PhaseState,
        message: &'static str,
        causes: &crate::cause::NamedCauses,
    ) -> Self {
        Self::MissingContext {
            state,
            message,
            causes: causes.to_string(),
        }
    }
}

impl TrackerError for TrackingError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::MissingContext { .. }
            | Self::MissingCapture { .. }
            | Self::PhaseStackUnderflow
            | Self::ReservedPhase { .. }
            | Self::UnbalancedPhaseStack { .. } => ErrorSeverity::Internal,
            Self::PhaseStackOverflow { .. } | Self::DrainTooDeep { .. } => ErrorSeverity::Fatal,
            Self::Context(error) => error.severity(),
            Self::World(error) => error.severity(),
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::MissingContext { .. } => "TRACKING_MISSING_CONTEXT",
            Self::MissingCapture { .. } => "TRACKING_MISSING_CAPTURE",
            Self::PhaseStackUnderflow => "TRACKING_STACK_UNDERFLOW",
            Self::PhaseStackOverflow { .. } => "TRACKING_STACK_OVERFLOW",
            Self::ReservedPhase { .. } => "TRACKING_RESERVED_PHASE",
            Self::UnbalancedPhaseStack { .. } => "TRACKING_UNBALANCED_STACK",
            Self::DrainTooDeep { .. } => "TRACKING_DRAIN_TOO_DEEP",
            Self::Context(error) => error.error_code(),
            Self::World(error) => error.error_code(),
        }
    }
}
