//! Cause tracking and transactional replay of world mutations.
//!
//! `tracking-core` wraps every world-mutating operation of a host game in a
//! phase. While a phase is on top of the [`tracker::CauseTracker`] stack,
//! block changes, entity spawns and drops are captured instead of applied.
//! Popping the phase replays the captures as cancellable events, restores
//! whatever listeners rejected and applies the rest, draining any mutation
//! produced along the way before returning.
//!
//! The crate performs no I/O. Hosts plug in through the traits in
//! [`world::host`] and the [`event::EventSink`] trait.
pub mod capture;
pub mod cause;
pub mod config;
pub mod error;
pub mod event;
pub mod phase;
mod spawn;
pub mod tracker;
pub mod transaction;
pub mod world;

pub use capture::{CaptureBuffers, CaptureKinds, CapturedMultiMap, CapturedSupplier, DropBuffers};
pub use cause::{Cause, CauseBuilder, CauseKey, CauseValue, NamedCause, NamedCauses, SpawnType};
pub use config::TrackerConfig;
pub use error::{ContextError, ErrorSeverity, TrackerError, TrackingError, WorldError};
pub use event::{
    Cancellable, ChangeBlockEvent, ChangeBlockPostEvent, DropItemEvent, DropKind, EventSink,
    ListenerBus, Order, SpawnEntityEvent,
};
pub use phase::{
    PhaseCapabilities, PhaseContext, PhaseContextBuilder, PhaseData, PhaseState, TrackingPhase,
    UnwindingFrame,
};
pub use tracker::CauseTracker;
pub use transaction::{BucketedTransactions, ChangeBucket};
pub use world::{
    AuditEntry, AuditSink, BlockChange, BlockId, BlockPos, BlockSnapshot, BlockState, BlockWorld,
    ChangeFlag, EntityId, EntityKind, EntitySnapshot, ItemDrop, ItemId, TracingAuditSink,
    TrackerHost, Transaction, UpdateFlags, UserId, WorldId,
};
