//! Phase contexts: the named causes and capture buffers of one phase entry.

use crate::capture::{CaptureBuffers, CaptureKinds};
use crate::cause::{CauseKey, CauseValue, NamedCauses};
use crate::error::ContextError;
use crate::world::UserId;

use super::PhaseState;

/// The state and causes of the phase whose captures are being replayed.
///
/// Carried by the synthetic unwinding context so policy queries made while
/// unwinding can be redirected to the phase that produced the captures.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnwindingFrame {
    pub state: PhaseState,
    pub causes: NamedCauses,
}

impl UnwindingFrame {
    pub fn new(state: PhaseState, causes: NamedCauses) -> Self {
        Self { state, causes }
    }
}

/// Causes and buffers for one phase invocation.
///
/// A context can only be obtained from [`PhaseContextBuilder::complete`], so
/// its causes are fixed for the lifetime of the phase. Only the tracker
/// writes into its buffers.
#[derive(Clone, Debug, Default)]
pub struct PhaseContext {
    causes: NamedCauses,
    buffers: CaptureBuffers,
    frame: Option<UnwindingFrame>,
}

impl PhaseContext {
    pub fn start() -> PhaseContextBuilder {
        PhaseContextBuilder::new()
    }

    /// Context of the base phase: no causes, nothing captured.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Context of the synthetic post phase. Every buffer is enabled so any
    /// mutation produced while replaying is captured and drained again.
    pub(crate) fn unwinding(frame: UnwindingFrame) -> Self {
        Self {
            causes: NamedCauses::new(),
            buffers: CaptureBuffers::new(CaptureKinds::all()),
            frame: Some(frame),
        }
    }

    pub fn causes(&self) -> &NamedCauses {
        &self.causes
    }

    pub fn source(&self) -> Option<&CauseValue> {
        self.causes.source()
    }

    pub fn notifier(&self) -> Option<UserId> {
        self.causes.notifier()
    }

    pub fn owner(&self) -> Option<UserId> {
        self.causes.owner()
    }

    pub fn first_named(&self, key: CauseKey) -> Option<&CauseValue> {
        self.causes.first_named(key)
    }

    pub fn buffers(&self) -> &CaptureBuffers {
        &self.buffers
    }

    pub(crate) fn buffers_mut(&mut self) -> &mut CaptureBuffers {
        &mut self.buffers
    }

    /// Moves everything captured so far out of this context.
    pub(crate) fn take_buffers(&mut self) -> CaptureBuffers {
        self.buffers.take()
    }

    pub fn frame(&self) -> Option<&UnwindingFrame> {
        self.frame.as_ref()
    }

    pub(crate) fn into_parts(self) -> (NamedCauses, CaptureBuffers) {
        (self.causes, self.buffers)
    }
}

/// Collects causes and capture enablement before a phase is pushed.
///
/// Each cause key may be written once. A second write is remembered and
/// reported by [`complete`](Self::complete).
#[derive(Clone, Debug, Default)]
#[must_use]
pub struct PhaseContextBuilder {
    causes: NamedCauses,
    kinds: CaptureKinds,
    duplicate: Option<CauseKey>,
}

impl PhaseContextBuilder {
    fn new() -> Self {
        Self::default()
    }

    pub fn source(self, value: CauseValue) -> Self {
        self.named(CauseKey::Source, value)
    }

    pub fn notifier(self, user: UserId) -> Self {
        self.named(CauseKey::Notifier, CauseValue::User(user))
    }

    pub fn owner(self, user: UserId) -> Self {
        self.named(CauseKey::Owner, CauseValue::User(user))
    }

    /// Sets notifier and owner when present.
    pub fn attribution(self, notifier: Option<UserId>, owner: Option<UserId>) -> Self {
        let builder = match notifier {
            Some(user) => self.notifier(user),
            None => self,
        };
        match owner {
            Some(user) => builder.owner(user),
            None => builder,
        }
    }

    pub fn named(mut self, key: CauseKey, value: CauseValue) -> Self {
        if !self.causes.insert_once(key, value) && self.duplicate.is_none() {
            self.duplicate = Some(key);
        }
        self
    }

    /// Enables block, block-drop and block-item-drop capturing.
    pub fn add_block_captures(self) -> Self {
        self.add_capture_kinds(CaptureKinds::BLOCK_CAPTURES)
    }

    /// Enables entity and item capturing.
    pub fn add_entity_captures(self) -> Self {
        self.add_capture_kinds(CaptureKinds::ENTITY_CAPTURES)
    }

    pub fn add_captures(self) -> Self {
        self.add_block_captures().add_entity_captures()
    }

    pub fn add_capture_kinds(mut self, kinds: CaptureKinds) -> Self {
        self.kinds |= kinds;
        self
    }

    pub fn has_cause(&self, key: CauseKey) -> bool {
        self.causes.contains(key)
    }

    /// Freezes the causes and allocates the enabled buffers.
    pub fn complete(self) -> Result<PhaseContext, ContextError> {
        if let Some(key) = self.duplicate {
            return Err(ContextError::DuplicateCause { key });
        }
        Ok(PhaseContext {
            causes: self.causes,
            buffers: CaptureBuffers::new(self.kinds),
            frame: None,
        })
    }
}

/// One entry of the phase stack.
#[derive(Clone, Debug)]
pub struct PhaseData {
    pub state: PhaseState,
    pub context: PhaseContext,
}

impl PhaseData {
    pub fn new(state: PhaseState, context: PhaseContext) -> Self {
        Self { state, context }
    }
}
