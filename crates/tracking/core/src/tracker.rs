//! The cause tracker: phase stack and capture entry points for one world.

use tracing::{debug, error, trace, warn};

use crate::capture::CaptureKinds;
use crate::cause::{CauseValue, NamedCauses};
use crate::config::TrackerConfig;
use crate::error::TrackingError;
use crate::phase::{
    self, PhaseContext, PhaseContextBuilder, PhaseData, PhaseState, UnwindingFrame,
};
use crate::world::{BlockPos, BlockSnapshot, EntitySnapshot, ItemDrop, TrackerHost, UserId, WorldId};

/// Owns the phase stack of one world.
///
/// The base [`PhaseState::Complete`] phase lives outside the stack, so a
/// current phase always exists. Phases are pushed by host integration code
/// around tracked operations and popped when the operation returns; popping
/// replays everything the phase captured.
///
/// Each world gets its own tracker. Trackers share no state.
#[derive(Debug)]
pub struct CauseTracker {
    world: WorldId,
    config: TrackerConfig,
    base: PhaseData,
    stack: Vec<PhaseData>,
    drain_depth: usize,
    restoring: bool,
}

impl CauseTracker {
    pub fn new(world: WorldId, config: TrackerConfig) -> Self {
        Self {
            world,
            config,
            base: PhaseData::new(PhaseState::Complete, PhaseContext::empty()),
            stack: Vec::new(),
            drain_depth: 0,
            restoring: false,
        }
    }

    pub fn world(&self) -> WorldId {
        self.world
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Number of phases above the base phase.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Current drain nesting; zero outside of any drain.
    pub fn drain_depth(&self) -> usize {
        self.drain_depth
    }

    pub fn current(&self) -> &PhaseData {
        self.stack.last().unwrap_or(&self.base)
    }

    fn current_mut(&mut self) -> &mut PhaseData {
        self.stack.last_mut().unwrap_or(&mut self.base)
    }

    pub fn current_state(&self) -> PhaseState {
        self.current().state
    }

    pub fn current_context(&self) -> &PhaseContext {
        &self.current().context
    }

    pub(crate) fn current_context_mut(&mut self) -> &mut PhaseContext {
        &mut self.current_mut().context
    }

    pub fn is_unwinding(&self) -> bool {
        self.current_state() == PhaseState::Unwinding
    }

    /// The state whose policy applies right now: the phase being replayed
    /// while unwinding, otherwise the current state.
    pub fn effective_state(&self) -> PhaseState {
        self.unwinding_frame()
            .map(|frame| frame.state)
            .unwrap_or_else(|| self.current_state())
    }

    fn unwinding_frame(&self) -> Option<&UnwindingFrame> {
        if self.is_unwinding() {
            self.current_context().frame()
        } else {
            None
        }
    }

    /// Causes whose notifier/owner apply right now, following the same
    /// redirection as [`effective_state`](Self::effective_state).
    fn effective_causes(&self) -> &NamedCauses {
        match self.unwinding_frame() {
            Some(frame) => &frame.causes,
            None => self.current_context().causes(),
        }
    }

    pub fn push_phase(&mut self, state: PhaseState, context: PhaseContext) -> Result<(), TrackingError> {
        if state == PhaseState::Unwinding {
            return Err(TrackingError::ReservedPhase { state });
        }
        if self.stack.len() >= self.config.max_phase_depth {
            error!(
                target: "tracking::phase",
                state = %state,
                depth = self.stack.len(),
                limit = self.config.max_phase_depth,
                "phase stack overflow"
            );
            return Err(TrackingError::PhaseStackOverflow {
                state,
                depth: self.stack.len() + 1,
                limit: self.config.max_phase_depth,
            });
        }
        self.push_unchecked(state, context);
        Ok(())
    }

    fn push_unchecked(&mut self, state: PhaseState, context: PhaseContext) {
        trace!(
            target: "tracking::phase",
            state = %state,
            depth = self.stack.len() + 1,
            causes = %context.causes(),
            "push phase"
        );
        self.stack.push(PhaseData::new(state, context));
    }

    /// Pops the current phase and replays its captures.
    ///
    /// The stack depth after this call equals the depth before the matching
    /// push, whether or not unwinding succeeded.
    pub fn pop_phase<H: TrackerHost + ?Sized>(&mut self, host: &mut H) -> Result<(), TrackingError> {
        let state = match self.stack.last() {
            None => return Err(TrackingError::PhaseStackUnderflow),
            Some(top) if top.state == PhaseState::Unwinding => {
                return Err(TrackingError::ReservedPhase { state: top.state });
            }
            Some(top) => top.state,
        };
        let Some(PhaseData { context, .. }) = self.stack.pop() else {
            return Err(TrackingError::PhaseStackUnderflow);
        };
        let base_depth = self.stack.len();
        trace!(target: "tracking::phase", state = %state, depth = base_depth, "pop phase");

        let (causes, buffers) = context.into_parts();
        if !state.requires_post() {
            return Ok(());
        }

        let frame = UnwindingFrame::new(state, causes.clone());
        self.push_unchecked(PhaseState::Unwinding, PhaseContext::unwinding(frame));

        let mut result = state
            .unwind(self, host, &causes, buffers)
            .and_then(|()| phase::post_dispatch(self, host, state, &causes));

        let leaked = self.stack.len().saturating_sub(base_depth + 1);
        self.stack.truncate(base_depth);
        if leaked > 0 {
            warn!(
                target: "tracking::phase",
                state = %state,
                leaked,
                "unwinding left nested phases on the stack"
            );
            if result.is_ok() {
                result = Err(TrackingError::UnbalancedPhaseStack { state, leaked });
            }
        }
        if let Err(error) = &result {
            debug!(target: "tracking::phase", state = %state, error = %error, "unwind failed");
        }
        result
    }

    pub(crate) fn enter_drain(&mut self, state: PhaseState) -> Result<usize, TrackingError> {
        if self.drain_depth >= self.config.max_drain_depth {
            error!(
                target: "tracking::drain",
                state = %state,
                depth = self.drain_depth + 1,
                limit = self.config.max_drain_depth,
                "drain recursion limit reached"
            );
            return Err(TrackingError::DrainTooDeep {
                state,
                depth: self.drain_depth + 1,
            });
        }
        self.drain_depth += 1;
        Ok(self.drain_depth)
    }

    pub(crate) fn exit_drain(&mut self) {
        self.drain_depth = self.drain_depth.saturating_sub(1);
    }

    /// True while the tracker writes restored or replacement blocks. Block
    /// changes are not captured in the meantime.
    pub fn is_restoring(&self) -> bool {
        self.restoring
    }

    pub(crate) fn begin_restoring(&mut self) -> bool {
        std::mem::replace(&mut self.restoring, true)
    }

    pub(crate) fn end_restoring(&mut self, previous: bool) {
        self.restoring = previous;
    }

    /// Captures a block change about to happen at `snapshot.pos`.
    ///
    /// `snapshot` describes the block *before* the write. Returns `Ok(true)`
    /// when captured, `Ok(false)` when the current phase does not capture
    /// block changes (or the tracker is restoring) and the host should apply
    /// the change directly.
    pub fn capture_block_change(&mut self, snapshot: BlockSnapshot) -> Result<bool, TrackingError> {
        let state = self.current_state();
        if self.restoring || !state.requires_block_capturing() {
            return Ok(false);
        }
        trace!(
            target: "tracking::capture",
            state = %state,
            pos = %snapshot.pos,
            change = %snapshot.change,
            "capture block change"
        );
        self.current_context_mut()
            .buffers_mut()
            .blocks
            .push(snapshot)
            .map_err(|_| missing_capture(state, CaptureKinds::BLOCKS))?;
        Ok(true)
    }

    /// Captures a non-item entity spawn.
    pub fn capture_entity_spawn(&mut self, entity: EntitySnapshot) -> Result<bool, TrackingError> {
        let state = self.current_state();
        if !state.captures_entity_spawns() {
            return Ok(false);
        }
        trace!(target: "tracking::capture", state = %state, entity = %entity.id, "capture entity spawn");
        self.current_context_mut()
            .buffers_mut()
            .entities
            .push(entity)
            .map_err(|_| missing_capture(state, CaptureKinds::ENTITIES))?;
        Ok(true)
    }

    /// Captures an item entity spawn.
    pub fn capture_item_spawn(&mut self, item: EntitySnapshot) -> Result<bool, TrackingError> {
        let state = self.current_state();
        if !state.captures_entity_spawns() {
            return Ok(false);
        }
        trace!(target: "tracking::capture", state = %state, item = %item.id, "capture item spawn");
        self.current_context_mut()
            .buffers_mut()
            .items
            .push(item)
            .map_err(|_| missing_capture(state, CaptureKinds::ITEMS))?;
        Ok(true)
    }

    /// Captures an item the block at `pos` drops.
    ///
    /// Only captured when the effective state tracks block-specific drops;
    /// otherwise the host spawns the drop directly.
    pub fn capture_block_drop(&mut self, pos: BlockPos, drop: ItemDrop) -> Result<bool, TrackingError> {
        let state = self.effective_state();
        if !state.tracks_block_specific_drops() {
            return Ok(false);
        }
        trace!(target: "tracking::capture", state = %state, pos = %pos, "capture block drop");
        self.current_context_mut()
            .buffers_mut()
            .drops
            .block_drops
            .put(pos, drop)
            .map_err(|_| missing_capture(state, CaptureKinds::BLOCK_DROPS))?;
        Ok(true)
    }

    /// Captures an already constructed item entity dropped by the block at
    /// `pos`.
    pub fn capture_block_item_drop(
        &mut self,
        pos: BlockPos,
        item: EntitySnapshot,
    ) -> Result<bool, TrackingError> {
        let state = self.effective_state();
        if !state.tracks_block_specific_drops() {
            return Ok(false);
        }
        trace!(target: "tracking::capture", state = %state, pos = %pos, item = %item.id, "capture block item drop");
        self.current_context_mut()
            .buffers_mut()
            .drops
            .block_item_drops
            .put(pos, item)
            .map_err(|_| missing_capture(state, CaptureKinds::BLOCK_ITEM_DROPS))?;
        Ok(true)
    }

    /// Decides who is credited as notifier of the block at `notify_pos`
    /// after a neighbor update coming from `source_pos`.
    ///
    /// While unwinding, the decision is made by the phase being replayed.
    pub fn associate_neighbor_notifier(
        &self,
        source_pos: Option<BlockPos>,
        notify_pos: BlockPos,
    ) -> Result<Option<(BlockPos, UserId)>, TrackingError> {
        let data = self.current();
        let (state, causes) = match data.state {
            PhaseState::Unwinding => {
                let frame = data.context.frame().ok_or_else(|| {
                    TrackingError::missing_context(
                        data.state,
                        "Intended to be unwinding a phase but no phase unwinding found!",
                        data.context.causes(),
                    )
                })?;
                (frame.state, &frame.causes)
            }
            state => (state, data.context.causes()),
        };

        if !state.associates_neighbor_notifier() {
            return Ok(None);
        }
        let user = match causes.source() {
            Some(CauseValue::Player(user)) => *user,
            _ => return Ok(None),
        };
        trace!(
            target: "tracking::capture",
            state = %state,
            source = ?source_pos,
            notify = %notify_pos,
            user = %user,
            "associate neighbor notifier"
        );
        Ok(Some((notify_pos, user)))
    }

    /// Starts an explosion context that inherits notifier and owner from the
    /// current phase.
    pub fn explosion_context(&self) -> PhaseContextBuilder {
        let causes = self.effective_causes();
        PhaseContext::start()
            .attribution(causes.notifier(), causes.owner())
            .add_capture_kinds(PhaseState::Explosion.default_captures())
    }
}

fn missing_capture(state: PhaseState, kind: CaptureKinds) -> TrackingError {
    TrackingError::MissingCapture { state, kind }
}
