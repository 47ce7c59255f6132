#![allow(dead_code)]

use tracking_core::{
    BlockId, BlockPos, BlockSnapshot, BlockState, CauseTracker, CauseValue, PhaseContext,
    PhaseState, TrackerConfig, UserId, WorldId,
};
use tracking_sandbox::MemoryWorld;

pub const WORLD: WorldId = WorldId(0);
pub const STONE: BlockState = BlockState::of(BlockId(1));
pub const DIRT: BlockState = BlockState::of(BlockId(3));
pub const COBBLE: BlockState = BlockState::of(BlockId(4));
pub const SAND: BlockState = BlockState::of(BlockId(12));
pub const GRAVEL: BlockState = BlockState::of(BlockId(13));
pub const DISPENSER: BlockState = BlockState::of(BlockId(23));

pub fn at(x: i32) -> BlockPos {
    BlockPos::new(x, 64, 0)
}

pub fn setup() -> (CauseTracker, MemoryWorld) {
    setup_with(TrackerConfig::default())
}

pub fn setup_with(config: TrackerConfig) -> (CauseTracker, MemoryWorld) {
    (CauseTracker::new(WORLD, config), MemoryWorld::new(WORLD))
}

/// Command context started by `player`.
pub fn command(player: u64) -> PhaseContext {
    PhaseContext::start()
        .source(CauseValue::Player(UserId(player)))
        .add_capture_kinds(PhaseState::Command.default_captures())
        .complete()
        .expect("command context should be valid")
}

pub fn push_command(tracker: &mut CauseTracker, player: u64) {
    tracker
        .push_phase(PhaseState::Command, command(player))
        .expect("push should succeed");
}

/// Dispense context whose source is the block at `pos`.
pub fn dispense(world: &MemoryWorld, pos: BlockPos) -> PhaseContext {
    PhaseContext::start()
        .source(CauseValue::Block(world.snapshot(pos)))
        .add_capture_kinds(PhaseState::Dispense.default_captures())
        .complete()
        .expect("dispense context should be valid")
}

pub fn dispenser_snapshot(pos: BlockPos) -> BlockSnapshot {
    BlockSnapshot::new(WORLD, pos, DISPENSER)
}
