//! Data-driven scenarios replayed end to end.
use std::fs;

use tempfile::TempDir;
use tracking_content::ScenarioLoader;
use tracking_core::{
    BlockId, BlockPos, BlockState, BlockWorld, CauseKey, ContextError, TrackerConfig,
    TrackingError, UserId,
};
use tracking_sandbox::{DEMO_SCENARIO, ScenarioRunner};

fn run(source: &str) -> (ScenarioRunner, Result<tracking_sandbox::ScenarioReport, TrackingError>) {
    let spec = ScenarioLoader::parse(source).expect("scenario should parse");
    let mut runner = ScenarioRunner::new(&spec, TrackerConfig::default());
    let result = runner.run();
    (runner, result)
}

#[test]
fn test_demo_scenario() {
    let (_, result) = run(DEMO_SCENARIO);
    let report = result.expect("demo should run");

    assert_eq!(report.name, "dispense and break");
    assert_eq!(report.steps, 7);
    assert_eq!(
        report.blocks,
        vec![
            (BlockPos::new(0, 64, 0), BlockState::of(BlockId(23))),
            (BlockPos::new(1, 64, 0), BlockState::of(BlockId(12))),
            (BlockPos::new(1, 65, 0), BlockState::of(BlockId(13))),
        ]
    );
    assert_eq!(report.entities, 2);
    assert_eq!(report.audited, 3);
    assert_eq!(report.open_phases, 0);
}

#[test]
fn test_scenario_from_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("replace.ron");
    fs::write(
        &path,
        r#"(
    name: "replace",
    listeners: [Replace(pos: (x: 0, y: 64, z: 0), state: (block: BlockId(4), data: 0))],
    steps: [
        Push(state: Command, source: Player(2)),
        SetBlock(pos: (x: 0, y: 64, z: 0), state: (block: BlockId(1), data: 0), change: Place),
        SetBlock(pos: (x: 1, y: 64, z: 0), state: (block: BlockId(1), data: 0), change: Place),
        Pop,
    ],
)"#,
    )
    .unwrap();

    let spec = ScenarioLoader::load(&path).expect("scenario should load");
    let mut runner = ScenarioRunner::new(&spec, TrackerConfig::default());
    runner.run().expect("scenario should run");

    let world = runner.world();
    assert_eq!(world.block_state(BlockPos::new(0, 64, 0)), BlockState::of(BlockId(4)));
    assert_eq!(world.block_state(BlockPos::new(1, 64, 0)), BlockState::of(BlockId(1)));
    assert_eq!(world.creator(BlockPos::new(0, 64, 0)), Some(UserId(2)));
}

#[test]
fn test_cancelled_bucket_scenario() {
    let (runner, result) = run(
        r#"(
    name: "no breaking",
    blocks: [(pos: (x: 0, y: 64, z: 0), state: (block: BlockId(1), data: 0))],
    listeners: [CancelBucket(Break)],
    steps: [
        Push(state: Command, source: Player(2)),
        BreakBlock(pos: (x: 0, y: 64, z: 0), drops: [(item: ItemId(4), count: 1)]),
        SpawnEntity(pos: (x: 0, y: 65, z: 0), kind: Creature(3)),
        Pop,
    ],
)"#,
    );
    let report = result.expect("scenario should run");

    assert_eq!(report.blocks, vec![(BlockPos::new(0, 64, 0), BlockState::of(BlockId(1)))]);
    assert_eq!(report.entities, 1, "only the creature spawns");
    assert_eq!(report.audited, 0);
    assert_eq!(runner.tracker().depth(), 0);
}

#[test]
fn test_explosion_inside_command() {
    let (runner, result) = run(
        r#"(
    name: "tnt",
    blocks: [(pos: (x: 0, y: 64, z: 0), state: (block: BlockId(1), data: 0))],
    steps: [
        Push(state: Command, source: Player(3), notifier: Some(3), owner: Some(4)),
        Push(state: Explosion, source: Entity(99)),
        BreakBlock(pos: (x: 0, y: 64, z: 0), drops: [(item: ItemId(4), count: 1)]),
        Pop,
        Pop,
    ],
)"#,
    );
    result.expect("scenario should run");

    let drops: Vec<_> = runner.world().entities().collect();
    assert_eq!(drops.len(), 1);
    assert_eq!(drops[0].creator, Some(UserId(3)));
}

#[test]
fn test_duplicate_cause_is_rejected() {
    let (runner, result) = run(
        r#"(
    name: "double notifier",
    steps: [
        Push(state: Command, source: Player(3), notifier: Some(3)),
        Push(state: Explosion, source: Entity(99), notifier: Some(5)),
        Pop,
    ],
)"#,
    );

    assert_eq!(
        result,
        Err(TrackingError::Context(ContextError::DuplicateCause {
            key: CauseKey::Notifier
        }))
    );
    assert_eq!(runner.tracker().depth(), 1);
}

#[test]
fn test_unfinished_scenario_reports_open_phases() {
    let (_, result) = run(
        r#"(
    name: "left open",
    steps: [Push(state: Command, source: Command("fill"))],
)"#,
    );
    assert_eq!(result.expect("scenario should run").open_phases, 1);
}
