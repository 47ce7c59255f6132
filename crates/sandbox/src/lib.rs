//! In-memory host for `tracking-core`.
//!
//! Provides [`MemoryWorld`], a toy world implementing every host trait, and
//! [`ScenarioRunner`], which replays data-driven scenarios against it.
pub mod config;
pub mod logging;
pub mod runner;
pub mod world;

pub use config::SandboxConfig;
pub use runner::{ScenarioReport, ScenarioRunner, install_listener};
pub use world::{AuditRecord, MemoryWorld, PhysicsRule, WorldEvent};

/// Scenario used when no scenario file is given.
pub const DEMO_SCENARIO: &str = include_str!("../scenarios/dispense.ron");
