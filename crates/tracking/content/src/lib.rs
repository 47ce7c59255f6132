//! Data-driven tracker configuration and sandbox scenarios.
//!
//! This crate provides loaders for TOML/RON data files:
//! - Tracker limits (data-driven via TOML)
//! - Sandbox scenarios (data-driven via RON)
//!
//! All loaders use tracking-core types directly with serde for deserialization.

pub mod scenario;

#[cfg(feature = "loaders")]
pub mod loaders;

pub use scenario::{BlockSpec, ListenerRule, PhysicsSpec, ScenarioSpec, SourceSpec, StepSpec};

#[cfg(feature = "loaders")]
pub use loaders::{ConfigLoader, ScenarioLoader};
