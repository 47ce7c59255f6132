//! Sandbox scenario loader.

use std::path::Path;

use crate::loaders::{LoadResult, read_file};
use crate::scenario::ScenarioSpec;

/// Loader for sandbox scenarios from RON files.
pub struct ScenarioLoader;

impl ScenarioLoader {
    /// Load a scenario from a RON file.
    ///
    /// RON format: a single `ScenarioSpec` struct.
    pub fn load(path: &Path) -> LoadResult<ScenarioSpec> {
        let content = read_file(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> LoadResult<ScenarioSpec> {
        let scenario: ScenarioSpec = ron::from_str(content)
            .map_err(|e| anyhow::anyhow!("Failed to parse scenario RON: {}", e))?;

        if scenario.steps.is_empty() {
            anyhow::bail!("scenario '{}' has no steps", scenario.name);
        }
        Ok(scenario)
    }
}
