//! Tracker configuration loader.

use std::path::Path;

use tracking_core::TrackerConfig;

use crate::loaders::{LoadResult, read_file};

/// Loader for tracker configuration from TOML files.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load config data from a TOML file.
    ///
    /// Missing keys fall back to [`TrackerConfig::default`].
    pub fn load(path: &Path) -> LoadResult<TrackerConfig> {
        let content = read_file(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> LoadResult<TrackerConfig> {
        let config: TrackerConfig = toml::from_str(content)
            .map_err(|e| anyhow::anyhow!("Failed to parse config TOML: {}", e))?;

        if config.max_drain_depth == 0 {
            anyhow::bail!("max_drain_depth must be at least 1");
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_load_partial_config() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("tracker.toml");
        fs::write(&path, "max_drain_depth = 8\n").unwrap();

        let config = ConfigLoader::load(&path).unwrap();

        assert_eq!(config.max_drain_depth, 8);
        assert_eq!(config.max_phase_depth, TrackerConfig::DEFAULT_MAX_PHASE_DEPTH);
        assert!(config.audit_block_changes);
    }

    #[test]
    fn test_reject_zero_drain_depth() {
        let error = ConfigLoader::parse("max_drain_depth = 0").unwrap_err();
        assert!(error.to_string().contains("max_drain_depth"));
    }

    #[test]
    fn test_missing_file_names_path() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("absent.toml");

        let error = ConfigLoader::load(&path).unwrap_err();
        assert!(error.to_string().contains("absent.toml"));
    }
}
