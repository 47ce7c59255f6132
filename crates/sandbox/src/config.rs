//! Sandbox runtime configuration.
use std::env;
use std::path::PathBuf;

use tracking_core::TrackerConfig;

/// Settings for one sandbox run.
#[derive(Clone, Debug, Default)]
pub struct SandboxConfig {
    pub tracker: TrackerConfig,
    /// Write logs to a file in addition to stderr.
    pub log_to_file: bool,
    pub log_dir: Option<PathBuf>,
}

impl SandboxConfig {
    pub const fn new(tracker: TrackerConfig) -> Self {
        Self {
            tracker,
            log_to_file: false,
            log_dir: None,
        }
    }

    /// Applies process environment overrides on top of `self`.
    ///
    /// Environment variables:
    /// - `TRACKER_MAX_DRAIN_DEPTH` - Nested drain limit (default: 32)
    /// - `TRACKER_MAX_PHASE_DEPTH` - Phase stack limit (default: 64)
    /// - `TRACKER_AUDIT` - Record applied block changes (default: true)
    /// - `SANDBOX_LOG_FILE` - Also log to a file (default: false)
    /// - `SANDBOX_LOG_DIR` - Directory for the log file (default: platform cache dir)
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(depth) = read_env::<usize>("TRACKER_MAX_DRAIN_DEPTH") {
            self.tracker.max_drain_depth = depth.max(1);
        }
        if let Some(depth) = read_env::<usize>("TRACKER_MAX_PHASE_DEPTH") {
            self.tracker.max_phase_depth = depth.max(1);
        }
        if let Some(audit) = read_env::<bool>("TRACKER_AUDIT") {
            self.tracker.audit_block_changes = audit;
        }

        if let Some(enable) = read_env::<bool>("SANDBOX_LOG_FILE") {
            self.log_to_file = enable;
        } else if env::var("SANDBOX_LOG_FILE").is_ok() {
            // Also accept just setting the variable without value as "true"
            self.log_to_file = true;
        }
        if let Ok(dir) = env::var("SANDBOX_LOG_DIR") {
            self.log_dir = Some(PathBuf::from(dir));
        }

        self
    }

    /// Log directory: the configured one, else the platform cache directory.
    pub fn resolved_log_dir(&self) -> PathBuf {
        self.log_dir.clone().unwrap_or_else(default_log_dir)
    }
}

/// Platform-specific log directory.
///
/// - Linux: `~/.cache/tracking-sandbox/logs`
/// - macOS: `~/Library/Caches/tracking-sandbox/logs`
/// - Fallback: `/tmp/tracking-sandbox/logs`
pub fn default_log_dir() -> PathBuf {
    let base_dir = directories::ProjectDirs::from("", "", "tracking-sandbox")
        .map(|dirs| dirs.cache_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("/tmp/tracking-sandbox"));

    base_dir.join("logs")
}

fn read_env<T>(key: &str) -> Option<T>
where
    T: std::str::FromStr,
{
    env::var(key).ok()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_log_dir_wins() {
        let config = SandboxConfig {
            log_dir: Some(PathBuf::from("/var/log/sandbox")),
            ..SandboxConfig::default()
        };
        assert_eq!(config.resolved_log_dir(), PathBuf::from("/var/log/sandbox"));
    }

    #[test]
    fn default_log_dir_ends_in_logs() {
        assert!(default_log_dir().ends_with("logs"));
    }
}
