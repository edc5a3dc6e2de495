//! Jazz configuration system.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JazzConfig {
    /// Default agent identifier used when a groove names none.
    #[serde(default = "default_agent")]
    pub default_agent: String,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

fn default_agent() -> String { "default".into() }

impl Default for JazzConfig {
    fn default() -> Self {
        Self {
            default_agent: default_agent(),
            scheduler: SchedulerConfig::default(),
        }
    }
}

impl JazzConfig {
    /// Load config from the default path (~/.jazz/config.toml).
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| crate::error::JazzError::Config(format!("Failed to read config: {e}")))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| crate::error::JazzError::Config(format!("Failed to parse config: {e}")))?;
        Ok(config)
    }

    /// Save config to the default path.
    pub fn save(&self) -> Result<()> {
        let path = Self::default_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self).map_err(|e| {
            crate::error::JazzError::Config(format!("Failed to serialize config: {e}"))
        })?;
        std::fs::write(&path, content)?;
        Ok(())
    }

    /// Get the default config path.
    pub fn default_path() -> PathBuf {
        JazzPaths::default_home().join("config.toml")
    }
}

/// Scheduler configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SchedulerConfig {
    /// Program invoked by OS schedule entries. Defaults to the current
    /// executable when unset.
    #[serde(default)]
    pub runner_program: Option<String>,
}

/// Well-known Jazz file locations.
#[derive(Debug, Clone)]
pub struct JazzPaths {
    /// Jazz home directory (~/.jazz).
    pub home: PathBuf,
    /// Per-groove schedule metadata files.
    pub schedules_dir: PathBuf,
    /// Per-groove scheduled-run log files.
    pub logs_dir: PathBuf,
    /// Run history JSON array.
    pub history_file: PathBuf,
    /// Directory used as the run-history mutex.
    pub history_lock_dir: PathBuf,
    /// macOS user launch-agents directory.
    pub launch_agents_dir: PathBuf,
}

impl JazzPaths {
    /// Paths rooted at the default home (~/.jazz).
    pub fn new() -> Self {
        Self::with_home(Self::default_home())
    }

    /// Paths rooted at an explicit home directory.
    pub fn with_home(home: PathBuf) -> Self {
        let launch_agents_dir = dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("Library")
            .join("LaunchAgents");
        Self {
            schedules_dir: home.join("schedules"),
            logs_dir: home.join("logs"),
            history_file: home.join("run-history.json"),
            history_lock_dir: home.join("run-history.lock"),
            launch_agents_dir,
            home,
        }
    }

    /// Get the default Jazz home directory.
    pub fn default_home() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".jazz")
    }
}

impl Default for JazzPaths {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = JazzConfig::default();
        assert_eq!(config.default_agent, "default");
        assert!(config.scheduler.runner_program.is_none());
    }

    #[test]
    fn test_config_from_toml() {
        let toml_str = r#"
            default_agent = "researcher"

            [scheduler]
            runner_program = "/usr/local/bin/jazz"
        "#;

        let config: JazzConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.default_agent, "researcher");
        assert_eq!(
            config.scheduler.runner_program.as_deref(),
            Some("/usr/local/bin/jazz")
        );
    }

    #[test]
    fn test_config_missing_fields_use_defaults() {
        let config: JazzConfig = toml::from_str("").unwrap();
        assert_eq!(config.default_agent, "default");
    }

    #[test]
    fn test_paths_layout() {
        let paths = JazzPaths::with_home(PathBuf::from("/tmp/jazz-home"));
        assert_eq!(paths.schedules_dir, PathBuf::from("/tmp/jazz-home/schedules"));
        assert_eq!(
            paths.history_file,
            PathBuf::from("/tmp/jazz-home/run-history.json")
        );
        assert_eq!(
            paths.history_lock_dir,
            PathBuf::from("/tmp/jazz-home/run-history.lock")
        );
        assert!(paths.launch_agents_dir.ends_with("Library/LaunchAgents"));
    }

    #[test]
    fn test_default_home() {
        let home = JazzPaths::default_home();
        assert!(home.to_string_lossy().contains(".jazz"));
    }
}
