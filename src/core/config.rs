//! Configuration management for kaskflow.
//!
//! Handles loading configuration from TOML files.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Health assessment settings
    pub health: HealthConfig,

    /// Screenshot / video capture settings
    pub capture: CaptureConfig,

    /// Additional workflow templates
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub templates: Vec<TemplateConfig>,
}

/// General application settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Where projects, executions, states and assets are stored
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
}

/// Health assessment settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    /// Deadline for each external tool, in seconds (0 disables the deadline)
    pub tool_timeout_secs: u64,

    /// Image tag used by the Docker deployment probe
    pub docker_tag: String,

    /// How often a running tool is polled for exit, in milliseconds
    pub poll_interval_ms: u64,
}

/// Media capture settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Headless browser binary used for screenshots
    pub chrome_binary: String,

    /// ffmpeg binary used for video recording
    pub ffmpeg_binary: String,

    /// Browser window size for screenshots ("width,height")
    pub window_size: String,

    /// Recording size for videos ("widthxheight")
    pub video_size: String,

    /// X11 display grabbed for videos
    pub display: String,

    /// Video length when a trigger does not specify one, in seconds
    pub default_video_duration: u32,

    /// Deadline for a single capture, in seconds (0 disables the deadline)
    pub timeout_secs: u64,
}

/// A user-defined workflow template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateConfig {
    /// Template name (unique)
    pub name: String,

    /// Optional description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Workflow type the template triggers
    pub workflow_type: String,

    /// Workflow configuration keys
    #[serde(default)]
    pub configuration: serde_json::Map<String, serde_json::Value>,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            tool_timeout_secs: 600,
            docker_tag: "kaskflow-health-check".to_string(),
            poll_interval_ms: 50,
        }
    }
}

impl HealthConfig {
    /// Deadline applied to each probe.
    pub fn tool_timeout(&self) -> Option<Duration> {
        (self.tool_timeout_secs > 0).then(|| Duration::from_secs(self.tool_timeout_secs))
    }

    /// Process polling interval.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            chrome_binary: "chrome".to_string(),
            ffmpeg_binary: "ffmpeg".to_string(),
            window_size: "1920,1080".to_string(),
            video_size: "1920x1080".to_string(),
            display: ":0.0".to_string(),
            default_video_duration: 30,
            timeout_secs: 300,
        }
    }
}

impl CaptureConfig {
    /// Deadline applied to each capture.
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

impl Config {
    /// Load configuration from default locations.
    ///
    /// Looks for config in:
    /// 1. `.kaskflow.toml` in current directory
    /// 2. `~/.config/kaskflow/config.toml`
    /// 3. Falls back to defaults
    pub fn load() -> anyhow::Result<Self> {
        let local_config = PathBuf::from(".kaskflow.toml");
        if local_config.exists() {
            return Self::load_from_file(&local_config);
        }

        if let Some(config_dir) = Self::config_dir() {
            let global_config = config_dir.join("config.toml");
            if global_config.exists() {
                return Self::load_from_file(&global_config);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Get the config directory path.
    pub fn config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("kaskflow"))
    }

    /// Resolve the data directory: explicit setting, then the platform data dir.
    pub fn data_dir(&self) -> anyhow::Result<PathBuf> {
        if let Some(ref dir) = self.general.data_dir {
            let expanded = shellexpand::tilde(&dir.to_string_lossy()).into_owned();
            return Ok(PathBuf::from(expanded));
        }

        dirs::data_dir()
            .map(|d| d.join("kaskflow"))
            .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.health.tool_timeout_secs, 600);
        assert_eq!(config.health.tool_timeout(), Some(Duration::from_secs(600)));
        assert_eq!(config.capture.default_video_duration, 30);
        assert!(config.templates.is_empty());
    }

    #[test]
    fn test_zero_timeout_disables_deadline() {
        let config: Config = toml::from_str("[health]\ntool_timeout_secs = 0").unwrap();
        assert_eq!(config.health.tool_timeout(), None);
        assert_eq!(config.health.docker_tag, "kaskflow-health-check");
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_str = toml::to_string(&config).unwrap();
        assert!(toml_str.contains("[health]"));
        assert!(toml_str.contains("[capture]"));
    }

    #[test]
    fn test_template_deserialization() {
        let toml_str = r#"
            [general]
            data_dir = "/var/lib/kaskflow"

            [[templates]]
            name = "nightly"
            description = "Nightly health check without deployment"
            workflow_type = "state_check"

            [templates.configuration]
            check_deployment = false
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.data_dir().unwrap(), PathBuf::from("/var/lib/kaskflow"));
        assert_eq!(config.templates.len(), 1);

        let nightly = &config.templates[0];
        assert_eq!(nightly.name, "nightly");
        assert_eq!(nightly.workflow_type, "state_check");
        assert_eq!(nightly.configuration["check_deployment"], serde_json::Value::Bool(false));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[capture]\nchrome_binary = \"chromium\"\n").unwrap();

        let config = Config::load_from_file(&path).unwrap();
        assert_eq!(config.capture.chrome_binary, "chromium");
        assert_eq!(config.capture.ffmpeg_binary, "ffmpeg");
    }
}
