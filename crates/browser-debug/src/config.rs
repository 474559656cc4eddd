use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebugConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    #[serde(default = "default_true")]
    pub capture_screenshots: bool,

    /// Dump the page source next to failure screenshots
    #[serde(default = "default_true")]
    pub capture_html: bool,

    #[serde(default = "default_true")]
    pub full_page: bool,
}

fn default_enabled() -> bool {
    env::var("BROWSER_DEBUG")
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

fn default_output_dir() -> PathBuf {
    env::var("BROWSER_DEBUG_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("./screenshots"))
}

fn default_true() -> bool {
    true
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            output_dir: default_output_dir(),
            capture_screenshots: true,
            capture_html: true,
            full_page: true,
        }
    }
}

impl DebugConfig {
    /// Create a new DebugConfig from environment variables
    pub fn from_env() -> Self {
        Self::default()
    }

    /// Create an enabled DebugConfig writing into `output_dir`
    pub fn new(enabled: bool, output_dir: impl AsRef<Path>) -> Result<Self> {
        let output_dir = output_dir.as_ref().to_path_buf();
        if enabled {
            std::fs::create_dir_all(&output_dir).with_context(|| {
                format!("Failed to create debug output directory: {:?}", output_dir)
            })?;
        }

        Ok(Self {
            enabled,
            output_dir,
            ..Default::default()
        })
    }

    /// A config that never writes anything
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_new_creates_output_dir_when_enabled() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("nested").join("shots");

        let config = DebugConfig::new(true, &dir).unwrap();
        assert!(config.is_enabled());
        assert!(dir.is_dir());
        assert_eq!(config.output_dir(), dir.as_path());
    }

    #[test]
    fn test_new_disabled_does_not_touch_filesystem() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("never");

        let config = DebugConfig::new(false, &dir).unwrap();
        assert!(!config.is_enabled());
        assert!(!dir.exists());
    }

    #[test]
    fn test_deserialize_fills_defaults() {
        let config: DebugConfig =
            serde_json::from_str(r#"{"enabled": true, "output_dir": "diag"}"#).unwrap();
        assert!(config.enabled);
        assert_eq!(config.output_dir, PathBuf::from("diag"));
        assert!(config.capture_screenshots);
        assert!(config.capture_html);
        assert!(config.full_page);
    }
}
