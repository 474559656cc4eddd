use anyhow::{Context, Result};
use async_trait::async_trait;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use crate::config::DebugConfig;

/// Anything that can hand out a screenshot and the current DOM.
/// Implemented by every browser driver adapter.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn screenshot_png(&self, full_page: bool) -> Result<Vec<u8>>;

    async fn page_source(&self) -> Result<String>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureKind {
    /// Numbered workflow checkpoint, e.g. `10_internal_testing_page`
    Step,
    BeforeClick,
    AfterClick,
    Failure,
}

impl CaptureKind {
    fn prefix(self) -> &'static str {
        match self {
            CaptureKind::Step => "",
            CaptureKind::BeforeClick => "before_click_",
            CaptureKind::AfterClick => "after_click_",
            CaptureKind::Failure => "error_",
        }
    }

    fn includes_page_source(self) -> bool {
        matches!(self, CaptureKind::Failure)
    }
}

/// Files written for one capture. Either path may be missing when that
/// part of the capture is disabled or failed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiagnosticArtifact {
    pub screenshot: Option<PathBuf>,
    pub page_source: Option<PathBuf>,
}

impl DiagnosticArtifact {
    pub fn is_empty(&self) -> bool {
        self.screenshot.is_none() && self.page_source.is_none()
    }
}

/// Writes screenshots and DOM dumps named after the action that produced them.
///
/// Names are a pure function of `(kind, label)`, so retrying an action
/// overwrites its own files and never another action's.
#[derive(Debug, Clone)]
pub struct DiagnosticCapture {
    config: DebugConfig,
}

impl DiagnosticCapture {
    pub fn new(config: DebugConfig) -> Result<Self> {
        if config.enabled {
            std::fs::create_dir_all(&config.output_dir).with_context(|| {
                format!("Failed to create debug output directory: {:?}", config.output_dir)
            })?;
        }
        Ok(Self { config })
    }

    pub fn disabled() -> Self {
        Self {
            config: DebugConfig::disabled(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    pub fn config(&self) -> &DebugConfig {
        &self.config
    }

    pub fn artifact_stem(kind: CaptureKind, label: &str) -> String {
        format!("{}{}", kind.prefix(), sanitize_label(label))
    }

    /// Best effort: failures are logged and never surface to the caller.
    pub async fn capture<S>(&self, source: &S, kind: CaptureKind, label: &str) -> Option<DiagnosticArtifact>
    where
        S: SnapshotSource + ?Sized,
    {
        if !self.config.enabled {
            return None;
        }

        let stem = Self::artifact_stem(kind, label);
        let mut artifact = DiagnosticArtifact::default();

        if self.config.capture_screenshots {
            let path = self.config.output_dir.join(format!("{}.png", stem));
            match source.screenshot_png(self.config.full_page).await {
                Ok(bytes) => match write_artifact(&path, &bytes) {
                    Ok(()) => {
                        debug!("Screenshot saved: {:?}", path);
                        artifact.screenshot = Some(path);
                    }
                    Err(e) => warn!("{:#}", e),
                },
                Err(e) => warn!("Failed to capture screenshot for '{}': {}", label, e),
            }
        }

        if self.config.capture_html && kind.includes_page_source() {
            let path = self.config.output_dir.join(format!("{}.html", stem));
            match source.page_source().await {
                Ok(html) => match write_artifact(&path, html.as_bytes()) {
                    Ok(()) => {
                        info!("Page source saved: {:?}", path);
                        artifact.page_source = Some(path);
                    }
                    Err(e) => warn!("{:#}", e),
                },
                Err(e) => warn!("Failed to read page source for '{}': {}", label, e),
            }
        }

        if artifact.is_empty() {
            None
        } else {
            Some(artifact)
        }
    }
}

fn write_artifact(path: &Path, bytes: &[u8]) -> Result<()> {
    std::fs::write(path, bytes).with_context(|| format!("Failed to write diagnostic to {:?}", path))
}

/// Make a label safe for use as a file name fragment.
///
/// Whitespace becomes `_`. Any other replaced character appends a short
/// hash of the trimmed label, so `save/release` and `save:release` get
/// different files. Idempotent: the output only contains kept characters.
pub fn sanitize_label(label: &str) -> String {
    let trimmed = label.trim();
    let mut lossy = false;
    let mut sanitized: String = trimmed
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                lossy |= !c.is_whitespace();
                '_'
            }
        })
        .collect();

    if lossy {
        let mut hasher = DefaultHasher::new();
        trimmed.hash(&mut hasher);
        sanitized.push_str(&format!("_{:08x}", hasher.finish() as u32));
    }
    sanitized
}
