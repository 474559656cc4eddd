use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{error, info};

/// Records the outcome of each stage of a multi-step browser operation
pub struct StepRecorder {
    operation_name: String,
    started_at: DateTime<Utc>,
    current_step: Option<ActiveStep>,
    steps: Vec<StepInfo>,
}

struct ActiveStep {
    name: String,
    step_number: u32,
    started: Instant,
}

#[derive(Debug, Clone, Serialize)]
pub struct StepInfo {
    pub step_number: u32,
    pub name: String,
    pub success: bool,
    pub error: Option<String>,
    pub duration_ms: u64,
}

impl StepRecorder {
    pub fn new(operation_name: &str) -> Self {
        Self {
            operation_name: operation_name.to_string(),
            started_at: Utc::now(),
            current_step: None,
            steps: Vec::new(),
        }
    }

    /// Begin a step. An unfinished previous step is closed as failed.
    pub fn start_step(&mut self, step_name: &str) -> u32 {
        if self.current_step.is_some() {
            self.end_step(false, Some("superseded by next step".to_string()));
        }

        let step_number = self.steps.len() as u32 + 1;
        info!("━━ Step {}: {}", step_number, step_name);
        self.current_step = Some(ActiveStep {
            name: step_name.to_string(),
            step_number,
            started: Instant::now(),
        });
        step_number
    }

    pub fn end_step(&mut self, success: bool, error: Option<String>) {
        if let Some(step) = self.current_step.take() {
            if success {
                info!("Step {} completed: {}", step.step_number, step.name);
            } else {
                error!(
                    "Step {} failed: {} - {}",
                    step.step_number,
                    step.name,
                    error.as_deref().unwrap_or("Unknown error")
                );
            }

            self.steps.push(StepInfo {
                step_number: step.step_number,
                name: step.name,
                success,
                error,
                duration_ms: step.started.elapsed().as_millis() as u64,
            });
        }
    }

    pub fn steps(&self) -> &[StepInfo] {
        &self.steps
    }

    pub fn all_succeeded(&self) -> bool {
        self.current_step.is_none() && self.steps.iter().all(|s| s.success)
    }

    pub fn summary(&self) -> Value {
        json!({
            "operation": self.operation_name,
            "started_at": self.started_at.to_rfc3339(),
            "total_steps": self.steps.len(),
            "successful_steps": self.steps.iter().filter(|s| s.success).count(),
            "failed_steps": self.steps.iter().filter(|s| !s.success).count(),
            "steps": self.steps,
        })
    }

    pub fn write_summary(&self, dir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create summary directory: {:?}", dir))?;
        let path = dir.join("summary.json");
        std::fs::write(&path, serde_json::to_string_pretty(&self.summary())?)
            .with_context(|| format!("Failed to write run summary to {:?}", path))?;
        Ok(path)
    }
}
