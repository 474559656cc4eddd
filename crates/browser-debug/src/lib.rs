pub mod capture;
pub mod config;
pub mod workflow;

pub use capture::{sanitize_label, CaptureKind, DiagnosticArtifact, DiagnosticCapture, SnapshotSource};
pub use config::DebugConfig;
pub use workflow::{StepInfo, StepRecorder};
