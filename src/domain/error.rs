// ============================================================
// Layer 3 — Pipeline Errors
// ============================================================
// Every failure here is terminal for the run; nothing is
// retried. The application layer wraps these in anyhow so the
// CLI prints the chain and exits with status 1.

use std::path::PathBuf;

use thiserror::Error;

/// Failures of the export / verify pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The checkpoint file does not exist.
    #[error("ERROR: Could not find '{}'. Check the filename!", path.display())]
    MissingCheckpoint {
        path: PathBuf,
    },

    /// The checkpoint exists but does not fit the architecture
    /// (corrupt file, missing tensor, wrong shape).
    #[error("Cannot load checkpoint '{}': {reason}", path.display())]
    CheckpointLoad {
        path:   PathBuf,
        reason: String,
    },

    /// The native forward pass produced a shape outside the contract.
    #[error("Traced output shape {actual:?} does not satisfy {expected}")]
    Trace {
        expected: String,
        actual:   Vec<usize>,
    },

    /// The artifact could not be opened: missing, undecodable,
    /// unsupported opset or rejected by the inference engine.
    #[error("Error loading model '{}': {reason}", path.display())]
    ArtifactLoad {
        path:   PathBuf,
        reason: String,
    },

    /// The inference engine failed while running the probe.
    #[error("Inference failed: {0}")]
    Inference(String),
}

impl PipelineError {
    pub fn checkpoint_load(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::CheckpointLoad { path: path.into(), reason: reason.to_string() }
    }

    pub fn artifact_load(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::ArtifactLoad { path: path.into(), reason: reason.to_string() }
    }
}
