// ============================================================
// Layer 3 — Interface Contract
// ============================================================
// Everything the exporter and the verifier have to agree on
// without talking to each other. The only thing they share at
// runtime is the artifact file, so the names, the sequence
// length and the opset are pinned here.
//
// Sequence length 2500 = 10 seconds of ECG sampled at 250 Hz,
// one lead per time step.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::shape::Dim;

/// Checkpoint produced by the training run.
pub const CHECKPOINT_FILE: &str = "LSTM_NSR_autoencoder_10s.pth";

/// Portable artifact written by `export` and read by `verify`.
pub const ARTIFACT_FILE: &str = "ecg_model.onnx";

/// Graph input name embedded in the artifact.
pub const INPUT_NAME: &str = "input";

/// Graph output name embedded in the artifact.
pub const OUTPUT_NAME: &str = "output";

/// Symbol used for the dynamic batch axis.
pub const BATCH_AXIS_NAME: &str = "batch_size";

/// Time steps per sample.
pub const SEQUENCE_LENGTH: usize = 2500;

/// Values per time step.
pub const FEATURE_WIDTH: usize = 1;

/// Default-domain operator set the artifact targets.
pub const OPSET_VERSION: i64 = 14;

/// ONNX IR version matching opset 14.
pub const IR_VERSION: i64 = 7;

// ─── ArchitectureDescriptor ──────────────────────────────────────────────────
/// The three open parameters of the two-stage LSTM autoencoder.
///
/// The encoder maps `input_size → hidden_size`, the decoder maps
/// `hidden_size → input_size`; both stack `num_layers` LSTM layers.
/// These must match whatever produced the checkpoint; a mismatch
/// only surfaces as a checkpoint load failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchitectureDescriptor {
    pub input_size:  usize,
    pub hidden_size: usize,
    pub num_layers:  usize,
}

impl Default for ArchitectureDescriptor {
    fn default() -> Self {
        Self {
            input_size:  FEATURE_WIDTH,
            hidden_size: 128,
            num_layers:  2,
        }
    }
}

impl fmt::Display for ArchitectureDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "LSTM autoencoder (features={}, hidden={}, layers={})",
            self.input_size, self.hidden_size, self.num_layers
        )
    }
}

// ─── TensorSpec ──────────────────────────────────────────────────────────────
/// A named tensor as an artifact declares it: name plus per-axis dims,
/// where an axis may be symbolic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TensorSpec {
    pub name: String,
    pub dims: Vec<Dim>,
}

impl TensorSpec {
    pub fn new(name: impl Into<String>, dims: Vec<Dim>) -> Self {
        Self { name: name.into(), dims }
    }

    /// Declared shape rendered like `['batch_size', 2500, 1]`.
    pub fn shape_display(&self) -> String {
        let dims: Vec<String> = self.dims.iter().map(ToString::to_string).collect();
        format!("[{}]", dims.join(", "))
    }
}

/// Concrete shape rendered like `(1, 2500, 1)`.
pub fn format_shape(shape: &[usize]) -> String {
    let dims: Vec<String> = shape.iter().map(ToString::to_string).collect();
    if dims.len() == 1 {
        format!("({},)", dims[0])
    } else {
        format!("({})", dims.join(", "))
    }
}
