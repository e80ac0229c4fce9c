// ============================================================
// Layer 2 — ExportUseCase
// ============================================================
// Orchestrates checkpoint → artifact in order:
//
//   Step 1: Build the model architecture       (Layer 5 - ml)
//   Step 2: Load trained weights               (Layer 6 - infra)
//   Step 3: Create the dummy input             (burn tensor)
//   Step 4: Trace and serialise to ONNX        (Layer 6 - infra)
//
// Inference mode is implied by the backend: ExportBackend has no
// autodiff, so dropout is inert and no gradients are tracked.
//
// No printing here; the CLI subscribes to ExportEvent to show
// progress.

use std::{
    path::PathBuf,
    time::{Duration, Instant},
};

use anyhow::{Context, Result};
use burn::{
    backend::NdArray,
    prelude::*,
    tensor::Distribution,
};

use crate::domain::{
    contract::{ArchitectureDescriptor, ARTIFACT_FILE, CHECKPOINT_FILE},
    error::PipelineError,
    shape::ShapeContract,
};
use crate::infra::{checkpoint::CheckpointManager, onnx};
use crate::ml::model::{LstmAutoencoder, LstmAutoencoderConfig};

type ExportBackend = NdArray<f32>;

// ─── Export Configuration ────────────────────────────────────────────────────
#[derive(Debug, Clone)]
pub struct ExportConfig {
    pub checkpoint:   PathBuf,
    pub output:       PathBuf,
    pub architecture: ArchitectureDescriptor,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            checkpoint:   PathBuf::from(CHECKPOINT_FILE),
            output:       PathBuf::from(ARTIFACT_FILE),
            architecture: ArchitectureDescriptor::default(),
        }
    }
}

/// The four steps the operator sees numbered on the console.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportStep {
    InitializeModel,
    LoadWeights,
    CreateDummyInput,
    Serialize,
}

impl ExportStep {
    pub const COUNT: usize = 4;

    /// 1-based position of the step.
    pub fn number(self) -> usize {
        match self {
            ExportStep::InitializeModel  => 1,
            ExportStep::LoadWeights      => 2,
            ExportStep::CreateDummyInput => 3,
            ExportStep::Serialize        => 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportEvent {
    Started(ExportStep),
    Finished(ExportStep),
}

/// What a successful export produced.
#[derive(Debug, Clone)]
pub struct ExportReport {
    pub output:  PathBuf,
    pub bytes:   u64,
    /// Wall-clock time of the trace + serialise step only.
    pub elapsed: Duration,
}

// ─── ExportUseCase ───────────────────────────────────────────────────────────
pub struct ExportUseCase {
    config: ExportConfig,
}

impl ExportUseCase {
    pub fn new(config: ExportConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    /// Run every step, calling `on_event` as each one starts and finishes.
    pub fn execute_with(&self, mut on_event: impl FnMut(ExportEvent)) -> Result<ExportReport> {
        let cfg      = &self.config;
        let contract = ShapeContract::ecg();
        let device   = <ExportBackend as Backend>::Device::default();

        // ── Step 1: Build the architecture ────────────────────────────────────
        on_event(ExportEvent::Started(ExportStep::InitializeModel));
        let model_cfg = LstmAutoencoderConfig::from(&cfg.architecture);
        let model: LstmAutoencoder<ExportBackend> = model_cfg.init(&device);
        tracing::debug!("Built {}", cfg.architecture);
        on_event(ExportEvent::Finished(ExportStep::InitializeModel));

        // ── Step 2: Load trained weights ──────────────────────────────────────
        // Fails with MissingCheckpoint before anything is written
        on_event(ExportEvent::Started(ExportStep::LoadWeights));
        let model = CheckpointManager::new(&cfg.checkpoint).load(model, &model_cfg, &device)?;
        on_event(ExportEvent::Finished(ExportStep::LoadWeights));

        // ── Step 3: Dummy input ───────────────────────────────────────────────
        // Only the shape matters; the values are never looked at
        on_event(ExportEvent::Started(ExportStep::CreateDummyInput));
        let dummy = Tensor::<ExportBackend, 3>::random(
            contract.concrete(1),
            Distribution::Normal(0.0, 1.0),
            &device,
        );
        on_event(ExportEvent::Finished(ExportStep::CreateDummyInput));

        // ── Step 4: Trace and serialise ───────────────────────────────────────
        on_event(ExportEvent::Started(ExportStep::Serialize));
        let start = Instant::now();

        trace(&model, dummy, &contract)?;
        let proto = onnx::lower::lower_autoencoder(&model, &model_cfg, &contract)
            .context("Failed to lower the model to ONNX")?;
        let bytes = onnx::write_model(&proto, &cfg.output)?;

        let elapsed = start.elapsed();
        on_event(ExportEvent::Finished(ExportStep::Serialize));

        tracing::debug!(
            "Wrote {} bytes to '{}' in {:.2?}",
            bytes,
            cfg.output.display(),
            elapsed
        );

        Ok(ExportReport { output: cfg.output.clone(), bytes, elapsed })
    }
}

/// Run the dummy input through the native model and check the output
/// honours the contract before anything is written.
fn trace<B: Backend>(
    model:    &LstmAutoencoder<B>,
    dummy:    Tensor<B, 3>,
    contract: &ShapeContract,
) -> Result<(), PipelineError> {
    let batch  = dummy.dims()[0];
    let output = model.forward(dummy);
    let dims   = output.dims();
    if !contract.is_exact(&dims, batch) {
        return Err(PipelineError::Trace {
            expected: contract.to_string(),
            actual:   dims.to_vec(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::onnx::{declared_inputs, declared_outputs, read_model};
    use tempfile::tempdir;

    fn small_arch() -> ArchitectureDescriptor {
        ArchitectureDescriptor { hidden_size: 4, ..Default::default() }
    }

    fn save_checkpoint(dir: &std::path::Path, arch: &ArchitectureDescriptor) -> PathBuf {
        let cfg   = LstmAutoencoderConfig::from(arch);
        let model: LstmAutoencoder<ExportBackend> = cfg.init(&Default::default());
        let path  = dir.join("trained.mpk");
        CheckpointManager::new(&path).save(&model, &cfg).unwrap();
        path
    }

    #[test]
    fn test_export_writes_artifact_with_contract() {
        let dir  = tempdir().unwrap();
        let arch = small_arch();
        let config = ExportConfig {
            checkpoint:   save_checkpoint(dir.path(), &arch),
            output:       dir.path().join("ecg_model.onnx"),
            architecture: arch,
        };

        let report = ExportUseCase::new(config.clone()).execute_with(|_| {}).unwrap();
        assert_eq!(report.output, config.output);
        assert!(report.bytes > 0);

        let proto = read_model(&tract_onnx::onnx(), &config.output).unwrap();
        let contract = ShapeContract::ecg();
        assert_eq!(ShapeContract::from_dims(&declared_inputs(&proto)[0].dims), Some(contract.clone()));
        assert_eq!(ShapeContract::from_dims(&declared_outputs(&proto)[0].dims), Some(contract));
    }

    #[test]
    fn test_missing_checkpoint_writes_nothing() {
        let dir = tempdir().unwrap();
        let config = ExportConfig {
            checkpoint:   dir.path().join(CHECKPOINT_FILE),
            output:       dir.path().join(ARTIFACT_FILE),
            architecture: small_arch(),
        };

        let err = ExportUseCase::new(config.clone()).execute_with(|_| {}).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::MissingCheckpoint { .. })
        ));
        assert!(!config.output.exists());
    }

    #[test]
    fn test_events_arrive_in_step_order() {
        let dir  = tempdir().unwrap();
        let arch = small_arch();
        let config = ExportConfig {
            checkpoint:   save_checkpoint(dir.path(), &arch),
            output:       dir.path().join("ecg_model.onnx"),
            architecture: arch,
        };

        let mut events = Vec::new();
        ExportUseCase::new(config).execute_with(|e| events.push(e)).unwrap();

        let expected: Vec<ExportEvent> = [
            ExportStep::InitializeModel,
            ExportStep::LoadWeights,
            ExportStep::CreateDummyInput,
            ExportStep::Serialize,
        ]
        .into_iter()
        .flat_map(|s| [ExportEvent::Started(s), ExportEvent::Finished(s)])
        .collect();
        assert_eq!(events, expected);
    }

    #[test]
    fn test_load_failure_stops_after_step_two() {
        let dir = tempdir().unwrap();
        let config = ExportConfig {
            checkpoint:   dir.path().join(CHECKPOINT_FILE),
            output:       dir.path().join(ARTIFACT_FILE),
            architecture: small_arch(),
        };

        let mut events = Vec::new();
        assert!(ExportUseCase::new(config).execute_with(|e| events.push(e)).is_err());
        assert_eq!(events.last(), Some(&ExportEvent::Started(ExportStep::LoadWeights)));
    }

    #[test]
    fn test_trace_rejects_wrong_sequence_length() {
        let cfg   = LstmAutoencoderConfig::new().with_hidden_size(2);
        let model: LstmAutoencoder<ExportBackend> = cfg.init(&Default::default());
        let dummy = Tensor::<ExportBackend, 3>::zeros([1, 10, 1], &Default::default());
        let err = trace(&model, dummy, &ShapeContract::ecg()).unwrap_err();
        assert!(matches!(err, PipelineError::Trace { .. }));
    }
}
