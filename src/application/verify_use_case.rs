// ============================================================
// Layer 2 — VerifyUseCase
// ============================================================
// Smoke-tests an exported artifact:
//
//   1. Open an inference session (fatal on any load failure)
//   2. Read the declared input contract from the file
//   3. Build a standard normal probe of (B, 2500, 1)
//   4. Run it exactly once
//   5. Compare the first output's shape with (B, 2500, 1)
//
// A shape mismatch is reported, not raised: the caller decides
// how loud to be about an unhealthy artifact. Output values are
// never inspected.

use std::path::PathBuf;

use anyhow::{bail, Result};

use crate::domain::{
    contract::{TensorSpec, ARTIFACT_FILE},
    error::PipelineError,
    probe::ProbeTensor,
    shape::ShapeContract,
};
use crate::infra::session::InferenceSession;

#[derive(Debug, Clone)]
pub struct VerifyConfig {
    pub model:      PathBuf,
    pub batch_size: usize,
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self { model: PathBuf::from(ARTIFACT_FILE), batch_size: 1 }
    }
}

/// Progress notifications, in the order they are emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyEvent<'a> {
    Loading,
    Loaded { input: &'a TensorSpec },
    Running,
    Predicted { output_shape: &'a [usize] },
}

#[derive(Debug, Clone)]
pub struct VerifyReport {
    /// First declared input, as read from the artifact.
    pub input:        TensorSpec,
    pub batch_size:   usize,
    pub output_shape: Vec<usize>,
    pub output_count: usize,
}

impl VerifyReport {
    /// The shape a healthy artifact returns for this batch size.
    pub fn expected(&self) -> Vec<usize> {
        ShapeContract::ecg().concrete(self.batch_size)
    }

    pub fn is_healthy(&self) -> bool {
        ShapeContract::ecg().is_exact(&self.output_shape, self.batch_size)
    }
}

pub struct VerifyUseCase {
    config: VerifyConfig,
}

impl VerifyUseCase {
    pub fn new(config: VerifyConfig) -> Self {
        Self { config }
    }

    pub fn execute_with(&self, mut on_event: impl FnMut(VerifyEvent<'_>)) -> Result<VerifyReport> {
        let cfg = &self.config;
        if cfg.batch_size == 0 {
            bail!("Batch size must be at least 1");
        }

        // ── Load ──────────────────────────────────────────────────────────────
        on_event(VerifyEvent::Loading);
        let session = InferenceSession::open(&cfg.model)?;
        let input   = session.inputs()[0].clone();
        on_event(VerifyEvent::Loaded { input: &input });

        tracing::debug!(
            "Opset {}, declared output '{}'",
            session.opset(),
            session.outputs()[0].name
        );
        let contract = ShapeContract::ecg();
        if ShapeContract::from_dims(&input.dims).as_ref() != Some(&contract) {
            tracing::warn!("Declared input shape {} differs from {}", input.shape_display(), contract);
        }
        if session.inputs().len() > 1 {
            tracing::warn!(
                "Artifact declares {} inputs; only '{}' is fed",
                session.inputs().len(),
                input.name
            );
        }

        // ── Probe ─────────────────────────────────────────────────────────────
        let probe    = ProbeTensor::for_contract(&contract, cfg.batch_size, &mut rand::thread_rng());

        on_event(VerifyEvent::Running);
        let outputs = session.run(&probe)?;
        let first   = outputs
            .first()
            .ok_or_else(|| PipelineError::Inference("model produced no outputs".to_string()))?;
        let output_shape = first.shape().to_vec();
        on_event(VerifyEvent::Predicted { output_shape: &output_shape });

        let report = VerifyReport {
            input,
            batch_size: cfg.batch_size,
            output_shape,
            output_count: outputs.len(),
        };
        if !report.is_healthy() {
            tracing::warn!(
                "Output shape {:?} differs from expected {:?}",
                report.output_shape,
                report.expected()
            );
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::export_use_case::{ExportConfig, ExportUseCase};
    use crate::domain::contract::{ArchitectureDescriptor, BATCH_AXIS_NAME, INPUT_NAME, OPSET_VERSION, OUTPUT_NAME};
    use crate::infra::checkpoint::CheckpointManager;
    use crate::infra::onnx::{lower::{attr_int, GraphBuilder}, write_model};
    use crate::ml::model::{LstmAutoencoder, LstmAutoencoderConfig};
    use burn::backend::NdArray;
    use std::path::Path;
    use tempfile::tempdir;

    fn export_small(dir: &Path) -> PathBuf {
        let arch  = ArchitectureDescriptor { hidden_size: 4, ..Default::default() };
        let cfg   = LstmAutoencoderConfig::from(&arch);
        let model: LstmAutoencoder<NdArray<f32>> = cfg.init(&Default::default());
        let checkpoint = dir.join("trained.mpk");
        CheckpointManager::new(&checkpoint).save(&model, &cfg).unwrap();

        let output = dir.join(ARTIFACT_FILE);
        ExportUseCase::new(ExportConfig { checkpoint, output: output.clone(), architecture: arch })
            .execute_with(|_| {})
            .unwrap();
        output
    }

    fn export_from_state_dict(dir: &Path) -> PathBuf {
        let checkpoint = PathBuf::from(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/tests/fixtures/lstm_autoencoder_h4.pth"
        ));
        let arch   = ArchitectureDescriptor { hidden_size: 4, ..Default::default() };
        let output = dir.join(ARTIFACT_FILE);
        ExportUseCase::new(ExportConfig { checkpoint, output: output.clone(), architecture: arch })
            .execute_with(|_| {})
            .unwrap();
        output
    }

    /// An artifact that accepts the ECG input but doubles the feature axis.
    fn write_widening_artifact(path: &Path) {
        let mut graph = GraphBuilder::new("widening");
        let input = graph.input(INPUT_NAME, &ShapeContract::ecg());
        graph.node(
            "Concat",
            &[input.as_str(), input.as_str()],
            OUTPUT_NAME,
            vec![attr_int("axis", 2)],
        );
        graph.output(OUTPUT_NAME, &ShapeContract::batched(BATCH_AXIS_NAME, [2500_usize, 2]));
        write_model(&graph.finish(OPSET_VERSION), path).unwrap();
    }

    #[test]
    fn test_exported_artifact_is_healthy() {
        let dir    = tempdir().unwrap();
        let model  = export_small(dir.path());
        let report = VerifyUseCase::new(VerifyConfig { model, batch_size: 1 }).execute_with(|_| {}).unwrap();

        assert!(report.is_healthy());
        assert_eq!(report.input.name, "input");
        assert_eq!(report.input.shape_display(), "['batch_size', 2500, 1]");
        assert_eq!(report.output_shape, vec![1, 2500, 1]);
        assert_eq!(report.output_count, 1);
    }

    #[test]
    fn test_state_dict_export_verifies() {
        let dir    = tempdir().unwrap();
        let model  = export_from_state_dict(dir.path());
        let report = VerifyUseCase::new(VerifyConfig { model, batch_size: 2 }).execute_with(|_| {}).unwrap();

        assert!(report.is_healthy());
        assert_eq!(report.input.shape_display(), "['batch_size', 2500, 1]");
        assert_eq!(report.output_shape, vec![2, 2500, 1]);
    }

    #[test]
    fn test_larger_batch_is_healthy() {
        let dir    = tempdir().unwrap();
        let model  = export_small(dir.path());
        let report = VerifyUseCase::new(VerifyConfig { model, batch_size: 2 }).execute_with(|_| {}).unwrap();
        assert!(report.is_healthy());
        assert_eq!(report.output_shape, vec![2, 2500, 1]);
    }

    #[test]
    fn test_shape_mismatch_is_reported_not_raised() {
        let dir  = tempdir().unwrap();
        let path = dir.path().join(ARTIFACT_FILE);
        write_widening_artifact(&path);

        let report = VerifyUseCase::new(VerifyConfig { model: path, batch_size: 1 }).execute_with(|_| {}).unwrap();
        assert!(!report.is_healthy());
        assert_eq!(report.output_shape, vec![1, 2500, 2]);
    }

    #[test]
    fn test_health_follows_contract_at_batch_size() {
        let report = VerifyReport {
            input:        TensorSpec::new(INPUT_NAME, ShapeContract::ecg().dims()),
            batch_size:   3,
            output_shape: vec![3, 2500, 1],
            output_count: 1,
        };
        assert!(report.is_healthy());
        assert_eq!(report.expected(), vec![3, 2500, 1]);

        let wrong_batch = VerifyReport { output_shape: vec![1, 2500, 1], ..report.clone() };
        assert!(!wrong_batch.is_healthy());
        let wrong_rank = VerifyReport { output_shape: vec![3, 2500], ..report };
        assert!(!wrong_rank.is_healthy());
    }

    #[test]
    fn test_missing_artifact_never_runs() {
        let dir = tempdir().unwrap();
        let config = VerifyConfig { model: dir.path().join(ARTIFACT_FILE), batch_size: 1 };

        let mut events = Vec::new();
        let err = VerifyUseCase::new(config)
            .execute_with(|e| events.push(format!("{e:?}")))
            .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::ArtifactLoad { .. })
        ));
        assert_eq!(events, vec!["Loading".to_string()]);
    }

    #[test]
    fn test_zero_batch_rejected() {
        let config = VerifyConfig { batch_size: 0, ..Default::default() };
        assert!(VerifyUseCase::new(config).execute_with(|_| {}).is_err());
    }
}
