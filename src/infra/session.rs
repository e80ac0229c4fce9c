// ============================================================
// Layer 6 — Inference Session (tract)
// ============================================================
// A loaded, ready-to-run artifact. Opening a session:
//
//   1. decodes the ModelProto once, so the declared I/O
//      contract is read from the file rather than assumed
//   2. rejects default-domain opsets we do not support
//   3. translates that same proto into a tract model
//
// Every one of those failures is an ArtifactLoad error.
//
// tract plans are specialised to concrete input shapes, so
// `run` pins the batch axis to the probe's batch size each
// call. That is what makes the symbolic batch axis usable with
// any batch at inference time.

use std::path::{Path, PathBuf};

use tract_onnx::prelude::*;
use tract_onnx::prelude::tract_ndarray::{ArrayD, IxDyn};

use crate::domain::{contract::TensorSpec, error::PipelineError, probe::ProbeTensor};
use crate::infra::onnx;

pub struct InferenceSession {
    path:    PathBuf,
    opset:   i64,
    inputs:  Vec<TensorSpec>,
    outputs: Vec<TensorSpec>,
    model:   InferenceModel,
}

impl InferenceSession {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, PipelineError> {
        let path      = path.as_ref();
        let framework = tract_onnx::onnx();
        let proto     = onnx::read_model(&framework, path)?;
        let opset     = onnx::check_opset(&proto, path)?;

        let inputs  = onnx::declared_inputs(&proto);
        let outputs = onnx::declared_outputs(&proto);
        if inputs.is_empty() {
            return Err(PipelineError::artifact_load(path, "graph declares no inputs"));
        }
        if outputs.is_empty() {
            return Err(PipelineError::artifact_load(path, "graph declares no outputs"));
        }

        let model = framework
            .model_for_proto_model(&proto)
            .map_err(|e| PipelineError::artifact_load(path, format!("{e:#}")))?;

        tracing::debug!(
            "Opened '{}' (opset {}, {} input(s), {} output(s))",
            path.display(),
            opset,
            inputs.len(),
            outputs.len()
        );

        Ok(Self { path: path.to_path_buf(), opset, inputs, outputs, model })
    }

    pub fn opset(&self) -> i64 {
        self.opset
    }

    /// Declared inputs, in graph order.
    pub fn inputs(&self) -> &[TensorSpec] {
        &self.inputs
    }

    /// Declared outputs, in graph order.
    pub fn outputs(&self) -> &[TensorSpec] {
        &self.outputs
    }

    /// Feed `probe` to the first declared input and return every output.
    pub fn run(&self, probe: &ProbeTensor) -> Result<Vec<ArrayD<f32>>, PipelineError> {
        tracing::debug!(
            "Running '{}' with input '{}' of shape {:?}",
            self.path.display(),
            self.inputs[0].name,
            probe.shape()
        );
        self.run_plan(probe)
            .map_err(|e| PipelineError::Inference(format!("{e:#}")))
    }

    fn run_plan(&self, probe: &ProbeTensor) -> TractResult<Vec<ArrayD<f32>>> {
        let mut model = self
            .model
            .clone()
            .with_input_fact(0, f32::fact(probe.shape().to_vec()).into())?;

        // Declared output dims still carry the batch symbol; let tract
        // infer them from the pinned input instead
        for ix in 0..model.outputs.len() {
            model = model.with_output_fact(ix, InferenceFact::default())?;
        }

        let plan = model.into_optimized()?.into_runnable()?;

        let input: Tensor = ArrayD::from_shape_vec(IxDyn(probe.shape()), probe.data().to_vec())?.into();
        let results = plan.run(tvec!(input.into()))?;

        results
            .iter()
            .map(|value| Ok(value.to_array_view::<f32>()?.to_owned()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::shape::ShapeContract;
    use crate::infra::onnx::{lower::lower_autoencoder, write_model};
    use crate::ml::model::{LstmAutoencoder, LstmAutoencoderConfig};
    use burn::backend::NdArray;
    use burn::tensor::{Tensor as BurnTensor, TensorData};
    use rand::{rngs::StdRng, SeedableRng};
    use tempfile::tempdir;

    type TestBackend = NdArray<f32>;

    fn export_small(dir: &Path) -> (PathBuf, LstmAutoencoder<TestBackend>) {
        let cfg   = LstmAutoencoderConfig::new().with_hidden_size(4);
        let model: LstmAutoencoder<TestBackend> = cfg.init(&Default::default());
        let proto = lower_autoencoder(&model, &cfg, &ShapeContract::ecg()).unwrap();
        let path  = dir.join("ecg_model.onnx");
        write_model(&proto, &path).unwrap();
        (path, model)
    }

    #[test]
    fn test_open_reports_declared_contract() {
        let dir = tempdir().unwrap();
        let (path, _) = export_small(dir.path());
        let session = InferenceSession::open(&path).unwrap();

        assert_eq!(session.opset(), 14);
        assert_eq!(session.inputs()[0].name, "input");
        assert_eq!(session.inputs()[0].shape_display(), "['batch_size', 2500, 1]");
        assert_eq!(session.outputs()[0].name, "output");
    }

    #[test]
    fn test_open_missing_artifact() {
        let dir = tempdir().unwrap();
        let err = InferenceSession::open(dir.path().join("ecg_model.onnx")).err().unwrap();
        assert!(matches!(err, PipelineError::ArtifactLoad { .. }));
    }

    #[test]
    fn test_batch_axis_is_dynamic() {
        let dir = tempdir().unwrap();
        let (path, _) = export_small(dir.path());
        let session  = InferenceSession::open(&path).unwrap();
        let contract = ShapeContract::ecg();
        let mut rng  = StdRng::seed_from_u64(3);

        for batch in [1, 3] {
            let probe   = ProbeTensor::for_contract(&contract, batch, &mut rng);
            let outputs = session.run(&probe).unwrap();
            assert_eq!(outputs.len(), 1);
            assert_eq!(outputs[0].shape(), contract.concrete(batch).as_slice());
        }
    }

    #[test]
    fn test_exported_graph_matches_native_forward() {
        let dir = tempdir().unwrap();
        let (path, model) = export_small(dir.path());
        let session = InferenceSession::open(&path).unwrap();

        let mut rng = StdRng::seed_from_u64(5);
        let probe   = ProbeTensor::for_contract(&ShapeContract::ecg(), 2, &mut rng);

        let onnx_out = session.run(&probe).unwrap().remove(0);

        let x = BurnTensor::<TestBackend, 3>::from_data(
            TensorData::new(probe.data().to_vec(), probe.shape().to_vec()),
            &Default::default(),
        );
        let native: Vec<f32> = model.forward(x).into_data().to_vec().unwrap();

        let max_diff = onnx_out
            .iter()
            .zip(native.iter())
            .map(|(a, b)| (a - b).abs())
            .fold(0.0_f32, f32::max);
        assert!(max_diff < 1e-4, "max abs difference {max_diff}");
    }
}
