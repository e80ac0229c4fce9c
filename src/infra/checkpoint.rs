// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Restores trained parameters into a freshly built
// LstmAutoencoder. Two on-disk formats are understood:
//
//   *.pth / *.pt  — a PyTorch state dict, read with burn-store's
//                   PytorchStore. Keys are remapped from torch's
//                   flat naming to the module tree:
//                     encoder.weight_ih_l0 → encoder.layers.0.weight_ih
//   *.mpk         — a burn record written by `save`, with a JSON
//                   sidecar holding the architecture descriptor
//
// The file is read once; loading fails if anything about it
// does not fit the architecture. After loading, every parameter
// shape is checked against the config because a record load
// alone replaces tensors without comparing shapes.

use anyhow::{bail, Context, Result};
use std::{
    fs,
    path::{Path, PathBuf},
};
use burn::{
    prelude::*,
    record::{FullPrecisionSettings, NamedMpkFileRecorder, Recorder},
};
use burn_store::{ModuleSnapshot, PytorchStore};

use crate::domain::{contract::ArchitectureDescriptor, error::PipelineError};
use crate::ml::model::{LstmAutoencoder, LstmAutoencoderConfig};

/// torch `nn.LSTM` parameter names for both stages.
const STATE_DICT_KEY: &str = r"^(encoder|decoder)\.(weight_ih|weight_hh|bias_ih|bias_hh)_l(\d+)$";

/// Where those parameters live in the burn module tree.
const MODULE_KEY: &str = "${1}.layers.${3}.${2}";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckpointFormat {
    PyTorch,
    Burn,
}

impl CheckpointFormat {
    /// Pick the format from the file extension.
    pub fn detect(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?;
        if name.ends_with(".pth") || name.ends_with(".pt") {
            Some(Self::PyTorch)
        } else if name.ends_with(".mpk") {
            Some(Self::Burn)
        } else {
            None
        }
    }
}

/// Loads (and, for the burn format, saves) one checkpoint file.
pub struct CheckpointManager {
    path: PathBuf,
}

impl CheckpointManager {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn format(&self) -> Result<CheckpointFormat, PipelineError> {
        CheckpointFormat::detect(&self.path).ok_or_else(|| {
            PipelineError::checkpoint_load(
                &self.path,
                "unrecognised extension (expected .pth, .pt or .mpk)",
            )
        })
    }

    /// Load parameters into `model`.
    ///
    /// Returns `MissingCheckpoint` when the file does not exist and
    /// `CheckpointLoad` for everything else that goes wrong.
    pub fn load<B: Backend>(
        &self,
        model:  LstmAutoencoder<B>,
        config: &LstmAutoencoderConfig,
        device: &B::Device,
    ) -> Result<LstmAutoencoder<B>, PipelineError> {
        if !self.path.exists() {
            return Err(PipelineError::MissingCheckpoint { path: self.path.clone() });
        }

        let format = self.format()?;
        tracing::debug!("Loading {:?} checkpoint from '{}'", format, self.path.display());

        let model = match format {
            CheckpointFormat::PyTorch => self.load_pytorch(model)?,
            CheckpointFormat::Burn    => self.load_burn(model, config, device)?,
        };

        let problems = model.shape_mismatches(config);
        if !problems.is_empty() {
            return Err(PipelineError::checkpoint_load(&self.path, problems.join("; ")));
        }

        tracing::debug!("Checkpoint fits {}", config.descriptor());
        Ok(model)
    }

    fn load_pytorch<B: Backend>(
        &self,
        mut model: LstmAutoencoder<B>,
    ) -> Result<LstmAutoencoder<B>, PipelineError> {
        let mut store = PytorchStore::from_file(&self.path)
            .with_key_remapping(STATE_DICT_KEY, MODULE_KEY);

        model
            .load_from(&mut store)
            .map_err(|e| PipelineError::checkpoint_load(&self.path, e))?;
        Ok(model)
    }

    fn load_burn<B: Backend>(
        &self,
        model:  LstmAutoencoder<B>,
        config: &LstmAutoencoderConfig,
        device: &B::Device,
    ) -> Result<LstmAutoencoder<B>, PipelineError> {
        // The sidecar names the architecture the record was saved for,
        // which gives a clearer message than a shape mismatch
        if let Some(saved) = self.read_descriptor()? {
            let expected = config.descriptor();
            if saved != expected {
                return Err(PipelineError::checkpoint_load(
                    &self.path,
                    format!("checkpoint was saved for {saved}, expected {expected}"),
                ));
            }
        }

        let record = NamedMpkFileRecorder::<FullPrecisionSettings>::new()
            .load(self.path.clone(), device)
            .map_err(|e| PipelineError::checkpoint_load(&self.path, e))?;
        Ok(model.load_record(record))
    }

    /// Save `model` as a burn record plus its descriptor sidecar.
    /// Only the `.mpk` format can be written.
    pub fn save<B: Backend>(
        &self,
        model:  &LstmAutoencoder<B>,
        config: &LstmAutoencoderConfig,
    ) -> Result<()> {
        if self.format()? != CheckpointFormat::Burn {
            bail!("can only save burn (.mpk) checkpoints, got '{}'", self.path.display());
        }
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Cannot create '{}'", parent.display()))?;
        }

        NamedMpkFileRecorder::<FullPrecisionSettings>::new()
            .record(model.clone().into_record(), self.path.clone())
            .with_context(|| format!("Failed to save checkpoint to '{}'", self.path.display()))?;

        let sidecar = self.descriptor_path();
        let json    = serde_json::to_string_pretty(&config.descriptor())?;
        fs::write(&sidecar, json)
            .with_context(|| format!("Cannot write '{}'", sidecar.display()))?;

        tracing::debug!("Saved checkpoint to '{}'", self.path.display());
        Ok(())
    }

    fn descriptor_path(&self) -> PathBuf {
        self.path.with_extension("json")
    }

    fn read_descriptor(&self) -> Result<Option<ArchitectureDescriptor>, PipelineError> {
        let path = self.descriptor_path();
        if !path.exists() {
            return Ok(None);
        }
        let json = fs::read_to_string(&path)
            .map_err(|e| PipelineError::checkpoint_load(&path, e))?;
        serde_json::from_str(&json)
            .map(Some)
            .map_err(|e| PipelineError::checkpoint_load(&path, e))
    }
}
