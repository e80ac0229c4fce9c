// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the two subcommands: `export` and `verify`
// and all their configurable flags. Every flag defaults to the
// fixed file names, so running either command bare reproduces
// the standard conversion.
//
// Reference: Rust Book §12 (Building a CLI Program)

use std::path::PathBuf;

use clap::{Args, Subcommand};

use crate::application::{export_use_case::ExportConfig, verify_use_case::VerifyConfig};
use crate::domain::contract::{ArchitectureDescriptor, ARTIFACT_FILE, CHECKPOINT_FILE};

/// The two top-level subcommands available to the user
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Convert the trained PyTorch checkpoint into an ONNX artifact
    Export(ExportArgs),

    /// Load an ONNX artifact and run one test prediction
    Verify(VerifyArgs),
}

/// All arguments for the `export` command.
#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Trained weights (.pth/.pt state dict, or .mpk burn record)
    #[arg(long, default_value = CHECKPOINT_FILE)]
    pub checkpoint: PathBuf,

    /// Where to write the ONNX artifact
    #[arg(long, default_value = ARTIFACT_FILE)]
    pub output: PathBuf,
}

/// Convert CLI ExportArgs into the application-layer ExportConfig.
/// The architecture is always the built-in one.
impl From<ExportArgs> for ExportConfig {
    fn from(a: ExportArgs) -> Self {
        ExportConfig {
            checkpoint:   a.checkpoint,
            output:       a.output,
            architecture: ArchitectureDescriptor::default(),
        }
    }
}

/// All arguments for the `verify` command
#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// ONNX artifact to check
    #[arg(long, default_value = ARTIFACT_FILE)]
    pub model: PathBuf,

    /// Batch size of the random probe
    #[arg(long, default_value_t = 1)]
    pub batch_size: usize,
}

impl From<VerifyArgs> for VerifyConfig {
    fn from(a: VerifyArgs) -> Self {
        VerifyConfig { model: a.model, batch_size: a.batch_size }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use clap::Parser;

    #[test]
    fn test_export_defaults_to_fixed_names() {
        let cli = Cli::try_parse_from(["ecg-onnx", "export"]).unwrap();
        let Commands::Export(args) = cli.command else { panic!("expected export") };
        let config = ExportConfig::from(args);
        assert_eq!(config.checkpoint, PathBuf::from("LSTM_NSR_autoencoder_10s.pth"));
        assert_eq!(config.output, PathBuf::from("ecg_model.onnx"));
        assert_eq!(config.architecture, ArchitectureDescriptor::default());
    }

    #[test]
    fn test_verify_flags() {
        let cli = Cli::try_parse_from(["ecg-onnx", "verify", "--model", "m.onnx", "--batch-size", "4"])
            .unwrap();
        let Commands::Verify(args) = cli.command else { panic!("expected verify") };
        let config = VerifyConfig::from(args);
        assert_eq!(config.model, PathBuf::from("m.onnx"));
        assert_eq!(config.batch_size, 4);
    }

    #[test]
    fn test_architecture_is_not_configurable() {
        assert!(Cli::try_parse_from(["ecg-onnx", "export", "--hidden-size", "64"]).is_err());
        assert!(Cli::try_parse_from(["ecg-onnx", "export", "--num-layers", "3"]).is_err());
    }

    #[test]
    fn test_unknown_subcommand_rejected() {
        assert!(Cli::try_parse_from(["ecg-onnx", "train"]).is_err());
    }
}
