// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// This is the entry point for all user interaction.
// It uses the `clap` crate to parse command line arguments.
// All business logic is delegated to Layer 2 (application);
// this layer only turns progress events into console lines.
//
// Two commands are supported:
//   1. `export` — converts the checkpoint into ecg_model.onnx
//   2. `verify` — loads the artifact and runs a test prediction
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use std::io::{self, Write};

use anyhow::Result;
use clap::Parser;
use commands::{Commands, ExportArgs, VerifyArgs};

use crate::application::{
    export_use_case::{ExportEvent, ExportStep, ExportUseCase},
    verify_use_case::{VerifyEvent, VerifyUseCase},
};
use crate::domain::{contract::format_shape, shape::ShapeContract};

#[derive(Parser, Debug)]
#[command(
    name = "ecg-onnx",
    version,
    about = "Convert the ECG LSTM autoencoder to ONNX, then check the artifact runs."
)]
pub struct Cli {
    /// The subcommand to run (export or verify)
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Export(args) => run_export(args),
            Commands::Verify(args) => run_verify(args),
        }
    }
}

/// Print without a newline so "Done." lands on the same line.
fn print_pending(line: &str) {
    print!("{line}");
    let _ = io::stdout().flush();
}

fn run_export(args: ExportArgs) -> Result<()> {
    let use_case   = ExportUseCase::new(args.into());
    let checkpoint = use_case.config().checkpoint.display().to_string();
    let probe      = format_shape(&ShapeContract::ecg().concrete(1));

    tracing::info!("Exporting '{}'", checkpoint);
    println!("--- STARTING CONVERSION PROCESS ---");

    let result = use_case.execute_with(|event| match event {
        ExportEvent::Started(step) => {
            let n = step.number();
            let total = ExportStep::COUNT;
            match step {
                ExportStep::InitializeModel => {
                    print_pending(&format!("[{n}/{total}] Initializing model architecture... "))
                }
                ExportStep::LoadWeights => {
                    print_pending(&format!("[{n}/{total}] Loading weights from '{checkpoint}'... "))
                }
                ExportStep::CreateDummyInput => {
                    print_pending(&format!("[{n}/{total}] Creating dummy input tensor {probe}... "))
                }
                ExportStep::Serialize => {
                    println!("[{n}/{total}] Exporting to ONNX (This may take a moment)...")
                }
            }
        }
        ExportEvent::Finished(ExportStep::Serialize) => {}
        ExportEvent::Finished(_) => println!("Done."),
    });

    let report = match result {
        Ok(report) => report,
        Err(e) => {
            // Terminate the dangling progress line before the error is shown
            println!();
            return Err(e);
        }
    };

    tracing::debug!("Artifact is {} bytes", report.bytes);
    println!();
    println!("SUCCESS! Model saved to '{}'", report.output.display());
    println!("Time taken: {:.2} seconds", report.elapsed.as_secs_f64());
    Ok(())
}

fn run_verify(args: VerifyArgs) -> Result<()> {
    let use_case = VerifyUseCase::new(args.into());

    let report = use_case.execute_with(|event| match event {
        VerifyEvent::Loading => println!("Loading ONNX model..."),
        VerifyEvent::Loaded { input } => {
            println!("Model loaded successfully!");
            println!("Model expects Input Name: '{}'", input.name);
            println!("Model expects Input Shape: {}", input.shape_display());
        }
        VerifyEvent::Running => println!("Running test prediction..."),
        VerifyEvent::Predicted { output_shape } => {
            println!("Prediction successful!");
            println!("Output Shape: {}", format_shape(output_shape));
        }
    })?;

    tracing::debug!("Model returned {} output(s)", report.output_count);
    println!();
    if report.is_healthy() {
        println!("✅ SUCCESS: The ONNX model is healthy and ready for Android.");
    } else {
        println!("❌ WARNING: Output shape mismatch. Something is wrong.");
    }
    Ok(())
}
