#![recursion_limit = "256"]

mod cli;
mod application;
mod domain;
mod ml;
mod infra;

use anyhow::Result;
use cli::Cli;
use clap::Parser;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("ecg_onnx=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    if let Err(e) = cli.run() {
        eprintln!("{e:#}");
        std::process::exit(1);
    }
    Ok(())
}
