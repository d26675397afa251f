use anyhow::{Context, Result};
use clap::Parser;
use snappystep::RunOptions;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "snappystep")]
#[command(about = "Prepare STEP geometry for snappyHexMesh: surface meshes, dictionaries and scripts.")]
struct Cli {
    /// STEP file to read when constant/(geometry|triSurface) holds none or several.
    #[arg(long)]
    file: Option<PathBuf>,
    /// Show the generated surface mesh after export.
    #[arg(short = 'v', long)]
    view_mesh: bool,
    /// Show faces and volumes before meshing and ask whether to continue.
    #[arg(long)]
    view_faces: bool,
    /// Write a template system/snappyStepDict and exit.
    #[arg(long)]
    init: bool,
    /// Write the classification as JSON.
    #[arg(long)]
    report: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let root = std::env::current_dir().context("current directory")?;

    if cli.init {
        let path = snappystep::write_template(&root)?;
        info!(path = %path.display(), "wrote configuration template");
        return Ok(());
    }

    let options = RunOptions {
        file: cli.file,
        view_faces: cli.view_faces,
        view_mesh: cli.view_mesh,
        report: cli.report,
    };
    snappystep::run(&root, &options)?;
    Ok(())
}
