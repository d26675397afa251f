//! Export driver: reads the STEP model of an OpenFOAM case and writes the
//! surface meshes, dictionaries and scripts snappyHexMesh needs.

pub mod block_mesh;
pub mod case;
pub mod export;
pub mod preview;
pub mod scripts;

pub use case::{CaseLayout, PreconditionError};

use anyhow::{anyhow, bail, Context, Result};
use snappystep_algo::configure::build_snappy_dict;
use snappystep_algo::prepare_model;
use snappystep_core::config::{Config, CONFIG_RELATIVE_PATH};
use snappystep_core::foam::{self, FoamDict};
use snappystep_core::kernel::CadKernel;
use snappystep_kernel::FacetedKernel;
use std::path::{Path, PathBuf};
use tracing::info;

pub const SNAPPY_DICT: &str = "snappyHexMeshDict";
pub const BLOCK_MESH_DICT: &str = "blockMeshDict";
pub const MESH_QUALITY_DICT: &str = "meshQualityDict";

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// STEP file to read instead of searching the geometry directory.
    pub file: Option<PathBuf>,
    /// Preview faces and volumes and ask before meshing.
    pub view_faces: bool,
    /// Preview the surface mesh once everything is written.
    pub view_mesh: bool,
    /// Where to write the JSON classification report.
    pub report: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub step_file: PathBuf,
    pub default_volume: String,
    /// Every file written, in write order.
    pub written: Vec<PathBuf>,
}

/// Writes the configuration template, replacing any existing one.
pub fn write_template(root: &Path) -> Result<PathBuf> {
    let path = root.join(CONFIG_RELATIVE_PATH);
    foam::write_file(&path, &Config::template(), "snappyStepDict")
        .with_context(|| format!("write template: {path:?}"))?;
    Ok(path)
}

pub fn run(root: &Path, options: &RunOptions) -> Result<RunSummary> {
    // 1. Case, configuration and previous dictionary
    let case = CaseLayout::discover(root)?;
    let config = Config::read(root)?;
    info!(path = %case.config_path().display(), "loaded configuration");
    let step_file = case.find_geometry_file(options.file.as_deref())?;
    let step_name = case::step_name(&step_file);
    let system = case.system_dir();
    let snappy_path = system.join(SNAPPY_DICT);
    let prior = foam::read_file(&snappy_path)
        .with_context(|| format!("read previous dictionary: {snappy_path:?}"))?;
    if config.setup.edge_mesh {
        info!("edge mesh files will be generated");
    }

    // 2. Geometry
    let mut kernel = FacetedKernel::new();
    kernel.import_shapes(&step_file, config.surface_mesh.scaling)?;
    let prepared = prepare_model(&mut kernel, &config)?;
    let default_volume = prepared
        .default_volume_name()
        .ok_or_else(|| anyhow!("no volumes found in {step_file:?}"))?
        .to_string();
    let model_box = kernel.model_bounding_box();

    if options.view_faces {
        let path = preview::write_face_preview(&mut kernel, &prepared.classification)?;
        preview::open_viewer(&path);
        let stdin = std::io::stdin();
        let proceed = preview::ask_yes_no(
            "Would you like to continue?",
            &mut stdin.lock(),
            &mut std::io::stdout(),
        )
        .context("read answer")?;
        if !proceed {
            bail!("stopped after face preview");
        }
    }

    // 3. Surface meshes
    kernel.generate_surface_mesh(&config.mesh_options())?;
    let exports = export::plan_exports(
        &prepared.classification,
        &step_name,
        &case.geometry_dir,
        &config.setup,
    );
    export::remove_stale(exports.iter().map(|e| e.path.as_path()));
    export::write_exports(&mut kernel, &exports)?;
    let mut written: Vec<PathBuf> = exports.into_iter().map(|e| e.path).collect();

    // 4. Dictionaries
    let snappy = build_snappy_dict(
        &prepared.classification,
        prepared.default_volume,
        &step_name,
        &config,
        prior.as_ref(),
    );
    write_dict(&snappy_path, &snappy, SNAPPY_DICT, &mut written)?;
    if config.setup.generate_block_mesh_dict {
        if let Some(size) = config.setup.background_mesh_size {
            let dict = block_mesh::block_mesh_dict(&model_box, size);
            write_dict(&system.join(BLOCK_MESH_DICT), &dict, BLOCK_MESH_DICT, &mut written)?;
        }
    }
    let quality_path = system.join(MESH_QUALITY_DICT);
    if !quality_path.is_file() {
        let dict = block_mesh::mesh_quality_dict();
        write_dict(&quality_path, &dict, MESH_QUALITY_DICT, &mut written)?;
    }

    // 5. Scripts
    written.extend(scripts::write_scripts(root, &default_volume)?);

    if let Some(report_path) = &options.report {
        let path = root.join(report_path);
        let source = step_file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let report =
            prepared
                .classification
                .report(&source, kernel.counts(), prepared.default_volume);
        let json = serde_json::to_string_pretty(&report).context("serialize report")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create report directory: {parent:?}"))?;
        }
        std::fs::write(&path, &json).with_context(|| format!("write report: {path:?}"))?;
    }

    if options.view_mesh {
        let path = preview::write_mesh_preview(&mut kernel, &prepared.classification)?;
        preview::open_viewer(&path);
    }

    info!(
        files = written.len(),
        default_volume = %default_volume,
        "all geometry files and scripts generated"
    );
    Ok(RunSummary {
        step_file,
        default_volume,
        written,
    })
}

fn write_dict(path: &Path, dict: &FoamDict, object: &str, written: &mut Vec<PathBuf>) -> Result<()> {
    foam::write_file(path, dict, object).with_context(|| format!("write {object}: {path:?}"))?;
    info!(path = %path.display(), "wrote dictionary");
    written.push(path.to_path_buf());
    Ok(())
}
