//! Shell scripts that drive the OpenFOAM meshing utilities.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

pub const SPLIT_SCRIPT: &str = "snappyStepSplitMeshRegions.sh";
pub const GENERATE_SCRIPT: &str = "snappyStepGenerateMesh.sh";

pub fn split_commands(default_region: &str) -> Vec<String> {
    vec![format!(
        "splitMeshRegions -cellZones -defaultRegionName {default_region} -useFaceZones -overwrite"
    )]
}

pub fn generate_commands() -> Vec<String> {
    vec![
        "blockMesh".to_string(),
        "snappyHexMesh -overwrite".to_string(),
        format!("./{SPLIT_SCRIPT}"),
        "checkMesh".to_string(),
    ]
}

/// Writes both scripts into the case root and marks them executable.
pub fn write_scripts(root: &Path, default_region: &str) -> Result<Vec<PathBuf>> {
    let split = root.join(SPLIT_SCRIPT);
    write_script(&split, &split_commands(default_region))?;
    let generate = root.join(GENERATE_SCRIPT);
    write_script(&generate, &generate_commands())?;
    Ok(vec![split, generate])
}

fn write_script(path: &Path, commands: &[String]) -> Result<()> {
    let mut text = commands.join("\n");
    text.push('\n');
    std::fs::write(path, text).with_context(|| format!("write script: {path:?}"))?;
    make_executable(path)
}

#[cfg(unix)]
fn make_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
        .with_context(|| format!("chmod script: {path:?}"))
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> Result<()> {
    Ok(())
}
