//! OpenFOAM case layout: where geometry lives and which STEP file to read.

use snappystep_core::config::CONFIG_RELATIVE_PATH;
use snappystep_core::names::{is_valid_name, validated_label};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

/// Geometry directories, in lookup order.
pub const GEOMETRY_DIRS: [&str; 2] = ["constant/geometry", "constant/triSurface"];

const STEP_EXTENSIONS: [&str; 4] = ["stp", "step", "STP", "STEP"];

#[derive(Debug, Error)]
pub enum PreconditionError {
    #[error("no constant/geometry or constant/triSurface directory under {root:?}\nHint: run from an OpenFOAM case root directory.")]
    NotACase { root: PathBuf },
    #[error("no STEP file found in {dir:?}\nHint: place one .stp/.step file there or pass --file.")]
    NoGeometry { dir: PathBuf },
    #[error("more than one STEP file found in {dir:?}: {files:?}\nHint: remove or rename the other files, or pass --file.")]
    AmbiguousGeometry { dir: PathBuf, files: Vec<String> },
    #[error("{path:?} is not a file")]
    NotAFile { path: PathBuf },
    #[error("could not list {dir:?}: {source}")]
    Io {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone)]
pub struct CaseLayout {
    pub root: PathBuf,
    pub geometry_dir: PathBuf,
}

impl CaseLayout {
    pub fn discover(root: &Path) -> Result<Self, PreconditionError> {
        let geometry_dir = GEOMETRY_DIRS
            .iter()
            .map(|dir| root.join(dir))
            .find(|dir| dir.is_dir())
            .ok_or_else(|| PreconditionError::NotACase {
                root: root.to_path_buf(),
            })?;
        Ok(Self {
            root: root.to_path_buf(),
            geometry_dir,
        })
    }

    pub fn system_dir(&self) -> PathBuf {
        self.root.join("system")
    }

    pub fn config_path(&self) -> PathBuf {
        self.root.join(CONFIG_RELATIVE_PATH)
    }

    /// The explicit file if given (relative to the case root), else the only
    /// STEP file in the geometry directory.
    pub fn find_geometry_file(&self, explicit: Option<&Path>) -> Result<PathBuf, PreconditionError> {
        if let Some(file) = explicit {
            let path = self.root.join(file);
            if !path.is_file() {
                return Err(PreconditionError::NotAFile { path });
            }
            return Ok(path);
        }

        let entries = std::fs::read_dir(&self.geometry_dir).map_err(|source| {
            PreconditionError::Io {
                dir: self.geometry_dir.clone(),
                source,
            }
        })?;
        let mut files: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().is_file())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter(|name| is_step_file(name))
            .collect();
        files.sort();

        match files.as_slice() {
            [] => Err(PreconditionError::NoGeometry {
                dir: self.geometry_dir.clone(),
            }),
            [only] => {
                info!(file = %only, "found geometry file");
                Ok(self.geometry_dir.join(only))
            }
            _ => Err(PreconditionError::AmbiguousGeometry {
                dir: self.geometry_dir.clone(),
                files,
            }),
        }
    }
}

fn is_step_file(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| STEP_EXTENSIONS.contains(&e))
        .unwrap_or(false)
}

/// Output stem for a geometry file: its name up to the first dot, validated
/// like any other entity name. Falls back to `geometry` when nothing is left.
pub fn step_name(path: &Path) -> String {
    let stem = path
        .file_name()
        .and_then(|n| n.to_str())
        .and_then(|n| n.split('.').next())
        .unwrap_or_default();
    if is_valid_name(stem) {
        return stem.to_string();
    }
    let name = validated_label(Some(stem)).unwrap_or_else(|| "geometry".to_string());
    warn!(file = %path.display(), name = %name, "geometry file name is not a valid name, using a validated one");
    name
}
