//! Surface and feature-edge mesh files for a classified model.

use snappystep_algo::configure::{edge_mesh_file, refinement_region_name};
use snappystep_algo::Classification;
use snappystep_core::config::SetupConfig;
use snappystep_core::kernel::{CadKernel, Dim, KernelError, Tag};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// One output file and the named groups written into it.
#[derive(Debug, Clone, PartialEq)]
pub struct Export {
    pub path: PathBuf,
    pub dim: Dim,
    pub groups: Vec<(String, Vec<Tag>)>,
}

impl Export {
    fn single(path: PathBuf, dim: Dim, name: &str, tags: Vec<Tag>) -> Self {
        Self {
            path,
            dim,
            groups: vec![(name.to_string(), tags)],
        }
    }
}

/// Every file the run writes under `geometry_dir`, in write order. Groups
/// without entities are dropped, and so are files left without groups.
pub fn plan_exports(
    classification: &Classification,
    step_name: &str,
    geometry_dir: &Path,
    setup: &SetupConfig,
) -> Vec<Export> {
    let patches = classification.exterior_patches();
    let shared: Vec<(&str, &Vec<Tag>, &BTreeSet<Tag>)> = classification
        .interfaces
        .iter()
        .map(|i| (i.name.as_str(), &i.face_tags, &i.edge_tags))
        .chain(
            classification
                .baffles
                .iter()
                .map(|b| (b.name.as_str(), &b.face_tags, &b.edge_tags)),
        )
        .collect();

    // 1. Exterior patches share one file
    let mut exports = vec![Export {
        path: geometry_dir.join(format!("{step_name}.stl")),
        dim: Dim::Surface,
        groups: patches
            .iter()
            .map(|(name, (faces, _))| (name.clone(), faces.clone()))
            .collect(),
    }];

    // 2. One file per interface and baffle
    for (name, faces, _) in &shared {
        exports.push(Export::single(
            geometry_dir.join(format!("{name}.stl")),
            Dim::Surface,
            name,
            faces.to_vec(),
        ));
    }

    // 3. Feature edges
    if setup.edge_mesh {
        let edge_sets = patches
            .iter()
            .map(|(name, (_, edges))| (name.as_str(), edges))
            .chain(shared.iter().map(|(name, _, edges)| (*name, *edges)));
        for (name, edges) in edge_sets {
            exports.push(Export::single(
                geometry_dir.join(edge_mesh_file(name)),
                Dim::Curve,
                name,
                edges.iter().copied().collect(),
            ));
        }
    }

    // 4. Whole-volume boundaries for refinement regions
    if setup.refinement_regions {
        for volume in &classification.volumes {
            let region = refinement_region_name(&volume.name);
            exports.push(Export::single(
                geometry_dir.join(format!("{region}.stl")),
                Dim::Surface,
                &region,
                volume.boundary_faces(),
            ));
        }
    }

    for export in &mut exports {
        export.groups.retain(|(_, tags)| !tags.is_empty());
    }
    exports.retain(|export| !export.groups.is_empty());
    exports
}

/// Deletes previously generated files. Failures are reported per file and
/// do not stop the run. Returns how many files were removed.
pub fn remove_stale<'a>(paths: impl IntoIterator<Item = &'a Path>) -> usize {
    let mut removed = 0;
    for path in paths {
        if !path.is_file() {
            continue;
        }
        match std::fs::remove_file(path) {
            Ok(()) => removed += 1,
            Err(err) => warn!(path = %path.display(), error = %err, "could not remove old output"),
        }
    }
    debug!(removed, "removed old outputs");
    removed
}

pub fn write_exports(kernel: &mut dyn CadKernel, exports: &[Export]) -> Result<(), KernelError> {
    for export in exports {
        kernel.clear_groups();
        for (name, tags) in &export.groups {
            kernel.add_group(export.dim, tags, name)?;
        }
        kernel.write_groups(&export.path)?;
        info!(path = %export.path.display(), groups = export.groups.len(), "wrote mesh");
    }
    kernel.clear_groups();
    Ok(())
}
