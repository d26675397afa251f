//! snappyHexMeshDict synthesis and merging with a previous run's dictionary.

use crate::structs::Classification;
use snappystep_core::config::Config;
use snappystep_core::foam::{FoamDict, FoamValue};
use snappystep_core::geom::Vec3;
use tracing::debug;

/// Sections rebuilt from topology on every run; prior content is never copied.
const DERIVED_SECTIONS: [&str; 3] = ["geometry", "refinementSurfaces", "refinementRegions"];

/// Exterior regions whose name contains one of these become walls.
const WALL_MARKERS: [&str; 2] = ["default", "wall"];

pub fn edge_mesh_file(name: &str) -> String {
    format!("edges/{name}_edge.vtk")
}

pub fn refinement_region_name(volume: &str) -> String {
    format!("{volume}_refinement_region")
}

pub fn patch_type(patch: &str) -> &'static str {
    if WALL_MARKERS.iter().any(|m| patch.contains(m)) {
        "wall"
    } else {
        "patch"
    }
}

fn patch_info(kind: &str) -> FoamDict {
    FoamDict::new().with("type", FoamValue::word(kind))
}

fn tri_surface(file: String) -> FoamDict {
    FoamDict::new()
        .with("type", FoamValue::word("triSurfaceMesh"))
        .with("file", FoamValue::string(file))
}

fn number(v: f64) -> FoamValue {
    if v.fract() == 0.0 && v.abs() < i64::MAX as f64 {
        FoamValue::Int(v as i64)
    } else {
        FoamValue::Float(v)
    }
}

/// Read access to the previous dictionary, or nothing when refinements are
/// to be overwritten.
struct Prior<'a> {
    dict: Option<&'a FoamDict>,
}

impl<'a> Prior<'a> {
    fn surface(&self, path: &[&str]) -> Option<&'a FoamValue> {
        let mut full = vec!["castellatedMeshControls", "refinementSurfaces"];
        full.extend_from_slice(path);
        self.dict?.get_path(&full)
    }

    fn region_levels(&self, region: &str) -> Option<&'a FoamValue> {
        self.dict?.get_path(&[
            "castellatedMeshControls",
            "refinementRegions",
            region,
            "levels",
        ])
    }

    fn feature_level(&self, file: &str) -> Option<&'a FoamValue> {
        self.dict?
            .get_path(&["castellatedMeshControls", "features"])?
            .as_list()?
            .iter()
            .filter_map(FoamValue::as_dict)
            .find(|entry| entry.get("file").and_then(FoamValue::as_str) == Some(file))?
            .get("level")
    }
}

/// Builds the mesh-generation dictionary for one classified model.
///
/// `step_name` names the combined exterior surface file. With
/// `overwriteRefinements` off, levels and patch types found in `prior` win
/// over configured defaults, and scalar settings from `prior` outside the
/// derived sections are carried forward.
pub fn build_snappy_dict(
    classification: &Classification,
    default_volume: Option<usize>,
    step_name: &str,
    config: &Config,
    prior: Option<&FoamDict>,
) -> FoamDict {
    let setup = &config.setup;
    let merge = Prior {
        dict: prior.filter(|_| !setup.overwrite_refinements),
    };
    let surface_level = FoamValue::ints(&setup.default_surface_refinement);
    let level_or_default = |found: Option<&FoamValue>| {
        found.cloned().unwrap_or_else(|| surface_level.clone())
    };
    let patch_info_or = |found: Option<&FoamValue>, kind: &str| match found {
        Some(FoamValue::Dict(d)) => d.clone(),
        _ => patch_info(kind),
    };
    let switch = |key: &str, default: FoamValue| {
        prior
            .and_then(|p| p.get(key))
            .filter(|v| v.is_scalar())
            .cloned()
            .unwrap_or(default)
    };

    let mut dict = FoamDict::new()
        .with(
            "#includeEtc",
            FoamValue::string("caseDicts/mesh/generation/snappyHexMeshDict.cfg"),
        )
        .with("castellatedMesh", switch("castellatedMesh", FoamValue::switch(true)))
        .with("snap", switch("snap", FoamValue::switch(true)))
        .with("addLayers", switch("addLayers", FoamValue::switch(false)));

    let patches = classification.exterior_patches();

    // 1. geometry
    let mut geometry = FoamDict::new();
    let mut regions = FoamDict::new();
    for name in patches.keys() {
        regions.insert(
            name.clone(),
            FoamDict::new().with("name", FoamValue::word(name.clone())),
        );
    }
    geometry.insert(
        step_name,
        tri_surface(format!("{step_name}.stl")).with("regions", regions),
    );
    for interface in &classification.interfaces {
        geometry.insert(
            interface.name.clone(),
            tri_surface(format!("{}.stl", interface.name)),
        );
    }
    for baffle in &classification.baffles {
        geometry.insert(baffle.name.clone(), tri_surface(format!("{}.stl", baffle.name)));
    }
    if setup.refinement_regions {
        for volume in &classification.volumes {
            let region = refinement_region_name(&volume.name);
            geometry.insert(region.clone(), tri_surface(format!("{region}.stl")));
        }
    }
    dict.insert("geometry", geometry);

    // 2. castellatedMeshControls
    let mut controls = FoamDict::new();
    if setup.edge_mesh {
        let edge_level = FoamValue::Int(setup.default_edge_refinement.unwrap_or(0));
        let names = patches
            .keys()
            .chain(classification.interfaces.iter().map(|i| &i.name))
            .chain(classification.baffles.iter().map(|b| &b.name));
        let features = names
            .map(|name| {
                let file = edge_mesh_file(name);
                let level = merge
                    .feature_level(&file)
                    .cloned()
                    .unwrap_or_else(|| edge_level.clone());
                FoamValue::Dict(
                    FoamDict::new()
                        .with("file", FoamValue::string(file))
                        .with("level", level),
                )
            })
            .collect();
        controls.insert("features", FoamValue::List(features));
    }

    let mut surfaces = FoamDict::new();
    let mut step_regions = FoamDict::new();
    for name in patches.keys().map(String::as_str) {
        let level = level_or_default(merge.surface(&[step_name, "regions", name, "level"]));
        let info = patch_info_or(
            merge.surface(&[step_name, "regions", name, "patchInfo"]),
            patch_type(name),
        );
        step_regions.insert(
            name,
            FoamDict::new().with("level", level).with("patchInfo", info),
        );
    }
    surfaces.insert(
        step_name,
        FoamDict::new()
            .with("level", level_or_default(merge.surface(&[step_name, "level"])))
            .with(
                "patchInfo",
                patch_info_or(merge.surface(&[step_name, "patchInfo"]), "wall"),
            )
            .with("regions", step_regions),
    );
    for interface in &classification.interfaces {
        let name = interface.name.as_str();
        let mut entry = FoamDict::new()
            .with("faceZone", FoamValue::word(name))
            .with("level", level_or_default(merge.surface(&[name, "level"])))
            .with(
                "patchInfo",
                patch_info_or(merge.surface(&[name, "patchInfo"]), "wall"),
            );
        if let Some(owner) = interface
            .cell_zone_volume
            .and_then(|i| classification.volumes.get(i))
        {
            entry.insert("cellZone", FoamValue::word(owner.name.clone()));
            entry.insert("mode", FoamValue::word("insidePoint"));
            if let Some(point) = owner.inside_point {
                entry.insert("insidePoint", FoamValue::point(point));
            }
        }
        surfaces.insert(name, entry);
    }
    for baffle in &classification.baffles {
        let name = baffle.name.as_str();
        surfaces.insert(
            name,
            FoamDict::new()
                .with("faceZone", FoamValue::word(name))
                .with("faceType", FoamValue::word("baffle"))
                .with("level", level_or_default(merge.surface(&[name, "level"])))
                .with(
                    "patchInfo",
                    patch_info_or(merge.surface(&[name, "patchInfo"]), "wall"),
                ),
        );
    }
    controls.insert("refinementSurfaces", surfaces);

    if let Some(point) = default_inside_point(classification, default_volume) {
        controls.insert("insidePoint", FoamValue::point(point));
    }

    if setup.refinement_regions {
        let default_levels = FoamValue::List(
            setup
                .default_region_refinement
                .iter()
                .flatten()
                .map(|[distance, level]| FoamValue::List(vec![number(*distance), number(*level)]))
                .collect(),
        );
        let mut refinement_regions = FoamDict::new();
        for volume in &classification.volumes {
            let region = refinement_region_name(&volume.name);
            let levels = merge
                .region_levels(&region)
                .cloned()
                .unwrap_or_else(|| default_levels.clone());
            refinement_regions.insert(
                region,
                FoamDict::new()
                    .with("mode", FoamValue::word("inside"))
                    .with("levels", levels),
            );
        }
        controls.insert("refinementRegions", refinement_regions);
    }
    dict.insert("castellatedMeshControls", controls);

    // 3. snapControls
    let mut snap = FoamDict::new();
    if let Some(multi) = setup.multi_region_feature_snap {
        snap.insert("multiRegionFeatureSnap", FoamValue::bool(multi));
    }
    if setup.edge_mesh {
        snap.insert("explicitFeatureSnap", FoamValue::bool(true));
        snap.insert("implicitFeatureSnap", FoamValue::bool(false));
    }
    dict.insert("snapControls", snap);
    dict.insert("mergeTolerance", switch("mergeTolerance", FoamValue::Float(1e-6)));

    if let Some(prior) = merge.dict {
        let carried = carry_forward(prior, &mut dict);
        debug!(entries = carried, "carried settings from previous dictionary");
    }
    dict
}

/// Copies scalar entries of `prior` missing from `target`, recursing into
/// dictionaries both sides have. Derived sections are skipped. Returns the
/// number of copied entries.
pub fn carry_forward(prior: &FoamDict, target: &mut FoamDict) -> usize {
    let mut copied = 0;
    for (key, value) in prior.iter() {
        if DERIVED_SECTIONS.contains(&key) {
            continue;
        }
        match value {
            FoamValue::Dict(inner) => {
                if let Some(sub) = target.get_mut(key).and_then(FoamValue::as_dict_mut) {
                    copied += carry_forward(inner, sub);
                }
            }
            _ if value.is_scalar() && !target.contains_key(key) => {
                target.insert(key, value.clone());
                copied += 1;
            }
            _ => {}
        }
    }
    copied
}

/// Interior point of the default volume, if resolved.
pub fn default_inside_point(
    classification: &Classification,
    default_volume: Option<usize>,
) -> Option<Vec3> {
    classification.volumes.get(default_volume?)?.inside_point
}
