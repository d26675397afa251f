use crate::foam::{self, FoamDict, FoamError, FoamValue};
use crate::geom::Vec3;
use crate::kernel::{MeshOptions, Tag};
use crate::names::validate_name;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

pub const CONFIG_RELATIVE_PATH: &str = "system/snappyStepDict";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration not found: {path:?}\nHint: run `snappystep --init` from the case root to write a template.")]
    Missing { path: PathBuf },
    #[error("could not read {path:?}: {source}\nHint: check the file for format errors.")]
    Parse {
        path: PathBuf,
        #[source]
        source: FoamError,
    },
    #[error("invalid configuration: {0}\nHint: compare against the template written by `snappystep --init`.")]
    Invalid(String),
}

/// Run configuration, validated once at load and read-only afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(rename = "gmsh", alias = "surfaceMesh")]
    pub surface_mesh: SurfaceMeshConfig,
    #[serde(rename = "snappyHexMeshSetup")]
    pub setup: SetupConfig,
    #[serde(default)]
    pub location_in_mesh: BTreeMap<String, [f64; 3]>,
    #[serde(default)]
    pub face_groups: BTreeMap<String, Vec<Tag>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurfaceMeshConfig {
    pub mesh_size_max: f64,
    pub mesh_size_min: f64,
    pub mesh_size_factor: f64,
    pub mesh_size_from_curvature: u32,
    pub mesh_algorithm: u32,
    #[serde(default = "default_scaling")]
    pub scaling: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetupConfig {
    #[serde(default)]
    pub edge_mesh: bool,
    #[serde(default)]
    pub refinement_regions: bool,
    #[serde(default)]
    pub multi_region_feature_snap: Option<bool>,
    #[serde(default = "default_true")]
    pub generate_block_mesh_dict: bool,
    #[serde(default)]
    pub background_mesh_size: Option<[f64; 3]>,
    pub default_surface_refinement: [i64; 2],
    #[serde(default)]
    pub default_edge_refinement: Option<i64>,
    #[serde(default)]
    pub default_region_refinement: Option<Vec<[f64; 2]>>,
    #[serde(default)]
    pub overwrite_refinements: bool,
    #[serde(default = "default_inside_point_tolerance")]
    pub inside_point_tolerance: f64,
}

fn default_scaling() -> f64 {
    1.0
}

fn default_true() -> bool {
    true
}

fn default_inside_point_tolerance() -> f64 {
    1e-6
}

impl Config {
    /// Reads and validates `system/snappyStepDict` under `case_dir`.
    pub fn read(case_dir: &Path) -> Result<Self, ConfigError> {
        let path = case_dir.join(CONFIG_RELATIVE_PATH);
        let dict = foam::read_file(&path)
            .map_err(|source| ConfigError::Parse {
                path: path.clone(),
                source,
            })?
            .ok_or_else(|| ConfigError::Missing { path: path.clone() })?;
        Self::from_foam(&dict)
    }

    pub fn from_foam(dict: &FoamDict) -> Result<Self, ConfigError> {
        let json = dict_to_json(dict);
        let mut config: Config =
            serde_json::from_value(json).map_err(|err| ConfigError::Invalid(err.to_string()))?;

        if !config.location_in_mesh.is_empty() {
            info!("using locationInMesh coordinates defined in config");
            config.location_in_mesh = config
                .location_in_mesh
                .into_iter()
                .map(|(name, point)| (validate_name(&name), point))
                .collect();
        }
        config.face_groups = config
            .face_groups
            .into_iter()
            .map(|(name, tags)| (validate_name(&name), tags))
            .collect();

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let mesh = &self.surface_mesh;
        if !(mesh.mesh_size_max > 0.0) || !(mesh.mesh_size_factor > 0.0) {
            return Err(ConfigError::Invalid(
                "gmsh.meshSizeMax and gmsh.meshSizeFactor must be positive".to_string(),
            ));
        }
        if mesh.mesh_size_min < 0.0 || mesh.mesh_size_min > mesh.mesh_size_max {
            return Err(ConfigError::Invalid(
                "gmsh.meshSizeMin must lie in [0, meshSizeMax]".to_string(),
            ));
        }
        if !(mesh.scaling > 0.0) {
            return Err(ConfigError::Invalid("gmsh.scaling must be positive".to_string()));
        }

        let setup = &self.setup;
        if setup.generate_block_mesh_dict {
            match setup.background_mesh_size {
                Some(size) if size.iter().all(|v| *v > 0.0) => {}
                Some(_) => {
                    return Err(ConfigError::Invalid(
                        "snappyHexMeshSetup.backgroundMeshSize entries must be positive"
                            .to_string(),
                    ))
                }
                None => {
                    return Err(ConfigError::Invalid(
                        "missing snappyHexMeshSetup.backgroundMeshSize (required when generateBlockMeshDict is on)"
                            .to_string(),
                    ))
                }
            }
        }
        if setup.edge_mesh && setup.default_edge_refinement.is_none() {
            return Err(ConfigError::Invalid(
                "missing snappyHexMeshSetup.defaultEdgeRefinement (required when edgeMesh is on)"
                    .to_string(),
            ));
        }
        if setup.refinement_regions && setup.default_region_refinement.is_none() {
            return Err(ConfigError::Invalid(
                "missing snappyHexMeshSetup.defaultRegionRefinement (required when refinementRegions is on)"
                    .to_string(),
            ));
        }
        if !(setup.inside_point_tolerance > 0.0) {
            return Err(ConfigError::Invalid(
                "snappyHexMeshSetup.insidePointTolerance must be positive".to_string(),
            ));
        }
        for (name, point) in &self.location_in_mesh {
            if point.iter().any(|v| !v.is_finite()) {
                return Err(ConfigError::Invalid(format!(
                    "locationInMesh.{name} is not a finite point"
                )));
            }
        }
        Ok(())
    }

    /// User-supplied interior point for a validated volume name.
    pub fn inside_point_override(&self, volume_name: &str) -> Option<Vec3> {
        self.location_in_mesh
            .get(volume_name)
            .map(|p| Vec3::from_array(*p))
    }

    pub fn mesh_options(&self) -> MeshOptions {
        let mesh = &self.surface_mesh;
        MeshOptions {
            size_min: mesh.mesh_size_min,
            size_max: mesh.mesh_size_max,
            size_factor: mesh.mesh_size_factor,
            size_from_curvature: mesh.mesh_size_from_curvature,
            algorithm: mesh.mesh_algorithm,
        }
    }

    /// Template written by `--init`.
    pub fn template() -> FoamDict {
        let gmsh = FoamDict::new()
            .with("meshSizeMax", FoamValue::Int(1000))
            .with("meshSizeMin", FoamValue::Int(0))
            .with("meshSizeFactor", FoamValue::Int(1))
            .with("meshSizeFromCurvature", FoamValue::Int(90))
            .with("meshAlgorithm", FoamValue::Int(6))
            .with("scaling", FoamValue::Int(1));
        let setup = FoamDict::new()
            .with("edgeMesh", FoamValue::bool(true))
            .with("refinementRegions", FoamValue::bool(false))
            .with("multiRegionFeatureSnap", FoamValue::bool(true))
            .with("generateBlockMeshDict", FoamValue::bool(true))
            .with(
                "backgroundMeshSize",
                FoamValue::List(vec![FoamValue::Float(0.01); 3]),
            )
            .with("defaultSurfaceRefinement", FoamValue::ints(&[2, 2]))
            .with("defaultEdgeRefinement", FoamValue::Int(1))
            .with(
                "defaultRegionRefinement",
                FoamValue::List(vec![FoamValue::ints(&[1, 2])]),
            )
            .with("overwriteRefinements", FoamValue::bool(false))
            .with("insidePointTolerance", FoamValue::Float(1e-6));
        FoamDict::new()
            .with("gmsh", gmsh)
            .with("snappyHexMeshSetup", setup)
            .with("locationInMesh", FoamDict::new())
    }
}

fn dict_to_json(dict: &FoamDict) -> serde_json::Value {
    let map = dict
        .iter()
        .map(|(k, v)| (k.to_string(), value_to_json(v)))
        .collect();
    serde_json::Value::Object(map)
}

fn value_to_json(value: &FoamValue) -> serde_json::Value {
    use serde_json::Value;
    match value {
        FoamValue::Word(w) => match value.as_bool() {
            Some(b) => Value::Bool(b),
            None => Value::String(w.clone()),
        },
        FoamValue::Str(s) => Value::String(s.clone()),
        FoamValue::Int(v) => Value::from(*v),
        FoamValue::Float(v) => serde_json::Number::from_f64(*v)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        FoamValue::List(items) | FoamValue::Seq(items) => {
            Value::Array(items.iter().map(value_to_json).collect())
        }
        FoamValue::Dict(d) => dict_to_json(d),
    }
}
