use snappystep_core::config::Config;
use snappystep_core::kernel::CadKernel;

pub mod classify;
pub mod configure;
pub mod error;
pub mod locate;
pub mod ownership;
pub mod structs;

pub use error::{AlgoError, GeometryError, LocatorError};
pub use structs::{Baffle, Classification, Interface, PatchRef, Volume};

/// Classified model with resolved owners and interior points.
#[derive(Debug, Clone)]
pub struct PreparedModel {
    pub classification: Classification,
    /// Index of the background volume in `classification.volumes`.
    pub default_volume: Option<usize>,
}

impl PreparedModel {
    pub fn default_volume_name(&self) -> Option<&str> {
        self.default_volume
            .and_then(|i| self.classification.volumes.get(i))
            .map(|v| v.name.as_str())
    }
}

/// Runs every geometry step on a freshly imported model.
pub fn prepare_model(
    kernel: &mut dyn CadKernel,
    config: &Config,
) -> Result<PreparedModel, AlgoError> {
    // 1. Imprint so touching bodies share faces
    classify::imprint_checked(kernel)?;

    // 2. Names
    classify::validate_entity_names(kernel)?;
    classify::apply_face_groups(kernel, &config.face_groups)?;

    // 3. Volumes, patches, interfaces
    let mut classification = classify::classify(kernel)?;

    // 4. Cell zones
    let default_volume = ownership::assign_default_owner(&mut classification);

    // 5. Interior points
    locate::resolve_inside_points(kernel, &mut classification, config)?;

    Ok(PreparedModel {
        classification,
        default_volume,
    })
}
