use snappystep_core::kernel::{KernelError, Overlap, Tag};
use thiserror::Error;

/// The input model does not fit the volume/interface assumptions.
#[derive(Debug, Error)]
pub enum GeometryError {
    #[error("coherence changed the number of volumes from {before} to {after}\nHint: check the geometry for overlapping bodies.")]
    VolumeCountChanged { before: usize, after: usize },
    #[error("volumes '{first}' and '{second}' do not meet on whole faces: {overlap}\nHint: split the bodies in the CAD model so that touching volumes share complete faces.")]
    NotConforming {
        first: String,
        second: String,
        overlap: Overlap,
    },
    #[error("face {face} is shared by more than two volumes: {volumes:?}")]
    FaceSpansVolumes { face: Tag, volumes: Vec<String> },
    #[error("interface name '{name}' is used both between {first:?} and between {second:?}")]
    AmbiguousInterfaceName {
        name: String,
        first: [String; 2],
        second: [String; 2],
    },
    #[error("face group '{name}' mixes exterior faces {exterior:?} with shared faces {shared:?}")]
    MixedFaceGroup {
        name: String,
        exterior: Vec<Tag>,
        shared: Vec<Tag>,
    },
    #[error(transparent)]
    Kernel(#[from] KernelError),
}

#[derive(Debug, Error)]
pub enum LocatorError {
    #[error("no interior point found for volume '{volume}'\nHint: set locationInMesh {{ {volume} (x y z); }} in system/snappyStepDict.")]
    Exhausted { volume: String },
    #[error(transparent)]
    Kernel(#[from] KernelError),
}

/// Any failure while preparing a model.
#[derive(Debug, Error)]
pub enum AlgoError {
    #[error(transparent)]
    Geometry(#[from] GeometryError),
    #[error(transparent)]
    Locator(#[from] LocatorError),
    #[error(transparent)]
    Kernel(#[from] KernelError),
}
