//! Capability surface of the geometry kernel.
//!
//! The classifier, locator and export driver only talk to geometry through
//! [`CadKernel`], so they can run against a real kernel or a test fake.

use crate::geom::{BBox3, Vec3};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub type Tag = i32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Dim {
    Point,
    Curve,
    Surface,
    Volume,
}

impl Dim {
    pub fn index(self) -> u8 {
        match self {
            Dim::Point => 0,
            Dim::Curve => 1,
            Dim::Surface => 2,
            Dim::Volume => 3,
        }
    }
}

impl fmt::Display for Dim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Dim::Point => "point",
            Dim::Curve => "curve",
            Dim::Surface => "surface",
            Dim::Volume => "volume",
        };
        f.write_str(s)
    }
}

/// How two volumes fail to meet on whole shared faces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Overlap {
    /// Part of one volume lies inside the other.
    Nested,
    /// Coplanar faces overlap without being the same face.
    PartialContact,
}

impl fmt::Display for Overlap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Overlap::Nested => f.write_str("part of one lies inside the other"),
            Overlap::PartialContact => f.write_str("they touch on part of a face"),
        }
    }
}

#[derive(Debug, Error)]
pub enum KernelError {
    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not import {path:?}: {source}")]
    Import {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    #[error("unknown {dim} entity {tag}")]
    UnknownEntity { dim: Dim, tag: Tag },
    #[error("{dim} entities have no {relation} adjacency")]
    NoAdjacency { dim: Dim, relation: &'static str },
    #[error("degenerate geometry on {dim} {tag}: {message}")]
    Degenerate { dim: Dim, tag: Tag, message: String },
    #[error("volumes {first} and {second} are not conforming: {overlap}")]
    NotConforming {
        first: Tag,
        second: Tag,
        overlap: Overlap,
    },
    #[error("no surface mesh has been generated")]
    NoMesh,
    #[error("no exportable groups are defined")]
    NoGroups,
    #[error("could not render mesh text: {0}")]
    Format(#[from] std::fmt::Error),
    #[error("unsupported output format: {0:?}")]
    UnsupportedFormat(PathBuf),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EntityCounts {
    pub points: usize,
    pub curves: usize,
    pub surfaces: usize,
    pub volumes: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MassProperties {
    pub volume: f64,
    pub center: Vec3,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MeshOptions {
    pub size_min: f64,
    pub size_max: f64,
    pub size_factor: f64,
    /// Elements per 2*pi of curvature; 0 disables curvature sizing.
    pub size_from_curvature: u32,
    pub algorithm: u32,
}

impl MeshOptions {
    /// Target element edge length after applying the factor and clamps.
    pub fn target_size(&self) -> f64 {
        let h = self.size_max * self.size_factor;
        if self.size_min > 0.0 {
            h.max(self.size_min)
        } else {
            h
        }
    }
}

impl Default for MeshOptions {
    fn default() -> Self {
        Self {
            size_min: 0.0,
            size_max: 1e22,
            size_factor: 1.0,
            size_from_curvature: 0,
            algorithm: 6,
        }
    }
}

pub trait CadKernel {
    /// Loads a B-rep file into the model; lengths are converted to metres
    /// and multiplied by `scaling`.
    fn import_shapes(&mut self, path: &Path, scaling: f64) -> Result<(), KernelError>;

    /// Fuses coincident points, edges and faces so touching bodies share topology.
    fn imprint(&mut self) -> Result<(), KernelError>;

    fn counts(&self) -> EntityCounts;

    /// Entity tags of one dimension, ascending.
    fn entities(&self, dim: Dim) -> Vec<Tag>;

    fn entity_name(&self, dim: Dim, tag: Tag) -> Option<String>;

    fn set_entity_name(&mut self, dim: Dim, tag: Tag, name: &str) -> Result<(), KernelError>;

    fn remove_entity_name(&mut self, dim: Dim, tag: Tag) -> Result<(), KernelError>;

    /// Entities of dimension `dim + 1` that this entity bounds.
    fn upward(&self, dim: Dim, tag: Tag) -> Result<Vec<Tag>, KernelError>;

    /// Entities of dimension `dim - 1` that bound this entity.
    fn downward(&self, dim: Dim, tag: Tag) -> Result<Vec<Tag>, KernelError>;

    fn bounding_box(&self, dim: Dim, tag: Tag) -> Result<BBox3, KernelError>;

    fn model_bounding_box(&self) -> BBox3;

    fn mass_properties(&self, volume: Tag) -> Result<MassProperties, KernelError>;

    fn is_inside(&self, volume: Tag, point: Vec3) -> Result<bool, KernelError>;

    fn closest_point(&self, face: Tag, point: Vec3) -> Result<Vec3, KernelError>;

    fn generate_surface_mesh(&mut self, options: &MeshOptions) -> Result<(), KernelError>;

    fn clear_groups(&mut self);

    /// Tags a set of faces (or curves) as one named exportable group.
    fn add_group(&mut self, dim: Dim, tags: &[Tag], name: &str) -> Result<(), KernelError>;

    /// Writes the current groups; the format follows the file extension
    /// (`.stl` surfaces, `.vtk` surfaces or curves).
    fn write_groups(&self, path: &Path) -> Result<(), KernelError>;
}
