use crate::geom::Vec3;
use crate::kernel::{EntityCounts, Tag};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warning {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolumeReport {
    pub name: String,
    pub tags: Vec<Tag>,
    pub exterior_faces: Vec<Tag>,
    pub interface_faces: Vec<Tag>,
    pub exterior_patches: BTreeMap<String, Vec<Tag>>,
    pub interface_count: usize,
    pub inside_point: Option<Vec3>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterfaceReport {
    pub name: String,
    pub volumes: [String; 2],
    pub faces: Vec<Tag>,
    pub edges: Vec<Tag>,
    pub cell_zone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaffleReport {
    pub name: String,
    pub volume: Option<String>,
    pub faces: Vec<Tag>,
    pub edges: Vec<Tag>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationReport {
    pub source: String,
    pub counts: EntityCounts,
    pub default_volume: Option<String>,
    pub volumes: Vec<VolumeReport>,
    pub interfaces: Vec<InterfaceReport>,
    pub baffles: Vec<BaffleReport>,
    pub warnings: Vec<Warning>,
}
