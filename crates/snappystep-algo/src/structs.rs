use snappystep_core::geom::Vec3;
use snappystep_core::kernel::{EntityCounts, Tag};
use snappystep_core::report::{
    BaffleReport, ClassificationReport, InterfaceReport, VolumeReport, Warning,
};
use std::collections::{BTreeMap, BTreeSet};

/// Index of an [`Interface`] or [`Baffle`] in its [`Classification`] list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PatchRef {
    Interface(usize),
    Baffle(usize),
}

/// One logical solid body: every kernel volume carrying the same validated name.
#[derive(Debug, Clone, PartialEq)]
pub struct Volume {
    pub name: String,
    pub tags: Vec<Tag>,
    pub exterior_face_tags: Vec<Tag>,
    pub interface_face_tags: Vec<Tag>,
    pub exterior_patches: BTreeMap<String, Vec<Tag>>,
    pub exterior_patch_edges: BTreeMap<String, BTreeSet<Tag>>,
    pub interface_patches: Vec<PatchRef>,
    pub inside_point: Option<Vec3>,
}

impl Volume {
    pub fn new(name: String, tags: Vec<Tag>) -> Self {
        Self {
            name,
            tags,
            exterior_face_tags: Vec::new(),
            interface_face_tags: Vec::new(),
            exterior_patches: BTreeMap::new(),
            exterior_patch_edges: BTreeMap::new(),
            interface_patches: Vec::new(),
            inside_point: None,
        }
    }

    /// Every face bounding the volume, ascending.
    pub fn boundary_faces(&self) -> Vec<Tag> {
        let mut faces: Vec<Tag> = self
            .exterior_face_tags
            .iter()
            .chain(&self.interface_face_tags)
            .copied()
            .collect();
        faces.sort_unstable();
        faces
    }

    /// Number of two-volume interfaces, baffles excluded.
    pub fn interface_count(&self) -> usize {
        self.interface_patches
            .iter()
            .filter(|p| matches!(p, PatchRef::Interface(_)))
            .count()
    }
}

/// Faces shared by exactly two volumes under one name.
#[derive(Debug, Clone, PartialEq)]
pub struct Interface {
    pub name: String,
    /// Indices into [`Classification::volumes`], distinct and ascending.
    pub volume_pair: [usize; 2],
    pub face_tags: Vec<Tag>,
    pub edge_tags: BTreeSet<Tag>,
    pub cell_zone_volume: Option<usize>,
}

/// Faces inside a single volume, or attached to none.
#[derive(Debug, Clone, PartialEq)]
pub struct Baffle {
    pub name: String,
    pub volume: Option<usize>,
    pub face_tags: Vec<Tag>,
    pub edge_tags: BTreeSet<Tag>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Classification {
    /// Sorted by name.
    pub volumes: Vec<Volume>,
    pub interfaces: Vec<Interface>,
    pub baffles: Vec<Baffle>,
    pub warnings: Vec<Warning>,
}

impl Classification {
    pub fn volume_index(&self, name: &str) -> Option<usize> {
        self.volumes.iter().position(|v| v.name == name)
    }

    pub fn volume_named(&self, name: &str) -> Option<&Volume> {
        self.volumes.iter().find(|v| v.name == name)
    }

    pub fn interface_named(&self, name: &str) -> Option<&Interface> {
        self.interfaces.iter().find(|i| i.name == name)
    }

    /// Exterior patches of all volumes merged by name, with their edges.
    pub fn exterior_patches(&self) -> BTreeMap<String, (Vec<Tag>, BTreeSet<Tag>)> {
        let mut patches: BTreeMap<String, (Vec<Tag>, BTreeSet<Tag>)> = BTreeMap::new();
        for volume in &self.volumes {
            for (name, faces) in &volume.exterior_patches {
                let entry = patches.entry(name.clone()).or_default();
                entry.0.extend(faces);
                if let Some(edges) = volume.exterior_patch_edges.get(name) {
                    entry.1.extend(edges);
                }
            }
        }
        for (faces, _) in patches.values_mut() {
            faces.sort_unstable();
            faces.dedup();
        }
        patches
    }

    pub fn report(
        &self,
        source: &str,
        counts: EntityCounts,
        default_volume: Option<usize>,
    ) -> ClassificationReport {
        let volume_name = |i: usize| self.volumes[i].name.clone();
        ClassificationReport {
            source: source.to_string(),
            counts,
            default_volume: default_volume.map(volume_name),
            volumes: self
                .volumes
                .iter()
                .map(|v| VolumeReport {
                    name: v.name.clone(),
                    tags: v.tags.clone(),
                    exterior_faces: v.exterior_face_tags.clone(),
                    interface_faces: v.interface_face_tags.clone(),
                    exterior_patches: v.exterior_patches.clone(),
                    interface_count: v.interface_count(),
                    inside_point: v.inside_point,
                })
                .collect(),
            interfaces: self
                .interfaces
                .iter()
                .map(|i| InterfaceReport {
                    name: i.name.clone(),
                    volumes: i.volume_pair.map(volume_name),
                    faces: i.face_tags.clone(),
                    edges: i.edge_tags.iter().copied().collect(),
                    cell_zone: i.cell_zone_volume.map(volume_name),
                })
                .collect(),
            baffles: self
                .baffles
                .iter()
                .map(|b| BaffleReport {
                    name: b.name.clone(),
                    volume: b.volume.map(volume_name),
                    faces: b.face_tags.clone(),
                    edges: b.edge_tags.iter().copied().collect(),
                })
                .collect(),
            warnings: self.warnings.clone(),
        }
    }
}
