#![allow(dead_code)]

use snappystep_core::config::Config;
use snappystep_core::foam::parse;
use snappystep_core::geom::{BBox3, Vec3};
use snappystep_core::kernel::{
    CadKernel, Dim, EntityCounts, KernelError, MassProperties, MeshOptions, Tag,
};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

pub const CONFIG: &str = r#"
gmsh
{
    meshSizeMax 0.5;
    meshSizeMin 0;
    meshSizeFactor 1;
    meshSizeFromCurvature 0;
    meshAlgorithm 6;
}
snappyHexMeshSetup
{
    edgeMesh true;
    refinementRegions true;
    multiRegionFeatureSnap true;
    generateBlockMeshDict true;
    backgroundMeshSize (0.1 0.1 0.1);
    defaultSurfaceRefinement (2 2);
    defaultEdgeRefinement 1;
    defaultRegionRefinement ((0.5 1) (1 2));
    overwriteRefinements false;
}
"#;

pub fn config() -> Config {
    config_with("")
}

/// Default config with extra top-level entries appended, e.g. `locationInMesh`.
pub fn config_with(extra: &str) -> Config {
    let dict = parse(&format!("{CONFIG}\n{extra}")).expect("config parses");
    Config::from_foam(&dict).expect("config is valid")
}

fn bits(p: Vec3) -> [u64; 3] {
    [p.x.to_bits(), p.y.to_bits(), p.z.to_bits()]
}

/// Table-driven kernel made of axis-aligned boxes. Boxes touching along a
/// whole face share that face, as after imprinting.
#[derive(Debug, Default)]
pub struct BoxKernel {
    pub volumes: BTreeMap<Tag, (BBox3, Vec<Tag>)>,
    pub faces: BTreeMap<Tag, (BBox3, Vec<Tag>)>,
    pub edges: BTreeMap<Tag, BBox3>,
    pub names: HashMap<(Dim, Tag), String>,
    /// Makes every inside query fail.
    pub hollow: bool,
    /// Volume dropped by the next imprint.
    pub lose_on_imprint: Option<Tag>,
    pub groups: Vec<(Dim, Vec<Tag>, String)>,
    face_keys: HashMap<[[u64; 3]; 2], Tag>,
    edge_keys: HashMap<[[u64; 3]; 2], Tag>,
}

impl BoxKernel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_boxes(boxes: &[(&str, [f64; 3], [f64; 3])]) -> Self {
        let mut kernel = Self::new();
        for (name, min, max) in boxes {
            kernel.add_box(name, *min, *max);
        }
        kernel
    }

    fn face_tag(&mut self, rect: BBox3) -> Tag {
        let key = [bits(rect.min), bits(rect.max)];
        if let Some(&tag) = self.face_keys.get(&key) {
            return tag;
        }
        let tag = self.faces.len() as Tag + 1;
        let edges: Vec<Tag> = rect_edges(&rect)
            .into_iter()
            .map(|e| self.edge_tag(e))
            .collect();
        self.faces.insert(tag, (rect, edges));
        self.face_keys.insert(key, tag);
        tag
    }

    fn edge_tag(&mut self, segment: BBox3) -> Tag {
        let key = [bits(segment.min), bits(segment.max)];
        if let Some(&tag) = self.edge_keys.get(&key) {
            return tag;
        }
        let tag = self.edges.len() as Tag + 1;
        self.edges.insert(tag, segment);
        self.edge_keys.insert(key, tag);
        tag
    }

    /// Adds a box volume; an empty name leaves it unnamed.
    pub fn add_box(&mut self, name: &str, min: [f64; 3], max: [f64; 3]) -> Tag {
        let (min, max) = (Vec3::from_array(min), Vec3::from_array(max));
        let mut faces = Vec::new();
        for axis in 0..3 {
            for side in [min, max] {
                let mut lo = min.to_array();
                let mut hi = max.to_array();
                lo[axis] = side.to_array()[axis];
                hi[axis] = side.to_array()[axis];
                let rect = BBox3::new(Vec3::from_array(lo), Vec3::from_array(hi));
                faces.push(self.face_tag(rect));
            }
        }
        let tag = self.volumes.keys().max().copied().unwrap_or(0) + 1;
        self.volumes.insert(tag, (BBox3::new(min, max), faces));
        if !name.is_empty() {
            self.names.insert((Dim::Volume, tag), name.to_string());
        }
        tag
    }

    /// Adds a face bounded by no volume.
    pub fn add_free_face(&mut self, rect: BBox3) -> Tag {
        self.face_tag(rect)
    }

    /// Makes an existing face part of another volume's boundary.
    pub fn attach_face(&mut self, volume: Tag, face: Tag) {
        if let Some((_, faces)) = self.volumes.get_mut(&volume) {
            faces.push(face);
        }
    }

    /// The face lying between two boxes.
    pub fn shared_face(&self, a: Tag, b: Tag) -> Tag {
        let fa = &self.volumes[&a].1;
        let fb = &self.volumes[&b].1;
        *fa.iter().find(|f| fb.contains(*f)).expect("boxes share a face")
    }

    pub fn name_face(&mut self, face: Tag, name: &str) {
        self.names.insert((Dim::Surface, face), name.to_string());
    }

    fn check(&self, dim: Dim, tag: Tag) -> Result<(), KernelError> {
        let known = match dim {
            Dim::Point => false,
            Dim::Curve => self.edges.contains_key(&tag),
            Dim::Surface => self.faces.contains_key(&tag),
            Dim::Volume => self.volumes.contains_key(&tag),
        };
        if known {
            Ok(())
        } else {
            Err(KernelError::UnknownEntity { dim, tag })
        }
    }
}

fn rect_edges(rect: &BBox3) -> Vec<BBox3> {
    let lo = rect.min.to_array();
    let hi = rect.max.to_array();
    let spans: Vec<usize> = (0..3).filter(|&a| lo[a] != hi[a]).collect();
    let mut edges = Vec::new();
    for &along in &spans {
        for &across in spans.iter().filter(|&&a| a != along) {
            for level in [lo[across], hi[across]] {
                let mut a = lo;
                let mut b = hi;
                a[across] = level;
                b[across] = level;
                edges.push(BBox3::new(Vec3::from_array(a), Vec3::from_array(b)));
            }
        }
    }
    edges
}

fn clamp(rect: &BBox3, p: Vec3) -> Vec3 {
    Vec3::new(
        p.x.clamp(rect.min.x, rect.max.x),
        p.y.clamp(rect.min.y, rect.max.y),
        p.z.clamp(rect.min.z, rect.max.z),
    )
}

impl CadKernel for BoxKernel {
    fn import_shapes(&mut self, path: &Path, _scaling: f64) -> Result<(), KernelError> {
        Err(KernelError::UnsupportedFormat(path.to_path_buf()))
    }

    fn imprint(&mut self) -> Result<(), KernelError> {
        if let Some(tag) = self.lose_on_imprint.take() {
            self.volumes.remove(&tag);
        }
        Ok(())
    }

    fn counts(&self) -> EntityCounts {
        EntityCounts {
            points: 0,
            curves: self.edges.len(),
            surfaces: self.faces.len(),
            volumes: self.volumes.len(),
        }
    }

    fn entities(&self, dim: Dim) -> Vec<Tag> {
        match dim {
            Dim::Point => Vec::new(),
            Dim::Curve => self.edges.keys().copied().collect(),
            Dim::Surface => self.faces.keys().copied().collect(),
            Dim::Volume => self.volumes.keys().copied().collect(),
        }
    }

    fn entity_name(&self, dim: Dim, tag: Tag) -> Option<String> {
        self.names.get(&(dim, tag)).cloned()
    }

    fn set_entity_name(&mut self, dim: Dim, tag: Tag, name: &str) -> Result<(), KernelError> {
        self.check(dim, tag)?;
        self.names.insert((dim, tag), name.to_string());
        Ok(())
    }

    fn remove_entity_name(&mut self, dim: Dim, tag: Tag) -> Result<(), KernelError> {
        self.check(dim, tag)?;
        self.names.remove(&(dim, tag));
        Ok(())
    }

    fn upward(&self, dim: Dim, tag: Tag) -> Result<Vec<Tag>, KernelError> {
        self.check(dim, tag)?;
        Ok(match dim {
            Dim::Curve => self
                .faces
                .iter()
                .filter(|(_, (_, edges))| edges.contains(&tag))
                .map(|(&t, _)| t)
                .collect(),
            Dim::Surface => self
                .volumes
                .iter()
                .filter(|(_, (_, faces))| faces.contains(&tag))
                .map(|(&t, _)| t)
                .collect(),
            _ => {
                return Err(KernelError::NoAdjacency {
                    dim,
                    relation: "upward",
                })
            }
        })
    }

    fn downward(&self, dim: Dim, tag: Tag) -> Result<Vec<Tag>, KernelError> {
        self.check(dim, tag)?;
        Ok(match dim {
            Dim::Surface => self.faces[&tag].1.clone(),
            Dim::Volume => self.volumes[&tag].1.clone(),
            _ => Vec::new(),
        })
    }

    fn bounding_box(&self, dim: Dim, tag: Tag) -> Result<BBox3, KernelError> {
        self.check(dim, tag)?;
        Ok(match dim {
            Dim::Curve => self.edges[&tag],
            Dim::Surface => self.faces[&tag].0,
            _ => self.volumes[&tag].0,
        })
    }

    fn model_bounding_box(&self) -> BBox3 {
        self.volumes
            .values()
            .fold(BBox3::empty(), |acc, (b, _)| acc.union(b))
    }

    fn mass_properties(&self, volume: Tag) -> Result<MassProperties, KernelError> {
        self.check(Dim::Volume, volume)?;
        let b = self.volumes[&volume].0;
        let s = b.size();
        Ok(MassProperties {
            volume: s.x * s.y * s.z,
            center: b.center(),
        })
    }

    fn is_inside(&self, volume: Tag, p: Vec3) -> Result<bool, KernelError> {
        self.check(Dim::Volume, volume)?;
        let b = self.volumes[&volume].0;
        Ok(!self.hollow
            && p.x > b.min.x
            && p.x < b.max.x
            && p.y > b.min.y
            && p.y < b.max.y
            && p.z > b.min.z
            && p.z < b.max.z)
    }

    fn closest_point(&self, face: Tag, p: Vec3) -> Result<Vec3, KernelError> {
        self.check(Dim::Surface, face)?;
        Ok(clamp(&self.faces[&face].0, p))
    }

    fn generate_surface_mesh(&mut self, _options: &MeshOptions) -> Result<(), KernelError> {
        Ok(())
    }

    fn clear_groups(&mut self) {
        self.groups.clear();
    }

    fn add_group(&mut self, dim: Dim, tags: &[Tag], name: &str) -> Result<(), KernelError> {
        self.groups.push((dim, tags.to_vec(), name.to_string()));
        Ok(())
    }

    fn write_groups(&self, _path: &Path) -> Result<(), KernelError> {
        Ok(())
    }
}

/// One volume between spheres of radius 1 and 2 around the origin: its
/// center of mass and bounding box center are both outside it.
#[derive(Debug, Default)]
pub struct ShellKernel;

pub const SHELL_VOLUME: Tag = 1;
pub const SHELL_INNER: Tag = 1;
pub const SHELL_OUTER: Tag = 2;

impl CadKernel for ShellKernel {
    fn import_shapes(&mut self, path: &Path, _scaling: f64) -> Result<(), KernelError> {
        Err(KernelError::UnsupportedFormat(path.to_path_buf()))
    }

    fn imprint(&mut self) -> Result<(), KernelError> {
        Ok(())
    }

    fn counts(&self) -> EntityCounts {
        EntityCounts {
            points: 0,
            curves: 0,
            surfaces: 2,
            volumes: 1,
        }
    }

    fn entities(&self, dim: Dim) -> Vec<Tag> {
        match dim {
            Dim::Surface => vec![SHELL_INNER, SHELL_OUTER],
            Dim::Volume => vec![SHELL_VOLUME],
            _ => Vec::new(),
        }
    }

    fn entity_name(&self, dim: Dim, _tag: Tag) -> Option<String> {
        (dim == Dim::Volume).then(|| "Shell".to_string())
    }

    fn set_entity_name(&mut self, _dim: Dim, _tag: Tag, _name: &str) -> Result<(), KernelError> {
        Ok(())
    }

    fn remove_entity_name(&mut self, _dim: Dim, _tag: Tag) -> Result<(), KernelError> {
        Ok(())
    }

    fn upward(&self, dim: Dim, _tag: Tag) -> Result<Vec<Tag>, KernelError> {
        Ok(if dim == Dim::Surface {
            vec![SHELL_VOLUME]
        } else {
            Vec::new()
        })
    }

    fn downward(&self, dim: Dim, _tag: Tag) -> Result<Vec<Tag>, KernelError> {
        Ok(if dim == Dim::Volume {
            vec![SHELL_INNER, SHELL_OUTER]
        } else {
            Vec::new()
        })
    }

    fn bounding_box(&self, _dim: Dim, _tag: Tag) -> Result<BBox3, KernelError> {
        Ok(self.model_bounding_box())
    }

    fn model_bounding_box(&self) -> BBox3 {
        BBox3::new(Vec3::new(-2.0, -2.0, -2.0), Vec3::new(2.0, 2.0, 2.0))
    }

    fn mass_properties(&self, _volume: Tag) -> Result<MassProperties, KernelError> {
        Ok(MassProperties {
            volume: 4.0 / 3.0 * std::f64::consts::PI * 7.0,
            center: Vec3::zero(),
        })
    }

    fn is_inside(&self, _volume: Tag, p: Vec3) -> Result<bool, KernelError> {
        let r = p.norm();
        Ok(r > 1.0 && r < 2.0)
    }

    fn closest_point(&self, face: Tag, p: Vec3) -> Result<Vec3, KernelError> {
        let radius = if face == SHELL_INNER { 1.0 } else { 2.0 };
        let direction = p.normalized().unwrap_or(Vec3::new(1.0, 0.0, 0.0));
        Ok(direction * radius)
    }

    fn generate_surface_mesh(&mut self, _options: &MeshOptions) -> Result<(), KernelError> {
        Ok(())
    }

    fn clear_groups(&mut self) {}

    fn add_group(&mut self, _dim: Dim, _tags: &[Tag], _name: &str) -> Result<(), KernelError> {
        Ok(())
    }

    fn write_groups(&self, _path: &Path) -> Result<(), KernelError> {
        Ok(())
    }
}
