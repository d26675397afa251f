use crate::mesh::SurfaceMesh;
use crate::polygon;
use nalgebra::Vector3;
use snappystep_core::kernel::{Dim, KernelError, Tag};
use std::collections::{BTreeMap, HashMap, VecDeque};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Edge {
    pub start: Tag,
    pub end: Tag,
}

impl Edge {
    pub fn key(&self) -> (Tag, Tag) {
        edge_key(self.start, self.end)
    }
}

pub(crate) fn edge_key(a: Tag, b: Tag) -> (Tag, Tag) {
    (a.min(b), a.max(b))
}

/// Planar face bounded by one ordered loop of vertices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Face {
    pub vertices: Vec<Tag>,
}

impl Face {
    pub fn loop_pairs(&self) -> impl Iterator<Item = (Tag, Tag)> + '_ {
        let n = self.vertices.len();
        (0..n).map(move |i| (self.vertices[i], self.vertices[(i + 1) % n]))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Solid {
    pub faces: Vec<Tag>,
}

#[derive(Debug, Clone)]
pub(crate) struct Group {
    pub dim: Dim,
    pub tags: Vec<Tag>,
    pub name: String,
}

/// In-memory faceted B-rep: points, straight edges, planar polygon faces and
/// solids bounded by shells of faces. Faces shared by two solids are stored
/// once, which is what makes interfaces discoverable through adjacency.
#[derive(Debug, Default)]
pub struct FacetedKernel {
    pub(crate) vertices: BTreeMap<Tag, Vector3<f64>>,
    pub(crate) edges: BTreeMap<Tag, Edge>,
    pub(crate) faces: BTreeMap<Tag, Face>,
    pub(crate) solids: BTreeMap<Tag, Solid>,
    pub(crate) edge_index: HashMap<(Tag, Tag), Tag>,
    pub(crate) names: HashMap<(Dim, Tag), String>,
    pub(crate) mesh: Option<SurfaceMesh>,
    pub(crate) groups: Vec<Group>,
    next_tag: [Tag; 4],
}

impl FacetedKernel {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate(&mut self, dim: Dim) -> Tag {
        let slot = &mut self.next_tag[dim.index() as usize];
        *slot += 1;
        *slot
    }

    pub fn add_vertex(&mut self, x: f64, y: f64, z: f64) -> Tag {
        let tag = self.allocate(Dim::Point);
        self.vertices.insert(tag, Vector3::new(x, y, z));
        self.mesh = None;
        tag
    }

    pub(crate) fn ensure_edge(&mut self, a: Tag, b: Tag) -> Tag {
        let key = edge_key(a, b);
        if let Some(&tag) = self.edge_index.get(&key) {
            return tag;
        }
        let tag = self.allocate(Dim::Curve);
        self.edges.insert(tag, Edge { start: a, end: b });
        self.edge_index.insert(key, tag);
        tag
    }

    /// Adds a face bounded by the given vertex loop, creating edges as needed.
    pub fn add_face(&mut self, loop_vertices: &[Tag]) -> Result<Tag, KernelError> {
        let mut vertices: Vec<Tag> = Vec::with_capacity(loop_vertices.len());
        for &v in loop_vertices {
            if !self.vertices.contains_key(&v) {
                return Err(KernelError::UnknownEntity { dim: Dim::Point, tag: v });
            }
            if vertices.last() != Some(&v) {
                vertices.push(v);
            }
        }
        while vertices.len() > 1 && vertices.first() == vertices.last() {
            vertices.pop();
        }
        if vertices.len() < 3 {
            return Err(KernelError::Degenerate {
                dim: Dim::Surface,
                tag: self.next_tag[Dim::Surface.index() as usize] + 1,
                message: "face loop has fewer than three distinct vertices".to_string(),
            });
        }

        let n = vertices.len();
        for i in 0..n {
            self.ensure_edge(vertices[i], vertices[(i + 1) % n]);
        }
        let tag = self.allocate(Dim::Surface);
        self.faces.insert(tag, Face { vertices });
        self.mesh = None;
        Ok(tag)
    }

    pub fn add_solid(&mut self, faces: &[Tag]) -> Result<Tag, KernelError> {
        for &f in faces {
            if !self.faces.contains_key(&f) {
                return Err(KernelError::UnknownEntity { dim: Dim::Surface, tag: f });
            }
        }
        let mut unique = faces.to_vec();
        unique.dedup();
        let tag = self.allocate(Dim::Volume);
        self.solids.insert(tag, Solid { faces: unique });
        Ok(tag)
    }

    /// Adds an axis-aligned box as a solid with six outward-wound faces.
    pub fn add_box(&mut self, min: [f64; 3], max: [f64; 3]) -> Result<Tag, KernelError> {
        let mut corner = [0; 8];
        for (i, slot) in corner.iter_mut().enumerate() {
            let x = if i & 1 == 0 { min[0] } else { max[0] };
            let y = if i & 2 == 0 { min[1] } else { max[1] };
            let z = if i & 4 == 0 { min[2] } else { max[2] };
            *slot = self.add_vertex(x, y, z);
        }
        let loops = [
            [0, 2, 3, 1], // z min
            [4, 5, 7, 6], // z max
            [0, 1, 5, 4], // y min
            [2, 6, 7, 3], // y max
            [0, 4, 6, 2], // x min
            [1, 3, 7, 5], // x max
        ];
        let mut faces = Vec::with_capacity(6);
        for l in loops {
            faces.push(self.add_face(&l.map(|i| corner[i]))?);
        }
        self.add_solid(&faces)
    }

    pub(crate) fn face(&self, tag: Tag) -> Result<&Face, KernelError> {
        self.faces
            .get(&tag)
            .ok_or(KernelError::UnknownEntity { dim: Dim::Surface, tag })
    }

    pub(crate) fn solid(&self, tag: Tag) -> Result<&Solid, KernelError> {
        self.solids
            .get(&tag)
            .ok_or(KernelError::UnknownEntity { dim: Dim::Volume, tag })
    }

    pub(crate) fn face_points(&self, face: &Face) -> Vec<Vector3<f64>> {
        face.vertices
            .iter()
            .filter_map(|v| self.vertices.get(v).copied())
            .collect()
    }

    pub(crate) fn face_edges(&self, face: &Face) -> Vec<Tag> {
        let mut edges: Vec<Tag> = face
            .loop_pairs()
            .filter_map(|(a, b)| self.edge_index.get(&edge_key(a, b)).copied())
            .collect();
        edges.dedup();
        edges
    }

    pub(crate) fn contains(&self, dim: Dim, tag: Tag) -> bool {
        match dim {
            Dim::Point => self.vertices.contains_key(&tag),
            Dim::Curve => self.edges.contains_key(&tag),
            Dim::Surface => self.faces.contains_key(&tag),
            Dim::Volume => self.solids.contains_key(&tag),
        }
    }

    pub(crate) fn check(&self, dim: Dim, tag: Tag) -> Result<(), KernelError> {
        if self.contains(dim, tag) {
            Ok(())
        } else {
            Err(KernelError::UnknownEntity { dim, tag })
        }
    }

    /// Per-face winding signs that make every shell of the solid consistently
    /// outward. Faces are walked breadth-first across shared edges, which a
    /// consistently wound neighbour traverses in the opposite direction.
    pub(crate) fn outward_signs(&self, solid: &Solid) -> HashMap<Tag, f64> {
        let mut users: HashMap<(Tag, Tag), Vec<(Tag, bool)>> = HashMap::new();
        for &f in &solid.faces {
            if let Some(face) = self.faces.get(&f) {
                for (a, b) in face.loop_pairs() {
                    users.entry(edge_key(a, b)).or_default().push((f, a < b));
                }
            }
        }

        let mut signs: HashMap<Tag, f64> = HashMap::new();
        for &seed in &solid.faces {
            if signs.contains_key(&seed) || !self.faces.contains_key(&seed) {
                continue;
            }
            let mut component = vec![seed];
            signs.insert(seed, 1.0);
            let mut queue = VecDeque::from([seed]);
            while let Some(f) = queue.pop_front() {
                let sign = signs[&f];
                let Some(face) = self.faces.get(&f) else {
                    continue;
                };
                for (a, b) in face.loop_pairs() {
                    let forward = a < b;
                    for &(g, g_forward) in &users[&edge_key(a, b)] {
                        if g == f || signs.contains_key(&g) {
                            continue;
                        }
                        let s = if g_forward == forward { -sign } else { sign };
                        signs.insert(g, s);
                        component.push(g);
                        queue.push_back(g);
                    }
                }
            }

            let volume: f64 = component
                .iter()
                .map(|f| signs[f] * self.signed_volume(&self.faces[f]).0)
                .sum();
            if volume < 0.0 {
                for f in component {
                    if let Some(s) = signs.get_mut(&f) {
                        *s = -*s;
                    }
                }
            }
        }
        signs
    }

    /// Signed volume of the cone from the origin to the face, and the
    /// first moment of that cone.
    pub(crate) fn signed_volume(&self, face: &Face) -> (f64, Vector3<f64>) {
        let points = self.face_points(face);
        let mut volume = 0.0;
        let mut moment = Vector3::zeros();
        for [i, j, k] in polygon::triangulate(&points) {
            let (a, b, c) = (points[i], points[j], points[k]);
            let v = a.dot(&b.cross(&c)) / 6.0;
            volume += v;
            moment += (a + b + c) * (v / 4.0);
        }
        (volume, moment)
    }
}
