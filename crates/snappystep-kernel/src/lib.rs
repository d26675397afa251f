//! Faceted B-rep kernel backing the snappystep pipeline.
//!
//! Reads planar solids from STEP files, imprints touching bodies so they share
//! faces, answers adjacency and point queries, and writes STL/VTK meshes.

mod export;
mod imprint;
mod mesh;
mod model;
mod polygon;
mod step;

pub use imprint::ImprintSummary;
pub use mesh::SurfaceMesh;
pub use model::FacetedKernel;
pub use step::StepError;

use model::Group;
use nalgebra::Vector3;
use snappystep_core::geom::{BBox3, Vec3};
use snappystep_core::kernel::{
    CadKernel, Dim, EntityCounts, KernelError, MassProperties, MeshOptions, Tag,
};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

/// Ray directions for the inside test; skewed so rays rarely graze edges.
const RAY_DIRECTIONS: [[f64; 3]; 3] = [
    [0.5773, 0.5774, 0.5775],
    [-0.6123, 0.3145, 0.7254],
    [0.2718, -0.8283, 0.4899],
];

fn to_na(p: Vec3) -> Vector3<f64> {
    Vector3::new(p.x, p.y, p.z)
}

fn from_na(p: &Vector3<f64>) -> Vec3 {
    Vec3::new(p.x, p.y, p.z)
}

fn has_step_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("stp") || e.eq_ignore_ascii_case("step"))
        .unwrap_or(false)
}

impl FacetedKernel {
    /// Parses STEP text and adds its solids to the model.
    pub fn load_step_str(&mut self, text: &str, scaling: f64) -> Result<Vec<Tag>, StepError> {
        let shapes = step::read_step(text)?;
        let factor = shapes.length_unit * scaling;

        let mut point_tags: HashMap<u64, Tag> = HashMap::new();
        let mut face_tags: HashMap<u64, Tag> = HashMap::new();
        let mut solids = Vec::with_capacity(shapes.solids.len());
        for solid in shapes.solids {
            let mut faces = Vec::with_capacity(solid.faces.len());
            for face in solid.faces {
                if let Some(&tag) = face_tags.get(&face.id) {
                    faces.push(tag);
                    continue;
                }
                let mut loop_vertices = Vec::with_capacity(face.points.len());
                for (id, p) in &face.points {
                    let tag = match point_tags.get(id) {
                        Some(&tag) => tag,
                        None => {
                            let q = p * factor;
                            let tag = self.add_vertex(q.x, q.y, q.z);
                            point_tags.insert(*id, tag);
                            tag
                        }
                    };
                    loop_vertices.push(tag);
                }
                let tag = self
                    .add_face(&loop_vertices)
                    .map_err(|err| StepError::Topology {
                        entity: "face",
                        id: face.id,
                        message: err.to_string(),
                    })?;
                if let Some(name) = face.name {
                    self.names.insert((Dim::Surface, tag), name);
                }
                face_tags.insert(face.id, tag);
                faces.push(tag);
            }
            let tag = self
                .add_solid(&faces)
                .map_err(|err| StepError::Topology {
                    entity: "solid",
                    id: solid.id,
                    message: err.to_string(),
                })?;
            if let Some(name) = solid.name {
                self.names.insert((Dim::Volume, tag), name);
            }
            debug!(volume = tag, step_id = solid.id, faces = faces.len(), "imported solid");
            solids.push(tag);
        }
        Ok(solids)
    }

    /// Imprints the model and reports how many entities were merged.
    pub fn imprint_with_summary(&mut self) -> Result<ImprintSummary, KernelError> {
        let summary = self.fuse_coincident();
        self.check_conforming()?;
        Ok(summary)
    }

    fn points_of(&self, dim: Dim, tag: Tag) -> Result<Vec<Vector3<f64>>, KernelError> {
        self.check(dim, tag)?;
        let points = match dim {
            Dim::Point => vec![self.vertices[&tag]],
            Dim::Curve => {
                let e = &self.edges[&tag];
                vec![self.vertices[&e.start], self.vertices[&e.end]]
            }
            Dim::Surface => self.face_points(&self.faces[&tag]),
            Dim::Volume => self.solids[&tag]
                .faces
                .iter()
                .filter_map(|f| self.faces.get(f))
                .flat_map(|f| self.face_points(f))
                .collect(),
        };
        Ok(points)
    }
}

impl CadKernel for FacetedKernel {
    fn import_shapes(&mut self, path: &Path, scaling: f64) -> Result<(), KernelError> {
        if !has_step_extension(path) {
            return Err(KernelError::UnsupportedFormat(path.to_path_buf()));
        }
        let text = std::fs::read_to_string(path).map_err(|source| KernelError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let solids = self
            .load_step_str(&text, scaling)
            .map_err(|err| KernelError::Import {
                path: path.to_path_buf(),
                source: Box::new(err),
            })?;
        info!(path = %path.display(), volumes = solids.len(), "imported STEP file");
        Ok(())
    }

    fn imprint(&mut self) -> Result<(), KernelError> {
        self.imprint_with_summary().map(|_| ())
    }

    fn counts(&self) -> EntityCounts {
        EntityCounts {
            points: self.vertices.len(),
            curves: self.edges.len(),
            surfaces: self.faces.len(),
            volumes: self.solids.len(),
        }
    }

    fn entities(&self, dim: Dim) -> Vec<Tag> {
        match dim {
            Dim::Point => self.vertices.keys().copied().collect(),
            Dim::Curve => self.edges.keys().copied().collect(),
            Dim::Surface => self.faces.keys().copied().collect(),
            Dim::Volume => self.solids.keys().copied().collect(),
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
        let found: Vec<Tag> = match dim {
            Dim::Point => self
                .edges
                .iter()
                .filter(|(_, e)| e.start == tag || e.end == tag)
                .map(|(&t, _)| t)
                .collect(),
            Dim::Curve => {
                let key = self.edges[&tag].key();
                self.faces
                    .iter()
                    .filter(|(_, f)| f.loop_pairs().any(|(a, b)| model::edge_key(a, b) == key))
                    .map(|(&t, _)| t)
                    .collect()
            }
            Dim::Surface => self
                .solids
                .iter()
                .filter(|(_, s)| s.faces.contains(&tag))
                .map(|(&t, _)| t)
                .collect(),
            Dim::Volume => {
                return Err(KernelError::NoAdjacency {
                    dim,
                    relation: "upward",
                })
            }
        };
        Ok(found)
    }

    fn downward(&self, dim: Dim, tag: Tag) -> Result<Vec<Tag>, KernelError> {
        self.check(dim, tag)?;
        let found = match dim {
            Dim::Point => {
                return Err(KernelError::NoAdjacency {
                    dim,
                    relation: "downward",
                })
            }
            Dim::Curve => {
                let e = &self.edges[&tag];
                vec![e.start, e.end]
            }
            Dim::Surface => self.face_edges(&self.faces[&tag]),
            Dim::Volume => self.solids[&tag].faces.clone(),
        };
        Ok(found)
    }

    fn bounding_box(&self, dim: Dim, tag: Tag) -> Result<BBox3, KernelError> {
        Ok(BBox3::from_points(self.points_of(dim, tag)?.iter().map(from_na)))
    }

    fn model_bounding_box(&self) -> BBox3 {
        BBox3::from_points(self.vertices.values().map(from_na))
    }

    fn mass_properties(&self, volume: Tag) -> Result<MassProperties, KernelError> {
        let solid = self.solid(volume)?;
        let signs = self.outward_signs(solid);
        let mut total = 0.0;
        let mut moment = Vector3::zeros();
        for f in &solid.faces {
            let Some(face) = self.faces.get(f) else {
                continue;
            };
            let sign = signs.get(f).copied().unwrap_or(1.0);
            let (v, m) = self.signed_volume(face);
            total += sign * v;
            moment += m * sign;
        }
        if !(total.abs() > f64::EPSILON * f64::EPSILON) {
            return Err(KernelError::Degenerate {
                dim: Dim::Volume,
                tag: volume,
                message: "solid encloses no volume".to_string(),
            });
        }
        Ok(MassProperties {
            volume: total,
            center: from_na(&(moment / total)),
        })
    }

    fn is_inside(&self, volume: Tag, point: Vec3) -> Result<bool, KernelError> {
        let solid = self.solid(volume)?;
        let origin = to_na(point);
        let loops: Vec<Vec<Vector3<f64>>> = solid
            .faces
            .iter()
            .filter_map(|f| self.faces.get(f))
            .map(|f| self.face_points(f))
            .collect();

        let votes = RAY_DIRECTIONS
            .iter()
            .filter(|d| {
                let dir = Vector3::new(d[0], d[1], d[2]);
                let crossings = loops
                    .iter()
                    .filter(|l| polygon::ray_hit(&origin, &dir, l).is_some())
                    .count();
                crossings % 2 == 1
            })
            .count();
        Ok(votes * 2 > RAY_DIRECTIONS.len())
    }

    fn closest_point(&self, face: Tag, point: Vec3) -> Result<Vec3, KernelError> {
        let points = self.face_points(self.face(face)?);
        Ok(from_na(&polygon::closest_on_polygon(&points, &to_na(point))))
    }

    fn generate_surface_mesh(&mut self, options: &MeshOptions) -> Result<(), KernelError> {
        let mesh = self.build_surface_mesh(options);
        self.mesh = Some(mesh);
        Ok(())
    }

    fn clear_groups(&mut self) {
        self.groups.clear();
    }

    fn add_group(&mut self, dim: Dim, tags: &[Tag], name: &str) -> Result<(), KernelError> {
        for &tag in tags {
            self.check(dim, tag)?;
        }
        self.groups.push(Group {
            dim,
            tags: tags.to_vec(),
            name: name.to_string(),
        });
        Ok(())
    }

    fn write_groups(&self, path: &Path) -> Result<(), KernelError> {
        if self.groups.is_empty() {
            return Err(KernelError::NoGroups);
        }
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        let text = match extension.as_deref() {
            Some("stl") => self.stl_text()?,
            Some("vtk") => self.vtk_text()?,
            _ => return Err(KernelError::UnsupportedFormat(path.to_path_buf())),
        };
        export::write_text(path, &text)?;
        debug!(path = %path.display(), groups = self.groups.len(), "wrote mesh groups");
        Ok(())
    }
}
