use crate::model::FacetedKernel;
use crate::polygon;
use nalgebra::Vector3;
use snappystep_core::kernel::{MeshOptions, Tag};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Upper bound on splits per triangle side and per edge.
const MAX_DIVISIONS: usize = 64;

pub type Triangle = [Vector3<f64>; 3];

/// Triangulated faces and polyline edges.
#[derive(Debug, Clone, Default)]
pub struct SurfaceMesh {
    pub triangles: BTreeMap<Tag, Vec<Triangle>>,
    pub polylines: BTreeMap<Tag, Vec<Vector3<f64>>>,
}

impl SurfaceMesh {
    pub fn triangle_count(&self) -> usize {
        self.triangles.values().map(Vec::len).sum()
    }
}

fn divisions(length: f64, target: f64) -> usize {
    if !(target > 0.0) || !length.is_finite() {
        return 1;
    }
    ((length / target).ceil() as usize).clamp(1, MAX_DIVISIONS)
}

/// Splits a triangle into `n * n` similar triangles.
fn subdivide(tri: &Triangle, n: usize, out: &mut Vec<Triangle>) {
    if n <= 1 {
        out.push(*tri);
        return;
    }
    let [a, b, c] = *tri;
    let step_u = (b - a) / n as f64;
    let step_v = (c - a) / n as f64;
    let at = |i: usize, j: usize| a + step_u * i as f64 + step_v * j as f64;
    for i in 0..n {
        for j in 0..(n - i) {
            out.push([at(i, j), at(i + 1, j), at(i, j + 1)]);
            if i + j + 1 < n {
                out.push([at(i + 1, j), at(i + 1, j + 1), at(i, j + 1)]);
            }
        }
    }
}

impl FacetedKernel {
    pub(crate) fn build_surface_mesh(&self, options: &MeshOptions) -> SurfaceMesh {
        let target = options.target_size();
        debug!(target, algorithm = options.algorithm, "meshing faces");
        let mut mesh = SurfaceMesh::default();

        for (&tag, face) in &self.faces {
            let points = self.face_points(face);
            let mut triangles = Vec::new();
            for [i, j, k] in polygon::triangulate(&points) {
                let tri = [points[i], points[j], points[k]];
                if polygon::area(&tri) <= 0.0 {
                    continue;
                }
                let longest = (0..3)
                    .map(|e| (tri[(e + 1) % 3] - tri[e]).norm())
                    .fold(0.0, f64::max);
                subdivide(&tri, divisions(longest, target), &mut triangles);
            }
            mesh.triangles.insert(tag, triangles);
        }

        for (&tag, edge) in &self.edges {
            let (Some(a), Some(b)) = (self.vertices.get(&edge.start), self.vertices.get(&edge.end))
            else {
                continue;
            };
            let n = divisions((b - a).norm(), target);
            let line = (0..=n).map(|i| a + (b - a) * (i as f64 / n as f64)).collect();
            mesh.polylines.insert(tag, line);
        }

        info!(
            faces = mesh.triangles.len(),
            triangles = mesh.triangle_count(),
            "generated surface mesh"
        );
        mesh
    }
}
