use nalgebra::{Vector2, Vector3};
use spade::{ConstrainedDelaunayTriangulation, Point2, Triangulation};
use std::collections::HashMap;
use tracing::warn;

const EPSILON: f64 = 1e-300;

/// Newell normal of a closed loop; its length is twice the enclosed area.
pub fn newell_normal(points: &[Vector3<f64>]) -> Vector3<f64> {
    let mut n = Vector3::zeros();
    for (i, a) in points.iter().enumerate() {
        let b = &points[(i + 1) % points.len()];
        n.x += (a.y - b.y) * (a.z + b.z);
        n.y += (a.z - b.z) * (a.x + b.x);
        n.z += (a.x - b.x) * (a.y + b.y);
    }
    n
}

pub fn area(points: &[Vector3<f64>]) -> f64 {
    newell_normal(points).norm() * 0.5
}

pub fn centroid(points: &[Vector3<f64>]) -> Vector3<f64> {
    let sum: Vector3<f64> = points.iter().sum();
    sum / points.len().max(1) as f64
}

/// Drops the dominant axis of a normal so that loops wound counter-clockwise
/// around the normal stay counter-clockwise in 2D.
#[derive(Debug, Clone, Copy)]
pub struct Projection {
    u: usize,
    v: usize,
}

impl Projection {
    pub fn along(normal: &Vector3<f64>) -> Self {
        let a = normal.map(f64::abs);
        let axis = if a.x >= a.y && a.x >= a.z {
            0
        } else if a.y >= a.z {
            1
        } else {
            2
        };
        let (u, v) = match axis {
            0 => (1, 2),
            1 => (2, 0),
            _ => (0, 1),
        };
        if normal[axis] < 0.0 {
            Self { u: v, v: u }
        } else {
            Self { u, v }
        }
    }

    pub fn apply(&self, p: &Vector3<f64>) -> Vector2<f64> {
        Vector2::new(p[self.u], p[self.v])
    }
}

fn cross2(a: Vector2<f64>, b: Vector2<f64>) -> f64 {
    a.x * b.y - a.y * b.x
}

/// Crossing-number test; points on the boundary may land on either side.
pub fn contains_2d(poly: &[Vector2<f64>], p: &Vector2<f64>) -> bool {
    let mut inside = false;
    let mut j = poly.len().wrapping_sub(1);
    for i in 0..poly.len() {
        let (a, b) = (poly[i], poly[j]);
        if (a.y > p.y) != (b.y > p.y) {
            let x = a.x + (p.y - a.y) * (b.x - a.x) / (b.y - a.y);
            if p.x < x {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

pub fn closest_on_segment(p: &Vector3<f64>, a: &Vector3<f64>, b: &Vector3<f64>) -> Vector3<f64> {
    let ab = b - a;
    let len2 = ab.norm_squared();
    if len2 <= EPSILON {
        return *a;
    }
    let t = ((p - a).dot(&ab) / len2).clamp(0.0, 1.0);
    a + ab * t
}

pub fn closest_on_polygon(points: &[Vector3<f64>], p: &Vector3<f64>) -> Vector3<f64> {
    let normal = newell_normal(points);
    if let Some(unit) = normal.try_normalize(EPSILON) {
        let origin = centroid(points);
        let projected = p - unit * (p - origin).dot(&unit);
        let proj = Projection::along(&unit);
        let poly: Vec<Vector2<f64>> = points.iter().map(|q| proj.apply(q)).collect();
        if contains_2d(&poly, &proj.apply(&projected)) {
            return projected;
        }
    }

    let mut best = points[0];
    let mut best_d = f64::INFINITY;
    for (i, a) in points.iter().enumerate() {
        let b = &points[(i + 1) % points.len()];
        let q = closest_on_segment(p, a, b);
        let d = (q - p).norm_squared();
        if d < best_d {
            best_d = d;
            best = q;
        }
    }
    best
}

/// Distance along `dir` at which the ray from `origin` crosses the polygon.
pub fn ray_hit(origin: &Vector3<f64>, dir: &Vector3<f64>, points: &[Vector3<f64>]) -> Option<f64> {
    let normal = newell_normal(points);
    let denom = normal.dot(dir);
    if denom.abs() <= EPSILON {
        return None;
    }
    let t = normal.dot(&(points[0] - origin)) / denom;
    if t <= 0.0 {
        return None;
    }
    let hit = origin + dir * t;
    let proj = Projection::along(&normal);
    let poly: Vec<Vector2<f64>> = points.iter().map(|q| proj.apply(q)).collect();
    contains_2d(&poly, &proj.apply(&hit)).then_some(t)
}

/// Constrained Delaunay triangulation of a simple planar loop. Triangles
/// index into `points` and keep the winding of the input.
pub fn triangulate(points: &[Vector3<f64>]) -> Vec<[usize; 3]> {
    if points.len() < 3 {
        return Vec::new();
    }
    if points.len() == 3 {
        return vec![[0, 1, 2]];
    }

    let proj = Projection::along(&newell_normal(points));
    let pts: Vec<Vector2<f64>> = points.iter().map(|p| proj.apply(p)).collect();

    let mut cdt = ConstrainedDelaunayTriangulation::<Point2<f64>>::new();
    let mut handles = Vec::with_capacity(pts.len());
    let mut source: HashMap<usize, usize> = HashMap::new();
    for (i, p) in pts.iter().enumerate() {
        let handle = match cdt.insert(Point2::new(p.x, p.y)) {
            Ok(handle) => handle,
            Err(err) => {
                warn!(%err, "loop cannot be triangulated");
                return Vec::new();
            }
        };
        source.entry(handle.index()).or_insert(i);
        handles.push(handle);
    }
    for i in 0..handles.len() {
        let (from, to) = (handles[i], handles[(i + 1) % handles.len()]);
        if from != to && cdt.can_add_constraint(from, to) {
            cdt.add_constraint(from, to);
        }
    }

    let mut triangles = Vec::with_capacity(pts.len() - 2);
    for face in cdt.inner_faces() {
        let [a, b, c] = face
            .vertices()
            .map(|v| source.get(&v.fix().index()).copied());
        let (Some(a), Some(b), Some(c)) = (a, b, c) else {
            continue;
        };
        let centre = (pts[a] + pts[b] + pts[c]) / 3.0;
        if !contains_2d(&pts, &centre) {
            continue;
        }
        if cross2(pts[b] - pts[a], pts[c] - pts[a]) >= 0.0 {
            triangles.push([a, b, c]);
        } else {
            triangles.push([a, c, b]);
        }
    }
    triangles
}
