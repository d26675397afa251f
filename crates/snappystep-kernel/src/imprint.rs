use crate::model::{edge_key, Edge, FacetedKernel};
use crate::polygon::{self, Projection};
use nalgebra::{Vector2, Vector3};
use snappystep_core::geom::BBox3;
use snappystep_core::kernel::{CadKernel, Dim, KernelError, Overlap, Tag};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::{debug, info, warn};

const RELATIVE_TOLERANCE: f64 = 1e-9;
const ABSOLUTE_TOLERANCE: f64 = 1e-12;
/// Points closer than this many weld tolerances to a boundary lie on it.
const CONTACT_FACTOR: f64 = 1e3;
const PARALLEL_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ImprintSummary {
    pub merged_points: usize,
    pub merged_curves: usize,
    pub merged_surfaces: usize,
    pub dropped_surfaces: usize,
}

impl FacetedKernel {
    /// Welds coincident points, then collapses edges with the same end
    /// points and faces with the same vertex set. The lowest tag survives
    /// each merge and keeps any name the merged entities carried.
    pub(crate) fn fuse_coincident(&mut self) -> ImprintSummary {
        let mut summary = ImprintSummary::default();
        let tol = self.weld_tolerance();

        // 1. Weld points
        let rep = self.weld_points(tol);
        for (&v, &r) in &rep {
            if v != r {
                self.vertices.remove(&v);
                self.carry_name(Dim::Point, v, r);
                summary.merged_points += 1;
            }
        }
        let map_vertex = |v: Tag| rep.get(&v).copied().unwrap_or(v);

        // 2. Remap face loops
        let mut dropped = Vec::new();
        for (&tag, face) in self.faces.iter_mut() {
            let mut vertices: Vec<Tag> = Vec::with_capacity(face.vertices.len());
            for v in face.vertices.iter().map(|&v| map_vertex(v)) {
                if vertices.last() != Some(&v) {
                    vertices.push(v);
                }
            }
            while vertices.len() > 1 && vertices.first() == vertices.last() {
                vertices.pop();
            }
            if vertices.len() < 3 {
                dropped.push(tag);
            }
            face.vertices = vertices;
        }
        for tag in dropped {
            warn!(surface = tag, "face collapsed while welding points, removing it");
            self.faces.remove(&tag);
            self.names.remove(&(Dim::Surface, tag));
            for solid in self.solids.values_mut() {
                solid.faces.retain(|&f| f != tag);
            }
            summary.dropped_surfaces += 1;
        }

        // 3. Merge edges
        let old_edges = std::mem::take(&mut self.edges);
        self.edge_index.clear();
        for (tag, edge) in old_edges {
            let edge = Edge {
                start: map_vertex(edge.start),
                end: map_vertex(edge.end),
            };
            if edge.start == edge.end {
                self.names.remove(&(Dim::Curve, tag));
                summary.merged_curves += 1;
                continue;
            }
            match self.edge_index.get(&edge.key()) {
                Some(&survivor) => {
                    self.carry_name(Dim::Curve, tag, survivor);
                    summary.merged_curves += 1;
                }
                None => {
                    self.edge_index.insert(edge.key(), tag);
                    self.edges.insert(tag, edge);
                }
            }
        }
        let pairs: Vec<(Tag, Tag)> = self
            .faces
            .values()
            .flat_map(|f| f.loop_pairs().collect::<Vec<_>>())
            .collect();
        for (a, b) in pairs {
            if !self.edge_index.contains_key(&edge_key(a, b)) {
                self.ensure_edge(a, b);
            }
        }

        // 4. Merge faces
        let mut by_vertex_set: BTreeMap<Vec<Tag>, Tag> = BTreeMap::new();
        let mut face_rep: HashMap<Tag, Tag> = HashMap::new();
        for (&tag, face) in &self.faces {
            let mut key = face.vertices.clone();
            key.sort_unstable();
            key.dedup();
            match by_vertex_set.get(&key) {
                Some(&survivor) => {
                    face_rep.insert(tag, survivor);
                }
                None => {
                    by_vertex_set.insert(key, tag);
                }
            }
        }
        for (&tag, &survivor) in &face_rep {
            self.faces.remove(&tag);
            self.carry_name(Dim::Surface, tag, survivor);
            summary.merged_surfaces += 1;
        }
        for solid in self.solids.values_mut() {
            let mut faces: Vec<Tag> = Vec::with_capacity(solid.faces.len());
            for f in solid.faces.iter().map(|f| face_rep.get(f).copied().unwrap_or(*f)) {
                if !faces.contains(&f) {
                    faces.push(f);
                }
            }
            solid.faces = faces;
        }

        // 5. Drop edges no face uses any more
        let used: std::collections::HashSet<(Tag, Tag)> = self
            .faces
            .values()
            .flat_map(|f| f.loop_pairs().map(|(a, b)| edge_key(a, b)).collect::<Vec<_>>())
            .collect();
        let orphaned: Vec<Tag> = self
            .edges
            .iter()
            .filter(|(_, e)| !used.contains(&e.key()))
            .map(|(&t, _)| t)
            .collect();
        for tag in orphaned {
            if let Some(edge) = self.edges.remove(&tag) {
                self.edge_index.remove(&edge.key());
            }
            self.names.remove(&(Dim::Curve, tag));
        }

        self.mesh = None;
        info!(
            points = summary.merged_points,
            curves = summary.merged_curves,
            surfaces = summary.merged_surfaces,
            "imprinted model"
        );
        summary
    }

    /// Fails when two volumes overlap instead of meeting on whole shared
    /// faces. Fusion only merges faces with the same vertex set, so nested
    /// bodies and partial contacts survive it unchanged.
    pub(crate) fn check_conforming(&self) -> Result<(), KernelError> {
        let tol = self.weld_tolerance() * CONTACT_FACTOR;
        let boxes: BTreeMap<Tag, BBox3> = self
            .solids
            .keys()
            .map(|&s| Ok((s, self.bounding_box(Dim::Volume, s)?)))
            .collect::<Result<_, KernelError>>()?;

        // 1. Nothing of one volume may lie strictly inside another
        for (&a, box_a) in &boxes {
            let samples = self.solid_samples(a);
            for (&b, box_b) in &boxes {
                if a == b || !boxes_touch(box_a, box_b, tol) {
                    continue;
                }
                for p in &samples {
                    if self.boundary_distance(b, p) > tol && self.is_inside(b, crate::from_na(p))? {
                        debug!(volume = a, inside = b, point = ?p, "volume reaches into another");
                        return Err(not_conforming(a, b, Overlap::Nested));
                    }
                }
            }
        }

        // 2. Coplanar faces of different volumes must be the same face
        let mut owners: BTreeMap<Tag, BTreeSet<Tag>> = BTreeMap::new();
        for (&s, solid) in &self.solids {
            for &f in &solid.faces {
                owners.entry(f).or_default().insert(s);
            }
        }
        let planes: Vec<(Tag, Vec<Vector3<f64>>, Vector3<f64>)> = owners
            .keys()
            .filter_map(|&f| {
                let points = self.face_points(self.faces.get(&f)?);
                let normal = polygon::newell_normal(&points).try_normalize(f64::MIN_POSITIVE)?;
                Some((f, points, normal))
            })
            .collect();
        for (i, (f, points_f, normal_f)) in planes.iter().enumerate() {
            for (g, points_g, normal_g) in &planes[i + 1..] {
                if !owners[f].is_disjoint(&owners[g]) {
                    continue;
                }
                if normal_f.dot(normal_g).abs() < 1.0 - PARALLEL_TOLERANCE {
                    continue;
                }
                let offset = (polygon::centroid(points_g) - polygon::centroid(points_f)).dot(normal_f);
                if offset.abs() > tol || !faces_overlap(points_f, points_g, normal_f, tol) {
                    continue;
                }
                debug!(first = f, second = g, "coplanar faces overlap without being shared");
                let (Some(&a), Some(&b)) = (owners[f].first(), owners[g].first()) else {
                    continue;
                };
                return Err(not_conforming(a, b, Overlap::PartialContact));
            }
        }
        Ok(())
    }

    /// Corners of a volume plus one point inside every triangle of its faces.
    fn solid_samples(&self, solid: Tag) -> Vec<Vector3<f64>> {
        let Some(solid) = self.solids.get(&solid) else {
            return Vec::new();
        };
        let mut samples = Vec::new();
        for face in solid.faces.iter().filter_map(|f| self.faces.get(f)) {
            let points = self.face_points(face);
            for [i, j, k] in polygon::triangulate(&points) {
                samples.push((points[i] + points[j] + points[k]) / 3.0);
            }
            samples.extend(points);
        }
        samples
    }

    fn boundary_distance(&self, solid: Tag, p: &Vector3<f64>) -> f64 {
        let Some(solid) = self.solids.get(&solid) else {
            return f64::INFINITY;
        };
        solid
            .faces
            .iter()
            .filter_map(|f| self.faces.get(f))
            .map(|face| {
                let points = self.face_points(face);
                (polygon::closest_on_polygon(&points, p) - p).norm()
            })
            .fold(f64::INFINITY, f64::min)
    }

    fn weld_tolerance(&self) -> f64 {
        let mut min = [f64::INFINITY; 3];
        let mut max = [f64::NEG_INFINITY; 3];
        for p in self.vertices.values() {
            for i in 0..3 {
                min[i] = min[i].min(p[i]);
                max[i] = max[i].max(p[i]);
            }
        }
        let diag = (0..3)
            .map(|i| (max[i] - min[i]).powi(2))
            .sum::<f64>()
            .sqrt();
        if diag.is_finite() {
            (diag * RELATIVE_TOLERANCE).max(ABSOLUTE_TOLERANCE)
        } else {
            ABSOLUTE_TOLERANCE
        }
    }

    /// Maps every point to the lowest tag within `tol` of it, sweeping
    /// points sorted along x.
    fn weld_points(&self, tol: f64) -> HashMap<Tag, Tag> {
        let mut order: Vec<(Tag, nalgebra::Vector3<f64>)> =
            self.vertices.iter().map(|(&t, &p)| (t, p)).collect();
        order.sort_by(|a, b| a.1.x.total_cmp(&b.1.x).then(a.0.cmp(&b.0)));

        let mut cluster: HashMap<Tag, usize> = HashMap::new();
        let mut members: Vec<Vec<Tag>> = Vec::new();
        for i in 0..order.len() {
            let (ti, pi) = order[i];
            if cluster.contains_key(&ti) {
                continue;
            }
            let id = members.len();
            cluster.insert(ti, id);
            members.push(vec![ti]);
            for &(tj, pj) in &order[i + 1..] {
                if pj.x - pi.x > tol {
                    break;
                }
                if !cluster.contains_key(&tj) && (pj - pi).norm() <= tol {
                    cluster.insert(tj, id);
                    members[id].push(tj);
                }
            }
        }

        let mut rep = HashMap::with_capacity(cluster.len());
        for group in members {
            let lowest = group.iter().copied().min().unwrap_or_default();
            for t in group {
                rep.insert(t, lowest);
            }
        }
        rep
    }

    fn carry_name(&mut self, dim: Dim, from: Tag, to: Tag) {
        if let Some(name) = self.names.remove(&(dim, from)) {
            self.names.entry((dim, to)).or_insert(name);
        }
    }
}

fn not_conforming(a: Tag, b: Tag, overlap: Overlap) -> KernelError {
    KernelError::NotConforming {
        first: a.min(b),
        second: a.max(b),
        overlap,
    }
}

fn boxes_touch(a: &BBox3, b: &BBox3, tol: f64) -> bool {
    a.min.x <= b.max.x + tol
        && b.min.x <= a.max.x + tol
        && a.min.y <= b.max.y + tol
        && b.min.y <= a.max.y + tol
        && a.min.z <= b.max.z + tol
        && b.min.z <= a.max.z + tol
}

/// Whether two coplanar loops share any area.
fn faces_overlap(a: &[Vector3<f64>], b: &[Vector3<f64>], normal: &Vector3<f64>, tol: f64) -> bool {
    let proj = Projection::along(normal);
    let flat = |points: &[Vector3<f64>]| -> Vec<Vector2<f64>> { points.iter().map(|p| proj.apply(p)).collect() };
    let samples = |points: &[Vector3<f64>]| -> Vec<Vector2<f64>> {
        let mut out: Vec<Vector2<f64>> = polygon::triangulate(points)
            .into_iter()
            .map(|[i, j, k]| proj.apply(&((points[i] + points[j] + points[k]) / 3.0)))
            .collect();
        out.extend(points.iter().map(|p| proj.apply(p)));
        out
    };
    let (poly_a, poly_b) = (flat(a), flat(b));

    if samples(a).iter().any(|p| strictly_inside(&poly_b, p, tol))
        || samples(b).iter().any(|p| strictly_inside(&poly_a, p, tol))
    {
        return true;
    }
    let edges = |poly: &[Vector2<f64>]| -> Vec<(Vector2<f64>, Vector2<f64>)> {
        (0..poly.len()).map(|i| (poly[i], poly[(i + 1) % poly.len()])).collect()
    };
    let edges_b = edges(poly_b.as_slice());
    edges(poly_a.as_slice())
        .iter()
        .any(|ea| edges_b.iter().any(|eb| segments_cross(ea, eb, tol)))
}

fn strictly_inside(poly: &[Vector2<f64>], p: &Vector2<f64>, tol: f64) -> bool {
    if !polygon::contains_2d(poly, p) {
        return false;
    }
    (0..poly.len()).all(|i| segment_distance(p, &poly[i], &poly[(i + 1) % poly.len()]) > tol)
}

fn segment_distance(p: &Vector2<f64>, a: &Vector2<f64>, b: &Vector2<f64>) -> f64 {
    let ab = b - a;
    let len2 = ab.norm_squared();
    let t = if len2 > 0.0 { ((p - a).dot(&ab) / len2).clamp(0.0, 1.0) } else { 0.0 };
    (a + ab * t - p).norm()
}

/// Proper crossing: each segment has the other's end points strictly on
/// opposite sides.
fn segments_cross(
    (a, b): &(Vector2<f64>, Vector2<f64>),
    (c, d): &(Vector2<f64>, Vector2<f64>),
    tol: f64,
) -> bool {
    let side = |o: &Vector2<f64>, e: &Vector2<f64>, p: &Vector2<f64>| {
        let dir = e - o;
        let len = dir.norm();
        if len == 0.0 {
            return 0;
        }
        let s = (dir.x * (p.y - o.y) - dir.y * (p.x - o.x)) / len;
        if s > tol {
            1
        } else if s < -tol {
            -1
        } else {
            0
        }
    };
    side(a, b, c) * side(a, b, d) < 0 && side(c, d, a) * side(c, d, b) < 0
}
