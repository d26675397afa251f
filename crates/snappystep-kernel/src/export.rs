use crate::model::{FacetedKernel, Group};
use nalgebra::Vector3;
use snappystep_core::kernel::{Dim, KernelError, Tag};
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

pub(crate) fn write_text(path: &Path, text: &str) -> Result<(), KernelError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| KernelError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    fs::write(path, text).map_err(|source| KernelError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn fmt_point(p: &Vector3<f64>) -> String {
    format!("{} {} {}", p.x, p.y, p.z)
}

impl FacetedKernel {
    /// Surface tags a group stands for; volume groups expand to their faces.
    fn group_faces(&self, group: &Group) -> Vec<Tag> {
        match group.dim {
            Dim::Surface => group.tags.clone(),
            Dim::Volume => {
                let mut faces: Vec<Tag> = group
                    .tags
                    .iter()
                    .filter_map(|v| self.solids.get(v))
                    .flat_map(|s| s.faces.iter().copied())
                    .collect();
                faces.sort_unstable();
                faces.dedup();
                faces
            }
            _ => Vec::new(),
        }
    }

    /// ASCII STL with one `solid` block per surface group.
    pub(crate) fn stl_text(&self) -> Result<String, KernelError> {
        let mesh = self.mesh.as_ref().ok_or(KernelError::NoMesh)?;
        let mut out = String::new();
        let mut written = 0;
        for group in &self.groups {
            let faces = self.group_faces(group);
            if faces.is_empty() {
                continue;
            }
            writeln!(out, "solid {}", group.name)?;
            for face in faces {
                for tri in mesh.triangles.get(&face).into_iter().flatten() {
                    let normal = (tri[1] - tri[0])
                        .cross(&(tri[2] - tri[0]))
                        .try_normalize(0.0)
                        .unwrap_or_else(Vector3::zeros);
                    writeln!(out, "facet normal {}", fmt_point(&normal))?;
                    writeln!(out, "  outer loop")?;
                    for p in tri {
                        writeln!(out, "    vertex {}", fmt_point(p))?;
                    }
                    writeln!(out, "  endloop")?;
                    writeln!(out, "endfacet")?;
                }
            }
            writeln!(out, "endsolid {}", group.name)?;
            written += 1;
        }
        if written == 0 {
            return Err(KernelError::NoGroups);
        }
        Ok(out)
    }

    /// Legacy VTK polydata. Curve groups become line cells, surface groups
    /// become triangles, or face outlines when no mesh exists yet. Each
    /// cell carries its group index and entity tag.
    pub(crate) fn vtk_text(&self) -> Result<String, KernelError> {
        let mut points: Vec<Vector3<f64>> = Vec::new();
        let mut lines: Vec<(Vec<usize>, usize, Tag)> = Vec::new();
        let mut polygons: Vec<(Vec<usize>, usize, Tag)> = Vec::new();

        let mut push = |cell_points: &[Vector3<f64>]| -> Vec<usize> {
            let start = points.len();
            points.extend_from_slice(cell_points);
            (start..points.len()).collect()
        };

        for (index, group) in self.groups.iter().enumerate() {
            if group.dim == Dim::Curve {
                for &edge in &group.tags {
                    let polyline = match self.mesh.as_ref().and_then(|m| m.polylines.get(&edge)) {
                        Some(line) => line.clone(),
                        None => {
                            let Some(e) = self.edges.get(&edge) else {
                                continue;
                            };
                            [e.start, e.end]
                                .iter()
                                .filter_map(|v| self.vertices.get(v).copied())
                                .collect()
                        }
                    };
                    for pair in polyline.windows(2) {
                        lines.push((push(pair), index, edge));
                    }
                }
                continue;
            }
            for face in self.group_faces(group) {
                match self.mesh.as_ref().and_then(|m| m.triangles.get(&face)) {
                    Some(triangles) => {
                        for tri in triangles {
                            polygons.push((push(&tri[..]), index, face));
                        }
                    }
                    None => {
                        let Some(f) = self.faces.get(&face) else {
                            continue;
                        };
                        let outline = self.face_points(f);
                        polygons.push((push(&outline[..]), index, face));
                    }
                }
            }
        }

        if lines.is_empty() && polygons.is_empty() {
            return Err(KernelError::NoGroups);
        }

        let title = self
            .groups
            .first()
            .map(|g| g.name.as_str())
            .unwrap_or("snappystep");
        let mut out = String::new();
        writeln!(out, "# vtk DataFile Version 2.0")?;
        writeln!(out, "{title}")?;
        writeln!(out, "ASCII")?;
        writeln!(out, "DATASET POLYDATA")?;
        writeln!(out, "POINTS {} double", points.len())?;
        for p in &points {
            writeln!(out, "{}", fmt_point(p))?;
        }
        for (keyword, cells) in [("LINES", &lines), ("POLYGONS", &polygons)] {
            if cells.is_empty() {
                continue;
            }
            let size: usize = cells.iter().map(|(ids, _, _)| ids.len() + 1).sum();
            writeln!(out, "{keyword} {} {size}", cells.len())?;
            for (ids, _, _) in cells.iter() {
                let ids: Vec<String> = ids.iter().map(usize::to_string).collect();
                writeln!(out, "{} {}", ids.len(), ids.join(" "))?;
            }
        }

        let cells: Vec<&(Vec<usize>, usize, Tag)> = lines.iter().chain(polygons.iter()).collect();
        writeln!(out, "CELL_DATA {}", cells.len())?;
        writeln!(out, "SCALARS group int 1")?;
        writeln!(out, "LOOKUP_TABLE default")?;
        for (_, group, _) in &cells {
            writeln!(out, "{group}")?;
        }
        writeln!(out, "SCALARS tag int 1")?;
        writeln!(out, "LOOKUP_TABLE default")?;
        for (_, _, tag) in &cells {
            writeln!(out, "{tag}")?;
        }
        Ok(out)
    }
}
