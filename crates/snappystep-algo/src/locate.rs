//! Interior points for volume flood-fill.

use crate::error::LocatorError;
use crate::structs::{Classification, Volume};
use nalgebra::{Point3, Vector3};
use snappystep_core::config::Config;
use snappystep_core::geom::{BBox3, Vec3};
use snappystep_core::kernel::{CadKernel, Dim, KernelError, Tag};
use tracing::{debug, info};

/// Lattice resolutions tried in turn, in cells per axis.
pub const GRID_DENSITIES: [usize; 3] = [4, 12, 36];

const MAX_ASCENT_STEPS: usize = 200;

fn to_point(p: Vec3) -> Point3<f64> {
    Point3::new(p.x, p.y, p.z)
}

fn to_vec3(p: &Point3<f64>) -> Vec3 {
    Vec3::new(p.x, p.y, p.z)
}

struct Probe<'a> {
    kernel: &'a dyn CadKernel,
    tags: &'a [Tag],
    faces: Vec<Tag>,
    tolerance: f64,
}

impl Probe<'_> {
    fn is_inside(&self, p: Vec3) -> Result<bool, KernelError> {
        for &tag in self.tags {
            if self.kernel.is_inside(tag, p)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Smallest distance from `p` to any boundary face.
    fn clearance(&self, p: Vec3) -> Result<f64, KernelError> {
        let mut best = f64::INFINITY;
        for &face in &self.faces {
            best = best.min(self.kernel.closest_point(face, p)?.distance(p));
        }
        Ok(best)
    }

    /// Signed clearance: positive inside, negative outside.
    fn depth(&self, p: &Point3<f64>) -> Result<f64, KernelError> {
        let q = to_vec3(p);
        let d = self.clearance(q)?;
        Ok(if self.is_inside(q)? { d } else { -d })
    }

    /// Clearance of `p` if it is a usable interior point.
    fn qualify(&self, p: Vec3) -> Result<Option<f64>, KernelError> {
        if !p.is_finite() || !self.is_inside(p)? {
            return Ok(None);
        }
        let d = self.clearance(p)?;
        Ok((d > self.tolerance).then_some(d))
    }

    /// Moves `start` along the numerical gradient of the depth field and
    /// returns the deepest point visited.
    fn ascend(&self, start: Vec3, start_depth: f64, step: f64) -> Result<Vec3, KernelError> {
        let mut best = to_point(start);
        let mut best_depth = start_depth;
        let mut step = step;
        for _ in 0..MAX_ASCENT_STEPS {
            if step <= self.tolerance {
                break;
            }
            let h = step * 0.5;
            let mut gradient = Vector3::<f64>::zeros();
            for axis in 0..3 {
                let mut offset = Vector3::<f64>::zeros();
                offset[axis] = h;
                gradient[axis] =
                    (self.depth(&(best + offset))? - self.depth(&(best - offset))?) / (2.0 * h);
            }
            let Some(direction) = gradient.try_normalize(1e-12) else {
                step *= 0.5;
                continue;
            };
            let candidate = best + direction * step;
            let depth = self.depth(&candidate)?;
            if depth > best_depth {
                best = candidate;
                best_depth = depth;
            } else {
                step *= 0.5;
            }
        }
        debug!(depth = best_depth, "gradient refinement finished");
        Ok(to_vec3(&best))
    }

    fn grid_search(&self, bbox: &BBox3) -> Result<Option<(Vec3, f64, f64)>, KernelError> {
        let size = bbox.size();
        for n in GRID_DENSITIES {
            let spacing = size * (1.0 / n as f64);
            for i in 1..n {
                for j in 1..n {
                    for k in 1..n {
                        let p = bbox.min
                            + Vec3::new(
                                spacing.x * i as f64,
                                spacing.y * j as f64,
                                spacing.z * k as f64,
                            );
                        if let Some(d) = self.qualify(p)? {
                            debug!(density = n, "grid hit");
                            let step = spacing.x.min(spacing.y).min(spacing.z);
                            return Ok(Some((p, d, step)));
                        }
                    }
                }
            }
        }
        Ok(None)
    }
}

/// Finds a point strictly inside `volume` and farther than `tolerance`
/// from all of its boundary faces.
///
/// Tries the center of mass, then the bounding box center, then lattices of
/// increasing density refined by gradient ascent.
pub fn locate_interior_point(
    kernel: &dyn CadKernel,
    volume: &Volume,
    tolerance: f64,
) -> Result<Vec3, LocatorError> {
    let probe = Probe {
        kernel,
        tags: &volume.tags,
        faces: volume.boundary_faces(),
        tolerance,
    };

    // 1. Center of mass, weighted over all sub-volumes
    let mut mass = 0.0;
    let mut moment = Vec3::zero();
    for &tag in &volume.tags {
        let props = kernel.mass_properties(tag)?;
        mass += props.volume;
        moment = moment + props.center * props.volume;
    }
    if mass.abs() > 0.0 {
        let center = moment * (1.0 / mass);
        if probe.qualify(center)?.is_some() {
            debug!(volume = %volume.name, "using center of mass");
            return Ok(center);
        }
    }

    // 2. Bounding box center
    let mut bbox = BBox3::empty();
    for &tag in &volume.tags {
        bbox = bbox.union(&kernel.bounding_box(Dim::Volume, tag)?);
    }
    let center = bbox.center();
    if probe.qualify(center)?.is_some() {
        debug!(volume = %volume.name, "using bounding box center");
        return Ok(center);
    }

    // 3. Grid search, then refine
    match probe.grid_search(&bbox)? {
        Some((hit, depth, step)) => Ok(probe.ascend(hit, depth, step)?),
        None => Err(LocatorError::Exhausted {
            volume: volume.name.clone(),
        }),
    }
}

/// Sets `inside_point` on every volume; configured points win and skip the search.
pub fn resolve_inside_points(
    kernel: &dyn CadKernel,
    classification: &mut Classification,
    config: &Config,
) -> Result<(), LocatorError> {
    let tolerance = config.setup.inside_point_tolerance;
    for volume in &mut classification.volumes {
        let point = match config.inside_point_override(&volume.name) {
            Some(point) => point,
            None => locate_interior_point(kernel, volume, tolerance)?,
        };
        info!(
            volume = %volume.name,
            x = point.x,
            y = point.y,
            z = point.z,
            "inside point"
        );
        volume.inside_point = Some(point);
    }
    Ok(())
}
