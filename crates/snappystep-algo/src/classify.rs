//! Builds the volume/interface/baffle graph from an imprinted kernel model.

use crate::error::GeometryError;
use crate::structs::{Baffle, Classification, Interface, PatchRef, Volume};
use itertools::Itertools;
use snappystep_core::kernel::{CadKernel, Dim, KernelError, Tag};
use snappystep_core::names::validated_label;
use snappystep_core::report::Warning;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use tracing::{debug, info, warn};

/// Runs the kernel's imprint pass and checks that it kept every volume.
pub fn imprint_checked(kernel: &mut dyn CadKernel) -> Result<(), GeometryError> {
    let before = kernel.counts().volumes;
    match kernel.imprint() {
        Ok(()) => {}
        Err(KernelError::NotConforming {
            first,
            second,
            overlap,
        }) => {
            let label = |tag: Tag| {
                kernel
                    .entity_name(Dim::Volume, tag)
                    .unwrap_or_else(|| format!("volume {tag}"))
            };
            return Err(GeometryError::NotConforming {
                first: label(first),
                second: label(second),
                overlap,
            });
        }
        Err(err) => return Err(err.into()),
    }
    let after = kernel.counts();
    if after.volumes != before {
        return Err(GeometryError::VolumeCountChanged {
            before,
            after: after.volumes,
        });
    }
    info!(
        volumes = after.volumes,
        surfaces = after.surfaces,
        curves = after.curves,
        "geometry imprinted"
    );
    Ok(())
}

/// Rewrites every entity name into its validated form; names that validate
/// to nothing are removed. Returns the number of entities touched.
pub fn validate_entity_names(kernel: &mut dyn CadKernel) -> Result<usize, KernelError> {
    let mut touched = 0;
    for dim in [Dim::Point, Dim::Curve, Dim::Surface, Dim::Volume] {
        for tag in kernel.entities(dim) {
            let Some(raw) = kernel.entity_name(dim, tag) else {
                continue;
            };
            match validated_label(Some(&raw)) {
                Some(name) if name == raw => {}
                Some(name) => {
                    debug!(%dim, tag, from = %raw, to = %name, "renamed entity");
                    kernel.set_entity_name(dim, tag, &name)?;
                    touched += 1;
                }
                None => {
                    kernel.remove_entity_name(dim, tag)?;
                    touched += 1;
                }
            }
        }
    }
    Ok(touched)
}

/// Names user-listed faces. A group may hold exterior faces or shared faces,
/// never both.
pub fn apply_face_groups(
    kernel: &mut dyn CadKernel,
    groups: &BTreeMap<String, Vec<Tag>>,
) -> Result<(), GeometryError> {
    for (name, tags) in groups {
        let mut exterior = Vec::new();
        let mut shared = Vec::new();
        for &face in tags {
            match kernel.upward(Dim::Surface, face)?.len() {
                1 => exterior.push(face),
                n if n > 1 => shared.push(face),
                _ => {}
            }
        }
        if !exterior.is_empty() && !shared.is_empty() {
            return Err(GeometryError::MixedFaceGroup {
                name: name.clone(),
                exterior,
                shared,
            });
        }
        for &face in tags {
            kernel.set_entity_name(Dim::Surface, face, name)?;
        }
        info!(group = %name, faces = tags.len(), "applied face group");
    }
    Ok(())
}

/// Name given to an unnamed interface; independent of argument order.
pub fn default_interface_name(a: &str, b: &str) -> String {
    let (first, second) = if a <= b { (a, b) } else { (b, a) };
    format!("{first}_{second}_interface")
}

/// Hands out unique names, appending `_1`, `_2`, ... on collision.
#[derive(Debug, Default)]
struct NameRegistry {
    taken: HashSet<String>,
}

impl NameRegistry {
    fn reserve(&mut self, name: &str) {
        self.taken.insert(name.to_string());
    }

    fn claim(&mut self, wanted: &str) -> String {
        let mut candidate = wanted.to_string();
        let mut suffix = 0;
        while self.taken.contains(&candidate) {
            suffix += 1;
            candidate = format!("{wanted}_{suffix}");
        }
        self.taken.insert(candidate.clone());
        candidate
    }

    /// Claims a name and records a warning when it had to be changed.
    fn claim_logged(&mut self, wanted: &str, warnings: &mut Vec<Warning>) -> String {
        let name = self.claim(wanted);
        if name != wanted {
            warn!(wanted = %wanted, assigned = %name, "name already in use");
            warnings.push(Warning {
                code: "name_collision".to_string(),
                message: format!("'{wanted}' is already in use, renamed to '{name}'"),
            });
        }
        name
    }
}

fn face_label(kernel: &dyn CadKernel, face: Tag) -> Option<String> {
    validated_label(kernel.entity_name(Dim::Surface, face).as_deref())
}

fn edges_of(kernel: &dyn CadKernel, faces: &[Tag]) -> Result<BTreeSet<Tag>, KernelError> {
    let mut edges = BTreeSet::new();
    for &face in faces {
        edges.extend(kernel.downward(Dim::Surface, face)?);
    }
    Ok(edges)
}

/// Classifies every face of an imprinted model.
///
/// Volumes are grouped by validated name and ordered by name, so the result
/// does not depend on kernel tag order for named models.
pub fn classify(kernel: &dyn CadKernel) -> Result<Classification, GeometryError> {
    let mut registry = NameRegistry::default();
    let mut warnings = Vec::new();

    // 1. Logical volumes
    let mut grouped: BTreeMap<String, Vec<Tag>> = BTreeMap::new();
    let mut unnamed = Vec::new();
    for tag in kernel.entities(Dim::Volume) {
        match validated_label(kernel.entity_name(Dim::Volume, tag).as_deref()) {
            Some(name) => grouped.entry(name).or_default().push(tag),
            None => unnamed.push(tag),
        }
    }
    for name in grouped.keys() {
        registry.reserve(name);
    }
    for tag in unnamed {
        let name = registry.claim(&format!("volume_{tag}"));
        grouped.insert(name, vec![tag]);
    }
    let mut volumes: Vec<Volume> = grouped
        .into_iter()
        .map(|(name, tags)| Volume::new(name, tags))
        .collect();
    let owner_of: HashMap<Tag, usize> = volumes
        .iter()
        .enumerate()
        .flat_map(|(i, v)| v.tags.iter().map(move |&t| (t, i)))
        .collect();

    // 2. Exterior faces and patches; everything else is a shared candidate
    let mut candidates: Vec<BTreeSet<Tag>> = vec![BTreeSet::new(); volumes.len()];
    let mut face_owners: BTreeMap<Tag, BTreeSet<usize>> = BTreeMap::new();
    for (index, volume) in volumes.iter_mut().enumerate() {
        let mut faces = BTreeSet::new();
        for &tag in &volume.tags {
            faces.extend(kernel.downward(Dim::Volume, tag)?);
        }
        for face in faces {
            let upward = kernel.upward(Dim::Surface, face)?;
            if upward.len() == 1 {
                volume.exterior_face_tags.push(face);
                let patch = face_label(kernel, face)
                    .unwrap_or_else(|| format!("{}_default", volume.name));
                volume.exterior_patches.entry(patch).or_default().push(face);
                continue;
            }
            volume.interface_face_tags.push(face);
            candidates[index].insert(face);
            let owners: BTreeSet<usize> = upward
                .iter()
                .filter_map(|t| owner_of.get(t).copied())
                .collect();
            face_owners.insert(face, owners);
        }
        for (patch, faces) in &volume.exterior_patches {
            volume
                .exterior_patch_edges
                .insert(patch.clone(), edges_of(kernel, faces)?);
        }
    }
    for volume in &volumes {
        for patch in volume.exterior_patches.keys() {
            registry.reserve(patch);
        }
    }
    for (&face, owners) in &face_owners {
        if owners.len() > 2 {
            return Err(GeometryError::FaceSpansVolumes {
                face,
                volumes: owners.iter().map(|&i| volumes[i].name.clone()).collect(),
            });
        }
    }

    // 3. Interfaces, one group per name within each volume pair
    let mut interfaces: Vec<Interface> = Vec::new();
    let mut explicit_pairs: HashMap<String, [usize; 2]> = HashMap::new();
    for (a, b) in (0..volumes.len()).tuple_combinations() {
        let shared: Vec<Tag> = candidates[a].intersection(&candidates[b]).copied().collect();
        if shared.is_empty() {
            continue;
        }
        let fallback = default_interface_name(&volumes[a].name, &volumes[b].name);
        let mut by_name: BTreeMap<String, Vec<Tag>> = BTreeMap::new();
        for face in shared {
            match face_label(kernel, face) {
                Some(label) => {
                    if let Some(&other) = explicit_pairs.get(&label) {
                        if other != [a, b] {
                            return Err(GeometryError::AmbiguousInterfaceName {
                                name: label,
                                first: other.map(|i| volumes[i].name.clone()),
                                second: [volumes[a].name.clone(), volumes[b].name.clone()],
                            });
                        }
                    }
                    explicit_pairs.insert(label.clone(), [a, b]);
                    by_name.entry(label).or_default().push(face);
                }
                None => by_name.entry(fallback.clone()).or_default().push(face),
            }
        }
        for (wanted, face_tags) in by_name {
            let name = registry.claim_logged(&wanted, &mut warnings);
            let edge_tags = edges_of(kernel, &face_tags)?;
            let index = interfaces.len();
            debug!(interface = %name, faces = face_tags.len(), "detected interface");
            interfaces.push(Interface {
                name,
                volume_pair: [a, b],
                face_tags,
                edge_tags,
                cell_zone_volume: None,
            });
            volumes[a].interface_patches.push(PatchRef::Interface(index));
            volumes[b].interface_patches.push(PatchRef::Interface(index));
        }
    }

    // 4. Baffles: shared faces inside one logical volume, then free faces
    let mut baffles: Vec<Baffle> = Vec::new();
    let mut inner: BTreeMap<(Option<usize>, String), Vec<Tag>> = BTreeMap::new();
    for (&face, owners) in &face_owners {
        if owners.len() != 1 {
            continue;
        }
        let Some(&volume) = owners.iter().next() else {
            continue;
        };
        let name = face_label(kernel, face)
            .unwrap_or_else(|| format!("{}_baffle", volumes[volume].name));
        inner.entry((Some(volume), name)).or_default().push(face);
    }
    for face in kernel.entities(Dim::Surface) {
        if kernel.upward(Dim::Surface, face)?.is_empty() {
            let name = face_label(kernel, face).unwrap_or_else(|| "baffle".to_string());
            inner.entry((None, name)).or_default().push(face);
        }
    }
    for ((volume, wanted), face_tags) in inner {
        let name = registry.claim_logged(&wanted, &mut warnings);
        let edge_tags = edges_of(kernel, &face_tags)?;
        let index = baffles.len();
        debug!(baffle = %name, faces = face_tags.len(), "detected baffle");
        if let Some(v) = volume {
            volumes[v].interface_patches.push(PatchRef::Baffle(index));
        }
        baffles.push(Baffle {
            name,
            volume,
            face_tags,
            edge_tags,
        });
    }

    info!(
        volumes = volumes.len(),
        interfaces = interfaces.len(),
        baffles = baffles.len(),
        "classified geometry"
    );
    Ok(Classification {
        volumes,
        interfaces,
        baffles,
        warnings,
    })
}
