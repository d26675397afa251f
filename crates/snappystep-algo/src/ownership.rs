use crate::structs::{Classification, PatchRef};
use itertools::Itertools;
use tracing::{debug, info};

/// Elects a cell-zone owner for every interface and returns the index of
/// the default (background) volume.
///
/// Volumes are visited by ascending interface count, then name. Each visit
/// claims at most one still-unowned interface; rounds repeat until a round
/// assigns nothing. The last volume in that order is the default and never
/// claims, so every interface ends up owned by its other member.
pub fn assign_default_owner(classification: &mut Classification) -> Option<usize> {
    let order: Vec<usize> = (0..classification.volumes.len())
        .sorted_by(|&a, &b| {
            let va = &classification.volumes[a];
            let vb = &classification.volumes[b];
            va.interface_count()
                .cmp(&vb.interface_count())
                .then_with(|| va.name.cmp(&vb.name))
        })
        .collect();
    let (&default, claimers) = order.split_last()?;

    loop {
        let mut assigned = false;
        for &volume in claimers {
            let claim = classification.volumes[volume]
                .interface_patches
                .iter()
                .find_map(|patch| match patch {
                    PatchRef::Interface(i)
                        if classification.interfaces[*i].cell_zone_volume.is_none() =>
                    {
                        Some(*i)
                    }
                    _ => None,
                });
            if let Some(i) = claim {
                classification.interfaces[i].cell_zone_volume = Some(volume);
                debug!(
                    interface = %classification.interfaces[i].name,
                    owner = %classification.volumes[volume].name,
                    "assigned cell zone"
                );
                assigned = true;
            }
        }
        if !assigned {
            break;
        }
    }

    info!(default = %classification.volumes[default].name, "default cell zone");
    Some(default)
}
