//! Interactive previews: dump the model to VTK, open it with the system
//! viewer and ask whether to go on.

use snappystep_algo::Classification;
use snappystep_core::kernel::{CadKernel, Dim, KernelError};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

fn preview_path(kind: &str) -> PathBuf {
    std::env::temp_dir().join(format!("snappystep-{kind}-{}.vtk", std::process::id()))
}

/// Logs the volume and face labelling and writes one VTK group per volume.
pub fn write_face_preview(
    kernel: &mut dyn CadKernel,
    classification: &Classification,
) -> Result<PathBuf, KernelError> {
    kernel.clear_groups();
    for volume in &classification.volumes {
        info!(
            volume = %volume.name,
            tags = ?volume.tags,
            exterior = ?volume.exterior_face_tags,
            interface = ?volume.interface_face_tags,
            "volume faces"
        );
        kernel.add_group(Dim::Surface, &volume.boundary_faces(), &volume.name)?;
    }
    for interface in &classification.interfaces {
        info!(interface = %interface.name, faces = ?interface.face_tags, "interface faces");
    }
    for baffle in &classification.baffles {
        info!(baffle = %baffle.name, faces = ?baffle.face_tags, "baffle faces");
    }
    let path = preview_path("faces");
    kernel.write_groups(&path)?;
    kernel.clear_groups();
    Ok(path)
}

/// Writes the generated surface mesh, one group per exported region.
pub fn write_mesh_preview(
    kernel: &mut dyn CadKernel,
    classification: &Classification,
) -> Result<PathBuf, KernelError> {
    kernel.clear_groups();
    for (patch, (faces, _)) in classification.exterior_patches() {
        kernel.add_group(Dim::Surface, &faces, &patch)?;
    }
    for interface in &classification.interfaces {
        kernel.add_group(Dim::Surface, &interface.face_tags, &interface.name)?;
    }
    for baffle in &classification.baffles {
        kernel.add_group(Dim::Surface, &baffle.face_tags, &baffle.name)?;
    }
    let path = preview_path("mesh");
    kernel.write_groups(&path)?;
    kernel.clear_groups();
    Ok(path)
}

/// Opens `path` with the desktop viewer; failure only warns.
pub fn open_viewer(path: &Path) {
    info!(path = %path.display(), "opening preview");
    if let Err(err) = open::that(path) {
        warn!(path = %path.display(), error = %err, "could not open preview");
    }
}

/// Asks until the answer is yes/y or no/n. End of input counts as no.
pub fn ask_yes_no<R: BufRead, W: Write>(question: &str, input: &mut R, output: &mut W) -> io::Result<bool> {
    loop {
        write!(output, "{question} (yes or no): ")?;
        output.flush()?;
        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            return Ok(false);
        }
        match line.trim().to_ascii_lowercase().as_str() {
            "yes" | "y" => return Ok(true),
            "no" | "n" => return Ok(false),
            _ => writeln!(output, "Invalid input. Please enter 'yes' or 'no' (y/n).")?,
        }
    }
}
