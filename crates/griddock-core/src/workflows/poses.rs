//! Writing ranked poses back to disk in the ligand's original PDBQT
//! envelope.

use crate::core::io::pdbqt::{self, PdbqtError};
use crate::core::models::ligand::Ligand;
use crate::core::models::pose::Pose;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use tracing::{info, instrument};

/// Writes up to `max_models` poses to `path`. Poses are written in the
/// given order; rank them with [`Pose::by_energy`] beforehand.
#[instrument(skip_all, name = "write_poses", fields(path = %path.display()))]
pub fn write_poses(
    path: &Path,
    ligand: &Ligand,
    poses: &[Pose],
    max_models: usize,
) -> Result<(), PdbqtError> {
    let num_models = max_models.min(poses.len());
    let file = File::create(path).map_err(|source| PdbqtError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut writer = BufWriter::new(file);
    pdbqt::write_models(&mut writer, ligand, poses, num_models).map_err(|source| {
        PdbqtError::Io {
            path: path.to_path_buf(),
            source,
        }
    })?;
    info!(models = num_models, "wrote poses");
    Ok(())
}
