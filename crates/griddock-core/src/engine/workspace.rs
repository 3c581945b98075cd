//! Mutable per-evaluation scratch, split from the immutable ligand so that
//! parallel trajectories can each own a workspace over the same ligand.

use crate::core::models::ligand::Ligand;
use nalgebra::{Point3, Rotation3, UnitQuaternion, Vector3};

/// Scratch state of one frame during an evaluation.
#[derive(Debug, Clone)]
pub(crate) struct FrameScratch {
    /// World coordinates per heavy atom; index 0 is the frame origin.
    pub coords: Vec<Point3<f64>>,
    /// Per-atom energy gradient (grid derivative plus pair contributions).
    pub derivs: Vec<Vector3<f64>>,
    /// Per-atom grid energy.
    pub energies: Vec<f64>,
    pub orientation: UnitQuaternion<f64>,
    pub rotation: Rotation3<f64>,
    /// World-space rotor axis.
    pub axis: Vector3<f64>,
    pub force: Vector3<f64>,
    pub torque: Vector3<f64>,
}

impl FrameScratch {
    fn with_capacity(num_heavy_atoms: usize) -> Self {
        Self {
            coords: vec![Point3::origin(); num_heavy_atoms],
            derivs: vec![Vector3::zeros(); num_heavy_atoms],
            energies: vec![0.0; num_heavy_atoms],
            orientation: UnitQuaternion::identity(),
            rotation: Rotation3::identity(),
            axis: Vector3::zeros(),
            force: Vector3::zeros(),
            torque: Vector3::zeros(),
        }
    }
}

/// Per-worker evaluation workspace sized for one ligand.
///
/// Not safe to share across concurrent evaluations of the same ligand;
/// clone one per trajectory instead.
#[derive(Debug, Clone)]
pub struct Workspace {
    pub(crate) frames: Vec<FrameScratch>,
}

impl Workspace {
    pub fn for_ligand(ligand: &Ligand) -> Self {
        Self {
            frames: ligand
                .frames
                .iter()
                .map(|f| FrameScratch::with_capacity(f.heavy_atoms.len()))
                .collect(),
        }
    }

    /// Per-atom grid energies of a frame from the last evaluation.
    pub fn atom_energies(&self, frame: usize) -> &[f64] {
        &self.frames[frame].energies
    }
}
