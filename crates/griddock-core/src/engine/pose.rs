//! Pose composition: the evaluator's forward kinematics replayed for an
//! arbitrary conformation, additionally materializing hydrogens, which
//! contribute nothing to the score but belong in the written pose.

use crate::core::models::conformation::Conformation;
use crate::core::models::ligand::Ligand;
use crate::core::models::pose::Pose;
use nalgebra::{Point3, Rotation3, Unit, UnitQuaternion};

/// Composes a full-coordinate pose from an accepted conformation and its
/// evaluated energies. Read-only with respect to the ligand.
pub fn compose(ligand: &Ligand, energy: f64, inter_energy: f64, conf: &Conformation) -> Pose {
    debug_assert_eq!(conf.torsions.len(), ligand.num_active_torsions);

    let mut orientations: Vec<UnitQuaternion<f64>> = Vec::with_capacity(ligand.num_frames);
    let mut rotations: Vec<Rotation3<f64>> = Vec::with_capacity(ligand.num_frames);
    let mut heavy_atoms: Vec<Vec<Point3<f64>>> = Vec::with_capacity(ligand.num_frames);
    let mut hydrogens: Vec<Vec<Point3<f64>>> = Vec::with_capacity(ligand.num_frames);

    let root = &ligand.frames[0];
    orientations.push(conf.orientation);
    rotations.push(conf.orientation.to_rotation_matrix());
    heavy_atoms.push(
        root.heavy_atoms
            .iter()
            .map(|a| conf.position + rotations[0] * a.local.coords)
            .collect(),
    );
    hydrogens.push(
        root.hydrogens
            .iter()
            .map(|h| conf.position + rotations[0] * h.local.coords)
            .collect(),
    );

    let mut torsion = 0;
    for k in 1..ligand.num_frames {
        let frame = &ligand.frames[k];
        let origin = heavy_atoms[frame.parent][0] + rotations[frame.parent] * frame.relative_origin;

        let axis = rotations[frame.parent] * frame.relative_axis.into_inner();
        let angle = if frame.active {
            let angle = conf.torsions[torsion];
            torsion += 1;
            angle
        } else {
            0.0
        };
        let orientation = UnitQuaternion::from_axis_angle(&Unit::new_unchecked(axis), angle)
            * orientations[frame.parent];
        let rotation = orientation.to_rotation_matrix();

        heavy_atoms.push(
            frame
                .heavy_atoms
                .iter()
                .map(|a| origin + rotation * a.local.coords)
                .collect(),
        );
        hydrogens.push(
            frame
                .hydrogens
                .iter()
                .map(|h| origin + rotation * h.local.coords)
                .collect(),
        );
        orientations.push(orientation);
        rotations.push(rotation);
    }

    Pose {
        energy,
        inter_energy,
        heavy_atoms,
        hydrogens,
    }
}
