use super::atom::Atom;
use nalgebra::{Unit, Vector3};

/// A rigid sub-body of the ligand: the ROOT or one BRANCH.
///
/// Frames live in a flat arena ordered so that `parent < self` for every
/// non-root frame; both kinematic passes are then plain index scans. The
/// root occupies index 0 and its `parent`/`rotor_x` fields are dummies.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Arena index of the parent frame.
    pub parent: usize,
    /// Index into the parent's heavy atoms of rotor X, the parent-side atom
    /// of the rotatable bond leading to this frame.
    pub rotor_x: usize,
    /// Whether rotating this frame's torsion can change the score. A leaf
    /// holding only rotor Y and hydrogens is marked inactive by the parser.
    pub active: bool,
    /// Heavy atoms; the first one is rotor Y and the frame origin.
    pub heavy_atoms: Vec<Atom>,
    /// Serial numbers of the heavy atoms, parallel to `heavy_atoms`, kept
    /// for resolving `BRANCH x y` records.
    pub serials: Vec<usize>,
    pub hydrogens: Vec<Atom>,
    /// Vector from the parent's first heavy atom to this frame's first
    /// heavy atom, in the parent's local frame.
    pub relative_origin: Vector3<f64>,
    /// Unit vector along the rotor X -> rotor Y bond, in the parent's local
    /// frame.
    pub relative_axis: Unit<Vector3<f64>>,
}

impl Frame {
    pub fn root() -> Self {
        Self::branch(0, 0)
    }

    pub fn branch(parent: usize, rotor_x: usize) -> Self {
        Self {
            parent,
            rotor_x,
            active: true,
            heavy_atoms: Vec::new(),
            serials: Vec::new(),
            hydrogens: Vec::new(),
            relative_origin: Vector3::zeros(),
            relative_axis: Vector3::x_axis(),
        }
    }
}
