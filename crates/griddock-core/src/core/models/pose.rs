use nalgebra::Point3;
use std::cmp::Ordering;

/// A fully materialized binding pose: energies plus world coordinates for
/// every atom, hydrogens included, grouped per frame.
#[derive(Debug, Clone)]
pub struct Pose {
    /// Total free energy.
    pub energy: f64,
    /// Inter-molecular free energy (before the intramolecular term).
    pub inter_energy: f64,
    /// World coordinates of each frame's heavy atoms.
    pub heavy_atoms: Vec<Vec<Point3<f64>>>,
    /// World coordinates of each frame's hydrogens.
    pub hydrogens: Vec<Vec<Point3<f64>>>,
}

impl Pose {
    /// Ordering predicate for ranking poses best-first.
    pub fn by_energy(a: &Pose, b: &Pose) -> Ordering {
        a.energy.total_cmp(&b.energy)
    }
}
