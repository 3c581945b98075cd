use nalgebra::{Point3, UnitQuaternion, Vector3};

/// A point in the ligand's search space: rigid-body placement of the root
/// frame plus one angle per active torsion.
#[derive(Debug, Clone, PartialEq)]
pub struct Conformation {
    /// World position of the root frame's first heavy atom.
    pub position: Point3<f64>,
    /// World orientation of the root frame.
    pub orientation: UnitQuaternion<f64>,
    /// One angle (radians) per active torsion, in frame index order.
    pub torsions: Vec<f64>,
}

impl Conformation {
    pub fn new(
        position: Point3<f64>,
        orientation: UnitQuaternion<f64>,
        torsions: Vec<f64>,
    ) -> Self {
        Self {
            position,
            orientation,
            torsions,
        }
    }
}

/// The gradient tuple matching [`Conformation`]: position gradient, torque
/// about the root origin, and one scalar per active torsion.
#[derive(Debug, Clone, PartialEq)]
pub struct Change {
    pub position: Vector3<f64>,
    pub orientation: Vector3<f64>,
    pub torsions: Vec<f64>,
}

impl Change {
    pub fn zeros(num_active_torsions: usize) -> Self {
        Self {
            position: Vector3::zeros(),
            orientation: Vector3::zeros(),
            torsions: vec![0.0; num_active_torsions],
        }
    }
}
