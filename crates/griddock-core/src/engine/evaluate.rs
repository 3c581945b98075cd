//! Scoring a conformation: forward kinematics over the frame tree, grid and
//! pairwise potential accumulation, and the reverse force/torque pass that
//! assembles the analytical gradient.

use super::grid::{GridMap, SearchBox};
use super::scoring::ScoringFunction;
use super::workspace::Workspace;
use crate::core::models::conformation::{Change, Conformation};
use crate::core::models::ligand::Ligand;
use nalgebra::Unit;

/// Accepted evaluation outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    /// Total free energy.
    pub energy: f64,
    /// Free energy after the inter-molecular stage, before the
    /// intramolecular term.
    pub inter_energy: f64,
    pub gradient: Change,
}

/// Evaluates a conformation against the grid maps and the intramolecular
/// scoring function.
///
/// Returns `None` when any heavy atom leaves the box or the total energy
/// reaches `e_upper_bound`; rejections are routine during search, not
/// errors. The workspace is scratch only: no state survives a call.
pub fn evaluate<S: ScoringFunction + ?Sized>(
    ligand: &Ligand,
    conf: &Conformation,
    sf: &S,
    bx: &SearchBox,
    maps: &[GridMap],
    e_upper_bound: f64,
    ws: &mut Workspace,
) -> Option<Evaluation> {
    debug_assert_eq!(conf.torsions.len(), ligand.num_active_torsions);
    debug_assert_eq!(ws.frames.len(), ligand.num_frames);

    if !bx.within(&conf.position) {
        return None;
    }

    // Forward pass over the ROOT frame.
    {
        let root = &ligand.frames[0];
        let scratch = &mut ws.frames[0];
        scratch.coords[0] = conf.position;
        scratch.orientation = conf.orientation;
        scratch.rotation = conf.orientation.to_rotation_matrix();
        for i in 1..root.heavy_atoms.len() {
            scratch.coords[i] = conf.position + scratch.rotation * root.heavy_atoms[i].local.coords;
            if !bx.within(&scratch.coords[i]) {
                return None;
            }
        }
    }

    // Forward pass over BRANCH frames; index order guarantees the parent
    // scratch is final before its children read it.
    let mut torsion = 0;
    for k in 1..ligand.num_frames {
        let frame = &ligand.frames[k];
        let (head, tail) = ws.frames.split_at_mut(k);
        let parent = &head[frame.parent];
        let scratch = &mut tail[0];

        scratch.coords[0] = parent.coords[0] + parent.rotation * frame.relative_origin;
        if !bx.within(&scratch.coords[0]) {
            return None;
        }

        scratch.axis = parent.rotation * frame.relative_axis.into_inner();
        if frame.active {
            let angle = conf.torsions[torsion];
            torsion += 1;
            scratch.orientation =
                nalgebra::UnitQuaternion::from_axis_angle(&Unit::new_unchecked(scratch.axis), angle)
                    * parent.orientation;
            scratch.rotation = scratch.orientation.to_rotation_matrix();
        } else {
            scratch.orientation = parent.orientation;
            scratch.rotation = parent.rotation;
        }

        let origin = scratch.coords[0];
        for i in 1..frame.heavy_atoms.len() {
            scratch.coords[i] = origin + scratch.rotation * frame.heavy_atoms[i].local.coords;
            if !bx.within(&scratch.coords[i]) {
                return None;
            }
        }
    }

    // Inter-molecular stage: sample the grid map of each heavy atom's
    // coarse type and derive the spatial gradient by forward differences.
    let inverse_h = bx.granularity_inverse();
    let mut energy = 0.0;
    for (frame, scratch) in ligand.frames.iter().zip(ws.frames.iter_mut()) {
        for (i, atom) in frame.heavy_atoms.iter().enumerate() {
            let map = &maps[atom.xs().index()];
            debug_assert!(!map.is_empty());

            let [x0, y0, z0] = bx.grid_index(&scratch.coords[i]);
            let e000 = map.at(x0, y0, z0);
            scratch.energies[i] = e000;
            scratch.derivs[i] = nalgebra::Vector3::new(
                (map.at(x0 + 1, y0, z0) - e000) * inverse_h,
                (map.at(x0, y0 + 1, z0) - e000) * inverse_h,
                (map.at(x0, y0, z0 + 1) - e000) * inverse_h,
            );
            energy += e000;
        }
    }
    let inter_energy = energy;

    // Intramolecular stage over the interacting pairs.
    for pair in &ligand.pairs {
        let r = ws.frames[pair.k2].coords[pair.i2] - ws.frames[pair.k1].coords[pair.i1];
        let r2 = r.norm_squared();
        if r2 < sf.cutoff_sqr() {
            let sample = sf.evaluate(pair.type_pair, r2);
            energy += sample.e;
            let derivative = sample.dor * r;
            ws.frames[pair.k1].derivs[pair.i1] -= derivative;
            ws.frames[pair.k2].derivs[pair.i2] += derivative;
        }
    }

    if energy >= e_upper_bound {
        return None;
    }

    // Reverse pass: aggregate per-atom derivatives into per-frame force and
    // torque, children before parents.
    for scratch in ws.frames.iter_mut() {
        // The origin atom's lever arm is zero; its force is the seed.
        scratch.force = scratch.derivs[0];
        scratch.torque = nalgebra::Vector3::zeros();
    }

    let mut gradient = Change::zeros(ligand.num_active_torsions);
    let mut torsion = ligand.num_active_torsions;
    for k in (1..ligand.num_frames).rev() {
        let frame = &ligand.frames[k];
        let (head, tail) = ws.frames.split_at_mut(k);
        let scratch = &mut tail[0];
        let origin = scratch.coords[0];

        for i in 1..frame.heavy_atoms.len() {
            let derivative = scratch.derivs[i];
            scratch.force += derivative;
            scratch.torque += (scratch.coords[i] - origin).cross(&derivative);
        }

        let parent = &mut head[frame.parent];
        let lever = origin - parent.coords[0];
        parent.force += scratch.force;
        parent.torque += scratch.torque + lever.cross(&scratch.force);

        if frame.active {
            torsion -= 1;
            gradient.torsions[torsion] = scratch.torque.dot(&scratch.axis);
        }
    }

    let root = &mut ws.frames[0];
    let origin = root.coords[0];
    for i in 1..root.coords.len() {
        let derivative = root.derivs[i];
        root.force += derivative;
        root.torque += (root.coords[i] - origin).cross(&derivative);
    }
    gradient.position = root.force;
    gradient.orientation = root.torque;

    Some(Evaluation {
        energy,
        inter_energy,
        gradient,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::io::pdbqt::read_ligand;
    use crate::core::models::atom::XsType;
    use crate::engine::scoring::PairScore;
    use nalgebra::{Point3, UnitQuaternion, Vector3};
    use std::path::Path;

    const TOLERANCE: f64 = 1e-9;

    fn f64_approx_equal(a: f64, b: f64) -> bool {
        (a - b).abs() < TOLERANCE
    }

    fn atom_line(serial: usize, ad: &str, x: f64, y: f64, z: f64) -> String {
        format!(
            "ATOM  {:>5} {:<4} LIG A   1    {:8.3}{:8.3}{:8.3}  0.00  0.00    +0.000 {:<2}",
            serial, ad, x, y, z, ad
        )
    }

    fn parse(text: &str) -> Ligand {
        read_ligand(text.as_bytes(), Path::new("test.pdbqt")).unwrap()
    }

    fn zero_maps(bx: &SearchBox, types: &[XsType]) -> Vec<GridMap> {
        let mut maps: Vec<GridMap> = (0..XsType::COUNT).map(|_| GridMap::empty()).collect();
        for t in types {
            maps[t.index()] = GridMap::from_fn(bx.num_probes(), |_, _, _| 0.0);
        }
        maps
    }

    /// Pair potential e = r^2, whose derivative over r is the constant 2.
    struct Harmonic;

    impl ScoringFunction for Harmonic {
        fn evaluate(&self, _type_pair: usize, r2: f64) -> PairScore {
            PairScore { e: r2, dor: 2.0 }
        }

        fn cutoff_sqr(&self) -> f64 {
            1.0e4
        }
    }

    fn rigid_conformation(position: Point3<f64>) -> Conformation {
        Conformation::new(position, UnitQuaternion::identity(), Vec::new())
    }

    #[test]
    fn single_atom_scores_the_grid_energy_at_its_voxel() {
        let ligand = parse(&format!(
            "ROOT\n{}\nENDROOT\nTORSDOF 0\n",
            atom_line(1, "C", 0.0, 0.0, 0.0)
        ));
        let bx = SearchBox::new(Point3::origin(), Vector3::new(10.0, 10.0, 10.0), 1.0);
        let mut maps = zero_maps(&bx, &[]);
        maps[XsType::CarbonHydrophobic.index()] =
            GridMap::from_fn(bx.num_probes(), |i, j, k| (i + 10 * j + 100 * k) as f64);

        let mut ws = Workspace::for_ligand(&ligand);
        let conf = rigid_conformation(Point3::new(0.3, 0.2, 0.1));
        let out = evaluate(&ligand, &conf, &Harmonic, &bx, &maps, 1.0e9, &mut ws).unwrap();

        // grid_index((0.3, 0.2, 0.1)) = (5, 5, 5) in an 11-probe lattice.
        assert!(f64_approx_equal(out.energy, 555.0));
        assert!(f64_approx_equal(out.inter_energy, 555.0));
        assert!(out.gradient.torsions.is_empty());
        assert!((out.gradient.position - Vector3::new(1.0, 10.0, 100.0)).norm() < TOLERANCE);
        assert!(f64_approx_equal(ws.atom_energies(0)[0], 555.0));
    }

    #[test]
    fn rigid_two_type_ligand_sums_per_atom_map_values() {
        let ligand = parse(&format!(
            "ROOT\n{}\n{}\nENDROOT\nTORSDOF 0\n",
            atom_line(1, "C", 0.0, 0.0, 0.0),
            atom_line(2, "N", 2.0, 0.0, 0.0)
        ));
        let bx = SearchBox::new(Point3::origin(), Vector3::new(10.0, 10.0, 10.0), 1.0);
        let mut maps = zero_maps(&bx, &[]);
        let carbon_map = GridMap::from_fn(bx.num_probes(), |i, j, k| (i + 10 * j + 100 * k) as f64);
        let nitrogen_map = GridMap::from_fn(bx.num_probes(), |i, j, k| (2 * i + 3 * j + 4 * k) as f64);
        // 2.0 A separation is beyond the covalent reach of C-N, so the
        // carbon keeps its hydrophobic typing.
        maps[XsType::CarbonHydrophobic.index()] = carbon_map.clone();
        maps[XsType::Nitrogen.index()] = nitrogen_map.clone();

        let mut ws = Workspace::for_ligand(&ligand);
        let conf = rigid_conformation(Point3::new(0.3, 0.2, 0.1));
        let out = evaluate(&ligand, &conf, &Harmonic, &bx, &maps, 1.0e9, &mut ws).unwrap();

        let expected = carbon_map.at(5, 5, 5) + nitrogen_map.at(7, 5, 5);
        assert!(f64_approx_equal(out.energy, expected));
        assert!(f64_approx_equal(out.inter_energy, expected));
    }

    #[test]
    fn conformation_outside_the_box_is_rejected() {
        let ligand = parse(&format!(
            "ROOT\n{}\nENDROOT\nTORSDOF 0\n",
            atom_line(1, "C", 0.0, 0.0, 0.0)
        ));
        let bx = SearchBox::new(Point3::origin(), Vector3::new(10.0, 10.0, 10.0), 1.0);
        let maps = zero_maps(&bx, &[XsType::CarbonHydrophobic]);
        let mut ws = Workspace::for_ligand(&ligand);

        let conf = rigid_conformation(Point3::new(50.0, 0.0, 0.0));
        assert!(evaluate(&ligand, &conf, &Harmonic, &bx, &maps, 1.0e9, &mut ws).is_none());
    }

    #[test]
    fn atom_pushed_past_the_box_edge_rejects_the_pose() {
        let ligand = parse(&format!(
            "ROOT\n{}\n{}\nENDROOT\nTORSDOF 0\n",
            atom_line(1, "C", 0.0, 0.0, 0.0),
            atom_line(2, "C", 1.5, 0.0, 0.0)
        ));
        let bx = SearchBox::new(Point3::origin(), Vector3::new(10.0, 10.0, 10.0), 1.0);
        let maps = zero_maps(&bx, &[XsType::CarbonHydrophobic]);
        let mut ws = Workspace::for_ligand(&ligand);

        // The origin is inside but the second atom lands at x = 5.6.
        let conf = rigid_conformation(Point3::new(4.1, 0.0, 0.0));
        assert!(evaluate(&ligand, &conf, &Harmonic, &bx, &maps, 1.0e9, &mut ws).is_none());
    }

    #[test]
    fn energies_at_or_above_the_upper_bound_are_rejected() {
        let ligand = parse(&format!(
            "ROOT\n{}\nENDROOT\nTORSDOF 0\n",
            atom_line(1, "C", 0.0, 0.0, 0.0)
        ));
        let bx = SearchBox::new(Point3::origin(), Vector3::new(10.0, 10.0, 10.0), 1.0);
        let mut maps = zero_maps(&bx, &[]);
        maps[XsType::CarbonHydrophobic.index()] =
            GridMap::from_fn(bx.num_probes(), |i, j, k| (i + 10 * j + 100 * k) as f64);
        let mut ws = Workspace::for_ligand(&ligand);
        let conf = rigid_conformation(Point3::new(0.3, 0.2, 0.1));

        assert!(evaluate(&ligand, &conf, &Harmonic, &bx, &maps, 555.0, &mut ws).is_none());
        assert!(evaluate(&ligand, &conf, &Harmonic, &bx, &maps, 555.1, &mut ws).is_some());
    }

    /// ROOT = [A, B], BRANCH = [C, D, E]: exactly one interacting pair
    /// (A, E), four bonds apart, with the torsion axis along +y through C.
    fn torsion_probe() -> Ligand {
        parse(&format!(
            "ROOT\n{}\n{}\nENDROOT\nBRANCH   2   3\n{}\n{}\n{}\nENDBRANCH   2   3\nTORSDOF 1\n",
            atom_line(1, "C", 0.0, 0.0, 0.0),
            atom_line(2, "C", 1.4, 0.0, 0.0),
            atom_line(3, "C", 1.4, 1.4, 0.0),
            atom_line(4, "C", 1.4, 2.8, 0.0),
            atom_line(5, "C", 2.8, 2.8, 0.0)
        ))
    }

    #[test]
    fn torsion_gradient_matches_the_analytic_rotation_derivative() {
        let ligand = torsion_probe();
        assert_eq!(ligand.pairs.len(), 1);
        assert_eq!(ligand.num_active_torsions, 1);

        let bx = SearchBox::new(Point3::origin(), Vector3::new(20.0, 20.0, 20.0), 1.0);
        let maps = zero_maps(&bx, &[XsType::CarbonHydrophobic]);
        let mut ws = Workspace::for_ligand(&ligand);

        let theta: f64 = 0.5;
        let conf = Conformation::new(Point3::origin(), UnitQuaternion::identity(), vec![theta]);
        let out = evaluate(&ligand, &conf, &Harmonic, &bx, &maps, 1.0e9, &mut ws).unwrap();

        // With e = |r|^2 for the single pair (A, E), the energy is
        // (1.4 + 1.4 cos t)^2 + 2.8^2 + (1.4 sin t)^2 and its derivative
        // -3.92 sin t.
        let expected_e =
            (1.4 + 1.4 * theta.cos()).powi(2) + 7.84 + (1.4 * theta.sin()).powi(2);
        assert!(f64_approx_equal(out.energy, expected_e));
        assert!(f64_approx_equal(out.gradient.torsions[0], -3.92 * theta.sin()));

        // A pure intramolecular term is invariant under rigid-body moves.
        assert!(out.gradient.position.norm() < TOLERANCE);
        assert!(out.gradient.orientation.norm() < TOLERANCE);

        // The inter-molecular snapshot excludes the pair term entirely.
        assert_eq!(out.inter_energy, 0.0);
    }

    #[test]
    fn torsion_gradient_agrees_with_finite_differences() {
        let ligand = torsion_probe();
        let bx = SearchBox::new(Point3::origin(), Vector3::new(20.0, 20.0, 20.0), 1.0);
        let maps = zero_maps(&bx, &[XsType::CarbonHydrophobic]);
        let mut ws = Workspace::for_ligand(&ligand);

        let theta = 0.8;
        let h = 1.0e-6;
        let at = |angle: f64, ws: &mut Workspace| {
            let conf =
                Conformation::new(Point3::origin(), UnitQuaternion::identity(), vec![angle]);
            evaluate(&ligand, &conf, &Harmonic, &bx, &maps, 1.0e9, ws)
                .unwrap()
                .energy
        };

        let numeric = (at(theta + h, &mut ws) - at(theta - h, &mut ws)) / (2.0 * h);
        let conf = Conformation::new(Point3::origin(), UnitQuaternion::identity(), vec![theta]);
        let analytic = evaluate(&ligand, &conf, &Harmonic, &bx, &maps, 1.0e9, &mut ws)
            .unwrap()
            .gradient
            .torsions[0];
        assert!((numeric - analytic).abs() < 1.0e-5);
    }

    #[test]
    fn repeated_evaluations_are_identical() {
        let ligand = torsion_probe();
        let bx = SearchBox::new(Point3::origin(), Vector3::new(20.0, 20.0, 20.0), 1.0);
        let maps = zero_maps(&bx, &[XsType::CarbonHydrophobic]);
        let mut ws = Workspace::for_ligand(&ligand);
        let conf = Conformation::new(Point3::origin(), UnitQuaternion::identity(), vec![0.3]);

        let first = evaluate(&ligand, &conf, &Harmonic, &bx, &maps, 1.0e9, &mut ws).unwrap();
        let second = evaluate(&ligand, &conf, &Harmonic, &bx, &maps, 1.0e9, &mut ws).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn inactive_leaf_consumes_no_torsion_entry() {
        let ligand = parse(&format!(
            "ROOT\n{}\n{}\nENDROOT\nBRANCH   2   3\n{}\n{}\nENDBRANCH   2   3\nTORSDOF 1\n",
            atom_line(1, "C", 0.0, 0.0, 0.0),
            atom_line(2, "C", 1.4, 0.0, 0.0),
            atom_line(3, "OA", 1.4, 1.4, 0.0),
            atom_line(4, "HD", 1.4, 2.36, 0.0)
        ));
        assert_eq!(ligand.num_active_torsions, 0);

        let bx = SearchBox::new(Point3::origin(), Vector3::new(20.0, 20.0, 20.0), 1.0);
        let maps = zero_maps(
            &bx,
            &[
                XsType::CarbonHydrophobic,
                XsType::CarbonPolar,
                XsType::OxygenDonorAcceptor,
            ],
        );
        let mut ws = Workspace::for_ligand(&ligand);
        let conf = rigid_conformation(Point3::origin());

        let out = evaluate(&ligand, &conf, &Harmonic, &bx, &maps, 1.0e9, &mut ws).unwrap();
        assert!(out.gradient.torsions.is_empty());
        assert_eq!(out.energy, 0.0);
    }
}
