use super::atom::XsType;
use super::frame::Frame;
use crate::core::topology::{self, InteractingPair};
use nalgebra::Unit;
use tracing::debug;

/// Penalty slope per effective rotatable bond.
const FLEXIBILITY_PENALTY_SLOPE: f64 = 0.05846;

/// An assembled ligand: the frame tree, the retained input lines and the
/// derived interaction topology.
///
/// Everything here is immutable during search; per-evaluation state lives
/// in [`crate::engine::workspace::Workspace`].
#[derive(Debug, Clone)]
pub struct Ligand {
    /// Frames in pre-order: index 0 is the ROOT and `parent < self` holds
    /// for every branch.
    pub frames: Vec<Frame>,
    /// Input lines retained verbatim for pose output.
    pub lines: Vec<String>,
    /// Cross-frame heavy-atom pairs contributing intramolecular energy.
    pub pairs: Vec<InteractingPair>,
    pub num_frames: usize,
    pub num_torsions: usize,
    pub num_active_torsions: usize,
    pub num_heavy_atoms: usize,
    /// Scalar in (0, 1] down-weighting flexible ligands; 1 iff rigid.
    pub flexibility_penalty_factor: f64,
}

impl Ligand {
    /// Finishes construction from parsed frames: flag fixups, relative
    /// geometry, interaction topology, local-coordinate conversion and the
    /// derived counters. The parser guarantees every frame holds at least
    /// one heavy atom.
    pub(crate) fn assemble(
        mut frames: Vec<Frame>,
        lines: Vec<String>,
        num_active_torsions: usize,
    ) -> Self {
        topology::dehydrophobicize(&mut frames);

        // Relative origin and rotation axis of each branch, expressed in
        // the parent's local frame (identical to absolute offsets in the
        // parsed pose, where every orientation is the identity).
        for k in 1..frames.len() {
            let parent = frames[k].parent;
            let rotor_x = frames[k].rotor_x;
            let origin = frames[k].heavy_atoms[0].local;
            let parent_origin = frames[parent].heavy_atoms[0].local;
            let rotor_x_position = frames[parent].heavy_atoms[rotor_x].local;
            frames[k].relative_origin = origin - parent_origin;
            frames[k].relative_axis = Unit::new_normalize(origin - rotor_x_position);
        }

        // Both passes below need absolute coordinates; convert to
        // frame-local only afterwards.
        let bonds = topology::bond_graph(&frames);
        let pairs = topology::interacting_pairs(&frames, &bonds);

        for frame in frames.iter_mut() {
            let origin = frame.heavy_atoms[0].local;
            for atom in frame.heavy_atoms.iter_mut() {
                atom.local -= origin.coords;
            }
            for hydrogen in frame.hydrogens.iter_mut() {
                hydrogen.local -= origin.coords;
            }
        }

        let num_frames = frames.len();
        let num_torsions = num_frames - 1;
        let num_heavy_atoms = frames.iter().map(|f| f.heavy_atoms.len()).sum();
        let redundant = (num_torsions - num_active_torsions) as f64;
        let flexibility_penalty_factor = 1.0
            / (1.0 + FLEXIBILITY_PENALTY_SLOPE * (num_active_torsions as f64 + 0.5 * redundant));

        debug!(
            frames = num_frames,
            heavy_atoms = num_heavy_atoms,
            active_torsions = num_active_torsions,
            pairs = pairs.len(),
            "assembled ligand"
        );

        Self {
            frames,
            lines,
            pairs,
            num_frames,
            num_torsions,
            num_active_torsions,
            num_heavy_atoms,
            flexibility_penalty_factor,
        }
    }

    /// Distinct coarse atom types present among the heavy atoms, in first
    /// appearance order. The outer system uses this to populate only the
    /// grid maps a ligand actually needs.
    pub fn xs_types(&self) -> Vec<XsType> {
        let mut types = Vec::with_capacity(10);
        for frame in &self.frames {
            for atom in &frame.heavy_atoms {
                let t = atom.xs();
                if !types.contains(&t) {
                    types.push(t);
                }
            }
        }
        types
    }
}
