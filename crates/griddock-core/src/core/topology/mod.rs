//! Covalent topology analysis over the frame arena: the bond graph, the
//! ≤3-bond neighborhoods, and the cross-frame interacting-pair list that
//! drives the intramolecular scoring term.

use crate::core::models::frame::Frame;
use itertools::Itertools;

/// A heavy-atom pair in distinct frames that contributes intramolecular
/// energy: more than 3 covalent bonds apart and not the rotor edge itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InteractingPair {
    pub k1: usize,
    pub i1: usize,
    pub k2: usize,
    pub i2: usize,
    /// Triangular index of the two atoms' coarse types into the
    /// scoring-function table.
    pub type_pair: usize,
}

/// Per-(frame, atom) adjacency lists of the covalent bond graph.
pub(crate) type BondGraph = Vec<Vec<Vec<(usize, usize)>>>;

/// Clears the hydrophobic flag of every carbon covalently bonded to a
/// hetero atom, both within a frame and across each rotor edge.
pub(crate) fn dehydrophobicize(frames: &mut [Frame]) {
    for frame in frames.iter_mut() {
        let n = frame.heavy_atoms.len();
        for i in 0..n {
            if !frame.heavy_atoms[i].is_hetero() {
                continue;
            }
            for j in 0..n {
                if frame.heavy_atoms[j].is_hetero() {
                    continue;
                }
                let bonded = frame.heavy_atoms[i].is_neighbor(&frame.heavy_atoms[j]);
                if bonded {
                    frame.heavy_atoms[j].dehydrophobicize();
                }
            }
        }
    }

    // The rotor edge is a covalent bond too; check both of its ends.
    for k in 1..frames.len() {
        let parent = frames[k].parent;
        let rotor_x = frames[k].rotor_x;
        let y_hetero = frames[k].heavy_atoms[0].is_hetero();
        let x_hetero = frames[parent].heavy_atoms[rotor_x].is_hetero();
        if y_hetero && !x_hetero {
            frames[parent].heavy_atoms[rotor_x].dehydrophobicize();
        }
        if x_hetero && !y_hetero {
            frames[k].heavy_atoms[0].dehydrophobicize();
        }
    }
}

/// Builds the covalent bond graph: within each frame every heavy-atom pair
/// passing the neighbor test, plus the rotor edge into each branch.
/// Coordinates must still be absolute when this runs.
pub(crate) fn bond_graph(frames: &[Frame]) -> BondGraph {
    let mut bonds: BondGraph = frames
        .iter()
        .map(|f| vec![Vec::with_capacity(4); f.heavy_atoms.len()])
        .collect();

    for (k, frame) in frames.iter().enumerate() {
        for (i, j) in (0..frame.heavy_atoms.len()).tuple_combinations() {
            if frame.heavy_atoms[i].is_neighbor(&frame.heavy_atoms[j]) {
                bonds[k][i].push((k, j));
                bonds[k][j].push((k, i));
            }
        }
        if k > 0 {
            bonds[k][0].push((frame.parent, frame.rotor_x));
            bonds[frame.parent][frame.rotor_x].push((k, 0));
        }
    }
    bonds
}

fn push_unique(set: &mut Vec<(usize, usize)>, entry: (usize, usize)) {
    if !set.contains(&entry) {
        set.push(entry);
    }
}

/// Enumerates the interacting pairs: for every heavy atom, walk the bond
/// graph to depth 3 and emit each heavy atom of a later frame that is
/// neither in that neighborhood nor the far end of the rotor edge.
pub(crate) fn interacting_pairs(frames: &[Frame], bonds: &BondGraph) -> Vec<InteractingPair> {
    let mut pairs = Vec::new();
    let mut reachable: Vec<(usize, usize)> = Vec::with_capacity(10);

    for (k1, f1) in frames.iter().enumerate() {
        for i1 in 0..f1.heavy_atoms.len() {
            reachable.clear();
            for &b1 in &bonds[k1][i1] {
                push_unique(&mut reachable, b1);
                for &b2 in &bonds[b1.0][b1.1] {
                    push_unique(&mut reachable, b2);
                    for &b3 in &bonds[b2.0][b2.1] {
                        push_unique(&mut reachable, b3);
                    }
                }
            }

            for (k2, f2) in frames.iter().enumerate().skip(k1 + 1) {
                for i2 in 0..f2.heavy_atoms.len() {
                    let over_rotor = k1 == f2.parent && (i2 == 0 || i1 == f2.rotor_x);
                    if over_rotor || reachable.contains(&(k2, i2)) {
                        continue;
                    }
                    pairs.push(InteractingPair {
                        k1,
                        i1,
                        k2,
                        i2,
                        type_pair: f1.heavy_atoms[i1].xs().pair_index(f2.heavy_atoms[i2].xs()),
                    });
                }
            }
        }
    }
    pairs
}
