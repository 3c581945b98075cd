use bitflags::bitflags;
use nalgebra::Point3;
use std::fmt;
use std::str::FromStr;

bitflags! {
    #[derive(Default, Clone, Copy, Debug, PartialEq, Eq)]
    pub struct AtomFlags: u8 {
        const HYDROPHOBIC = 0b0000_0001; // carbon with no covalently bonded hetero atom
        const DONOR       = 0b0000_0010; // hetero atom bearing a polar hydrogen
    }
}

/// AutoDock force-field atom types accepted in ligand input.
///
/// This is a closed set; any other type string is a parsing error.
/// `Hd` is the polar-hydrogen type, `A` an aromatic carbon, and the
/// trailing metals all collapse to the same coarse type for scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AutoDockType {
    H,
    Hd,
    C,
    A,
    N,
    Na,
    Oa,
    S,
    Sa,
    Se,
    P,
    F,
    Cl,
    Br,
    I,
    Zn,
    Fe,
    Mg,
    Ca,
    Mn,
}

/// Error type for failed parsing of AutoDock type strings.
#[derive(Debug, thiserror::Error)]
#[error("unsupported AutoDock atom type")]
pub struct ParseAutoDockTypeError;

impl FromStr for AutoDockType {
    type Err = ParseAutoDockTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "H" => Ok(Self::H),
            "HD" => Ok(Self::Hd),
            "C" => Ok(Self::C),
            "A" => Ok(Self::A),
            "N" => Ok(Self::N),
            "NA" => Ok(Self::Na),
            "OA" => Ok(Self::Oa),
            "S" => Ok(Self::S),
            "SA" => Ok(Self::Sa),
            "Se" => Ok(Self::Se),
            "P" => Ok(Self::P),
            "F" => Ok(Self::F),
            "Cl" => Ok(Self::Cl),
            "Br" => Ok(Self::Br),
            "I" => Ok(Self::I),
            "Zn" => Ok(Self::Zn),
            "Fe" => Ok(Self::Fe),
            "Mg" => Ok(Self::Mg),
            "Ca" => Ok(Self::Ca),
            "Mn" => Ok(Self::Mn),
            _ => Err(ParseAutoDockTypeError),
        }
    }
}

impl fmt::Display for AutoDockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::H => "H",
            Self::Hd => "HD",
            Self::C => "C",
            Self::A => "A",
            Self::N => "N",
            Self::Na => "NA",
            Self::Oa => "OA",
            Self::S => "S",
            Self::Sa => "SA",
            Self::Se => "Se",
            Self::P => "P",
            Self::F => "F",
            Self::Cl => "Cl",
            Self::Br => "Br",
            Self::I => "I",
            Self::Zn => "Zn",
            Self::Fe => "Fe",
            Self::Mg => "Mg",
            Self::Ca => "Ca",
            Self::Mn => "Mn",
        };
        write!(f, "{}", s)
    }
}

/// Coarse XScore atom types. Each heavy atom maps to exactly one of these;
/// the index selects the grid map and, pairwise, the scoring-function table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum XsType {
    CarbonHydrophobic,
    CarbonPolar,
    Nitrogen,
    NitrogenDonor,
    NitrogenAcceptor,
    NitrogenDonorAcceptor,
    OxygenAcceptor,
    OxygenDonorAcceptor,
    Sulfur,
    Phosphorus,
    Fluorine,
    Chlorine,
    Bromine,
    Iodine,
    MetalDonor,
}

impl XsType {
    /// Number of distinct coarse types; grid-map arrays and scoring tables
    /// are sized by this.
    pub const COUNT: usize = 15;

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Order-permissive triangular matrix index for a type pair, used to
    /// address the precomputed scoring-function table.
    #[inline]
    pub fn pair_index(self, other: XsType) -> usize {
        let (lo, hi) = if self.index() <= other.index() {
            (self.index(), other.index())
        } else {
            (other.index(), self.index())
        };
        lo + hi * (hi + 1) / 2
    }
}

// Two atoms closer than this are treated as an artifact, not a bond.
const NEIGHBOR_MIN_DISTANCE: f64 = 0.1;
// Additive slack on top of the summed covalent radii.
const NEIGHBOR_TOLERANCE: f64 = 0.25;

/// A ligand atom: force-field type, coordinate and mutable typing flags.
///
/// The coordinate is absolute while the ligand is being parsed and becomes
/// frame-local (relative to the owning frame's first heavy atom) once the
/// ligand is assembled.
#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    pub ad: AutoDockType,
    pub local: Point3<f64>,
    pub flags: AtomFlags,
}

impl Atom {
    pub fn new(ad: AutoDockType, position: Point3<f64>) -> Self {
        // Carbons start hydrophobic until a bonded hetero atom proves otherwise.
        let flags = match ad {
            AutoDockType::C | AutoDockType::A => AtomFlags::HYDROPHOBIC,
            _ => AtomFlags::empty(),
        };
        Self {
            ad,
            local: position,
            flags,
        }
    }

    #[inline]
    pub fn is_hydrogen(&self) -> bool {
        matches!(self.ad, AutoDockType::H | AutoDockType::Hd)
    }

    #[inline]
    pub fn is_polar_hydrogen(&self) -> bool {
        self.ad == AutoDockType::Hd
    }

    /// A heavy atom that is not carbon.
    #[inline]
    pub fn is_hetero(&self) -> bool {
        !matches!(
            self.ad,
            AutoDockType::H | AutoDockType::Hd | AutoDockType::C | AutoDockType::A
        )
    }

    /// Covalent radius in Angstrom.
    pub fn covalent_radius(&self) -> f64 {
        match self.ad {
            AutoDockType::H | AutoDockType::Hd => 0.37,
            AutoDockType::C | AutoDockType::A => 0.77,
            AutoDockType::N | AutoDockType::Na => 0.75,
            AutoDockType::Oa => 0.73,
            AutoDockType::S | AutoDockType::Sa => 1.02,
            AutoDockType::Se => 1.16,
            AutoDockType::P => 1.06,
            AutoDockType::F => 0.71,
            AutoDockType::Cl => 0.99,
            AutoDockType::Br => 1.14,
            AutoDockType::I => 1.33,
            AutoDockType::Zn => 1.31,
            AutoDockType::Fe => 1.25,
            AutoDockType::Mg => 1.30,
            AutoDockType::Ca => 1.74,
            AutoDockType::Mn => 1.39,
        }
    }

    /// Covalent-bond test: the inter-atomic distance must lie in
    /// `(NEIGHBOR_MIN_DISTANCE, covR(a) + covR(b) + NEIGHBOR_TOLERANCE]`.
    pub fn is_neighbor(&self, other: &Atom) -> bool {
        let d2 = (other.local - self.local).norm_squared();
        let reach = self.covalent_radius() + other.covalent_radius() + NEIGHBOR_TOLERANCE;
        d2 > NEIGHBOR_MIN_DISTANCE * NEIGHBOR_MIN_DISTANCE && d2 <= reach * reach
    }

    /// Clears the hydrophobic flag; a no-op on non-carbons.
    pub fn dehydrophobicize(&mut self) {
        self.flags.remove(AtomFlags::HYDROPHOBIC);
    }

    /// Marks a hetero atom as a hydrogen-bond donor; a no-op otherwise.
    pub fn donorize(&mut self) {
        if self.is_hetero() {
            self.flags.insert(AtomFlags::DONOR);
        }
    }

    /// Coarse XScore type of a heavy atom, derived from the force-field
    /// type and the current flag state.
    pub fn xs(&self) -> XsType {
        match self.ad {
            AutoDockType::C | AutoDockType::A => {
                if self.flags.contains(AtomFlags::HYDROPHOBIC) {
                    XsType::CarbonHydrophobic
                } else {
                    XsType::CarbonPolar
                }
            }
            AutoDockType::N => {
                if self.flags.contains(AtomFlags::DONOR) {
                    XsType::NitrogenDonor
                } else {
                    XsType::Nitrogen
                }
            }
            AutoDockType::Na => {
                if self.flags.contains(AtomFlags::DONOR) {
                    XsType::NitrogenDonorAcceptor
                } else {
                    XsType::NitrogenAcceptor
                }
            }
            AutoDockType::Oa => {
                if self.flags.contains(AtomFlags::DONOR) {
                    XsType::OxygenDonorAcceptor
                } else {
                    XsType::OxygenAcceptor
                }
            }
            AutoDockType::S | AutoDockType::Sa | AutoDockType::Se => XsType::Sulfur,
            AutoDockType::P => XsType::Phosphorus,
            AutoDockType::F => XsType::Fluorine,
            AutoDockType::Cl => XsType::Chlorine,
            AutoDockType::Br => XsType::Bromine,
            AutoDockType::I => XsType::Iodine,
            AutoDockType::Zn
            | AutoDockType::Fe
            | AutoDockType::Mg
            | AutoDockType::Ca
            | AutoDockType::Mn => XsType::MetalDonor,
            AutoDockType::H | AutoDockType::Hd => {
                unreachable!("hydrogens carry no coarse scoring type")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn atom(ad: AutoDockType, x: f64, y: f64, z: f64) -> Atom {
        Atom::new(ad, Point3::new(x, y, z))
    }

    #[test]
    fn type_strings_round_trip_through_parse_and_display() {
        for s in [
            "H", "HD", "C", "A", "N", "NA", "OA", "S", "SA", "Se", "P", "F", "Cl", "Br", "I",
            "Zn", "Fe", "Mg", "Ca", "Mn",
        ] {
            let ad: AutoDockType = s.parse().unwrap();
            assert_eq!(ad.to_string(), s);
        }
    }

    #[test]
    fn unknown_type_string_is_rejected() {
        assert!("X".parse::<AutoDockType>().is_err());
        assert!("".parse::<AutoDockType>().is_err());
        assert!("hd".parse::<AutoDockType>().is_err());
    }

    #[test]
    fn hydrogen_and_hetero_predicates() {
        assert!(atom(AutoDockType::H, 0.0, 0.0, 0.0).is_hydrogen());
        assert!(atom(AutoDockType::Hd, 0.0, 0.0, 0.0).is_hydrogen());
        assert!(atom(AutoDockType::Hd, 0.0, 0.0, 0.0).is_polar_hydrogen());
        assert!(!atom(AutoDockType::H, 0.0, 0.0, 0.0).is_polar_hydrogen());
        assert!(!atom(AutoDockType::C, 0.0, 0.0, 0.0).is_hydrogen());
        assert!(!atom(AutoDockType::C, 0.0, 0.0, 0.0).is_hetero());
        assert!(!atom(AutoDockType::A, 0.0, 0.0, 0.0).is_hetero());
        assert!(atom(AutoDockType::Oa, 0.0, 0.0, 0.0).is_hetero());
        assert!(atom(AutoDockType::Zn, 0.0, 0.0, 0.0).is_hetero());
        assert!(!atom(AutoDockType::Hd, 0.0, 0.0, 0.0).is_hetero());
    }

    #[test]
    fn neighbor_test_accepts_a_typical_carbon_carbon_bond() {
        let a = atom(AutoDockType::C, 0.0, 0.0, 0.0);
        let b = atom(AutoDockType::C, 1.54, 0.0, 0.0);
        assert!(a.is_neighbor(&b));
        assert!(b.is_neighbor(&a));
    }

    #[test]
    fn neighbor_test_rejects_far_and_coincident_atoms() {
        let a = atom(AutoDockType::C, 0.0, 0.0, 0.0);
        let far = atom(AutoDockType::C, 2.5, 0.0, 0.0);
        let coincident = atom(AutoDockType::C, 0.05, 0.0, 0.0);
        assert!(!a.is_neighbor(&far));
        assert!(!a.is_neighbor(&coincident));
    }

    #[test]
    fn neighbor_test_uses_summed_radii_plus_tolerance() {
        let a = atom(AutoDockType::C, 0.0, 0.0, 0.0);
        // 0.77 + 0.77 + 0.25 = 1.79: just inside vs. just outside.
        let inside = atom(AutoDockType::C, 1.789, 0.0, 0.0);
        let outside = atom(AutoDockType::C, 1.791, 0.0, 0.0);
        assert!(a.is_neighbor(&inside));
        assert!(!a.is_neighbor(&outside));
    }

    #[test]
    fn carbons_start_hydrophobic_and_can_be_demoted() {
        let mut c = atom(AutoDockType::C, 0.0, 0.0, 0.0);
        assert_eq!(c.xs(), XsType::CarbonHydrophobic);
        c.dehydrophobicize();
        assert_eq!(c.xs(), XsType::CarbonPolar);
    }

    #[test]
    fn donorize_promotes_hetero_types_only() {
        let mut n = atom(AutoDockType::N, 0.0, 0.0, 0.0);
        let mut na = atom(AutoDockType::Na, 0.0, 0.0, 0.0);
        let mut o = atom(AutoDockType::Oa, 0.0, 0.0, 0.0);
        let mut c = atom(AutoDockType::C, 0.0, 0.0, 0.0);
        n.donorize();
        na.donorize();
        o.donorize();
        c.donorize();
        assert_eq!(n.xs(), XsType::NitrogenDonor);
        assert_eq!(na.xs(), XsType::NitrogenDonorAcceptor);
        assert_eq!(o.xs(), XsType::OxygenDonorAcceptor);
        assert_eq!(c.xs(), XsType::CarbonHydrophobic);
    }

    #[test]
    fn metals_map_to_the_metal_donor_type() {
        for ad in [
            AutoDockType::Zn,
            AutoDockType::Fe,
            AutoDockType::Mg,
            AutoDockType::Ca,
            AutoDockType::Mn,
        ] {
            assert_eq!(atom(ad, 0.0, 0.0, 0.0).xs(), XsType::MetalDonor);
        }
    }

    #[test]
    fn pair_index_is_symmetric_and_triangular() {
        let a = XsType::CarbonHydrophobic;
        let b = XsType::OxygenAcceptor;
        assert_eq!(a.pair_index(b), b.pair_index(a));
        assert_eq!(a.pair_index(a), 0);

        // All pairs land in [0, COUNT * (COUNT + 1) / 2) without collisions
        // among ordered pairs.
        let max = XsType::COUNT * (XsType::COUNT + 1) / 2;
        assert_eq!(
            XsType::MetalDonor.pair_index(XsType::MetalDonor),
            max - 1
        );
        assert!(XsType::Iodine.pair_index(XsType::MetalDonor) < max);
    }
}
