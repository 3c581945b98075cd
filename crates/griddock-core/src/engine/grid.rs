//! The rectangular search box and the per-type grid maps the evaluator
//! samples. Map precomputation happens outside this crate; here live the
//! containment and voxel-addressing contracts it must satisfy.

use nalgebra::{Point3, Vector3};

/// Axis-aligned search box with a uniform probe lattice.
///
/// The box spans `[corner0, corner1)` per axis, where `corner1` is snapped
/// outward to a whole number of grid cells so that for any contained point
/// both `grid_index(p)` and `grid_index(p) + 1` address valid probes.
#[derive(Debug, Clone)]
pub struct SearchBox {
    center: Point3<f64>,
    corner0: Point3<f64>,
    corner1: Point3<f64>,
    granularity: f64,
    granularity_inverse: f64,
    num_probes: [usize; 3],
}

impl SearchBox {
    pub fn new(center: Point3<f64>, size: Vector3<f64>, granularity: f64) -> Self {
        debug_assert!(granularity > 0.0);
        let granularity_inverse = 1.0 / granularity;
        let corner0 = center - size * 0.5;
        let mut num_probes = [0usize; 3];
        let mut span = Vector3::zeros();
        for axis in 0..3 {
            let cells = (size[axis] * granularity_inverse).ceil().max(1.0) as usize;
            num_probes[axis] = cells + 1;
            span[axis] = cells as f64 * granularity;
        }
        let corner1 = corner0 + span;
        Self {
            center,
            corner0,
            corner1,
            granularity,
            granularity_inverse,
            num_probes,
        }
    }

    pub fn center(&self) -> Point3<f64> {
        self.center
    }

    pub fn granularity(&self) -> f64 {
        self.granularity
    }

    /// Cached `1 / granularity`, the factor converting a grid-value delta
    /// into a spatial derivative.
    #[inline]
    pub fn granularity_inverse(&self) -> f64 {
        self.granularity_inverse
    }

    /// Probe counts per axis; grid maps for this box must have exactly
    /// these dimensions.
    pub fn num_probes(&self) -> [usize; 3] {
        self.num_probes
    }

    /// Half-open containment test.
    #[inline]
    pub fn within(&self, point: &Point3<f64>) -> bool {
        (0..3).all(|axis| self.corner0[axis] <= point[axis] && point[axis] < self.corner1[axis])
    }

    /// Index of the nearest lower probe of a contained point.
    #[inline]
    pub fn grid_index(&self, point: &Point3<f64>) -> [usize; 3] {
        debug_assert!(self.within(point));
        let mut index = [0usize; 3];
        for axis in 0..3 {
            index[axis] =
                ((point[axis] - self.corner0[axis]) * self.granularity_inverse) as usize;
        }
        index
    }
}

/// A dense 3-D scalar field over a box's probe lattice, or an unpopulated
/// placeholder for a coarse type the ligand does not use.
#[derive(Debug, Clone, Default)]
pub struct GridMap {
    dims: [usize; 3],
    data: Vec<f64>,
}

impl GridMap {
    pub fn new(dims: [usize; 3], data: Vec<f64>) -> Self {
        debug_assert_eq!(data.len(), dims[0] * dims[1] * dims[2]);
        Self { dims, data }
    }

    /// Placeholder for an absent map.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn dims(&self) -> [usize; 3] {
        self.dims
    }

    /// Builds a map by sampling `f` at every probe index.
    pub fn from_fn(dims: [usize; 3], f: impl Fn(usize, usize, usize) -> f64) -> Self {
        let mut data = Vec::with_capacity(dims[0] * dims[1] * dims[2]);
        for k in 0..dims[2] {
            for j in 0..dims[1] {
                for i in 0..dims[0] {
                    data.push(f(i, j, k));
                }
            }
        }
        Self { dims, data }
    }

    /// Value at probe `(i, j, k)`; x is the fastest-varying axis.
    #[inline]
    pub fn at(&self, i: usize, j: usize, k: usize) -> f64 {
        debug_assert!(i < self.dims[0] && j < self.dims[1] && k < self.dims[2]);
        self.data[(k * self.dims[1] + j) * self.dims[0] + i]
    }
}
