//! Geometry information

use rayon::prelude::*;

use crate::{
    constants::{MAX_OCTREE_DEPTH, NSIBLINGS},
    error::{OctreeError, Result},
};

/// A point in three dimensions.
pub type Point = [f64; 3];

/// A bounding box describes geometry in which an Octree lives.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PhysicalBox {
    coords: [f64; 6],
}

impl PhysicalBox {
    /// Create a new bounding box.
    ///
    /// The coordinates are given by `[xmin, ymin, zmin, xmax, ymax, zmax]`.
    pub fn new(coords: [f64; 6]) -> Self {
        Self { coords }
    }

    /// Give a slice of points. Compute the tight bounding box.
    ///
    /// The reduction runs in parallel. For an empty slice the returned box is
    /// inverted (`min > max`) and fails [PhysicalBox::validate].
    pub fn from_points(points: &[Point]) -> PhysicalBox {
        let identity = || ([f64::MAX; 3], [f64::MIN; 3]);

        let (lower, upper) = points
            .par_iter()
            .fold(identity, |(mut lower, mut upper), point| {
                for dim in 0..3 {
                    lower[dim] = f64::min(lower[dim], point[dim]);
                    upper[dim] = f64::max(upper[dim], point[dim]);
                }
                (lower, upper)
            })
            .reduce(identity, |(mut lower, mut upper), (other_lower, other_upper)| {
                for dim in 0..3 {
                    lower[dim] = f64::min(lower[dim], other_lower[dim]);
                    upper[dim] = f64::max(upper[dim], other_upper[dim]);
                }
                (lower, upper)
            });

        PhysicalBox {
            coords: [
                lower[0], lower[1], lower[2], upper[0], upper[1], upper[2],
            ],
        }
    }

    /// Return a cube with the same centroid that contains this box.
    ///
    /// We increase the largest diameter by the box size on the deepest level
    /// so that no point lies on the upper boundary of the root box. A box
    /// without extent (a single point) becomes a unit cube around its centroid.
    ///
    /// The padding never drops below a few ulps of the largest coordinate, so
    /// boxes far away from the origin keep a positive extent after rounding.
    pub fn cubed(&self) -> PhysicalBox {
        let [xmean, ymean, zmean] = self.centroid();

        let deepest_box_diam = 1.0 / (1_u64 << MAX_OCTREE_DEPTH) as f64;

        let magnitude = self.coords.iter().fold(0.0, |acc: f64, value| acc.max(value.abs()));
        let min_padding = 8.0 * f64::EPSILON * magnitude;

        let max_diam = self.diameters().into_iter().fold(0.0, f64::max);

        let max_diam = if max_diam > 0.0 {
            f64::max(max_diam * (1.0 + deepest_box_diam), max_diam + min_padding)
        } else {
            f64::max(1.0, min_padding)
        };

        PhysicalBox::new([
            xmean - 0.5 * max_diam,
            ymean - 0.5 * max_diam,
            zmean - 0.5 * max_diam,
            xmean + 0.5 * max_diam,
            ymean + 0.5 * max_diam,
            zmean + 0.5 * max_diam,
        ])
    }

    /// Check that the box has finite bounds and positive extent in each dimension.
    pub fn validate(&self) -> Result<()> {
        if self.coords.iter().any(|value| !value.is_finite()) {
            return Err(OctreeError::DegenerateBox(format!(
                "{} has non-finite bounds",
                self
            )));
        }

        if self.diameters().iter().any(|&diam| diam <= 0.0) {
            return Err(OctreeError::DegenerateBox(format!(
                "{} has no volume",
                self
            )));
        }

        Ok(())
    }

    /// Return coordinates
    pub fn coordinates(&self) -> [f64; 6] {
        self.coords
    }

    /// Lower corner of the box.
    pub fn lower(&self) -> [f64; 3] {
        [self.coords[0], self.coords[1], self.coords[2]]
    }

    /// Upper corner of the box.
    pub fn upper(&self) -> [f64; 3] {
        [self.coords[3], self.coords[4], self.coords[5]]
    }

    /// Edge lengths in each dimension.
    pub fn diameters(&self) -> [f64; 3] {
        let [xmin, ymin, zmin, xmax, ymax, zmax] = self.coords;
        [xmax - xmin, ymax - ymin, zmax - zmin]
    }

    /// The centroid of the box.
    pub fn centroid(&self) -> [f64; 3] {
        let [xmin, ymin, zmin, xmax, ymax, zmax] = self.coords;
        [
            0.5 * (xmin + xmax),
            0.5 * (ymin + ymax),
            0.5 * (zmin + zmax),
        ]
    }

    /// Return true if the point lies in the closed box.
    pub fn contains(&self, point: &Point) -> bool {
        let [xmin, ymin, zmin, xmax, ymax, zmax] = self.coords;

        xmin <= point[0]
            && point[0] <= xmax
            && ymin <= point[1]
            && point[1] <= ymax
            && zmin <= point[2]
            && point[2] <= zmax
    }

    /// Octant of the point relative to the centroid.
    ///
    /// The octant index has weight 1 for x, 2 for y and 4 for z. A coordinate
    /// equal to the centroid counts as upper half.
    pub fn octant(&self, point: &Point) -> usize {
        let centroid = self.centroid();
        (0..3)
            .filter(|&dim| point[dim] >= centroid[dim])
            .map(|dim| 1 << dim)
            .sum()
    }

    /// Return the child box for a given octant.
    pub fn child(&self, octant: usize) -> PhysicalBox {
        debug_assert!(octant < NSIBLINGS);
        let [xmin, ymin, zmin, xmax, ymax, zmax] = self.coords;
        let [xmid, ymid, zmid] = self.centroid();

        let (xmin, xmax) = if octant & 1 != 0 { (xmid, xmax) } else { (xmin, xmid) };
        let (ymin, ymax) = if octant & 2 != 0 { (ymid, ymax) } else { (ymin, ymid) };
        let (zmin, zmax) = if octant & 4 != 0 { (zmid, zmax) } else { (zmin, zmid) };

        PhysicalBox::new([xmin, ymin, zmin, xmax, ymax, zmax])
    }

    /// Bisect the box in all dimensions.
    pub fn children(&self) -> [PhysicalBox; NSIBLINGS] {
        std::array::from_fn(|octant| self.child(octant))
    }

    /// Map a point from the reference box [0, 1]^3 to the bounding box.
    pub fn reference_to_physical(&self, point: Point) -> Point {
        let [xmin, ymin, zmin, xmax, ymax, zmax] = self.coords;

        [
            xmin + (xmax - xmin) * point[0],
            ymin + (ymax - ymin) * point[1],
            zmin + (zmax - zmin) * point[2],
        ]
    }

    /// Map a point from the physical domain to the reference box.
    pub fn physical_to_reference(&self, point: Point) -> Point {
        let [xmin, ymin, zmin, xmax, ymax, zmax] = self.coords;

        [
            (point[0] - xmin) / (xmax - xmin),
            (point[1] - ymin) / (ymax - ymin),
            (point[2] - zmin) / (zmax - zmin),
        ]
    }
}

impl std::fmt::Display for PhysicalBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let [xmin, ymin, zmin, xmax, ymax, zmax] = self.coords;

        write!(
            f,
            "(xmin: {}, ymin: {}, zmin: {}, xmax: {}, ymax: {}, zmax: {})",
            xmin, ymin, zmin, xmax, ymax, zmax
        )
    }
}
