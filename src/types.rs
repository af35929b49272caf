//! Common types and traits for truck-local 3D geometry.
//!
//! Axis convention used everywhere in the crate:
//! - `x` runs along the truck length,
//! - `y` runs across the truck width,
//! - `z` is the height above the truck floor.

use std::ops::Add;

/// Tolerance for plain numerical comparisons (weights, areas).
pub const EPSILON_GENERAL: f64 = 1e-6;

/// Penetration tolerance for box overlap, bounds checks and point deduplication.
///
/// Extreme points are produced by exact addition, so an item placed flush
/// against an existing face must not count as overlapping it.
pub const EPSILON_OVERLAP: f64 = 0.01;

/// Tolerance when matching an anchor height against a supporting top face.
pub const EPSILON_SUPPORT_HEIGHT: f64 = 0.02;

/// Tolerance when matching an oriented extent against the raw item length.
pub const EPSILON_ORIENTATION: f64 = 0.001;

/// Candidate point coordinates are snapped to this many steps per unit.
pub const POINT_SNAP_STEPS: f64 = 1e4;

/// Represents a 3D vector or point in truck space.
///
/// # Examples
/// ```
/// use truck_packer::types::Vec3;
///
/// let anchor = Vec3::new(1.0, 0.0, 0.0);
/// let extents = Vec3::new(1.2, 0.8, 1.0);
/// let far_corner = anchor + extents;
/// assert_eq!(far_corner, Vec3::new(2.2, 0.8, 1.0));
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    /// Creates a new 3D vector.
    #[inline]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Creates a zero vector (truck origin).
    #[inline]
    pub const fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    /// Converts to tuple format for API compatibility.
    #[inline]
    pub const fn as_tuple(&self) -> (f64, f64, f64) {
        (self.x, self.y, self.z)
    }

    /// Creates from tuple format.
    #[inline]
    pub const fn from_tuple(tuple: (f64, f64, f64)) -> Self {
        Self::new(tuple.0, tuple.1, tuple.2)
    }

    /// Product of all components.
    #[inline]
    pub fn volume(&self) -> f64 {
        self.x * self.y * self.z
    }

    /// Floor area (X × Y product).
    #[inline]
    pub fn base_area(&self) -> f64 {
        self.x * self.y
    }

    /// Checks if the vector fits within another vector (component-wise <=).
    ///
    /// # Parameters
    /// * `container` - The outer vector (e.g., truck dimensions)
    /// * `tolerance` - Numerical tolerance for the comparison
    #[inline]
    pub fn fits_within(&self, container: &Self, tolerance: f64) -> bool {
        self.x <= container.x + tolerance
            && self.y <= container.y + tolerance
            && self.z <= container.z + tolerance
    }

    /// Component-wise comparison with a shared tolerance.
    #[inline]
    pub fn approx_eq(&self, other: &Self, tolerance: f64) -> bool {
        (self.x - other.x).abs() < tolerance
            && (self.y - other.y).abs() < tolerance
            && (self.z - other.z).abs() < tolerance
    }

    /// Rounds every component to the candidate point grid.
    ///
    /// Repeated additions of decimal extents otherwise accumulate
    /// representation noise (`0.1 + 0.2`), which breaks exact ordering.
    #[inline]
    pub fn snapped(&self) -> Self {
        let snap = |v: f64| (v * POINT_SNAP_STEPS).round() / POINT_SNAP_STEPS;
        Self::new(snap(self.x), snap(self.y), snap(self.z))
    }
}

impl Add for Vec3 {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self::Output {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

/// Trait for objects with 3D extents.
pub trait Dimensional {
    /// Returns the extents along (length, width, height).
    fn dimensions(&self) -> Vec3;

    /// Calculates the volume.
    fn volume(&self) -> f64 {
        self.dimensions().volume()
    }
}

/// Trait for objects with weight.
pub trait Weighted {
    /// Returns the weight in kg.
    fn weight(&self) -> f64;
}

/// Axis-aligned bounding box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    /// Minimum corner (anchor)
    pub min: Vec3,
    /// Maximum corner (anchor + extents)
    pub max: Vec3,
}

impl BoundingBox {
    /// Creates a bounding box from an anchor and extents.
    #[inline]
    pub fn from_position_and_dims(position: Vec3, dims: Vec3) -> Self {
        Self {
            min: position,
            max: position + dims,
        }
    }

    /// Checks whether two boxes penetrate each other by more than `tolerance`
    /// on every axis. Boxes touching at a face are not intersecting.
    #[inline]
    pub fn intersects(&self, other: &Self, tolerance: f64) -> bool {
        self.min.x < other.max.x - tolerance
            && self.max.x > other.min.x + tolerance
            && self.min.y < other.max.y - tolerance
            && self.max.y > other.min.y + tolerance
            && self.min.z < other.max.z - tolerance
            && self.max.z > other.min.z + tolerance
    }
}
