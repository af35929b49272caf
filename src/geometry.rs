//! Geometric helpers for overlap tests and support footprints.
//!
//! All functions work on anchor/extents pairs in truck-local coordinates, so they
//! can be applied to candidate orientations before anything is committed.

use crate::model::PlacedUnit;
use crate::types::{BoundingBox, Vec3};

/// Checks whether two axis-aligned boxes overlap.
///
/// The boxes overlap only if they penetrate each other by more than `tolerance`
/// on every axis. Boxes touching at a face (within `tolerance`) do not overlap.
///
/// # Parameters
/// * `pos_a`, `dims_a` - Anchor and extents of the first box
/// * `pos_b`, `dims_b` - Anchor and extents of the second box
/// * `tolerance` - Allowed penetration per axis
///
/// # Example
/// ```
/// use truck_packer::geometry::overlaps;
/// use truck_packer::types::Vec3;
///
/// let unit = Vec3::new(1.0, 1.0, 1.0);
/// assert!(!overlaps(Vec3::zero(), unit, Vec3::new(1.0, 0.0, 0.0), unit, 0.01));
/// assert!(overlaps(Vec3::zero(), unit, Vec3::new(0.5, 0.0, 0.0), unit, 0.01));
/// ```
pub fn overlaps(pos_a: Vec3, dims_a: Vec3, pos_b: Vec3, dims_b: Vec3, tolerance: f64) -> bool {
    let a = BoundingBox::from_position_and_dims(pos_a, dims_a);
    let b = BoundingBox::from_position_and_dims(pos_b, dims_b);
    a.intersects(&b, tolerance)
}

/// Overlap test between two placed units.
pub fn intersects(a: &PlacedUnit, b: &PlacedUnit, tolerance: f64) -> bool {
    overlaps(
        a.position,
        a.orientation.as_vec3(),
        b.position,
        b.orientation.as_vec3(),
        tolerance,
    )
}

/// Calculates the overlap of two intervals in one dimension.
///
/// # Returns
/// Length of the overlap, at least 0.0
///
/// # Example
/// ```
/// use truck_packer::geometry::overlap_1d;
///
/// assert_eq!(overlap_1d(0.0, 5.0, 3.0, 8.0), 2.0);
/// assert_eq!(overlap_1d(0.0, 1.0, 2.0, 3.0), 0.0);
/// ```
pub fn overlap_1d(a1: f64, a2: f64, b1: f64, b2: f64) -> f64 {
    (a2.min(b2) - a1.max(b1)).max(0.0)
}

/// Fraction of a candidate footprint that lies over a potential support.
///
/// Only the XY components of the arguments are used. The result is the overlap
/// area divided by the candidate's own footprint area; a degenerate candidate
/// footprint yields 0.0.
pub fn footprint_coverage(
    anchor: Vec3,
    extents: Vec3,
    support_pos: Vec3,
    support_dims: Vec3,
) -> f64 {
    let footprint = extents.base_area();
    if footprint <= 0.0 {
        return 0.0;
    }

    let over_x = overlap_1d(
        anchor.x,
        anchor.x + extents.x,
        support_pos.x,
        support_pos.x + support_dims.x,
    );
    let over_y = overlap_1d(
        anchor.y,
        anchor.y + extents.y,
        support_pos.y,
        support_pos.y + support_dims.y,
    );
    (over_x * over_y) / footprint
}

/// Checks whether a point lies on the top face of a box.
///
/// The point height must match the top face within `height_tolerance`, and its
/// XY projection must fall inside the footprint grown by `edge_tolerance`.
pub fn rests_on_top_face(
    point: Vec3,
    box_pos: Vec3,
    box_dims: Vec3,
    height_tolerance: f64,
    edge_tolerance: f64,
) -> bool {
    let top_z = box_pos.z + box_dims.z;
    if (top_z - point.z).abs() > height_tolerance {
        return false;
    }

    point.x >= box_pos.x - edge_tolerance
        && point.x <= box_pos.x + box_dims.x + edge_tolerance
        && point.y >= box_pos.y - edge_tolerance
        && point.y <= box_pos.y + box_dims.y + edge_tolerance
}
