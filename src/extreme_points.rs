//! Candidate anchor points ("extreme points") of a single truck.
//!
//! A simplified extreme point heuristic: only open corners are tracked, not the
//! free volume around them. Every placement consumes its anchor and offers up to
//! three new corners, one per axis, at the far faces of the placed unit.

use crate::geometry::rests_on_top_face;
use crate::model::PlacedUnit;
use crate::optimizer::PackingConfig;
use crate::types::{EPSILON_GENERAL, Vec3};

/// Candidate points of one truck, in insertion order.
#[derive(Clone, Debug, PartialEq)]
pub struct CandidatePoints {
    points: Vec<Vec3>,
}

impl Default for CandidatePoints {
    fn default() -> Self {
        Self::new()
    }
}

impl CandidatePoints {
    /// Store of an empty truck: only the origin.
    pub fn new() -> Self {
        Self {
            points: vec![Vec3::zero()],
        }
    }

    pub fn points(&self) -> &[Vec3] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Checks whether a point within `tolerance` on every axis is stored.
    pub fn contains(&self, point: Vec3, tolerance: f64) -> bool {
        self.points.iter().any(|p| p.approx_eq(&point, tolerance))
    }

    /// Removes the first stored point matching `point` within `tolerance`.
    pub fn remove(&mut self, point: Vec3, tolerance: f64) -> bool {
        match self.points.iter().position(|p| p.approx_eq(&point, tolerance)) {
            Some(idx) => {
                self.points.remove(idx);
                true
            }
            None => false,
        }
    }

    fn insert_unique(&mut self, point: Vec3, bounds: Vec3, tolerance: f64) -> bool {
        if !point.fits_within(&bounds, EPSILON_GENERAL) || self.contains(point, tolerance) {
            return false;
        }
        self.points.push(point);
        true
    }

    /// Updates the store after a unit with `extents` was committed at `anchor`.
    ///
    /// `placed` must already include the new unit, so that the pruning step sees
    /// its top face.
    pub fn record_placement(
        &mut self,
        anchor: Vec3,
        extents: Vec3,
        bounds: Vec3,
        placed: &[PlacedUnit],
        config: &PackingConfig,
    ) {
        let tolerance = config.overlap_epsilon;
        self.remove(anchor, tolerance);

        let far = (anchor + extents).snapped();
        for point in [
            Vec3::new(far.x, anchor.y, anchor.z),
            Vec3::new(anchor.x, far.y, anchor.z),
            Vec3::new(anchor.x, anchor.y, far.z),
        ] {
            self.insert_unique(point, bounds, tolerance);
        }

        self.prune_dangling(placed, config);
    }

    /// Drops elevated points that no longer rest on the top face of any placed unit.
    fn prune_dangling(&mut self, placed: &[PlacedUnit], config: &PackingConfig) {
        self.points.retain(|point| {
            if point.z < config.overlap_epsilon {
                return true;
            }
            placed.iter().any(|p| {
                rests_on_top_face(
                    *point,
                    p.position,
                    p.orientation.as_vec3(),
                    config.support_height_epsilon,
                    config.overlap_epsilon,
                )
            })
        });
    }
}
