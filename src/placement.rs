//! Single-unit, single-truck placement search.
//!
//! The search is first-fit: candidate points are scanned in a fixed order, and for
//! each point the allowed orientations in enumeration order. The first pair that
//! fits the truck, is supported (when elevated) and overlaps nothing is committed.

use std::cmp::Ordering;

use crate::geometry::{footprint_coverage, overlaps};
use crate::model::{CatalogItem, OrderUnit, Orientation, OrientationConstraint, Placement, PlacedUnit, Truck};
use crate::optimizer::PackingConfig;
use crate::types::Vec3;

/// Orientations the search may try for an item, in enumeration order.
///
/// With a constraint, only permutations that put the raw length on the
/// constrained axis survive. The result may be empty.
pub fn orientations_for(item: &CatalogItem, config: &PackingConfig) -> Vec<Orientation> {
    let all = Orientation::permutations(item.dims());
    let matches_length = |extent: f64| (extent - item.length).abs() < config.orientation_epsilon;

    match item.orientation_constraint {
        OrientationConstraint::Free => all.to_vec(),
        OrientationConstraint::AlongLength => {
            all.into_iter().filter(|o| matches_length(o.length)).collect()
        }
        OrientationConstraint::AlongWidth => {
            all.into_iter().filter(|o| matches_length(o.width)).collect()
        }
    }
}

/// Checks whether `point` sits exactly on top of a stackable unit of the same reference.
pub fn is_stacking_point(truck: &Truck, point: Vec3, item: &CatalogItem, config: &PackingConfig) -> bool {
    if point.z <= config.overlap_epsilon {
        return false;
    }
    truck.placed().iter().any(|p| {
        p.unit.item.stackable
            && p.reference() == item.reference
            && (p.top_z() - point.z).abs() <= config.support_height_epsilon
            && (point.x - p.position.x).abs() < config.overlap_epsilon
            && (point.y - p.position.y).abs() < config.overlap_epsilon
    })
}

/// Candidate points of `truck` in evaluation order for `item`.
///
/// Stacking points come first for stackable items; then ascending height,
/// width axis and length axis.
pub fn ordered_candidate_points(truck: &Truck, item: &CatalogItem, config: &PackingConfig) -> Vec<Vec3> {
    let mut keyed: Vec<(bool, Vec3)> = truck
        .candidate_points()
        .points()
        .iter()
        .map(|&point| {
            let stacking = item.stackable && is_stacking_point(truck, point, item, config);
            (stacking, point)
        })
        .collect();

    keyed.sort_by(|(a_stack, a), (b_stack, b)| {
        b_stack.cmp(a_stack).then_with(|| compare_points(a, b))
    });

    keyed.into_iter().map(|(_, point)| point).collect()
}

/// Finds the placed unit that carries a unit with `orientation` anchored at `point`.
///
/// The support's top face must match the anchor height and its footprint must
/// cover at least the configured share of the new footprint. Units are scanned in
/// placement order; the first match wins, not the best-covering one.
pub fn find_support<'a>(
    truck: &'a Truck,
    point: Vec3,
    orientation: &Orientation,
    config: &PackingConfig,
) -> Option<&'a PlacedUnit> {
    let extents = orientation.as_vec3();
    truck.placed().iter().find(|p| {
        if (p.top_z() - point.z).abs() > config.support_height_epsilon {
            return false;
        }
        footprint_coverage(point, extents, p.position, p.orientation.as_vec3())
            >= config.min_support_ratio
    })
}

/// Stack level of a unit resting on `support`.
#[inline]
pub fn stack_level_of(support: &PlacedUnit) -> u32 {
    support.stack_level + 1
}

/// Stack limit for `item` resting on `support`: the item's own limit, else the
/// support's, else the configured default.
pub fn effective_stack_limit(item: &CatalogItem, support: &CatalogItem, config: &PackingConfig) -> u32 {
    item.max_stack_levels
        .or(support.max_stack_levels)
        .unwrap_or(config.default_max_stack_levels)
}

fn can_stack_on(item: &CatalogItem, support: &PlacedUnit) -> bool {
    item.stackable && support.unit.item.stackable && support.reference() == item.reference
}

/// Searches a placement for `unit` without modifying the truck.
pub fn find_placement(truck: &Truck, unit: &OrderUnit, config: &PackingConfig) -> Option<Placement> {
    let orientations = orientations_for(&unit.item, config);
    if orientations.is_empty() {
        return None;
    }
    let bounds = truck.spec.dims();

    for point in ordered_candidate_points(truck, &unit.item, config) {
        for orientation in &orientations {
            let extents = orientation.as_vec3();
            if !(point + extents).fits_within(&bounds, config.overlap_epsilon) {
                continue;
            }

            let mut stack_level = 0;
            if point.z > config.overlap_epsilon {
                let Some(support) = find_support(truck, point, orientation, config) else {
                    continue;
                };
                if !can_stack_on(&unit.item, support) {
                    continue;
                }
                stack_level = stack_level_of(support);
                if stack_level >= effective_stack_limit(&unit.item, &support.unit.item, config) {
                    continue;
                }
            }

            let collides = truck.placed().iter().any(|p| {
                overlaps(
                    point,
                    extents,
                    p.position,
                    p.orientation.as_vec3(),
                    config.overlap_epsilon,
                )
            });
            if collides {
                continue;
            }

            return Some(Placement {
                position: point,
                orientation: *orientation,
                stack_level,
            });
        }
    }

    None
}

/// Tries to place `unit` into `truck`, committing on the first valid position.
///
/// Returns `false` without touching the truck when nothing fits. The weight
/// limit is the caller's concern.
pub fn try_place(truck: &mut Truck, unit: &OrderUnit, config: &PackingConfig) -> bool {
    match find_placement(truck, unit, config) {
        Some(placement) => {
            truck.commit(unit.clone(), placement, config);
            true
        }
        None => false,
    }
}

/// First raw-extent permutation that fits an empty truck, ignoring any constraint.
pub fn relaxed_orientation(item: &CatalogItem, truck: &Truck, config: &PackingConfig) -> Option<Orientation> {
    let bounds = truck.spec.dims();
    Orientation::permutations(item.dims())
        .into_iter()
        .find(|o| o.as_vec3().fits_within(&bounds, config.overlap_epsilon))
}

/// Ascending height, then width axis, then length axis.
fn compare_points(a: &Vec3, b: &Vec3) -> Ordering {
    a.z.total_cmp(&b.z)
        .then_with(|| a.y.total_cmp(&b.y))
        .then_with(|| a.x.total_cmp(&b.x))
}
