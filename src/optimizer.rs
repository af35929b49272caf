//! Truck allocation for an order.
//!
//! A deterministic greedy heuristic:
//! - every order line is expanded into unit items and sorted by packing priority
//!   (stackable first, grouped by reference, largest volume first),
//! - each unit goes into the first existing truck that accepts it, trucks already
//!   carrying the same reference being tried first for stackable units,
//! - otherwise a new truck is opened, with a constraint-relaxing fallback for units
//!   whose orientation constraint cannot be honoured in any truck,
//! - finally the last truck is drained into the earlier ones where possible.

use std::cmp::Ordering;
use std::collections::HashMap;

use serde::Serialize;
use tracing::{debug, info, warn};
use utoipa::ToSchema;

use crate::model::{ITEM_COLORS, OrderLine, OrderUnit, PlacedUnit, Truck, TruckSpec};
use crate::placement::{relaxed_orientation, try_place};
use crate::types::{
    Dimensional, EPSILON_GENERAL, EPSILON_ORIENTATION, EPSILON_OVERLAP, EPSILON_SUPPORT_HEIGHT,
    Weighted,
};

/// Tolerances and limits of the packing heuristic.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PackingConfig {
    /// Allowed penetration between boxes and beyond truck walls
    pub overlap_epsilon: f64,
    /// Height tolerance when matching an anchor to a supporting top face
    pub support_height_epsilon: f64,
    /// Tolerance when matching oriented extents against the raw length
    pub orientation_epsilon: f64,
    /// Minimum share of the footprint that a single support must cover (0.0 to 1.0)
    pub min_support_ratio: f64,
    /// Stack limit when neither the unit nor its support defines one
    pub default_max_stack_levels: u32,
}

impl PackingConfig {
    pub const DEFAULT_OVERLAP_EPSILON: f64 = EPSILON_OVERLAP;
    pub const DEFAULT_SUPPORT_HEIGHT_EPSILON: f64 = EPSILON_SUPPORT_HEIGHT;
    pub const DEFAULT_ORIENTATION_EPSILON: f64 = EPSILON_ORIENTATION;
    pub const DEFAULT_MIN_SUPPORT_RATIO: f64 = 0.8;
    pub const DEFAULT_MAX_STACK_LEVELS: u32 = 2;

    /// Creates a builder for a custom configuration.
    pub fn builder() -> PackingConfigBuilder {
        PackingConfigBuilder::default()
    }
}

impl Default for PackingConfig {
    fn default() -> Self {
        Self {
            overlap_epsilon: Self::DEFAULT_OVERLAP_EPSILON,
            support_height_epsilon: Self::DEFAULT_SUPPORT_HEIGHT_EPSILON,
            orientation_epsilon: Self::DEFAULT_ORIENTATION_EPSILON,
            min_support_ratio: Self::DEFAULT_MIN_SUPPORT_RATIO,
            default_max_stack_levels: Self::DEFAULT_MAX_STACK_LEVELS,
        }
    }
}

/// Builder for `PackingConfig`.
#[derive(Clone, Debug, Default)]
pub struct PackingConfigBuilder {
    config: PackingConfig,
}

impl PackingConfigBuilder {
    pub fn overlap_epsilon(mut self, epsilon: f64) -> Self {
        self.config.overlap_epsilon = epsilon;
        self
    }

    pub fn support_height_epsilon(mut self, epsilon: f64) -> Self {
        self.config.support_height_epsilon = epsilon;
        self
    }

    pub fn orientation_epsilon(mut self, epsilon: f64) -> Self {
        self.config.orientation_epsilon = epsilon;
        self
    }

    pub fn min_support_ratio(mut self, ratio: f64) -> Self {
        self.config.min_support_ratio = ratio;
        self
    }

    pub fn default_max_stack_levels(mut self, levels: u32) -> Self {
        self.config.default_max_stack_levels = levels;
        self
    }

    pub fn build(self) -> PackingConfig {
        self.config
    }
}

/// Outcome of a packing run.
#[derive(Clone, Debug)]
pub struct PackingResult {
    /// Trucks in creation order, empty ones removed.
    pub trucks: Vec<Truck>,
    /// Units that can never be loaded into the configured truck.
    pub skipped: Vec<SkippedUnit>,
}

impl PackingResult {
    /// Indicates whether every unit was loaded.
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }

    pub fn truck_count(&self) -> usize {
        self.trucks.len()
    }

    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }

    /// Number of loaded units across all trucks.
    pub fn placed_count(&self) -> usize {
        self.trucks.iter().map(Truck::item_count).sum()
    }

    /// Weight of all loaded units.
    pub fn total_packed_weight(&self) -> f64 {
        self.trucks.iter().map(Truck::total_weight).sum()
    }

    /// Iterates over every placed unit with the index of its truck.
    pub fn placements(&self) -> impl Iterator<Item = (usize, &PlacedUnit)> {
        self.trucks
            .iter()
            .enumerate()
            .flat_map(|(idx, truck)| truck.placed().iter().map(move |p| (idx, p)))
    }
}

/// A unit the engine had to leave behind.
#[derive(Clone, Debug)]
pub struct SkippedUnit {
    pub unit: OrderUnit,
    pub reason: SkipReason,
}

/// Why a unit cannot be loaded. Both are configuration errors of the order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkipReason {
    /// No axis permutation of the raw extents fits an empty truck.
    DimensionsExceedTruck,
    /// The unit alone is heavier than the truck may carry.
    TooHeavyForTruck,
}

impl SkipReason {
    pub fn code(&self) -> &'static str {
        match self {
            SkipReason::DimensionsExceedTruck => "dimensions_exceed_truck",
            SkipReason::TooHeavyForTruck => "too_heavy_for_truck",
        }
    }
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::DimensionsExceedTruck => {
                write!(f, "Item exceeds the truck dimensions in every orientation")
            }
            SkipReason::TooHeavyForTruck => {
                write!(f, "Item exceeds the truck's maximum weight")
            }
        }
    }
}

/// Events emitted while packing, for live visualization.
#[derive(Clone, Debug, Serialize, ToSchema)]
#[serde(tag = "type")]
pub enum PackEvent {
    /// A new truck was opened.
    TruckOpened {
        truck_id: usize,
        #[schema(value_type = [f64; 3])]
        dims: (f64, f64, f64),
        max_weight: f64,
    },
    /// A unit was placed by the regular search.
    ItemPlaced {
        truck_id: usize,
        unit_id: usize,
        reference: String,
        #[schema(value_type = [f64; 3])]
        pos: (f64, f64, f64),
        #[schema(value_type = [f64; 3])]
        dims: (f64, f64, f64),
        stack_level: u32,
        total_weight: f64,
    },
    /// A unit was placed by the relaxation fallback, ignoring its orientation constraint.
    ItemRelaxed {
        truck_id: usize,
        unit_id: usize,
        reference: String,
        #[schema(value_type = [f64; 3])]
        dims: (f64, f64, f64),
        total_weight: f64,
    },
    /// A unit cannot be loaded at all.
    ItemSkipped {
        unit_id: usize,
        reference: String,
        #[schema(value_type = [f64; 3])]
        dims: (f64, f64, f64),
        weight: f64,
        reason_code: String,
        reason_text: String,
    },
    /// A unit moved from the last truck into an earlier one.
    ItemConsolidated {
        from_truck_id: usize,
        to_truck_id: usize,
        unit_id: usize,
        reference: String,
        #[schema(value_type = [f64; 3])]
        pos: (f64, f64, f64),
    },
    /// A truck was emptied by consolidation and removed.
    TruckDropped { truck_id: usize },
    /// Packing finished.
    Finished { trucks: usize, skipped: usize },
}

/// Expands order lines into unit items.
///
/// Each distinct reference receives the next palette colour in order of first
/// appearance; units are numbered in expansion order.
pub fn expand_order(lines: &[OrderLine]) -> Vec<OrderUnit> {
    let mut colors: HashMap<&str, u32> = HashMap::new();
    let mut units = Vec::with_capacity(lines.iter().map(|l| l.quantity as usize).sum());

    for line in lines {
        let next_color = ITEM_COLORS[colors.len() % ITEM_COLORS.len()];
        let color = *colors
            .entry(line.item.reference.as_str())
            .or_insert(next_color);

        for _ in 0..line.quantity {
            units.push(OrderUnit {
                unit_id: units.len(),
                item: line.item.clone(),
                color,
            });
        }
    }

    units
}

/// Sorts units by packing priority: stackable first, then by reference, then by
/// descending volume. Ties keep expansion order.
pub fn sort_by_priority(units: &mut [OrderUnit]) {
    units.sort_by(|a, b| {
        b.is_stackable()
            .cmp(&a.is_stackable())
            .then_with(|| a.reference().cmp(b.reference()))
            .then_with(|| b.volume().total_cmp(&a.volume()))
    });
}

/// Order in which existing trucks are offered a unit.
///
/// Stackable units try trucks already holding their reference first; everything
/// else keeps creation order.
fn truck_visit_order(trucks: &[Truck], unit: &OrderUnit) -> Vec<usize> {
    if !unit.is_stackable() {
        return (0..trucks.len()).collect();
    }
    let (mut same, other): (Vec<usize>, Vec<usize>) =
        (0..trucks.len()).partition(|&idx| trucks[idx].holds_reference(unit.reference()));
    same.extend(other);
    same
}

/// Packs an order with the default configuration.
pub fn pack(lines: &[OrderLine], spec: TruckSpec) -> PackingResult {
    pack_with_config(lines, spec, PackingConfig::default())
}

/// Packs an order with a custom configuration.
pub fn pack_with_config(lines: &[OrderLine], spec: TruckSpec, config: PackingConfig) -> PackingResult {
    pack_with_progress(lines, spec, config, |_| {})
}

/// Packs an order and reports every step through `on_event`.
pub fn pack_with_progress(
    lines: &[OrderLine],
    spec: TruckSpec,
    config: PackingConfig,
    mut on_event: impl FnMut(&PackEvent),
) -> PackingResult {
    let mut units = expand_order(lines);
    sort_by_priority(&mut units);
    debug!(units = units.len(), lines = lines.len(), "order expanded");

    let mut trucks: Vec<Truck> = Vec::new();
    let mut skipped: Vec<SkippedUnit> = Vec::new();

    for unit in units {
        if unit.weight() > spec.max_weight + EPSILON_GENERAL {
            skip_unit(unit, SkipReason::TooHeavyForTruck, &mut skipped, &mut on_event);
            continue;
        }

        let mut target = None;
        for idx in truck_visit_order(&trucks, &unit) {
            if !trucks[idx].has_capacity_for(unit.weight()) {
                continue;
            }
            if try_place(&mut trucks[idx], &unit, &config) {
                target = Some(idx);
                break;
            }
        }

        if let Some(idx) = target {
            emit_placed(&trucks[idx], idx, unit.unit_id, &mut on_event);
            continue;
        }

        let mut truck = Truck::new(spec);
        if try_place(&mut truck, &unit, &config) {
            open_truck(&mut trucks, truck, &mut on_event);
            let idx = trucks.len() - 1;
            emit_placed(&trucks[idx], idx, unit.unit_id, &mut on_event);
            continue;
        }

        match relaxed_orientation(&unit.item, &truck, &config) {
            Some(orientation) => {
                warn!(
                    reference = %unit.reference(),
                    unit_id = unit.unit_id,
                    constraint = ?unit.item.orientation_constraint,
                    "orientation constraint cannot be honoured, placing relaxed in a new truck"
                );
                let unit_id = unit.unit_id;
                let reference = unit.reference().to_string();
                truck.commit_relaxed(unit, orientation, &config);
                open_truck(&mut trucks, truck, &mut on_event);
                let idx = trucks.len() - 1;
                on_event(&PackEvent::ItemRelaxed {
                    truck_id: idx + 1,
                    unit_id,
                    reference,
                    dims: orientation.as_tuple(),
                    total_weight: trucks[idx].total_weight(),
                });
            }
            None => {
                skip_unit(unit, SkipReason::DimensionsExceedTruck, &mut skipped, &mut on_event);
            }
        }
    }

    let trucks = consolidate(trucks, &config, &mut on_event);

    info!(
        trucks = trucks.len(),
        skipped = skipped.len(),
        "packing finished"
    );
    on_event(&PackEvent::Finished {
        trucks: trucks.len(),
        skipped: skipped.len(),
    });

    PackingResult { trucks, skipped }
}

fn open_truck(trucks: &mut Vec<Truck>, truck: Truck, on_event: &mut impl FnMut(&PackEvent)) {
    let truck_id = trucks.len() + 1;
    debug!(truck_id, "opening truck");
    on_event(&PackEvent::TruckOpened {
        truck_id,
        dims: truck.spec.dims().as_tuple(),
        max_weight: truck.spec.max_weight,
    });
    trucks.push(truck);
}

fn emit_placed(truck: &Truck, idx: usize, unit_id: usize, on_event: &mut impl FnMut(&PackEvent)) {
    if let Some(placed) = truck.find_unit(unit_id) {
        on_event(&PackEvent::ItemPlaced {
            truck_id: idx + 1,
            unit_id,
            reference: placed.reference().to_string(),
            pos: placed.position.as_tuple(),
            dims: placed.orientation.as_tuple(),
            stack_level: placed.stack_level,
            total_weight: truck.total_weight(),
        });
    }
}

fn skip_unit(
    unit: OrderUnit,
    reason: SkipReason,
    skipped: &mut Vec<SkippedUnit>,
    on_event: &mut impl FnMut(&PackEvent),
) {
    warn!(
        reference = %unit.reference(),
        unit_id = unit.unit_id,
        dims = ?unit.item.dims(),
        weight = unit.item.weight,
        reason = reason.code(),
        "item skipped"
    );
    on_event(&PackEvent::ItemSkipped {
        unit_id: unit.unit_id,
        reference: unit.reference().to_string(),
        dims: unit.item.dims(),
        weight: unit.item.weight,
        reason_code: reason.code().to_string(),
        reason_text: reason.to_string(),
    });
    skipped.push(SkippedUnit { unit, reason });
}

/// Moves units out of the last truck into earlier ones, then drops empty trucks.
///
/// Units are detached top of stack first (descending stack level, then
/// descending height). A unit that still carries another unit of the last truck
/// stays where it is. This is a single pass over the last truck only.
pub fn consolidate(
    mut trucks: Vec<Truck>,
    config: &PackingConfig,
    on_event: &mut impl FnMut(&PackEvent),
) -> Vec<Truck> {
    if trucks.len() <= 1 {
        return trucks;
    }

    let last_idx = trucks.len() - 1;
    let (earlier, rest) = trucks.split_at_mut(last_idx);
    let last = &mut rest[0];

    let mut order: Vec<(u32, f64, usize)> = last
        .placed()
        .iter()
        .map(|p| (p.stack_level, p.position.z, p.unit.unit_id))
        .collect();
    order.sort_by(|a, b| match b.0.cmp(&a.0) {
        Ordering::Equal => b.1.total_cmp(&a.1),
        other => other,
    });

    for (_, _, unit_id) in order {
        if last.carries_other_units(unit_id, config) {
            debug!(unit_id, "unit still carries others, keeping it in the last truck");
            continue;
        }
        let Some(unit) = last.find_unit(unit_id).map(|p| p.unit.clone()) else {
            continue;
        };

        for (idx, truck) in earlier.iter_mut().enumerate() {
            if !truck.has_capacity_for(unit.weight()) {
                continue;
            }
            if try_place(truck, &unit, config) {
                last.remove_unit(unit_id);
                if let Some(placed) = truck.find_unit(unit_id) {
                    on_event(&PackEvent::ItemConsolidated {
                        from_truck_id: last_idx + 1,
                        to_truck_id: idx + 1,
                        unit_id,
                        reference: placed.reference().to_string(),
                        pos: placed.position.as_tuple(),
                    });
                }
                break;
            }
        }
    }

    let mut kept = Vec::with_capacity(trucks.len());
    for (idx, truck) in trucks.into_iter().enumerate() {
        if truck.is_empty() {
            debug!(truck_id = idx + 1, "dropping empty truck");
            on_event(&PackEvent::TruckDropped { truck_id: idx + 1 });
        } else {
            kept.push(truck);
        }
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{footprint_coverage, intersects};
    use crate::model::{CatalogItem, OrientationConstraint};
    use crate::types::Vec3;

    fn truck_spec(dims: (f64, f64, f64), max_weight: f64) -> TruckSpec {
        TruckSpec::new(dims, max_weight).unwrap()
    }

    fn line(reference: &str, dims: (f64, f64, f64), weight: f64, quantity: u32) -> OrderLine {
        OrderLine::new(CatalogItem::new(reference, weight, dims).unwrap(), quantity).unwrap()
    }

    fn stackable_line(
        reference: &str,
        dims: (f64, f64, f64),
        weight: f64,
        quantity: u32,
        max_levels: Option<u32>,
    ) -> OrderLine {
        let item = CatalogItem::new(reference, weight, dims)
            .unwrap()
            .with_stacking(max_levels)
            .unwrap();
        OrderLine::new(item, quantity).unwrap()
    }

    fn unit(unit_id: usize, reference: &str, dims: (f64, f64, f64), weight: f64) -> OrderUnit {
        OrderUnit {
            unit_id,
            item: CatalogItem::new(reference, weight, dims).unwrap(),
            color: ITEM_COLORS[0],
        }
    }

    /// Checks no-overlap, bounds, capacity and support validity on every truck.
    fn assert_valid_load(result: &PackingResult, config: &PackingConfig) {
        for truck in &result.trucks {
            let placed = truck.placed();
            let bounds = truck.spec.dims();

            let weight: f64 = placed.iter().map(|p| p.unit.item.weight).sum();
            assert!(weight <= truck.spec.max_weight + EPSILON_GENERAL);
            assert!((weight - truck.total_weight()).abs() < 1e-6);

            for (i, a) in placed.iter().enumerate() {
                assert!(
                    (a.position + a.orientation.as_vec3()).fits_within(&bounds, config.overlap_epsilon),
                    "unit {} leaves the truck",
                    a.unit.unit_id
                );
                for b in placed.iter().skip(i + 1) {
                    assert!(
                        !intersects(a, b, config.overlap_epsilon),
                        "units {} and {} overlap",
                        a.unit.unit_id,
                        b.unit.unit_id
                    );
                }

                if a.position.z > config.overlap_epsilon {
                    let support = placed.iter().find(|s| {
                        (s.top_z() - a.position.z).abs() <= config.support_height_epsilon
                            && footprint_coverage(
                                a.position,
                                a.orientation.as_vec3(),
                                s.position,
                                s.orientation.as_vec3(),
                            ) >= config.min_support_ratio
                    });
                    let support = support.unwrap_or_else(|| {
                        panic!("elevated unit {} has no support", a.unit.unit_id)
                    });
                    assert!(a.unit.item.stackable && support.unit.item.stackable);
                    assert_eq!(a.reference(), support.reference());
                    assert!(a.stack_level > 0);
                } else {
                    assert_eq!(a.stack_level, 0);
                }
            }
        }
    }

    #[test]
    fn expansion_assigns_ids_and_round_robin_colors() {
        let mut lines = Vec::new();
        for i in 0..13 {
            lines.push(line(&format!("R{i:02}"), (1.0, 1.0, 1.0), 1.0, 1));
        }
        lines.push(line("R00", (1.0, 1.0, 1.0), 1.0, 2));

        let units = expand_order(&lines);
        assert_eq!(units.len(), 15);
        assert!(units.iter().enumerate().all(|(i, u)| u.unit_id == i));
        assert_eq!(units[0].color, ITEM_COLORS[0]);
        assert_eq!(units[11].color, ITEM_COLORS[11]);
        assert_eq!(units[12].color, ITEM_COLORS[0]);
        // Repeated reference keeps its colour.
        assert_eq!(units[13].color, ITEM_COLORS[0]);
        assert_eq!(units[14].color, ITEM_COLORS[0]);
    }

    #[test]
    fn priority_sort_groups_stackable_reference_and_volume() {
        let lines = vec![
            line("B", (1.0, 1.0, 1.0), 1.0, 1),
            stackable_line("Z", (1.0, 1.0, 1.0), 1.0, 1, None),
            line("A", (1.0, 1.0, 1.0), 1.0, 1),
            line("A", (2.0, 1.0, 1.0), 1.0, 1),
            stackable_line("M", (1.0, 1.0, 1.0), 1.0, 1, None),
        ];
        let mut units = expand_order(&lines);
        sort_by_priority(&mut units);

        let order: Vec<(&str, f64)> = units.iter().map(|u| (u.reference(), u.volume())).collect();
        assert_eq!(
            order,
            vec![("M", 1.0), ("Z", 1.0), ("A", 2.0), ("A", 1.0), ("B", 1.0)]
        );
    }

    #[test]
    fn stackable_units_visit_trucks_with_their_reference_first() {
        let config = PackingConfig::default();
        let spec = truck_spec((2.0, 2.0, 2.0), 100.0);
        let mut first = Truck::new(spec);
        let mut second = Truck::new(spec);
        assert!(try_place(&mut first, &unit(0, "A", (1.0, 1.0, 1.0), 1.0), &config));
        assert!(try_place(&mut second, &unit(1, "B", (1.0, 1.0, 1.0), 1.0), &config));
        let trucks = vec![first, second];

        let mut stackable_b = unit(2, "B", (1.0, 1.0, 1.0), 1.0);
        stackable_b.item.stackable = true;
        assert_eq!(truck_visit_order(&trucks, &stackable_b), vec![1, 0]);

        let plain_b = unit(3, "B", (1.0, 1.0, 1.0), 1.0);
        assert_eq!(truck_visit_order(&trucks, &plain_b), vec![0, 1]);
    }

    #[test]
    fn scenario_single_item_at_origin() {
        let result = pack(
            &[line("X", (1.0, 1.0, 1.0), 10.0, 1)],
            truck_spec((2.0, 2.0, 2.0), 1000.0),
        );

        assert!(result.is_complete());
        assert_eq!(result.truck_count(), 1);
        let placed = &result.trucks[0].placed()[0];
        assert_eq!(placed.position, Vec3::zero());
        assert_eq!(placed.stack_level, 0);
        assert!(!placed.relaxed);
    }

    #[test]
    fn scenario_stackable_units_form_two_level_stacks() {
        let config = PackingConfig::default();
        let lines = vec![
            stackable_line("X", (1.0, 1.0, 1.0), 10.0, 2, Some(2)),
            stackable_line("X", (1.0, 1.0, 1.0), 10.0, 2, Some(2)),
        ];
        let result = pack(&lines, truck_spec((2.0, 2.0, 2.5), 1000.0));

        assert_valid_load(&result, &config);
        assert_eq!(result.truck_count(), 1);
        let placed = result.trucks[0].placed();
        let positions: Vec<Vec3> = placed.iter().map(|p| p.position).collect();
        assert_eq!(
            positions,
            vec![
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(0.0, 0.0, 1.0),
                Vec3::new(1.0, 0.0, 0.0),
                Vec3::new(1.0, 0.0, 1.0),
            ]
        );
        let levels: Vec<u32> = placed.iter().map(|p| p.stack_level).collect();
        assert_eq!(levels, vec![0, 1, 0, 1]);
    }

    #[test]
    fn scenario_weight_forces_second_truck() {
        let result = pack(
            &[line("HEAVY", (1.0, 1.0, 1.0), 20000.0, 2)],
            truck_spec((13.0, 2.4, 2.7), 24000.0),
        );

        assert!(result.is_complete());
        assert_eq!(result.truck_count(), 2);
        for truck in &result.trucks {
            assert_eq!(truck.item_count(), 1);
            assert!(truck.total_weight() <= truck.spec.max_weight);
        }
    }

    #[test]
    fn scenario_oversized_item_is_reported_and_rest_packed() {
        let lines = vec![
            line("OK", (1.0, 1.0, 1.0), 10.0, 3),
            line("GIANT", (3.0, 3.0, 3.0), 10.0, 1),
        ];
        let result = pack(&lines, truck_spec((2.0, 2.0, 2.0), 1000.0));

        assert_eq!(result.placed_count(), 3);
        assert_eq!(result.skipped_count(), 1);
        let skipped = &result.skipped[0];
        assert_eq!(skipped.unit.reference(), "GIANT");
        assert_eq!(skipped.unit.item.dims(), (3.0, 3.0, 3.0));
        assert_eq!(skipped.reason, SkipReason::DimensionsExceedTruck);
        assert!(!result.is_complete());
    }

    #[test]
    fn unit_heavier_than_truck_is_reported() {
        let lines = vec![line("ANVIL", (1.0, 1.0, 1.0), 30000.0, 1)];
        let result = pack(&lines, truck_spec((13.0, 2.4, 2.7), 24000.0));

        assert!(result.trucks.is_empty());
        assert_eq!(result.skipped[0].reason, SkipReason::TooHeavyForTruck);
        assert_eq!(result.skipped[0].reason.code(), "too_heavy_for_truck");
    }

    #[test]
    fn scenario_consolidation_merges_last_truck_into_first() {
        let config = PackingConfig::default();
        let spec = truck_spec((2.0, 2.0, 2.0), 100.0);

        let mut first = Truck::new(spec);
        assert!(try_place(&mut first, &unit(0, "BIG", (1.0, 2.0, 2.0), 20.0), &config));
        let mut second = Truck::new(spec);
        assert!(try_place(&mut second, &unit(1, "HEAVY", (1.0, 1.0, 1.0), 95.0), &config));
        let mut third = Truck::new(spec);
        assert!(try_place(&mut third, &unit(2, "LIGHT", (1.0, 1.0, 1.0), 1.0), &config));

        let mut events = Vec::new();
        let trucks = consolidate(vec![first, second, third], &config, &mut |e: &PackEvent| {
            events.push(e.clone())
        });

        assert_eq!(trucks.len(), 2);
        assert_eq!(trucks[0].item_count(), 2);
        let moved = trucks[0].find_unit(2).expect("light unit moved into first truck");
        assert_eq!(moved.position, Vec3::new(1.0, 0.0, 0.0));
        assert!((trucks[0].total_weight() - 21.0).abs() < EPSILON_GENERAL);
        assert!(events.iter().any(|e| matches!(
            e,
            PackEvent::ItemConsolidated { from_truck_id: 3, to_truck_id: 1, unit_id: 2, .. }
        )));
        assert!(events.iter().any(|e| matches!(e, PackEvent::TruckDropped { truck_id: 3 })));
    }

    #[test]
    fn consolidation_respects_weight_limit() {
        let config = PackingConfig::default();
        let spec = truck_spec((2.0, 2.0, 2.0), 100.0);

        let mut first = Truck::new(spec);
        assert!(try_place(&mut first, &unit(0, "A", (1.0, 1.0, 1.0), 90.0), &config));
        let mut last = Truck::new(spec);
        assert!(try_place(&mut last, &unit(1, "B", (1.0, 1.0, 1.0), 20.0), &config));

        let trucks = consolidate(vec![first, last], &config, &mut |_: &PackEvent| {});
        assert_eq!(trucks.len(), 2);
        assert_eq!(trucks[1].item_count(), 1);
    }

    #[test]
    fn consolidation_keeps_supports_of_units_that_cannot_move() {
        let config = PackingConfig::default();
        let light = CatalogItem::new("S", 1.0, (1.0, 1.0, 1.0))
            .unwrap()
            .with_stacking(Some(3))
            .unwrap();
        let heavy = CatalogItem::new("S", 50.0, (1.0, 1.0, 1.0))
            .unwrap()
            .with_stacking(Some(3))
            .unwrap();

        // First truck has floor room for one more unit but only 9 kg of capacity left.
        let mut first = Truck::new(truck_spec((2.0, 1.0, 1.0), 10.0));
        let filler = CatalogItem::new("F", 1.0, (1.0, 1.0, 1.0)).unwrap();
        assert!(try_place(
            &mut first,
            &OrderUnit { unit_id: 0, item: filler, color: 0 },
            &config
        ));

        let mut last = Truck::new(truck_spec((1.0, 1.0, 3.0), 1000.0));
        let bottom = OrderUnit { unit_id: 1, item: light, color: 0 };
        let top = OrderUnit { unit_id: 2, item: heavy, color: 0 };
        assert!(try_place(&mut last, &bottom, &config));
        assert!(try_place(&mut last, &top, &config));
        assert_eq!(last.placed()[1].stack_level, 1);

        // The heavy top unit cannot move; the light bottom unit would fit at (1,0,0)
        // but must stay because it still carries the top one.
        let trucks = consolidate(vec![first, last], &config, &mut |_: &PackEvent| {});
        assert_eq!(trucks.len(), 2);
        assert_eq!(trucks[1].item_count(), 2);
        assert_eq!(trucks[0].item_count(), 1);
    }

    #[test]
    fn single_truck_is_not_consolidated() {
        let config = PackingConfig::default();
        let mut truck = Truck::new(truck_spec((2.0, 2.0, 2.0), 100.0));
        assert!(try_place(&mut truck, &unit(0, "A", (1.0, 1.0, 1.0), 1.0), &config));
        let trucks = consolidate(vec![truck], &config, &mut |_: &PackEvent| {});
        assert_eq!(trucks.len(), 1);
    }

    #[test]
    fn relaxation_fallback_ignores_orientation_constraint() {
        let item = CatalogItem::new("ROD", 5.0, (3.0, 0.5, 0.5))
            .unwrap()
            .with_orientation(OrientationConstraint::AlongLength);
        let lines = vec![OrderLine::new(item, 1).unwrap()];

        let mut events = Vec::new();
        let result = pack_with_progress(
            &lines,
            truck_spec((2.0, 3.0, 2.0), 100.0),
            PackingConfig::default(),
            |e| events.push(e.clone()),
        );

        assert!(result.is_complete());
        let placed = &result.trucks[0].placed()[0];
        assert!(placed.relaxed);
        assert_eq!(placed.position, Vec3::zero());
        assert_eq!(placed.orientation.as_tuple(), (0.5, 3.0, 0.5));
        assert_eq!(placed.stack_level, 0);
        assert!(events.iter().any(|e| matches!(e, PackEvent::ItemRelaxed { .. })));
    }

    #[test]
    fn constrained_items_keep_their_axis() {
        let config = PackingConfig::default();
        let item = CatalogItem::new("PANEL", 5.0, (2.0, 1.0, 0.5))
            .unwrap()
            .with_orientation(OrientationConstraint::AlongWidth);
        let lines = vec![OrderLine::new(item, 4).unwrap()];
        let result = pack_with_config(&lines, truck_spec((4.0, 2.0, 2.0), 1000.0), config);

        assert_valid_load(&result, &config);
        assert!(result.is_complete());
        for (_, placed) in result.placements() {
            assert!(!placed.relaxed);
            assert!((placed.orientation.width - 2.0).abs() < config.orientation_epsilon);
        }
    }

    #[test]
    fn mixed_order_respects_all_load_invariants() {
        let config = PackingConfig::default();
        let lines = vec![
            stackable_line("PLT-030", (1.2, 0.8, 1.0), 400.0, 14, Some(2)),
            stackable_line("BOX-040", (0.6, 0.4, 0.4), 25.0, 30, Some(3)),
            line("CYL-020", (1.5, 0.5, 0.5), 120.0, 9),
            line("BLK-010", (0.9, 0.9, 0.9), 1800.0, 8),
            {
                let item = CatalogItem::new("PNL-001", 60.0, (2.4, 1.2, 0.1))
                    .unwrap()
                    .with_orientation(OrientationConstraint::AlongWidth);
                OrderLine::new(item, 5).unwrap()
            },
        ];
        let spec = truck_spec((6.0, 2.4, 2.7), 12000.0);
        let result = pack_with_config(&lines, spec, config);

        assert_valid_load(&result, &config);
        let ordered: u32 = lines.iter().map(|l| l.quantity).sum();
        assert_eq!(
            result.placed_count() + result.skipped_count(),
            ordered as usize
        );
        assert!(result.is_complete());

        let mut ids: Vec<usize> = result.placements().map(|(_, p)| p.unit.unit_id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), ordered as usize);
    }

    #[test]
    fn packing_is_deterministic() {
        let lines = vec![
            stackable_line("PLT-030", (1.2, 0.8, 1.0), 400.0, 11, None),
            line("CYL-020", (1.5, 0.5, 0.5), 120.0, 7),
            line("BLK-010", (0.9, 0.9, 0.9), 1800.0, 6),
        ];
        let spec = truck_spec((4.0, 2.4, 2.7), 8000.0);

        let first = pack(&lines, spec);
        let second = pack(&lines, spec);
        assert_eq!(format!("{first:?}"), format!("{second:?}"));
    }

    #[test]
    fn empty_order_yields_no_trucks() {
        let mut events = Vec::new();
        let result = pack_with_progress(
            &[],
            TruckSpec::default(),
            PackingConfig::default(),
            |e| events.push(e.clone()),
        );
        assert!(result.trucks.is_empty());
        assert!(result.is_complete());
        assert!(matches!(
            events.as_slice(),
            [PackEvent::Finished { trucks: 0, skipped: 0 }]
        ));
    }

    #[test]
    fn progress_reports_every_placement() {
        let lines = vec![line("X", (1.0, 1.0, 1.0), 10.0, 5)];
        let mut placed_events = 0;
        let mut opened = 0;
        let result = pack_with_progress(
            &lines,
            truck_spec((2.0, 2.0, 1.0), 1000.0),
            PackingConfig::default(),
            |e| match e {
                PackEvent::ItemPlaced { .. } => placed_events += 1,
                PackEvent::TruckOpened { .. } => opened += 1,
                _ => {}
            },
        );

        assert_eq!(placed_events, 5);
        assert_eq!(opened, 2);
        assert_eq!(result.truck_count(), 2);
    }

    #[test]
    fn builder_overrides_defaults() {
        let config = PackingConfig::builder()
            .overlap_epsilon(0.02)
            .support_height_epsilon(0.03)
            .orientation_epsilon(0.002)
            .min_support_ratio(0.5)
            .default_max_stack_levels(4)
            .build();

        assert_eq!(config.overlap_epsilon, 0.02);
        assert_eq!(config.support_height_epsilon, 0.03);
        assert_eq!(config.orientation_epsilon, 0.002);
        assert_eq!(config.min_support_ratio, 0.5);
        assert_eq!(config.default_max_stack_levels, 4);
        assert_eq!(PackingConfig::default().min_support_ratio, 0.8);
    }
}
