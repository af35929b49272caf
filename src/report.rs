//! Load-plan statistics for packed trucks.
//!
//! Everything here is derived from a finished `PackingResult`; nothing feeds back
//! into packing decisions.

use std::collections::BTreeMap;

use serde::Serialize;
use utoipa::ToSchema;

use crate::model::Truck;
use crate::optimizer::PackingResult;
use crate::types::Dimensional;

/// One reference within a truck's load plan.
#[derive(Clone, Debug, PartialEq, Serialize, ToSchema)]
pub struct LoadPlanEntry {
    pub reference: String,
    pub name: Option<String>,
    pub quantity: usize,
    pub unit_weight: f64,
    pub unit_volume: f64,
    pub total_weight: f64,
    pub total_volume: f64,
    /// Highest stack level of the reference plus one.
    pub stacked_levels: u32,
}

/// Statistics of a single truck.
#[derive(Clone, Debug, PartialEq, Serialize, ToSchema)]
pub struct TruckSummary {
    pub item_count: usize,
    pub reference_count: usize,
    pub total_weight: f64,
    /// Weight in percent of the truck's maximum.
    pub weight_percent: f64,
    pub used_volume: f64,
    /// Used volume in percent of the truck volume.
    pub fill_percent: f64,
    /// Sorted by reference.
    pub load_plan: Vec<LoadPlanEntry>,
}

impl TruckSummary {
    pub fn from_truck(truck: &Truck) -> Self {
        let mut plan: BTreeMap<&str, LoadPlanEntry> = BTreeMap::new();

        for placed in truck.placed() {
            let item = &placed.unit.item;
            let unit_volume = item.volume();
            let entry = plan
                .entry(item.reference.as_str())
                .or_insert_with(|| LoadPlanEntry {
                    reference: item.reference.clone(),
                    name: item.name.clone(),
                    quantity: 0,
                    unit_weight: item.weight,
                    unit_volume,
                    total_weight: 0.0,
                    total_volume: 0.0,
                    stacked_levels: 0,
                });
            entry.quantity += 1;
            entry.total_weight += item.weight;
            entry.total_volume += unit_volume;
            entry.stacked_levels = entry.stacked_levels.max(placed.stack_level + 1);
        }

        let total_weight = truck.total_weight();
        let weight_percent = if truck.spec.max_weight > 0.0 {
            total_weight / truck.spec.max_weight * 100.0
        } else {
            0.0
        };

        Self {
            item_count: truck.item_count(),
            reference_count: plan.len(),
            total_weight,
            weight_percent,
            used_volume: truck.used_volume(),
            fill_percent: truck.utilization_percent(),
            load_plan: plan.into_values().collect(),
        }
    }
}

/// Statistics across all trucks of a run.
#[derive(Clone, Debug, PartialEq, Serialize, ToSchema)]
pub struct PackingSummary {
    pub truck_count: usize,
    pub total_items: usize,
    pub total_weight: f64,
    pub total_volume: f64,
    /// Used volume over the combined volume of all trucks, in percent.
    pub average_fill_percent: f64,
    pub skipped_count: usize,
}

impl PackingSummary {
    pub fn from_result(result: &PackingResult) -> Self {
        let total_volume: f64 = result.trucks.iter().map(Truck::used_volume).sum();
        let capacity: f64 = result.trucks.iter().map(|t| t.spec.volume()).sum();
        let average_fill_percent = if capacity > 0.0 {
            total_volume / capacity * 100.0
        } else {
            0.0
        };

        Self {
            truck_count: result.truck_count(),
            total_items: result.placed_count(),
            total_weight: result.total_packed_weight(),
            total_volume,
            average_fill_percent,
            skipped_count: result.skipped_count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CatalogItem, OrderLine, TruckSpec};
    use crate::optimizer::pack;

    const TOLERANCE: f64 = 1e-9;

    fn spec() -> TruckSpec {
        TruckSpec::new((2.0, 2.0, 2.5), 1000.0).unwrap()
    }

    #[test]
    fn truck_summary_groups_by_reference() {
        let stackable = CatalogItem::new("B-STACK", 10.0, (1.0, 1.0, 1.0))
            .unwrap()
            .with_name("Crate")
            .with_stacking(Some(2))
            .unwrap();
        let plain = CatalogItem::new("A-PLAIN", 50.0, (1.0, 0.5, 0.5)).unwrap();
        let lines = vec![
            OrderLine::new(stackable, 2).unwrap(),
            OrderLine::new(plain, 1).unwrap(),
        ];

        let result = pack(&lines, spec());
        assert_eq!(result.truck_count(), 1);
        let summary = TruckSummary::from_truck(&result.trucks[0]);

        assert_eq!(summary.item_count, 3);
        assert_eq!(summary.reference_count, 2);
        assert!((summary.total_weight - 70.0).abs() < TOLERANCE);
        assert!((summary.weight_percent - 7.0).abs() < TOLERANCE);
        assert!((summary.used_volume - 2.25).abs() < TOLERANCE);
        assert!((summary.fill_percent - 22.5).abs() < TOLERANCE);

        let refs: Vec<&str> = summary.load_plan.iter().map(|e| e.reference.as_str()).collect();
        assert_eq!(refs, vec!["A-PLAIN", "B-STACK"]);

        let crates = &summary.load_plan[1];
        assert_eq!(crates.name.as_deref(), Some("Crate"));
        assert_eq!(crates.quantity, 2);
        assert_eq!(crates.stacked_levels, 2);
        assert!((crates.total_weight - 20.0).abs() < TOLERANCE);
        assert!((crates.total_volume - 2.0).abs() < TOLERANCE);
        assert_eq!(summary.load_plan[0].stacked_levels, 1);
    }

    #[test]
    fn packing_summary_aggregates_trucks_and_skips() {
        let lines = vec![
            OrderLine::new(CatalogItem::new("HEAVY", 600.0, (1.0, 1.0, 1.0)).unwrap(), 2).unwrap(),
            OrderLine::new(CatalogItem::new("HUGE", 1.0, (3.0, 3.0, 3.0)).unwrap(), 1).unwrap(),
        ];

        let result = pack(&lines, spec());
        let summary = PackingSummary::from_result(&result);

        assert_eq!(summary.truck_count, 2);
        assert_eq!(summary.total_items, 2);
        assert_eq!(summary.skipped_count, 1);
        assert!((summary.total_weight - 1200.0).abs() < TOLERANCE);
        assert!((summary.total_volume - 2.0).abs() < TOLERANCE);
        // 2 m³ over two 10 m³ trucks.
        assert!((summary.average_fill_percent - 10.0).abs() < TOLERANCE);
    }

    #[test]
    fn empty_result_has_zero_fill() {
        let result = pack(&[], spec());
        let summary = PackingSummary::from_result(&result);
        assert_eq!(summary.truck_count, 0);
        assert_eq!(summary.average_fill_percent, 0.0);
    }
}
