//! Data models for truck load planning.
//!
//! The records grow progressively richer as an order moves through the engine:
//! - `CatalogItem`: what an article is (reference, weight, extents, stacking rules)
//! - `OrderLine`: a catalog item with a quantity
//! - `OrderUnit`: one physical instance of an order line, ready for packing
//! - `PlacedUnit`: an order unit bound to a position, orientation and stack level
//!
//! `Truck` owns its placed units together with the candidate points used by the
//! placement search.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::extreme_points::CandidatePoints;
use crate::geometry::overlap_1d;
use crate::optimizer::PackingConfig;
use crate::types::{Dimensional, EPSILON_GENERAL, Vec3, Weighted};

/// Recurring visualization colours, assigned round-robin per reference.
pub const ITEM_COLORS: [u32; 12] = [
    0x00f0ff, 0x7b2fff, 0xff006e, 0x00ff88, 0xffaa00, 0xff4444, 0x44aaff, 0xff44ff, 0x44ffaa,
    0xffff44, 0x88aaff, 0xff8844,
];

/// Validation error for catalog, order and truck data.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Invalid dimension: {0}")]
    InvalidDimension(String),
    #[error("Invalid weight: {0}")]
    InvalidWeight(String),
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(String),
    #[error("Invalid reference: {0}")]
    InvalidReference(String),
    #[error("Invalid stack limit: {0}")]
    InvalidStackLimit(String),
}

fn validate_dimension(value: f64, name: &str) -> Result<(), ValidationError> {
    if value <= 0.0 || !value.is_finite() {
        return Err(ValidationError::InvalidDimension(format!(
            "{} must be positive, got: {}",
            name, value
        )));
    }
    Ok(())
}

fn validate_weight_value(value: f64) -> Result<(), ValidationError> {
    if value <= 0.0 || !value.is_finite() {
        return Err(ValidationError::InvalidWeight(format!(
            "Weight must be positive, got: {}",
            value
        )));
    }
    Ok(())
}

fn validate_extents(dims: (f64, f64, f64), prefix: &str) -> Result<(), ValidationError> {
    validate_dimension(dims.0, &format!("{prefix}length"))?;
    validate_dimension(dims.1, &format!("{prefix}width"))?;
    validate_dimension(dims.2, &format!("{prefix}height"))?;
    Ok(())
}

/// Forces the item's raw length onto a particular truck axis.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum OrientationConstraint {
    /// Any of the six axis permutations.
    #[default]
    Free,
    /// The raw length must run along the truck length.
    #[serde(rename = "length")]
    AlongLength,
    /// The raw length must run across the truck width.
    #[serde(rename = "width")]
    AlongWidth,
}

/// An article as described by the catalog.
#[derive(Clone, Debug, PartialEq)]
pub struct CatalogItem {
    pub reference: String,
    pub name: Option<String>,
    pub weight: f64,
    pub length: f64,
    pub width: f64,
    pub height: f64,
    pub stackable: bool,
    /// Only meaningful when `stackable` is set.
    pub max_stack_levels: Option<u32>,
    pub orientation_constraint: OrientationConstraint,
}

impl CatalogItem {
    /// Creates a non-stackable, freely orientable item with validation.
    ///
    /// # Examples
    /// ```
    /// use truck_packer::model::CatalogItem;
    ///
    /// assert!(CatalogItem::new("PLT-030", 450.0, (1.2, 0.8, 1.5)).is_ok());
    /// assert!(CatalogItem::new("PLT-030", 450.0, (-1.2, 0.8, 1.5)).is_err());
    /// assert!(CatalogItem::new("  ", 450.0, (1.2, 0.8, 1.5)).is_err());
    /// ```
    pub fn new(
        reference: impl Into<String>,
        weight: f64,
        dims: (f64, f64, f64),
    ) -> Result<Self, ValidationError> {
        let reference = reference.into();
        if reference.trim().is_empty() {
            return Err(ValidationError::InvalidReference(
                "Reference must not be empty".to_string(),
            ));
        }
        validate_extents(dims, "")?;
        validate_weight_value(weight)?;

        Ok(Self {
            reference,
            name: None,
            weight,
            length: dims.0,
            width: dims.1,
            height: dims.2,
            stackable: false,
            max_stack_levels: None,
            orientation_constraint: OrientationConstraint::Free,
        })
    }

    /// Attaches a display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Marks the item as stackable on itself, optionally limiting the stack height.
    pub fn with_stacking(mut self, max_stack_levels: Option<u32>) -> Result<Self, ValidationError> {
        if let Some(levels) = max_stack_levels {
            if levels == 0 {
                return Err(ValidationError::InvalidStackLimit(format!(
                    "Maximum stack levels of {} must be at least 1",
                    self.reference
                )));
            }
        }
        self.stackable = true;
        self.max_stack_levels = max_stack_levels;
        Ok(self)
    }

    /// Sets the orientation constraint.
    pub fn with_orientation(mut self, constraint: OrientationConstraint) -> Self {
        self.orientation_constraint = constraint;
        self
    }

    /// Raw extents as (length, width, height).
    #[inline]
    pub fn dims(&self) -> (f64, f64, f64) {
        (self.length, self.width, self.height)
    }
}

impl Dimensional for CatalogItem {
    fn dimensions(&self) -> Vec3 {
        Vec3::from_tuple(self.dims())
    }
}

impl Weighted for CatalogItem {
    fn weight(&self) -> f64 {
        self.weight
    }
}

/// A catalog item ordered `quantity` times.
#[derive(Clone, Debug, PartialEq)]
pub struct OrderLine {
    pub item: CatalogItem,
    pub quantity: u32,
}

impl OrderLine {
    /// Creates an order line; the quantity must be at least 1.
    pub fn new(item: CatalogItem, quantity: u32) -> Result<Self, ValidationError> {
        if quantity == 0 {
            return Err(ValidationError::InvalidQuantity(format!(
                "Quantity of {} must be at least 1",
                item.reference
            )));
        }
        Ok(Self { item, quantity })
    }
}

/// One physical instance of an order line.
#[derive(Clone, Debug, PartialEq)]
pub struct OrderUnit {
    /// Sequential id in expansion order.
    pub unit_id: usize,
    pub item: CatalogItem,
    /// Visualization colour, carried through untouched.
    pub color: u32,
}

impl OrderUnit {
    #[inline]
    pub fn reference(&self) -> &str {
        &self.item.reference
    }

    #[inline]
    pub fn is_stackable(&self) -> bool {
        self.item.stackable
    }
}

impl Dimensional for OrderUnit {
    fn dimensions(&self) -> Vec3 {
        self.item.dimensions()
    }
}

impl Weighted for OrderUnit {
    fn weight(&self) -> f64 {
        self.item.weight
    }
}

/// Raw item extents assigned to the truck axes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Orientation {
    /// Extent along the truck length (x).
    pub length: f64,
    /// Extent across the truck width (y).
    pub width: f64,
    /// Extent along the height (z).
    pub height: f64,
}

impl Orientation {
    pub const fn new(length: f64, width: f64, height: f64) -> Self {
        Self {
            length,
            width,
            height,
        }
    }

    /// The six axis permutations of raw extents, in search order.
    pub fn permutations(dims: (f64, f64, f64)) -> [Orientation; 6] {
        let (l, w, h) = dims;
        [
            Self::new(l, w, h),
            Self::new(w, l, h),
            Self::new(l, h, w),
            Self::new(h, w, l),
            Self::new(w, h, l),
            Self::new(h, l, w),
        ]
    }

    #[inline]
    pub fn as_vec3(&self) -> Vec3 {
        Vec3::new(self.length, self.width, self.height)
    }

    #[inline]
    pub fn as_tuple(&self) -> (f64, f64, f64) {
        (self.length, self.width, self.height)
    }
}

/// An order unit committed to a truck.
#[derive(Clone, Debug, PartialEq)]
pub struct PlacedUnit {
    pub unit: OrderUnit,
    pub orientation: Orientation,
    /// Anchor of the lower corner nearest the truck origin.
    pub position: Vec3,
    /// 0 on the floor, N on top of N units of the same reference.
    pub stack_level: u32,
    /// Placed by the relaxation fallback, ignoring the orientation constraint.
    pub relaxed: bool,
}

impl PlacedUnit {
    #[inline]
    pub fn reference(&self) -> &str {
        self.unit.reference()
    }

    /// Z coordinate of the top face.
    #[inline]
    pub fn top_z(&self) -> f64 {
        self.position.z + self.orientation.height
    }

    /// Checks whether `other` sits on this unit's top face with some footprint contact.
    pub fn carries(&self, other: &PlacedUnit, height_tolerance: f64) -> bool {
        if (other.position.z - self.top_z()).abs() > height_tolerance {
            return false;
        }
        let over_x = overlap_1d(
            self.position.x,
            self.position.x + self.orientation.length,
            other.position.x,
            other.position.x + other.orientation.length,
        );
        let over_y = overlap_1d(
            self.position.y,
            self.position.y + self.orientation.width,
            other.position.y,
            other.position.y + other.orientation.width,
        );
        over_x * over_y > EPSILON_GENERAL
    }
}

impl Dimensional for PlacedUnit {
    fn dimensions(&self) -> Vec3 {
        self.orientation.as_vec3()
    }
}

impl Weighted for PlacedUnit {
    fn weight(&self) -> f64 {
        self.unit.item.weight
    }
}

/// Fixed truck type used for every truck of a run.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, ToSchema)]
pub struct TruckSpec {
    pub length: f64,
    pub width: f64,
    pub height: f64,
    pub max_weight: f64,
}

impl TruckSpec {
    pub const DEFAULT_LENGTH: f64 = 13.0;
    pub const DEFAULT_WIDTH: f64 = 2.4;
    pub const DEFAULT_HEIGHT: f64 = 2.7;
    pub const DEFAULT_MAX_WEIGHT: f64 = 24000.0;

    /// Creates a truck type after validating the parameters.
    pub fn new(dims: (f64, f64, f64), max_weight: f64) -> Result<Self, ValidationError> {
        validate_extents(dims, "Truck ")?;
        validate_weight_value(max_weight)?;
        Ok(Self {
            length: dims.0,
            width: dims.1,
            height: dims.2,
            max_weight,
        })
    }

    #[inline]
    pub fn dims(&self) -> Vec3 {
        Vec3::new(self.length, self.width, self.height)
    }

    pub fn volume(&self) -> f64 {
        self.dims().volume()
    }
}

impl Default for TruckSpec {
    fn default() -> Self {
        Self {
            length: Self::DEFAULT_LENGTH,
            width: Self::DEFAULT_WIDTH,
            height: Self::DEFAULT_HEIGHT,
            max_weight: Self::DEFAULT_MAX_WEIGHT,
        }
    }
}

impl Dimensional for TruckSpec {
    fn dimensions(&self) -> Vec3 {
        self.dims()
    }
}

/// Where and how a unit goes into a truck.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Placement {
    pub position: Vec3,
    pub orientation: Orientation,
    pub stack_level: u32,
}

/// A truck being loaded.
#[derive(Clone, Debug)]
pub struct Truck {
    pub spec: TruckSpec,
    placed: Vec<PlacedUnit>,
    current_weight: f64,
    points: CandidatePoints,
}

impl Truck {
    /// Creates an empty truck whose only candidate point is the origin.
    pub fn new(spec: TruckSpec) -> Self {
        Self {
            spec,
            placed: Vec::new(),
            current_weight: 0.0,
            points: CandidatePoints::new(),
        }
    }

    /// Placed units in placement order.
    pub fn placed(&self) -> &[PlacedUnit] {
        &self.placed
    }

    pub fn candidate_points(&self) -> &CandidatePoints {
        &self.points
    }

    pub fn is_empty(&self) -> bool {
        self.placed.is_empty()
    }

    pub fn item_count(&self) -> usize {
        self.placed.len()
    }

    /// Running weight total.
    pub fn total_weight(&self) -> f64 {
        self.current_weight
    }

    pub fn remaining_weight(&self) -> f64 {
        self.spec.max_weight - self.current_weight
    }

    /// Checks whether adding `weight` keeps the truck within its limit.
    pub fn has_capacity_for(&self, weight: f64) -> bool {
        self.current_weight + weight <= self.spec.max_weight + EPSILON_GENERAL
    }

    /// Checks whether a unit of `reference` is already loaded.
    pub fn holds_reference(&self, reference: &str) -> bool {
        self.placed.iter().any(|p| p.reference() == reference)
    }

    /// Sum of the volumes of all placed units.
    pub fn used_volume(&self) -> f64 {
        self.placed.iter().map(|p| p.unit.volume()).sum()
    }

    /// Volume usage in percent (0.0 to 100.0).
    pub fn utilization_percent(&self) -> f64 {
        let total = self.spec.volume();
        if total <= 0.0 {
            return 0.0;
        }
        (self.used_volume() / total) * 100.0
    }

    /// Commits a unit at a placement found by the search and refreshes the candidate points.
    pub fn commit(&mut self, unit: OrderUnit, placement: Placement, config: &PackingConfig) {
        self.push_placed(
            PlacedUnit {
                unit,
                orientation: placement.orientation,
                position: placement.position,
                stack_level: placement.stack_level,
                relaxed: false,
            },
            config,
        );
    }

    /// Puts a unit at the origin of an empty truck, bypassing the orientation constraint.
    pub(crate) fn commit_relaxed(
        &mut self,
        unit: OrderUnit,
        orientation: Orientation,
        config: &PackingConfig,
    ) {
        debug_assert!(self.is_empty(), "relaxed placement requires an empty truck");
        self.push_placed(
            PlacedUnit {
                unit,
                orientation,
                position: Vec3::zero(),
                stack_level: 0,
                relaxed: true,
            },
            config,
        );
    }

    fn push_placed(&mut self, placed: PlacedUnit, config: &PackingConfig) {
        let anchor = placed.position;
        let extents = placed.orientation.as_vec3();
        self.current_weight += placed.unit.item.weight;
        self.placed.push(placed);
        self.points
            .record_placement(anchor, extents, self.spec.dims(), &self.placed, config);
    }

    /// Looks up a placed unit by id.
    pub fn find_unit(&self, unit_id: usize) -> Option<&PlacedUnit> {
        self.placed.iter().find(|p| p.unit.unit_id == unit_id)
    }

    /// Checks whether any other placed unit rests on the given one.
    pub fn carries_other_units(&self, unit_id: usize, config: &PackingConfig) -> bool {
        let Some(base) = self.find_unit(unit_id) else {
            return false;
        };
        self.placed.iter().any(|other| {
            other.unit.unit_id != unit_id && base.carries(other, config.support_height_epsilon)
        })
    }

    /// Removes a unit and deducts its weight. Candidate points are left untouched.
    pub fn remove_unit(&mut self, unit_id: usize) -> Option<PlacedUnit> {
        let idx = self.placed.iter().position(|p| p.unit.unit_id == unit_id)?;
        let removed = self.placed.remove(idx);
        self.current_weight -= removed.unit.item.weight;
        Some(removed)
    }
}
