//! Truck load planning.
//!
//! Distributes an order of cuboid items over as few fixed-size trucks as a
//! deterministic greedy heuristic finds, honouring weight limits, support,
//! same-reference stacking limits and orientation constraints.
//!
//! ```
//! use truck_packer::model::{CatalogItem, OrderLine, TruckSpec};
//! use truck_packer::optimizer::pack;
//!
//! let pallet = CatalogItem::new("PLT-030", 450.0, (1.2, 0.8, 1.5))
//!     .unwrap()
//!     .with_stacking(Some(2))
//!     .unwrap();
//! let order = vec![OrderLine::new(pallet, 10).unwrap()];
//!
//! let result = pack(&order, TruckSpec::default());
//! assert!(result.is_complete());
//! assert_eq!(result.placed_count(), 10);
//! ```

pub mod api;
pub mod config;
pub mod extreme_points;
pub mod geometry;
pub mod model;
pub mod optimizer;
pub mod placement;
pub mod report;
pub mod types;
