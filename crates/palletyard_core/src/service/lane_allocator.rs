//! Truck-to-lane resolution.
//!
//! # Responsibility
//! - Map a manifest truck key to a physical lane of the current layout.
//!
//! # Invariants
//! - Resolution is derived from layout + occupancy only; no binding is
//!   stored separately, so it cannot drift from the assignments.
//! - A truck that already has pallets on a lane keeps resolving to it until
//!   it is delivered.
//! - When every lane is occupied the lowest lane is returned anyway. This is
//!   an oversubscription fallback, not a reservation.

use crate::layout::catalog::LayoutCatalog;
use crate::model::scan::{AssignmentIndex, TruckKey};
use crate::model::slot::Lane;
use crate::service::slot_engine::PlacementError;
use std::collections::{BTreeMap, BTreeSet};

/// Which trucks currently hold pallets on which lanes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LaneOccupancy {
    by_lane: BTreeMap<Lane, BTreeSet<TruckKey>>,
}

impl LaneOccupancy {
    /// Derives occupancy from the assignment index.
    pub fn from_assignments(index: &AssignmentIndex) -> Self {
        let mut by_lane: BTreeMap<Lane, BTreeSet<TruckKey>> = BTreeMap::new();
        for assignment in index.values().flatten() {
            by_lane
                .entry(assignment.lane())
                .or_default()
                .insert(assignment.truck.clone());
        }
        Self { by_lane }
    }

    pub fn is_occupied(&self, lane: Lane) -> bool {
        self.by_lane.get(&lane).is_some_and(|trucks| !trucks.is_empty())
    }

    /// Lanes holding at least one pallet of `truck`, ascending.
    pub fn lanes_of(&self, truck: &TruckKey) -> Vec<Lane> {
        self.by_lane
            .iter()
            .filter(|(_, trucks)| trucks.contains(truck))
            .map(|(&lane, _)| lane)
            .collect()
    }

    /// Lane is free, or only `truck` uses it.
    fn is_free_for(&self, lane: Lane, truck: &TruckKey) -> bool {
        self.by_lane
            .get(&lane)
            .map_or(true, |trucks| trucks.iter().all(|holder| holder == truck))
    }
}

/// Resolves the lane that `truck` loads into.
///
/// Order of preference:
/// 1. a catalog lane already holding this truck's pallets;
/// 2. the lane numbered like the truck key, if free or already this truck's;
/// 3. the lowest unoccupied lane;
/// 4. the lowest lane.
pub fn resolve(
    truck: &TruckKey,
    catalog: &LayoutCatalog,
    occupancy: &LaneOccupancy,
) -> Result<Lane, PlacementError> {
    let lanes = catalog.lanes();
    let lowest = *lanes.first().ok_or(PlacementError::NoLaneAvailable)?;

    if let Some(bound) = occupancy
        .lanes_of(truck)
        .into_iter()
        .find(|&lane| catalog.has_lane(lane))
    {
        return Ok(bound);
    }

    if let Some(hint) = truck.lane_hint() {
        if catalog.has_lane(hint) && occupancy.is_free_for(hint, truck) {
            return Ok(hint);
        }
    }

    Ok(lanes
        .into_iter()
        .find(|&lane| !occupancy.is_occupied(lane))
        .unwrap_or(lowest))
}
