//! Shipment manifest collaborator.
//!
//! # Responsibility
//! - Resolve a scanned serial pair to the pallet it closes.
//! - List the pallets each truck must carry, for progress reporting.
//!
//! # See also
//! - `packing` for the packing-list backed implementation.

pub mod packing;

use crate::model::scan::TruckKey;
use serde::{Deserialize, Serialize};

/// One pallet as described by the packing list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PalletSummary {
    pub pallet: String,
    pub first_serial: String,
    pub last_serial: String,
    pub box_count: usize,
}

/// Read-only view of the shipment manifest.
pub trait Manifest {
    /// Trucks listed in the manifest, in manifest order.
    fn trucks(&self) -> Vec<TruckKey>;

    /// Pallets that belong to `truck`. Empty for unknown trucks.
    fn truck_pallets(&self, truck: &TruckKey) -> Vec<PalletSummary>;

    /// Pallet of `truck` whose first and last serials match exactly.
    fn lookup(&self, truck: &TruckKey, first_serial: &str, last_serial: &str) -> Option<String> {
        let first_serial = first_serial.trim();
        let last_serial = last_serial.trim();
        self.truck_pallets(truck)
            .into_iter()
            .find(|pallet| pallet.first_serial == first_serial && pallet.last_serial == last_serial)
            .map(|pallet| pallet.pallet)
    }
}
