//! Truck keys, assignments and durable scan records.

use crate::model::slot::{Lane, SlotId, SlotPosition};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

/// Logical truck key from the shipment manifest.
///
/// The key may look like a number, but it is not a lane. Lane resolution only
/// uses the numeric reading as a preference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TruckKey(String);

impl TruckKey {
    /// Creates a key from manifest text. Surrounding whitespace is dropped.
    pub fn new(value: impl AsRef<str>) -> Self {
        Self(value.as_ref().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Numeric reading of the key when it is all ASCII digits.
    pub fn lane_hint(&self) -> Option<Lane> {
        if self.0.is_empty() || !self.0.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        self.0.parse().ok()
    }
}

impl Display for TruckKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TruckKey {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Dedup key of the scan ledger: one entry per (truck, pallet ordinal).
///
/// Pallet codes that differ in text but carry the same ordinal, such as `1`
/// and `PLT-001`, are the same pallet.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScanKey {
    pub truck: TruckKey,
    pub ordinal: u32,
}

impl ScanKey {
    pub fn new(truck: &TruckKey, ordinal: u32) -> Self {
        Self {
            truck: truck.clone(),
            ordinal,
        }
    }
}

/// Where one pallet sits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Placement {
    pub slot: SlotId,
    pub position: SlotPosition,
}

impl Display for Placement {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (position {})", self.slot, self.position)
    }
}

/// One pallet occupying one slot position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub truck: TruckKey,
    pub pallet: String,
    pub slot: SlotId,
    pub position: SlotPosition,
}

impl Assignment {
    pub fn lane(&self) -> Lane {
        self.slot.lane
    }

    pub fn placement(&self) -> Placement {
        Placement {
            slot: self.slot,
            position: self.position,
        }
    }
}

/// Slot-to-assignments view, ordered by slot. Each list holds at most
/// `SLOT_CAPACITY` entries ordered by position; empty lists are never stored.
pub type AssignmentIndex = BTreeMap<SlotId, Vec<Assignment>>;

/// Durable row of the scan log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanRecord {
    pub truck: TruckKey,
    pub pallet: String,
    pub first_serial: String,
    pub last_serial: String,
    pub slot: SlotId,
    pub position: SlotPosition,
    /// Unix epoch milliseconds. `None` until the store assigns it.
    pub inserted_at: Option<i64>,
}

impl ScanRecord {
    pub fn assignment(&self) -> Assignment {
        Assignment {
            truck: self.truck.clone(),
            pallet: self.pallet.clone(),
            slot: self.slot,
            position: self.position,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::TruckKey;

    #[test]
    fn lane_hint_requires_all_digits() {
        assert_eq!(TruckKey::new(" 5 ").lane_hint(), Some(5));
        assert_eq!(TruckKey::new("05").lane_hint(), Some(5));
        assert_eq!(TruckKey::new("T5").lane_hint(), None);
        assert_eq!(TruckKey::new("-5").lane_hint(), None);
        assert_eq!(TruckKey::new("").lane_hint(), None);
    }
}
