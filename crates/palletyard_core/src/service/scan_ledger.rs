//! In-memory scan registry with write-through to the durable store.
//!
//! # Responsibility
//! - Answer "was this pallet scanned, and where is it" without touching
//!   storage.
//! - Commit new placements in memory first, then hand the durable write to a
//!   background writer.
//! - Rebuild itself from the durable store at startup.
//!
//! # Invariants
//! - One entry per (truck, pallet ordinal); registering it again, under any
//!   code carrying that ordinal, is a no-op that returns the first placement.
//! - The assignment index and the dedup map always describe the same set of
//!   pallets.
//! - Memory is authoritative for the session; the durable log may trail it
//!   when a background write fails.

use crate::layout::catalog::LayoutCatalog;
use crate::model::scan::{
    Assignment, AssignmentIndex, Placement, ScanKey, ScanRecord, TruckKey,
};
use crate::repo::scan_repo::{RepoError, RepoResult, ScanRepository};
use crate::service::lane_allocator::{resolve, LaneOccupancy};
use crate::service::slot_engine::{assign, extract_pallet_ordinal, PlacementError};
use crate::sync::durable_writer::DurableWriter;
use log::{debug, info, warn};
use std::collections::{BTreeSet, HashMap};
use std::time::Instant;

/// Result of a `register` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanOutcome {
    /// The pallet was placed by this call.
    Placed(Placement),
    /// The pallet was already registered; nothing changed.
    AlreadyScanned(Placement),
}

impl ScanOutcome {
    pub fn placement(&self) -> Placement {
        match self {
            Self::Placed(placement) | Self::AlreadyScanned(placement) => *placement,
        }
    }

    pub fn is_new(&self) -> bool {
        matches!(self, Self::Placed(_))
    }
}

/// What releasing a truck removed from memory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReleaseSummary {
    pub assignments_released: usize,
    pub slots_freed: usize,
}

pub struct ScanLedger {
    scanned: HashMap<ScanKey, Placement>,
    slots: AssignmentIndex,
    writer: Box<dyn DurableWriter>,
}

impl ScanLedger {
    pub fn new(writer: Box<dyn DurableWriter>) -> Self {
        Self {
            scanned: HashMap::new(),
            slots: AssignmentIndex::new(),
            writer,
        }
    }

    /// Replaces the in-memory view with the durable rows.
    ///
    /// Returns the number of pallets loaded.
    pub fn load<R: ScanRepository + ?Sized>(&mut self, repo: &R) -> RepoResult<usize> {
        let started_at = Instant::now();
        let records = repo.list_scans()?;

        let mut scanned = HashMap::with_capacity(records.len());
        let mut slots = AssignmentIndex::new();
        for record in records {
            let ordinal = extract_pallet_ordinal(&record.pallet)
                .map_err(|err| RepoError::InvalidData(format!("{err} in pallet_scans.pallet")))?;
            let key = ScanKey::new(&record.truck, ordinal);
            if scanned.contains_key(&key) {
                continue;
            }
            let assignment = record.assignment();
            scanned.insert(key, assignment.placement());
            slots.entry(assignment.slot).or_insert_with(Vec::new).push(assignment);
        }
        for occupants in slots.values_mut() {
            occupants.sort_by_key(|assignment| assignment.position);
        }

        self.scanned = scanned;
        self.slots = slots;
        info!(
            "event=ledger_load module=service status=ok pallets={} slots={} duration_ms={}",
            self.scanned.len(),
            self.slots.len(),
            started_at.elapsed().as_millis()
        );
        Ok(self.scanned.len())
    }

    /// False for codes that carry no pallet ordinal.
    pub fn is_scanned(&self, truck: &TruckKey, pallet: &str) -> bool {
        self.locate(truck, pallet).is_some()
    }

    pub fn locate(&self, truck: &TruckKey, pallet: &str) -> Option<Placement> {
        let ordinal = extract_pallet_ordinal(pallet).ok()?;
        self.scanned.get(&ScanKey::new(truck, ordinal)).copied()
    }

    /// Places one pallet of `truck` and queues its durable write.
    ///
    /// # Errors
    /// - Lane or slot resolution failures, with no state change.
    pub fn register(
        &mut self,
        catalog: &LayoutCatalog,
        truck: &TruckKey,
        pallet: &str,
        first_serial: &str,
        last_serial: &str,
    ) -> Result<ScanOutcome, PlacementError> {
        let pallet = pallet.trim();
        let reject = |err: PlacementError| {
            warn!(
                "event=scan_register module=service status=rejected truck={} pallet={} error_code={} error={}",
                truck,
                pallet,
                err.code(),
                err
            );
            err
        };

        let ordinal = extract_pallet_ordinal(pallet).map_err(reject)?;
        let key = ScanKey::new(truck, ordinal);
        if let Some(existing) = self.scanned.get(&key) {
            debug!(
                "event=scan_register module=service status=duplicate truck={} pallet={} ordinal={} slot={}",
                truck, pallet, ordinal, existing.slot
            );
            return Ok(ScanOutcome::AlreadyScanned(*existing));
        }

        let placement = resolve(truck, catalog, &self.occupancy())
            .and_then(|lane| assign(lane, ordinal, catalog, &self.slots))
            .map_err(reject)?;

        let assignment = Assignment {
            truck: truck.clone(),
            pallet: pallet.to_string(),
            slot: placement.slot,
            position: placement.position,
        };
        let occupants = self.slots.entry(placement.slot).or_default();
        occupants.push(assignment);
        occupants.sort_by_key(|assignment| assignment.position);

        let record = ScanRecord {
            truck: truck.clone(),
            pallet: pallet.to_string(),
            first_serial: first_serial.trim().to_string(),
            last_serial: last_serial.trim().to_string(),
            slot: placement.slot,
            position: placement.position,
            inserted_at: None,
        };
        self.scanned.insert(key, placement);
        self.writer.enqueue(record);

        info!(
            "event=scan_register module=service status=ok truck={} pallet={} slot={} position={}",
            truck, pallet, placement.slot, placement.position
        );
        Ok(ScanOutcome::Placed(placement))
    }

    /// Slot-to-assignments view for renderers.
    pub fn assignments(&self) -> &AssignmentIndex {
        &self.slots
    }

    pub fn occupancy(&self) -> LaneOccupancy {
        LaneOccupancy::from_assignments(&self.slots)
    }

    pub fn scanned_count(&self, truck: &TruckKey) -> usize {
        self.scanned.keys().filter(|key| &key.truck == truck).count()
    }

    /// Trucks with at least one registered pallet.
    pub fn trucks(&self) -> BTreeSet<TruckKey> {
        self.scanned.keys().map(|key| key.truck.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.scanned.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scanned.is_empty()
    }

    /// Drops every assignment and dedup entry of `truck`.
    pub(crate) fn release_truck(&mut self, truck: &TruckKey) -> ReleaseSummary {
        let mut summary = ReleaseSummary::default();
        self.slots.retain(|_, occupants| {
            let before = occupants.len();
            occupants.retain(|assignment| &assignment.truck != truck);
            summary.assignments_released += before - occupants.len();
            if occupants.is_empty() {
                summary.slots_freed += 1;
                false
            } else {
                true
            }
        });
        self.scanned.retain(|key, _| &key.truck != truck);
        summary
    }

    /// Waits for queued durable writes so a following delete sees them.
    pub(crate) fn flush_writes(&self) {
        self.writer.flush();
    }

    pub(crate) fn clear(&mut self) {
        self.scanned.clear();
        self.slots.clear();
    }
}
