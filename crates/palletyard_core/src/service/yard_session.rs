//! Operator session controller.
//!
//! # Responsibility
//! - Own the per-session `YardState` and wire the manifest, the ledger and
//!   delivery together into the scan workflow.
//! - Report per-truck progress and publish `ready` once a truck is complete.
//!
//! # Invariants
//! - All in-memory mutation happens through `&mut self` on the driving
//!   thread.
//! - Only the scan that completes a truck publishes `ready`.

use crate::layout::catalog::LayoutCatalog;
use crate::manifest::Manifest;
use crate::model::scan::{AssignmentIndex, TruckKey};
use crate::model::slot::{Lane, SlotId};
use crate::repo::scan_repo::{RepoResult, ScanRepository};
use crate::service::delivery::{DeliveryError, DeliveryReconciler, DeliveryReport};
use crate::service::lane_allocator::resolve;
use crate::service::scan_ledger::{ScanLedger, ScanOutcome};
use crate::service::slot_engine::{compute_slot_id, extract_pallet_ordinal, PlacementError};
use crate::service::yard_state::YardState;
use crate::sync::durable_writer::DurableWriter;
use crate::sync::status_sink::{publish_detached, ShipmentStatus, StatusSink};
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Scan workflow failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanError {
    /// No truck was selected before scanning.
    NoActiveTruck,
    /// The serial pair does not close any pallet of the active truck.
    UnknownSerials {
        truck: TruckKey,
        first_serial: String,
        last_serial: String,
    },
    Placement(PlacementError),
}

impl Display for ScanError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoActiveTruck => write!(f, "select a truck before scanning"),
            Self::UnknownSerials {
                truck,
                first_serial,
                last_serial,
            } => write!(
                f,
                "serials `{first_serial}`..`{last_serial}` match no pallet of truck {truck}"
            ),
            Self::Placement(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ScanError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Placement(err) => Some(err),
            _ => None,
        }
    }
}

impl From<PlacementError> for ScanError {
    fn from(value: PlacementError) -> Self {
        Self::Placement(value)
    }
}

/// Lifecycle of one manifest truck.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TruckState {
    Unbound,
    PartiallyScanned,
    Complete,
    Delivered,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TruckProgress {
    pub truck: TruckKey,
    /// Pallets the manifest lists for the truck.
    pub total: usize,
    pub scanned: usize,
    pub state: TruckState,
    /// Lane holding the truck's pallets, or the lane its next scan would get.
    pub lane: Option<Lane>,
}

impl TruckProgress {
    pub fn pending(&self) -> usize {
        self.total.saturating_sub(self.scanned)
    }

    /// Share of scanned pallets in `0.0..=1.0`; zero when the manifest is empty.
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        (self.scanned.min(self.total) as f64) / (self.total as f64)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanReport {
    pub truck: TruckKey,
    pub pallet: String,
    pub outcome: ScanOutcome,
    /// Slot the pallet number pairs into on the resolved lane.
    pub expected_slot: Option<SlotId>,
    /// This scan finished the truck.
    pub truck_completed: bool,
}

impl ScanReport {
    /// False when the layout lacked the paired slot and the lane's first slot
    /// was used instead.
    pub fn matches_expected(&self) -> bool {
        self.expected_slot == Some(self.outcome.placement().slot)
    }
}

pub struct YardSession<R: ScanRepository, M: Manifest> {
    repo: R,
    manifest: M,
    state: YardState,
    status_sink: Arc<dyn StatusSink>,
    active_truck: Option<TruckKey>,
}

impl<R: ScanRepository, M: Manifest> YardSession<R, M> {
    /// Starts a session and rebuilds the ledger from the durable store.
    pub fn open(
        repo: R,
        manifest: M,
        writer: Box<dyn DurableWriter>,
        status_sink: Arc<dyn StatusSink>,
    ) -> RepoResult<Self> {
        let mut state = YardState::new(writer);
        let loaded = state.ledger.load(&repo)?;
        info!(
            "event=session_open module=service status=ok pallets_loaded={} manifest_trucks={}",
            loaded,
            manifest.trucks().len()
        );
        Ok(Self {
            repo,
            manifest,
            state,
            status_sink,
            active_truck: None,
        })
    }

    /// Replaces the layout wholesale. Returns the number of valid slots.
    pub fn reload_layout<I, S>(&mut self, raw_ids: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.state.catalog = LayoutCatalog::ingest(raw_ids);
        let orphaned = self
            .state
            .ledger
            .assignments()
            .keys()
            .filter(|slot| !self.state.catalog.contains(slot))
            .count();
        if orphaned > 0 {
            warn!(
                "event=layout_load module=service status=warn orphaned_slots={}",
                orphaned
            );
        }
        info!(
            "event=layout_load module=service status=ok lanes={} slots={}",
            self.state.catalog.lanes().len(),
            self.state.catalog.slot_count()
        );
        self.state.catalog.slot_count()
    }

    pub fn catalog(&self) -> &LayoutCatalog {
        &self.state.catalog
    }

    pub fn ledger(&self) -> &ScanLedger {
        &self.state.ledger
    }

    pub fn state(&self) -> &YardState {
        &self.state
    }

    pub fn manifest(&self) -> &M {
        &self.manifest
    }

    /// Slot-to-assignments view for renderers.
    pub fn assignments(&self) -> &AssignmentIndex {
        self.state.ledger.assignments()
    }

    /// Makes `truck` the target of subsequent scans.
    pub fn select_truck(&mut self, truck: TruckKey) -> TruckProgress {
        let progress = self.progress(&truck);
        info!(
            "event=lane_resolve module=service status={} truck={} lane={}",
            if progress.lane.is_some() { "ok" } else { "unavailable" },
            truck,
            progress
                .lane
                .map_or_else(|| "none".to_string(), |lane| lane.to_string())
        );
        self.active_truck = Some(truck);
        progress
    }

    pub fn active_truck(&self) -> Option<&TruckKey> {
        self.active_truck.as_ref()
    }

    /// Lane the next scan of `truck` would use.
    pub fn lane_for(&self, truck: &TruckKey) -> Result<Lane, PlacementError> {
        resolve(truck, &self.state.catalog, &self.state.ledger.occupancy())
    }

    /// Registers the pallet closed by the serial pair for the active truck.
    pub fn scan(&mut self, first_serial: &str, last_serial: &str) -> Result<ScanReport, ScanError> {
        let truck = self.active_truck.clone().ok_or(ScanError::NoActiveTruck)?;
        let pallet = self
            .manifest
            .lookup(&truck, first_serial, last_serial)
            .ok_or_else(|| {
                warn!(
                    "event=scan_register module=service status=rejected truck={} error_code=unknown_serials",
                    truck
                );
                ScanError::UnknownSerials {
                    truck: truck.clone(),
                    first_serial: first_serial.trim().to_string(),
                    last_serial: last_serial.trim().to_string(),
                }
            })?;

        let outcome = self.state.ledger.register(
            &self.state.catalog,
            &truck,
            &pallet,
            first_serial,
            last_serial,
        )?;

        let placement = outcome.placement();
        let expected_slot = extract_pallet_ordinal(&pallet)
            .ok()
            .map(|ordinal| compute_slot_id(ordinal, placement.slot.lane));
        if outcome.is_new() && expected_slot != Some(placement.slot) {
            warn!(
                "event=scan_register module=service status=fallback truck={} pallet={} expected={} actual={}",
                truck,
                pallet,
                expected_slot.map_or_else(|| "none".to_string(), |slot| slot.to_string()),
                placement.slot
            );
        }

        let progress = self.progress(&truck);
        let truck_completed = outcome.is_new() && progress.state == TruckState::Complete;
        if truck_completed {
            publish_detached(
                Arc::clone(&self.status_sink),
                truck.clone(),
                ShipmentStatus::Ready,
            );
        }

        Ok(ScanReport {
            truck,
            pallet,
            outcome,
            expected_slot,
            truck_completed,
        })
    }

    /// Releases `truck` and marks it delivered.
    pub fn deliver(&mut self, truck: &TruckKey) -> Result<DeliveryReport, DeliveryError> {
        let reconciler = DeliveryReconciler::new(&self.repo, Arc::clone(&self.status_sink));
        let report = reconciler.deliver(&mut self.state, truck)?;
        if self.active_truck.as_ref() == Some(truck) {
            self.active_truck = None;
        }
        Ok(report)
    }

    pub fn progress(&self, truck: &TruckKey) -> TruckProgress {
        let total = self.manifest.truck_pallets(truck).len();
        let scanned = self.state.ledger.scanned_count(truck);
        let state = if self.state.is_delivered(truck) {
            TruckState::Delivered
        } else if scanned == 0 {
            TruckState::Unbound
        } else if total > 0 && scanned >= total {
            TruckState::Complete
        } else {
            TruckState::PartiallyScanned
        };
        let lane = match state {
            TruckState::Delivered => None,
            _ => self.lane_for(truck).ok(),
        };

        TruckProgress {
            truck: truck.clone(),
            total,
            scanned,
            state,
            lane,
        }
    }

    /// Manifest trucks that have not been delivered.
    pub fn pending_trucks(&self) -> Vec<TruckKey> {
        self.manifest
            .trucks()
            .into_iter()
            .filter(|truck| !self.state.is_delivered(truck))
            .collect()
    }

    /// Deletes every durable row, then forgets all scans and deliveries.
    pub fn reset(&mut self) -> RepoResult<usize> {
        self.state.ledger.flush_writes();
        let removed = self.repo.delete_all()?;
        self.state.ledger.clear();
        self.state.clear_delivered();
        self.active_truck = None;
        info!(
            "event=yard_reset module=service status=ok rows_deleted={}",
            removed
        );
        Ok(removed)
    }
}
