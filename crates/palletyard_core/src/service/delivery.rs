//! Delivery-triggered release of a truck's footprint.
//!
//! # Responsibility
//! - Remove a delivered truck from the durable log, the assignment index and
//!   the dedup set.
//!
//! # Invariants
//! - Queued background inserts are flushed before the durable delete, so no
//!   insert can land after it.
//! - The durable delete runs first and synchronously. If it fails, memory is
//!   not touched.
//! - After a successful delivery nothing in memory references the truck.
//! - Delivering a truck with nothing assigned succeeds and changes only the
//!   delivered set.

use crate::model::scan::TruckKey;
use crate::repo::scan_repo::{RepoError, ScanRepository};
use crate::service::yard_state::YardState;
use crate::sync::status_sink::{publish_detached, ShipmentStatus, StatusSink};
use log::{error, info};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

#[derive(Debug)]
pub enum DeliveryError {
    /// Durable rows could not be deleted; memory was left as it was.
    DurableDelete { truck: TruckKey, source: RepoError },
}

impl Display for DeliveryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DurableDelete { truck, source } => {
                write!(f, "failed to release truck {truck} from the scan store: {source}")
            }
        }
    }
}

impl Error for DeliveryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::DurableDelete { source, .. } => Some(source),
        }
    }
}

/// What a delivery removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub rows_deleted: usize,
    pub assignments_released: usize,
    pub slots_freed: usize,
}

pub struct DeliveryReconciler<'a, R: ScanRepository + ?Sized> {
    repo: &'a R,
    status_sink: Arc<dyn StatusSink>,
}

impl<'a, R: ScanRepository + ?Sized> DeliveryReconciler<'a, R> {
    pub fn new(repo: &'a R, status_sink: Arc<dyn StatusSink>) -> Self {
        Self { repo, status_sink }
    }

    /// Releases everything `truck` holds and marks it delivered.
    pub fn deliver(
        &self,
        state: &mut YardState,
        truck: &TruckKey,
    ) -> Result<DeliveryReport, DeliveryError> {
        state.ledger.flush_writes();
        let rows_deleted = self.repo.delete_truck(truck).map_err(|source| {
            error!(
                "event=truck_deliver module=service status=error truck={} error_code=durable_delete_failed error={}",
                truck, source
            );
            DeliveryError::DurableDelete {
                truck: truck.clone(),
                source,
            }
        })?;

        let released = state.ledger.release_truck(truck);
        state.mark_delivered(truck.clone());
        publish_detached(
            Arc::clone(&self.status_sink),
            truck.clone(),
            ShipmentStatus::Delivered,
        );

        let report = DeliveryReport {
            rows_deleted,
            assignments_released: released.assignments_released,
            slots_freed: released.slots_freed,
        };
        info!(
            "event=truck_deliver module=service status=ok truck={} rows_deleted={} assignments_released={} slots_freed={}",
            truck, report.rows_deleted, report.assignments_released, report.slots_freed
        );
        Ok(report)
    }
}
