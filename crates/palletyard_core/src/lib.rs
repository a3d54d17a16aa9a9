//! Slot assignment and scan reconciliation for truck-loading yards.
//! This crate owns every placement invariant; drivers only call into it.

pub mod config;
pub mod db;
pub mod layout;
pub mod logging;
pub mod manifest;
pub mod model;
pub mod repo;
pub mod service;
pub mod sync;

pub use config::{ConfigError, YardConfig};
pub use layout::catalog::LayoutCatalog;
pub use logging::{default_log_level, init_logging, logging_status};
pub use manifest::packing::{ManifestError, PackingManifest, PackingRow, TruckRange};
pub use manifest::{Manifest, PalletSummary};
pub use model::scan::{Assignment, AssignmentIndex, Placement, ScanKey, ScanRecord, TruckKey};
pub use model::slot::{Lane, SlotId, SlotPosition, SLOT_CAPACITY};
pub use repo::scan_repo::{RepoError, RepoResult, ScanRepository, SqliteScanRepository};
pub use service::delivery::{DeliveryError, DeliveryReconciler, DeliveryReport};
pub use service::lane_allocator::{resolve, LaneOccupancy};
pub use service::scan_ledger::{ReleaseSummary, ScanLedger, ScanOutcome};
pub use service::slot_engine::{assign, compute_slot_id, extract_pallet_ordinal, PlacementError};
pub use service::yard_session::{ScanError, ScanReport, TruckProgress, TruckState, YardSession};
pub use service::yard_state::YardState;
pub use sync::durable_writer::{DetachedSqliteWriter, DurableWriter};
pub use sync::status_sink::{LogStatusSink, ShipmentStatus, StatusSink, StatusSinkError};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
