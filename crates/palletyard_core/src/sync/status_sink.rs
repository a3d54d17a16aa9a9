//! Best-effort shipment status publishing.

use crate::model::scan::TruckKey;
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use std::thread;

/// Shipment status reported to the outside world.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShipmentStatus {
    /// Every pallet of the truck has been scanned.
    Ready,
    /// The truck left; its slots were released.
    Delivered,
}

impl ShipmentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ready => "ready",
            Self::Delivered => "delivered",
        }
    }
}

/// Status sink failure. Only ever logged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusSinkError(pub String);

impl Display for StatusSinkError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "status sink: {}", self.0)
    }
}

impl Error for StatusSinkError {}

/// External shipment-status destination, e.g. a shared spreadsheet.
pub trait StatusSink: Send + Sync {
    fn publish(&self, truck: &TruckKey, status: ShipmentStatus) -> Result<(), StatusSinkError>;
}

/// Sink that records status changes in the log only.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogStatusSink;

impl StatusSink for LogStatusSink {
    fn publish(&self, truck: &TruckKey, status: ShipmentStatus) -> Result<(), StatusSinkError> {
        info!(
            "event=status_publish module=sync status=ok truck={} shipment_status={}",
            truck,
            status.as_str()
        );
        Ok(())
    }
}

/// Publishes `status` on a detached thread; errors are logged and dropped.
pub fn publish_detached(sink: Arc<dyn StatusSink>, truck: TruckKey, status: ShipmentStatus) {
    let spawned = thread::Builder::new()
        .name("status-publish".to_string())
        .spawn(move || {
            if let Err(err) = sink.publish(&truck, status) {
                warn!(
                    "event=status_publish module=sync status=error truck={} shipment_status={} error={}",
                    truck,
                    status.as_str(),
                    err
                );
            }
        });

    if let Err(err) = spawned {
        warn!(
            "event=status_publish module=sync status=error shipment_status={} error_code=spawn_failed error={}",
            status.as_str(),
            err
        );
    }
}
