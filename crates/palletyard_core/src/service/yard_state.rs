//! Per-session yard state.
//!
//! Owned by one controller and passed by reference to the services that
//! read or mutate it. Nothing in here is shared across threads.

use crate::layout::catalog::LayoutCatalog;
use crate::model::scan::TruckKey;
use crate::service::scan_ledger::ScanLedger;
use crate::sync::durable_writer::DurableWriter;
use std::collections::BTreeSet;

pub struct YardState {
    pub catalog: LayoutCatalog,
    pub ledger: ScanLedger,
    delivered: BTreeSet<TruckKey>,
}

impl YardState {
    /// Empty layout, empty ledger, no delivered trucks.
    pub fn new(writer: Box<dyn DurableWriter>) -> Self {
        Self {
            catalog: LayoutCatalog::default(),
            ledger: ScanLedger::new(writer),
            delivered: BTreeSet::new(),
        }
    }

    pub fn is_delivered(&self, truck: &TruckKey) -> bool {
        self.delivered.contains(truck)
    }

    pub fn delivered(&self) -> &BTreeSet<TruckKey> {
        &self.delivered
    }

    pub(crate) fn mark_delivered(&mut self, truck: TruckKey) {
        self.delivered.insert(truck);
    }

    pub(crate) fn clear_delivered(&mut self) {
        self.delivered.clear();
    }
}
