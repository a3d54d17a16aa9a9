//! Work that leaves the driving thread.
//!
//! # Responsibility
//! - Persist scans to the durable store without blocking the scan path.
//! - Push shipment status changes to an external sink.
//!
//! # Invariants
//! - Background work is never joined, cancelled or retried. The only wait is
//!   the durable writer's `flush`, used before bulk deletes.
//! - Failures are logged and dropped; callers never see them.

pub mod durable_writer;
pub mod status_sink;
