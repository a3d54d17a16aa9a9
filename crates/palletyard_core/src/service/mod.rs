//! Yard services: placement, ledger, delivery and the session controller.
//!
//! # Responsibility
//! - Keep placement rules pure and storage-agnostic.
//! - Confine in-memory mutation to the session's driving thread.

pub mod delivery;
pub mod lane_allocator;
pub mod scan_ledger;
pub mod slot_engine;
pub mod yard_session;
pub mod yard_state;
