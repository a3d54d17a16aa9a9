//! Durable scan log access.
//!
//! # Responsibility
//! - Define the store contract the ledger and delivery rely on.
//! - Keep SQL inside the persistence boundary.
//!
//! # Invariants
//! - Inserts are idempotent on (truck, pallet).
//! - Reads reject malformed rows instead of skipping them.

pub mod scan_repo;
