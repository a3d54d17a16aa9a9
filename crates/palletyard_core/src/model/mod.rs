//! Yard domain model.
//!
//! # Responsibility
//! - Define slot identity, truck keys, and the assignment/scan records shared
//!   by the engine, the ledger and the durable store.
//!
//! # Invariants
//! - A slot holds a list of 0, 1 or 2 assignments; there is no single-value
//!   representation.
//! - `SlotId` renders as `C<lane>-<index>` and parses back losslessly.

pub mod scan;
pub mod slot;
