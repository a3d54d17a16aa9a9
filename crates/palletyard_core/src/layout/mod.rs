//! Warehouse layout as seen by the placement engine.
//!
//! Parsing drawings into slot identifiers happens outside this crate; the
//! catalog only consumes the resulting identifier strings.

pub mod catalog;
