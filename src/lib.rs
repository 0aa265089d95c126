//! Consistency scan-and-repair for the on-disk full-text index segments of
//! a graph store.
//!
//! Each indexed entity is represented by one document carrying the reserved
//! `_id_` field linking it back to its owning node or relationship. A crash
//! mid-write can leave documents without that field; such documents can
//! never be mapped back to an entity and break lookups. This crate detects
//! them ([`repair::IndexRepair`]), optionally tombstones them, and provides
//! the surgical field-removal operation ([`repair::FieldSurgeon`]) used to
//! rewrite a single document with one field stripped out.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod paths;
pub mod repair;
pub mod store;

pub use error::{RepairError, Result};
