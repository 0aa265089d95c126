//! Consistency scan and surgical field removal over index segments.

mod scan;
mod surgery;

pub use scan::{IndexRepair, ScanReport};
pub use surgery::FieldSurgeon;
