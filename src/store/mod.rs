//! On-disk document store segments.
//!
//! A segment is a directory holding an append-only record log plus a
//! committed manifest (document count and tombstone bitmap). Documents are
//! immutable once written; deletion is a tombstone in the manifest, and an
//! edit is tombstone-plus-reinsert. A commit atomically swaps the manifest,
//! making the batch of staged changes durable and visible to subsequent
//! opens.

mod document;
mod record;
mod segment;

pub use document::{Document, Field, ID_FIELD};
pub use segment::{SegmentReader, SegmentWriter, DOCS_FILE, META_FILE};
