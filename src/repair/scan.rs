use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;

use crate::error::Result;
use crate::store::{Document, SegmentReader};

/// Outcome of one scan over a segment.
#[derive(Clone, Debug, Default, Serialize)]
pub struct ScanReport {
    /// Display form of the segment directory scanned.
    pub segment: String,
    /// Live documents read and classified.
    pub scanned_docs: u64,
    /// Tombstoned slots skipped without classification.
    pub skipped_deleted: u64,
    /// Tombstones applied by this scan (zero in report-only mode).
    pub deleted: u64,
    /// Snapshots of the damaged documents, retained for diagnostics.
    pub damaged: Vec<Document>,
}

impl ScanReport {
    /// Number of damaged documents found.
    pub fn damaged_count(&self) -> u64 {
        self.damaged.len() as u64
    }
}

/// Consistency scanner for one segment: classifies every live document as
/// healthy or damaged by presence of the identifier field, and under the
/// delete policy tombstones the damaged ones in a single committed batch.
#[derive(Debug)]
pub struct IndexRepair {
    dir: PathBuf,
    delete_damaged: bool,
    last: ScanReport,
}

impl IndexRepair {
    /// Binds a scanner to the segment at `dir`, verifying it opens as a
    /// document store.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        SegmentReader::open(&dir)?;
        Ok(Self {
            dir,
            delete_damaged: false,
            last: ScanReport::default(),
        })
    }

    /// Enables or disables tombstoning of damaged documents. Default off:
    /// report-only mode.
    pub fn set_delete_damaged(&mut self, delete_damaged: bool) {
        self.delete_damaged = delete_damaged;
    }

    /// Current deletion policy.
    pub fn delete_damaged(&self) -> bool {
        self.delete_damaged
    }

    /// Scans every committed slot in store order. Tombstoned slots are
    /// counted as skipped and never classified; live documents lacking the
    /// identifier field are recorded as damaged and, under the delete
    /// policy, tombstoned. All tombstones from the pass become durable in
    /// one commit after the full pass.
    pub fn scan(&mut self) -> Result<&ScanReport> {
        let mut reader = SegmentReader::open(&self.dir)?;
        let mut report = ScanReport {
            segment: self.dir.display().to_string(),
            ..ScanReport::default()
        };

        for position in 0..reader.max_doc() {
            if reader.is_deleted(position) {
                report.skipped_deleted += 1;
                continue;
            }
            let doc = reader.document(position)?;
            report.scanned_docs += 1;
            if doc.has_identifier() {
                continue;
            }
            report.damaged.push(doc);
            if self.delete_damaged {
                reader.delete_document(position)?;
                report.deleted += 1;
            }
        }
        reader.commit()?;
        drop(reader);

        info!(
            segment = %report.segment,
            scanned = report.scanned_docs,
            damaged = report.damaged.len(),
            skipped_deleted = report.skipped_deleted,
            deleted = report.deleted,
            "repair.scan.completed"
        );
        self.last = report;
        Ok(&self.last)
    }

    /// Damaged documents found by the most recent scan; zero before any.
    pub fn damaged_count(&self) -> u64 {
        self.last.damaged_count()
    }

    /// Live documents read by the most recent scan; zero before any.
    pub fn total_count(&self) -> u64 {
        self.last.scanned_docs
    }

    /// Report of the most recent scan; zero state before any.
    pub fn last_report(&self) -> &ScanReport {
        &self.last
    }
}
