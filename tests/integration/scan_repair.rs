#![allow(missing_docs)]

use std::path::{Path, PathBuf};

use remora::repair::{FieldSurgeon, IndexRepair};
use remora::store::{Document, SegmentReader, SegmentWriter, ID_FIELD};
use tempfile::TempDir;

fn seed_segment(dir: &Path, ids: std::ops::RangeInclusive<u64>) {
    let mut writer = SegmentWriter::open(dir).expect("open writer");
    for id in ids {
        let mut doc = Document::for_entity(id);
        doc.add_field("key", format!("value{id}"));
        writer.add_document(&doc).expect("add document");
    }
    writer.commit().expect("commit");
}

fn setup_segment(name: &str, ids: std::ops::RangeInclusive<u64>) -> (TempDir, PathBuf) {
    let tmp = TempDir::new().expect("tempdir");
    let dir = tmp.path().join(name);
    seed_segment(&dir, ids);
    (tmp, dir)
}

fn live_entity_ids(dir: &Path) -> Vec<u64> {
    let reader = SegmentReader::open(dir).expect("open reader");
    let mut ids = Vec::new();
    for position in 0..reader.max_doc() {
        if reader.is_deleted(position) {
            continue;
        }
        let doc = reader.document(position).expect("document");
        if let Some(raw) = doc.get(ID_FIELD) {
            ids.push(raw.parse().expect("numeric id"));
        }
    }
    ids.sort_unstable();
    ids
}

#[test]
fn counts_are_zero_before_any_scan() {
    let (_tmp, dir) = setup_segment("seg", 1..=3);
    let repair = IndexRepair::open(&dir).expect("open");
    assert_eq!(repair.damaged_count(), 0);
    assert_eq!(repair.total_count(), 0);
    assert!(!repair.delete_damaged());
}

#[test]
fn healthy_segment_scans_clean_in_both_modes() {
    let (_tmp, dir) = setup_segment("seg", 1..=10);

    let mut repair = IndexRepair::open(&dir).expect("open");
    let report = repair.scan().expect("scan");
    assert_eq!(report.damaged_count(), 0);
    assert_eq!(report.scanned_docs, 10);

    let mut repair = IndexRepair::open(&dir).expect("open");
    repair.set_delete_damaged(true);
    let report = repair.scan().expect("scan");
    assert_eq!(report.damaged_count(), 0);
    assert_eq!(report.scanned_docs, 10);
    assert_eq!(report.deleted, 0);

    assert_eq!(live_entity_ids(&dir).len(), 10);
}

#[test]
fn report_only_scan_leaves_damaged_document_live() {
    let (_tmp, dir) = setup_segment("seg", 1..=2);
    FieldSurgeon::open(&dir)
        .expect("open surgeon")
        .remove_field(1, ID_FIELD)
        .expect("remove field");

    let mut repair = IndexRepair::open(&dir).expect("open");
    let report = repair.scan().expect("scan");
    assert_eq!(report.damaged_count(), 1);
    assert_eq!(report.scanned_docs, 2);
    assert_eq!(report.skipped_deleted, 1);
    assert_eq!(report.deleted, 0);
    assert_eq!(repair.damaged_count(), 1);
    assert_eq!(repair.total_count(), 2);

    // The damaged document is still live and retrievable by its surviving
    // field, but lookup by identifier finds nothing.
    let reader = SegmentReader::open(&dir).expect("open reader");
    let by_key = reader.search_exact("key", "value1", 2).expect("search");
    assert_eq!(by_key.len(), 1);
    assert!(!by_key[0].1.has_identifier());
    assert!(reader
        .search_exact(ID_FIELD, "1", 2)
        .expect("search")
        .is_empty());
}

#[test]
fn delete_scan_removes_damaged_document() {
    let (_tmp, dir) = setup_segment("seg", 1..=2);
    FieldSurgeon::open(&dir)
        .expect("open surgeon")
        .remove_field(1, ID_FIELD)
        .expect("remove field");

    let mut repair = IndexRepair::open(&dir).expect("open");
    repair.set_delete_damaged(true);
    let report = repair.scan().expect("scan");
    assert_eq!(report.damaged_count(), 1);
    assert_eq!(report.deleted, 1);

    // An independent scan over the same segment sees one fewer live
    // document and nothing damaged.
    let mut rescan = IndexRepair::open(&dir).expect("open");
    let report = rescan.scan().expect("scan");
    assert_eq!(report.damaged_count(), 0);
    assert_eq!(report.scanned_docs, 1);
    assert_eq!(report.skipped_deleted, 2);

    assert_eq!(live_entity_ids(&dir), vec![2]);
}

#[test]
fn end_to_end_delete_mode_over_one_hundred_documents() {
    let (_tmp, dir) = setup_segment("node1", 1..=100);
    FieldSurgeon::open(&dir)
        .expect("open surgeon")
        .remove_field(51, ID_FIELD)
        .expect("remove field");

    let mut repair = IndexRepair::open(&dir).expect("open");
    repair.set_delete_damaged(true);
    let report = repair.scan().expect("scan");
    assert_eq!(report.damaged_count(), 1);
    assert_eq!(report.scanned_docs, 100);

    let reader = SegmentReader::open(&dir).expect("open reader");
    assert!(reader
        .search_exact("key", "value51", 2)
        .expect("search")
        .is_empty());
    for id in (1..=100u64).filter(|id| *id != 51) {
        let hits = reader
            .search_exact("key", &format!("value{id}"), 2)
            .expect("search");
        assert_eq!(hits.len(), 1, "entity {id} should remain retrievable");
        assert_eq!(hits[0].1.entity_id().expect("id"), id);
    }
}

#[test]
fn end_to_end_report_mode_keeps_corrupted_state_untouched() {
    let (_tmp, dir) = setup_segment("node1", 1..=100);
    FieldSurgeon::open(&dir)
        .expect("open surgeon")
        .remove_field(51, ID_FIELD)
        .expect("remove field");

    let mut repair = IndexRepair::open(&dir).expect("open");
    let report = repair.scan().expect("scan");
    assert_eq!(report.damaged_count(), 1);
    assert_eq!(report.scanned_docs, 100);
    assert_eq!(report.damaged[0].get("key"), Some("value51"));

    let reader = SegmentReader::open(&dir).expect("open reader");
    let hits = reader.search_exact("key", "value51", 2).expect("search");
    assert_eq!(hits.len(), 1);
    assert!(reader
        .search_exact(ID_FIELD, "51", 2)
        .expect("search")
        .is_empty());
}

#[test]
fn scanner_reuse_reports_each_scan_independently() {
    let (_tmp, dir) = setup_segment("seg", 1..=3);
    let mut repair = IndexRepair::open(&dir).expect("open");
    repair.scan().expect("first scan");
    assert_eq!(repair.total_count(), 3);

    FieldSurgeon::open(&dir)
        .expect("open surgeon")
        .remove_field(2, ID_FIELD)
        .expect("remove field");

    let report = repair.scan().expect("second scan");
    assert_eq!(report.damaged_count(), 1);
    assert_eq!(report.skipped_deleted, 1);
    assert_eq!(repair.total_count(), 3);
}

#[test]
fn opening_a_scanner_on_a_missing_segment_fails() {
    let tmp = TempDir::new().expect("tempdir");
    let err = IndexRepair::open(tmp.path().join("absent")).unwrap_err();
    assert!(matches!(err, remora::RepairError::Io(_)));
}
