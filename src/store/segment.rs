use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::trace;

use crate::error::{RepairError, Result};
use crate::store::document::Document;
use crate::store::record::{encode_record, verify_record, RecordHeader, RecordKind};

/// Append-only record log holding the segment's documents.
pub const DOCS_FILE: &str = "segment.docs";
/// Committed manifest: document count plus tombstone bitmap.
pub const META_FILE: &str = "segment.meta";

const META_MAGIC: [u8; 4] = *b"RMSG";
const META_VERSION: u16 = 1;

/// Committed state of a segment: how many log records are visible and
/// which of them are tombstoned.
#[derive(Clone, Debug, Default)]
struct Manifest {
    doc_count: u32,
    tombstones: Vec<u8>,
}

impl Manifest {
    fn is_deleted(&self, position: u32) -> bool {
        let byte = (position / 8) as usize;
        self.tombstones
            .get(byte)
            .is_some_and(|bits| bits & (1u8 << (position % 8)) != 0)
    }

    fn set_deleted(&mut self, position: u32) {
        let byte = (position / 8) as usize;
        if self.tombstones.len() <= byte {
            self.tombstones.resize(byte + 1, 0);
        }
        self.tombstones[byte] |= 1u8 << (position % 8);
    }

    fn encode(&self) -> Vec<u8> {
        let mut buffer = Vec::with_capacity(16 + self.tombstones.len());
        buffer.extend_from_slice(&META_MAGIC);
        buffer.extend_from_slice(&META_VERSION.to_le_bytes());
        buffer.extend_from_slice(&[0; 2]);
        buffer.extend_from_slice(&self.doc_count.to_le_bytes());
        buffer.extend_from_slice(&(self.tombstones.len() as u32).to_le_bytes());
        buffer.extend_from_slice(&self.tombstones);
        let checksum = crc32fast::hash(&buffer);
        buffer.extend_from_slice(&checksum.to_le_bytes());
        buffer
    }

    fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < 20 {
            return Err(RepairError::Corruption("segment manifest truncated".into()));
        }
        let (body, trailer) = bytes.split_at(bytes.len() - 4);
        let stored = u32::from_le_bytes(trailer.try_into().expect("slice has exactly 4 bytes"));
        if crc32fast::hash(body) != stored {
            return Err(RepairError::Corruption(
                "segment manifest checksum mismatch".into(),
            ));
        }
        if body[0..4] != META_MAGIC {
            return Err(RepairError::Corruption("bad segment manifest magic".into()));
        }
        let version = u16::from_le_bytes(body[4..6].try_into().expect("2 bytes"));
        if version != META_VERSION {
            return Err(RepairError::Corruption(format!(
                "unsupported segment manifest version {version}"
            )));
        }
        let doc_count = u32::from_le_bytes(body[8..12].try_into().expect("4 bytes"));
        let bitmap_len = u32::from_le_bytes(body[12..16].try_into().expect("4 bytes")) as usize;
        if body.len() != 16 + bitmap_len {
            return Err(RepairError::Corruption(
                "segment manifest bitmap length mismatch".into(),
            ));
        }
        Ok(Self {
            doc_count,
            tombstones: body[16..].to_vec(),
        })
    }
}

fn read_manifest(dir: &Path) -> Result<Manifest> {
    let bytes = fs::read(dir.join(META_FILE))?;
    Manifest::decode(&bytes)
}

/// Atomically replaces the manifest: temp file in the segment directory,
/// fsync, rename over the committed copy.
fn write_manifest(dir: &Path, manifest: &Manifest) -> Result<()> {
    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(&manifest.encode())?;
    temp.as_file().sync_all()?;
    temp.persist(dir.join(META_FILE))
        .map_err(|err| RepairError::Io(err.error))?;
    sync_dir(dir)?;
    Ok(())
}

#[cfg(unix)]
fn sync_dir(dir: &Path) -> Result<()> {
    File::open(dir)?.sync_all()?;
    Ok(())
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> Result<()> {
    Ok(())
}

/// Walks the record log collecting the byte offset of each of the first
/// `doc_count` records. Bytes past the committed prefix are an uncommitted
/// writer suffix and are ignored.
fn scan_log(log: &[u8], doc_count: u32) -> Result<Vec<u64>> {
    let mut offsets = Vec::with_capacity(doc_count as usize);
    let mut cursor = 0usize;
    while offsets.len() < doc_count as usize {
        if cursor >= log.len() {
            return Err(RepairError::Corruption(format!(
                "segment log holds {} of {} committed documents",
                offsets.len(),
                doc_count
            )));
        }
        let header = RecordHeader::from_bytes(&log[cursor..])?;
        let record_len = header.record_length();
        if cursor + record_len > log.len() {
            return Err(RepairError::Corruption(format!(
                "record at offset {cursor} extends past end of log"
            )));
        }
        offsets.push(cursor as u64);
        cursor += record_len;
    }
    Ok(offsets)
}

/// Read-with-delete handle over one committed segment snapshot.
///
/// Positions are store-assigned physical order; they carry no meaning and
/// are only valid against this open snapshot. Tombstones staged through
/// [`SegmentReader::delete_document`] become durable in a single
/// [`SegmentReader::commit`].
#[derive(Debug)]
pub struct SegmentReader {
    dir: PathBuf,
    log: Vec<u8>,
    offsets: Vec<u64>,
    manifest: Manifest,
    dirty: bool,
}

impl SegmentReader {
    /// Opens the committed snapshot of the segment at `dir`.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        let manifest = read_manifest(&dir)?;
        let log = fs::read(dir.join(DOCS_FILE))?;
        let offsets = scan_log(&log, manifest.doc_count)?;
        trace!(
            segment = %dir.display(),
            max_doc = manifest.doc_count,
            "segment.reader.open"
        );
        Ok(Self {
            dir,
            log,
            offsets,
            manifest,
            dirty: false,
        })
    }

    /// Number of committed document slots, tombstoned ones included.
    pub fn max_doc(&self) -> u32 {
        self.manifest.doc_count
    }

    /// Whether the slot at `position` is tombstoned in this snapshot.
    pub fn is_deleted(&self, position: u32) -> bool {
        self.manifest.is_deleted(position)
    }

    /// Reads and decodes the document at `position`.
    pub fn document(&self, position: u32) -> Result<Document> {
        let offset = *self.offsets.get(position as usize).ok_or_else(|| {
            RepairError::InvalidArgument(format!(
                "position {position} out of range for segment {}",
                self.dir.display()
            ))
        })?;
        let payload = verify_record(&self.log[offset as usize..], offset)?;
        Document::decode(payload)
    }

    /// Stages a tombstone for the slot at `position`. Not durable until
    /// [`SegmentReader::commit`].
    pub fn delete_document(&mut self, position: u32) -> Result<()> {
        if position >= self.manifest.doc_count {
            return Err(RepairError::InvalidArgument(format!(
                "position {position} out of range for segment {}",
                self.dir.display()
            )));
        }
        self.manifest.set_deleted(position);
        self.dirty = true;
        Ok(())
    }

    /// Exact-match lookup of live documents whose first `field` value equals
    /// `value`, stopping after `limit` matches. Tombstoned slots and staged
    /// deletions are excluded.
    pub fn search_exact(
        &self,
        field: &str,
        value: &str,
        limit: usize,
    ) -> Result<Vec<(u32, Document)>> {
        let mut hits = Vec::new();
        for position in 0..self.max_doc() {
            if hits.len() >= limit {
                break;
            }
            if self.is_deleted(position) {
                continue;
            }
            let doc = self.document(position)?;
            if doc.get(field) == Some(value) {
                hits.push((position, doc));
            }
        }
        Ok(hits)
    }

    /// Makes all staged tombstones durable and visible in one atomic
    /// manifest swap. A no-op when nothing was staged.
    pub fn commit(&mut self) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }
        write_manifest(&self.dir, &self.manifest)?;
        self.dirty = false;
        trace!(segment = %self.dir.display(), "segment.reader.commit");
        Ok(())
    }

    /// Segment directory this handle reads from.
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

/// Append handle over a segment. Documents added here are invisible to
/// readers until [`SegmentWriter::commit`] raises the committed count.
pub struct SegmentWriter {
    dir: PathBuf,
    file: File,
    manifest: Manifest,
    pending: u32,
}

impl SegmentWriter {
    /// Opens the segment at `dir` for appending, creating it if absent.
    /// Any uncommitted suffix left by a crashed writer is truncated away.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        let docs_path = dir.join(DOCS_FILE);
        let manifest = match read_manifest(&dir) {
            Ok(manifest) => manifest,
            Err(RepairError::Io(err)) if err.kind() == std::io::ErrorKind::NotFound => {
                let manifest = Manifest::default();
                if !docs_path.exists() {
                    File::create(&docs_path)?.sync_all()?;
                }
                write_manifest(&dir, &manifest)?;
                manifest
            }
            Err(err) => return Err(err),
        };

        let log = fs::read(&docs_path)?;
        let offsets = scan_log(&log, manifest.doc_count)?;
        let committed_len = match offsets.last() {
            Some(&offset) => {
                let header = RecordHeader::from_bytes(&log[offset as usize..])?;
                offset + header.record_length() as u64
            }
            None => 0,
        };
        if committed_len < log.len() as u64 {
            let file = OpenOptions::new().write(true).open(&docs_path)?;
            file.set_len(committed_len)?;
            file.sync_all()?;
        }

        let file = OpenOptions::new().append(true).open(&docs_path)?;
        Ok(Self {
            dir,
            file,
            manifest,
            pending: 0,
        })
    }

    /// Appends a document to the log. Invisible until commit.
    pub fn add_document(&mut self, doc: &Document) -> Result<()> {
        let record = encode_record(RecordKind::Document, &doc.encode());
        self.file.write_all(&record)?;
        self.pending += 1;
        Ok(())
    }

    /// Makes all appended documents durable and visible: fsync the log,
    /// then swap in a manifest with the raised document count.
    pub fn commit(&mut self) -> Result<()> {
        if self.pending == 0 {
            return Ok(());
        }
        self.file.sync_all()?;
        self.manifest.doc_count += self.pending;
        write_manifest(&self.dir, &self.manifest)?;
        trace!(
            segment = %self.dir.display(),
            appended = self.pending,
            max_doc = self.manifest.doc_count,
            "segment.writer.commit"
        );
        self.pending = 0;
        Ok(())
    }
}
