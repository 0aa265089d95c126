use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::{RepairError, Result};
use crate::store::{SegmentReader, SegmentWriter, ID_FIELD};

/// Removes one named field from the single document carrying a given entity
/// identifier, by tombstoning the original and appending a rewritten copy.
///
/// The store's documents are immutable, so an edit is tombstone plus
/// reinsert. The tombstone is committed before the write phase opens, which
/// keeps at most one version live at any commit point; a crash between the
/// two commits leaves the entity indexed by neither version until repaired.
#[derive(Debug)]
pub struct FieldSurgeon {
    dir: PathBuf,
}

impl FieldSurgeon {
    /// Binds the operator to the segment at `dir`, verifying it opens as a
    /// document store.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        SegmentReader::open(&dir)?;
        Ok(Self { dir })
    }

    /// Rewrites the document whose identifier field equals the decimal form
    /// of `entity_id`, dropping every field named `field_name` and keeping
    /// the order of the remainder.
    ///
    /// # Errors
    ///
    /// [`RepairError::EntityNotFound`] when no live document carries the
    /// identifier (a document already missing `_id_` is invisible to the
    /// lookup, so an already-damaged target also reports not-found).
    /// [`RepairError::AmbiguousIdentifier`] when more than one does; the
    /// segment is left untouched in both cases.
    pub fn remove_field(&self, entity_id: u64, field_name: &str) -> Result<()> {
        let id_value = entity_id.to_string();
        let mut reader = SegmentReader::open(&self.dir)?;
        let mut hits = reader.search_exact(ID_FIELD, &id_value, 2)?;
        if hits.len() > 1 {
            return Err(RepairError::ambiguous_identifier(entity_id, &self.dir));
        }
        let (position, original) = hits
            .pop()
            .ok_or_else(|| RepairError::entity_not_found(entity_id, &self.dir))?;

        let replacement = original.without_field(field_name);
        reader.delete_document(position)?;
        reader.commit()?;
        drop(reader);

        let mut writer = SegmentWriter::open(&self.dir)?;
        writer.add_document(&replacement)?;
        writer.commit()?;

        info!(
            segment = %self.dir.display(),
            entity_id,
            field = field_name,
            retired_position = position,
            "repair.surgery.replaced"
        );
        Ok(())
    }
}
