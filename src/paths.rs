//! Index directory layout under a graph store root.
//!
//! The layout is a compatibility surface with the surrounding graph store
//! and must be reproduced bit-for-bit:
//!
//! ```text
//! <root>/index/lucene/node/<indexName>/
//! <root>/index/lucene/relationship/<indexName>/
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{RepairError, Result};

const INDEX_DIR: &str = "index";
const PROVIDER_DIR: &str = "lucene";
const NODE_DIR: &str = "node";
const RELATIONSHIP_DIR: &str = "relationship";

/// Metadata file present in every valid graph store root.
pub const STORE_METADATA_FILE: &str = "neostore";

/// Resolves per-index segment directories under a graph store root.
pub struct IndexPaths {
    root: PathBuf,
}

impl IndexPaths {
    /// Locator rooted at `<root>/index/lucene`.
    pub fn from_root(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().join(INDEX_DIR).join(PROVIDER_DIR),
        }
    }

    /// Segment directory of the node index named `name`.
    pub fn for_node(&self, name: &str) -> PathBuf {
        self.root.join(NODE_DIR).join(name)
    }

    /// Segment directory of the relationship index named `name`.
    pub fn for_relationship(&self, name: &str) -> PathBuf {
        self.root.join(RELATIONSHIP_DIR).join(name)
    }

    /// Existing node index directories. A missing namespace directory means
    /// no indexes, not an error.
    pub fn node_indexes(&self) -> Result<Vec<PathBuf>> {
        list_index_dirs(&self.root.join(NODE_DIR))
    }

    /// Existing relationship index directories.
    pub fn relationship_indexes(&self) -> Result<Vec<PathBuf>> {
        list_index_dirs(&self.root.join(RELATIONSHIP_DIR))
    }
}

fn list_index_dirs(namespace: &Path) -> Result<Vec<PathBuf>> {
    if !namespace.is_dir() {
        return Ok(Vec::new());
    }
    let mut dirs = Vec::new();
    for entry in fs::read_dir(namespace)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            dirs.push(entry.path());
        }
    }
    dirs.sort();
    Ok(dirs)
}

/// Checks that `root` is a directory carrying the store metadata file.
/// Runs before any segment I/O; failures here are usage errors.
pub fn ensure_store_root(root: impl AsRef<Path>) -> Result<()> {
    let root = root.as_ref();
    if !root.is_dir() || !root.join(STORE_METADATA_FILE).is_file() {
        return Err(RepairError::InvalidStoreRoot(root.to_path_buf()));
    }
    Ok(())
}
