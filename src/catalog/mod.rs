//! The disk catalog: a single file of fixed-width records, one per disk,
//! in registration order.
//!
//! Writers take an exclusive lock for the whole read-check-append sequence.
//! Readers take a shared lock and only ever see whole records. Nothing is
//! cached between calls.

pub mod lock;
pub mod record;

use std::{
    fs::{File, OpenOptions},
    io::{self, Read, Seek, SeekFrom, Write},
    path::{Path, PathBuf},
};

use crate::{
    config::WorkspaceConfig,
    disk::VirtualDiskGeometry,
    error::{DiskError, IoResultExt, Result},
};

pub use lock::{CatalogLock, LockMode};
pub use record::{validate_name, CatalogEntry, RECORD_SIZE};

#[derive(Debug, Clone)]
pub struct Catalog {
    workspace: WorkspaceConfig,
}

impl Catalog {
    pub fn new(workspace: &WorkspaceConfig) -> Self {
        Self {
            workspace: workspace.clone(),
        }
    }

    pub fn path(&self) -> PathBuf {
        self.workspace.catalog_path()
    }

    /// Builds an entry for `name` whose backing file lives in this workspace.
    pub fn new_entry(&self, name: &str, geometry: VirtualDiskGeometry) -> Result<CatalogEntry> {
        validate_name(name)?;
        Ok(CatalogEntry::new(
            name,
            geometry,
            self.workspace.disk_path(name),
        ))
    }

    /// Appends `entry`, rejecting a name that is already registered.
    pub fn register(&self, entry: &CatalogEntry) -> Result<()> {
        let record = record::encode(entry)?;
        let path = self.path();

        let file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(&path)
            .with_context(|| format!("opening catalog {}", path.display()))?;
        let _lock = CatalogLock::acquire(&file, LockMode::Exclusive, &path)?;

        let existing = self.read_entries(&file, &path)?;
        if existing.iter().any(|e| e.name == entry.name) {
            return Err(DiskError::DuplicateName(entry.name.clone()));
        }

        // One write for the whole record, then make it durable before the
        // lock is released.
        (&file)
            .write_all(&record)
            .with_context(|| format!("appending to catalog {}", path.display()))?;
        file.sync_data()
            .with_context(|| format!("syncing catalog {}", path.display()))?;

        tracing::info!(
            name = %entry.name,
            block_count = entry.geometry.block_count(),
            block_size = entry.geometry.block_size(),
            position = existing.len(),
            "disk registered"
        );
        Ok(())
    }

    /// All entries in registration order. A missing catalog is empty.
    pub fn list(&self) -> Result<Vec<CatalogEntry>> {
        let path = self.path();
        let file = match File::open(&path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(e).with_context(|| format!("opening catalog {}", path.display()))
            }
        };
        let _lock = CatalogLock::acquire(&file, LockMode::Shared, &path)?;
        self.read_entries(&file, &path)
    }

    pub fn lookup(&self, name: &str) -> Result<Option<CatalogEntry>> {
        Ok(self.list()?.into_iter().find(|e| e.name == name))
    }

    /// Number of records, derived from the file length alone.
    pub fn record_count(&self) -> Result<u64> {
        let path = self.path();
        let len = match path.metadata() {
            Ok(meta) => meta.len(),
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
            Err(e) => {
                return Err(e).with_context(|| format!("reading metadata of {}", path.display()))
            }
        };
        check_length(&path, len)?;
        Ok(len / RECORD_SIZE as u64)
    }

    fn read_entries(&self, mut file: &File, path: &Path) -> Result<Vec<CatalogEntry>> {
        file.seek(SeekFrom::Start(0))
            .with_context(|| format!("seeking in catalog {}", path.display()))?;
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)
            .with_context(|| format!("reading catalog {}", path.display()))?;
        check_length(path, bytes.len() as u64)?;

        let mut entries = Vec::with_capacity(bytes.len() / RECORD_SIZE);
        for (i, chunk) in bytes.chunks_exact(RECORD_SIZE).enumerate() {
            let mut raw = [0u8; RECORD_SIZE];
            raw.copy_from_slice(chunk);
            let entry = record::decode(&raw, |name| self.workspace.disk_path(name)).map_err(
                |reason| DiskError::CorruptCatalog {
                    path: path.to_path_buf(),
                    reason: format!("record {i}: {reason}"),
                },
            )?;
            entries.push(entry);
        }
        tracing::debug!(path = %path.display(), records = entries.len(), "catalog read");
        Ok(entries)
    }
}

fn check_length(path: &Path, len: u64) -> Result<()> {
    if len % RECORD_SIZE as u64 != 0 {
        tracing::warn!(path = %path.display(), len, "catalog has a partial record");
        return Err(DiskError::CorruptCatalog {
            path: path.to_path_buf(),
            reason: format!("length {len} is not a multiple of the {RECORD_SIZE}-byte record size"),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> (tempfile::TempDir, Catalog) {
        let dir = tempfile::tempdir().unwrap();
        let catalog = Catalog::new(&WorkspaceConfig::new(dir.path()));
        (dir, catalog)
    }

    fn geometry(count: u64, size: u64) -> VirtualDiskGeometry {
        VirtualDiskGeometry::new(count, size).unwrap()
    }

    #[test]
    fn missing_catalog_lists_empty() {
        let (_dir, catalog) = catalog();
        assert!(catalog.list().unwrap().is_empty());
        assert!(catalog.lookup("alpha").unwrap().is_none());
        assert_eq!(catalog.record_count().unwrap(), 0);
    }

    #[test]
    fn register_appends_in_order() {
        let (_dir, catalog) = catalog();
        for (name, count) in [("c", 3), ("a", 1), ("b", 2)] {
            let entry = catalog.new_entry(name, geometry(count, 8)).unwrap();
            catalog.register(&entry).unwrap();
        }

        let names: Vec<_> = catalog.list().unwrap().into_iter().map(|e| e.name).collect();
        assert_eq!(names, ["c", "a", "b"]);
        assert_eq!(catalog.record_count().unwrap(), 3);
        assert_eq!(
            std::fs::metadata(catalog.path()).unwrap().len(),
            3 * RECORD_SIZE as u64
        );
    }

    #[test]
    fn duplicate_name_is_rejected_without_writing() {
        let (_dir, catalog) = catalog();
        let entry = catalog.new_entry("alpha", geometry(10, 4)).unwrap();
        catalog.register(&entry).unwrap();

        let again = catalog.new_entry("alpha", geometry(99, 99)).unwrap();
        assert!(matches!(
            catalog.register(&again),
            Err(DiskError::DuplicateName(name)) if name == "alpha"
        ));
        assert_eq!(catalog.record_count().unwrap(), 1);
        assert_eq!(catalog.lookup("alpha").unwrap().unwrap().geometry, geometry(10, 4));
    }

    #[test]
    fn torn_tail_is_corrupt_for_every_operation() {
        let (_dir, catalog) = catalog();
        let entry = catalog.new_entry("alpha", geometry(10, 4)).unwrap();
        catalog.register(&entry).unwrap();

        let mut file = OpenOptions::new().append(true).open(catalog.path()).unwrap();
        file.write_all(&[1, 2, 3]).unwrap();

        assert!(matches!(catalog.list(), Err(DiskError::CorruptCatalog { .. })));
        assert!(matches!(catalog.record_count(), Err(DiskError::CorruptCatalog { .. })));
        let other = catalog.new_entry("beta", geometry(1, 1)).unwrap();
        assert!(matches!(
            catalog.register(&other),
            Err(DiskError::CorruptCatalog { .. })
        ));
        assert_eq!(
            std::fs::metadata(catalog.path()).unwrap().len(),
            RECORD_SIZE as u64 + 3
        );
    }

    #[test]
    fn lookup_resolves_storage_path_in_workspace() {
        let (dir, catalog) = catalog();
        let entry = catalog.new_entry("disk1", geometry(2, 2)).unwrap();
        catalog.register(&entry).unwrap();

        let found = catalog.lookup("disk1").unwrap().unwrap();
        assert_eq!(found.storage_path, dir.path().join("disk1"));
        assert_eq!(found, entry);
    }

    #[test]
    fn invalid_name_never_reaches_the_file() {
        let (_dir, catalog) = catalog();
        assert!(matches!(
            catalog.new_entry("../escape", geometry(1, 1)),
            Err(DiskError::InvalidName { .. })
        ));
        assert!(!catalog.path().exists());
    }
}
