//! The operations behind each shell command, wired to one workspace.

use std::io::Write;

use crate::{
    catalog::{Catalog, CatalogEntry},
    config::WorkspaceConfig,
    content::{write_dump, DiskContent, DumpFlags, DumpFormat, DumpSummary},
    disk::{allocator, BlockIndex, FileDisk, VirtualDiskGeometry},
    error::{DiskError, Result},
};

#[derive(Debug, Clone)]
pub struct DiskManager {
    workspace: WorkspaceConfig,
    catalog: Catalog,
}

impl DiskManager {
    pub fn new(workspace: WorkspaceConfig) -> Self {
        let catalog = Catalog::new(&workspace);
        Self { workspace, catalog }
    }

    pub fn workspace(&self) -> &WorkspaceConfig {
        &self.workspace
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn content(&self) -> DiskContent<'_> {
        DiskContent::new(&self.catalog)
    }

    pub fn create_disk(&self, name: &str, block_count: u64, block_size: u64) -> Result<CatalogEntry> {
        self.create_disk_with_progress(name, block_count, block_size, |_, _| {})
    }

    /// Allocates the backing store, then registers it.
    ///
    /// If registration fails the new backing store is removed again, so a
    /// failed create leaves neither a file nor a record behind.
    pub fn create_disk_with_progress<F>(
        &self,
        name: &str,
        block_count: u64,
        block_size: u64,
        progress: F,
    ) -> Result<CatalogEntry>
    where
        F: FnMut(u64, u64),
    {
        let geometry = VirtualDiskGeometry::new(block_count, block_size)?;
        let entry = self.catalog.new_entry(name, geometry)?;

        allocator::create_with_progress(&geometry, &entry.storage_path, progress)?;

        if let Err(e) = self.catalog.register(&entry) {
            tracing::warn!(name, error = %e, "registration failed, removing backing store");
            if let Err(rm) = std::fs::remove_file(&entry.storage_path) {
                tracing::warn!(
                    path = %entry.storage_path.display(),
                    error = %rm,
                    "failed to remove orphaned backing store"
                );
            }
            return Err(e);
        }
        Ok(entry)
    }

    pub fn format_disk(&self, name: &str) -> Result<()> {
        self.content().format(name)
    }

    pub fn format_disk_with_progress<F>(&self, name: &str, progress: F) -> Result<()>
    where
        F: FnMut(u64, u64),
    {
        self.content().format_with_progress(name, progress)
    }

    pub fn list_disks(&self) -> Result<Vec<CatalogEntry>> {
        self.catalog.list()
    }

    /// Looks up `name` and checks its backing store against the geometry.
    pub fn stat_disk(&self, name: &str) -> Result<CatalogEntry> {
        let entry = self
            .catalog
            .lookup(name)?
            .ok_or_else(|| DiskError::NameNotFound(name.to_string()))?;
        FileDisk::open(&entry.storage_path, entry.geometry)?;
        Ok(entry)
    }

    pub fn read_block(&self, name: &str, index: BlockIndex) -> Result<Vec<u8>> {
        self.content().read_block(name, index)
    }

    pub fn cat_disk<W: Write>(
        &self,
        name: &str,
        out: &mut W,
        format: DumpFormat,
        flags: DumpFlags,
    ) -> Result<DumpSummary> {
        let blocks = self.content().dump_all(name)?;
        let entry = blocks.entry();
        tracing::debug!(
            name = %entry.name,
            block_count = entry.geometry.block_count(),
            block_size = entry.geometry.block_size(),
            ?format,
            "dumping disk"
        );
        write_dump(out, blocks, format, flags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> (tempfile::TempDir, DiskManager) {
        let dir = tempfile::tempdir().unwrap();
        let manager = DiskManager::new(WorkspaceConfig::new(dir.path()));
        (dir, manager)
    }

    #[test]
    fn create_allocates_and_registers() {
        let (dir, manager) = manager();
        let entry = manager.create_disk("alpha", 10, 4).unwrap();

        assert_eq!(entry.storage_path, dir.path().join("alpha"));
        assert_eq!(std::fs::metadata(&entry.storage_path).unwrap().len(), 40);
        assert_eq!(manager.list_disks().unwrap(), vec![entry]);
    }

    #[test]
    fn failed_registration_removes_the_new_file() {
        let (dir, manager) = manager();
        manager.create_disk("alpha", 10, 4).unwrap();
        std::fs::remove_file(dir.path().join("alpha")).unwrap();

        let err = manager.create_disk("alpha", 2, 2).unwrap_err();
        assert!(matches!(err, DiskError::DuplicateName(_)));
        assert!(!dir.path().join("alpha").exists());
    }

    #[test]
    fn invalid_input_creates_nothing() {
        let (dir, manager) = manager();
        assert!(matches!(
            manager.create_disk("alpha", 0, 4),
            Err(DiskError::InvalidGeometry { .. })
        ));
        assert!(matches!(
            manager.create_disk("a/b", 1, 4),
            Err(DiskError::InvalidName { .. })
        ));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn stat_reports_missing_and_mismatched_disks() {
        let (dir, manager) = manager();
        assert!(matches!(
            manager.stat_disk("alpha"),
            Err(DiskError::NameNotFound(_))
        ));

        manager.create_disk("alpha", 10, 4).unwrap();
        assert_eq!(manager.stat_disk("alpha").unwrap().geometry.total_bytes(), 40);

        std::fs::write(dir.path().join("alpha"), [0u8; 8]).unwrap();
        assert!(matches!(
            manager.stat_disk("alpha"),
            Err(DiskError::CorruptBackingStore { actual: 8, .. })
        ));
    }

    #[test]
    fn cat_reports_blank_disk() {
        let (_dir, manager) = manager();
        manager.create_disk("alpha", 3, 2).unwrap();

        let mut out = Vec::new();
        let summary = manager
            .cat_disk("alpha", &mut out, DumpFormat::Text, DumpFlags::SQUEEZE)
            .unwrap();
        assert!(summary.is_blank());
        assert_eq!(String::from_utf8(out).unwrap(), "block 0\n..\n*\n");
    }
}
