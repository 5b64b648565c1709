//! Access to the bytes of registered disks: block reads, full dumps and
//! in-place re-zeroing.

pub mod render;

use crate::{
    catalog::{Catalog, CatalogEntry},
    disk::{allocator, BlockDevice, BlockIndex, FileDisk},
    error::{DiskError, Result},
};

pub use render::{write_dump, DumpFlags, DumpFormat, DumpSummary};

/// Content operations resolved through a catalog.
#[derive(Debug, Clone, Copy)]
pub struct DiskContent<'a> {
    catalog: &'a Catalog,
}

impl<'a> DiskContent<'a> {
    pub fn new(catalog: &'a Catalog) -> Self {
        Self { catalog }
    }

    fn resolve(&self, name: &str) -> Result<CatalogEntry> {
        self.catalog
            .lookup(name)?
            .ok_or_else(|| DiskError::NameNotFound(name.to_string()))
    }

    /// Reads block `index` of disk `name`.
    pub fn read_block(&self, name: &str, index: BlockIndex) -> Result<Vec<u8>> {
        let entry = self.resolve(name)?;
        entry.geometry.check_index(index)?;

        let mut disk = FileDisk::open(&entry.storage_path, entry.geometry)?;
        let mut buf = vec![0u8; entry.geometry.block_len()];
        disk.read_block(index, &mut buf)?;
        Ok(buf)
    }

    /// Every block of `name` in order, read one at a time as the iterator
    /// advances. Calling it again starts over from block 0.
    pub fn dump_all(&self, name: &str) -> Result<BlockDump> {
        let entry = self.resolve(name)?;
        let disk = FileDisk::open(&entry.storage_path, entry.geometry)?;
        Ok(BlockDump {
            entry,
            disk,
            next: 0,
        })
    }

    /// Zeroes every block of `name`. Geometry and catalog entry are untouched.
    pub fn format(&self, name: &str) -> Result<()> {
        self.format_with_progress(name, |_, _| {})
    }

    /// Same as [`format`](Self::format), reporting `(blocks_done, block_count)`.
    ///
    /// Not atomic: a failure at block `k` leaves blocks `0..k` zeroed and the
    /// rest as they were.
    pub fn format_with_progress<F>(&self, name: &str, mut progress: F) -> Result<()>
    where
        F: FnMut(u64, u64),
    {
        let entry = self.resolve(name)?;
        let mut disk = FileDisk::open_writable(&entry.storage_path, entry.geometry)?;
        let count = entry.geometry.block_count();

        for index in 0..count {
            allocator::zero_block(&mut disk, index)?;
            progress(index + 1, count);
        }
        disk.sync()?;

        tracing::info!(name, blocks = count, "disk formatted");
        Ok(())
    }
}

/// Lazy iterator over `(block_index, bytes)` of one disk.
///
/// Stops after the first error.
#[derive(Debug)]
pub struct BlockDump {
    entry: CatalogEntry,
    disk: FileDisk,
    next: BlockIndex,
}

impl BlockDump {
    pub fn entry(&self) -> &CatalogEntry {
        &self.entry
    }
}

impl Iterator for BlockDump {
    type Item = Result<(BlockIndex, Vec<u8>)>;

    fn next(&mut self) -> Option<Self::Item> {
        let count = self.entry.geometry.block_count();
        if self.next >= count {
            return None;
        }
        let index = self.next;
        let mut buf = vec![0u8; self.entry.geometry.block_len()];
        match self.disk.read_block(index, &mut buf) {
            Ok(()) => {
                self.next += 1;
                Some(Ok((index, buf)))
            }
            Err(e) => {
                self.next = count;
                Some(Err(e))
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.entry.geometry.block_count() - self.next;
        match usize::try_from(left) {
            Ok(n) => (n, Some(n)),
            Err(_) => (usize::MAX, None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::WorkspaceConfig, disk::VirtualDiskGeometry};

    fn setup(name: &str, count: u64, size: u64) -> (tempfile::TempDir, Catalog, CatalogEntry) {
        let dir = tempfile::tempdir().unwrap();
        let catalog = Catalog::new(&WorkspaceConfig::new(dir.path()));
        let geometry = VirtualDiskGeometry::new(count, size).unwrap();
        let entry = catalog.new_entry(name, geometry).unwrap();
        allocator::create(&geometry, &entry.storage_path).unwrap();
        catalog.register(&entry).unwrap();
        (dir, catalog, entry)
    }

    #[test]
    fn read_block_checks_name_and_range() {
        let (_dir, catalog, _) = setup("alpha", 10, 4);
        let content = DiskContent::new(&catalog);

        assert_eq!(content.read_block("alpha", 3).unwrap(), vec![0u8; 4]);
        assert!(matches!(
            content.read_block("alpha", 10),
            Err(DiskError::BlockIndexOutOfRange { .. })
        ));
        assert!(matches!(
            content.read_block("ghost", 0),
            Err(DiskError::NameNotFound(_))
        ));
    }

    #[test]
    fn dump_is_ordered_and_restartable() {
        let (_dir, catalog, entry) = setup("alpha", 4, 2);
        std::fs::write(&entry.storage_path, [0, 1, 2, 3, 4, 5, 6, 7]).unwrap();
        let content = DiskContent::new(&catalog);

        for _ in 0..2 {
            let dump = content.dump_all("alpha").unwrap();
            assert_eq!(dump.entry(), &entry);
            assert_eq!(dump.size_hint(), (4, Some(4)));
            let blocks: Vec<_> = dump
                .collect::<Result<_>>()
                .unwrap();
            assert_eq!(
                blocks,
                vec![
                    (0, vec![0, 1]),
                    (1, vec![2, 3]),
                    (2, vec![4, 5]),
                    (3, vec![6, 7])
                ]
            );
        }
    }

    #[test]
    fn format_zeroes_without_touching_the_catalog() {
        let (_dir, catalog, entry) = setup("alpha", 3, 4);
        std::fs::write(&entry.storage_path, [0xFFu8; 12]).unwrap();
        let before = std::fs::read(catalog.path()).unwrap();

        let mut seen = Vec::new();
        DiskContent::new(&catalog)
            .format_with_progress("alpha", |done, total| seen.push((done, total)))
            .unwrap();

        assert_eq!(std::fs::read(&entry.storage_path).unwrap(), vec![0u8; 12]);
        assert_eq!(std::fs::read(catalog.path()).unwrap(), before);
        assert_eq!(seen, vec![(1, 3), (2, 3), (3, 3)]);
    }

    #[test]
    fn length_mismatch_surfaces_as_corruption() {
        let (_dir, catalog, entry) = setup("alpha", 3, 4);
        std::fs::write(&entry.storage_path, [0u8; 11]).unwrap();
        let content = DiskContent::new(&catalog);

        assert!(matches!(
            content.read_block("alpha", 0),
            Err(DiskError::CorruptBackingStore { .. })
        ));
        assert!(matches!(
            content.format("alpha"),
            Err(DiskError::CorruptBackingStore { .. })
        ));
        assert!(matches!(
            content.dump_all("alpha"),
            Err(DiskError::CorruptBackingStore { .. })
        ));
    }
}
