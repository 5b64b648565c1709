use crate::error::{DiskError, Result};

/// Default number of blocks for a new disk.
pub const DEFAULT_BLOCK_COUNT: u64 = 1000;

/// Default block size in bytes.
pub const DEFAULT_BLOCK_SIZE: u64 = 32;

/// Zero-based block index within a backing store.
pub type BlockIndex = u64;

/// The fixed shape of a virtual disk.
///
/// A geometry is immutable once a disk is provisioned. The only way to build
/// one is through [`VirtualDiskGeometry::new`], which rejects zero dimensions
/// and sizes whose byte total would not fit a file offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VirtualDiskGeometry {
    block_count: u64,
    block_size: u64,
}

impl VirtualDiskGeometry {
    pub fn new(block_count: u64, block_size: u64) -> Result<Self> {
        let invalid = |reason| DiskError::InvalidGeometry {
            block_count,
            block_size,
            reason,
        };

        if block_count == 0 {
            return Err(invalid("block count must be at least 1"));
        }
        if block_size == 0 {
            return Err(invalid("block size must be at least 1"));
        }

        // File offsets are signed 64-bit on every platform we target.
        let total = block_count
            .checked_mul(block_size)
            .ok_or_else(|| invalid("total size overflows u64"))?;
        if total > i64::MAX as u64 {
            return Err(invalid("total size exceeds the maximum file length"));
        }
        // A block is read into memory whole.
        if usize::try_from(block_size).is_err() {
            return Err(invalid("block size exceeds addressable memory"));
        }

        Ok(Self {
            block_count,
            block_size,
        })
    }

    pub fn block_count(&self) -> u64 {
        self.block_count
    }

    pub fn block_size(&self) -> u64 {
        self.block_size
    }

    /// Block size as an in-memory buffer length.
    pub fn block_len(&self) -> usize {
        // checked in `new`
        self.block_size as usize
    }

    pub fn total_bytes(&self) -> u64 {
        self.block_count * self.block_size
    }

    pub fn check_index(&self, index: BlockIndex) -> Result<()> {
        if index >= self.block_count {
            return Err(DiskError::BlockIndexOutOfRange {
                index,
                block_count: self.block_count,
            });
        }
        Ok(())
    }

    /// Byte offset of the first byte of `index`.
    pub fn block_offset(&self, index: BlockIndex) -> Result<u64> {
        self.check_index(index)?;
        Ok(index * self.block_size)
    }
}

impl Default for VirtualDiskGeometry {
    fn default() -> Self {
        Self {
            block_count: DEFAULT_BLOCK_COUNT,
            block_size: DEFAULT_BLOCK_SIZE,
        }
    }
}
