use crate::{
    disk::types::{BlockIndex, VirtualDiskGeometry},
    error::Result,
};

/// Block-addressed storage. Buffers passed in must be exactly one block long.
pub trait BlockDevice {
    fn geometry(&self) -> VirtualDiskGeometry;
    fn read_block(&mut self, index: BlockIndex, buf: &mut [u8]) -> Result<()>;
    fn write_block(&mut self, index: BlockIndex, buf: &[u8]) -> Result<()>;
}
