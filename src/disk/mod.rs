pub mod allocator;
pub mod block_device;
pub mod file_disk;
pub mod types;

pub use allocator::{create, create_with_progress, zero_block};
pub use block_device::BlockDevice;
pub use file_disk::FileDisk;
pub use types::{BlockIndex, VirtualDiskGeometry, DEFAULT_BLOCK_COUNT, DEFAULT_BLOCK_SIZE};
