use std::{
    fs::{File, OpenOptions},
    io::{self, Read, Seek, SeekFrom, Write},
    path::{Path, PathBuf},
};

use crate::{
    disk::{
        block_device::BlockDevice,
        types::{BlockIndex, VirtualDiskGeometry},
    },
    error::{DiskError, IoResultExt, Result},
};

/// An opened backing store.
///
/// Opening checks the file length against the geometry, so a `FileDisk`
/// always starts out describing a file of exactly `total_bytes`.
#[derive(Debug)]
pub struct FileDisk {
    path: PathBuf,
    file: File,
    geometry: VirtualDiskGeometry,
}

impl FileDisk {
    pub fn open(path: &Path, geometry: VirtualDiskGeometry) -> Result<Self> {
        Self::open_with(path, geometry, false)
    }

    pub fn open_writable(path: &Path, geometry: VirtualDiskGeometry) -> Result<Self> {
        Self::open_with(path, geometry, true)
    }

    fn open_with(path: &Path, geometry: VirtualDiskGeometry, write: bool) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(write)
            .open(path)
            .with_context(|| format!("opening backing store {}", path.display()))?;

        let actual = file
            .metadata()
            .with_context(|| format!("reading metadata of {}", path.display()))?
            .len();
        if actual != geometry.total_bytes() {
            tracing::warn!(
                path = %path.display(),
                expected = geometry.total_bytes(),
                actual,
                "backing store length does not match geometry"
            );
            return Err(DiskError::CorruptBackingStore {
                path: path.to_path_buf(),
                expected: geometry.total_bytes(),
                actual,
            });
        }

        Ok(Self {
            path: path.to_path_buf(),
            file,
            geometry,
        })
    }

    pub fn sync(&mut self) -> Result<()> {
        self.file
            .sync_data()
            .with_context(|| format!("syncing {}", self.path.display()))
    }

    fn seek_to(&mut self, index: BlockIndex) -> Result<()> {
        let offset = self.geometry.block_offset(index)?;
        self.file
            .seek(SeekFrom::Start(offset))
            .with_context(|| format!("seeking to block {index} in {}", self.path.display()))?;
        Ok(())
    }

    fn check_buf(&self, len: usize) -> Result<()> {
        if len != self.geometry.block_len() {
            return Err(DiskError::Io {
                context: format!("block buffer for {}", self.path.display()),
                source: io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!(
                        "buffer is {len} bytes, block size is {}",
                        self.geometry.block_size()
                    ),
                ),
            });
        }
        Ok(())
    }

    fn short_read(&self) -> DiskError {
        let actual = self
            .file
            .metadata()
            .map(|m| m.len())
            .unwrap_or_default();
        DiskError::CorruptBackingStore {
            path: self.path.clone(),
            expected: self.geometry.total_bytes(),
            actual,
        }
    }
}

impl BlockDevice for FileDisk {
    fn geometry(&self) -> VirtualDiskGeometry {
        self.geometry
    }

    fn read_block(&mut self, index: BlockIndex, buf: &mut [u8]) -> Result<()> {
        self.check_buf(buf.len())?;
        self.seek_to(index)?;
        match self.file.read_exact(buf) {
            Ok(()) => Ok(()),
            // The file shrank underneath us after open.
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Err(self.short_read()),
            Err(e) => Err(e).with_context(|| {
                format!("reading block {index} from {}", self.path.display())
            }),
        }
    }

    fn write_block(&mut self, index: BlockIndex, buf: &[u8]) -> Result<()> {
        self.check_buf(buf.len())?;
        self.seek_to(index)?;
        self.file
            .write_all(buf)
            .with_context(|| format!("writing block {index} to {}", self.path.display()))
    }
}
