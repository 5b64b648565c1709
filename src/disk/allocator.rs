//! Provisioning of zero-filled backing stores.
//!
//! A new store is written to a hidden `.partial` sibling first and only
//! linked onto its final name once every byte is on disk, so a crash or a
//! failed write never leaves a half-initialized file under a disk's name.

use std::{
    fs::{self, OpenOptions},
    io::{self, Write},
    path::{Path, PathBuf},
};

use uuid::Uuid;

use crate::{
    disk::{
        block_device::BlockDevice,
        types::{BlockIndex, VirtualDiskGeometry},
    },
    error::{DiskError, IoResultExt, Result},
};

/// Upper bound on the zero buffer used while filling a new store.
pub const ZERO_CHUNK: u64 = 64 * 1024;

/// Creates a zero-filled backing store of exactly `geometry.total_bytes()`.
pub fn create(geometry: &VirtualDiskGeometry, destination: &Path) -> Result<()> {
    create_with_progress(geometry, destination, |_, _| {})
}

/// Same as [`create`], reporting `(bytes_written, total_bytes)` after each chunk.
pub fn create_with_progress<F>(
    geometry: &VirtualDiskGeometry,
    destination: &Path,
    mut progress: F,
) -> Result<()>
where
    F: FnMut(u64, u64),
{
    if destination.symlink_metadata().is_ok() {
        return Err(DiskError::AlreadyExists(destination.to_path_buf()));
    }

    let partial = PartialFile::create(destination)?;
    let total = geometry.total_bytes();
    tracing::debug!(
        path = %partial.path.display(),
        total,
        "zero-filling backing store"
    );

    let mut file = &partial.file;
    let chunk = vec![0u8; total.min(ZERO_CHUNK) as usize];
    let mut written = 0u64;
    while written < total {
        let len = (total - written).min(chunk.len() as u64) as usize;
        file.write_all(&chunk[..len])
            .with_context(|| format!("zero-filling {}", partial.path.display()))?;
        written += len as u64;
        progress(written, total);
    }
    file.sync_all()
        .with_context(|| format!("syncing {}", partial.path.display()))?;

    partial.publish(destination)?;
    tracing::info!(
        path = %destination.display(),
        block_count = geometry.block_count(),
        block_size = geometry.block_size(),
        "backing store created"
    );
    Ok(())
}

/// Overwrites block `index` with zeros.
pub fn zero_block<D: BlockDevice + ?Sized>(device: &mut D, index: BlockIndex) -> Result<()> {
    let geometry = device.geometry();
    geometry.check_index(index)?;
    let zeros = vec![0u8; geometry.block_len()];
    device.write_block(index, &zeros)
}

/// An in-progress store. Removed on drop unless published.
struct PartialFile {
    path: PathBuf,
    file: fs::File,
    published: bool,
}

impl PartialFile {
    fn create(destination: &Path) -> Result<Self> {
        let name = destination.file_name().ok_or_else(|| DiskError::Io {
            context: format!("creating {}", destination.display()),
            source: io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"),
        })?;
        let dir = destination.parent().unwrap_or_else(|| Path::new("."));
        let path = dir.join(format!(
            ".{}.{}.partial",
            name.to_string_lossy(),
            Uuid::new_v4().simple()
        ));

        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .with_context(|| format!("creating {}", path.display()))?;

        Ok(Self {
            path,
            file,
            published: false,
        })
    }

    /// Links the finished file onto `destination`, failing if it already exists.
    fn publish(mut self, destination: &Path) -> Result<()> {
        match fs::hard_link(&self.path, destination) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                return Err(DiskError::AlreadyExists(destination.to_path_buf()));
            }
            Err(e) => {
                return Err(e).with_context(|| format!("publishing {}", destination.display()));
            }
        }
        self.published = true;
        if let Err(e) = fs::remove_file(&self.path) {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to remove staging file");
        }
        Ok(())
    }
}

impl Drop for PartialFile {
    fn drop(&mut self) {
        if !self.published {
            if let Err(e) = fs::remove_file(&self.path) {
                tracing::warn!(path = %self.path.display(), error = %e, "failed to remove partial backing store");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::disk::FileDisk;

    // RLIMIT_FSIZE is per process; tests writing past 100 KB hold this.
    static FILE_SIZE_LIMIT: Mutex<()> = Mutex::new(());

    #[test]
    fn creates_exact_length_all_zero() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("alpha");
        let geometry = VirtualDiskGeometry::new(10, 4).unwrap();

        create(&geometry, &path).unwrap();

        let bytes = fs::read(&path).unwrap();
        assert_eq!(bytes.len(), 40);
        assert!(bytes.iter().all(|b| *b == 0));
    }

    #[test]
    fn existing_destination_is_not_truncated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("alpha");
        fs::write(&path, b"keep me").unwrap();
        let geometry = VirtualDiskGeometry::new(10, 4).unwrap();

        let err = create(&geometry, &path).unwrap_err();
        assert!(matches!(err, DiskError::AlreadyExists(_)));
        assert_eq!(fs::read(&path).unwrap(), b"keep me");
    }

    #[test]
    fn no_staging_files_are_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        let geometry = VirtualDiskGeometry::new(3, 5).unwrap();
        create(&geometry, &dir.path().join("a")).unwrap();
        let _ = create(&geometry, &dir.path().join("a"));

        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, vec!["a".to_string()]);
    }

    #[test]
    fn missing_parent_directory_is_io_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope").join("alpha");
        let geometry = VirtualDiskGeometry::new(1, 1).unwrap();
        assert!(matches!(
            create(&geometry, &path),
            Err(DiskError::Io { .. })
        ));
    }

    #[test]
    fn progress_reaches_total_in_bounded_chunks() {
        let _limit = FILE_SIZE_LIMIT.lock().unwrap_or_else(|e| e.into_inner());
        let dir = tempfile::tempdir().unwrap();
        let geometry = VirtualDiskGeometry::new(3, ZERO_CHUNK).unwrap();
        let mut calls = Vec::new();

        create_with_progress(&geometry, &dir.path().join("big"), |done, total| {
            calls.push((done, total))
        })
        .unwrap();

        assert_eq!(calls.len(), 3);
        assert_eq!(calls.last(), Some(&(3 * ZERO_CHUNK, 3 * ZERO_CHUNK)));
    }

    #[cfg(unix)]
    #[test]
    fn failed_fill_leaves_nothing_behind() {
        let _limit = FILE_SIZE_LIMIT.lock().unwrap_or_else(|e| e.into_inner());
        let dir = tempfile::tempdir().unwrap();
        let geometry = VirtualDiskGeometry::new(1000, 1000).unwrap();

        let mut saved = libc::rlimit {
            rlim_cur: 0,
            rlim_max: 0,
        };
        // SAFETY: plain syscalls on process state, restored below.
        let handler = unsafe {
            assert_eq!(libc::getrlimit(libc::RLIMIT_FSIZE, &mut saved), 0);
            let limited = libc::rlimit {
                rlim_cur: saved.rlim_max.min(100_000),
                rlim_max: saved.rlim_max,
            };
            let handler = libc::signal(libc::SIGXFSZ, libc::SIG_IGN);
            assert_eq!(libc::setrlimit(libc::RLIMIT_FSIZE, &limited), 0);
            handler
        };

        let result = create(&geometry, &dir.path().join("big"));

        // SAFETY: as above.
        unsafe {
            libc::setrlimit(libc::RLIMIT_FSIZE, &saved);
            libc::signal(libc::SIGXFSZ, handler);
        }

        assert!(matches!(result, Err(DiskError::Io { .. })), "{result:?}");
        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert!(leftovers.is_empty(), "{leftovers:?}");
    }

    #[test]
    fn zero_block_clears_only_that_block() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("alpha");
        fs::write(&path, [0xAAu8; 12]).unwrap();
        let geometry = VirtualDiskGeometry::new(3, 4).unwrap();
        let mut disk = FileDisk::open_writable(&path, geometry).unwrap();

        zero_block(&mut disk, 1).unwrap();
        assert!(matches!(
            zero_block(&mut disk, 3),
            Err(DiskError::BlockIndexOutOfRange { .. })
        ));

        let bytes = fs::read(&path).unwrap();
        assert_eq!(&bytes[0..4], &[0xAA; 4]);
        assert_eq!(&bytes[4..8], &[0; 4]);
        assert_eq!(&bytes[8..12], &[0xAA; 4]);
    }
}
