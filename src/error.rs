use std::{io, path::PathBuf};

use thiserror::Error;

/// Errors raised by the allocator, the catalog and disk content access.
#[derive(Debug, Error)]
pub enum DiskError {
    #[error("invalid geometry {block_count}x{block_size}: {reason}")]
    InvalidGeometry {
        block_count: u64,
        block_size: u64,
        reason: &'static str,
    },

    #[error("invalid disk name {name:?}: {reason}")]
    InvalidName { name: String, reason: &'static str },

    /// The backing store path is already taken.
    #[error("backing store already exists: {}", .0.display())]
    AlreadyExists(PathBuf),

    /// The catalog already has an entry with this name.
    #[error("disk '{0}' is already registered")]
    DuplicateName(String),

    #[error("disk '{0}' is not registered")]
    NameNotFound(String),

    #[error("block index {index} out of range (disk has {block_count} blocks)")]
    BlockIndexOutOfRange { index: u64, block_count: u64 },

    #[error("corrupt catalog {}: {reason}", .path.display())]
    CorruptCatalog { path: PathBuf, reason: String },

    /// File length on disk disagrees with the registered geometry.
    #[error(
        "corrupt backing store {}: expected {expected} bytes, found {actual}",
        .path.display()
    )]
    CorruptBackingStore {
        path: PathBuf,
        expected: u64,
        actual: u64,
    },

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },
}

pub type Result<T> = std::result::Result<T, DiskError>;

/// Attaches an operation description to a raw I/O failure.
pub trait IoResultExt<T> {
    fn context<C: Into<String>>(self, context: C) -> Result<T>;

    fn with_context<C: Into<String>, F: FnOnce() -> C>(self, f: F) -> Result<T>;
}

impl<T> IoResultExt<T> for io::Result<T> {
    fn context<C: Into<String>>(self, context: C) -> Result<T> {
        self.map_err(|source| DiskError::Io {
            context: context.into(),
            source,
        })
    }

    fn with_context<C: Into<String>, F: FnOnce() -> C>(self, f: F) -> Result<T> {
        self.map_err(|source| DiskError::Io {
            context: f().into(),
            source,
        })
    }
}
