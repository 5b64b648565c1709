//! Fixed-width catalog records.
//!
//! ```text
//! offset  size  field
//!      0    64  name, UTF-8, NUL padded
//!     64     8  block_count  (u64 LE)
//!     72     8  block_size   (u64 LE)
//!     80     8  created_at   (i64 LE, unix seconds)
//! ```
//!
//! The numeric tail goes through bincode's fixed-int encoding, so it is
//! always exactly [`TAIL_LEN`] bytes.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    disk::VirtualDiskGeometry,
    error::{DiskError, Result},
};

/// Bytes reserved for a disk name.
pub const NAME_LEN: usize = 64;

/// Bytes of the numeric tail.
pub const TAIL_LEN: usize = 24;

/// Size of one catalog record.
pub const RECORD_SIZE: usize = NAME_LEN + TAIL_LEN;

pub type Record = [u8; RECORD_SIZE];

/// One registered disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub name: String,
    pub geometry: VirtualDiskGeometry,
    pub created_at: DateTime<Utc>,
    /// Backing file of the disk. Derived from the workspace, never stored.
    pub storage_path: PathBuf,
}

impl CatalogEntry {
    /// A new entry stamped with the current time (whole seconds).
    pub fn new(name: impl Into<String>, geometry: VirtualDiskGeometry, storage_path: PathBuf) -> Self {
        Self {
            name: name.into(),
            geometry,
            created_at: crate::utils::now_seconds(),
            storage_path,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct RecordTail {
    block_count: u64,
    block_size: u64,
    created_at: i64,
}

/// Checks that `name` can serve as a backing file name and fits a record.
pub fn validate_name(name: &str) -> Result<()> {
    let invalid = |reason| DiskError::InvalidName {
        name: name.to_string(),
        reason,
    };

    if name.is_empty() {
        return Err(invalid("name is empty"));
    }
    if name.len() > NAME_LEN {
        return Err(invalid("name is longer than 64 bytes"));
    }
    if name.contains(['/', '\\', '\0']) {
        return Err(invalid("name contains a path separator or NUL"));
    }
    // Hidden names are used for files still being allocated.
    if name.starts_with('.') {
        return Err(invalid("name must not start with '.'"));
    }
    if name == crate::config::CATALOG_FILE_NAME {
        return Err(invalid("name is reserved for the catalog"));
    }
    Ok(())
}

pub fn encode(entry: &CatalogEntry) -> Result<Record> {
    validate_name(&entry.name)?;

    let tail = RecordTail {
        block_count: entry.geometry.block_count(),
        block_size: entry.geometry.block_size(),
        created_at: entry.created_at.timestamp(),
    };
    let tail = bincode::serialize(&tail).map_err(|e| DiskError::Io {
        context: format!("encoding catalog record for '{}'", entry.name),
        source: std::io::Error::new(std::io::ErrorKind::InvalidData, e),
    })?;
    debug_assert_eq!(tail.len(), TAIL_LEN);

    let mut record = [0u8; RECORD_SIZE];
    record[..entry.name.len()].copy_from_slice(entry.name.as_bytes());
    record[NAME_LEN..].copy_from_slice(&tail);
    Ok(record)
}

/// Decodes one record. `storage_path` maps the decoded name to its backing file.
///
/// The error is a plain description; the catalog wraps it with the file path
/// and record number.
pub fn decode<F>(record: &Record, storage_path: F) -> std::result::Result<CatalogEntry, String>
where
    F: FnOnce(&str) -> PathBuf,
{
    let (name_bytes, tail) = record.split_at(NAME_LEN);

    let end = name_bytes.iter().position(|b| *b == 0).unwrap_or(NAME_LEN);
    if name_bytes[end..].iter().any(|b| *b != 0) {
        return Err("name field has bytes after its terminator".to_string());
    }
    let name = std::str::from_utf8(&name_bytes[..end])
        .map_err(|_| "name is not valid UTF-8".to_string())?;
    validate_name(name).map_err(|e| e.to_string())?;

    let tail: RecordTail =
        bincode::deserialize(tail).map_err(|e| format!("undecodable record tail: {e}"))?;
    let geometry = VirtualDiskGeometry::new(tail.block_count, tail.block_size)
        .map_err(|e| e.to_string())?;
    let created_at = DateTime::from_timestamp(tail.created_at, 0)
        .ok_or_else(|| format!("timestamp {} out of range", tail.created_at))?;

    Ok(CatalogEntry {
        name: name.to_string(),
        geometry,
        created_at,
        storage_path: storage_path(name),
    })
}
