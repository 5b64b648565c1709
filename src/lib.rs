//! Virtual block-storage disks backed by host files, and the catalog that
//! keeps track of them.
//!
//! - [`disk`]: geometry, zero-filled allocation and block I/O on a backing file
//! - [`catalog`]: the durable name → geometry registry (`general.sfs`)
//! - [`content`]: reading, dumping and re-zeroing registered disks
//! - [`manager`]: the command-level operations composed from the above
//! - [`shell`]: command parsing and the interactive prompt

pub mod catalog;
pub mod config;
pub mod content;
pub mod disk;
pub mod error;
pub mod manager;
pub mod shell;
pub mod utils;

pub use catalog::{Catalog, CatalogEntry};
pub use config::WorkspaceConfig;
pub use content::DiskContent;
pub use disk::VirtualDiskGeometry;
pub use error::{DiskError, Result};
pub use manager::DiskManager;
