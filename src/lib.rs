//! CFS: a complete miniature filesystem stored in one host file.
//!
//! A container is a superblock followed by a table of fixed-size node
//! records. Node `n` lives at `SUPERBLOCK_SIZE + n * NODE_SIZE`; node 0 is
//! the root directory. Each node carries a fixed datablock that holds either
//! the bytes of a file or the packed `(child id, name)` entries of a
//! directory.
//!
//! ```no_run
//! use cfs::{Container, FormatConfig};
//!
//! let mut fs = Container::create("disk.cfs", &FormatConfig::default())?;
//! fs.make_directory("/docs")?;
//! fs.write_file("/docs/readme", b"hello")?;
//! assert_eq!(fs.read_file("/docs/readme")?, b"hello");
//! fs.close()?;
//! # Ok::<(), cfs::CfsError>(())
//! ```

// Record layout
pub mod codec;
pub mod models;

// Storage and session
pub mod config;
pub mod container;
pub mod device;
pub mod error;

// Engine
mod allocator;
pub mod dir;
pub mod ops;
pub mod path;

#[cfg(test)]
mod cfs_test;

pub use config::FormatConfig;
pub use container::Container;
pub use device::{BlockDevice, FileDevice, MemDevice};
pub use error::{CfsError, CfsResult};
pub use models::{DirEntry, Node, NodeBody, NodeId, NodeKind, NodeStat, Superblock};
pub use ops::{Confirm, ListEntry, ListFlags, TouchFlags};
pub use path::Location;

/// Bytes reserved for a name, in node records and directory entries.
pub const NAME_CAPACITY: usize = 50;

/// Bytes in the datablock of every node.
pub const DATA_CAPACITY: usize = 1000;

/// Width of one packed directory entry: child id plus name.
pub const ENTRY_WIDTH: usize = 4 + NAME_CAPACITY;

pub const SUPERBLOCK_SIZE: usize = 6 * 4;

pub const NODE_SIZE: usize = 1 + 4 + NAME_CAPACITY + 4 + 4 + 4 + 3 * 8 + 4 + DATA_CAPACITY;

pub const ROOT_ID: NodeId = 0;

/// "CFS1" read as a little-endian u32.
pub const CFS_MAGIC: u32 = 0x3153_4643;

pub const LAYOUT_VERSION: u32 = 1;

#[macro_export]
macro_rules! u32 {
    ($x:expr) => {{
        let mut raw = [0u8; 4];
        raw.copy_from_slice($x);
        u32::from_le_bytes(raw)
    }};
}

#[macro_export]
macro_rules! i32 {
    ($x:expr) => {{
        let mut raw = [0u8; 4];
        raw.copy_from_slice($x);
        i32::from_le_bytes(raw)
    }};
}

#[macro_export]
macro_rules! i64 {
    ($x:expr) => {{
        let mut raw = [0u8; 8];
        raw.copy_from_slice($x);
        i64::from_le_bytes(raw)
    }};
}
