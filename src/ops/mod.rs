//! Filesystem operations on an open container.
//!
//! Id-level operations (`create_directory`, `remove_entity`, ...) work on
//! node ids; the path-level ones (`make_directory`, `touch`, `remove`, ...)
//! resolve paths against the working directory first. Every operation is a
//! sequence of whole-record writes with no rollback: an I/O failure halfway
//! can leave a node allocated but not linked into its parent.

mod create;
mod host;
mod list;
mod relocate;
mod remove;
mod touch;

pub use list::{ListEntry, ListFlags, Listing};
pub use remove::Confirm;
pub use touch::TouchFlags;
