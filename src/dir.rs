//! The packed entry list inside a directory's datablock.
//!
//! Entries keep insertion order. `.` and `..` are always the first two.
//! The physical bound is the datablock (`DATA_CAPACITY / ENTRY_WIDTH`
//! entries); the superblock's `max_dir_entries` is enforced on top of it.

use log::debug;

use crate::{
    error::{CfsError, CfsResult},
    models::{DirEntry, Node, NodeId, Superblock},
    DATA_CAPACITY, ENTRY_WIDTH, NAME_CAPACITY,
};

fn entries_of(dir: &Node) -> CfsResult<&[DirEntry]> {
    dir.entries()
        .ok_or_else(|| CfsError::NotADirectory(dir.name.clone()))
}

/// Check a user-supplied entry name.
pub fn validate_name(name: &str, sb: &Superblock) -> CfsResult<()> {
    if name.is_empty() || name == "." || name == ".." || name.contains(|c: char| c == '/' || c == '\0') {
        return Err(CfsError::InvalidName(name.to_string()));
    }
    let max = sb.name_limit();
    if name.len() > max {
        return Err(CfsError::NameTooLong {
            name: name.to_string(),
            max,
        });
    }
    Ok(())
}

/// First entry called `name`, with its position.
pub fn find_entry(dir: &Node, name: &str) -> CfsResult<Option<(NodeId, usize)>> {
    Ok(entries_of(dir)?
        .iter()
        .enumerate()
        .find(|(_, e)| e.name == name)
        .map(|(index, e)| (e.node_id, index)))
}

pub fn ensure_absent(dir: &Node, name: &str) -> CfsResult<()> {
    match find_entry(dir, name)? {
        Some(_) => Err(CfsError::AlreadyExists(name.to_string())),
        None => Ok(()),
    }
}

/// Fails with `DirectoryFull` unless one more entry fits.
pub fn check_room(dir: &Node, sb: &Superblock) -> CfsResult<()> {
    let count = entries_of(dir)?.len();
    if (count + 1) * ENTRY_WIDTH > DATA_CAPACITY || count + 1 > sb.entry_limit() {
        return Err(CfsError::DirectoryFull);
    }
    Ok(())
}

/// Pack a new entry after the existing ones.
pub fn append_entry(dir: &mut Node, child: NodeId, name: &str, sb: &Superblock) -> CfsResult<()> {
    if name.len() > NAME_CAPACITY {
        return Err(CfsError::NameTooLong {
            name: name.to_string(),
            max: NAME_CAPACITY,
        });
    }
    check_room(dir, sb)?;
    let dir_id = dir.id;
    dir.entries_mut()
        .ok_or_else(|| CfsError::NotADirectory(name.to_string()))?
        .push(DirEntry::new(child, name));
    debug!("dir {}: appended `{}` -> {}", dir_id, name, child);
    Ok(())
}

/// Drop the entry at `index`; later entries shift left by one.
pub fn remove_entry(dir: &mut Node, index: usize) -> CfsResult<DirEntry> {
    let dir_id = dir.id;
    let entries = dir
        .entries_mut()
        .ok_or_else(|| CfsError::NotADirectory(format!("node {}", dir_id)))?;
    if index >= entries.len() {
        return Err(CfsError::NotFound(format!("entry {} of dir {}", index, dir_id)));
    }
    let removed = entries.remove(index);
    debug!("dir {}: removed `{}`", dir_id, removed.name);
    Ok(removed)
}

/// Snapshot in storage order.
pub fn list_entries(dir: &Node) -> CfsResult<Vec<DirEntry>> {
    Ok(entries_of(dir)?.to_vec())
}

/// Holds nothing but `.` and `..`.
pub fn is_empty(dir: &Node) -> CfsResult<bool> {
    Ok(entries_of(dir)?.iter().all(DirEntry::is_dot))
}
