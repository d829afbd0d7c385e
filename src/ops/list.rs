use bitflags::bitflags;
use serde::Serialize;

use crate::{
    container::Container,
    device::BlockDevice,
    dir,
    error::{CfsError, CfsResult},
    models::{DirEntry, NodeId, NodeStat},
};

bitflags! {
    pub struct ListFlags: u8 {
        /// Include `.` and `..`.
        const ALL = 1 << 0;
        /// Descend into sub-directories.
        const RECURSIVE = 1 << 1;
        /// Callers should print full metadata.
        const LONG = 1 << 2;
        /// Keep storage order instead of sorting by name.
        const UNORDERED = 1 << 3;
        const DIRS_ONLY = 1 << 4;
        /// Only files reachable through more than one entry.
        const LINKS_ONLY = 1 << 5;
    }
}

impl ListFlags {
    /// No option at all means the full-attribute view.
    pub fn or_long_view(self) -> Self {
        if self.is_empty() {
            ListFlags::LONG
        } else {
            self
        }
    }
}

/// One line of a listing.
#[derive(Debug, Clone, Serialize)]
pub struct ListEntry {
    /// 0 for entries of the listed directory itself.
    pub depth: usize,
    /// Name under which the parent lists the entity.
    pub name: String,
    /// Path relative to the listed directory.
    pub path: String,
    pub stat: NodeStat,
}

struct Frame {
    depth: usize,
    prefix: String,
    entries: std::vec::IntoIter<DirEntry>,
}

/// Pre-order walk over a directory, produced lazily.
pub struct Listing<'a, D: BlockDevice> {
    fs: &'a Container<D>,
    flags: ListFlags,
    stack: Vec<Frame>,
}

impl<'a, D: BlockDevice> Listing<'a, D> {
    fn frame(&self, dir_id: NodeId, depth: usize, prefix: String) -> CfsResult<Frame> {
        let mut entries = dir::list_entries(&self.fs.read_dir_node(dir_id)?)?;
        if !self.flags.contains(ListFlags::UNORDERED) {
            entries.sort_by(|a, b| a.name.cmp(&b.name));
        }
        Ok(Frame {
            depth,
            prefix,
            entries: entries.into_iter(),
        })
    }

    fn wanted(&self, entry: &DirEntry, stat: &NodeStat) -> bool {
        if entry.is_dot() && !self.flags.contains(ListFlags::ALL) {
            return false;
        }
        if self.flags.contains(ListFlags::DIRS_ONLY) && !stat.kind.is_dir() {
            return false;
        }
        if self.flags.contains(ListFlags::LINKS_ONLY) && (stat.kind.is_dir() || stat.link_count == 0) {
            return false;
        }
        true
    }
}

impl<'a, D: BlockDevice> Iterator for Listing<'a, D> {
    type Item = CfsResult<ListEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let frame = self.stack.last_mut()?;
            let entry = match frame.entries.next() {
                Some(entry) => entry,
                None => {
                    self.stack.pop();
                    continue;
                }
            };
            let depth = frame.depth;
            let path = format!("{}{}", frame.prefix, entry.name);

            let stat = match self.fs.read_live_node(entry.node_id) {
                Ok(node) => node.stat(),
                Err(e) => return Some(Err(e)),
            };
            if self.flags.contains(ListFlags::RECURSIVE) && stat.kind.is_dir() && !entry.is_dot() {
                match self.frame(entry.node_id, depth + 1, format!("{}/", path)) {
                    Ok(child) => self.stack.push(child),
                    Err(e) => return Some(Err(e)),
                }
            }
            if self.wanted(&entry, &stat) {
                return Some(Ok(ListEntry {
                    depth,
                    name: entry.name,
                    path,
                    stat,
                }));
            }
        }
    }
}

impl<D: BlockDevice> Container<D> {
    /// Entries of `dir_id`, sorted by name unless `UNORDERED`.
    ///
    /// Recursion is pre-order: a directory comes right before its own
    /// contents. The type filters apply to what is yielded, not to what is
    /// descended into.
    pub fn list_directory(&self, dir_id: NodeId, flags: ListFlags) -> CfsResult<Listing<'_, D>> {
        let mut listing = Listing {
            fs: self,
            flags,
            stack: Vec::new(),
        };
        let root = listing.frame(dir_id, 0, String::new())?;
        listing.stack.push(root);
        Ok(listing)
    }

    /// `ls`
    pub fn list(&self, path: &str, flags: ListFlags) -> CfsResult<Listing<'_, D>> {
        let loc = self.lookup(path)?;
        if !loc.kind.is_dir() {
            return Err(CfsError::NotADirectory(path.to_string()));
        }
        self.list_directory(loc.node_id, flags)
    }
}
