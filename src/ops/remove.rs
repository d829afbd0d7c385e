use log::debug;

use crate::{
    container::Container,
    device::BlockDevice,
    dir,
    error::{CfsError, CfsResult},
    models::{now, DirEntry, NodeId, NodeKind},
    ROOT_ID,
};

/// Yes/no question asked before each deletion in interactive mode.
pub trait Confirm {
    fn confirm(&mut self, prompt: &str) -> bool;
}

impl<F: FnMut(&str) -> bool> Confirm for F {
    fn confirm(&mut self, prompt: &str) -> bool {
        self(prompt)
    }
}

fn approved(prompt: &mut Option<&mut dyn Confirm>, question: String) -> bool {
    match prompt {
        Some(p) => p.confirm(&question),
        None => true,
    }
}

impl<D: BlockDevice> Container<D> {
    /// Drop one reference to `id`: consume an extra hard link if there is
    /// one, otherwise tombstone the node. The caller owns the parent entry.
    /// The working directory and its ancestors are refused with `Busy`.
    pub fn remove_entity(&self, id: NodeId) -> CfsResult<()> {
        if id == ROOT_ID {
            return Err(CfsError::CannotRemoveRoot);
        }
        let mut node = self.read_live_node(id)?;
        if node.is_dir() && self.is_within(self.cwd, id)? {
            return Err(CfsError::Busy(node.name));
        }
        if node.link_count > 0 {
            node.link_count -= 1;
            debug!("node {}: {} extra links left", id, node.link_count);
        } else {
            node.deleted = true;
            debug!("node {} tombstoned", id);
        }
        self.write_node(&node)
    }

    /// Remove the contents of directory `dir_id`.
    ///
    /// Files are always removed. A sub-directory is emptied first when
    /// `recursive` is set and then removed if it ended up empty; without
    /// `recursive` only already-empty sub-directories go. `.` and `..` are
    /// never touched, and neither is the working directory or any of its
    /// ancestors. With a `prompt`, every deletion must be confirmed.
    ///
    /// Each directory's entry list is compacted and written back once, also
    /// when a child fails halfway: entries already released are dropped
    /// before the error is returned.
    pub fn remove_directory_contents(
        &self,
        dir_id: NodeId,
        recursive: bool,
        mut prompt: Option<&mut dyn Confirm>,
    ) -> CfsResult<()> {
        self.remove_contents(dir_id, recursive, &mut prompt)
    }

    fn remove_contents(
        &self,
        dir_id: NodeId,
        recursive: bool,
        prompt: &mut Option<&mut dyn Confirm>,
    ) -> CfsResult<()> {
        let mut dir_node = self.read_dir_node(dir_id)?;
        let entries = dir::list_entries(&dir_node)?;
        let mut kept = Vec::with_capacity(entries.len());
        let mut failure = None;

        for entry in entries {
            if failure.is_some() || entry.is_dot() {
                kept.push(entry);
                continue;
            }
            match self.remove_child(&entry, recursive, prompt) {
                Ok(true) => {}
                Ok(false) => kept.push(entry),
                Err(e) => {
                    kept.push(entry);
                    failure = Some(e);
                }
            }
        }

        if let Some(entries) = dir_node.entries_mut() {
            if entries.len() != kept.len() {
                debug!("dir {}: {} entries removed", dir_id, entries.len() - kept.len());
                *entries = kept;
                dir_node.modified = now();
                self.write_node(&dir_node)?;
            }
        }
        match failure {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Release one child of a directory being emptied. `Ok(false)` keeps it.
    fn remove_child(
        &self,
        entry: &DirEntry,
        recursive: bool,
        prompt: &mut Option<&mut dyn Confirm>,
    ) -> CfsResult<bool> {
        let child = self.read_live_node(entry.node_id)?;
        let question = match child.kind() {
            NodeKind::File => format!("remove file `{}`?", entry.name),
            NodeKind::Directory => {
                if recursive {
                    self.remove_contents(child.id, true, prompt)?;
                }
                if !dir::is_empty(&self.read_dir_node(child.id)?)? || self.is_within(self.cwd, child.id)? {
                    return Ok(false);
                }
                format!("remove directory `{}`?", entry.name)
            }
        };
        if !approved(prompt, question) {
            return Ok(false);
        }
        self.remove_entity(child.id)?;
        Ok(true)
    }

    /// Drop the entry `name` from `parent` and release its node.
    pub fn unlink(&self, parent: NodeId, name: &str) -> CfsResult<()> {
        let mut parent_node = self.read_dir_node(parent)?;
        let (child, index) = dir::find_entry(&parent_node, name)?
            .ok_or_else(|| CfsError::NotFound(name.to_string()))?;
        if child == ROOT_ID {
            return Err(CfsError::CannotRemoveRoot);
        }
        let child_node = self.read_live_node(child)?;
        if child_node.is_dir() {
            if !dir::is_empty(&child_node)? {
                return Err(CfsError::NotAFile(name.to_string()));
            }
            if self.is_within(self.cwd, child)? {
                return Err(CfsError::Busy(name.to_string()));
            }
        }
        dir::remove_entry(&mut parent_node, index)?;
        parent_node.modified = now();
        self.write_node(&parent_node)?;
        self.remove_entity(child)
    }

    /// `rm`: empty a directory, or unlink a file.
    pub fn remove(&self, path: &str, recursive: bool, prompt: Option<&mut dyn Confirm>) -> CfsResult<()> {
        let loc = self.lookup(path)?;
        match loc.kind {
            NodeKind::Directory => self.remove_directory_contents(loc.node_id, recursive, prompt),
            NodeKind::File => {
                let mut prompt = prompt;
                if approved(&mut prompt, format!("remove file `{}`?", loc.name)) {
                    self.unlink(loc.parent_id, &loc.name)
                } else {
                    Ok(())
                }
            }
        }
    }
}
