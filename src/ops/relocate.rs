use log::debug;

use crate::{
    container::Container,
    device::BlockDevice,
    dir,
    error::{CfsError, CfsResult},
    models::{now, NodeBody, NodeId},
    ROOT_ID,
};

impl<D: BlockDevice> Container<D> {
    /// Is `node` equal to `ancestor` or somewhere below it?
    pub(crate) fn is_within(&self, node: NodeId, ancestor: NodeId) -> CfsResult<bool> {
        let mut current = node;
        for _ in 0..=self.node_count()? {
            if current == ancestor {
                return Ok(true);
            }
            if current == ROOT_ID {
                return Ok(false);
            }
            current = self.read_live_node(current)?.parent;
        }
        Err(CfsError::InvalidContainer(format!(
            "parent links of node {} form a cycle",
            node
        )))
    }

    /// `mv`: rename `source`, or move it into the directory `dest`.
    ///
    /// The entity keeps its node id, so hard links to it stay valid.
    pub fn move_entity(&self, source: &str, dest: &str) -> CfsResult<()> {
        let src = self.lookup(source)?;
        if src.node_id == ROOT_ID {
            return Err(CfsError::CannotRemoveRoot);
        }
        if src.name == "." || src.name == ".." {
            return Err(CfsError::InvalidName(src.name));
        }
        let (target_parent, name) = self.destination(&src.name, dest)?;
        dir::validate_name(&name, self.superblock())?;
        let mut node = self.read_live_node(src.node_id)?;
        if node.is_dir() && self.is_within(target_parent, src.node_id)? {
            return Err(CfsError::InvalidMove(format!("{} into {}", source, dest)));
        }

        if target_parent == src.parent_id {
            let mut parent = self.read_dir_node(target_parent)?;
            dir::ensure_absent(&parent, &name)?;
            let (_, index) = dir::find_entry(&parent, &src.name)?
                .ok_or_else(|| CfsError::NotFound(source.to_string()))?;
            if let Some(entries) = parent.entries_mut() {
                entries[index].name = name.clone();
            }
            parent.modified = now();
            self.write_node(&parent)?;
        } else {
            let mut old_parent = self.read_dir_node(src.parent_id)?;
            let mut new_parent = self.read_dir_node(target_parent)?;
            dir::ensure_absent(&new_parent, &name)?;
            let (_, index) = dir::find_entry(&old_parent, &src.name)?
                .ok_or_else(|| CfsError::NotFound(source.to_string()))?;
            dir::append_entry(&mut new_parent, src.node_id, &name, self.superblock())?;
            dir::remove_entry(&mut old_parent, index)?;
            let stamp = now();
            old_parent.modified = stamp;
            new_parent.modified = stamp;
            self.write_node(&new_parent)?;
            self.write_node(&old_parent)?;

            if let Some(entries) = node.entries_mut() {
                if let Some(dotdot) = entries.iter_mut().find(|e| e.name == "..") {
                    dotdot.node_id = target_parent;
                }
            }
        }

        // Only the primary entry carries the node's own name and parent.
        if node.parent == src.parent_id && node.name == src.name {
            node.name = name.clone();
            node.parent = target_parent;
        }
        self.write_node(&node)?;
        debug!("moved `{}` -> `{}` (node {})", source, name, node.id);
        Ok(())
    }

    /// `cp`: duplicate `source` under `dest`. Directories need `recursive`.
    pub fn copy(&self, source: &str, dest: &str, recursive: bool) -> CfsResult<NodeId> {
        let src = self.lookup(source)?;
        if src.kind.is_dir() && !recursive {
            return Err(CfsError::NotAFile(source.to_string()));
        }
        let name = if src.node_id == ROOT_ID { "root" } else { src.name.as_str() };
        let (target_parent, name) = self.destination(name, dest)?;
        if src.kind.is_dir() && self.is_within(target_parent, src.node_id)? {
            return Err(CfsError::InvalidMove(format!("{} into {}", source, dest)));
        }
        self.copy_node(src.node_id, target_parent, &name)
    }

    fn copy_node(&self, id: NodeId, parent: NodeId, name: &str) -> CfsResult<NodeId> {
        let node = self.read_live_node(id)?;
        match node.body {
            NodeBody::File(content) => self.create_file(parent, name, &content),
            NodeBody::Directory(entries) => {
                let copy = self.create_directory(parent, name)?;
                for entry in entries.iter().filter(|e| !e.is_dot()) {
                    self.copy_node(entry.node_id, copy, &entry.name)?;
                }
                Ok(copy)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{CfsError, Container, FormatConfig, MemDevice, ROOT_ID};

    fn sample() -> Container<MemDevice> {
        let fs = Container::format(MemDevice::new(), &FormatConfig::default()).unwrap();
        fs.make_directory("/src").unwrap();
        fs.make_directory("/src/sub").unwrap();
        fs.write_file("/src/sub/f", b"payload").unwrap();
        fs.make_directory("/dst").unwrap();
        fs
    }

    #[test]
    fn rename_in_place() {
        let fs = sample();
        let id = fs.lookup("/src/sub/f").unwrap().node_id;
        fs.move_entity("/src/sub/f", "/src/sub/g").unwrap();
        assert_eq!(fs.lookup("/src/sub/g").unwrap().node_id, id);
        assert!(matches!(fs.lookup("/src/sub/f"), Err(CfsError::NotFound(_))));
        assert_eq!(fs.read_node(id).unwrap().name, "g");
    }

    #[test]
    fn move_directory_repoints_dotdot() {
        let fs = sample();
        let dst = fs.lookup("/dst").unwrap().node_id;
        fs.move_entity("/src/sub", "/dst").unwrap();
        let sub = fs.lookup("/dst/sub").unwrap().node_id;
        assert_eq!(fs.lookup("/dst/sub/..").unwrap().node_id, dst);
        assert_eq!(fs.read_node(sub).unwrap().parent, dst);
        assert_eq!(fs.read_file("/dst/sub/f").unwrap(), b"payload");
        assert_eq!(fs.absolute_path(sub).unwrap(), "/dst/sub");
    }

    #[test]
    fn cannot_move_into_own_subtree() {
        let fs = sample();
        assert!(matches!(
            fs.move_entity("/src", "/src/sub"),
            Err(CfsError::InvalidMove(_))
        ));
        assert!(matches!(fs.move_entity("/", "/dst"), Err(CfsError::CannotRemoveRoot)));
    }

    #[test]
    fn copy_is_deep() {
        let fs = sample();
        assert!(matches!(fs.copy("/src", "/dst", false), Err(CfsError::NotAFile(_))));
        let copy = fs.copy("/src", "/dst", true).unwrap();
        assert_ne!(copy, fs.lookup("/src").unwrap().node_id);
        fs.remove("/src/sub/f", false, None).unwrap();
        assert_eq!(fs.read_file("/dst/src/sub/f").unwrap(), b"payload");
        assert!(matches!(fs.copy("/src", "/src/sub", true), Err(CfsError::InvalidMove(_))));
        let root = fs.read_node(ROOT_ID).unwrap();
        assert_eq!(root.entries().unwrap().len(), 4);
    }
}
