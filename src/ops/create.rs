use log::debug;

use crate::{
    container::Container,
    device::BlockDevice,
    dir,
    error::{CfsError, CfsResult},
    models::{now, Node, NodeId, NodeKind, NodeStat},
};

impl<D: BlockDevice> Container<D> {
    /// Allocate a slot for `node`, write it and link it into `parent`.
    ///
    /// All checks against the parent run before the first write, so a
    /// rejected create leaves the container untouched.
    fn insert_node(&self, parent: NodeId, name: &str, build: impl FnOnce(NodeId) -> Node) -> CfsResult<NodeId> {
        dir::validate_name(name, self.superblock())?;
        let mut parent_node = self.read_dir_node(parent)?;
        dir::ensure_absent(&parent_node, name)?;
        dir::check_room(&parent_node, self.superblock())?;

        let id = self.next_available_id()?;
        let node = build(id);
        self.write_node(&node)?;

        dir::append_entry(&mut parent_node, id, name, self.superblock())?;
        parent_node.modified = now();
        self.write_node(&parent_node)?;
        Ok(id)
    }

    pub fn create_directory(&self, parent: NodeId, name: &str) -> CfsResult<NodeId> {
        let id = self.insert_node(parent, name, |id| Node::new_directory(id, name, parent))?;
        debug!("mkdir `{}` in {} -> node {}", name, parent, id);
        Ok(id)
    }

    pub fn create_file(&self, parent: NodeId, name: &str, content: &[u8]) -> CfsResult<NodeId> {
        let max = self.superblock().content_limit();
        if content.len() > max {
            return Err(CfsError::ContentTooLarge {
                size: content.len(),
                max,
            });
        }
        let id = self.insert_node(parent, name, |id| {
            Node::new_file(id, name, parent, content.to_vec())
        })?;
        debug!("create `{}` ({} bytes) in {} -> node {}", name, content.len(), parent, id);
        Ok(id)
    }

    /// Add an entry in `parent` for the file `source`.
    pub fn create_hard_link(&self, source: NodeId, parent: NodeId, name: &str) -> CfsResult<()> {
        let mut target = self.read_live_node(source)?;
        if target.is_dir() {
            return Err(CfsError::NotAFile(target.name));
        }
        dir::validate_name(name, self.superblock())?;
        let mut parent_node = self.read_dir_node(parent)?;
        dir::ensure_absent(&parent_node, name)?;

        dir::append_entry(&mut parent_node, source, name, self.superblock())?;
        parent_node.modified = now();
        self.write_node(&parent_node)?;

        target.link_count += 1;
        self.write_node(&target)?;
        debug!("link `{}` in {} -> node {} ({} extra links)", name, parent, source, target.link_count);
        Ok(())
    }

    /// `mkdir`: the last segment of `path` must not exist yet.
    pub fn make_directory(&self, path: &str) -> CfsResult<NodeId> {
        let loc = self.resolve(path, self.cwd, true)?;
        if !loc.partial {
            return Err(CfsError::AlreadyExists(path.to_string()));
        }
        self.create_directory(loc.node_id, &loc.name)
    }

    /// Create a new file holding `content`.
    pub fn write_file(&self, path: &str, content: &[u8]) -> CfsResult<NodeId> {
        let loc = self.resolve(path, self.cwd, true)?;
        if !loc.partial {
            return Err(CfsError::AlreadyExists(path.to_string()));
        }
        self.create_file(loc.node_id, &loc.name, content)
    }

    /// `ln`: link the file at `source` as `dest`, or into `dest` when it is
    /// an existing directory.
    pub fn link(&self, source: &str, dest: &str) -> CfsResult<()> {
        let src = self.lookup(source)?;
        let (parent, name) = self.destination(&src.name, dest)?;
        self.create_hard_link(src.node_id, parent, &name)
    }

    /// `cat`
    pub fn read_file(&self, path: &str) -> CfsResult<Vec<u8>> {
        let loc = self.lookup(path)?;
        let node = self.read_live_node(loc.node_id)?;
        node.content()
            .map(<[u8]>::to_vec)
            .ok_or_else(|| CfsError::NotAFile(path.to_string()))
    }

    pub fn stat(&self, path: &str) -> CfsResult<NodeStat> {
        let loc = self.lookup(path)?;
        Ok(self.read_live_node(loc.node_id)?.stat())
    }

    /// Parent and entry name that `dest` designates for an entity called
    /// `source_name`.
    pub(crate) fn destination(&self, source_name: &str, dest: &str) -> CfsResult<(NodeId, String)> {
        let loc = self.resolve(dest, self.cwd, true)?;
        if loc.partial {
            return Ok((loc.node_id, loc.name));
        }
        match loc.kind {
            NodeKind::Directory => Ok((loc.node_id, source_name.to_string())),
            NodeKind::File => Err(CfsError::AlreadyExists(dest.to_string())),
        }
    }
}
