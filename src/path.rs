//! Slash-delimited path resolution and the session's working directory.

use crate::{
    container::Container,
    device::BlockDevice,
    dir,
    error::{CfsError, CfsResult},
    models::{NodeId, NodeKind},
    ROOT_ID,
};

/// Where a path ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    /// The resolved node, or the parent directory when `partial` is set.
    pub node_id: NodeId,
    /// Directory the last segment was looked up in.
    pub parent_id: NodeId,
    /// Last path segment (`/` for the root).
    pub name: String,
    pub kind: NodeKind,
    /// The last segment does not exist yet; `node_id` is where it would go.
    pub partial: bool,
}

impl<D: BlockDevice> Container<D> {
    /// Walk `path` from the root (leading `/`) or from `start`.
    ///
    /// With `ignore_last`, a missing final segment is not an error: the
    /// result is the parent directory plus the unresolved name, flagged
    /// `partial`. Traversing through a file fails with `NotADirectory`.
    pub fn resolve(&self, path: &str, start: NodeId, ignore_last: bool) -> CfsResult<Location> {
        let mut current = if path.starts_with('/') { ROOT_ID } else { start };
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        let mut parent = current;
        for (i, segment) in segments.iter().enumerate() {
            let dir_node = self.read_dir_node(current)?;
            match dir::find_entry(&dir_node, segment)? {
                Some((child, _)) => {
                    parent = current;
                    current = child;
                }
                None if ignore_last && i + 1 == segments.len() => {
                    return Ok(Location {
                        node_id: current,
                        parent_id: current,
                        name: segment.to_string(),
                        kind: NodeKind::Directory,
                        partial: true,
                    });
                }
                None => return Err(CfsError::NotFound(path.to_string())),
            }
        }

        let node = self.read_live_node(current)?;
        let name = match segments.last() {
            Some(segment) => segment.to_string(),
            None => node.name.clone(),
        };
        Ok(Location {
            node_id: current,
            parent_id: parent,
            name,
            kind: node.kind(),
            partial: false,
        })
    }

    /// Resolve relative to the working directory.
    pub fn lookup(&self, path: &str) -> CfsResult<Location> {
        self.resolve(path, self.cwd, false)
    }

    pub fn cwd(&self) -> NodeId {
        self.cwd
    }

    pub fn change_directory(&mut self, path: &str) -> CfsResult<NodeId> {
        let loc = self.lookup(path)?;
        if loc.kind != NodeKind::Directory {
            return Err(CfsError::NotADirectory(path.to_string()));
        }
        self.cwd = loc.node_id;
        Ok(loc.node_id)
    }

    /// Absolute path of the working directory.
    pub fn working_directory(&self) -> CfsResult<String> {
        self.absolute_path(self.cwd)
    }

    /// Absolute path of a directory, built from its parent links.
    pub fn absolute_path(&self, id: NodeId) -> CfsResult<String> {
        let mut names = Vec::new();
        let mut current = self.read_live_node(id)?;
        while current.id != ROOT_ID {
            if names.len() > self.node_count()? as usize {
                return Err(CfsError::InvalidContainer(format!(
                    "parent links of node {} form a cycle",
                    id
                )));
            }
            names.push(current.name.clone());
            current = self.read_live_node(current.parent)?;
        }
        names.reverse();
        Ok(format!("/{}", names.join("/")))
    }
}

#[cfg(test)]
mod tests {
    use crate::{CfsError, Container, FormatConfig, MemDevice, NodeKind, ROOT_ID};

    fn sample() -> Container<MemDevice> {
        let fs = Container::format(MemDevice::new(), &FormatConfig::default()).unwrap();
        let a = fs.create_directory(ROOT_ID, "a").unwrap();
        let b = fs.create_directory(a, "b").unwrap();
        fs.create_file(b, "f", b"data").unwrap();
        fs
    }

    #[test]
    fn empty_and_slash_are_root() {
        let fs = sample();
        for path in ["", "/", "//"] {
            let loc = fs.resolve(path, ROOT_ID, false).unwrap();
            assert_eq!(loc.node_id, ROOT_ID);
            assert_eq!(loc.kind, NodeKind::Directory);
        }
    }

    #[test]
    fn missing_last_segment_yields_parent() {
        let fs = sample();
        let b = fs.resolve("/a/b", ROOT_ID, false).unwrap();
        let loc = fs.resolve("/a/b/c", ROOT_ID, true).unwrap();
        assert!(loc.partial);
        assert_eq!(loc.node_id, b.node_id);
        assert_eq!(loc.name, "c");
        assert!(matches!(
            fs.resolve("/a/b/c", ROOT_ID, false),
            Err(CfsError::NotFound(_))
        ));
        assert!(matches!(
            fs.resolve("/a/x/c", ROOT_ID, true),
            Err(CfsError::NotFound(_))
        ));
    }

    #[test]
    fn files_cannot_be_traversed() {
        let fs = sample();
        assert!(matches!(
            fs.resolve("/a/b/f/x", ROOT_ID, true),
            Err(CfsError::NotADirectory(_))
        ));
    }

    #[test]
    fn resolution_is_repeatable() {
        let fs = sample();
        let first = fs.resolve("/a/b/f", ROOT_ID, false).unwrap();
        for _ in 0..3 {
            assert_eq!(fs.resolve("/a/b/f", ROOT_ID, false).unwrap(), first);
        }
        assert_eq!(first.kind, NodeKind::File);
    }

    #[test]
    fn dot_entries_and_relative_paths() {
        let mut fs = sample();
        let a = fs.change_directory("a").unwrap();
        assert_eq!(fs.working_directory().unwrap(), "/a");
        assert_eq!(fs.lookup("b/..").unwrap().node_id, a);
        assert_eq!(fs.lookup("./b/./f").unwrap().kind, NodeKind::File);
        fs.change_directory("b").unwrap();
        assert_eq!(fs.working_directory().unwrap(), "/a/b");
        assert!(matches!(
            fs.change_directory("f"),
            Err(CfsError::NotADirectory(_))
        ));
        fs.change_directory("/").unwrap();
        assert_eq!(fs.working_directory().unwrap(), "/");
    }
}
