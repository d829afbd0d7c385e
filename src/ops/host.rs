use std::{
    fs,
    path::{Component, Path, PathBuf},
};

use log::{debug, warn};

use crate::{
    container::Container,
    device::BlockDevice,
    error::{CfsError, CfsResult},
    models::{NodeBody, NodeId},
    ROOT_ID,
};

fn host_name(path: &Path) -> CfsResult<String> {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .ok_or_else(|| CfsError::InvalidName(path.display().to_string()))
}

/// `dir/name`, provided `name` stays a single component inside `dir`.
fn host_child(dir: &Path, name: &str) -> CfsResult<PathBuf> {
    let mut parts = Path::new(name).components();
    match (parts.next(), parts.next()) {
        (Some(Component::Normal(_)), None) => Ok(dir.join(name)),
        _ => Err(CfsError::InvalidName(name.to_string())),
    }
}

impl<D: BlockDevice> Container<D> {
    /// Copy a host file or directory tree into directory `dest`, keeping
    /// its name. Returns the id of the new top-level node.
    ///
    /// Host entries that cannot be inspected, have non UTF-8 names or are
    /// neither files nor directories are skipped with a warning.
    pub fn import_from_host(&self, host: &Path, dest: NodeId) -> CfsResult<NodeId> {
        let host = fs::canonicalize(host)?;
        let name = host_name(&host)?;
        self.import_entry(&host, &name, dest)
    }

    fn import_entry(&self, host: &Path, name: &str, dest: NodeId) -> CfsResult<NodeId> {
        let meta = fs::metadata(host)?;
        if meta.is_file() {
            let content = fs::read(host)?;
            debug!("import file {} ({} bytes)", host.display(), content.len());
            return self.create_file(dest, name, &content);
        }
        if !meta.is_dir() {
            return Err(CfsError::NotAFile(host.display().to_string()));
        }

        let id = self.create_directory(dest, name)?;
        debug!("import dir {} -> node {}", host.display(), id);
        for entry in fs::read_dir(host)? {
            let entry = entry?;
            let path = entry.path();
            let file_type = match entry.file_type() {
                Ok(t) => t,
                Err(e) => {
                    warn!("skipping {}: {}", path.display(), e);
                    continue;
                }
            };
            let child = match entry.file_name().into_string() {
                Ok(child) => child,
                Err(raw) => {
                    warn!("skipping non UTF-8 name {:?}", raw);
                    continue;
                }
            };
            if file_type.is_file() || file_type.is_dir() {
                self.import_entry(&path, &child, id)?;
            } else {
                warn!("skipping special file {}", path.display());
            }
        }
        Ok(id)
    }

    /// Recreate node `source` on the host inside `host_dir`, which is
    /// created when missing. The root exports its contents straight into
    /// `host_dir`. Returns the host path written.
    pub fn export_to_host(&self, source: NodeId, host_dir: &Path) -> CfsResult<PathBuf> {
        let node = self.read_live_node(source)?;
        self.export_as(source, &node.name, host_dir)
    }

    fn export_as(&self, source: NodeId, name: &str, host_dir: &Path) -> CfsResult<PathBuf> {
        let target = if source == ROOT_ID {
            host_dir.to_path_buf()
        } else {
            host_child(host_dir, name)?
        };
        fs::create_dir_all(host_dir)?;
        self.export_node(source, &target)?;
        Ok(target)
    }

    fn export_node(&self, id: NodeId, target: &Path) -> CfsResult<()> {
        let node = self.read_live_node(id)?;
        match &node.body {
            NodeBody::File(content) => {
                debug!("export node {} -> {}", id, target.display());
                fs::write(target, content)?;
            }
            NodeBody::Directory(entries) => {
                fs::create_dir_all(target)?;
                for entry in entries.iter().filter(|e| !e.is_dot()) {
                    self.export_node(entry.node_id, &host_child(target, &entry.name)?)?;
                }
            }
        }
        Ok(())
    }

    /// `import`: `dest` defaults to the working directory.
    pub fn import<P: AsRef<Path>>(&self, host: P, dest: Option<&str>) -> CfsResult<NodeId> {
        let dest = match dest {
            Some(path) => {
                let loc = self.lookup(path)?;
                if !loc.kind.is_dir() {
                    return Err(CfsError::NotADirectory(path.to_string()));
                }
                loc.node_id
            }
            None => self.cwd(),
        };
        self.import_from_host(host.as_ref(), dest)
    }

    /// `export`: the host copy is named after the last segment of `path`,
    /// so a hard link exports under the name it was reached by.
    pub fn export<P: AsRef<Path>>(&self, path: &str, host_dir: P) -> CfsResult<PathBuf> {
        let loc = self.lookup(path)?;
        if loc.name == "." || loc.name == ".." {
            return self.export_to_host(loc.node_id, host_dir.as_ref());
        }
        self.export_as(loc.node_id, &loc.name, host_dir.as_ref())
    }
}
