//! Container lifecycle and raw record access.

use std::path::Path;

use log::{debug, info};

use crate::{
    codec,
    config::FormatConfig,
    device::{BlockDevice, FileDevice},
    error::{CfsError, CfsResult},
    models::{Node, NodeId, Superblock},
    NODE_SIZE, ROOT_ID, SUPERBLOCK_SIZE,
};

pub(crate) fn node_offset(id: NodeId) -> u64 {
    SUPERBLOCK_SIZE as u64 + id as u64 * NODE_SIZE as u64
}

/// An open container plus the session state that goes with it.
///
/// The handle owns its device until [`Container::close`]; afterwards every
/// operation fails with [`CfsError::Closed`].
pub struct Container<D: BlockDevice = FileDevice> {
    device: Option<D>,
    superblock: Superblock,
    pub(crate) cwd: NodeId,
}

impl Container<FileDevice> {
    /// Create a new container file at `path`, replacing any existing file.
    pub fn create<P: AsRef<Path>>(path: P, config: &FormatConfig) -> CfsResult<Self> {
        // reject bad parameters before touching the host file
        config.validate()?;
        let device = FileDevice::create(path.as_ref())?;
        info!("creating container {}", path.as_ref().display());
        Self::format(device, config)
    }

    /// Open an existing container file.
    pub fn open<P: AsRef<Path>>(path: P) -> CfsResult<Self> {
        let device = FileDevice::open(path.as_ref())?;
        info!("opening container {}", path.as_ref().display());
        Self::mount(device)
    }
}

impl<D: BlockDevice> Container<D> {
    /// Write a superblock and an empty root directory to `device`.
    pub fn format(device: D, config: &FormatConfig) -> CfsResult<Self> {
        let superblock = config.validate()?;
        device.write_at(0, &codec::encode_superblock(&superblock))?;

        let root = Node::new_directory(ROOT_ID, "/", ROOT_ID);
        device.write_at(node_offset(ROOT_ID), &codec::encode_node(&root)?)?;
        device.flush()?;

        info!("formatted container: {:?}", superblock);
        Ok(Self {
            device: Some(device),
            superblock,
            cwd: ROOT_ID,
        })
    }

    /// Load the superblock of an already formatted device.
    pub fn mount(device: D) -> CfsResult<Self> {
        let mut raw = [0u8; SUPERBLOCK_SIZE];
        device.read_at(0, &mut raw)?;
        let superblock = codec::decode_superblock(&raw)?;

        let container = Self {
            device: Some(device),
            superblock,
            cwd: ROOT_ID,
        };
        let root = container.read_node(ROOT_ID)?;
        if root.deleted || !root.is_dir() {
            return Err(CfsError::InvalidContainer(
                "node 0 is not a live directory".to_string(),
            ));
        }
        info!(
            "mounted container with {} nodes",
            container.node_count()?
        );
        Ok(container)
    }

    /// Release the device. Closing twice is a no-op.
    pub fn close(&mut self) -> CfsResult<()> {
        if let Some(device) = self.device.take() {
            device.flush()?;
            info!("container closed");
        }
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        self.device.is_some()
    }

    /// Close the handle and hand back the device.
    pub fn into_device(mut self) -> CfsResult<D> {
        let device = self.device.take().ok_or(CfsError::Closed)?;
        device.flush()?;
        Ok(device)
    }

    pub fn superblock(&self) -> &Superblock {
        &self.superblock
    }

    pub(crate) fn device(&self) -> CfsResult<&D> {
        self.device.as_ref().ok_or(CfsError::Closed)
    }

    /// Number of records in the node table, tombstones included.
    pub fn node_count(&self) -> CfsResult<u32> {
        let len = self.device()?.size()?;
        Ok((len.saturating_sub(SUPERBLOCK_SIZE as u64) / NODE_SIZE as u64) as u32)
    }

    /// Read the record at `id`, whether or not it is a tombstone.
    pub fn read_node(&self, id: NodeId) -> CfsResult<Node> {
        if id >= self.node_count()? {
            return Err(CfsError::NotFound(format!("node {}", id)));
        }
        let mut raw = vec![0u8; NODE_SIZE];
        self.device()?.read_at(node_offset(id), &mut raw)?;
        let node = codec::decode_node(&raw)?;
        if node.id != id {
            return Err(CfsError::InvalidContainer(format!(
                "slot {} holds node {}",
                id, node.id
            )));
        }
        Ok(node)
    }

    /// Read the record at `id`, treating a tombstone as missing.
    pub fn read_live_node(&self, id: NodeId) -> CfsResult<Node> {
        let node = self.read_node(id)?;
        if node.deleted {
            return Err(CfsError::NotFound(format!("node {}", id)));
        }
        Ok(node)
    }

    /// Read the record at `id` and require it to be a directory.
    pub fn read_dir_node(&self, id: NodeId) -> CfsResult<Node> {
        let node = self.read_live_node(id)?;
        if !node.is_dir() {
            return Err(CfsError::NotADirectory(node.name));
        }
        Ok(node)
    }

    pub fn write_node(&self, node: &Node) -> CfsResult<()> {
        let raw = codec::encode_node(node)?;
        self.device()?.write_at(node_offset(node.id), &raw)?;
        debug!("wrote node {} ({} bytes of data)", node.id, node.size());
        Ok(())
    }
}
