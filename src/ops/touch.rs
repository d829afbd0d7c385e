use bitflags::bitflags;
use log::debug;

use crate::{
    container::Container,
    device::BlockDevice,
    error::{CfsError, CfsResult},
    models::{now, NodeId},
};

bitflags! {
    /// Which timestamps `touch` refreshes. Empty means both.
    pub struct TouchFlags: u8 {
        const ACCESS = 1;
        const MODIFICATION = 2;
    }
}

impl<D: BlockDevice> Container<D> {
    pub fn touch_timestamps(&self, id: NodeId, flags: TouchFlags) -> CfsResult<()> {
        let flags = if flags.is_empty() { TouchFlags::all() } else { flags };
        let mut node = self.read_live_node(id)?;
        let stamp = now();
        if flags.contains(TouchFlags::ACCESS) {
            node.accessed = stamp;
        }
        if flags.contains(TouchFlags::MODIFICATION) {
            node.modified = stamp;
        }
        self.write_node(&node)
    }

    /// Refresh the timestamps at `path`, creating an empty file there if
    /// nothing exists yet.
    pub fn touch(&self, path: &str, flags: TouchFlags) -> CfsResult<NodeId> {
        match self.lookup(path) {
            Ok(loc) => {
                self.touch_timestamps(loc.node_id, flags)?;
                Ok(loc.node_id)
            }
            Err(CfsError::NotFound(_)) => {
                let loc = self.resolve(path, self.cwd(), true)?;
                debug!("touch: `{}` missing, creating it", path);
                self.create_file(loc.node_id, &loc.name, b"")
            }
            Err(e) => Err(e),
        }
    }
}
