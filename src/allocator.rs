//! Node id allocation: first tombstone in table order, else append.

use log::debug;

use crate::{
    container::{node_offset, Container},
    device::BlockDevice,
    error::{CfsError, CfsResult},
    models::NodeId,
};

impl<D: BlockDevice> Container<D> {
    /// Id for the next new entity.
    ///
    /// Scans from node 0 upwards and returns the first deleted slot; with no
    /// holes the table grows by one (`last id + 1`). The slot is only claimed
    /// once the caller writes a record to it.
    pub fn next_available_id(&self) -> CfsResult<NodeId> {
        let count = self.node_count()?;
        if count == 0 {
            return Err(CfsError::InvalidContainer(
                "node table has no root".to_string(),
            ));
        }
        let device = self.device()?;
        let mut flag = [0u8; 1];
        for id in 0..count {
            // the tombstone flag is the first byte of every record
            device.read_at(node_offset(id), &mut flag)?;
            if flag[0] != 0 {
                debug!("reusing hole at node {}", id);
                return Ok(id);
            }
        }
        debug!("appending node {}", count);
        Ok(count)
    }
}
