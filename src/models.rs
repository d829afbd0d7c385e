//! In-memory view of the container records.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::{DATA_CAPACITY, ENTRY_WIDTH, NAME_CAPACITY};

pub type NodeId = u32;

/// Seconds since the Unix epoch.
pub type Timestamp = i64;

pub fn now() -> Timestamp {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as Timestamp)
        .unwrap_or(0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    File,
    Directory,
}

impl NodeKind {
    pub fn is_dir(self) -> bool {
        self == NodeKind::Directory
    }

    pub(crate) fn code(self) -> u32 {
        match self {
            NodeKind::File => 0,
            NodeKind::Directory => 1,
        }
    }

    pub(crate) fn from_code(code: u32) -> Option<Self> {
        match code {
            0 => Some(NodeKind::File),
            1 => Some(NodeKind::Directory),
            _ => None,
        }
    }
}

/// Creation parameters stored at offset 0 of every container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Superblock {
    pub block_size: i32,
    pub filename_size: i32,
    pub max_file_size: i32,
    pub max_dir_entries: i32,
}

impl Superblock {
    /// Longest name accepted for new entries, in bytes.
    pub fn name_limit(&self) -> usize {
        (self.filename_size.max(0) as usize).min(NAME_CAPACITY)
    }

    /// Largest file content accepted, in bytes.
    pub fn content_limit(&self) -> usize {
        (self.max_file_size.max(0) as usize).min(DATA_CAPACITY)
    }

    /// Number of packed entries a directory may hold, `.` and `..` included.
    pub fn entry_limit(&self) -> usize {
        (self.max_dir_entries.max(0) as usize).min(DATA_CAPACITY / ENTRY_WIDTH)
    }
}

/// One packed `(child id, name)` pair of a directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub node_id: NodeId,
    pub name: String,
}

impl DirEntry {
    pub fn new(node_id: NodeId, name: &str) -> Self {
        Self {
            node_id,
            name: name.to_string(),
        }
    }

    /// `.` or `..`
    pub fn is_dot(&self) -> bool {
        self.name == "." || self.name == ".."
    }
}

/// The datablock, interpreted by node kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeBody {
    File(Vec<u8>),
    Directory(Vec<DirEntry>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub deleted: bool,
    pub id: NodeId,
    pub name: String,
    pub parent: NodeId,
    pub created: Timestamp,
    pub accessed: Timestamp,
    pub modified: Timestamp,
    /// References beyond the primary entry.
    pub link_count: u32,
    pub body: NodeBody,
}

impl Node {
    pub fn new_file(id: NodeId, name: &str, parent: NodeId, content: Vec<u8>) -> Self {
        Self::with_body(id, name, parent, NodeBody::File(content))
    }

    /// A directory pre-populated with its `.` and `..` entries.
    pub fn new_directory(id: NodeId, name: &str, parent: NodeId) -> Self {
        let entries = vec![DirEntry::new(id, "."), DirEntry::new(parent, "..")];
        Self::with_body(id, name, parent, NodeBody::Directory(entries))
    }

    fn with_body(id: NodeId, name: &str, parent: NodeId, body: NodeBody) -> Self {
        let ts = now();
        Self {
            deleted: false,
            id,
            name: name.to_string(),
            parent,
            created: ts,
            accessed: ts,
            modified: ts,
            link_count: 0,
            body,
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self.body {
            NodeBody::File(_) => NodeKind::File,
            NodeBody::Directory(_) => NodeKind::Directory,
        }
    }

    pub fn is_dir(&self) -> bool {
        self.kind() == NodeKind::Directory
    }

    /// Meaningful bytes in the datablock.
    pub fn size(&self) -> usize {
        match &self.body {
            NodeBody::File(content) => content.len(),
            NodeBody::Directory(entries) => entries.len() * ENTRY_WIDTH,
        }
    }

    pub fn content(&self) -> Option<&[u8]> {
        match &self.body {
            NodeBody::File(content) => Some(content),
            NodeBody::Directory(_) => None,
        }
    }

    pub fn entries(&self) -> Option<&[DirEntry]> {
        match &self.body {
            NodeBody::Directory(entries) => Some(entries),
            NodeBody::File(_) => None,
        }
    }

    pub fn entries_mut(&mut self) -> Option<&mut Vec<DirEntry>> {
        match &mut self.body {
            NodeBody::Directory(entries) => Some(entries),
            NodeBody::File(_) => None,
        }
    }

    pub fn stat(&self) -> NodeStat {
        NodeStat {
            id: self.id,
            name: self.name.clone(),
            kind: self.kind(),
            size: self.size(),
            parent: self.parent,
            created: self.created,
            accessed: self.accessed,
            modified: self.modified,
            link_count: self.link_count,
        }
    }
}

/// Displayable metadata of one entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeStat {
    pub id: NodeId,
    pub name: String,
    pub kind: NodeKind,
    pub size: usize,
    pub parent: NodeId,
    pub created: Timestamp,
    pub accessed: Timestamp,
    pub modified: Timestamp,
    pub link_count: u32,
}
