//! Fixed-width on-disk layout of the superblock, node records and packed
//! directory entries. All integers are little-endian.
//!
//! ```text
//! superblock  block_size:i32 filename_size:i32 max_file_size:i32
//!             max_dir_entries:i32 magic:u32 version:u32
//! node        deleted:u8 id:u32 name:[u8; 50] size:u32 kind:u32 parent:u32
//!             created:i64 accessed:i64 modified:i64 link_count:u32
//!             data:[u8; 1000]
//! dir entry   child:u32 name:[u8; 50]
//! ```

use crate::{
    error::{CfsError, CfsResult},
    models::{DirEntry, Node, NodeBody, NodeId, NodeKind, Superblock},
    i32, i64, u32, CFS_MAGIC, DATA_CAPACITY, ENTRY_WIDTH, LAYOUT_VERSION, NAME_CAPACITY,
    NODE_SIZE, SUPERBLOCK_SIZE,
};

/// Offset of the data region inside a node record.
const DATA_OFFSET: usize = NODE_SIZE - DATA_CAPACITY;

fn take<'a>(raw: &'a [u8], at: &mut usize, len: usize) -> &'a [u8] {
    let field = &raw[*at..*at + len];
    *at += len;
    field
}

fn put(raw: &mut [u8], at: &mut usize, bytes: &[u8]) {
    raw[*at..*at + bytes.len()].copy_from_slice(bytes);
    *at += bytes.len();
}

fn put_name(raw: &mut [u8], at: &mut usize, name: &str) -> CfsResult<()> {
    let bytes = name.as_bytes();
    if bytes.len() > NAME_CAPACITY {
        return Err(CfsError::NameTooLong {
            name: name.to_string(),
            max: NAME_CAPACITY,
        });
    }
    // NUL padding; the record buffer starts zeroed
    raw[*at..*at + bytes.len()].copy_from_slice(bytes);
    *at += NAME_CAPACITY;
    Ok(())
}

fn take_name(raw: &[u8], at: &mut usize) -> CfsResult<String> {
    let field = take(raw, at, NAME_CAPACITY);
    let len = field.iter().position(|&b| b == 0).unwrap_or(NAME_CAPACITY);
    String::from_utf8(field[..len].to_vec())
        .map_err(|_| CfsError::InvalidContainer("name is not valid UTF-8".to_string()))
}

pub fn encode_superblock(sb: &Superblock) -> [u8; SUPERBLOCK_SIZE] {
    let mut raw = [0u8; SUPERBLOCK_SIZE];
    let mut at = 0;
    put(&mut raw, &mut at, &sb.block_size.to_le_bytes());
    put(&mut raw, &mut at, &sb.filename_size.to_le_bytes());
    put(&mut raw, &mut at, &sb.max_file_size.to_le_bytes());
    put(&mut raw, &mut at, &sb.max_dir_entries.to_le_bytes());
    put(&mut raw, &mut at, &CFS_MAGIC.to_le_bytes());
    put(&mut raw, &mut at, &LAYOUT_VERSION.to_le_bytes());
    raw
}

pub fn decode_superblock(raw: &[u8]) -> CfsResult<Superblock> {
    if raw.len() != SUPERBLOCK_SIZE {
        return Err(CfsError::InvalidContainer(format!(
            "superblock is {} bytes, expected {}",
            raw.len(),
            SUPERBLOCK_SIZE
        )));
    }
    let mut at = 0;
    let sb = Superblock {
        block_size: i32!(take(raw, &mut at, 4)),
        filename_size: i32!(take(raw, &mut at, 4)),
        max_file_size: i32!(take(raw, &mut at, 4)),
        max_dir_entries: i32!(take(raw, &mut at, 4)),
    };
    let magic = u32!(take(raw, &mut at, 4));
    if magic != CFS_MAGIC {
        return Err(CfsError::InvalidContainer(format!("bad magic {:#x}", magic)));
    }
    let version = u32!(take(raw, &mut at, 4));
    if version != LAYOUT_VERSION {
        return Err(CfsError::InvalidContainer(format!(
            "unsupported layout version {}",
            version
        )));
    }
    Ok(sb)
}

pub fn pack_dir_entry(child: NodeId, name: &str) -> CfsResult<[u8; ENTRY_WIDTH]> {
    let mut raw = [0u8; ENTRY_WIDTH];
    let mut at = 0;
    put(&mut raw, &mut at, &child.to_le_bytes());
    put_name(&mut raw, &mut at, name)?;
    Ok(raw)
}

pub fn unpack_dir_entry(raw: &[u8]) -> CfsResult<DirEntry> {
    if raw.len() != ENTRY_WIDTH {
        return Err(CfsError::InvalidContainer(format!(
            "directory entry is {} bytes, expected {}",
            raw.len(),
            ENTRY_WIDTH
        )));
    }
    let mut at = 0;
    let node_id = u32!(take(raw, &mut at, 4));
    let name = take_name(raw, &mut at)?;
    Ok(DirEntry { node_id, name })
}

/// Slot 0 must be `.`, slot 1 `..`; every later name must be a plain
/// single path component.
fn check_entries(dir: NodeId, entries: &[DirEntry]) -> CfsResult<()> {
    for (slot, entry) in entries.iter().enumerate() {
        let ok = match slot {
            0 => entry.name == ".",
            1 => entry.name == "..",
            _ => !entry.name.is_empty() && !entry.is_dot() && !entry.name.contains('/'),
        };
        if !ok {
            return Err(CfsError::InvalidContainer(format!(
                "directory {} slot {} has bad name {:?}",
                dir, slot, entry.name
            )));
        }
    }
    Ok(())
}

pub fn encode_node(node: &Node) -> CfsResult<Vec<u8>> {
    let size = node.size();
    if size > DATA_CAPACITY {
        return Err(match node.body {
            NodeBody::File(_) => CfsError::ContentTooLarge {
                size,
                max: DATA_CAPACITY,
            },
            NodeBody::Directory(_) => CfsError::DirectoryFull,
        });
    }

    let mut raw = vec![0u8; NODE_SIZE];
    let mut at = 0;
    put(&mut raw, &mut at, &[node.deleted as u8]);
    put(&mut raw, &mut at, &node.id.to_le_bytes());
    put_name(&mut raw, &mut at, &node.name)?;
    put(&mut raw, &mut at, &(size as u32).to_le_bytes());
    put(&mut raw, &mut at, &node.kind().code().to_le_bytes());
    put(&mut raw, &mut at, &node.parent.to_le_bytes());
    put(&mut raw, &mut at, &node.created.to_le_bytes());
    put(&mut raw, &mut at, &node.accessed.to_le_bytes());
    put(&mut raw, &mut at, &node.modified.to_le_bytes());
    put(&mut raw, &mut at, &node.link_count.to_le_bytes());
    debug_assert_eq!(at, DATA_OFFSET);

    match &node.body {
        NodeBody::File(content) => put(&mut raw, &mut at, content),
        NodeBody::Directory(entries) => {
            for entry in entries {
                put(&mut raw, &mut at, &pack_dir_entry(entry.node_id, &entry.name)?);
            }
        }
    }
    Ok(raw)
}

pub fn decode_node(raw: &[u8]) -> CfsResult<Node> {
    if raw.len() != NODE_SIZE {
        return Err(CfsError::InvalidContainer(format!(
            "node record is {} bytes, expected {}",
            raw.len(),
            NODE_SIZE
        )));
    }
    let mut at = 0;
    let deleted = match take(raw, &mut at, 1)[0] {
        0 => false,
        1 => true,
        other => {
            return Err(CfsError::InvalidContainer(format!(
                "bad deleted flag {}",
                other
            )))
        }
    };
    let id = u32!(take(raw, &mut at, 4));
    let name = take_name(raw, &mut at)?;
    let size = u32!(take(raw, &mut at, 4)) as usize;
    let code = u32!(take(raw, &mut at, 4));
    let kind = NodeKind::from_code(code).ok_or_else(|| {
        CfsError::InvalidContainer(format!("node {} has unknown kind {}", id, code))
    })?;
    let parent = u32!(take(raw, &mut at, 4));
    let created = i64!(take(raw, &mut at, 8));
    let accessed = i64!(take(raw, &mut at, 8));
    let modified = i64!(take(raw, &mut at, 8));
    let link_count = u32!(take(raw, &mut at, 4));

    if size > DATA_CAPACITY {
        return Err(CfsError::InvalidContainer(format!(
            "node {} claims {} bytes of data",
            id, size
        )));
    }
    let data = &raw[DATA_OFFSET..DATA_OFFSET + size];
    let body = match kind {
        NodeKind::File => NodeBody::File(data.to_vec()),
        NodeKind::Directory => {
            if size % ENTRY_WIDTH != 0 {
                return Err(CfsError::InvalidContainer(format!(
                    "directory {} size {} is not a multiple of {}",
                    id, size, ENTRY_WIDTH
                )));
            }
            let entries = data
                .chunks_exact(ENTRY_WIDTH)
                .map(unpack_dir_entry)
                .collect::<CfsResult<Vec<_>>>()?;
            check_entries(id, &entries)?;
            NodeBody::Directory(entries)
        }
    };

    Ok(Node {
        deleted,
        id,
        name,
        parent,
        created,
        accessed,
        modified,
        link_count,
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn long_name() -> String {
        "n".repeat(NAME_CAPACITY)
    }

    #[test]
    fn file_node_survives_encoding() {
        let mut node = Node::new_file(7, &long_name(), 3, vec![0xab; DATA_CAPACITY]);
        node.link_count = 2;
        let raw = encode_node(&node).unwrap();
        assert_eq!(raw.len(), NODE_SIZE);
        let decoded = decode_node(&raw).unwrap();
        assert_eq!(decoded, node);
        assert_eq!(encode_node(&decoded).unwrap(), raw);
    }

    #[test]
    fn directory_node_keeps_entry_order() {
        let mut node = Node::new_directory(4, "docs", 0);
        node.entries_mut()
            .unwrap()
            .extend([DirEntry::new(9, "b"), DirEntry::new(5, &long_name())]);
        let raw = encode_node(&node).unwrap();
        let size_at = 1 + 4 + NAME_CAPACITY;
        assert_eq!(u32!(&raw[size_at..size_at + 4]) as usize, 4 * ENTRY_WIDTH);

        let decoded = decode_node(&raw).unwrap();
        let names: Vec<_> = decoded.entries().unwrap().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, [".", "..", "b", long_name().as_str()]);
        assert_eq!(decoded.entries().unwrap()[0].node_id, 4);
        assert_eq!(decoded.entries().unwrap()[1].node_id, 0);
        assert_eq!(encode_node(&decoded).unwrap(), raw);
    }

    #[test]
    fn tombstone_flag_is_first_byte() {
        let mut node = Node::new_file(2, "gone", 0, b"x".to_vec());
        node.deleted = true;
        let raw = encode_node(&node).unwrap();
        assert_eq!(raw[0], 1);
        assert!(decode_node(&raw).unwrap().deleted);
    }

    #[test]
    fn overlong_name_is_rejected() {
        let name = "x".repeat(NAME_CAPACITY + 1);
        assert!(matches!(
            pack_dir_entry(1, &name),
            Err(CfsError::NameTooLong { .. })
        ));
        let node = Node::new_file(1, &name, 0, Vec::new());
        assert!(matches!(encode_node(&node), Err(CfsError::NameTooLong { .. })));
    }

    #[test]
    fn oversized_content_is_rejected() {
        let node = Node::new_file(1, "big", 0, vec![0; DATA_CAPACITY + 1]);
        assert!(matches!(
            encode_node(&node),
            Err(CfsError::ContentTooLarge { .. })
        ));
    }

    #[test]
    fn dir_entry_is_id_then_padded_name() {
        let raw = pack_dir_entry(0x0102_0304, "ab").unwrap();
        assert_eq!(&raw[..4], &[4, 3, 2, 1]);
        assert_eq!(&raw[4..6], b"ab");
        assert!(raw[6..].iter().all(|&b| b == 0));
        assert_eq!(unpack_dir_entry(&raw).unwrap(), DirEntry::new(0x0102_0304, "ab"));
    }

    #[test]
    fn short_entry_is_corruption() {
        assert!(matches!(
            unpack_dir_entry(&[0u8; 3]),
            Err(CfsError::InvalidContainer(_))
        ));
        assert!(matches!(
            unpack_dir_entry(&[0u8; ENTRY_WIDTH + 1]),
            Err(CfsError::InvalidContainer(_))
        ));
    }

    #[test]
    fn unsafe_entry_names_are_corruption() {
        for bad in ["../escaped", "a/b", ".", "..", ""] {
            let mut node = Node::new_directory(4, "d", 0);
            node.entries_mut().unwrap().push(DirEntry::new(9, bad));
            let raw = encode_node(&node).unwrap();
            assert!(
                matches!(decode_node(&raw), Err(CfsError::InvalidContainer(_))),
                "accepted {:?}",
                bad
            );
        }

        let mut swapped = Node::new_directory(4, "d", 0);
        swapped.entries_mut().unwrap().swap(0, 1);
        let raw = encode_node(&swapped).unwrap();
        assert!(matches!(decode_node(&raw), Err(CfsError::InvalidContainer(_))));
    }

    #[test]
    fn unknown_kind_is_corruption() {
        let mut raw = encode_node(&Node::new_file(1, "f", 0, Vec::new())).unwrap();
        // kind sits after deleted, id, name and size
        let kind_at = 1 + 4 + NAME_CAPACITY + 4;
        raw[kind_at] = 7;
        assert!(matches!(decode_node(&raw), Err(CfsError::InvalidContainer(_))));
    }

    #[test]
    fn superblock_layout() {
        let sb = Superblock {
            block_size: 1,
            filename_size: 50,
            max_file_size: 1000,
            max_dir_entries: 18,
        };
        let raw = encode_superblock(&sb);
        assert_eq!(i32!(&raw[8..12]), 1000);
        assert_eq!(decode_superblock(&raw).unwrap(), sb);

        let mut bad = raw;
        bad[16] ^= 0xff;
        assert!(matches!(
            decode_superblock(&bad),
            Err(CfsError::InvalidContainer(_))
        ));
    }
}
