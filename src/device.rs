//! Byte-addressed storage behind a container.
//!
//! The container never keeps more than one record in memory; every
//! operation seeks straight to `SUPERBLOCK_SIZE + id * NODE_SIZE` on the
//! device and reads or writes one fixed-width record.

use std::{
    fs::{File, OpenOptions},
    io::{Read, Seek, SeekFrom, Write},
    path::Path,
};

use spin::Mutex;

use crate::error::{CfsError, CfsResult};

pub trait BlockDevice: Send + Sync {
    /// Fill `buf` from `pos`. Reading past the end is an error.
    fn read_at(&self, pos: u64, buf: &mut [u8]) -> CfsResult<()>;
    /// Write `buf` at `pos`, growing the device when needed.
    fn write_at(&self, pos: u64, buf: &[u8]) -> CfsResult<()>;
    fn size(&self) -> CfsResult<u64>;
    fn flush(&self) -> CfsResult<()> {
        Ok(())
    }
}

/// A host file holding a container.
pub struct FileDevice {
    file: Mutex<File>,
}

impl FileDevice {
    /// Create (or truncate) `path`.
    pub fn create<P: AsRef<Path>>(path: P) -> CfsResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }

    /// Open an existing file read/write.
    pub fn open<P: AsRef<Path>>(path: P) -> CfsResult<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl BlockDevice for FileDevice {
    fn read_at(&self, pos: u64, buf: &mut [u8]) -> CfsResult<()> {
        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(pos))?;
        file.read_exact(buf).map_err(|e| match e.kind() {
            std::io::ErrorKind::UnexpectedEof => {
                CfsError::InvalidContainer(format!("short read at offset {}", pos))
            }
            _ => CfsError::Io(e),
        })
    }

    fn write_at(&self, pos: u64, buf: &[u8]) -> CfsResult<()> {
        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(pos))?;
        file.write_all(buf)?;
        Ok(())
    }

    fn size(&self) -> CfsResult<u64> {
        Ok(self.file.lock().metadata()?.len())
    }

    fn flush(&self) -> CfsResult<()> {
        self.file.lock().sync_all()?;
        Ok(())
    }
}

/// A container kept entirely in memory.
#[derive(Default)]
pub struct MemDevice {
    data: Mutex<Vec<u8>>,
}

impl MemDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the raw bytes, for inspection.
    pub fn snapshot(&self) -> Vec<u8> {
        self.data.lock().clone()
    }
}

impl BlockDevice for MemDevice {
    fn read_at(&self, pos: u64, buf: &mut [u8]) -> CfsResult<()> {
        let data = self.data.lock();
        let start = pos as usize;
        let end = start + buf.len();
        if end > data.len() {
            return Err(CfsError::InvalidContainer(format!(
                "short read at offset {}",
                pos
            )));
        }
        buf.copy_from_slice(&data[start..end]);
        Ok(())
    }

    fn write_at(&self, pos: u64, buf: &[u8]) -> CfsResult<()> {
        let mut data = self.data.lock();
        let start = pos as usize;
        let end = start + buf.len();
        if end > data.len() {
            data.resize(end, 0);
        }
        data[start..end].copy_from_slice(buf);
        Ok(())
    }

    fn size(&self) -> CfsResult<u64> {
        Ok(self.data.lock().len() as u64)
    }
}
