//! Container creation parameters.

use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::{
    error::{CfsError, CfsResult},
    models::Superblock,
    DATA_CAPACITY, ENTRY_WIDTH, NAME_CAPACITY,
};

/// Parameters recorded in the superblock of a new container.
///
/// Every field has a default, so a JSON file only needs the values it
/// overrides:
///
/// ```json
/// { "max_file_size": 540, "max_dir_entries": 10 }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormatConfig {
    pub block_size: i32,
    pub filename_size: i32,
    pub max_file_size: i32,
    pub max_dir_entries: i32,
}

impl Default for FormatConfig {
    fn default() -> Self {
        Self {
            block_size: 1,
            filename_size: NAME_CAPACITY as i32,
            max_file_size: DATA_CAPACITY as i32,
            max_dir_entries: (DATA_CAPACITY / ENTRY_WIDTH) as i32,
        }
    }
}

impl FormatConfig {
    pub fn from_json(text: &str) -> CfsResult<Self> {
        serde_json::from_str(text)
            .map_err(|e| CfsError::ConstraintViolation(format!("bad config: {}", e)))
    }

    pub fn load<P: AsRef<Path>>(path: P) -> CfsResult<Self> {
        Self::from_json(&fs::read_to_string(path)?)
    }

    /// Check the parameters against the compiled-in record layout.
    pub fn validate(&self) -> CfsResult<Superblock> {
        let reject = |msg: String| -> CfsResult<Superblock> {
            Err(CfsError::ConstraintViolation(msg))
        };

        if self.block_size <= 0 {
            return reject(format!("block size {} must be positive", self.block_size));
        }
        if self.filename_size <= 0 || self.filename_size as usize > NAME_CAPACITY {
            return reject(format!(
                "filename size {} must be within 1..={}",
                self.filename_size, NAME_CAPACITY
            ));
        }
        if self.max_file_size <= 0 || self.max_file_size as usize > DATA_CAPACITY {
            return reject(format!(
                "max file size {} must be within 1..={}",
                self.max_file_size, DATA_CAPACITY
            ));
        }
        // every directory starts with `.` and `..`
        if self.max_dir_entries < 2 {
            return reject(format!(
                "max directory entries {} must be at least 2",
                self.max_dir_entries
            ));
        }
        let dir_bytes = self.max_dir_entries as usize * ENTRY_WIDTH;
        if dir_bytes > self.max_file_size as usize {
            return reject(format!(
                "{} directory entries need {} bytes, more than the max file size {}",
                self.max_dir_entries, dir_bytes, self.max_file_size
            ));
        }

        Ok(Superblock {
            block_size: self.block_size,
            filename_size: self.filename_size,
            max_file_size: self.max_file_size,
            max_dir_entries: self.max_dir_entries,
        })
    }
}
