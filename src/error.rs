//! Error type shared by every layer of the container filesystem.

use std::io;

pub type CfsResult<T> = Result<T, CfsError>;

#[derive(Debug, onlyerror::Error)]
pub enum CfsError {
    #[error("no such file or directory: {0}")]
    NotFound(String),
    #[error("entry already exists: {0}")]
    AlreadyExists(String),
    #[error("not a directory: {0}")]
    NotADirectory(String),
    #[error("not a file: {0}")]
    NotAFile(String),
    #[error("directory is full")]
    DirectoryFull,
    #[error("content of {size} bytes exceeds the {max} byte limit")]
    ContentTooLarge { size: usize, max: usize },
    #[error("name `{name}` is longer than {max} bytes")]
    NameTooLong { name: String, max: usize },
    #[error("invalid name: `{0}`")]
    InvalidName(String),
    #[error("the root directory cannot be removed or moved")]
    CannotRemoveRoot,
    #[error("directory is in use as the working directory: {0}")]
    Busy(String),
    #[error("invalid move: {0}")]
    InvalidMove(String),
    #[error("container parameters rejected: {0}")]
    ConstraintViolation(String),
    #[error("not a valid container: {0}")]
    InvalidContainer(String),
    #[error("container handle is closed")]
    Closed,
    #[error("I/O error: {0}")]
    Io(io::Error),
}

impl From<io::Error> for CfsError {
    fn from(err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::NotFound {
            return CfsError::NotFound(err.to_string());
        }
        CfsError::Io(err)
    }
}
