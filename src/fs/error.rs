use std::io;

/// Errors reported by the filesystem core.
#[derive(Debug, thiserror::Error)]
pub enum FsError {
    /// The backing file could not be opened or created.
    #[error("cannot open backing file: {0}")]
    CannotOpen(#[source] io::Error),

    /// A file with the same name already exists.
    #[error("file already exists: {0}")]
    Exists(String),

    /// The image is not a valid filesystem (bad magic or broken metadata).
    #[error("invalid filesystem image: {0}")]
    InvalidFormat(&'static str),

    /// A file name that can not be stored (empty or containing NUL).
    #[error("invalid file name: {0:?}")]
    InvalidName(String),

    /// No file with that name exists.
    #[error("file not found: {0}")]
    NotFound(String),

    /// Not enough free space, or a metadata table could not be allocated.
    #[error("not enough space: {required} B required, {free} B free")]
    OutOfSpace { required: u64, free: u32 },

    /// A filesystem can not be created with a zero-sized data region.
    #[error("invalid filesystem size: {0}")]
    InvalidSize(u64),

    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, FsError>;
