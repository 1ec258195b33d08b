use gfs::{FileSystem, FsError};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

/// The drive image a command works on.
pub struct Context {
    fs: Option<FileSystem<File>>,
    fs_path: Option<PathBuf>,
}

impl Context {
    pub fn new() -> Self {
        Self {
            fs: None,
            fs_path: None,
        }
    }

    /// Creates (or truncates) the image at `path` and formats it.
    pub fn create_fs<P: AsRef<Path>>(
        &mut self,
        path: P,
        size: u32,
    ) -> gfs::Result<&mut FileSystem<File>> {
        self.close_fs();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)
            .map_err(FsError::CannotOpen)?;

        let fs = FileSystem::create(file, size)?;
        self.fs_path = Some(path.as_ref().to_path_buf());
        Ok(self.fs.insert(fs))
    }

    /// Opens an existing image; read-only images can still be queried.
    pub fn open_fs<P: AsRef<Path>>(
        &mut self,
        path: P,
        writable: bool,
    ) -> gfs::Result<&mut FileSystem<File>> {
        self.close_fs();
        let file = OpenOptions::new()
            .read(true)
            .write(writable)
            .open(&path)
            .map_err(FsError::CannotOpen)?;

        let fs = FileSystem::open(file)?;
        self.fs_path = Some(path.as_ref().to_path_buf());
        Ok(self.fs.insert(fs))
    }

    pub fn close_fs(&mut self) {
        self.fs = None;
        self.fs_path = None;
    }

    pub fn fs_path(&self) -> Option<&Path> {
        self.fs_path.as_deref()
    }
}
