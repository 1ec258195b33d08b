use anyhow::{Context as _, Result};
use gfs::FsError;
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Makes sure a new drive image can be created at `path`, creating missing
/// parent directories.
pub fn prepare_drive_path(path: &Path) -> Result<()> {
    if path.is_dir() {
        return Err(FsError::CannotOpen(std::io::Error::other("path points to a directory")))
            .with_context(|| format!("cannot create drive {}", path.display()));
    }

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)
                .map_err(FsError::CannotOpen)
                .with_context(|| format!("cannot create directory {}", parent.display()))?;
        }
    }
    Ok(())
}

/// Opens a host file to copy into a drive, with its length.
pub fn open_source(path: &Path) -> Result<(File, u64)> {
    let file = File::open(path)
        .map_err(FsError::CannotOpen)
        .with_context(|| format!("cannot open {}", path.display()))?;
    let len = file
        .metadata()
        .with_context(|| format!("cannot stat {}", path.display()))?
        .len();
    Ok((file, len))
}

/// Host file a drive file is copied to. It is created (or truncated) on the
/// first write or flush, so a lookup that fails leaves it untouched.
pub struct Destination {
    path: PathBuf,
    file: Option<BufWriter<File>>,
    open_failed: bool,
}

impl Destination {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            file: None,
            open_failed: false,
        }
    }

    /// Whether an I/O error came from creating the file.
    pub fn open_failed(&self) -> bool {
        self.open_failed
    }

    fn file(&mut self) -> io::Result<&mut BufWriter<File>> {
        if self.file.is_none() {
            let file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&self.path)
                .inspect_err(|_| self.open_failed = true)?;
            self.file = Some(BufWriter::new(file));
        }
        self.file
            .as_mut()
            .ok_or_else(|| io::Error::other("destination not open"))
    }
}

impl Write for Destination {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file()?.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file()?.flush()
    }
}

/// Name a host file is stored under when none is given.
pub fn default_name(path: &Path) -> Option<&str> {
    path.file_name().and_then(|name| name.to_str())
}
