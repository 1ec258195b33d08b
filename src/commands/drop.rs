//! `drop <drive>`
//!
//! Deletes the drive image from the host filesystem. The file is only
//! removed when it holds a valid image, so `drop` can not be used to delete
//! arbitrary host files.
use super::Usage;
use crate::context::Context;
use anyhow::{Context as _, Result};
use colored::Colorize;
use gfs::FsError;

const USAGE: &str = "drop <drive>";

pub fn handle_argv(argv: &[&str], context: &mut Context) -> Result<()> {
    let [drive] = argv else {
        return Err(Usage(USAGE).into());
    };

    context.open_fs(drive, false)?;
    let path = context
        .fs_path()
        .map(|p| p.to_path_buf())
        .ok_or_else(|| FsError::NotFound(drive.to_string()))?;
    context.close_fs();

    std::fs::remove_file(&path)
        .with_context(|| format!("cannot delete drive {}", path.display()))?;

    println!("{} {}", "Dropped".green(), path.display());
    Ok(())
}
