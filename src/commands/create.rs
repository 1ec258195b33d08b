//! `create` command implementation.
//!
//! Usage:
//!   create <SIZE> <DRIVE>
//!
//! SIZE examples (powers of 1024):
//!   1024
//!   64KB
//!   2MB
//!   4096B
//!
//! Semantics:
//! - Creates the drive image (truncating an existing one) with a data region
//!   of SIZE bytes, preceded by the info block, the first allocation table
//!   and the first directory table.
//! - The whole data region starts out as one free unit and is zero-filled.
use super::Usage;
use crate::context::Context;
use crate::utils::file_man::prepare_drive_path;
use anyhow::{Context as _, Result};
use colored::Colorize;
use gfs::FsError;
use std::path::Path;

const USAGE: &str = "create <size> <drive>";

pub fn handle_argv(argv: &[&str], context: &mut Context) -> Result<()> {
    let [size_str, drive] = argv else {
        return Err(Usage(USAGE).into());
    };

    let bytes = parse_size(size_str).ok_or(Usage(USAGE))?;
    let size = match u32::try_from(bytes) {
        Ok(size) if size > 0 => size,
        _ => return Err(FsError::InvalidSize(bytes).into()),
    };

    let path = Path::new(drive);
    prepare_drive_path(path)?;
    let fs = context
        .create_fs(path, size)
        .with_context(|| format!("cannot create drive {}", path.display()))?;
    let info = fs.info()?;

    println!(
        "{} {} ({} B data, {} B free)",
        "Created".green(),
        path.display(),
        info.size,
        info.free
    );
    Ok(())
}

/// Parse a size string like "2MB", "64KB", "4096B" or "1024".
fn parse_size(s: &str) -> Option<u64> {
    let (num_part, unit_part) = split_number_unit(s);
    if num_part.is_empty() {
        return None;
    }
    let base: u64 = num_part.parse().ok()?;

    let mul = match unit_part.to_ascii_uppercase().as_str() {
        "" | "B" => 1,
        "KB" => 1_024,
        "MB" => 1_024 * 1_024,
        "GB" => 1_024 * 1_024 * 1_024,
        _ => return None,
    };
    base.checked_mul(mul)
}

/// Split string into (numeric_part, unit_part) at first non-digit.
fn split_number_unit(s: &str) -> (&str, &str) {
    let idx = s
        .char_indices()
        .find(|(_, ch)| !ch.is_ascii_digit())
        .map_or(s.len(), |(i, _)| i);
    s.split_at(idx)
}
