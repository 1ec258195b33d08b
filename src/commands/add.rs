//! `add <drive> <file> [name]`
//!
//! Copies a host file into the drive. The file is stored under its host file
//! name unless `name` is given; names longer than 32 bytes are truncated.
//!
//! Errors:
//!   Exists       - a file with that name is already stored
//!   OutOfSpace   - the content (plus any directory table it needs) does not fit
//!   CannotOpen   - the drive or the host file can not be opened
use super::Usage;
use crate::context::Context;
use crate::utils::file_man::{default_name, open_source};
use anyhow::{Context as _, Result};
use colored::Colorize;
use std::io::BufReader;
use std::path::Path;

const USAGE: &str = "add <drive> <file> [name]";

pub fn handle_argv(argv: &[&str], context: &mut Context) -> Result<()> {
    let (drive, host_src, name) = match argv {
        [drive, src] => (*drive, *src, None),
        [drive, src, name] => (*drive, *src, Some(*name)),
        _ => return Err(Usage(USAGE).into()),
    };
    let host_path = Path::new(host_src);
    let name = match name.or_else(|| default_name(host_path)) {
        Some(name) if !name.is_empty() => name,
        _ => return Err(Usage(USAGE).into()),
    };

    let (file, len) = open_source(host_path)?;
    let fs = context.open_fs(drive, true)?;
    fs.add(name, len, &mut BufReader::new(file))
        .with_context(|| format!("cannot add {} as '{}'", host_path.display(), name))?;

    println!("{} '{}' ({} B)", "Added".green(), name, len);
    Ok(())
}
