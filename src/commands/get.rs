//! `get <drive> <name> <destination>`
//!
//! Copies a stored file out of the drive into a host file. A destination of
//! `-` writes the content to stdout.
//!
//! Errors:
//!   NotFound     - no file with that name (the destination is left untouched)
//!   CannotOpen   - the drive or the destination can not be opened
use super::Usage;
use crate::context::Context;
use crate::utils::file_man::Destination;
use anyhow::{Context as _, Result};
use gfs::FsError;
use log::info;
use std::io;
use std::path::Path;

const USAGE: &str = "get <drive> <name> <destination>";

pub fn handle_argv(argv: &[&str], context: &mut Context) -> Result<()> {
    let [drive, name, dest] = argv else {
        return Err(Usage(USAGE).into());
    };

    let fs = context.open_fs(drive, false)?;
    let written = if *dest == "-" {
        let mut out = io::stdout().lock();
        fs.get(name, &mut out)?
    } else {
        let dest_path = Path::new(dest);
        let mut out = Destination::new(dest_path);
        match fs.get(name, &mut out) {
            Ok(written) => written,
            Err(FsError::Io(err)) if out.open_failed() => {
                return Err(FsError::CannotOpen(err))
                    .with_context(|| format!("cannot create {}", dest_path.display()));
            }
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("cannot copy '{}' to {}", name, dest_path.display()));
            }
        }
    };

    info!("'{}': {} B written to {}", name, written, dest);
    Ok(())
}
