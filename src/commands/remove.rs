//! `remove <drive> <name>`
//!
//! Deletes a stored file. Its units become free and are merged with free
//! neighbours; tables allocated for metadata growth stay allocated.
//!
//! Errors:
//!   NotFound     - no file with that name
use super::Usage;
use crate::context::Context;
use anyhow::Result;
use colored::Colorize;

const USAGE: &str = "remove <drive> <name>";

pub fn handle_argv(argv: &[&str], context: &mut Context) -> Result<()> {
    let [drive, name] = argv else {
        return Err(Usage(USAGE).into());
    };

    let fs = context.open_fs(drive, true)?;
    fs.remove(name)?;

    println!("{} '{}'", "Removed".green(), name);
    Ok(())
}
