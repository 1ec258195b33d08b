use crate::context::Context;
use anyhow::Result;
use colored::Colorize;
use gfs::fs::consts::FS_VERSION;

pub fn handle_argv(_argv: &[&str], _context: &mut Context) -> Result<()> {
    println!(
        "{} - {}",
        "gfs".green(),
        env!("CARGO_PKG_VERSION").yellow()
    );
    println!("On-disk format version {}", String::from_utf8_lossy(&FS_VERSION));
    Ok(())
}
