use super::Usage;
use crate::context::Context;
use anyhow::Result;
use chrono::{DateTime, Local};
use colored::Colorize;

const USAGE: &str = "tree <drive>";

/// `tree <drive>`
///
/// Lists every stored file, in directory-table order, with its size and
/// creation time.
pub fn handle_argv(argv: &[&str], context: &mut Context) -> Result<()> {
    let [drive] = argv else {
        return Err(Usage(USAGE).into());
    };

    let fs = context.open_fs(drive, false)?;
    let info = fs.info()?;

    println!("{}", "Files:".bold());
    let mut count = 0usize;
    let mut total = 0u64;
    fs.for_each_file_entry(|_, entry| {
        println!(
            "  {:<32}  {:>10} B  {}",
            entry.name_str(),
            entry.size,
            created_str(entry.created).as_str().dimmed()
        );
        count += 1;
        total += entry.size as u64;
    })?;

    println!(
        "{} file(s), {} B stored, {} B free of {} B",
        count, total, info.free, info.size
    );
    Ok(())
}

fn created_str(created: u64) -> String {
    i64::try_from(created)
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .map(|utc| utc.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "-".to_string())
}
