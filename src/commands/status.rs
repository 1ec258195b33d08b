use super::Usage;
use crate::context::Context;
use anyhow::Result;
use colored::Colorize;
use gfs::fs::consts::{ALLOC_UNITS, DATA_BASE, FS_VERSION, INFO_OFFSET};
use gfs::{UnitIndex, UnitType};

const USAGE: &str = "status <drive>";

/// status command:
/// Dumps the drive's metadata:
/// - info block (version, size, free space, table counts)
/// - every allocation table with its position and chain link
/// - every directory table with its occupied entries
/// - every live unit of the data region (free, used, system)
///
/// Errors:
/// - InvalidFormat if the drive is not a valid image
pub fn handle_argv(argv: &[&str], context: &mut Context) -> Result<()> {
    let [drive] = argv else {
        return Err(Usage(USAGE).into());
    };

    let fs = context.open_fs(drive, false)?;
    let desc = fs.descriptors()?;
    let alloc_offsets = desc.allocation_table_offsets()?;
    let dir_offsets = desc.directory_table_offsets()?;
    let info = &desc.info;

    println!("{}", "FileSystem".bold());
    println!("API Version: {}", String::from_utf8_lossy(&FS_VERSION));

    println!("\n{}", section("INFO SECTION", INFO_OFFSET));
    println!(
        "VERSION: {}\nSIZE: {}\nFREE: {}\nALLOCATION TABLES: {}\nDIRECTORY TABLES: {}",
        info.version_str(),
        info.size,
        info.free,
        info.allocation_tables,
        info.directory_tables
    );

    for (t, (table, offset)) in desc.allocation_tables.iter().zip(alloc_offsets).enumerate() {
        println!("\n{}", section(&format!("ALLOCATION TABLE #{t}"), offset));
        println!(
            "UNITS: {}\tUNUSED_UNITS: {}\tNEXT: {}",
            ALLOC_UNITS,
            table.unused_units,
            link_str(table.offset_next)
        );
    }

    for (t, (table, offset)) in desc.directory_tables.iter().zip(dir_offsets).enumerate() {
        println!("\n{}", section(&format!("DIRECTORY TABLE #{t}"), offset));
        println!(
            "FLAGS: 0x{:04x}\tNEXT: {}",
            table.files_flags,
            link_str(table.offset_next)
        );
        for (slot, entry) in table.files.iter().enumerate() {
            if table.is_occupied(slot) {
                println!(
                    "ID: {:2}\tNAME: {:<32}\tSIZE: {}\tBLOCK: {}",
                    slot,
                    entry.name_str(),
                    entry.size,
                    link_str(entry.block)
                );
            }
        }
    }

    println!("\n{}", section("DATA SECTION", DATA_BASE));
    fs.for_each_unit(|idx, unit| {
        let label = format!("{:<4}", unit.unit_type);
        let label = match unit.unit_type {
            UnitType::Unused => return,
            UnitType::Free => label.as_str().green(),
            UnitType::Occupied => label.as_str().yellow(),
            UnitType::System => label.as_str().cyan(),
        };
        print!(
            "{} BLOCK {}\tOFFSET: 0x{:06x}\tSIZE: {}",
            label, idx, unit.offset, unit.size
        );
        if unit.is(UnitType::Occupied) {
            print!("\tNEXT: {}", link_str(unit.next_block));
        }
        println!();
    })?;
    Ok(())
}

fn section(title: &str, offset: u64) -> String {
    format!("{} (OFF: 0x{:04x})", title, offset).as_str().bold().to_string()
}

fn link_str(link: Option<UnitIndex>) -> String {
    link.map_or_else(|| "END".to_string(), |idx| idx.raw().to_string())
}
