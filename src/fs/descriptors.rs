//! In-memory copy of every metadata structure of an image.
//!
//! The image is always handled as a whole: [`Descriptors::load`] reads the
//! info block and both table chains, [`Descriptors::save`] rewrites all of
//! them. Tables past the first one of each chain live inside `System` units
//! of the data region, so their position is resolved through the allocation
//! units, which is why allocation tables are always loaded first.

use crate::fs::consts::{
    ALLOC_TABLE_OFFSET, ALLOC_TABLE_SIZE, DIR_TABLE_OFFSET, DIR_TABLE_SIZE, MAX_ALLOC_TABLES,
};
use crate::fs::error::{FsError, Result};
use crate::fs::io::{
    BackingStore, data_position, read_allocation_table, read_directory_table, read_info,
    write_allocation_table, write_directory_table, write_info,
};
use crate::fs::layout::{
    AllocationTable, AllocationUnit, DirectoryTable, FileEntry, InfoBlock, UnitIndex, UnitType,
    truncate_name,
};
use log::debug;

/// Position of a file entry: (directory table, slot).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryIndex {
    pub table: usize,
    pub slot: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Descriptors {
    pub info: InfoBlock,
    pub allocation_tables: Vec<AllocationTable>,
    pub directory_tables: Vec<DirectoryTable>,
}

impl Descriptors {
    /// Metadata of a freshly created filesystem with `size` bytes of data.
    pub fn format(size: u32) -> Self {
        Self {
            info: InfoBlock::new(size),
            allocation_tables: vec![AllocationTable::spanning(size)],
            directory_tables: vec![DirectoryTable::empty()],
        }
    }

    pub fn load<S: BackingStore>(f: &mut S) -> Result<Self> {
        let info = read_info(f)?;
        if info.free > info.size {
            return Err(FsError::InvalidFormat("free space exceeds size"));
        }
        let alloc_count = info.allocation_tables as usize;
        let dir_count = info.directory_tables as usize;
        if alloc_count == 0 || dir_count == 0 || alloc_count > MAX_ALLOC_TABLES {
            return Err(FsError::InvalidFormat("bad table count"));
        }

        let mut desc = Self {
            info,
            allocation_tables: vec![read_allocation_table(f, ALLOC_TABLE_OFFSET)?],
            directory_tables: Vec::new(),
        };

        let mut next = desc.allocation_tables[0].offset_next;
        while let Some(link) = next {
            if desc.allocation_tables.len() >= alloc_count {
                return Err(FsError::InvalidFormat("allocation chain too long"));
            }
            let offset = desc.chain_offset(link, ALLOC_TABLE_SIZE)?;
            let table = read_allocation_table(f, offset)?;
            next = table.offset_next;
            desc.allocation_tables.push(table);
        }
        if desc.allocation_tables.len() != alloc_count {
            return Err(FsError::InvalidFormat("allocation chain too short"));
        }
        desc.check_units()?;

        let first = read_directory_table(f, DIR_TABLE_OFFSET)?;
        let mut next = first.offset_next;
        desc.directory_tables.push(first);
        while let Some(link) = next {
            if desc.directory_tables.len() >= dir_count {
                return Err(FsError::InvalidFormat("directory chain too long"));
            }
            let offset = desc.chain_offset(link, DIR_TABLE_SIZE)?;
            let table = read_directory_table(f, offset)?;
            next = table.offset_next;
            desc.directory_tables.push(table);
        }
        if desc.directory_tables.len() != dir_count {
            return Err(FsError::InvalidFormat("directory chain too short"));
        }

        debug!(
            "loaded descriptors: {} allocation table(s), {} directory table(s)",
            alloc_count, dir_count
        );
        Ok(desc)
    }

    /// Rewrites the info block and every table. All positions are resolved
    /// before the first write.
    pub fn save<S: BackingStore>(&self, f: &mut S) -> Result<()> {
        let alloc_offsets = self.allocation_table_offsets()?;
        let dir_offsets = self.directory_table_offsets()?;

        let mut info = self.info.clone();
        info.allocation_tables = self.allocation_tables.len() as u32;
        info.directory_tables = self.directory_tables.len() as u32;

        write_info(f, &info)?;
        for (table, offset) in self.allocation_tables.iter().zip(alloc_offsets) {
            write_allocation_table(f, offset, table)?;
        }
        for (table, offset) in self.directory_tables.iter().zip(dir_offsets) {
            write_directory_table(f, offset, table)?;
        }
        f.flush()?;
        Ok(())
    }

    pub fn discard(self) {}

    // Live units must tile the data region and agree with the counters kept
    // in the info block and the tables.
    fn check_units(&self) -> Result<()> {
        for table in &self.allocation_tables {
            let unused = table.units.iter().filter(|u| u.is(UnitType::Unused)).count();
            if table.unused_units as usize != unused {
                return Err(FsError::InvalidFormat("unused unit count mismatch"));
            }
        }

        let mut extents: Vec<(u64, u64)> = self
            .units()
            .filter(|(_, unit)| !unit.is(UnitType::Unused))
            .map(|(_, unit)| (unit.offset as u64, unit.end()))
            .collect();
        extents.sort_unstable();
        let mut covered = 0u64;
        for (start, end) in extents {
            if start != covered || end == start {
                return Err(FsError::InvalidFormat("units do not tile the data region"));
            }
            covered = end;
        }
        if covered != self.info.size as u64 {
            return Err(FsError::InvalidFormat("units do not tile the data region"));
        }

        let free: u64 = self
            .units()
            .filter(|(_, unit)| unit.is(UnitType::Free))
            .map(|(_, unit)| unit.size as u64)
            .sum();
        if free != self.info.free as u64 {
            return Err(FsError::InvalidFormat("free space does not match free units"));
        }
        Ok(())
    }

    /// Absolute byte offsets of the allocation tables, in chain order.
    pub fn allocation_table_offsets(&self) -> Result<Vec<u64>> {
        self.resolve_chain(
            ALLOC_TABLE_OFFSET,
            self.allocation_tables.iter().map(|t| t.offset_next),
            ALLOC_TABLE_SIZE,
        )
    }

    /// Absolute byte offsets of the directory tables, in chain order.
    pub fn directory_table_offsets(&self) -> Result<Vec<u64>> {
        self.resolve_chain(
            DIR_TABLE_OFFSET,
            self.directory_tables.iter().map(|t| t.offset_next),
            DIR_TABLE_SIZE,
        )
    }

    fn resolve_chain<I>(&self, fixed: u64, links: I, table_size: usize) -> Result<Vec<u64>>
    where
        I: ExactSizeIterator<Item = Option<UnitIndex>>,
    {
        let len = links.len();
        let mut offsets = Vec::with_capacity(len);
        offsets.push(fixed);
        for link in links.take(len.saturating_sub(1)) {
            let link = link.ok_or(FsError::InvalidFormat("table chain ends early"))?;
            offsets.push(self.chain_offset(link, table_size)?);
        }
        Ok(offsets)
    }

    // Position of a table stored inside the unit `link`.
    fn chain_offset(&self, link: UnitIndex, table_size: usize) -> Result<u64> {
        let unit = self
            .unit(link)
            .ok_or(FsError::InvalidFormat("table link points past the allocation chain"))?;
        if !unit.is(UnitType::System) || (unit.size as usize) < table_size {
            return Err(FsError::InvalidFormat("table link does not point at a system unit"));
        }
        if unit.end() > self.info.size as u64 {
            return Err(FsError::InvalidFormat("table lies outside the data region"));
        }
        Ok(data_position(unit.offset))
    }

    pub fn unit(&self, idx: UnitIndex) -> Option<&AllocationUnit> {
        self.allocation_tables
            .get(idx.table())
            .map(|table| &table.units[idx.slot()])
    }

    pub fn unit_mut(&mut self, idx: UnitIndex) -> Option<&mut AllocationUnit> {
        self.allocation_tables
            .get_mut(idx.table())
            .map(|table| &mut table.units[idx.slot()])
    }

    /// Every unit slot in (table, slot) order, including unused ones.
    pub fn units(&self) -> impl Iterator<Item = (UnitIndex, &AllocationUnit)> {
        self.allocation_tables
            .iter()
            .enumerate()
            .flat_map(|(t, table)| {
                table
                    .units
                    .iter()
                    .enumerate()
                    .map(move |(s, unit)| (UnitIndex::new(t, s), unit))
            })
    }

    /// Occupied directory entries in (table, slot) order.
    pub fn entries(&self) -> impl Iterator<Item = (EntryIndex, &FileEntry)> {
        self.directory_tables
            .iter()
            .enumerate()
            .flat_map(|(t, table)| {
                table
                    .files
                    .iter()
                    .enumerate()
                    .filter(move |(s, _)| table.is_occupied(*s))
                    .map(move |(s, entry)| (EntryIndex { table: t, slot: s }, entry))
            })
    }

    pub fn entry(&self, idx: EntryIndex) -> Option<&FileEntry> {
        self.directory_tables
            .get(idx.table)
            .filter(|table| table.is_occupied(idx.slot))
            .map(|table| &table.files[idx.slot])
    }

    /// Looks a file up by name. The name is truncated the same way it is
    /// when a file is added, so over-long names still match.
    pub fn find_file(&self, name: &str) -> Option<(EntryIndex, FileEntry)> {
        let name = truncate_name(name);
        self.entries()
            .find(|(_, entry)| entry.name_str() == name)
            .map(|(idx, entry)| (idx, *entry))
    }

    /// Lowest free directory slot across the chain.
    pub fn free_entry_slot(&self) -> Option<EntryIndex> {
        self.directory_tables
            .iter()
            .enumerate()
            .find_map(|(table, dir)| dir.free_slot().map(|slot| EntryIndex { table, slot }))
    }
}
