//! Extent allocator working over the allocation-table chain of a
//! [`Descriptors`] set.
//!
//! Units are searched linearly in (table, slot) order. Splitting a unit
//! needs an `Unused` slot for the remainder; when the chain has none left a
//! new allocation table is carved out of the data region it describes.

use crate::fs::consts::{ALLOC_TABLE_SIZE, DIR_TABLE_SIZE, MAX_ALLOC_TABLES};
use crate::fs::descriptors::Descriptors;
use crate::fs::error::{FsError, Result};
use crate::fs::layout::{AllocationTable, AllocationUnit, DirectoryTable, UnitIndex, UnitType};
use log::debug;

impl Descriptors {
    pub fn find_unit(&self, unit_type: UnitType) -> Option<UnitIndex> {
        self.units()
            .find(|(_, unit)| unit.is(unit_type))
            .map(|(idx, _)| idx)
    }

    pub fn find_unit_of_size(&self, unit_type: UnitType, min_size: u32) -> Option<UnitIndex> {
        self.units()
            .find(|(_, unit)| unit.is(unit_type) && unit.size >= min_size)
            .map(|(idx, _)| idx)
    }

    /// Bytes held by `Occupied` and `System` units.
    pub fn allocated_bytes(&self) -> u64 {
        self.units()
            .filter(|(_, unit)| unit.is(UnitType::Occupied) || unit.is(UnitType::System))
            .map(|(_, unit)| unit.size as u64)
            .sum()
    }

    fn out_of_space(&self, required: u64) -> FsError {
        FsError::OutOfSpace {
            required,
            free: self.info.free,
        }
    }

    fn checked_unit(&self, idx: UnitIndex) -> Result<AllocationUnit> {
        self.unit(idx)
            .copied()
            .ok_or(FsError::InvalidFormat("unit index past the allocation chain"))
    }

    fn checked_unit_mut(&mut self, idx: UnitIndex) -> Result<&mut AllocationUnit> {
        self.unit_mut(idx)
            .ok_or(FsError::InvalidFormat("unit index past the allocation chain"))
    }

    /// Shrinks `idx` to `size` bytes and records the rest as a new free unit
    /// in the first unused slot.
    fn split_unit(&mut self, idx: UnitIndex, size: u32) -> Result<()> {
        let unit = self.checked_unit(idx)?;
        let spare = self
            .find_unit(UnitType::Unused)
            .ok_or_else(|| self.out_of_space(size as u64))?;

        let remainder = match (unit.offset.checked_add(size), unit.size.checked_sub(size)) {
            (Some(offset), Some(rest)) if rest > 0 => AllocationUnit::free(offset, rest),
            _ => return Err(FsError::InvalidFormat("unit extent out of range")),
        };
        let table = &mut self.allocation_tables[spare.table()];
        table.unused_units = table
            .unused_units
            .checked_sub(1)
            .ok_or(FsError::InvalidFormat("unused unit count mismatch"))?;
        self.checked_unit_mut(idx)?.size = size;
        *self.checked_unit_mut(spare)? = remainder;

        debug!(
            "split unit {} at +{}: remainder {} ({} B @ {})",
            idx, size, spare, remainder.size, remainder.offset
        );
        Ok(())
    }

    // Space handed to a unit is no longer counted as free.
    fn claim_free_space(&mut self, size: u32) -> Result<()> {
        self.info.free = self
            .info
            .free
            .checked_sub(size)
            .ok_or(FsError::InvalidFormat("free space below allocated size"))?;
        Ok(())
    }

    // The slot goes back to the pool of unused descriptors.
    fn release_slot(&mut self, idx: UnitIndex) -> Result<()> {
        *self.checked_unit_mut(idx)? = AllocationUnit::unused();
        self.allocation_tables[idx.table()].unused_units += 1;
        Ok(())
    }

    /// Turns a free unit of at least `size` bytes into a `System` unit of
    /// exactly `size` bytes.
    pub fn allocate_system_block(&mut self, size: u32) -> Result<UnitIndex> {
        loop {
            let idx = self
                .find_unit_of_size(UnitType::Free, size)
                .ok_or_else(|| self.out_of_space(size as u64))?;

            if self.checked_unit(idx)?.size > size {
                if self.find_unit(UnitType::Unused).is_none() {
                    // The new table may have taken `idx`, search again.
                    self.create_allocation_block()?;
                    continue;
                }
                self.split_unit(idx, size)?;
            }

            let unit = self.checked_unit_mut(idx)?;
            unit.unit_type = UnitType::System;
            unit.next_block = None;
            self.claim_free_space(size)?;
            debug!("allocated system unit {} ({} B)", idx, size);
            return Ok(idx);
        }
    }

    /// Appends an empty allocation table stored inside the data region.
    pub fn create_allocation_block(&mut self) -> Result<UnitIndex> {
        let size = ALLOC_TABLE_SIZE as u32;
        if self.allocation_tables.len() >= MAX_ALLOC_TABLES {
            return Err(self.out_of_space(size as u64));
        }
        let carrier = self
            .find_unit_of_size(UnitType::Free, size)
            .ok_or_else(|| self.out_of_space(size as u64))?;

        // The new table provides the unused slot for the carrier's remainder.
        self.allocation_tables.push(AllocationTable::empty());
        if self.checked_unit(carrier)?.size > size {
            self.split_unit(carrier, size)?;
        }

        let unit = self.checked_unit_mut(carrier)?;
        unit.unit_type = UnitType::System;
        unit.next_block = None;
        self.claim_free_space(size)?;

        let count = self.allocation_tables.len();
        self.allocation_tables[count - 2].offset_next = Some(carrier);
        self.info.allocation_tables = count as u32;

        debug!("allocation table #{} stored in unit {}", count - 1, carrier);
        Ok(carrier)
    }

    /// Appends an empty directory table stored inside the data region and
    /// returns its position in the chain.
    pub fn create_directory_block(&mut self) -> Result<usize> {
        let carrier = self.allocate_system_block(DIR_TABLE_SIZE as u32)?;

        if let Some(last) = self.directory_tables.last_mut() {
            last.offset_next = Some(carrier);
        }
        self.directory_tables.push(DirectoryTable::empty());
        let count = self.directory_tables.len();
        self.info.directory_tables = count as u32;

        debug!("directory table #{} stored in unit {}", count - 1, carrier);
        Ok(count - 1)
    }

    /// Claims the first free unit for at most `need` bytes of file data.
    ///
    /// A unit larger than `need` is split and only its head is taken. The
    /// claimed unit is `Occupied` and terminates its chain; its size tells
    /// how much was taken.
    pub fn take_free_extent(&mut self, need: u32) -> Result<UnitIndex> {
        loop {
            let idx = self
                .find_unit(UnitType::Free)
                .ok_or_else(|| self.out_of_space(need as u64))?;

            if self.checked_unit(idx)?.size > need {
                if self.find_unit(UnitType::Unused).is_none() {
                    self.create_allocation_block()?;
                    continue;
                }
                self.split_unit(idx, need)?;
            }

            let unit = self.checked_unit_mut(idx)?;
            unit.unit_type = UnitType::Occupied;
            unit.next_block = None;
            return Ok(idx);
        }
    }

    /// Marks a unit free again and drops its chain link.
    pub fn free_unit(&mut self, idx: UnitIndex) -> Result<()> {
        let unit = self.checked_unit_mut(idx)?;
        unit.unit_type = UnitType::Free;
        unit.next_block = None;
        Ok(())
    }

    /// Merges the free unit `idx` with one adjacent free neighbour.
    ///
    /// The unit with the lower offset survives and the other slot becomes
    /// `Unused`. Returns the survivor, or `None` when nothing was merged;
    /// callers repeat until `None` to coalesce both sides.
    pub fn defragment(&mut self, idx: UnitIndex) -> Option<UnitIndex> {
        let unit = *self.unit(idx)?;
        if !unit.is(UnitType::Free) {
            return None;
        }

        let (other, neighbour) = self.units().find(|(i, n)| {
            *i != idx
                && n.is(UnitType::Free)
                && (n.end() == unit.offset as u64 || unit.end() == n.offset as u64)
        })?;
        let neighbour = *neighbour;
        let size = unit.size.checked_add(neighbour.size)?;

        let (survivor, absorbed) = if neighbour.offset < unit.offset {
            (other, idx)
        } else {
            (idx, other)
        };
        let merged = self.unit_mut(survivor)?;
        merged.offset = unit.offset.min(neighbour.offset);
        merged.size = size;
        merged.next_block = None;
        let merged = *merged;
        self.release_slot(absorbed).ok()?;

        debug!(
            "merged unit {} into {} ({} B @ {})",
            absorbed, survivor, merged.size, merged.offset
        );
        Some(survivor)
    }
}
