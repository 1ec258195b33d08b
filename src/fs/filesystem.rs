use crate::fs::descriptors::{Descriptors, EntryIndex};
use crate::fs::error::{FsError, Result};
use crate::fs::io::{BackingStore, copy_from_store, copy_into_store, zero_data_region};
use crate::fs::layout::{AllocationUnit, FileEntry, InfoBlock, UnitIndex, UnitType, truncate_name};
use log::{debug, info, warn};
use std::io::{Read, Write};

/// File operations on an image held by a backing store.
///
/// Every operation loads the whole descriptor set, works on it in memory and
/// (for mutating operations) writes the whole set back. Nothing is written
/// back when an operation fails, but a failure in the middle of the final
/// write can leave the image inconsistent.
pub struct FileSystem<S: BackingStore> {
    store: S,
}

impl<S: BackingStore> FileSystem<S> {
    /// Opens an existing image, checking that its metadata loads.
    pub fn open(mut store: S) -> Result<Self> {
        Descriptors::load(&mut store)?.discard();
        Ok(Self { store })
    }

    /// Formats `store` with a data region of `size` bytes.
    pub fn create(mut store: S, size: u32) -> Result<Self> {
        if size == 0 {
            return Err(FsError::InvalidSize(0));
        }
        Descriptors::format(size).save(&mut store)?;
        zero_data_region(&mut store, size)?;
        store.flush()?;

        info!("created filesystem with {} B of data", size);
        Ok(Self { store })
    }

    pub fn into_inner(self) -> S {
        self.store
    }

    pub fn descriptors(&mut self) -> Result<Descriptors> {
        Descriptors::load(&mut self.store)
    }

    pub fn info(&mut self) -> Result<InfoBlock> {
        Ok(self.descriptors()?.info)
    }

    /// Stores `content_size` bytes read from `content` under `name`.
    ///
    /// Names longer than the entry can hold are truncated. Empty names and
    /// names containing NUL are rejected, NUL being the name terminator.
    pub fn add<R: Read + ?Sized>(
        &mut self,
        name: &str,
        content_size: u64,
        content: &mut R,
    ) -> Result<()> {
        if name.is_empty() || name.contains('\0') {
            return Err(FsError::InvalidName(name.to_string()));
        }
        let mut desc = Descriptors::load(&mut self.store)?;

        if desc.find_file(name).is_some() {
            return Err(FsError::Exists(truncate_name(name).to_string()));
        }
        let size = match u32::try_from(content_size) {
            Ok(size) if size <= desc.info.free => size,
            _ => {
                return Err(FsError::OutOfSpace {
                    required: content_size,
                    free: desc.info.free,
                });
            }
        };

        let slot = match desc.free_entry_slot() {
            Some(slot) => slot,
            None => EntryIndex {
                table: desc.create_directory_block()?,
                slot: 0,
            },
        };

        let stored_name = truncate_name(name);
        if stored_name.len() < name.len() {
            warn!("file name '{}' truncated to '{}'", name, stored_name);
        }
        let mut entry = FileEntry::new(stored_name, size, now());

        // Growing the directory may have used up the space the content needs.
        if size > desc.info.free {
            return Err(FsError::OutOfSpace {
                required: content_size,
                free: desc.info.free,
            });
        }

        let mut remaining = size;
        let mut previous: Option<UnitIndex> = None;
        while remaining > 0 {
            let idx = desc.take_free_extent(remaining)?;
            let unit = *desc
                .unit(idx)
                .ok_or(FsError::InvalidFormat("unit index past the allocation chain"))?;

            copy_into_store(&mut self.store, content, unit.offset, unit.size)?;

            match previous {
                Some(prev) => {
                    desc.unit_mut(prev)
                        .ok_or(FsError::InvalidFormat("unit index past the allocation chain"))?
                        .next_block = Some(idx)
                }
                None => entry.block = Some(idx),
            }
            debug!("'{}': {} B in unit {}", stored_name, unit.size, idx);
            remaining -= unit.size;
            previous = Some(idx);
        }

        desc.directory_tables[slot.table].occupy(slot.slot, entry);
        desc.info.free -= size;
        desc.save(&mut self.store)?;
        desc.discard();

        info!("added '{}' ({} B)", stored_name, size);
        Ok(())
    }

    /// Writes the content of `name` to `dest`, returning the byte count.
    pub fn get<W: Write + ?Sized>(&mut self, name: &str, dest: &mut W) -> Result<u64> {
        let desc = Descriptors::load(&mut self.store)?;
        let (_, entry) = desc
            .find_file(name)
            .ok_or_else(|| FsError::NotFound(name.to_string()))?;

        let mut written = 0u64;
        for (_, unit) in chain(&desc, &entry)? {
            copy_from_store(&mut self.store, dest, unit.offset, unit.size)?;
            written += unit.size as u64;
        }
        dest.flush()?;

        info!("read '{}' ({} B)", entry.name_str(), written);
        Ok(written)
    }

    /// Deletes `name`, returning its units to the free pool and merging them
    /// with free neighbours. Units holding metadata tables stay allocated.
    pub fn remove(&mut self, name: &str) -> Result<()> {
        let mut desc = Descriptors::load(&mut self.store)?;
        let (slot, entry) = desc
            .find_file(name)
            .ok_or_else(|| FsError::NotFound(name.to_string()))?;

        for (idx, _) in chain(&desc, &entry)? {
            desc.free_unit(idx)?;
            let mut current = idx;
            while let Some(survivor) = desc.defragment(current) {
                current = survivor;
            }
        }

        desc.directory_tables[slot.table].release(slot.slot);
        desc.info.free = desc
            .info
            .free
            .checked_add(entry.size)
            .filter(|free| *free <= desc.info.size)
            .ok_or(FsError::InvalidFormat("free space exceeds size"))?;
        desc.save(&mut self.store)?;
        desc.discard();

        info!("removed '{}' ({} B)", entry.name_str(), entry.size);
        Ok(())
    }

    pub fn find_file(&mut self, name: &str) -> Result<Option<(EntryIndex, FileEntry)>> {
        Ok(self.descriptors()?.find_file(name))
    }

    /// Visits every allocation unit slot in (table, slot) order.
    pub fn for_each_unit<F>(&mut self, mut f: F) -> Result<()>
    where
        F: FnMut(UnitIndex, &AllocationUnit),
    {
        let desc = self.descriptors()?;
        for (idx, unit) in desc.units() {
            f(idx, unit);
        }
        Ok(())
    }

    /// Visits every stored file in (table, slot) order.
    pub fn for_each_file_entry<F>(&mut self, mut f: F) -> Result<()>
    where
        F: FnMut(EntryIndex, &FileEntry),
    {
        let desc = self.descriptors()?;
        for (idx, entry) in desc.entries() {
            f(idx, entry);
        }
        Ok(())
    }
}

// Unit chain of a file, checked against the entry before anything is copied.
fn chain(desc: &Descriptors, entry: &FileEntry) -> Result<Vec<(UnitIndex, AllocationUnit)>> {
    let mut units = Vec::new();
    let mut total = 0u64;
    let mut next = entry.block;
    while let Some(idx) = next {
        let unit = *desc
            .unit(idx)
            .filter(|unit| unit.is(UnitType::Occupied))
            .ok_or(FsError::InvalidFormat("file chain points at a non-data unit"))?;
        total += unit.size as u64;
        if total > entry.size as u64 || unit.size == 0 {
            return Err(FsError::InvalidFormat("file chain longer than the file"));
        }
        units.push((idx, unit));
        next = unit.next_block;
    }
    if total != entry.size as u64 {
        return Err(FsError::InvalidFormat("file chain shorter than the file"));
    }
    Ok(units)
}

fn now() -> u64 {
    chrono::Utc::now().timestamp().max(0) as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn fresh(size: u32) -> FileSystem<Cursor<Vec<u8>>> {
        FileSystem::create(Cursor::new(Vec::new()), size).unwrap()
    }

    #[test]
    fn zero_size_is_rejected() {
        assert!(matches!(
            FileSystem::create(Cursor::new(Vec::new()), 0),
            Err(FsError::InvalidSize(0))
        ));
    }

    #[test]
    fn empty_file_has_no_units() {
        let mut fs = fresh(1024);
        fs.add("empty", 0, &mut std::io::empty()).unwrap();

        let (_, entry) = fs.find_file("empty").unwrap().unwrap();
        assert_eq!(entry.block, None);
        let mut out = Vec::new();
        assert_eq!(fs.get("empty", &mut out).unwrap(), 0);
        assert_eq!(fs.info().unwrap().free, 1024);
    }

    #[test]
    fn truncated_name_is_found_by_full_name() {
        let mut fs = fresh(1024);
        let long = "x".repeat(40);
        fs.add(&long, 3, &mut &b"abc"[..]).unwrap();

        let mut out = Vec::new();
        fs.get(&long, &mut out).unwrap();
        assert_eq!(out, b"abc");
        assert!(matches!(
            fs.add(&"x".repeat(32), 1, &mut &b"z"[..]),
            Err(FsError::Exists(_))
        ));
    }

    #[test]
    fn nul_in_name_is_rejected() {
        let mut fs = fresh(1024);
        let before = fs.descriptors().unwrap();

        assert!(matches!(
            fs.add("a\0b", 3, &mut &b"xyz"[..]),
            Err(FsError::InvalidName(_))
        ));
        assert!(matches!(
            fs.add("", 3, &mut &b"xyz"[..]),
            Err(FsError::InvalidName(_))
        ));
        assert_eq!(fs.descriptors().unwrap(), before);

        // The part before the NUL is an ordinary name.
        fs.add("a", 3, &mut &b"xyz"[..]).unwrap();
        assert!(matches!(
            fs.add("a\0b", 3, &mut &b"xyz"[..]),
            Err(FsError::InvalidName(_))
        ));
        let mut out = Vec::new();
        fs.get("a", &mut out).unwrap();
        assert_eq!(out, b"xyz");
    }

    #[test]
    fn failed_add_leaves_metadata_untouched() {
        let mut fs = fresh(1024);
        fs.add("a", 4, &mut &b"data"[..]).unwrap();
        let before = fs.descriptors().unwrap();

        // Source shorter than announced: the copy fails half way.
        assert!(matches!(
            fs.add("b", 10, &mut &b"abc"[..]),
            Err(FsError::Io(_))
        ));
        assert_eq!(fs.descriptors().unwrap(), before);
    }

    #[test]
    fn remove_frees_fragmented_chain() {
        let mut fs = fresh(300);
        fs.add("a", 100, &mut &[1u8; 100][..]).unwrap();
        fs.add("b", 100, &mut &[2u8; 100][..]).unwrap();
        fs.remove("a").unwrap();

        // 100 B hole at the start plus 100 B tail: "c" spans both.
        let payload: Vec<u8> = (0..150u8).collect();
        fs.add("c", 150, &mut payload.as_slice()).unwrap();
        let (_, entry) = fs.find_file("c").unwrap().unwrap();
        let desc = fs.descriptors().unwrap();
        assert_eq!(chain(&desc, &entry).unwrap().len(), 2);

        let mut out = Vec::new();
        fs.get("c", &mut out).unwrap();
        assert_eq!(out, payload);

        fs.remove("b").unwrap();
        fs.remove("c").unwrap();
        let desc = fs.descriptors().unwrap();
        let free: Vec<_> = desc
            .units()
            .filter(|(_, u)| u.is(UnitType::Free))
            .map(|(_, u)| *u)
            .collect();
        assert_eq!(free, vec![AllocationUnit::free(0, 300)]);
    }
}
