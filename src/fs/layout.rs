use crate::fs::consts::{
    ALLOC_TABLE_SIZE, ALLOC_UNITS, DIR_TABLE_SIZE, DIRECTORY_FILES, ENDPOINT, FILE_ENTRY_SIZE,
    FLAG_EXISTS, FS_MAGIC, FS_VERSION, INFO_SIZE, MAX_NAME_LEN, UNIT_SIZE,
};
use crate::fs::error::{FsError, Result};
use std::fmt;

fn read_u16(inp: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([inp[at], inp[at + 1]])
}

fn read_u32(inp: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([inp[at], inp[at + 1], inp[at + 2], inp[at + 3]])
}

fn read_u64(inp: &[u8], at: usize) -> u64 {
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&inp[at..at + 8]);
    u64::from_le_bytes(raw)
}

/// Flat address of an allocation unit across the whole allocation-table
/// chain: `table * ALLOC_UNITS + slot`.
///
/// A link that points nowhere is `Option::None`; the `ENDPOINT` sentinel
/// only exists in the on-disk encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UnitIndex(u32);

impl UnitIndex {
    pub fn new(table: usize, slot: usize) -> Self {
        debug_assert!(slot < ALLOC_UNITS);
        Self((table * ALLOC_UNITS + slot) as u32)
    }

    pub fn from_raw(raw: u32) -> Option<Self> {
        if raw == ENDPOINT { None } else { Some(Self(raw)) }
    }

    pub fn table(self) -> usize {
        self.0 as usize / ALLOC_UNITS
    }

    pub fn slot(self) -> usize {
        self.0 as usize % ALLOC_UNITS
    }

    pub fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for UnitIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:2}, {:3}]", self.table(), self.slot())
    }
}

pub fn encode_link(link: Option<UnitIndex>) -> u32 {
    link.map_or(ENDPOINT, UnitIndex::raw)
}

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitType {
    Free = 0,
    Unused = 1,
    Occupied = 2,
    System = 3,
}

impl TryFrom<u8> for UnitType {
    type Error = FsError;

    fn try_from(raw: u8) -> Result<Self> {
        match raw {
            0 => Ok(UnitType::Free),
            1 => Ok(UnitType::Unused),
            2 => Ok(UnitType::Occupied),
            3 => Ok(UnitType::System),
            _ => Err(FsError::InvalidFormat("unknown allocation unit type")),
        }
    }
}

impl fmt::Display for UnitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            UnitType::Free => "FREE",
            UnitType::Unused => "UNUSED",
            UnitType::Occupied => "USED",
            UnitType::System => "SYS",
        };
        f.pad(label)
    }
}

// Info block - 24 B
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfoBlock {
    pub magic: [u8; 3],         // 3 B (offset 0..2)
    pub version: [u8; 5],       // 5 B (offset 3..7)
    pub size: u32,              // 4 B (offset 8..11)
    pub free: u32,              // 4 B (offset 12..15)
    pub allocation_tables: u32, // 4 B (offset 16..19)
    pub directory_tables: u32,  // 4 B (offset 20..23)
}

impl InfoBlock {
    pub fn new(size: u32) -> Self {
        Self {
            magic: FS_MAGIC,
            version: FS_VERSION,
            size,
            free: size,
            allocation_tables: 1,
            directory_tables: 1,
        }
    }

    pub fn has_valid_magic(&self) -> bool {
        self.magic == FS_MAGIC
    }

    pub fn version_str(&self) -> &str {
        let end = self.version.iter().position(|&b| b == 0).unwrap_or(5);
        std::str::from_utf8(&self.version[..end]).unwrap_or("<invalid>")
    }

    pub fn serialize(&self, out: &mut [u8]) {
        debug_assert_eq!(out.len(), INFO_SIZE);
        out[0..3].copy_from_slice(&self.magic);
        out[3..8].copy_from_slice(&self.version);
        out[8..12].copy_from_slice(&self.size.to_le_bytes());
        out[12..16].copy_from_slice(&self.free.to_le_bytes());
        out[16..20].copy_from_slice(&self.allocation_tables.to_le_bytes());
        out[20..24].copy_from_slice(&self.directory_tables.to_le_bytes());
    }

    pub fn deserialize(inp: &[u8]) -> Self {
        debug_assert_eq!(inp.len(), INFO_SIZE);
        let mut magic = [0u8; 3];
        magic.copy_from_slice(&inp[0..3]);
        let mut version = [0u8; 5];
        version.copy_from_slice(&inp[3..8]);

        Self {
            magic,
            version,
            size: read_u32(inp, 8),
            free: read_u32(inp, 12),
            allocation_tables: read_u32(inp, 16),
            directory_tables: read_u32(inp, 20),
        }
    }
}

// One extent descriptor - 13 B
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocationUnit {
    pub unit_type: UnitType,           // 1 B (offset 0)
    pub offset: u32,                   // 4 B (offset 1..4), relative to the data region
    pub size: u32,                     // 4 B (offset 5..8)
    pub next_block: Option<UnitIndex>, // 4 B (offset 9..12)
}

impl AllocationUnit {
    pub const fn unused() -> Self {
        Self {
            unit_type: UnitType::Unused,
            offset: 0,
            size: 0,
            next_block: None,
        }
    }

    pub fn free(offset: u32, size: u32) -> Self {
        Self {
            unit_type: UnitType::Free,
            offset,
            size,
            next_block: None,
        }
    }

    pub fn is(&self, unit_type: UnitType) -> bool {
        self.unit_type == unit_type
    }

    /// First byte past the extent, relative to the data region.
    pub fn end(&self) -> u64 {
        self.offset as u64 + self.size as u64
    }

    pub fn serialize(&self, out: &mut [u8]) {
        debug_assert_eq!(out.len(), UNIT_SIZE);
        out[0] = self.unit_type as u8;
        out[1..5].copy_from_slice(&self.offset.to_le_bytes());
        out[5..9].copy_from_slice(&self.size.to_le_bytes());
        out[9..13].copy_from_slice(&encode_link(self.next_block).to_le_bytes());
    }

    pub fn deserialize(inp: &[u8]) -> Result<Self> {
        debug_assert_eq!(inp.len(), UNIT_SIZE);
        Ok(Self {
            unit_type: UnitType::try_from(inp[0])?,
            offset: read_u32(inp, 1),
            size: read_u32(inp, 5),
            next_block: UnitIndex::from_raw(read_u32(inp, 9)),
        })
    }
}

// Allocation table - 1672 B
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocationTable {
    pub units: [AllocationUnit; ALLOC_UNITS],
    pub unused_units: u32,
    /// Unit holding the next allocation table of the chain.
    pub offset_next: Option<UnitIndex>,
}

impl AllocationTable {
    pub fn empty() -> Self {
        Self {
            units: [AllocationUnit::unused(); ALLOC_UNITS],
            unused_units: ALLOC_UNITS as u32,
            offset_next: None,
        }
    }

    /// Table written by `create`: a single free unit spanning the data region.
    pub fn spanning(size: u32) -> Self {
        let mut table = Self::empty();
        table.units[0] = AllocationUnit::free(0, size);
        table.unused_units -= 1;
        table
    }

    pub fn serialize(&self, out: &mut [u8]) {
        debug_assert_eq!(out.len(), ALLOC_TABLE_SIZE);
        for (unit, chunk) in self.units.iter().zip(out.chunks_exact_mut(UNIT_SIZE)) {
            unit.serialize(chunk);
        }
        let tail = ALLOC_UNITS * UNIT_SIZE;
        out[tail..tail + 4].copy_from_slice(&self.unused_units.to_le_bytes());
        out[tail + 4..tail + 8].copy_from_slice(&encode_link(self.offset_next).to_le_bytes());
    }

    pub fn deserialize(inp: &[u8]) -> Result<Self> {
        debug_assert_eq!(inp.len(), ALLOC_TABLE_SIZE);
        let mut table = Self::empty();
        for (unit, chunk) in table.units.iter_mut().zip(inp.chunks_exact(UNIT_SIZE)) {
            *unit = AllocationUnit::deserialize(chunk)?;
        }
        let tail = ALLOC_UNITS * UNIT_SIZE;
        table.unused_units = read_u32(inp, tail);
        table.offset_next = UnitIndex::from_raw(read_u32(inp, tail + 4));
        Ok(table)
    }
}

/// Cuts `name` to at most `MAX_NAME_LEN` bytes without splitting a UTF-8
/// character.
pub fn truncate_name(name: &str) -> &str {
    if name.len() <= MAX_NAME_LEN {
        return name;
    }
    let mut end = MAX_NAME_LEN;
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    &name[..end]
}

// Directory entry - 49 B
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct FileEntry {
    pub name: [u8; MAX_NAME_LEN], // 32 B (offset 0..31)
    pub flags: u8,                // 1 B  (offset 32)
    pub size: u32,                // 4 B  (offset 33..36)
    pub block: Option<UnitIndex>, // 4 B  (offset 37..40)
    pub created: u64,             // 8 B  (offset 41..48), seconds since epoch
}

impl FileEntry {
    pub const fn empty() -> Self {
        Self {
            name: [0u8; MAX_NAME_LEN],
            flags: 0,
            size: 0,
            block: None,
            created: 0,
        }
    }

    /// Builds a live entry; names longer than `MAX_NAME_LEN` are truncated.
    pub fn new(name: &str, size: u32, created: u64) -> Self {
        let name = truncate_name(name);
        let mut buf = [0u8; MAX_NAME_LEN];
        buf[..name.len()].copy_from_slice(name.as_bytes());
        Self {
            name: buf,
            flags: FLAG_EXISTS,
            size,
            block: None,
            created,
        }
    }

    pub fn name_str(&self) -> &str {
        let end = self
            .name
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(MAX_NAME_LEN);

        std::str::from_utf8(&self.name[..end]).unwrap_or("<invalid>")
    }

    pub fn exists(&self) -> bool {
        self.flags & FLAG_EXISTS != 0
    }

    pub fn serialize(&self, out: &mut [u8]) {
        debug_assert_eq!(out.len(), FILE_ENTRY_SIZE);
        out[0..MAX_NAME_LEN].copy_from_slice(&self.name);
        out[32] = self.flags;
        out[33..37].copy_from_slice(&self.size.to_le_bytes());
        out[37..41].copy_from_slice(&encode_link(self.block).to_le_bytes());
        out[41..49].copy_from_slice(&self.created.to_le_bytes());
    }

    pub fn deserialize(inp: &[u8]) -> Self {
        debug_assert_eq!(inp.len(), FILE_ENTRY_SIZE);
        let mut name = [0u8; MAX_NAME_LEN];
        name.copy_from_slice(&inp[0..MAX_NAME_LEN]);

        Self {
            name,
            flags: inp[32],
            size: read_u32(inp, 33),
            block: UnitIndex::from_raw(read_u32(inp, 37)),
            created: read_u64(inp, 41),
        }
    }
}

impl fmt::Debug for FileEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.exists() {
            write!(f, "FileEntry(<free>)")
        } else {
            write!(
                f,
                "FileEntry({}, size={}, block={:?})",
                self.name_str(),
                self.size,
                self.block
            )
        }
    }
}

// Directory table - 790 B
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryTable {
    pub files_flags: u16,
    pub files: [FileEntry; DIRECTORY_FILES],
    /// Unit holding the next directory table of the chain.
    pub offset_next: Option<UnitIndex>,
}

impl DirectoryTable {
    pub fn empty() -> Self {
        Self {
            files_flags: 0,
            files: [FileEntry::empty(); DIRECTORY_FILES],
            offset_next: None,
        }
    }

    pub fn is_occupied(&self, slot: usize) -> bool {
        (self.files_flags >> slot) & 1 == 1
    }

    /// Lowest free slot, if any.
    pub fn free_slot(&self) -> Option<usize> {
        (0..DIRECTORY_FILES).find(|&slot| !self.is_occupied(slot))
    }

    pub fn occupy(&mut self, slot: usize, entry: FileEntry) {
        self.files[slot] = entry;
        self.files_flags |= 1 << slot;
    }

    pub fn release(&mut self, slot: usize) {
        self.files[slot].flags &= !FLAG_EXISTS;
        self.files_flags &= !(1 << slot);
    }

    pub fn serialize(&self, out: &mut [u8]) {
        debug_assert_eq!(out.len(), DIR_TABLE_SIZE);
        out[0..2].copy_from_slice(&self.files_flags.to_le_bytes());
        let entries = &mut out[2..2 + DIRECTORY_FILES * FILE_ENTRY_SIZE];
        for (entry, chunk) in self.files.iter().zip(entries.chunks_exact_mut(FILE_ENTRY_SIZE)) {
            entry.serialize(chunk);
        }
        let tail = 2 + DIRECTORY_FILES * FILE_ENTRY_SIZE;
        out[tail..tail + 4].copy_from_slice(&encode_link(self.offset_next).to_le_bytes());
    }

    pub fn deserialize(inp: &[u8]) -> Self {
        debug_assert_eq!(inp.len(), DIR_TABLE_SIZE);
        let mut table = Self::empty();
        table.files_flags = read_u16(inp, 0);
        let entries = &inp[2..2 + DIRECTORY_FILES * FILE_ENTRY_SIZE];
        for (entry, chunk) in table.files.iter_mut().zip(entries.chunks_exact(FILE_ENTRY_SIZE)) {
            *entry = FileEntry::deserialize(chunk);
        }
        let tail = 2 + DIRECTORY_FILES * FILE_ENTRY_SIZE;
        table.offset_next = UnitIndex::from_raw(read_u32(inp, tail));
        table
    }
}
