pub const FS_MAGIC: [u8; 3] = *b"GFS";
pub const FS_VERSION: [u8; 5] = *b"0.1.0";

pub const MAX_NAME_LEN: usize = 32;
pub const ALLOC_UNITS: usize = 128; // units per allocation table
pub const DIRECTORY_FILES: usize = 16; // entries per directory table

// Sentinel for "no further link" in every on-disk index field.
pub const ENDPOINT: u32 = 0xFFFF_FFFF;

pub const INFO_SIZE: usize = 3 + 5 + 4 * 4; // 24 B
pub const UNIT_SIZE: usize = 1 + 4 + 4 + 4; // 13 B
pub const ALLOC_TABLE_SIZE: usize = ALLOC_UNITS * UNIT_SIZE + 4 + 4; // 1672 B
pub const FILE_ENTRY_SIZE: usize = MAX_NAME_LEN + 1 + 4 + 4 + 8; // 49 B
pub const DIR_TABLE_SIZE: usize = 2 + DIRECTORY_FILES * FILE_ENTRY_SIZE + 4; // 790 B

pub const INFO_OFFSET: u64 = 0;
pub const ALLOC_TABLE_OFFSET: u64 = INFO_OFFSET + INFO_SIZE as u64;
pub const DIR_TABLE_OFFSET: u64 = ALLOC_TABLE_OFFSET + ALLOC_TABLE_SIZE as u64;
pub const DATA_BASE: u64 = DIR_TABLE_OFFSET + DIR_TABLE_SIZE as u64;

// Keeps every global unit index strictly below ENDPOINT.
pub const MAX_ALLOC_TABLES: usize = (ENDPOINT as usize) / ALLOC_UNITS;

pub const COPY_CHUNK: usize = 1024;

/// File entry flag: the entry describes a live file.
pub const FLAG_EXISTS: u8 = 0b0000_0001;
