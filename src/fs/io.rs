use crate::fs::consts::{
    ALLOC_TABLE_SIZE, COPY_CHUNK, DATA_BASE, DIR_TABLE_SIZE, INFO_OFFSET, INFO_SIZE,
};
use crate::fs::error::{FsError, Result};
use crate::fs::layout::{AllocationTable, DirectoryTable, InfoBlock};
use std::io::{self, Read, Seek, SeekFrom, Write};

/// A byte-addressable medium holding the whole filesystem image.
pub trait BackingStore: Read + Write + Seek {}

impl<T: Read + Write + Seek> BackingStore for T {}

pub fn write_at<S: BackingStore>(f: &mut S, offset: u64, buf: &[u8]) -> io::Result<()> {
    f.seek(SeekFrom::Start(offset))?;
    f.write_all(buf)?;
    Ok(())
}

pub fn read_at<S: BackingStore>(f: &mut S, offset: u64, buf: &mut [u8]) -> io::Result<()> {
    f.seek(SeekFrom::Start(offset))?;
    f.read_exact(buf)?;
    Ok(())
}

// A metadata section cut short by the end of the image means the image is broken.
fn read_metadata<S: BackingStore>(f: &mut S, offset: u64, buf: &mut [u8]) -> Result<()> {
    match read_at(f, offset, buf) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
            Err(FsError::InvalidFormat("image truncated"))
        }
        Err(e) => Err(e.into()),
    }
}

pub fn write_info<S: BackingStore>(f: &mut S, info: &InfoBlock) -> Result<()> {
    let mut buf = [0u8; INFO_SIZE];
    info.serialize(&mut buf);
    write_at(f, INFO_OFFSET, &buf)?;
    Ok(())
}

pub fn read_info<S: BackingStore>(f: &mut S) -> Result<InfoBlock> {
    let mut buf = [0u8; INFO_SIZE];
    read_metadata(f, INFO_OFFSET, &mut buf)?;

    let info = InfoBlock::deserialize(&buf);
    if !info.has_valid_magic() {
        return Err(FsError::InvalidFormat("bad magic"));
    }
    Ok(info)
}

pub fn write_allocation_table<S: BackingStore>(
    f: &mut S,
    offset: u64,
    table: &AllocationTable,
) -> Result<()> {
    let mut buf = vec![0u8; ALLOC_TABLE_SIZE];
    table.serialize(&mut buf);
    write_at(f, offset, &buf)?;
    Ok(())
}

pub fn read_allocation_table<S: BackingStore>(f: &mut S, offset: u64) -> Result<AllocationTable> {
    let mut buf = vec![0u8; ALLOC_TABLE_SIZE];
    read_metadata(f, offset, &mut buf)?;
    AllocationTable::deserialize(&buf)
}

pub fn write_directory_table<S: BackingStore>(
    f: &mut S,
    offset: u64,
    table: &DirectoryTable,
) -> Result<()> {
    let mut buf = vec![0u8; DIR_TABLE_SIZE];
    table.serialize(&mut buf);
    write_at(f, offset, &buf)?;
    Ok(())
}

pub fn read_directory_table<S: BackingStore>(f: &mut S, offset: u64) -> Result<DirectoryTable> {
    let mut buf = vec![0u8; DIR_TABLE_SIZE];
    read_metadata(f, offset, &mut buf)?;
    Ok(DirectoryTable::deserialize(&buf))
}

/// Absolute byte position of an offset inside the data region.
pub fn data_position(unit_offset: u32) -> u64 {
    DATA_BASE + unit_offset as u64
}

/// Streams exactly `size` bytes from `src` into the data region.
pub fn copy_into_store<S: BackingStore, R: Read + ?Sized>(
    f: &mut S,
    src: &mut R,
    unit_offset: u32,
    size: u32,
) -> io::Result<()> {
    f.seek(SeekFrom::Start(data_position(unit_offset)))?;
    let mut buf = [0u8; COPY_CHUNK];
    let mut remaining = size as usize;
    while remaining > 0 {
        let chunk = remaining.min(COPY_CHUNK);
        src.read_exact(&mut buf[..chunk])?;
        f.write_all(&buf[..chunk])?;
        remaining -= chunk;
    }
    Ok(())
}

/// Streams exactly `size` bytes out of the data region into `dst`.
pub fn copy_from_store<S: BackingStore, W: Write + ?Sized>(
    f: &mut S,
    dst: &mut W,
    unit_offset: u32,
    size: u32,
) -> io::Result<()> {
    f.seek(SeekFrom::Start(data_position(unit_offset)))?;
    let mut buf = [0u8; COPY_CHUNK];
    let mut remaining = size as usize;
    while remaining > 0 {
        let chunk = remaining.min(COPY_CHUNK);
        f.read_exact(&mut buf[..chunk])?;
        dst.write_all(&buf[..chunk])?;
        remaining -= chunk;
    }
    Ok(())
}

/// Fills the whole data region with zeros.
pub fn zero_data_region<S: BackingStore>(f: &mut S, size: u32) -> io::Result<()> {
    f.seek(SeekFrom::Start(DATA_BASE))?;
    let zeros = [0u8; COPY_CHUNK];
    let mut remaining = size as usize;
    while remaining > 0 {
        let chunk = remaining.min(COPY_CHUNK);
        f.write_all(&zeros[..chunk])?;
        remaining -= chunk;
    }
    Ok(())
}
