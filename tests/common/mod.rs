//! Common utilities for tests

#![allow(dead_code)]

use gfs::{Descriptors, FileSystem, UnitType};
use std::fs::{File, OpenOptions};
use std::path::PathBuf;
use tempfile::TempDir;

/// A freshly created drive image inside its own temporary directory.
pub struct Drive {
    pub dir: TempDir,
    pub path: PathBuf,
}

impl Drive {
    pub fn create(size: u32) -> (Self, FileSystem<File>) {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("drive.gfs");
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)
            .expect("drive file");
        let fs = FileSystem::create(file, size).expect("create");
        (Self { dir, path }, fs)
    }

    /// Opens the image again through a new handle.
    pub fn reopen(&self) -> FileSystem<File> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&self.path)
            .expect("drive file");
        FileSystem::open(file).expect("open")
    }
}

pub fn payload(len: usize, seed: u8) -> Vec<u8> {
    (0..len).map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed)).collect()
}

pub fn add_bytes(fs: &mut FileSystem<File>, name: &str, data: &[u8]) -> gfs::Result<()> {
    fs.add(name, data.len() as u64, &mut &data[..])
}

pub fn read_back(fs: &mut FileSystem<File>, name: &str) -> gfs::Result<Vec<u8>> {
    let mut out = Vec::new();
    fs.get(name, &mut out)?;
    Ok(out)
}

/// `free` plus everything held by data and metadata units covers the region.
pub fn assert_accounting(desc: &Descriptors) {
    let allocated: u64 = desc
        .units()
        .filter(|(_, u)| u.is(UnitType::Occupied) || u.is(UnitType::System))
        .map(|(_, u)| u.size as u64)
        .sum();
    assert_eq!(desc.info.free as u64 + allocated, desc.info.size as u64);
}

pub fn free_units(desc: &Descriptors) -> Vec<(u32, u32)> {
    desc.units()
        .filter(|(_, u)| u.is(UnitType::Free))
        .map(|(_, u)| (u.offset, u.size))
        .collect()
}
