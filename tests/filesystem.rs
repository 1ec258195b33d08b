mod common;

use common::{Drive, add_bytes, assert_accounting, free_units, payload, read_back};
use gfs::fs::consts::{
    ALLOC_TABLE_OFFSET, ALLOC_TABLE_SIZE, DATA_BASE, DIR_TABLE_SIZE, DIRECTORY_FILES,
};
use gfs::{FileSystem, FsError, UnitType};
use std::io::{Seek, SeekFrom, Write};

#[test]
fn create_yields_single_free_unit() {
    let (drive, mut fs) = Drive::create(1024);
    let desc = fs.descriptors().unwrap();

    assert_eq!(desc.info.free, 1024);
    assert_eq!(desc.info.size, 1024);
    assert_eq!(free_units(&desc), vec![(0, 1024)]);
    assert_eq!(
        std::fs::metadata(&drive.path).unwrap().len(),
        DATA_BASE + 1024
    );
}

#[test]
fn added_file_reads_back_identically() {
    let (drive, mut fs) = Drive::create(16 * 1024);
    let data = payload(5000, 7);
    add_bytes(&mut fs, "blob.bin", &data).unwrap();

    let mut fs = drive.reopen();
    assert_eq!(read_back(&mut fs, "blob.bin").unwrap(), data);
    assert_eq!(fs.info().unwrap().free, 16 * 1024 - 5000);
    assert_accounting(&fs.descriptors().unwrap());
}

#[test]
fn duplicate_name_is_rejected() {
    let (_drive, mut fs) = Drive::create(1024);
    add_bytes(&mut fs, "a.txt", b"hello").unwrap();
    let free = fs.info().unwrap().free;

    assert!(matches!(
        add_bytes(&mut fs, "a.txt", b"again"),
        Err(FsError::Exists(_))
    ));
    assert_eq!(fs.info().unwrap().free, free);
}

#[test]
fn removed_file_is_gone() {
    let (_drive, mut fs) = Drive::create(1024);
    add_bytes(&mut fs, "a.txt", b"hello").unwrap();
    fs.remove("a.txt").unwrap();

    assert!(matches!(read_back(&mut fs, "a.txt"), Err(FsError::NotFound(_))));
    assert!(matches!(fs.remove("a.txt"), Err(FsError::NotFound(_))));
    assert_eq!(fs.info().unwrap().free, 1024);
}

#[test]
fn oversized_add_keeps_free_space() {
    let (drive, mut fs) = Drive::create(1024);
    add_bytes(&mut fs, "a.txt", &payload(100, 1)).unwrap();

    let err = add_bytes(&mut fs, "b.txt", &payload(2000, 2)).unwrap_err();
    assert!(matches!(err, FsError::OutOfSpace { required: 2000, free: 924 }));

    let mut fs = drive.reopen();
    assert_eq!(fs.info().unwrap().free, 924);
    assert!(fs.find_file("b.txt").unwrap().is_none());
}

#[test]
fn removing_middle_file_merges_three_regions() {
    let (_drive, mut fs) = Drive::create(3000);
    add_bytes(&mut fs, "left", &payload(500, 1)).unwrap();
    add_bytes(&mut fs, "middle", &payload(700, 2)).unwrap();
    add_bytes(&mut fs, "right", &payload(600, 3)).unwrap();
    add_bytes(&mut fs, "tail", &payload(400, 4)).unwrap();

    // Free regions on both sides of "middle": [0, 500) and [1200, 1800).
    fs.remove("left").unwrap();
    fs.remove("right").unwrap();
    let desc = fs.descriptors().unwrap();
    assert_eq!(free_units(&desc), vec![(0, 500), (1200, 600), (2200, 800)]);

    fs.remove("middle").unwrap();
    let desc = fs.descriptors().unwrap();
    assert_eq!(free_units(&desc), vec![(0, 1800), (2200, 800)]);
    assert_accounting(&desc);
    assert_eq!(read_back(&mut fs, "tail").unwrap(), payload(400, 4));
}

#[test]
fn seventeenth_file_grows_directory_chain() {
    let (drive, mut fs) = Drive::create(64 * 1024);
    for i in 0..DIRECTORY_FILES {
        add_bytes(&mut fs, &format!("file{i:02}"), &payload(64, i as u8)).unwrap();
    }
    assert_eq!(fs.info().unwrap().directory_tables, 1);

    add_bytes(&mut fs, "file16", &payload(64, 16)).unwrap();

    let mut fs = drive.reopen();
    let desc = fs.descriptors().unwrap();
    assert_eq!(desc.info.directory_tables, 2);
    assert_eq!(desc.directory_tables.len(), 2);
    let carrier = desc.directory_tables[0].offset_next.unwrap();
    let unit = desc.unit(carrier).unwrap();
    assert_eq!(unit.unit_type, UnitType::System);
    assert_eq!(unit.size as usize, DIR_TABLE_SIZE);
    assert_eq!(
        desc.info.free,
        64 * 1024 - 17 * 64 - DIR_TABLE_SIZE as u32
    );
    assert_accounting(&desc);

    assert_eq!(read_back(&mut fs, "file16").unwrap(), payload(64, 16));
    let (slot, _) = fs.find_file("file16").unwrap().unwrap();
    assert_eq!((slot.table, slot.slot), (1, 0));
}

#[test]
fn directory_table_is_kept_after_its_files_are_removed() {
    let (drive, mut fs) = Drive::create(64 * 1024);
    for i in 0..=DIRECTORY_FILES {
        add_bytes(&mut fs, &format!("f{i}"), &payload(10, 0)).unwrap();
    }
    for i in 0..=DIRECTORY_FILES {
        fs.remove(&format!("f{i}")).unwrap();
    }

    let mut fs = drive.reopen();
    let desc = fs.descriptors().unwrap();
    assert_eq!(desc.directory_tables.len(), 2);
    assert_eq!(desc.info.free, 64 * 1024 - DIR_TABLE_SIZE as u32);
    assert_accounting(&desc);
}

#[test]
fn many_small_files_grow_allocation_chain() {
    // Every file and every extra directory table takes its own unit, so 130
    // files need more slots than the first allocation table has.
    let (drive, mut fs) = Drive::create(256 * 1024);
    for i in 0..130 {
        add_bytes(&mut fs, &format!("n{i:03}"), &[i as u8]).unwrap();
    }

    let desc = fs.descriptors().unwrap();
    assert_eq!(desc.info.allocation_tables, 2);
    assert_eq!(desc.allocation_tables.len(), 2);
    let carrier = desc.allocation_tables[0].offset_next.unwrap();
    let unit = desc.unit(carrier).unwrap();
    assert_eq!(unit.unit_type, UnitType::System);
    assert_eq!(unit.size as usize, ALLOC_TABLE_SIZE);
    assert_accounting(&desc);

    let mut fs = drive.reopen();
    assert_eq!(fs.descriptors().unwrap(), desc);
    assert_eq!(read_back(&mut fs, "n129").unwrap(), [129u8]);

    fs.remove("n000").unwrap();
    assert_accounting(&fs.descriptors().unwrap());
}

#[test]
fn file_spanning_holes_is_chained() {
    let (_drive, mut fs) = Drive::create(4096);
    add_bytes(&mut fs, "a", &payload(1000, 1)).unwrap();
    add_bytes(&mut fs, "b", &payload(1000, 2)).unwrap();
    add_bytes(&mut fs, "c", &payload(1000, 3)).unwrap();
    fs.remove("a").unwrap();
    fs.remove("c").unwrap();

    // 1000 B hole at the front plus the 2096 B tail.
    let data = payload(2500, 4);
    add_bytes(&mut fs, "big", &data).unwrap();
    let (_, entry) = fs.find_file("big").unwrap().unwrap();
    let desc = fs.descriptors().unwrap();
    let first = desc.unit(entry.block.unwrap()).unwrap();
    assert_eq!((first.offset, first.size), (0, 1000));
    let second = desc.unit(first.next_block.unwrap()).unwrap();
    assert_eq!(second.size, 1500);
    assert_eq!(second.next_block, None);

    assert_eq!(read_back(&mut fs, "big").unwrap(), data);
}

#[test]
fn bad_magic_is_invalid_format() {
    let (drive, fs) = Drive::create(1024);
    let mut file = fs.into_inner();
    file.seek(SeekFrom::Start(0)).unwrap();
    file.write_all(b"XYZ").unwrap();
    drop(file);

    let file = std::fs::File::open(&drive.path).unwrap();
    assert!(matches!(
        FileSystem::open(file),
        Err(FsError::InvalidFormat(_))
    ));
}

#[test]
fn for_each_walks_units_and_entries() {
    let (_drive, mut fs) = Drive::create(2048);
    add_bytes(&mut fs, "one", b"1").unwrap();
    add_bytes(&mut fs, "two", b"22").unwrap();

    let mut names = Vec::new();
    fs.for_each_file_entry(|_, entry| names.push(entry.name_str().to_string()))
        .unwrap();
    assert_eq!(names, ["one", "two"]);

    let mut live = 0;
    fs.for_each_unit(|_, unit| {
        if !unit.is(UnitType::Unused) {
            live += 1;
        }
    })
    .unwrap();
    assert_eq!(live, 3);
}

#[test]
fn directory_growth_without_room_is_out_of_space() {
    let files = DIRECTORY_FILES as u32;
    let (drive, mut fs) = Drive::create(files * 10 + 500);
    for i in 0..DIRECTORY_FILES {
        add_bytes(&mut fs, &format!("f{i}"), &payload(10, 0)).unwrap();
    }
    let before = fs.descriptors().unwrap();

    // The content fits, the extra directory table does not.
    let err = add_bytes(&mut fs, "extra", &payload(10, 1)).unwrap_err();
    assert!(matches!(err, FsError::OutOfSpace { free: 500, .. }));

    assert_eq!(drive.reopen().descriptors().unwrap(), before);
}

#[test]
fn directory_growth_leaving_too_little_is_out_of_space() {
    let files = DIRECTORY_FILES as u32;
    let (drive, mut fs) = Drive::create(files * 10 + DIR_TABLE_SIZE as u32 + 5);
    for i in 0..DIRECTORY_FILES {
        add_bytes(&mut fs, &format!("f{i}"), &payload(10, 0)).unwrap();
    }
    let before = fs.descriptors().unwrap();
    assert_eq!(before.info.free, DIR_TABLE_SIZE as u32 + 5);

    // The new directory table fits but leaves 5 B for 10 B of content.
    let err = add_bytes(&mut fs, "extra", &payload(10, 1)).unwrap_err();
    assert!(matches!(err, FsError::OutOfSpace { required: 10, free: 5 }));

    let mut fs = drive.reopen();
    assert_eq!(fs.descriptors().unwrap(), before);
    assert!(fs.find_file("extra").unwrap().is_none());
}

#[test]
fn allocation_growth_without_room_is_out_of_space() {
    // 120 one-byte files and 7 extra directory tables, plus the free tail,
    // use all 128 slots of the first allocation table. The tail is too
    // small to carry a second table.
    let extra_dirs = 7;
    let tail = 100;
    let (drive, mut fs) = Drive::create(120 + extra_dirs * DIR_TABLE_SIZE as u32 + tail);
    for i in 0..120 {
        add_bytes(&mut fs, &format!("s{i:03}"), &[i as u8]).unwrap();
    }
    let before = fs.descriptors().unwrap();
    assert_eq!(before.allocation_tables.len(), 1);
    assert_eq!(before.allocation_tables[0].unused_units, 0);
    assert_eq!(before.directory_tables.len(), 8);
    assert_eq!(free_units(&before).len(), 1);
    assert_eq!(before.info.free, tail);

    // Two bytes need a split, the split needs a slot, the slot needs a table.
    let err = add_bytes(&mut fs, "x", b"xy").unwrap_err();
    assert!(matches!(
        err,
        FsError::OutOfSpace { required, free: 100 } if required == ALLOC_TABLE_SIZE as u64
    ));

    let mut fs = drive.reopen();
    assert_eq!(fs.descriptors().unwrap(), before);
    assert!(fs.find_file("x").unwrap().is_none());

    // A file using the whole tail needs no split.
    add_bytes(&mut fs, "x", &payload(tail as usize, 3)).unwrap();
    assert_eq!(fs.info().unwrap().free, 0);
    assert_accounting(&fs.descriptors().unwrap());
}

#[test]
fn unit_outside_data_region_is_invalid_format() {
    let (drive, fs) = Drive::create(1024);
    let mut file = fs.into_inner();
    // Offset field of the first unit of the first allocation table.
    let unit_offset = ALLOC_TABLE_OFFSET + 1;
    file.seek(SeekFrom::Start(unit_offset)).unwrap();
    file.write_all(&0xFFFF_FF00u32.to_le_bytes()).unwrap();
    drop(file);

    let file = std::fs::File::open(&drive.path).unwrap();
    assert!(matches!(
        FileSystem::open(file),
        Err(FsError::InvalidFormat(_))
    ));
}
