//! A flat filesystem living inside a single host file.
//!
//! The image starts with an info block, the first allocation table and the
//! first directory table, followed by the data region. Further tables are
//! allocated from the data region when a chain runs out of slots.

pub mod fs;

pub use fs::descriptors::{Descriptors, EntryIndex};
pub use fs::error::{FsError, Result};
pub use fs::filesystem::FileSystem;
pub use fs::layout::{AllocationUnit, FileEntry, InfoBlock, UnitIndex, UnitType};
