pub mod allocator;
pub mod consts;
pub mod descriptors;
pub mod error;
pub mod filesystem;
pub mod io;
pub mod layout;
