//! A tiny Unix-like filesystem stored in a single fixed-size backing
//! file.
//!
//! The image is split into 1024-byte blocks: a superblock, one inode
//! bitmap block, one data bitmap block, the inode table, then the data
//! region holding file contents and directory-entry blocks. Inodes carry
//! sixteen direct block pointers (indirect pointers are reserved in the
//! layout but unused), directories are flat arrays of fixed-size entry
//! slots, and both bitmaps are allocated first-fit.
//!
//! [`TinyFs`] mounts an image and exposes the operations; [`host`]
//! wraps them in the return-code convention a host adapter expects.

pub mod alloc;
pub mod bitmap;
pub mod block;
pub mod dirent;
pub mod error;
pub mod fs;
pub mod host;
pub mod inode;
pub mod path;
pub mod superblock;
mod util;

pub use error::Error;
pub use fs::TinyFs;
