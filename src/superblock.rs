//! The on-disk filesystem descriptor.
//!
//! The superblock is written to block 0 at format time, never rewritten,
//! and read back once at mount time. It records the layout constants the
//! other regions of the image derive from.

use crate::block::Block;
use crate::block::Disk;
use crate::block::BLOCK_SIZE;
use crate::block::DISK_SIZE;
use crate::dirent::DIRENT_SIZE;
use crate::inode::INODE_SIZE;
use crate::util::ceil_division;
use bytemuck::Pod;
use bytemuck::Zeroable;
use std::io;
use std::mem::size_of;

/// The filesystem's magic number.
pub const MAGIC: u32 = 0x5c3a;
/// The maximum number of inodes.
pub const MAX_INUM: u32 = 1024;
/// The maximum number of data blocks tracked by the data bitmap.
///
/// The layout reserves a single block for the data bitmap, so this may
/// not exceed `BLOCK_SIZE * 8` bits.
pub const MAX_DNUM: u32 = 8192;

/// Block number of the superblock.
pub const SUPERBLOCK_BLK: u32 = 0;
/// Block number of the inode bitmap.
pub const INODE_BITMAP_BLK: u32 = 1;
/// Block number of the data bitmap.
pub const DATA_BITMAP_BLK: u32 = 2;
/// First block of the inode region.
pub const INODE_REGION_BLK: u32 = 3;

/// The on-disk superblock, mirrored in memory for the lifetime of a
/// mount.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Pod, Zeroable)]
pub struct Superblock {
	/// Magic number identifying a valid image.
	pub magic: u32,
	/// Maximum number of inodes.
	pub max_inum: u32,
	/// Maximum number of data blocks.
	pub max_dnum: u32,
	/// Block number of the inode bitmap.
	pub i_bitmap_blk: u32,
	/// Block number of the data bitmap.
	pub d_bitmap_blk: u32,
	/// First block of the inode region.
	pub i_start_blk: u32,
	/// First block of the data region.
	pub d_start_blk: u32,
	/// Number of inodes stored per block.
	pub inodes_per_blk: u32,
	/// Number of directory entries stored per block.
	pub dirents_per_blk: u32,
	/// Number of data blocks the image can actually hold.
	pub max_dblks: u32,
}

const _: () = assert!(size_of::<Superblock>() == 40);

impl Superblock {
	/// Builds the superblock of a fresh image from the layout constants.
	pub fn new() -> Self {
		let i_region_blks =
			ceil_division(MAX_INUM as u64 * INODE_SIZE as u64, BLOCK_SIZE as u64) as u32;
		let total_blks = (DISK_SIZE / BLOCK_SIZE as u64) as u32;
		Self {
			magic: MAGIC,
			max_inum: MAX_INUM,
			max_dnum: MAX_DNUM,
			i_bitmap_blk: INODE_BITMAP_BLK,
			d_bitmap_blk: DATA_BITMAP_BLK,
			i_start_blk: INODE_REGION_BLK,
			d_start_blk: INODE_REGION_BLK + i_region_blks,
			inodes_per_blk: (BLOCK_SIZE / INODE_SIZE) as u32,
			dirents_per_blk: (BLOCK_SIZE / DIRENT_SIZE) as u32,
			max_dblks: total_blks - i_region_blks - INODE_REGION_BLK,
		}
	}

	/// Reads the superblock from block 0 of `disk`.
	///
	/// Fails if the magic number does not match.
	pub fn read(disk: &mut Disk) -> io::Result<Self> {
		let mut buf: Block = [0; BLOCK_SIZE];
		disk.read_block(SUPERBLOCK_BLK, &mut buf)?;
		let sb: Self = bytemuck::pod_read_unaligned(&buf[..size_of::<Self>()]);
		if sb.magic != MAGIC {
			return Err(io::Error::new(
				io::ErrorKind::InvalidData,
				"not a tinyfs image (bad magic)",
			));
		}
		Ok(sb)
	}

	/// Writes the superblock to block 0 of `disk`.
	pub fn write(&self, disk: &mut Disk) -> io::Result<()> {
		let mut buf: Block = [0; BLOCK_SIZE];
		buf[..size_of::<Self>()].copy_from_slice(bytemuck::bytes_of(self));
		disk.write_block(SUPERBLOCK_BLK, &buf)
	}
}

impl Default for Superblock {
	fn default() -> Self {
		Self::new()
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::util::test_util::temp_image;
	use std::fs;

	#[test]
	fn layout_constants() {
		let sb = Superblock::new();
		assert_eq!(sb.inodes_per_blk, 4);
		assert_eq!(sb.dirents_per_blk, 4);
		// 1024 inodes of 256 bytes fill 256 blocks behind the two bitmaps
		assert_eq!(sb.d_start_blk, 3 + 256);
		assert_eq!(sb.max_dblks, 32768 - 256 - 3);
	}

	#[test]
	fn write_read_roundtrip() {
		let path = temp_image();
		let mut disk = Disk::init(&path).unwrap();

		let sb = Superblock::new();
		sb.write(&mut disk).unwrap();
		assert_eq!(Superblock::read(&mut disk).unwrap(), sb);

		fs::remove_file(&path).unwrap();
	}

	#[test]
	fn bad_magic_rejected() {
		let path = temp_image();
		let mut disk = Disk::init(&path).unwrap();

		let mut sb = Superblock::new();
		sb.magic = 0xdead;
		sb.write(&mut disk).unwrap();
		assert!(Superblock::read(&mut disk).is_err());

		fs::remove_file(&path).unwrap();
	}
}
