//! First-fit allocation of inodes and data blocks.
//!
//! Both bitmaps follow the same protocol: read the bitmap block, find
//! the lowest clear bit, set it and write the bitmap back in one pass.
//! Nothing here releases units; removal is not implemented.

use crate::bitmap::Bitmap;
use crate::block::Block;
use crate::block::Disk;
use crate::block::BLOCK_SIZE;
use crate::error::Error;
use crate::error::Result;
use crate::superblock::Superblock;
use crate::util::ceil_division;

/// Allocates the lowest free inode number and persists the inode bitmap.
pub fn alloc_inode(sb: &Superblock, disk: &mut Disk) -> Result<u16> {
	let i = bitmap_alloc(disk, sb.i_bitmap_blk, sb.max_inum)?;
	Ok(i as u16)
}

/// Allocates the lowest free data block and persists the data bitmap.
///
/// The returned value is an absolute block number in the data region,
/// directly consumable by the block I/O layer.
pub fn alloc_block(sb: &Superblock, disk: &mut Disk) -> Result<u32> {
	let limit = sb.max_dnum.min(sb.max_dblks);
	let i = bitmap_alloc(disk, sb.d_bitmap_blk, limit)?;
	Ok(sb.d_start_blk + i)
}

/// Finds, marks and persists the first clear bit of the bitmap stored in
/// block `blk`, which tracks `count` units.
///
/// The bitmap block is rewritten from a zeroed scratch buffer: only the
/// bitmap bytes themselves are carried over.
fn bitmap_alloc(disk: &mut Disk, blk: u32, count: u32) -> Result<u32> {
	let mut buf: Block = [0; BLOCK_SIZE];
	disk.read_block(blk, &mut buf)?;
	let len = ceil_division(count as u64, 8) as usize;
	let mut bm = Bitmap::from_bytes(&buf[..len]);
	let i = bm.first_clear(count as usize).ok_or(Error::NoSpace)?;
	bm.set(i);

	let mut out: Block = [0; BLOCK_SIZE];
	out[..len].copy_from_slice(bm.as_bytes());
	disk.write_block(blk, &out)?;
	Ok(i as u32)
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::util::test_util::temp_image;
	use std::fs;

	#[test]
	fn allocations_ascend() {
		let path = temp_image();
		let mut disk = Disk::init(&path).unwrap();
		let sb = Superblock::new();

		assert_eq!(alloc_inode(&sb, &mut disk).unwrap(), 0);
		assert_eq!(alloc_inode(&sb, &mut disk).unwrap(), 1);
		assert_eq!(alloc_inode(&sb, &mut disk).unwrap(), 2);

		assert_eq!(alloc_block(&sb, &mut disk).unwrap(), sb.d_start_blk);
		assert_eq!(alloc_block(&sb, &mut disk).unwrap(), sb.d_start_blk + 1);

		fs::remove_file(&path).unwrap();
	}

	#[test]
	fn inode_exhaustion() {
		let path = temp_image();
		let mut disk = Disk::init(&path).unwrap();
		let sb = Superblock::new();

		for i in 0..sb.max_inum {
			assert_eq!(alloc_inode(&sb, &mut disk).unwrap(), i as u16);
		}
		assert!(matches!(
			alloc_inode(&sb, &mut disk),
			Err(Error::NoSpace)
		));

		fs::remove_file(&path).unwrap();
	}
}
