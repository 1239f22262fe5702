//! The inode table.
//!
//! Inodes live in a contiguous region of blocks right after the bitmap
//! blocks. Records are stored by memory layout, four to a block, and are
//! read and written individually through [`Inode::read`] and
//! [`Inode::write`].

use crate::block::Block;
use crate::block::Disk;
use crate::block::BLOCK_SIZE;
use crate::superblock::Superblock;
use bytemuck::Pod;
use bytemuck::Zeroable;
use std::io;
use std::mem::size_of;

/// Number of direct block pointers per inode.
pub const NUM_DPTRS: usize = 16;
/// Number of indirect block pointers per inode. Reserved in the layout,
/// never traversed.
pub const NUM_IDPTRS: usize = 8;
/// Size of an inode record on disk, including reserved padding.
pub const INODE_SIZE: usize = 256;

/// Per-inode attributes served to the host's stat calls.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct Stat {
	/// Owner user id.
	pub uid: u32,
	/// Owner group id.
	pub gid: u32,
	/// File type and permission bits.
	pub mode: u32,
	/// Number of hard links.
	pub nlink: u32,
	/// Size in bytes, mirroring [`Inode::size`].
	pub size: u64,
	/// Last access time, in seconds since the Unix epoch.
	pub atime: i64,
	/// Last modification time, in seconds since the Unix epoch.
	pub mtime: i64,
}

/// An entry of the on-disk inode table.
///
/// A block pointer value of `0` means the slot is unused; pointers are
/// only handed out through [`Inode::direct`], which surfaces that
/// sentinel as `None`.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct Inode {
	/// The inode's own number.
	pub ino: u16,
	/// 1 if the inode is in use.
	pub valid: u16,
	/// Size in bytes of the content, grown in whole blocks.
	pub size: u32,
	/// File type and permission bits.
	pub mode: u32,
	/// Number of links.
	pub link: u32,
	/// Direct block pointers, as absolute block numbers.
	direct_ptr: [u32; NUM_DPTRS],
	/// Indirect block pointers, reserved in the layout.
	indirect_ptr: [u32; NUM_IDPTRS],
	/// Attributes served to the host.
	pub stat: Stat,
	/// Reserved space up to the fixed record size.
	_reserved: [u8; 104],
}

const _: () = assert!(size_of::<Inode>() == INODE_SIZE);

impl Inode {
	/// Reads inode `ino` from the table.
	pub fn read(ino: u16, sb: &Superblock, disk: &mut Disk) -> io::Result<Self> {
		let (blk, off) = Self::locate(ino, sb);
		let mut buf: Block = [0; BLOCK_SIZE];
		disk.read_block(blk, &mut buf)?;
		Ok(bytemuck::pod_read_unaligned(&buf[off..off + INODE_SIZE]))
	}

	/// Writes the record into slot `ino` of the table.
	///
	/// The containing block is read back first so the other inodes stored
	/// in it are preserved.
	pub fn write(&self, ino: u16, sb: &Superblock, disk: &mut Disk) -> io::Result<()> {
		let (blk, off) = Self::locate(ino, sb);
		let mut buf: Block = [0; BLOCK_SIZE];
		disk.read_block(blk, &mut buf)?;
		buf[off..off + INODE_SIZE].copy_from_slice(bytemuck::bytes_of(self));
		disk.write_block(blk, &buf)
	}

	/// Returns the block number and in-block byte offset of inode `ino`.
	fn locate(ino: u16, sb: &Superblock) -> (u32, usize) {
		let blk = sb.i_start_blk + (ino as u32 * INODE_SIZE as u32) / BLOCK_SIZE as u32;
		let off = (ino as usize % sb.inodes_per_blk as usize) * INODE_SIZE;
		(blk, off)
	}

	/// Returns the `k`th direct block pointer, if one is set.
	pub fn direct(&self, k: usize) -> Option<u32> {
		match self.direct_ptr[k] {
			0 => None,
			blk => Some(blk),
		}
	}

	/// Points the `k`th direct block pointer at block `blk`.
	pub fn set_direct(&mut self, k: usize, blk: u32) {
		self.direct_ptr[k] = blk;
	}

	/// Tells whether the inode describes a directory.
	pub fn is_directory(&self) -> bool {
		self.mode & libc::S_IFMT == libc::S_IFDIR
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::util::test_util::temp_image;
	use std::fs;

	#[test]
	fn locate_spreads_over_region() {
		let sb = Superblock::new();
		assert_eq!(Inode::locate(0, &sb), (3, 0));
		assert_eq!(Inode::locate(1, &sb), (3, 256));
		assert_eq!(Inode::locate(3, &sb), (3, 768));
		assert_eq!(Inode::locate(4, &sb), (4, 0));
		assert_eq!(Inode::locate(1023, &sb), (3 + 255, 768));
	}

	#[test]
	fn write_preserves_neighbors() {
		let path = temp_image();
		let mut disk = Disk::init(&path).unwrap();
		let sb = Superblock::new();

		let mut first = Inode::zeroed();
		first.ino = 0;
		first.valid = 1;
		first.size = 1024;
		first.write(0, &sb, &mut disk).unwrap();

		// inode 1 shares the block with inode 0
		let mut second = Inode::zeroed();
		second.ino = 1;
		second.valid = 1;
		second.set_direct(7, 300);
		second.write(1, &sb, &mut disk).unwrap();

		let first = Inode::read(0, &sb, &mut disk).unwrap();
		assert_eq!(first.valid, 1);
		assert_eq!(first.size, 1024);
		let second = Inode::read(1, &sb, &mut disk).unwrap();
		assert_eq!(second.valid, 1);
		assert_eq!(second.direct(7), Some(300));
		assert_eq!(second.direct(0), None);

		fs::remove_file(&path).unwrap();
	}
}
