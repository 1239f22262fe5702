//! Directory entries and the directory engine.
//!
//! A directory's content is a set of fixed-size entry slots packed into
//! the data blocks its inode's direct pointers name. A slot whose
//! validity word is 0 is free. Blocks are allocated lazily: a directory
//! grows by one block the first time an insertion finds no free slot in
//! the blocks it already owns.

use crate::alloc;
use crate::block::Block;
use crate::block::Disk;
use crate::block::BLOCK_SIZE;
use crate::error::Error;
use crate::error::Result;
use crate::inode::Inode;
use crate::inode::NUM_DPTRS;
use crate::superblock::Superblock;
use crate::util::get_timestamp;
use bytemuck::Pod;
use bytemuck::Zeroable;
use std::mem::size_of;

/// Maximum length of an entry name, not counting the trailing NUL.
pub const NAME_MAX: usize = 207;
/// Size of a directory entry on disk.
pub const DIRENT_SIZE: usize = 214;

/// One slot of a directory-entry block.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct Dirent {
	/// Inode number of the referenced file.
	pub ino: u16,
	/// 1 if the slot is in use.
	pub valid: u16,
	/// Entry name, NUL-terminated.
	name: [u8; NAME_MAX + 1],
	/// Stored length of the name.
	pub len: u16,
}

const _: () = assert!(size_of::<Dirent>() == DIRENT_SIZE);

impl Dirent {
	/// Builds a live entry referencing inode `ino` under `name`.
	///
	/// `name` must fit the name capacity and contain no NUL byte.
	pub fn new(ino: u16, name: &[u8]) -> Self {
		let mut ent = Self::zeroed();
		ent.ino = ino;
		ent.valid = 1;
		ent.name[..name.len()].copy_from_slice(name);
		ent.len = name.len() as u16;
		ent
	}

	/// Returns the entry's name, up to the trailing NUL.
	///
	/// The stored length is not consulted; the NUL terminator alone
	/// delimits the name, as in the on-disk format.
	pub fn name(&self) -> &[u8] {
		let end = self
			.name
			.iter()
			.position(|&b| b == 0)
			.unwrap_or(self.name.len());
		&self.name[..end]
	}
}

/// Looks up `name` in the directory identified by `parent_ino`.
///
/// Returns the first valid slot whose stored name equals `name`, or
/// `None` if the directory holds no such entry.
pub fn dir_find(
	parent_ino: u16,
	name: &[u8],
	sb: &Superblock,
	disk: &mut Disk,
) -> Result<Option<Dirent>> {
	let parent = Inode::read(parent_ino, sb, disk)?;
	let mut buf: Block = [0; BLOCK_SIZE];
	for k in 0..NUM_DPTRS {
		let Some(blk) = parent.direct(k) else {
			continue;
		};
		disk.read_block(blk, &mut buf)?;
		for slot in 0..sb.dirents_per_blk as usize {
			let ent = read_slot(&buf, slot);
			if ent.valid == 1 && ent.name() == name {
				return Ok(Some(ent));
			}
		}
	}
	Ok(None)
}

/// Inserts an entry for inode `child_ino` under `name` into the
/// directory described by `parent`.
///
/// The first free slot of an already-owned block is used; if none is
/// free, the first unset direct pointer gets a freshly allocated block
/// whose slot 0 becomes the entry, and the parent's size grows by one
/// block. The parent inode is only mutated in memory: the caller is
/// responsible for persisting it with [`Inode::write`].
pub fn dir_add(
	parent: &mut Inode,
	child_ino: u16,
	name: &[u8],
	sb: &Superblock,
	disk: &mut Disk,
) -> Result<()> {
	if dir_find(parent.ino, name, sb, disk)?.is_some() {
		return Err(Error::Exists);
	}
	let now = get_timestamp().as_secs() as i64;
	let mut buf: Block = [0; BLOCK_SIZE];
	for k in 0..NUM_DPTRS {
		match parent.direct(k) {
			Some(blk) => {
				disk.read_block(blk, &mut buf)?;
				let free = (0..sb.dirents_per_blk as usize)
					.find(|&slot| read_slot(&buf, slot).valid == 0);
				let Some(slot) = free else {
					continue;
				};
				write_slot(&mut buf, slot, &Dirent::new(child_ino, name));
				parent.stat.atime = now;
				parent.stat.mtime = now;
				disk.write_block(blk, &buf)?;
				return Ok(());
			}
			None => {
				let blk = alloc::alloc_block(sb, disk)?;
				parent.set_direct(k, blk);
				parent.size += BLOCK_SIZE as u32;
				parent.stat.size += BLOCK_SIZE as u64;
				parent.stat.atime = now;
				parent.stat.mtime = now;

				// fresh block image: the new entry in slot 0, the rest free
				let mut fresh: Block = [0; BLOCK_SIZE];
				write_slot(&mut fresh, 0, &Dirent::new(child_ino, name));
				disk.write_block(blk, &fresh)?;
				return Ok(());
			}
		}
	}
	Err(Error::NoSpace)
}

/// Calls `sink` once for each valid entry of the directory identified by
/// `ino`.
pub fn dir_for_each(
	ino: u16,
	sb: &Superblock,
	disk: &mut Disk,
	sink: &mut dyn FnMut(&Dirent),
) -> Result<()> {
	let inode = Inode::read(ino, sb, disk)?;
	let mut buf: Block = [0; BLOCK_SIZE];
	for k in 0..NUM_DPTRS {
		let Some(blk) = inode.direct(k) else {
			continue;
		};
		disk.read_block(blk, &mut buf)?;
		for slot in 0..sb.dirents_per_blk as usize {
			let ent = read_slot(&buf, slot);
			if ent.valid == 1 {
				sink(&ent);
			}
		}
	}
	Ok(())
}

/// Decodes the dirent in slot `slot` of a directory-entry block.
fn read_slot(buf: &Block, slot: usize) -> Dirent {
	let off = slot * DIRENT_SIZE;
	bytemuck::pod_read_unaligned(&buf[off..off + DIRENT_SIZE])
}

/// Encodes `ent` into slot `slot` of a directory-entry block.
fn write_slot(buf: &mut Block, slot: usize, ent: &Dirent) {
	let off = slot * DIRENT_SIZE;
	buf[off..off + DIRENT_SIZE].copy_from_slice(bytemuck::bytes_of(ent));
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::util::test_util::temp_image;
	use std::fs;
	use std::path::Path;

	/// Formats a scratch image holding a single empty directory inode and
	/// returns the pieces needed to drive the engine.
	fn scratch_dir(path: &Path) -> (Superblock, Disk, Inode) {
		let mut disk = Disk::init(path).unwrap();
		let sb = Superblock::new();
		sb.write(&mut disk).unwrap();

		let ino = alloc::alloc_inode(&sb, &mut disk).unwrap();
		let mut dir = Inode::zeroed();
		dir.ino = ino;
		dir.valid = 1;
		dir.mode = libc::S_IFDIR | 0o755;
		dir.link = 1;
		dir.write(ino, &sb, &mut disk).unwrap();
		(sb, disk, dir)
	}

	#[test]
	fn add_then_find() {
		let path = temp_image();
		let (sb, mut disk, mut dir) = scratch_dir(&path);

		dir_add(&mut dir, 7, b"hello", &sb, &mut disk).unwrap();
		dir.write(dir.ino, &sb, &mut disk).unwrap();

		let ent = dir_find(dir.ino, b"hello", &sb, &mut disk)
			.unwrap()
			.unwrap();
		assert_eq!(ent.ino, 7);
		assert_eq!(ent.len, 5);
		assert_eq!(ent.name(), b"hello");

		// a prefix of a stored name is not a match
		assert!(dir_find(dir.ino, b"hell", &sb, &mut disk)
			.unwrap()
			.is_none());
		assert!(dir_find(dir.ino, b"hellos", &sb, &mut disk)
			.unwrap()
			.is_none());

		fs::remove_file(&path).unwrap();
	}

	#[test]
	fn add_rejects_duplicates() {
		let path = temp_image();
		let (sb, mut disk, mut dir) = scratch_dir(&path);

		dir_add(&mut dir, 1, b"twin", &sb, &mut disk).unwrap();
		dir.write(dir.ino, &sb, &mut disk).unwrap();
		assert!(matches!(
			dir_add(&mut dir, 2, b"twin", &sb, &mut disk),
			Err(Error::Exists)
		));

		fs::remove_file(&path).unwrap();
	}

	#[test]
	fn growth_allocates_blocks_lazily() {
		let path = temp_image();
		let (sb, mut disk, mut dir) = scratch_dir(&path);
		let per_blk = sb.dirents_per_blk as usize;

		for i in 0..per_blk {
			let name = format!("e{i}");
			dir_add(&mut dir, i as u16, name.as_bytes(), &sb, &mut disk).unwrap();
		}
		assert_eq!(dir.size as usize, BLOCK_SIZE);
		assert!(dir.direct(0).is_some());
		assert!(dir.direct(1).is_none());

		// the next insertion spills into a second block
		dir_add(&mut dir, 99, b"spill", &sb, &mut disk).unwrap();
		assert_eq!(dir.size as usize, 2 * BLOCK_SIZE);
		assert_eq!(dir.stat.size as usize, 2 * BLOCK_SIZE);
		assert!(dir.direct(1).is_some());
		dir.write(dir.ino, &sb, &mut disk).unwrap();

		let ent = dir_find(dir.ino, b"spill", &sb, &mut disk)
			.unwrap()
			.unwrap();
		assert_eq!(ent.ino, 99);

		fs::remove_file(&path).unwrap();
	}

	#[test]
	fn full_directory_is_no_space() {
		let path = temp_image();
		let (sb, mut disk, mut dir) = scratch_dir(&path);
		let capacity = NUM_DPTRS * sb.dirents_per_blk as usize;

		for i in 0..capacity {
			let name = format!("f{i}");
			dir_add(&mut dir, i as u16, name.as_bytes(), &sb, &mut disk).unwrap();
		}
		assert!(matches!(
			dir_add(&mut dir, 1000, b"overflow", &sb, &mut disk),
			Err(Error::NoSpace)
		));

		fs::remove_file(&path).unwrap();
	}

	#[test]
	fn for_each_sees_every_entry() {
		let path = temp_image();
		let (sb, mut disk, mut dir) = scratch_dir(&path);

		for name in [b"a".as_slice(), b"b", b"c"] {
			dir_add(&mut dir, 1, name, &sb, &mut disk).unwrap();
		}
		dir.write(dir.ino, &sb, &mut disk).unwrap();

		let mut names = Vec::new();
		dir_for_each(dir.ino, &sb, &mut disk, &mut |ent| {
			names.push(ent.name().to_vec());
		})
		.unwrap();
		assert_eq!(names, vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec()]);

		fs::remove_file(&path).unwrap();
	}
}
