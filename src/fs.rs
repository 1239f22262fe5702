//! Mounting and the user-visible filesystem operations.
//!
//! [`TinyFs`] is the mount context: the open backing file plus the
//! in-memory superblock, threaded through every operation. Operations
//! run to completion synchronously; the caller serializes them.

use crate::alloc;
use crate::block::Disk;
use crate::block::Block;
use crate::block::BLOCK_SIZE;
use crate::dirent;
use crate::dirent::NAME_MAX;
use crate::error::Error;
use crate::error::Result;
use crate::inode::Inode;
use crate::inode::Stat;
use crate::inode::NUM_DPTRS;
use crate::path;
use crate::superblock::Superblock;
use crate::util::get_timestamp;
use bytemuck::Zeroable;
use std::ffi::OsStr;
use std::os::unix::ffi::OsStrExt;
use std::path::Path;

/// The inode number of the root directory.
pub const ROOT_INO: u16 = 0;
/// The maximum size of a file, bounded by its direct pointers.
pub const MAX_FILE_SIZE: u64 = (NUM_DPTRS * BLOCK_SIZE) as u64;

/// An opaque handle to an open file.
#[derive(Clone, Copy, Debug)]
pub struct FileHandle(u16);

impl FileHandle {
	/// Returns the inode number the handle identifies.
	pub fn ino(&self) -> u16 {
		self.0
	}
}

/// An opaque handle to an open directory.
#[derive(Clone, Copy, Debug)]
pub struct DirHandle(u16);

impl DirHandle {
	/// Returns the inode number the handle identifies.
	pub fn ino(&self) -> u16 {
		self.0
	}
}

/// A mounted filesystem.
pub struct TinyFs {
	/// Block I/O on the backing file.
	disk: Disk,
	/// In-memory mirror of the on-disk superblock.
	sb: Superblock,
}

impl TinyFs {
	/// Creates a fresh filesystem on `path` and mounts it.
	///
	/// The backing file is created at its fixed size, the superblock is
	/// written and the root directory is built with its `"."` entry.
	pub fn format(path: &Path) -> Result<Self> {
		let mut disk = Disk::init(path)?;
		let sb = Superblock::new();
		sb.write(&mut disk)?;

		// start from clean bitmaps even when reformatting a dirty image
		let zero: Block = [0; BLOCK_SIZE];
		disk.write_block(sb.i_bitmap_blk, &zero)?;
		disk.write_block(sb.d_bitmap_blk, &zero)?;

		let ino = alloc::alloc_inode(&sb, &mut disk)?;
		let mut root = new_inode(ino, libc::S_IFDIR | 0o755, 1);
		// persist the empty root first so dir_add scans a clean inode
		root.write(ino, &sb, &mut disk)?;
		dirent::dir_add(&mut root, ino, b".", &sb, &mut disk)?;
		root.write(ino, &sb, &mut disk)?;

		Ok(Self {
			disk,
			sb,
		})
	}

	/// Mounts the filesystem stored in `path`.
	///
	/// A fresh image is formatted if the backing file does not exist yet.
	pub fn mount(path: &Path) -> Result<Self> {
		if !path.exists() {
			return Self::format(path);
		}
		let mut disk = Disk::open(path)?;
		let sb = Superblock::read(&mut disk)?;
		Ok(Self {
			disk,
			sb,
		})
	}

	/// Unmounts the filesystem, closing the backing file.
	pub fn unmount(self) {}

	/// Returns the mounted superblock.
	pub fn superblock(&self) -> &Superblock {
		&self.sb
	}

	/// Returns the attributes of the file at `path`.
	///
	/// The inode's access and modification times are refreshed and
	/// written back; the attributes returned are the ones read.
	pub fn get_attributes(&mut self, path: &Path) -> Result<Stat> {
		let mut inode = self.resolve(path)?;
		let attrs = inode.stat;

		let now = get_timestamp().as_secs() as i64;
		inode.stat.atime = now;
		inode.stat.mtime = now;
		inode.write(inode.ino, &self.sb, &mut self.disk)?;
		Ok(attrs)
	}

	/// Opens the directory at `path`.
	pub fn open_directory(&mut self, path: &Path) -> Result<DirHandle> {
		let inode = self.resolve(path)?;
		Ok(DirHandle(inode.ino))
	}

	/// Enumerates the names of the entries of the directory at `path`.
	pub fn read_directory(&mut self, path: &Path, sink: &mut dyn FnMut(&OsStr)) -> Result<()> {
		let inode = self.resolve(path)?;
		dirent::dir_for_each(inode.ino, &self.sb, &mut self.disk, &mut |ent| {
			sink(OsStr::from_bytes(ent.name()));
		})
	}

	/// Creates a directory at `path` with the given permission bits.
	pub fn make_directory(&mut self, path: &Path, mode: u32) -> Result<()> {
		let (mut parent, child_ino) = self.insert_leaf(path)?;
		parent.link += 1;
		parent.stat.nlink += 1;
		parent.write(parent.ino, &self.sb, &mut self.disk)?;

		let mut child = new_inode(child_ino, libc::S_IFDIR | mode, 2);
		// persist the empty child first so dir_add scans a clean inode
		child.write(child_ino, &self.sb, &mut self.disk)?;
		dirent::dir_add(&mut child, child_ino, b".", &self.sb, &mut self.disk)?;
		dirent::dir_add(&mut child, parent.ino, b"..", &self.sb, &mut self.disk)?;
		child.write(child_ino, &self.sb, &mut self.disk)?;
		Ok(())
	}

	/// Creates a regular file at `path` with the given permission bits.
	pub fn create_file(&mut self, path: &Path, mode: u32) -> Result<FileHandle> {
		let (parent, child_ino) = self.insert_leaf(path)?;
		parent.write(parent.ino, &self.sb, &mut self.disk)?;

		let child = new_inode(child_ino, libc::S_IFREG | mode, 1);
		child.write(child_ino, &self.sb, &mut self.disk)?;
		Ok(FileHandle(child_ino))
	}

	/// Opens the file at `path`.
	pub fn open_file(&mut self, path: &Path) -> Result<FileHandle> {
		let inode = self.resolve(path)?;
		Ok(FileHandle(inode.ino))
	}

	/// Reads `buf.len()` bytes at byte `offset` from the file at `path`.
	///
	/// Blocks the file does not own yet read as zeroes. Returns the
	/// number of bytes read.
	pub fn read_file(&mut self, path: &Path, buf: &mut [u8], offset: u64) -> Result<usize> {
		check_bounds(offset, buf.len() as u64)?;
		let inode = self.resolve(path)?;

		let start_blk = (offset / BLOCK_SIZE as u64) as usize;
		let end_blk = ((offset + buf.len() as u64) / BLOCK_SIZE as u64) as usize;
		let mut intra = (offset % BLOCK_SIZE as u64) as usize;
		let mut copied = 0;
		let mut block: Block = [0; BLOCK_SIZE];
		for k in start_blk..=end_blk {
			if copied == buf.len() {
				break;
			}
			match inode.direct(k) {
				Some(blk) => self.disk.read_block(blk, &mut block)?,
				None => block.fill(0),
			}
			let n = (BLOCK_SIZE - intra).min(buf.len() - copied);
			buf[copied..copied + n].copy_from_slice(&block[intra..intra + n]);
			copied += n;
			intra = 0;
		}
		Ok(copied)
	}

	/// Writes `buf` at byte `offset` into the file at `path`, allocating
	/// data blocks as needed.
	///
	/// Returns the number of bytes written.
	pub fn write_file(&mut self, path: &Path, buf: &[u8], offset: u64) -> Result<usize> {
		check_bounds(offset, buf.len() as u64)?;
		let mut inode = self.resolve(path)?;

		let start_blk = (offset / BLOCK_SIZE as u64) as usize;
		let end_blk = ((offset + buf.len() as u64) / BLOCK_SIZE as u64) as usize;

		// make sure every touched block is owned by the file
		for k in start_blk..=end_blk.min(NUM_DPTRS - 1) {
			if inode.direct(k).is_none() {
				let blk = alloc::alloc_block(&self.sb, &mut self.disk)?;
				inode.set_direct(k, blk);
				inode.size += BLOCK_SIZE as u32;
				inode.stat.size += BLOCK_SIZE as u64;
			}
		}

		let mut intra = (offset % BLOCK_SIZE as u64) as usize;
		let mut copied = 0;
		let mut block: Block = [0; BLOCK_SIZE];
		for k in start_blk..=end_blk {
			if copied == buf.len() {
				break;
			}
			let Some(blk) = inode.direct(k) else {
				break;
			};
			let n = (BLOCK_SIZE - intra).min(buf.len() - copied);
			if n < BLOCK_SIZE {
				// partial block: keep the bytes around the written range
				self.disk.read_block(blk, &mut block)?;
			}
			block[intra..intra + n].copy_from_slice(&buf[copied..copied + n]);
			self.disk.write_block(blk, &block)?;
			copied += n;
			intra = 0;
		}

		let now = get_timestamp().as_secs() as i64;
		inode.stat.atime = now;
		inode.stat.mtime = now;
		inode.write(inode.ino, &self.sb, &mut self.disk)?;
		Ok(copied)
	}

	/// Resolves `path` from the root directory.
	fn resolve(&mut self, path: &Path) -> Result<Inode> {
		path::resolve(
			path.as_os_str().as_bytes(),
			ROOT_INO,
			&self.sb,
			&mut self.disk,
		)
	}

	/// Common front half of the creation operations: resolves the parent
	/// of `path`, checks the leaf, allocates a child inode number and
	/// inserts the leaf entry.
	///
	/// Returns the updated parent inode (not yet persisted) and the child
	/// inode number.
	fn insert_leaf(&mut self, path: &Path) -> Result<(Inode, u16)> {
		let (parent_path, leaf) = path::split_path(path.as_os_str().as_bytes());
		if leaf.is_empty() {
			return Err(Error::Exists);
		}
		if leaf.len() > NAME_MAX {
			return Err(Error::NameTooLong);
		}
		let mut parent = path::resolve(parent_path, ROOT_INO, &self.sb, &mut self.disk)?;
		if dirent::dir_find(parent.ino, leaf, &self.sb, &mut self.disk)?.is_some() {
			return Err(Error::Exists);
		}
		let child_ino = alloc::alloc_inode(&self.sb, &mut self.disk)?;
		dirent::dir_add(&mut parent, child_ino, leaf, &self.sb, &mut self.disk)?;
		Ok((parent, child_ino))
	}
}

/// Builds a fresh in-memory inode owned by the calling process.
fn new_inode(ino: u16, mode: u32, link: u32) -> Inode {
	let now = get_timestamp().as_secs() as i64;
	let mut inode = Inode::zeroed();
	inode.ino = ino;
	inode.valid = 1;
	inode.mode = mode;
	inode.link = link;
	inode.stat.uid = unsafe { libc::getuid() };
	inode.stat.gid = unsafe { libc::getgid() };
	inode.stat.mode = mode;
	inode.stat.nlink = link;
	inode.stat.atime = now;
	inode.stat.mtime = now;
	inode
}

/// Fails with "too large" if the byte range escapes the direct-pointer
/// window.
fn check_bounds(offset: u64, size: u64) -> Result<()> {
	if offset > MAX_FILE_SIZE || size > MAX_FILE_SIZE || offset + size > MAX_FILE_SIZE {
		return Err(Error::TooLarge);
	}
	Ok(())
}
