//! Block-grained I/O on the backing file.
//!
//! The whole filesystem lives in a single fixed-size regular file. This
//! module is the only place that touches it: everything above it reads
//! and writes whole blocks identified by their absolute block number.

use std::fs::OpenOptions;
use std::fs::File;
use std::io;
use std::io::Read;
use std::io::Seek;
use std::io::SeekFrom;
use std::io::Write;
use std::path::Path;

/// The size of a block in bytes.
pub const BLOCK_SIZE: usize = 1024;
/// The total size of the backing file in bytes.
pub const DISK_SIZE: u64 = 32 * 1024 * 1024;

/// A scratch buffer holding exactly one block.
pub type Block = [u8; BLOCK_SIZE];

/// The backing file of a mounted filesystem, addressed by block number.
pub struct Disk {
	/// The open backing file.
	file: File,
}

impl Disk {
	/// Creates the backing file at `path` if it does not exist, extends it
	/// to the fixed disk size and opens it.
	///
	/// Existing content is not truncated.
	pub fn init(path: &Path) -> io::Result<Self> {
		let file = OpenOptions::new()
			.read(true)
			.write(true)
			.create(true)
			.open(path)?;
		file.set_len(DISK_SIZE)?;
		Ok(Self {
			file,
		})
	}

	/// Opens the existing backing file at `path`.
	pub fn open(path: &Path) -> io::Result<Self> {
		let file = OpenOptions::new().read(true).write(true).open(path)?;
		Ok(Self {
			file,
		})
	}

	/// Reads block `blk` into `buf`.
	///
	/// A read falling past the end of the file zeroes the remainder of the
	/// buffer instead of failing.
	pub fn read_block(&mut self, blk: u32, buf: &mut Block) -> io::Result<()> {
		self.file
			.seek(SeekFrom::Start(blk as u64 * BLOCK_SIZE as u64))?;
		let mut filled = 0;
		while filled < buf.len() {
			match self.file.read(&mut buf[filled..]) {
				Ok(0) => break,
				Ok(n) => filled += n,
				Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
				Err(e) => return Err(e),
			}
		}
		buf[filled..].fill(0);
		Ok(())
	}

	/// Writes `buf` to block `blk`.
	pub fn write_block(&mut self, blk: u32, buf: &Block) -> io::Result<()> {
		self.file
			.seek(SeekFrom::Start(blk as u64 * BLOCK_SIZE as u64))?;
		self.file.write_all(buf)
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::util::test_util::temp_image;
	use std::fs;

	#[test]
	fn init_sets_disk_size() {
		let path = temp_image();
		let _disk = Disk::init(&path).unwrap();
		assert_eq!(fs::metadata(&path).unwrap().len(), DISK_SIZE);
		fs::remove_file(&path).unwrap();
	}

	#[test]
	fn block_roundtrip() {
		let path = temp_image();
		let mut disk = Disk::init(&path).unwrap();

		let mut out: Block = [0; BLOCK_SIZE];
		for (i, b) in out.iter_mut().enumerate() {
			*b = (i % 251) as u8;
		}
		disk.write_block(42, &out).unwrap();

		let mut buf: Block = [0xff; BLOCK_SIZE];
		disk.read_block(42, &mut buf).unwrap();
		assert_eq!(buf, out);

		// neighbors untouched
		disk.read_block(41, &mut buf).unwrap();
		assert_eq!(buf, [0; BLOCK_SIZE]);

		fs::remove_file(&path).unwrap();
	}

	#[test]
	fn short_read_zeroes_buffer() {
		let path = temp_image();
		fs::write(&path, [0xabu8; 100]).unwrap();

		let mut disk = Disk::open(&path).unwrap();
		let mut buf: Block = [0xff; BLOCK_SIZE];
		disk.read_block(0, &mut buf).unwrap();
		assert_eq!(&buf[..100], &[0xab; 100][..]);
		assert_eq!(&buf[100..], &[0; BLOCK_SIZE - 100][..]);

		fs::remove_file(&path).unwrap();
	}
}
