//! The host-facing operation surface.
//!
//! A host adapter (the user-space filesystem glue) calls these wrappers,
//! which follow the C calling convention: `0` — or a byte count — on
//! success, the negated errno on failure. I/O errors on the backing file
//! are reported on stderr and otherwise swallowed, so the host sees the
//! operation as successful. Operations the host may issue but that the
//! format only reserves room for (removal, truncation and the various
//! release hooks) are accepted and do nothing.

use crate::error::Error;
use crate::fs::TinyFs;
use crate::inode::Stat;
use libc::c_int;
use std::ffi::OsStr;
use std::path::Path;

/// Maps an operation error to a host return code.
fn host_err(e: Error) -> c_int {
	match e {
		Error::Io(e) => {
			eprintln!("tinyfs: i/o error ignored: {e}");
			0
		}
		e => -e.errno(),
	}
}

/// Converts a unit operation result into a host return code.
fn ret(res: Result<(), Error>) -> c_int {
	match res {
		Ok(()) => 0,
		Err(e) => host_err(e),
	}
}

/// Fills `out` with the attributes of the file at `path`.
pub fn getattr(fs: &mut TinyFs, path: &Path, out: &mut Stat) -> c_int {
	match fs.get_attributes(path) {
		Ok(stat) => {
			*out = stat;
			0
		}
		Err(e) => host_err(e),
	}
}

/// Opens the directory at `path`, publishing its handle in `fh`.
pub fn opendir(fs: &mut TinyFs, path: &Path, fh: &mut u64) -> c_int {
	match fs.open_directory(path) {
		Ok(handle) => {
			*fh = handle.ino() as u64;
			0
		}
		Err(e) => host_err(e),
	}
}

/// Emits the entry names of the directory at `path` into `filler`.
pub fn readdir(fs: &mut TinyFs, path: &Path, filler: &mut dyn FnMut(&OsStr)) -> c_int {
	ret(fs.read_directory(path, filler))
}

/// Creates a directory at `path`.
pub fn mkdir(fs: &mut TinyFs, path: &Path, mode: u32) -> c_int {
	ret(fs.make_directory(path, mode))
}

/// Creates a regular file at `path`, publishing its handle in `fh`.
pub fn create(fs: &mut TinyFs, path: &Path, mode: u32, fh: &mut u64) -> c_int {
	match fs.create_file(path, mode) {
		Ok(handle) => {
			*fh = handle.ino() as u64;
			0
		}
		Err(e) => host_err(e),
	}
}

/// Opens the file at `path`, publishing its handle in `fh`.
pub fn open(fs: &mut TinyFs, path: &Path, fh: &mut u64) -> c_int {
	match fs.open_file(path) {
		Ok(handle) => {
			*fh = handle.ino() as u64;
			0
		}
		Err(e) => host_err(e),
	}
}

/// Reads `buf.len()` bytes at `offset`; returns the byte count.
pub fn read(fs: &mut TinyFs, path: &Path, buf: &mut [u8], offset: u64) -> c_int {
	match fs.read_file(path, buf, offset) {
		Ok(n) => n as c_int,
		Err(e) => host_err(e),
	}
}

/// Writes `buf` at `offset`; returns the byte count.
pub fn write(fs: &mut TinyFs, path: &Path, buf: &[u8], offset: u64) -> c_int {
	match fs.write_file(path, buf, offset) {
		Ok(n) => n as c_int,
		Err(e) => host_err(e),
	}
}

/// Accepted for host compatibility; does nothing.
pub fn release(_fs: &mut TinyFs, _path: &Path) -> c_int {
	0
}

/// Accepted for host compatibility; does nothing.
pub fn releasedir(_fs: &mut TinyFs, _path: &Path) -> c_int {
	0
}

/// Accepted for host compatibility; does nothing.
pub fn flush(_fs: &mut TinyFs, _path: &Path) -> c_int {
	0
}

/// Accepted for host compatibility; does nothing.
pub fn utimens(_fs: &mut TinyFs, _path: &Path, _atime: i64, _mtime: i64) -> c_int {
	0
}

/// Accepted for host compatibility; does nothing.
pub fn truncate(_fs: &mut TinyFs, _path: &Path, _size: u64) -> c_int {
	0
}

/// Accepted for host compatibility; does nothing.
pub fn unlink(_fs: &mut TinyFs, _path: &Path) -> c_int {
	0
}

/// Accepted for host compatibility; does nothing.
pub fn rmdir(_fs: &mut TinyFs, _path: &Path) -> c_int {
	0
}
