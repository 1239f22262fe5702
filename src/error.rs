//! Errors returned by filesystem operations.

use std::error;
use std::fmt;
use std::io;

/// An error produced by a filesystem operation.
///
/// Inside the library the kind stays typed; the host boundary maps each
/// kind to a POSIX errno through [`Error::errno`].
#[derive(Debug)]
pub enum Error {
	/// A path component does not exist.
	NotFound,
	/// The entry to create already exists.
	Exists,
	/// No free inode, data block or directory slot is left.
	NoSpace,
	/// The requested byte range exceeds the maximum file size.
	TooLarge,
	/// The entry name exceeds the dirent name capacity.
	NameTooLong,
	/// An I/O error on the backing file.
	Io(io::Error),
}

impl Error {
	/// Returns the errno value corresponding to the error.
	pub fn errno(&self) -> i32 {
		match self {
			Self::NotFound => libc::ENOENT,
			Self::Exists => libc::EEXIST,
			Self::NoSpace => libc::ENOSPC,
			Self::TooLarge => libc::EFBIG,
			Self::NameTooLong => libc::ENAMETOOLONG,
			Self::Io(_) => libc::EIO,
		}
	}
}

impl fmt::Display for Error {
	fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::NotFound => write!(fmt, "no such file or directory"),
			Self::Exists => write!(fmt, "file exists"),
			Self::NoSpace => write!(fmt, "no space left on device"),
			Self::TooLarge => write!(fmt, "file too large"),
			Self::NameTooLong => write!(fmt, "file name too long"),
			Self::Io(e) => write!(fmt, "{e}"),
		}
	}
}

impl error::Error for Error {
	fn source(&self) -> Option<&(dyn error::Error + 'static)> {
		match self {
			Self::Io(e) => Some(e),
			_ => None,
		}
	}
}

impl From<io::Error> for Error {
	fn from(e: io::Error) -> Self {
		Self::Io(e)
	}
}

/// Result alias for filesystem operations.
pub type Result<T> = std::result::Result<T, Error>;
