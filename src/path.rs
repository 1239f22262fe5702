//! Absolute path resolution.

use crate::block::Disk;
use crate::dirent;
use crate::error::Error;
use crate::error::Result;
use crate::inode::Inode;
use crate::superblock::Superblock;

/// Resolves `path` starting from the directory inode `start_ino` and
/// returns the inode it denotes.
///
/// The walk is iterative, one directory lookup per component. Empty
/// components (leading, doubled or trailing slashes) are skipped, so
/// `"/"` resolves to `start_ino` itself. A failed lookup surfaces as
/// [`Error::NotFound`].
pub fn resolve(path: &[u8], start_ino: u16, sb: &Superblock, disk: &mut Disk) -> Result<Inode> {
	let mut ino = start_ino;
	for comp in path.split(|&b| b == b'/') {
		if comp.is_empty() {
			continue;
		}
		let ent = dirent::dir_find(ino, comp, sb, disk)?.ok_or(Error::NotFound)?;
		ino = ent.ino;
	}
	Ok(Inode::read(ino, sb, disk)?)
}

/// Splits `path` into its parent directory and leaf name, following the
/// usual dirname/basename rules.
///
/// Trailing slashes are ignored; the parent of a top-level entry is
/// `"/"`. The leaf of `"/"` itself is empty.
pub fn split_path(path: &[u8]) -> (&[u8], &[u8]) {
	let mut end = path.len();
	while end > 0 && path[end - 1] == b'/' {
		end -= 1;
	}
	let trimmed = &path[..end];
	match trimmed.iter().rposition(|&b| b == b'/') {
		Some(0) => (&trimmed[..1], &trimmed[1..]),
		Some(i) => (&trimmed[..i], &trimmed[i + 1..]),
		None => (b"/", trimmed),
	}
}
