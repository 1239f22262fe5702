//! Small helpers shared by the filesystem modules.

use std::time::Duration;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

/// Returns the time elapsed since the Unix epoch on the local clock.
pub fn get_timestamp() -> Duration {
	SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.expect("system clock is set before the Unix epoch")
}

/// Computes the ceiling of the division of `a` by `b`.
pub fn ceil_division(a: u64, b: u64) -> u64 {
	(a + b - 1) / b
}

#[cfg(test)]
pub(crate) mod test_util {
	use std::path::PathBuf;
	use uuid::Uuid;

	/// Returns a unique path for a scratch disk image in the system's
	/// temporary directory.
	pub(crate) fn temp_image() -> PathBuf {
		std::env::temp_dir().join(format!("tinyfs-test-{}.img", Uuid::new_v4()))
	}
}
