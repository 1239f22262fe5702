//! The `tinyfs` command-line tool formats, inspects and exercises disk
//! images.

use std::env;
use std::ffi::OsString;
use std::fmt;
use std::io;
use std::io::Write;
use std::os::unix::ffi::OsStrExt;
use std::path::Path;
use std::path::PathBuf;
use std::process::exit;
use tinyfs::block::BLOCK_SIZE;
use tinyfs::fs::MAX_FILE_SIZE;
use tinyfs::TinyFs;

/// The default image file, in the current directory.
const DEFAULT_IMAGE: &str = "DISKFILE";

/// Structure storing command line arguments.
#[derive(Default)]
struct Args {
	/// The path to the disk image.
	image: Option<PathBuf>,

	/// If true, print command line help.
	help: bool,

	/// The command and its operands.
	command: Vec<OsString>,
}

fn parse_args() -> Args {
	let mut args: Args = Default::default();
	let mut iter = env::args_os().skip(1);
	while let Some(arg) = iter.next() {
		match arg.to_str() {
			Some("-h" | "--help") => args.help = true,
			Some("-i" | "--image") => {
				args.image = iter.next().map(PathBuf::from);
			}
			_ => args.command.push(arg),
		}
	}
	args
}

/// Prints the command's usage.
fn print_usage() {
	eprintln!("Usage:");
	eprintln!(" tinyfs [-i <image>] <command> [args]");
	eprintln!();
	eprintln!("Commands:");
	eprintln!(" mkfs\t\t\tformats the image");
	eprintln!(" info\t\t\tprints the image's superblock");
	eprintln!(" ls <path>\t\tlists the entries of a directory");
	eprintln!(" mkdir <path>\t\tcreates a directory");
	eprintln!(" create <path>\t\tcreates an empty file");
	eprintln!(" write <path> <data> [offset]");
	eprintln!("\t\t\twrites data into a file");
	eprintln!(" cat <path> [size [offset]]");
	eprintln!("\t\t\tprints the content of a file");
	eprintln!(" stat <path>\t\tprints the attributes of a file");
	eprintln!();
	eprintln!("The image defaults to `{DEFAULT_IMAGE}` in the current directory.");
}

/// Writes an error to stderr, then exits.
fn error<M: fmt::Display>(msg: M) -> ! {
	eprintln!("tinyfs: error: {msg}");
	exit(1);
}

/// Mounts the image at `path`, formatting it if it does not exist.
fn mount(path: &Path) -> TinyFs {
	TinyFs::mount(path).unwrap_or_else(|e| {
		error(format_args!("{}: {e}", path.display()));
	})
}

/// Parses a numeric operand.
fn parse_number(arg: &OsString) -> u64 {
	arg.to_str()
		.and_then(|s| s.parse().ok())
		.unwrap_or_else(|| {
			error(format_args!("invalid number `{}`", arg.to_string_lossy()));
		})
}

fn main() {
	let args = parse_args();
	if args.help {
		print_usage();
		exit(0);
	}
	let Some(cmd) = args.command.first().and_then(|c| c.to_str()) else {
		print_usage();
		exit(1);
	};
	let image = args.image.clone().unwrap_or_else(|| PathBuf::from(DEFAULT_IMAGE));
	let operands = &args.command[1..];

	match cmd {
		"mkfs" => {
			let fs = TinyFs::format(&image).unwrap_or_else(|e| {
				error(format_args!("{}: {e}", image.display()));
			});
			let sb = fs.superblock();
			println!(
				"{}: {} inodes, {} data blocks of {} bytes",
				image.display(),
				sb.max_inum,
				sb.max_dnum.min(sb.max_dblks),
				BLOCK_SIZE
			);
		}
		"info" => {
			let fs = mount(&image);
			let sb = fs.superblock();
			println!("magic:\t\t\t{:#x}", sb.magic);
			println!("max inodes:\t\t{}", sb.max_inum);
			println!("max data blocks:\t{}", sb.max_dnum);
			println!("inode bitmap block:\t{}", sb.i_bitmap_blk);
			println!("data bitmap block:\t{}", sb.d_bitmap_blk);
			println!("inode region start:\t{}", sb.i_start_blk);
			println!("data region start:\t{}", sb.d_start_blk);
			println!("inodes per block:\t{}", sb.inodes_per_blk);
			println!("dirents per block:\t{}", sb.dirents_per_blk);
			println!("usable data blocks:\t{}", sb.max_dblks);
		}
		"ls" => {
			let [path] = operands else {
				error("ls: specify a path");
			};
			let mut fs = mount(&image);
			let res = fs.read_directory(Path::new(path), &mut |name| {
				println!("{}", name.to_string_lossy());
			});
			if let Err(e) = res {
				error(format_args!("{}: {e}", path.to_string_lossy()));
			}
		}
		"mkdir" => {
			let [path] = operands else {
				error("mkdir: specify a path");
			};
			let mut fs = mount(&image);
			if let Err(e) = fs.make_directory(Path::new(path), 0o755) {
				error(format_args!("{}: {e}", path.to_string_lossy()));
			}
		}
		"create" => {
			let [path] = operands else {
				error("create: specify a path");
			};
			let mut fs = mount(&image);
			if let Err(e) = fs.create_file(Path::new(path), 0o644) {
				error(format_args!("{}: {e}", path.to_string_lossy()));
			}
		}
		"write" => {
			let (path, data, offset) = match operands {
				[path, data] => (path, data, 0),
				[path, data, offset] => (path, data, parse_number(offset)),
				_ => error("write: specify a path and data"),
			};
			let mut fs = mount(&image);
			let n = fs
				.write_file(Path::new(path), data.as_bytes(), offset)
				.unwrap_or_else(|e| {
					error(format_args!("{}: {e}", path.to_string_lossy()));
				});
			println!("{n} bytes written");
		}
		"cat" => {
			let (path, size, offset) = match operands {
				[path] => (path, None, 0),
				[path, size] => (path, Some(parse_number(size)), 0),
				[path, size, offset] => {
					(path, Some(parse_number(size)), parse_number(offset))
				}
				_ => error("cat: specify a path"),
			};
			let mut fs = mount(&image);
			let size = match size {
				Some(size) => size,
				None => {
					let stat = fs.get_attributes(Path::new(path)).unwrap_or_else(|e| {
						error(format_args!("{}: {e}", path.to_string_lossy()));
					});
					stat.size.min(MAX_FILE_SIZE)
				}
			};
			let mut buf = vec![0; size as usize];
			let n = fs
				.read_file(Path::new(path), &mut buf, offset)
				.unwrap_or_else(|e| {
					error(format_args!("{}: {e}", path.to_string_lossy()));
				});
			io::stdout().write_all(&buf[..n]).unwrap_or_else(|e| {
				error(e);
			});
		}
		"stat" => {
			let [path] = operands else {
				error("stat: specify a path");
			};
			let mut fs = mount(&image);
			let stat = fs.get_attributes(Path::new(path)).unwrap_or_else(|e| {
				error(format_args!("{}: {e}", path.to_string_lossy()));
			});
			let kind = if stat.mode & libc::S_IFMT == libc::S_IFDIR {
				"directory"
			} else {
				"regular file"
			};
			println!("type:\t{kind}");
			println!("mode:\t{:o}", stat.mode & 0o777);
			println!("uid:\t{}", stat.uid);
			println!("gid:\t{}", stat.gid);
			println!("links:\t{}", stat.nlink);
			println!("size:\t{}", stat.size);
			println!("atime:\t{}", stat.atime);
			println!("mtime:\t{}", stat.mtime);
		}
		_ => {
			print_usage();
			exit(1);
		}
	}
}
