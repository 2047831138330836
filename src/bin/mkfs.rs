//! The `mkfs` tool creates a file system on a container file.

use std::env;
use std::fs::OpenOptions;
use std::io::{self, BufRead, Read, Seek, SeekFrom, Write};
use std::path::PathBuf;
use std::process::exit;

use userfs::layout::{INODE_TABLE_BASE, MAGIC};
use userfs::FileSystem;

/// Structure storing command line arguments.
#[derive(Default)]
struct Args {
    /// The name of the current program used in command line.
    prog: String,
    /// If true, print command line help.
    help: bool,
    /// The path to the container file on which the file system will be created.
    device_path: Option<PathBuf>,
}

fn parse_args() -> Args {
    let mut args: Args = Default::default();
    let mut iter = env::args();

    args.prog = iter.next().unwrap_or("mkfs".to_owned());

    for arg in iter {
        match arg.as_str() {
            "-h" | "--help" => args.help = true,
            _ => args.device_path = Some(PathBuf::from(arg)),
        }
    }

    args
}

fn print_help(prog: &str) {
    println!("usage: {prog} <path>");
    println!("creates a user-space inode file system on <path>");
}

/// Probes whether `path` already holds a formatted container, by checking
/// the magic this tool stamps into the root inode's reserved bytes at
/// format time. There is no separate superblock to check instead.
fn is_present(path: &PathBuf) -> io::Result<bool> {
    let mut file = match OpenOptions::new().read(true).open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e),
    };
    let mut magic = [0u8; MAGIC.len()];
    // The root inode (slot 0) lives at the first 64 bytes of the inode
    // table; `owner` starts right after `vacant_file`, at byte offset 4.
    file.seek(SeekFrom::Start((INODE_TABLE_BASE + 4) as u64))?;
    match file.read_exact(&mut magic) {
        Ok(()) => Ok(magic == MAGIC),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(false),
        Err(e) => Err(e),
    }
}

fn confirm(text: &str) -> bool {
    print!("{text}");
    let _ = io::stdout().flush();
    io::stdin()
        .lock()
        .lines()
        .next()
        .and_then(|line| line.ok())
        .map(|s| s.trim().eq_ignore_ascii_case("y"))
        .unwrap_or(false)
}

fn main() {
    let args = parse_args();
    if args.help {
        print_help(&args.prog);
        return;
    }

    let device_path = args.device_path.unwrap_or_else(|| {
        eprintln!("{}: specify path to a container file", args.prog);
        exit(1);
    });

    let already_present = is_present(&device_path).unwrap_or_else(|e| {
        eprintln!("{}: {}: {}", args.prog, device_path.display(), e);
        exit(1);
    });
    if already_present {
        println!("{} already contains a user-space inode file system", device_path.display());
        if !confirm("Proceed anyway? (y/N) ") {
            eprintln!("Abort.");
            exit(1);
        }
    }

    FileSystem::format(&device_path).unwrap_or_else(|e| {
        eprintln!("{}: failed to create filesystem: {}", args.prog, e);
        exit(1);
    });
}
