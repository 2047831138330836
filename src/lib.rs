//! A user-space, single-volume, inode-based file system over a fixed-size
//! block-addressed container file.
//!
//! [`FileSystem`] is the single entry point: `format`/`mount`/`unmount` to
//! bring a container up and down, then `open`/`read`/`write`/`seek`/
//! `close` for file I/O and `create`/`list`/`move_entry`/`remove`/`link`
//! for the directory tree.

pub mod bitmap;
pub mod device;
pub mod dir;
pub mod dirblock;
pub mod error;
pub mod extent;
pub mod fd;
pub mod file;
pub mod fs;
pub mod inode;
pub mod layout;
pub mod path;

pub use error::{FsError, Result};
pub use file::SeekWhence;
pub use fs::FileSystem;
pub use inode::FileType;
