//! The top-level handle: wires the block device, inode table, descriptor
//! pool, path resolver, extent mapper, and directory operations together,
//! and implements format/mount/unmount.

use std::path::Path;

use crate::device::BlockDevice;
use crate::dirblock::DirEntry;
use crate::error::Result;
use crate::fd::FdTable;
use crate::file::{self, SeekWhence};
use crate::dir;
use crate::inode::{FileType, Inode, InodeTable};
use crate::layout::{MAGIC, ROOT_INODE};

/// The file system's exclusive owner of the device, the inode table, and
/// the descriptor pool. Not shareable: there is exactly one caller at a
/// time, per the single-threaded, cooperative resource model.
pub struct FileSystem {
    device: BlockDevice,
    fds: FdTable,
}

impl FileSystem {
    /// Creates a fresh container at `path`, reserves the metadata regions,
    /// and initializes the root directory at inode 0.
    pub fn format(path: impl AsRef<Path>) -> Result<Self> {
        let device = format_in_place_checked(path)?;
        Ok(Self {
            device,
            fds: FdTable::new(),
        })
    }

    /// Opens an existing container. The descriptor pool starts empty: it
    /// is never persisted across unmount/mount.
    pub fn mount(path: impl AsRef<Path>) -> Result<Self> {
        let device = BlockDevice::open(path)?;
        Ok(Self {
            device,
            fds: FdTable::new(),
        })
    }

    /// Flushes every bitmap and inode write to the backing container.
    pub fn unmount(mut self) -> Result<()> {
        self.device.flush()
    }

    pub fn open(&mut self, path: &str) -> Result<usize> {
        file::open(&mut self.device, &mut self.fds, path)
    }

    pub fn close(&mut self, fd: usize) -> Result<()> {
        file::close(&mut self.fds, fd)
    }

    pub fn seek(&mut self, fd: usize, offset: i64, whence: SeekWhence) -> Result<u64> {
        file::seek(&mut self.device, &mut self.fds, fd, offset, whence)
    }

    pub fn read(&mut self, fd: usize, dst: &mut [u8]) -> Result<usize> {
        file::read(&mut self.device, &mut self.fds, fd, dst)
    }

    pub fn write(&mut self, fd: usize, src: &[u8]) -> Result<usize> {
        file::write(&mut self.device, &mut self.fds, fd, src)
    }

    pub fn create(&mut self, path: &str, file_type: FileType) -> Result<u8> {
        dir::create(&mut self.device, path, file_type)
    }

    pub fn list(&mut self, path: &str) -> Result<Vec<DirEntry>> {
        dir::list(&mut self.device, path)
    }

    pub fn move_entry(&mut self, src: &str, dst: &str) -> Result<()> {
        dir::move_entry(&mut self.device, src, dst)
    }

    pub fn remove(&mut self, path: &str) -> Result<()> {
        dir::remove(&mut self.device, &mut self.fds, path)
    }

    pub fn link(&mut self, src: &str, dst: &str) -> Result<()> {
        dir::link(&mut self.device, src, dst)
    }

    pub fn used_block_count(&mut self) -> usize {
        self.device.used_count()
    }

    pub fn free_block_count(&mut self) -> usize {
        self.device.free_count()
    }

    pub fn total_block_count(&self) -> usize {
        self.device.total_count()
    }

    /// Writes the whole container to `path`, byte for byte.
    pub fn serialize(&mut self, path: impl AsRef<Path>) -> Result<()> {
        self.device.serialize(path)
    }

    /// Loads a container previously written by [`Self::serialize`].
    pub fn deserialize(path: impl AsRef<Path>) -> Result<Self> {
        let device = BlockDevice::deserialize(path)?;
        Ok(Self {
            device,
            fds: FdTable::new(),
        })
    }
}

fn format_in_place_checked(path: impl AsRef<Path>) -> Result<BlockDevice> {
    let mut device = BlockDevice::create(path)?;
    let root_id = InodeTable::allocate(&mut device)?;
    debug_assert_eq!(root_id, ROOT_INODE, "root must be the first inode slot handed out");

    let mut root = Inode::new(ROOT_INODE, FileType::Directory);
    root.owner[..MAGIC.len()].copy_from_slice(&MAGIC);
    InodeTable::write(&mut device, &root)?;

    Ok(device)
}

/// Test-only shortcut: format a container and hand back the bare device,
/// skipping the `FileSystem` wrapper, for modules whose tests want to
/// drive `BlockDevice` and `FdTable` directly.
#[cfg(test)]
pub(crate) fn format_in_place(path: impl AsRef<Path>) -> BlockDevice {
    format_in_place_checked(path).expect("format should not fail in tests")
}
