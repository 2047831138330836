//! The block device: a flat, block-addressed container file with a
//! free-block bitmap overlaid on its first two blocks.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::bitmap::Bitmap;
use crate::error::{FsError, Result};
use crate::layout::*;

/// One block's worth of bytes.
pub type Block = [u8; BLOCK_SIZE];

/// A fixed array of `BLOCK_COUNT` blocks backed by a host file, with a
/// free-block bitmap overlaid on blocks 0-1.
///
/// Block ids `0..FIRST_DATA_BLOCK` are the file-system's own metadata
/// (the FBM overlay and the inode table) and are permanently marked used.
/// Block ids `>= RESERVED_TAIL_START` are never addressable at all (see
/// `SPEC_FULL.md` §9, Open Question 1): they back the inode bitmap instead
/// of tracking individual blocks.
pub struct BlockDevice {
    file: File,
    /// In-memory mirror of blocks 0-1, kept write-through with the file.
    fbm_region: Vec<u8>,
}

impl BlockDevice {
    fn byte_offset(block_id: u16) -> u64 {
        block_id as u64 * BLOCK_SIZE as u64
    }

    fn check_addressable(block_id: u16) -> Result<()> {
        if (block_id as usize) >= FBM_TRACKED_BITS {
            return Err(FsError::OutOfRange);
        }
        Ok(())
    }

    pub(crate) fn flush_fbm_region(&mut self) -> Result<()> {
        self.file.seek(SeekFrom::Start(0))?;
        self.file.write_all(&self.fbm_region)?;
        Ok(())
    }

    /// Creates a fresh, zeroed container at `path` and reserves the metadata
    /// blocks (the FBM overlay, the inode table, and the sacrificed tail).
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        file.set_len((BLOCK_COUNT * BLOCK_SIZE) as u64)?;

        let mut dev = Self {
            file,
            fbm_region: vec![0u8; FBM_REGION_BYTES],
        };

        {
            let mut fbm = dev.fbm();
            for id in 0..FIRST_DATA_BLOCK {
                fbm.set(id as usize);
            }
        }
        dev.flush_fbm_region()?;
        Ok(dev)
    }

    /// Opens an existing container, re-attaching the bitmap overlay from the
    /// bytes already on disk.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut file = OpenOptions::new().read(true).write(true).open(path)?;
        let mut fbm_region = vec![0u8; FBM_REGION_BYTES];
        file.seek(SeekFrom::Start(0))?;
        file.read_exact(&mut fbm_region)?;
        Ok(Self { file, fbm_region })
    }

    /// Overlay of the free-block bitmap, addressing `FBM_TRACKED_BITS`
    /// blocks.
    pub fn fbm(&mut self) -> Bitmap<'_> {
        let tracked_bytes = FBM_TRACKED_BITS / 8;
        Bitmap::overlay(FBM_TRACKED_BITS, &mut self.fbm_region[..tracked_bytes])
    }

    /// Overlay of the inode-allocation bitmap, sub-overlaid on the final
    /// `INODE_BITMAP_BYTES` of the FBM region.
    pub fn inode_bitmap(&mut self) -> Bitmap<'_> {
        let tracked_bytes = FBM_TRACKED_BITS / 8;
        Bitmap::overlay(INODE_COUNT, &mut self.fbm_region[tracked_bytes..])
    }

    /// Returns the lowest-indexed free block, marks it used, and returns its
    /// id.
    pub fn allocate(&mut self) -> Result<u16> {
        let bit = self.fbm().find_first_zero().ok_or(FsError::OutOfBlocks)?;
        self.fbm().set(bit);
        self.flush_fbm_region()?;
        Ok(bit as u16)
    }

    /// Marks a specific block used. Fails if it is already used or out of
    /// the addressable range.
    pub fn request(&mut self, block_id: u16) -> Result<()> {
        Self::check_addressable(block_id)?;
        let mut fbm = self.fbm();
        if fbm.test(block_id as usize) {
            return Err(FsError::IoError("block already in use"));
        }
        fbm.set(block_id as usize);
        self.flush_fbm_region()?;
        Ok(())
    }

    /// Clears the bit for `block_id`. Contents are not zeroed.
    pub fn release(&mut self, block_id: u16) {
        if Self::check_addressable(block_id).is_err() {
            return;
        }
        self.fbm().clear(block_id as usize);
        let _ = self.flush_fbm_region();
    }

    /// Reads one block's worth of bytes. Fails if `block_id` is out of
    /// range or unallocated.
    pub fn read_block(&mut self, block_id: u16, buf: &mut Block) -> Result<()> {
        Self::check_addressable(block_id)
            .map_err(|_| FsError::IoError("out-of-range block id"))?;
        if !self.fbm().test(block_id as usize) {
            return Err(FsError::IoError("read of unallocated block"));
        }
        self.file.seek(SeekFrom::Start(Self::byte_offset(block_id)))?;
        self.file.read_exact(buf)?;
        Ok(())
    }

    /// Writes one block's worth of bytes. Fails if `block_id` is out of
    /// range or unallocated.
    pub fn write_block(&mut self, block_id: u16, buf: &Block) -> Result<()> {
        Self::check_addressable(block_id)
            .map_err(|_| FsError::IoError("out-of-range block id"))?;
        if !self.fbm().test(block_id as usize) {
            return Err(FsError::IoError("write to unallocated block"));
        }
        self.file.seek(SeekFrom::Start(Self::byte_offset(block_id)))?;
        self.file.write_all(buf)?;
        Ok(())
    }

    /// Reads `buf.len()` bytes starting at container byte offset `offset`,
    /// bypassing the allocation check. Used only for the permanently
    /// reserved metadata region (the inode table).
    pub fn read_raw_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<()> {
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.read_exact(buf)?;
        Ok(())
    }

    /// Writes `buf` starting at container byte offset `offset`, bypassing
    /// the allocation check.
    pub fn write_raw_at(&mut self, offset: u64, buf: &[u8]) -> Result<()> {
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(buf)?;
        Ok(())
    }

    /// Number of blocks currently marked used.
    pub fn used_count(&mut self) -> usize {
        self.fbm().popcount()
    }

    /// Number of blocks currently free.
    pub fn free_count(&mut self) -> usize {
        self.fbm().capacity_bits() - self.used_count()
    }

    /// Total number of addressable blocks (`FBM_TRACKED_BITS`, not
    /// `BLOCK_COUNT`: see Open Question 1).
    pub fn total_count(&self) -> usize {
        FBM_TRACKED_BITS
    }

    /// Flushes the bitmap overlay and the underlying file to the host.
    pub fn flush(&mut self) -> Result<()> {
        self.flush_fbm_region()?;
        self.file.flush()?;
        Ok(())
    }

    /// Writes the whole container to `path`, byte for byte.
    pub fn serialize(&mut self, path: impl AsRef<Path>) -> Result<()> {
        self.flush()?;
        self.file.seek(SeekFrom::Start(0))?;
        let mut out = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        std::io::copy(&mut self.file, &mut out)?;
        Ok(())
    }

    /// Loads a container previously written by [`Self::serialize`].
    pub fn deserialize(path: impl AsRef<Path>) -> Result<Self> {
        Self::open(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn create_reserves_metadata_blocks() {
        let tmp = NamedTempFile::new().unwrap();
        let mut dev = BlockDevice::create(tmp.path()).unwrap();
        for id in 0..FIRST_DATA_BLOCK {
            assert!(dev.fbm().test(id as usize));
        }
        assert!(!dev.fbm().test(FIRST_DATA_BLOCK as usize));
    }

    #[test]
    fn allocate_then_read_write_roundtrip() {
        let tmp = NamedTempFile::new().unwrap();
        let mut dev = BlockDevice::create(tmp.path()).unwrap();
        let id = dev.allocate().unwrap();
        let mut data = [0u8; BLOCK_SIZE];
        data[0] = 0xAB;
        dev.write_block(id, &data).unwrap();
        let mut readback = [0u8; BLOCK_SIZE];
        dev.read_block(id, &mut readback).unwrap();
        assert_eq!(data, readback);
    }

    #[test]
    fn read_of_unallocated_block_is_an_error() {
        let tmp = NamedTempFile::new().unwrap();
        let mut dev = BlockDevice::create(tmp.path()).unwrap();
        let mut buf = [0u8; BLOCK_SIZE];
        assert!(dev.read_block(FIRST_DATA_BLOCK, &mut buf).is_err());
    }

    #[test]
    fn release_then_reallocate_reuses_block() {
        let tmp = NamedTempFile::new().unwrap();
        let mut dev = BlockDevice::create(tmp.path()).unwrap();
        let id = dev.allocate().unwrap();
        dev.release(id);
        let id2 = dev.allocate().unwrap();
        assert_eq!(id, id2);
    }

    #[test]
    fn out_of_space_is_reported() {
        let tmp = NamedTempFile::new().unwrap();
        let mut dev = BlockDevice::create(tmp.path()).unwrap();
        let mut count = 0;
        while dev.allocate().is_ok() {
            count += 1;
        }
        assert_eq!(count, FBM_TRACKED_BITS - FIRST_DATA_BLOCK as usize);
    }

    #[test]
    fn mount_sees_same_allocation_state() {
        let tmp = NamedTempFile::new().unwrap();
        let id = {
            let mut dev = BlockDevice::create(tmp.path()).unwrap();
            let id = dev.allocate().unwrap();
            dev.flush().unwrap();
            id
        };
        let mut dev2 = BlockDevice::open(tmp.path()).unwrap();
        assert!(dev2.fbm().test(id as usize));
    }
}
