//! On-disk shape of a directory block, shared by the path resolver (C5) and
//! the directory operations (C8): an ordered array of 31 fixed-width
//! entries, `{name[127], inode_number}`.

use std::mem::size_of;
use std::slice;

use crate::device::BlockDevice;
use crate::error::{FsError, Result};
use crate::inode::Inode;
use crate::layout::*;

#[repr(C, packed)]
struct RawEntry {
    name: [u8; FNAME_MAX],
    inode_number: u8,
}

const _: () = assert!(size_of::<RawEntry>() == DIR_ENTRY_SIZE);

/// A decoded directory entry: a nul-terminated name and the inode slot it
/// points at.
#[derive(Clone, Debug)]
pub struct DirEntry {
    pub name: String,
    pub inode_number: u8,
}

/// The full contents of a directory's one data block, parsed into its 31
/// entry slots.
pub struct DirBlock {
    raw: [u8; BLOCK_SIZE],
}

impl DirBlock {
    fn empty() -> Self {
        Self {
            raw: [0u8; BLOCK_SIZE],
        }
    }

    fn entry_at(&self, slot: usize) -> RawEntry {
        let start = slot * DIR_ENTRY_SIZE;
        let mut raw: RawEntry = unsafe { std::mem::zeroed() };
        let dst = unsafe { slice::from_raw_parts_mut(&mut raw as *mut _ as *mut u8, DIR_ENTRY_SIZE) };
        dst.copy_from_slice(&self.raw[start..start + DIR_ENTRY_SIZE]);
        raw
    }

    fn set_entry_at(&mut self, slot: usize, entry: &RawEntry) {
        let start = slot * DIR_ENTRY_SIZE;
        let src = unsafe { slice::from_raw_parts(entry as *const _ as *const u8, DIR_ENTRY_SIZE) };
        self.raw[start..start + DIR_ENTRY_SIZE].copy_from_slice(src);
    }

    /// Decodes the name stored at `slot`, stopping at the first nul byte.
    pub fn name_at(&self, slot: usize) -> Result<String> {
        let raw = self.entry_at(slot);
        let end = raw.name.iter().position(|&b| b == 0).unwrap_or(FNAME_MAX);
        String::from_utf8(raw.name[..end].to_vec())
            .map_err(|_| FsError::InvalidArgument("directory entry name is not valid UTF-8"))
    }

    pub fn inode_number_at(&self, slot: usize) -> u8 {
        self.entry_at(slot).inode_number
    }

    pub fn entry(&self, slot: usize) -> Result<DirEntry> {
        Ok(DirEntry {
            name: self.name_at(slot)?,
            inode_number: self.inode_number_at(slot),
        })
    }

    /// Writes `name` and `inode_number` into `slot`.
    pub fn write_entry(&mut self, slot: usize, name: &str, inode_number: u8) -> Result<()> {
        if name.is_empty() || name.len() > FNAME_MAX - 1 || name.contains('/') {
            return Err(FsError::InvalidArgument("invalid directory entry name"));
        }
        let mut raw = RawEntry {
            name: [0u8; FNAME_MAX],
            inode_number,
        };
        raw.name[..name.len()].copy_from_slice(name.as_bytes());
        self.set_entry_at(slot, &raw);
        Ok(())
    }

    /// Clears `slot` back to zero bytes.
    pub fn clear_entry(&mut self, slot: usize) {
        self.set_entry_at(slot, &RawEntry {
            name: [0u8; FNAME_MAX],
            inode_number: 0,
        });
    }
}

/// Reads the directory block belonging to `inode` (always `direct[0]`).
/// Errors if the directory has no block allocated yet.
pub fn read_dir_block(device: &mut BlockDevice, inode: &Inode) -> Result<DirBlock> {
    if inode.direct[0] == 0 {
        return Ok(DirBlock::empty());
    }
    let mut raw = [0u8; BLOCK_SIZE];
    device.read_block(inode.direct[0], &mut raw)?;
    Ok(DirBlock { raw })
}

/// Writes `block` back to `inode`'s directory block, allocating one first
/// if the directory is still empty.
pub fn write_dir_block(device: &mut BlockDevice, inode: &mut Inode, block: &DirBlock) -> Result<()> {
    if inode.direct[0] == 0 {
        inode.direct[0] = device.allocate()?;
    }
    device.write_block(inode.direct[0], &block.raw)
}

/// Finds the slot whose live entry matches `name`, or `None`.
pub fn find_slot(block: &DirBlock, inode: &Inode, name: &str) -> Result<Option<usize>> {
    for slot in 0..DIR_ENTRIES {
        if inode.slot_live(slot) && block.name_at(slot)? == name {
            return Ok(Some(slot));
        }
    }
    Ok(None)
}
