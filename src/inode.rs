//! The inode table: a sub-allocator of fixed-size inode records living in a
//! reserved span of blocks on the device.

use std::mem::size_of;
use std::slice;

use crate::device::BlockDevice;
use crate::error::{FsError, Result};
use crate::layout::*;

/// A file's type, stored as a single byte on disk (`'d'` or `'r'`).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FileType {
    Directory,
    Regular,
}

impl FileType {
    fn to_byte(self) -> u8 {
        match self {
            Self::Directory => b'd',
            Self::Regular => b'r',
        }
    }

    fn from_byte(b: u8) -> Result<Self> {
        match b {
            b'd' => Ok(Self::Directory),
            b'r' => Ok(Self::Regular),
            _ => Err(FsError::InvalidArgument("unknown file type byte")),
        }
    }
}

/// The bit-exact on-disk inode record. `owner` is reserved padding; the
/// format binary stamps a 4-byte magic into its first bytes on the root
/// inode so the CLI can recognize a formatted container without a separate
/// superblock.
#[repr(C, packed)]
struct RawInode {
    vacant_file: u32,
    owner: [u8; 18],
    file_type: u8,
    inode_number: u8,
    file_size: u64,
    link_count: u64,
    direct: [u16; DIRECT_COUNT],
    indirect: u16,
    double_indirect: u16,
    _reserved: [u8; 8],
}

/// In-memory view of an inode record, with `file_type` decoded and the
/// single-element `indirect` array flattened to a plain pointer.
#[derive(Clone, Debug)]
pub struct Inode {
    pub vacant_file: u32,
    pub owner: [u8; 18],
    pub file_type: FileType,
    pub inode_number: u8,
    pub file_size: u64,
    pub link_count: u64,
    pub direct: [u16; DIRECT_COUNT],
    pub indirect: u16,
    pub double_indirect: u16,
}

impl Inode {
    /// A freshly allocated, empty inode of the given type and slot.
    pub fn new(inode_number: u8, file_type: FileType) -> Self {
        Self {
            vacant_file: 0,
            owner: [0; 18],
            file_type,
            inode_number,
            file_size: 0,
            link_count: 1,
            direct: [0; DIRECT_COUNT],
            indirect: 0,
            double_indirect: 0,
        }
    }

    fn to_raw(&self) -> RawInode {
        RawInode {
            vacant_file: self.vacant_file,
            owner: self.owner,
            file_type: self.file_type.to_byte(),
            inode_number: self.inode_number,
            file_size: self.file_size,
            link_count: self.link_count,
            direct: self.direct,
            indirect: self.indirect,
            double_indirect: self.double_indirect,
            _reserved: [0; 8],
        }
    }

    fn from_raw(raw: &RawInode) -> Result<Self> {
        Ok(Self {
            vacant_file: raw.vacant_file,
            owner: raw.owner,
            file_type: FileType::from_byte(raw.file_type)?,
            inode_number: raw.inode_number,
            file_size: raw.file_size,
            link_count: raw.link_count,
            direct: raw.direct,
            indirect: raw.indirect,
            double_indirect: raw.double_indirect,
        })
    }

    fn to_bytes(&self) -> [u8; INODE_SIZE] {
        let raw = self.to_raw();
        let mut bytes = [0u8; INODE_SIZE];
        let slice = unsafe { slice::from_raw_parts(&raw as *const _ as *const u8, size_of::<RawInode>()) };
        bytes.copy_from_slice(slice);
        bytes
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut raw: RawInode = unsafe { std::mem::zeroed() };
        let slice =
            unsafe { slice::from_raw_parts_mut(&mut raw as *mut _ as *mut u8, size_of::<RawInode>()) };
        slice.copy_from_slice(bytes);
        Self::from_raw(&raw)
    }

    /// Returns whether directory slot `slot` is currently live (bit `slot`
    /// of `vacant_file` is set).
    pub fn slot_live(&self, slot: usize) -> bool {
        self.vacant_file & (1 << slot) != 0
    }

    pub fn set_slot(&mut self, slot: usize) {
        self.vacant_file |= 1 << slot;
    }

    pub fn clear_slot(&mut self, slot: usize) {
        self.vacant_file &= !(1 << slot);
    }
}

const _: () = assert!(size_of::<RawInode>() == INODE_SIZE);

/// Sub-allocator of 256 fixed-size inode records within blocks 2-5 of the
/// device.
pub struct InodeTable;

impl InodeTable {
    fn byte_offset(inode_id: u8) -> u64 {
        (INODE_TABLE_BASE + inode_id as usize * INODE_SIZE) as u64
    }

    /// Finds the lowest free inode slot, marks it used, and returns its id.
    pub fn allocate(device: &mut BlockDevice) -> Result<u8> {
        let bit = device
            .inode_bitmap()
            .find_first_zero()
            .ok_or(FsError::OutOfInodes)?;
        device.inode_bitmap().set(bit);
        device.flush_fbm_region()?;
        Ok(bit as u8)
    }

    /// Clears the allocation bit for `inode_id`. Record contents are left
    /// untouched.
    pub fn release(device: &mut BlockDevice, inode_id: u8) {
        device.inode_bitmap().clear(inode_id as usize);
        let _ = device.flush_fbm_region();
    }

    /// Whether `inode_id` is currently allocated.
    pub fn test(device: &mut BlockDevice, inode_id: u8) -> bool {
        device.inode_bitmap().test(inode_id as usize)
    }

    /// Reads the inode record at `inode_id`.
    pub fn read(device: &mut BlockDevice, inode_id: u8) -> Result<Inode> {
        let mut bytes = [0u8; INODE_SIZE];
        device.read_raw_at(Self::byte_offset(inode_id), &mut bytes)?;
        Inode::from_bytes(&bytes)
    }

    /// Writes `inode` back to its slot.
    pub fn write(device: &mut BlockDevice, inode: &Inode) -> Result<()> {
        let bytes = inode.to_bytes();
        device.write_raw_at(Self::byte_offset(inode.inode_number), &bytes)
    }
}
