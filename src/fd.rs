//! The file-descriptor table: a fixed-size, runtime-only pool of open-file
//! handles. Never persisted across unmount/mount.

use crate::error::{FsError, Result};
use crate::layout::FD_COUNT;

/// Which pointer tier a descriptor's cursor currently addresses.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Usage {
    Direct,
    Indirect,
    DoubleIndirect,
}

impl Usage {
    pub fn tier_cap(self) -> u32 {
        match self {
            Self::Direct => crate::layout::DIRECT_COUNT as u32,
            Self::Indirect | Self::DoubleIndirect => crate::layout::PTRS_PER_INDEX_BLOCK as u32,
        }
    }

    fn promote(self) -> Option<Self> {
        match self {
            Self::Direct => Some(Self::Indirect),
            Self::Indirect => Some(Self::DoubleIndirect),
            Self::DoubleIndirect => None,
        }
    }
}

/// One open-file handle: which inode it refers to, and where its cursor
/// currently sits within that inode's pointer tiers.
#[derive(Clone, Copy, Debug)]
pub struct FdRecord {
    pub inode_num: u8,
    pub usage: Usage,
    pub locate_order: u32,
    pub locate_offset: u16,
}

impl FdRecord {
    fn fresh(inode_num: u8) -> Self {
        Self {
            inode_num,
            usage: Usage::Direct,
            locate_order: 0,
            locate_offset: 0,
        }
    }

    /// Advances `locate_offset` by `n` bytes, where `n` must not carry the
    /// cursor past the end of its current block. Promotes `usage`/
    /// `locate_order` across tier boundaries when the block fills exactly.
    pub fn advance_by(&mut self, n: usize) {
        self.locate_offset += n as u16;
        if self.locate_offset as usize == crate::layout::BLOCK_SIZE {
            self.locate_offset = 0;
            self.locate_order += 1;
            if self.locate_order == self.usage.tier_cap() {
                if let Some(next) = self.usage.promote() {
                    self.usage = next;
                    self.locate_order = 0;
                }
            }
        }
    }

    /// Byte position within the file, per the usage/locate_order/
    /// locate_offset tier formulas.
    pub fn byte_position(&self) -> u64 {
        let base_blocks: u64 = match self.usage {
            Usage::Direct => self.locate_order as u64,
            Usage::Indirect => crate::layout::DIRECT_COUNT as u64 + self.locate_order as u64,
            Usage::DoubleIndirect => {
                crate::layout::DIRECT_COUNT as u64
                    + crate::layout::PTRS_PER_INDEX_BLOCK as u64
                    + self.locate_order as u64
            }
        };
        base_blocks * crate::layout::BLOCK_SIZE as u64 + self.locate_offset as u64
    }
}

/// Fixed-size pool of `FD_COUNT` descriptor slots, identical in shape to
/// [`crate::inode::InodeTable`] but held entirely in memory.
pub struct FdTable {
    slots: Vec<Option<FdRecord>>,
}

impl FdTable {
    pub fn new() -> Self {
        Self {
            slots: vec![None; FD_COUNT],
        }
    }

    /// Allocates the lowest-indexed free slot for a freshly opened inode.
    pub fn open(&mut self, inode_num: u8) -> Result<usize> {
        let slot = self
            .slots
            .iter()
            .position(|s| s.is_none())
            .ok_or(FsError::OutOfDescriptors)?;
        self.slots[slot] = Some(FdRecord::fresh(inode_num));
        Ok(slot)
    }

    /// Releases `fd`. Errors if it is not currently in use.
    pub fn close(&mut self, fd: usize) -> Result<()> {
        let slot = self
            .slots
            .get_mut(fd)
            .ok_or(FsError::InvalidArgument("descriptor out of range"))?;
        if slot.take().is_none() {
            return Err(FsError::InvalidArgument("descriptor not open"));
        }
        Ok(())
    }

    pub fn get(&self, fd: usize) -> Result<&FdRecord> {
        self.slots
            .get(fd)
            .and_then(|s| s.as_ref())
            .ok_or(FsError::InvalidArgument("descriptor not open"))
    }

    pub fn get_mut(&mut self, fd: usize) -> Result<&mut FdRecord> {
        self.slots
            .get_mut(fd)
            .and_then(|s| s.as_mut())
            .ok_or(FsError::InvalidArgument("descriptor not open"))
    }

    /// Severs every open descriptor pointing at `inode_num` (used by
    /// `remove`): future use of those descriptors reports an error.
    pub fn sever(&mut self, inode_num: u8) {
        for slot in self.slots.iter_mut() {
            if slot.is_some_and(|r| r.inode_num == inode_num) {
                *slot = None;
            }
        }
    }
}

impl Default for FdTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_allocates_lowest_free_slot() {
        let mut table = FdTable::new();
        let a = table.open(3).unwrap();
        let b = table.open(4).unwrap();
        assert_eq!(a, 0);
        assert_eq!(b, 1);
        table.close(a).unwrap();
        let c = table.open(5).unwrap();
        assert_eq!(c, 0);
    }

    #[test]
    fn close_on_unopened_slot_errors() {
        let mut table = FdTable::new();
        assert!(table.close(0).is_err());
    }

    #[test]
    fn advance_promotes_across_tiers() {
        let mut rec = FdRecord::fresh(0);
        rec.locate_order = 5;
        rec.locate_offset = crate::layout::BLOCK_SIZE as u16 - 1;
        rec.advance_by(1);
        assert_eq!(rec.usage, Usage::Indirect);
        assert_eq!(rec.locate_order, 0);
        assert_eq!(rec.locate_offset, 0);
    }

    #[test]
    fn byte_position_matches_tier_formulas() {
        let mut rec = FdRecord::fresh(0);
        rec.usage = Usage::Indirect;
        rec.locate_order = 3;
        rec.locate_offset = 10;
        let expected = (6 + 3) * crate::layout::BLOCK_SIZE as u64 + 10;
        assert_eq!(rec.byte_position(), expected);
    }

    #[test]
    fn sever_closes_every_descriptor_on_that_inode() {
        let mut table = FdTable::new();
        let a = table.open(7).unwrap();
        let b = table.open(9).unwrap();
        table.sever(7);
        assert!(table.get(a).is_err());
        assert!(table.get(b).is_ok());
    }

    #[test]
    fn out_of_descriptors_once_all_taken() {
        let mut table = FdTable::new();
        for _ in 0..FD_COUNT {
            table.open(0).unwrap();
        }
        assert!(matches!(table.open(0), Err(FsError::OutOfDescriptors)));
    }
}
