//! Translates a cursor position (tier, index within that tier) to a block
//! id, walking the direct / indirect / double-indirect pointers and
//! allocating lazily on the write path.

use std::mem::size_of;
use std::slice;

use crate::device::BlockDevice;
use crate::error::{FsError, Result};
use crate::fd::Usage;
use crate::inode::Inode;
use crate::layout::*;

type IndexBlock = [u16; PTRS_PER_INDEX_BLOCK];

fn read_index_block(device: &mut BlockDevice, block_id: u16) -> Result<IndexBlock> {
    let mut raw = [0u8; BLOCK_SIZE];
    device.read_block(block_id, &mut raw)?;
    let mut ids: IndexBlock = [0; PTRS_PER_INDEX_BLOCK];
    let dst = unsafe { slice::from_raw_parts_mut(ids.as_mut_ptr() as *mut u8, size_of::<IndexBlock>()) };
    dst.copy_from_slice(&raw);
    Ok(ids)
}

fn write_index_block(device: &mut BlockDevice, block_id: u16, ids: &IndexBlock) -> Result<()> {
    let mut raw = [0u8; BLOCK_SIZE];
    let src = unsafe { slice::from_raw_parts(ids.as_ptr() as *const u8, size_of::<IndexBlock>()) };
    raw[..src.len()].copy_from_slice(src);
    device.write_block(block_id, &raw)
}

/// Allocates a fresh block and zero-fills it on the device (used for newly
/// created index blocks, which must start with every pointer zero).
fn allocate_zeroed(device: &mut BlockDevice) -> Result<u16> {
    let id = device.allocate()?;
    device.write_block(id, &[0u8; BLOCK_SIZE])?;
    Ok(id)
}

/// Looks up the block id addressed by `(usage, locate_order)` within
/// `inode`. On the write path (`allocate = true`), missing pointers
/// (direct slots, index blocks, and the data block itself) are allocated
/// and wired in as needed, mutating `inode`. On the read path, a zero
/// pointer anywhere along the chain is an error: reads never zero-fill.
pub fn locate(
    device: &mut BlockDevice,
    inode: &mut Inode,
    usage: Usage,
    locate_order: u32,
) -> Result<u16> {
    locate_impl(device, inode, usage, locate_order, false)
}

/// Same lookup, but allocates missing blocks lazily instead of failing.
pub fn locate_or_allocate(
    device: &mut BlockDevice,
    inode: &mut Inode,
    usage: Usage,
    locate_order: u32,
) -> Result<u16> {
    locate_impl(device, inode, usage, locate_order, true)
}

fn locate_impl(
    device: &mut BlockDevice,
    inode: &mut Inode,
    usage: Usage,
    locate_order: u32,
    allocate: bool,
) -> Result<u16> {
    match usage {
        Usage::Direct => {
            let slot = locate_order as usize;
            if slot >= DIRECT_COUNT {
                return Err(FsError::OutOfRange);
            }
            if inode.direct[slot] == 0 {
                if !allocate {
                    return Err(FsError::IoError("read through unmapped direct block"));
                }
                inode.direct[slot] = device.allocate()?;
            }
            Ok(inode.direct[slot])
        }
        Usage::Indirect => {
            let index_id = resolve_pointer(device, &mut inode.indirect, allocate, "indirect")?;
            let mut ids = read_index_block(device, index_id)?;
            let slot = locate_order as usize;
            if slot >= PTRS_PER_INDEX_BLOCK {
                return Err(FsError::OutOfRange);
            }
            if ids[slot] == 0 {
                if !allocate {
                    return Err(FsError::IoError("read through unmapped indirect block"));
                }
                ids[slot] = device.allocate()?;
                write_index_block(device, index_id, &ids)?;
            }
            Ok(ids[slot])
        }
        Usage::DoubleIndirect => {
            let outer_id = resolve_pointer(device, &mut inode.double_indirect, allocate, "double indirect")?;
            let mut outer_ids = read_index_block(device, outer_id)?;
            let outer = (locate_order as usize) / PTRS_PER_INDEX_BLOCK;
            let inner = (locate_order as usize) % PTRS_PER_INDEX_BLOCK;
            if outer >= PTRS_PER_INDEX_BLOCK {
                return Err(FsError::OutOfRange);
            }
            let outer_slot_was_empty = outer_ids[outer] == 0;
            let inner_id = resolve_pointer(device, &mut outer_ids[outer], allocate, "double indirect index")?;
            if outer_slot_was_empty {
                write_index_block(device, outer_id, &outer_ids)?;
            }
            let mut inner_ids = read_index_block(device, inner_id)?;
            if inner_ids[inner] == 0 {
                if !allocate {
                    return Err(FsError::IoError("read through unmapped double-indirect block"));
                }
                inner_ids[inner] = device.allocate()?;
                write_index_block(device, inner_id, &inner_ids)?;
            }
            Ok(inner_ids[inner])
        }
    }
}

/// Resolves a pointer slot that may itself need lazy allocation of an
/// index block (zero-initialized before use).
fn resolve_pointer(
    device: &mut BlockDevice,
    slot: &mut u16,
    allocate: bool,
    what: &'static str,
) -> Result<u16> {
    if *slot == 0 {
        if !allocate {
            return Err(FsError::IoError(match what {
                "indirect" => "read through unmapped indirect pointer",
                "double indirect" => "read through unmapped double-indirect pointer",
                _ => "read through unmapped index pointer",
            }));
        }
        *slot = allocate_zeroed(device)?;
    }
    Ok(*slot)
}

/// Walks every block id reachable from `inode` (data blocks and index
/// blocks alike), releasing each one on `device`. Used by `remove`.
pub fn release_all(device: &mut BlockDevice, inode: &Inode) -> Result<()> {
    for &id in &inode.direct {
        if id != 0 {
            device.release(id);
        }
    }
    if inode.indirect != 0 {
        let ids = read_index_block(device, inode.indirect)?;
        for &id in ids.iter() {
            if id != 0 {
                device.release(id);
            }
        }
        device.release(inode.indirect);
    }
    if inode.double_indirect != 0 {
        let outer_ids = read_index_block(device, inode.double_indirect)?;
        for &outer_id in outer_ids.iter() {
            if outer_id == 0 {
                continue;
            }
            let inner_ids = read_index_block(device, outer_id)?;
            for &id in inner_ids.iter() {
                if id != 0 {
                    device.release(id);
                }
            }
            device.release(outer_id);
        }
        device.release(inode.double_indirect);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inode::FileType;
    use tempfile::NamedTempFile;

    #[test]
    fn direct_tier_allocates_lazily() {
        let tmp = NamedTempFile::new().unwrap();
        let mut dev = BlockDevice::create(tmp.path()).unwrap();
        let mut inode = Inode::new(0, FileType::Regular);
        let id = locate_or_allocate(&mut dev, &mut inode, Usage::Direct, 0).unwrap();
        assert_eq!(inode.direct[0], id);
        assert!(id >= FIRST_DATA_BLOCK);
    }

    #[test]
    fn reading_unmapped_direct_block_is_an_error() {
        let tmp = NamedTempFile::new().unwrap();
        let mut dev = BlockDevice::create(tmp.path()).unwrap();
        let mut inode = Inode::new(0, FileType::Regular);
        assert!(locate(&mut dev, &mut inode, Usage::Direct, 0).is_err());
    }

    #[test]
    fn indirect_tier_allocates_index_block_then_data_block() {
        let tmp = NamedTempFile::new().unwrap();
        let mut dev = BlockDevice::create(tmp.path()).unwrap();
        let mut inode = Inode::new(0, FileType::Regular);
        let id = locate_or_allocate(&mut dev, &mut inode, Usage::Indirect, 5).unwrap();
        assert_ne!(inode.indirect, 0);
        assert_ne!(id, 0);
        let same = locate(&mut dev, &mut inode, Usage::Indirect, 5).unwrap();
        assert_eq!(id, same);
    }

    #[test]
    fn double_indirect_tier_allocates_both_index_levels() {
        let tmp = NamedTempFile::new().unwrap();
        let mut dev = BlockDevice::create(tmp.path()).unwrap();
        let mut inode = Inode::new(0, FileType::Regular);
        let id = locate_or_allocate(&mut dev, &mut inode, Usage::DoubleIndirect, 2049).unwrap();
        assert_ne!(inode.double_indirect, 0);
        assert_ne!(id, 0);
        let same = locate(&mut dev, &mut inode, Usage::DoubleIndirect, 2049).unwrap();
        assert_eq!(id, same);
    }

    #[test]
    fn release_all_frees_direct_and_indirect_blocks() {
        let tmp = NamedTempFile::new().unwrap();
        let mut dev = BlockDevice::create(tmp.path()).unwrap();
        let mut inode = Inode::new(0, FileType::Regular);
        locate_or_allocate(&mut dev, &mut inode, Usage::Direct, 0).unwrap();
        locate_or_allocate(&mut dev, &mut inode, Usage::Indirect, 0).unwrap();
        let used_before = dev.used_count();
        release_all(&mut dev, &inode).unwrap();
        assert!(dev.used_count() < used_before);
    }
}
