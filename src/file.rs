//! Open, close, seek, read, write: the cursor state machine over the
//! extent mapper and the path resolver.

use crate::device::BlockDevice;
use crate::extent;
use crate::fd::{FdTable, Usage};
use crate::inode::{FileType, InodeTable};
use crate::layout::{BLOCK_SIZE, DIRECT_COUNT, DOUBLE_INDIRECT_LIMIT, PTRS_PER_INDEX_BLOCK};
use crate::path::{resolve, Resolution};
use crate::error::{FsError, Result};

/// The three reference points `seek` accepts.
#[derive(Clone, Copy, Debug)]
pub enum SeekWhence {
    Set,
    Cur,
    End,
}

/// Decomposes an absolute byte position into `(usage, locate_order,
/// locate_offset)`. Errors once the position runs past what the
/// three-tier pointer scheme can address.
fn decompose(pos: u64) -> Result<(Usage, u32, u16)> {
    let blk = pos / BLOCK_SIZE as u64;
    let off = (pos % BLOCK_SIZE as u64) as u16;
    let direct_limit = DIRECT_COUNT as u64;
    let indirect_limit = direct_limit + PTRS_PER_INDEX_BLOCK as u64;
    if blk < direct_limit {
        Ok((Usage::Direct, blk as u32, off))
    } else if blk < indirect_limit {
        Ok((Usage::Indirect, (blk - direct_limit) as u32, off))
    } else if blk < DOUBLE_INDIRECT_LIMIT {
        Ok((Usage::DoubleIndirect, (blk - indirect_limit) as u32, off))
    } else {
        Err(FsError::OutOfRange)
    }
}

/// Opens `path` for reading and writing. Fails if the path does not
/// resolve or names a directory.
pub fn open(device: &mut BlockDevice, fds: &mut FdTable, path: &str) -> Result<usize> {
    match resolve(device, path)? {
        Resolution::Found { child_inode_id, .. } => {
            let inode = InodeTable::read(device, child_inode_id)?;
            if inode.file_type == FileType::Directory {
                return Err(FsError::IsADirectory);
            }
            fds.open(child_inode_id)
        }
        _ => Err(FsError::NotFound),
    }
}

/// Releases `fd`.
pub fn close(fds: &mut FdTable, fd: usize) -> Result<()> {
    fds.close(fd)
}

/// Moves `fd`'s cursor and returns the new absolute byte position.
pub fn seek(
    device: &mut BlockDevice,
    fds: &mut FdTable,
    fd: usize,
    offset: i64,
    whence: SeekWhence,
) -> Result<u64> {
    let rec = *fds.get(fd)?;
    let inode = InodeTable::read(device, rec.inode_num)?;
    let current = rec.byte_position() as i64;

    let new_pos = match whence {
        SeekWhence::Set => offset.max(0),
        SeekWhence::Cur => (current + offset).max(0),
        SeekWhence::End => {
            let end = inode.file_size as i64;
            (end + offset).clamp(0, end)
        }
    } as u64;

    let (usage, locate_order, locate_offset) = decompose(new_pos)?;
    let rec = fds.get_mut(fd)?;
    rec.usage = usage;
    rec.locate_order = locate_order;
    rec.locate_offset = locate_offset;
    Ok(new_pos)
}

/// Reads up to `dst.len()` bytes from `fd`'s cursor. Returns the number of
/// bytes actually read, short of `dst.len()` at EOF.
pub fn read(device: &mut BlockDevice, fds: &mut FdTable, fd: usize, dst: &mut [u8]) -> Result<usize> {
    let mut rec = *fds.get(fd)?;
    let mut inode = InodeTable::read(device, rec.inode_num)?;

    let mut done = 0usize;
    while done < dst.len() {
        let pos = rec.byte_position();
        if pos >= inode.file_size {
            break;
        }
        let block_id = extent::locate(device, &mut inode, rec.usage, rec.locate_order)?;
        let mut block = [0u8; BLOCK_SIZE];
        device.read_block(block_id, &mut block)?;

        let in_block = rec.locate_offset as usize;
        let avail_in_block = BLOCK_SIZE - in_block;
        let avail_in_file = (inode.file_size - pos) as usize;
        let want = dst.len() - done;
        let take = want.min(avail_in_block).min(avail_in_file);
        if take == 0 {
            break;
        }
        dst[done..done + take].copy_from_slice(&block[in_block..in_block + take]);
        done += take;
        rec.advance_by(take);
    }

    *fds.get_mut(fd)? = rec;
    Ok(done)
}

/// Writes `src` at `fd`'s cursor, allocating blocks lazily. Returns the
/// number of bytes actually written: short of `src.len()` only if the
/// device runs out of blocks mid-write, in which case the inode and
/// descriptor reflect exactly the bytes that made it.
pub fn write(device: &mut BlockDevice, fds: &mut FdTable, fd: usize, src: &[u8]) -> Result<usize> {
    let mut rec = *fds.get(fd)?;
    let mut inode = InodeTable::read(device, rec.inode_num)?;

    let mut done = 0usize;
    while done < src.len() {
        let pos = rec.byte_position();
        let block_id = match extent::locate_or_allocate(device, &mut inode, rec.usage, rec.locate_order) {
            Ok(id) => id,
            Err(FsError::OutOfBlocks) => break,
            Err(e) => return Err(e),
        };
        let mut block = [0u8; BLOCK_SIZE];
        device.read_block(block_id, &mut block)?;

        let in_block = rec.locate_offset as usize;
        let take = (src.len() - done).min(BLOCK_SIZE - in_block);
        block[in_block..in_block + take].copy_from_slice(&src[done..done + take]);
        device.write_block(block_id, &block)?;

        done += take;
        rec.advance_by(take);
        inode.file_size = inode.file_size.max(pos + take as u64);
    }

    InodeTable::write(device, &inode)?;
    *fds.get_mut(fd)? = rec;
    Ok(done)
}
