//! Directory operations: create, list, move, remove, and hard-link, built
//! on the path resolver (C5) and the extent mapper (C6).

use crate::device::BlockDevice;
use crate::dirblock::{find_slot, read_dir_block, write_dir_block, DirEntry};
use crate::error::{FsError, Result};
use crate::extent;
use crate::fd::FdTable;
use crate::inode::{FileType, Inode, InodeTable};
use crate::layout::DIR_ENTRIES;
use crate::path::{resolve, Resolution};

fn first_free_slot(parent: &Inode) -> Result<usize> {
    (0..DIR_ENTRIES)
        .find(|&s| !parent.slot_live(s))
        .ok_or(FsError::DirectoryFull)
}

/// Creates a new regular file or directory at `path`. `path`'s parent must
/// already exist and be a directory; the final component must not already
/// be present.
pub fn create(device: &mut BlockDevice, path: &str, file_type: FileType) -> Result<u8> {
    let (parent_id, name) = match resolve(device, path)? {
        Resolution::Found { .. } => return Err(FsError::AlreadyExists),
        Resolution::ParentOnly { parent_inode_id, final_name } => (parent_inode_id, final_name),
        Resolution::NotFound => return Err(FsError::NotFound),
    };

    let mut parent = InodeTable::read(device, parent_id)?;
    let mut block = read_dir_block(device, &parent)?;
    let slot = first_free_slot(&parent)?;

    let child_id = InodeTable::allocate(device)?;
    let child = Inode::new(child_id, file_type);
    InodeTable::write(device, &child)?;

    block.write_entry(slot, &name, child_id)?;
    parent.set_slot(slot);
    write_dir_block(device, &mut parent, &block)?;
    InodeTable::write(device, &parent)?;

    Ok(child_id)
}

/// Lists the live entries of the directory at `path`.
pub fn list(device: &mut BlockDevice, path: &str) -> Result<Vec<DirEntry>> {
    let inode_id = match resolve(device, path)? {
        Resolution::Found { child_inode_id, .. } => child_inode_id,
        _ => return Err(FsError::NotFound),
    };
    let inode = InodeTable::read(device, inode_id)?;
    if inode.file_type != FileType::Directory {
        return Err(FsError::NotADirectory);
    }
    let block = read_dir_block(device, &inode)?;
    let mut entries = Vec::new();
    for slot in 0..DIR_ENTRIES {
        if inode.slot_live(slot) {
            entries.push(block.entry(slot)?);
        }
    }
    Ok(entries)
}

/// Moves the entry at `src` to `dst`, which must name a not-yet-existing
/// parent-and-name pair. `link_count` is unchanged: one entry in, one out.
pub fn move_entry(device: &mut BlockDevice, src: &str, dst: &str) -> Result<()> {
    let (src_parent_id, src_name, child_id) = match resolve(device, src)? {
        Resolution::Found {
            parent_inode_id,
            child_name,
            child_inode_id,
        } => (parent_inode_id, child_name, child_inode_id),
        _ => return Err(FsError::NotFound),
    };
    let (dst_parent_id, dst_name) = match resolve(device, dst)? {
        Resolution::ParentOnly {
            parent_inode_id,
            final_name,
        } => (parent_inode_id, final_name),
        Resolution::Found { .. } => return Err(FsError::AlreadyExists),
        Resolution::NotFound => return Err(FsError::NotFound),
    };
    if dst_parent_id == child_id {
        return Err(FsError::InvalidArgument("cannot move a directory into itself"));
    }

    let mut dst_parent = InodeTable::read(device, dst_parent_id)?;
    let mut dst_block = read_dir_block(device, &dst_parent)?;
    let dst_slot = first_free_slot(&dst_parent)?;

    let mut src_parent = InodeTable::read(device, src_parent_id)?;
    let mut src_block = read_dir_block(device, &src_parent)?;
    let src_slot = find_slot(&src_block, &src_parent, &src_name)?.ok_or(FsError::NotFound)?;
    src_block.clear_entry(src_slot);
    src_parent.clear_slot(src_slot);
    write_dir_block(device, &mut src_parent, &src_block)?;
    InodeTable::write(device, &src_parent)?;

    dst_block.write_entry(dst_slot, &dst_name, child_id)?;
    dst_parent.set_slot(dst_slot);
    write_dir_block(device, &mut dst_parent, &dst_block)?;
    InodeTable::write(device, &dst_parent)?;

    Ok(())
}

/// Removes the entry at `path`. Directories must be empty. Regular files
/// release every reachable block once `link_count` reaches zero.
pub fn remove(device: &mut BlockDevice, fds: &mut FdTable, path: &str) -> Result<()> {
    let (parent_id, name, child_id) = match resolve(device, path)? {
        Resolution::Found {
            parent_inode_id,
            child_name,
            child_inode_id,
        } => (parent_inode_id, child_name, child_inode_id),
        _ => return Err(FsError::NotFound),
    };

    let mut child = InodeTable::read(device, child_id)?;
    if child.file_type == FileType::Directory && child.vacant_file != 0 {
        return Err(FsError::DirectoryNotEmpty);
    }

    let mut parent = InodeTable::read(device, parent_id)?;
    let mut block = read_dir_block(device, &parent)?;
    let slot = find_slot(&block, &parent, &name)?.ok_or(FsError::NotFound)?;
    block.clear_entry(slot);
    parent.clear_slot(slot);
    write_dir_block(device, &mut parent, &block)?;
    InodeTable::write(device, &parent)?;

    child.link_count = child.link_count.saturating_sub(1);
    if child.link_count == 0 {
        match child.file_type {
            FileType::Regular => extent::release_all(device, &child)?,
            FileType::Directory => {
                if child.direct[0] != 0 {
                    device.release(child.direct[0]);
                }
            }
        }
        InodeTable::release(device, child_id);
        fds.sever(child_id);
    } else {
        InodeTable::write(device, &child)?;
    }

    Ok(())
}

/// Adds a new directory entry at `dst` referencing the same inode as
/// `src`, incrementing its `link_count`.
pub fn link(device: &mut BlockDevice, src: &str, dst: &str) -> Result<()> {
    let src_child_id = match resolve(device, src)? {
        Resolution::Found { child_inode_id, .. } => child_inode_id,
        _ => return Err(FsError::NotFound),
    };
    let (dst_parent_id, dst_name) = match resolve(device, dst)? {
        Resolution::ParentOnly {
            parent_inode_id,
            final_name,
        } => (parent_inode_id, final_name),
        Resolution::Found { .. } => return Err(FsError::AlreadyExists),
        Resolution::NotFound => return Err(FsError::NotFound),
    };

    let mut dst_parent = InodeTable::read(device, dst_parent_id)?;
    let mut dst_block = read_dir_block(device, &dst_parent)?;
    let slot = first_free_slot(&dst_parent)?;

    let mut src_inode = InodeTable::read(device, src_child_id)?;
    src_inode.link_count += 1;
    InodeTable::write(device, &src_inode)?;

    dst_block.write_entry(slot, &dst_name, src_child_id)?;
    dst_parent.set_slot(slot);
    write_dir_block(device, &mut dst_parent, &dst_block)?;
    InodeTable::write(device, &dst_parent)?;

    Ok(())
}
