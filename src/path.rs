//! Parses absolute paths and walks directory inodes to resolve them to
//! inode ids.

use crate::device::BlockDevice;
use crate::dirblock::{find_slot, read_dir_block};
use crate::error::{FsError, Result};
use crate::inode::{FileType, Inode, InodeTable};
use crate::layout::{FNAME_MAX, ROOT_INODE};

/// The outcome of resolving a path.
pub enum Resolution {
    /// An intermediate component did not resolve to a directory entry.
    NotFound,
    /// The full path resolved; `child_inode_id` is the entry named by the
    /// final component.
    Found {
        parent_inode_id: u8,
        child_name: String,
        child_inode_id: u8,
    },
    /// Every component but the last resolved; the final component is free
    /// to be created under `parent_inode_id`.
    ParentOnly { parent_inode_id: u8, final_name: String },
}

fn split_components(path: &str) -> Result<Vec<&str>> {
    if !path.starts_with('/') {
        return Err(FsError::InvalidArgument("path must start with '/'"));
    }
    if path == "/" {
        return Ok(Vec::new());
    }
    if path.ends_with('/') {
        return Err(FsError::InvalidArgument("path must not end with '/'"));
    }
    let mut components = Vec::new();
    for part in path[1..].split('/') {
        if part.is_empty() {
            return Err(FsError::InvalidArgument("path contains an empty component"));
        }
        if part.len() > FNAME_MAX - 1 {
            return Err(FsError::InvalidArgument("path component too long"));
        }
        components.push(part);
    }
    Ok(components)
}

/// Resolves `path` against the tree rooted at inode 0.
pub fn resolve(device: &mut BlockDevice, path: &str) -> Result<Resolution> {
    let components = split_components(path)?;
    if components.is_empty() {
        // The literal "/" names the root with no child.
        return Ok(Resolution::Found {
            parent_inode_id: ROOT_INODE,
            child_name: String::new(),
            child_inode_id: ROOT_INODE,
        });
    }

    let mut current = ROOT_INODE;
    for component in &components[..components.len() - 1] {
        let inode = InodeTable::read(device, current)?;
        if inode.file_type != FileType::Directory {
            return Ok(Resolution::NotFound);
        }
        match lookup(device, &inode, component)? {
            Some(child) => current = child,
            None => return Ok(Resolution::NotFound),
        }
    }

    let final_name = components[components.len() - 1];
    let parent = InodeTable::read(device, current)?;
    if parent.file_type != FileType::Directory {
        return Ok(Resolution::NotFound);
    }
    match lookup(device, &parent, final_name)? {
        Some(child) => Ok(Resolution::Found {
            parent_inode_id: current,
            child_name: final_name.to_string(),
            child_inode_id: child,
        }),
        None => Ok(Resolution::ParentOnly {
            parent_inode_id: current,
            final_name: final_name.to_string(),
        }),
    }
}

/// Looks up `name` among the live entries of directory `inode`, returning
/// its inode id if present.
pub fn lookup(device: &mut BlockDevice, inode: &Inode, name: &str) -> Result<Option<u8>> {
    let block = read_dir_block(device, inode)?;
    match find_slot(&block, inode, name)? {
        Some(slot) => Ok(Some(block.inode_number_at(slot))),
        None => Ok(None),
    }
}
