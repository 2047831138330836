//! Container constants. These values are bit-exact: changing any of them
//! changes the on-disk format.

/// Size of one block, in bytes.
pub const BLOCK_SIZE: usize = 4096;
/// Total number of blocks in the container.
pub const BLOCK_COUNT: usize = 65536;

/// Number of blocks the free-block bitmap overlay occupies (blocks 0-1).
pub const FBM_BLOCKS: usize = 2;
/// Total bytes of the free-block bitmap overlay region.
pub const FBM_REGION_BYTES: usize = FBM_BLOCKS * BLOCK_SIZE;

/// Bytes of the inode-allocation bitmap, carved out of the tail of the FBM
/// overlay region (see `SPEC_FULL.md` §9, Open Question 1).
pub const INODE_BITMAP_BYTES: usize = 32;
/// Bits of the free-block bitmap that are actually used to track individual
/// blocks; the remaining `INODE_BITMAP_BYTES` bytes of the overlay region
/// back the inode bitmap instead.
pub const FBM_TRACKED_BITS: usize = (FBM_REGION_BYTES - INODE_BITMAP_BYTES) * 8;

/// Number of blocks reserved for the inode table (blocks 2-5 inclusive).
pub const INODE_TABLE_BLOCKS: usize = 4;
/// Byte offset of the inode table's first record (block 2's first byte).
pub const INODE_TABLE_BASE: usize = FBM_REGION_BYTES;
/// Number of inode slots.
pub const INODE_COUNT: usize = 256;
/// Size of one on-disk inode record, in bytes.
pub const INODE_SIZE: usize = 64;

/// Maximum simultaneously open files.
pub const FD_COUNT: usize = 256;

/// Maximum entries per directory block.
pub const DIR_ENTRIES: usize = 31;
/// Maximum name length including the null terminator.
pub const FNAME_MAX: usize = 127;
/// On-disk size of one directory entry (`name[127]` + `inode_number: u8`).
pub const DIR_ENTRY_SIZE: usize = FNAME_MAX + 1;

/// Number of direct block pointers per inode.
pub const DIRECT_COUNT: usize = 6;
/// Number of block ids addressable by one indirect/double-indirect index
/// block (each id is 2 bytes, one block holds `BLOCK_SIZE / 2` of them).
pub const PTRS_PER_INDEX_BLOCK: usize = BLOCK_SIZE / 2;

/// First block id available for user data and index blocks. Blocks below
/// this are permanently reserved (the FBM overlay and the inode table).
pub const FIRST_DATA_BLOCK: u16 = (FBM_BLOCKS + INODE_TABLE_BLOCKS) as u16;

/// First block id of the tail sacrificed to host the inode bitmap (see
/// Open Question 1); blocks from here on are never handed out by the
/// allocator.
pub const RESERVED_TAIL_START: u16 = FBM_TRACKED_BITS as u16;

/// The root inode's slot index; fixed by the data model.
pub const ROOT_INODE: u8 = 0;

/// Block-count threshold where the direct tier ends and the indirect tier
/// begins, in units of 4096-byte blocks from the start of the file.
pub const DIRECT_LIMIT: u64 = DIRECT_COUNT as u64;
/// Block-count threshold where the indirect tier ends and the
/// double-indirect tier begins.
pub const INDIRECT_LIMIT: u64 = DIRECT_LIMIT + PTRS_PER_INDEX_BLOCK as u64;
/// Block-count threshold past which no tier can address a block.
pub const DOUBLE_INDIRECT_LIMIT: u64 =
    INDIRECT_LIMIT + (PTRS_PER_INDEX_BLOCK as u64) * (PTRS_PER_INDEX_BLOCK as u64);

/// 4-byte magic stamped into the root inode's reserved `owner` field at
/// format time, used only by the CLI's `is_present` probe.
pub const MAGIC: [u8; 4] = *b"UFS1";
