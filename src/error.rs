//! The error type surfaced at every public boundary of the file system.

/// Everything that can go wrong while resolving a path, mutating the
/// directory tree, or moving bytes through a file's cursor.
///
/// Every public operation in this crate returns `Result<T, FsError>`. There
/// are no negative sentinel return codes anywhere in the public API; the
/// discriminants below are the Rust-native equivalent of the C ABI this
/// crate's layout is bit-exact with.
#[derive(thiserror::Error, Debug)]
pub enum FsError {
    /// A null handle, malformed path, name too long, unknown whence, unknown
    /// file type, or a negative size where one isn't allowed.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// Path resolution did not find the requested entry.
    #[error("no such file or directory")]
    NotFound,

    /// `create`/`link`/`move` target name already present in its parent.
    #[error("file already exists")]
    AlreadyExists,

    /// The operation expected a directory but the inode is a regular file.
    #[error("not a directory")]
    NotADirectory,

    /// The operation expected a regular file but the inode is a directory.
    #[error("is a directory")]
    IsADirectory,

    /// `remove` of a directory whose `vacant_file` is not empty.
    #[error("directory not empty")]
    DirectoryNotEmpty,

    /// The parent directory already holds `DIR_ENTRIES` entries.
    #[error("directory is full")]
    DirectoryFull,

    /// The block allocator has no free block left to hand out.
    #[error("out of blocks")]
    OutOfBlocks,

    /// The inode table has no free slot left to hand out.
    #[error("out of inodes")]
    OutOfInodes,

    /// The descriptor table has no free slot left to hand out.
    #[error("out of descriptors")]
    OutOfDescriptors,

    /// The requested block or inode id is outside the addressable range.
    #[error("block or inode id out of range")]
    OutOfRange,

    /// A block read or write was rejected: the id was unallocated (a stale
    /// pointer) or the id was out of range at the device layer.
    #[error("I/O error: {0}")]
    IoError(&'static str),

    /// A host-level I/O failure (opening, reading, or writing the backing
    /// container file).
    #[error("device error: {0}")]
    Device(#[from] std::io::Error),
}

impl FsError {
    /// Returns the short, stable discriminant name the §7 error kinds use,
    /// for callers that want to match on "kind" without pattern-matching the
    /// full enum (mirrors `std::io::ErrorKind` mapping to `std::io::Error`).
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidArgument(_) => "InvalidArgument",
            Self::NotFound => "NotFound",
            Self::AlreadyExists => "AlreadyExists",
            Self::NotADirectory => "NotADirectory",
            Self::IsADirectory => "IsADirectory",
            Self::DirectoryNotEmpty => "DirectoryNotEmpty",
            Self::DirectoryFull => "DirectoryFull",
            Self::OutOfBlocks => "OutOfBlocks",
            Self::OutOfInodes => "OutOfInodes",
            Self::OutOfDescriptors => "OutOfDescriptors",
            Self::OutOfRange => "OutOfRange",
            Self::IoError(_) => "IoError",
            Self::Device(_) => "IoError",
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, FsError>;
