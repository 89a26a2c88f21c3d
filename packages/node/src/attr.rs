//! Node attributes and directory entries.

/// Whether a node is a directory or a regular file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Directory,
    Regular,
}

/// Attributes reported for a node.
///
/// `size` is advertised state, not necessarily backing-store truth: virtual
/// files whose contents are produced on read report 0 and rely on the
/// transport opening them with direct I/O.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attr {
    pub inode: u64,
    pub size: u64,
    /// Unix permission bits, e.g. `0o555`.
    pub mode: u32,
    pub kind: FileKind,
}

impl Attr {
    pub fn dir(inode: u64, mode: u32) -> Self {
        Attr {
            inode,
            size: 0,
            mode,
            kind: FileKind::Directory,
        }
    }

    pub fn file(inode: u64, size: u64, mode: u32) -> Self {
        Attr {
            inode,
            size,
            mode,
            kind: FileKind::Regular,
        }
    }
}

/// One entry in a directory listing.
///
/// Carries the child inode so the transport can fill kernel dirents without
/// a second lookup round-trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub inode: u64,
    pub kind: FileKind,
}

impl DirEntry {
    pub fn new(name: impl Into<String>, inode: u64, kind: FileKind) -> Self {
        DirEntry {
            name: name.into(),
            inode,
            kind,
        }
    }
}
