//! The polymorphic node and handle traits.
//!
//! Directories and files are separate traits rather than one trait with
//! unsupported-operation errors: the transport always knows which kind it
//! is holding, and the split keeps each surface small.

use std::sync::Arc;

use bytes::Bytes;

use crate::attr::{Attr, DirEntry};
use crate::cancel::CancelToken;
use crate::error::FsError;

/// Allocate an opaque handle identity.
///
/// Identities are random rather than sequential so stale tokens from a
/// previous mount are unlikely to alias a live handle.
pub fn fresh_handle_id() -> u64 {
    rand::random::<u64>()
}

/// A reference to either kind of node, as returned by lookups.
#[derive(Clone)]
pub enum NodeRef {
    Dir(Arc<dyn DirNode>),
    File(Arc<dyn FileNode>),
}

impl NodeRef {
    pub fn attr(&self) -> Attr {
        match self {
            NodeRef::Dir(d) => d.attr(),
            NodeRef::File(f) => f.attr(),
        }
    }
}

/// A successful file open: the allocated handle token, how the transport
/// should treat the handle, and the handle itself.
pub struct OpenFile {
    pub id: u64,
    /// The transport should bypass its page cache for this handle.
    pub direct_io: bool,
    /// Reads on this handle may park until background work finishes.
    /// Transports with a serial upcall loop must not serve such reads on
    /// it.
    pub may_block: bool,
    pub handle: Box<dyn FileHandle>,
}

impl OpenFile {
    pub fn new(handle: Box<dyn FileHandle>) -> Self {
        OpenFile {
            id: fresh_handle_id(),
            direct_io: false,
            may_block: false,
            handle,
        }
    }

    pub fn direct(handle: Box<dyn FileHandle>) -> Self {
        OpenFile {
            id: fresh_handle_id(),
            direct_io: true,
            may_block: false,
            handle,
        }
    }

    /// Mark reads on this handle as potentially parking.
    pub fn with_blocking_reads(mut self) -> Self {
        self.may_block = true;
        self
    }
}

/// A directory node.
pub trait DirNode: Send + Sync {
    fn attr(&self) -> Attr;

    /// Resolve one name to a child node.
    fn lookup(&self, name: &str) -> Result<NodeRef, FsError>;

    /// Enumerate the directory. Membership is the contract; order is not.
    fn readdir(&self) -> Result<Vec<DirEntry>, FsError>;

    /// Create a child directory. Fails with [`FsError::Exists`] rather
    /// than replacing.
    fn mkdir(&self, name: &str) -> Result<Arc<dyn DirNode>, FsError>;

    /// Open the directory, yielding a handle token for the transport.
    fn open(&self) -> Result<u64, FsError> {
        Ok(fresh_handle_id())
    }
}

/// A regular (possibly virtual) file node.
///
/// `open` takes an `Arc` receiver: handles outlive the call that created
/// them and share the node's state, so the node hands a clone of itself to
/// each handle.
pub trait FileNode: Send + Sync {
    fn attr(&self) -> Attr;

    fn open(self: Arc<Self>) -> Result<OpenFile, FsError>;

    fn fsync(&self) -> Result<(), FsError> {
        Ok(())
    }
}

/// An open file handle.
///
/// The transport gives no affinity guarantees: the thread that opens a
/// handle is not necessarily the one that reads, writes, or releases it.
pub trait FileHandle: Send + Sync {
    /// Positional read of up to `size` bytes at `offset`. May block; the
    /// token cancels the wait with [`FsError::Interrupted`].
    fn read(&self, offset: u64, size: u32, intr: &CancelToken) -> Result<Bytes, FsError>;

    /// Read the whole contents. May block like [`FileHandle::read`].
    fn read_all(&self, intr: &CancelToken) -> Result<Bytes, FsError>;

    /// Positional write; returns the number of bytes accepted.
    fn write(&self, data: &[u8], offset: u64) -> Result<usize, FsError> {
        let _ = (data, offset);
        Err(FsError::io("file is read-only"))
    }

    fn flush(&self) -> Result<(), FsError> {
        Ok(())
    }

    /// Final release of the handle. Write-backed handles do their
    /// commit work here.
    fn release(&self) -> Result<(), FsError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handle_ids_are_unlikely_to_collide() {
        let a = fresh_handle_id();
        let b = fresh_handle_id();
        assert_ne!(a, b);
    }

    #[test]
    fn open_file_flags() {
        struct Null;
        impl FileHandle for Null {
            fn read(&self, _: u64, _: u32, _: &CancelToken) -> Result<Bytes, FsError> {
                Ok(Bytes::new())
            }
            fn read_all(&self, _: &CancelToken) -> Result<Bytes, FsError> {
                Ok(Bytes::new())
            }
        }

        let plain = OpenFile::new(Box::new(Null));
        assert!(!plain.direct_io);
        assert!(!plain.may_block);

        let direct = OpenFile::direct(Box::new(Null));
        assert!(direct.direct_io);
        assert!(!direct.may_block);

        let parked = OpenFile::direct(Box::new(Null)).with_blocking_reads();
        assert!(parked.direct_io);
        assert!(parked.may_block);
    }
}
