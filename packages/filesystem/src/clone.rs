//! The clone file: reading it allocates the next connection.

use std::sync::{Arc, Mutex, Weak};

use bytes::Bytes;

use apifs_node::{Attr, CancelToken, FileHandle, FileNode, FsError, OpenFile};

use crate::resource::ResourceDir;

/// Per-directory connection allocator.
///
/// Has no stored contents; conceptually it is the lazy sequence of decimal
/// ids `0, 1, 2, ...`. Each open handle allocates on its first read and
/// then serves that id (newline-terminated) for the rest of the handle's
/// life, so one open/read/close cycle consumes exactly one id no matter
/// how the reader chunks its reads. Allocation also registers the
/// `<id>.ctl` / `<id>.body` pair in the owning directory.
///
/// Advertised size is 0; opens request direct I/O.
pub struct CloneFile {
    inode: u64,
    dir: Weak<ResourceDir>,
}

impl CloneFile {
    pub(crate) fn new(inode: u64, dir: Weak<ResourceDir>) -> Self {
        CloneFile { inode, dir }
    }
}

impl FileNode for CloneFile {
    fn attr(&self) -> Attr {
        Attr::file(self.inode, 0, 0o777)
    }

    fn open(self: Arc<Self>) -> Result<OpenFile, FsError> {
        Ok(OpenFile::direct(Box::new(CloneHandle {
            file: self,
            issued: Mutex::new(None),
        })))
    }
}

struct CloneHandle {
    file: Arc<CloneFile>,
    issued: Mutex<Option<Bytes>>,
}

impl CloneHandle {
    /// The id this handle serves, allocating it on first use.
    fn issued(&self) -> Result<Bytes, FsError> {
        let mut issued = self
            .issued
            .lock()
            .map_err(|e| FsError::io(format!("lock error: {}", e)))?;
        if let Some(bytes) = issued.as_ref() {
            return Ok(bytes.clone());
        }

        let dir = self.file.dir.upgrade().ok_or(FsError::NotFound)?;
        let id = dir.clone_connection()?;
        log::debug!("clone {}: issued connection {}", self.file.inode, id);

        let bytes = Bytes::from(format!("{}\n", id));
        *issued = Some(bytes.clone());
        Ok(bytes)
    }
}

impl FileHandle for CloneHandle {
    fn read(&self, offset: u64, size: u32, _intr: &CancelToken) -> Result<Bytes, FsError> {
        let all = self.issued()?;
        let len = all.len() as u64;
        if offset >= len {
            return Ok(Bytes::new());
        }
        let end = len.min(offset + u64::from(size));
        Ok(all.slice(offset as usize..end as usize))
    }

    fn read_all(&self, _intr: &CancelToken) -> Result<Bytes, FsError> {
        self.issued()
    }
}
