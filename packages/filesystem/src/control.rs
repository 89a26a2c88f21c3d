//! The control file: a writable buffer that becomes a request on release.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use bytes::Bytes;

use apifs_api::RequestSpec;
use apifs_node::{Attr, CancelToken, FileHandle, FileNode, FsError, OpenFile};

use crate::sync::MailboxSender;
use crate::SpecOutcome;

/// The writable half of a connection.
///
/// Holds the accumulated specification text. When a handle that has
/// written is released, the buffer is parsed and the outcome is emitted -
/// once - to the paired body worker. Reusing the file after the emission
/// has been consumed has no further effect.
pub struct ControlFile {
    inode: u64,
    url: String,
    data: Mutex<Vec<u8>>,
    emit: MailboxSender<SpecOutcome>,
}

impl ControlFile {
    pub(crate) fn new(inode: u64, url: String, emit: MailboxSender<SpecOutcome>) -> Self {
        ControlFile {
            inode,
            url,
            data: Mutex::new(Vec::new()),
            emit,
        }
    }

    /// The URL requests written here will target.
    pub fn url(&self) -> &str {
        &self.url
    }

    fn lock_data(&self) -> Result<std::sync::MutexGuard<'_, Vec<u8>>, FsError> {
        self.data
            .lock()
            .map_err(|e| FsError::io(format!("lock error: {}", e)))
    }

    /// Read up to `size` bytes at `offset`. An offset at or past the end
    /// of the buffer is out of range; a short tail is returned as-is.
    pub fn read_at(&self, offset: u64, size: u32) -> Result<Bytes, FsError> {
        let data = self.lock_data()?;
        let len = data.len() as u64;
        if offset >= len {
            return Err(FsError::OutOfRange);
        }
        let end = len.min(offset + u64::from(size));
        Ok(Bytes::copy_from_slice(&data[offset as usize..end as usize]))
    }

    /// The whole buffer, with the same bounds rule as [`Self::read_at`].
    pub fn read_full(&self) -> Result<Bytes, FsError> {
        let data = self.lock_data()?;
        if data.is_empty() {
            return Err(FsError::OutOfRange);
        }
        Ok(Bytes::copy_from_slice(&data))
    }

    /// Write `bytes` at `offset`.
    ///
    /// A write at offset 0 replaces the whole buffer, so rewriting a
    /// specification from the top needs no separate truncate. Other
    /// offsets overwrite in place, growing the buffer as needed; an offset
    /// further than one past the end is out of range.
    pub fn write_at(&self, bytes: &[u8], offset: u64) -> Result<usize, FsError> {
        let mut data = self.lock_data()?;
        if offset > data.len() as u64 + 1 {
            return Err(FsError::OutOfRange);
        }
        if offset == 0 {
            data.clear();
            data.extend_from_slice(bytes);
        } else {
            let end = offset as usize + bytes.len();
            if data.len() < end {
                data.resize(end, 0);
            }
            data[offset as usize..end].copy_from_slice(bytes);
        }
        log::trace!("control {}: wrote {} bytes at {}", self.inode, bytes.len(), offset);
        Ok(bytes.len())
    }

    /// Parse the buffer and emit the outcome to the body worker.
    ///
    /// Called on release of a handle that wrote. A parse failure is
    /// emitted as well, so the body file reports it, and is also returned
    /// to the releaser.
    fn commit(&self) -> Result<(), FsError> {
        let outcome = {
            let data = self.lock_data()?;
            RequestSpec::parse(self.url.as_str(), &data)
        };
        let failure = outcome.as_ref().err().cloned();

        if self.emit.try_send(outcome) {
            log::debug!("control {}: specification emitted", self.inode);
        } else {
            log::debug!("control {}: emission dropped, connection already consumed", self.inode);
        }

        match failure {
            Some(e) => Err(FsError::io(e)),
            None => Ok(()),
        }
    }
}

impl FileNode for ControlFile {
    fn attr(&self) -> Attr {
        let size = self.data.lock().map(|d| d.len() as u64).unwrap_or(0);
        Attr::file(self.inode, size, 0o777)
    }

    fn open(self: Arc<Self>) -> Result<OpenFile, FsError> {
        Ok(OpenFile::new(Box::new(ControlHandle {
            file: self,
            wrote: AtomicBool::new(false),
        })))
    }
}

/// One open handle on a control file. Tracks whether this handle wrote,
/// which decides whether its release commits the buffer.
struct ControlHandle {
    file: Arc<ControlFile>,
    wrote: AtomicBool,
}

impl FileHandle for ControlHandle {
    fn read(&self, offset: u64, size: u32, _intr: &CancelToken) -> Result<Bytes, FsError> {
        self.file.read_at(offset, size)
    }

    fn read_all(&self, _intr: &CancelToken) -> Result<Bytes, FsError> {
        self.file.read_full()
    }

    fn write(&self, data: &[u8], offset: u64) -> Result<usize, FsError> {
        let written = self.file.write_at(data, offset)?;
        self.wrote.store(true, Ordering::SeqCst);
        Ok(written)
    }

    fn release(&self) -> Result<(), FsError> {
        if self.wrote.load(Ordering::SeqCst) {
            self.file.commit()
        } else {
            Ok(())
        }
    }
}
