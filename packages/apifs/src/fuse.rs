//! FUSE adapter: bridges the node interface onto the kernel.
//!
//! Everything kernel-shaped lives here - inode and handle registries,
//! errno mapping, attribute encoding. The session loop is single-threaded,
//! so reads that may block (body files waiting on their response) are
//! answered from short-lived threads; the reply objects travel with them.

use std::collections::HashMap;
use std::ffi::OsStr;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use fuser::{
    FileAttr, FileType, Filesystem, MountOption, ReplyAttr, ReplyData, ReplyDirectory, ReplyEmpty,
    ReplyEntry, ReplyOpen, ReplyWrite, Request,
};

use apifs_filesystem::ApiFs;
use apifs_node::{Attr, CancelToken, FileHandle, FileKind, FsError, NodeRef, ROOT_INODE};

const TTL: Duration = Duration::from_secs(1);

/// Mount the filesystem and serve until unmounted.
pub fn mount(fs: ApiFs, mountpoint: &Path) -> std::io::Result<()> {
    let options = [
        MountOption::FSName("apifs".to_string()),
        MountOption::Subtype("apifs".to_string()),
        MountOption::AutoUnmount,
    ];
    log::info!("mounting apifs at {}", mountpoint.display());
    fuser::mount2(Driver::new(fs), mountpoint, &options)
}

fn errno(err: &FsError) -> i32 {
    match err {
        FsError::NotFound => libc::ENOENT,
        FsError::Exists => libc::EEXIST,
        FsError::OutOfRange => libc::ERANGE,
        FsError::Interrupted => libc::EINTR,
        FsError::Io { .. } => libc::EIO,
    }
}

struct Driver {
    uid: u32,
    gid: u32,
    /// Nodes the kernel has been told about, by inode. The root's entry
    /// keeps the whole tree alive for the life of the mount.
    nodes: HashMap<u64, NodeRef>,
    /// Open handles, keyed by the core-allocated token.
    handles: HashMap<u64, Arc<OpenHandle>>,
}

struct OpenHandle {
    handle: Box<dyn FileHandle>,
    /// Reads may park (body files waiting on their response); such reads
    /// must not run on the session thread.
    may_block: bool,
}

fn serve_read(entry: &OpenHandle, offset: u64, size: u32, reply: ReplyData) {
    match entry.handle.read(offset, size, &CancelToken::never()) {
        Ok(bytes) => reply.data(&bytes),
        Err(e) => reply.error(errno(&e)),
    }
}

impl Driver {
    fn new(fs: ApiFs) -> Self {
        let mut nodes = HashMap::new();
        nodes.insert(ROOT_INODE, NodeRef::Dir(fs.root()));
        Driver {
            uid: unsafe { libc::getuid() },
            gid: unsafe { libc::getgid() },
            nodes,
            handles: HashMap::new(),
        }
    }

    fn file_attr(&self, attr: Attr) -> FileAttr {
        let kind = match attr.kind {
            FileKind::Directory => FileType::Directory,
            FileKind::Regular => FileType::RegularFile,
        };
        FileAttr {
            ino: attr.inode,
            size: attr.size,
            blocks: 0,
            atime: SystemTime::UNIX_EPOCH,
            mtime: SystemTime::UNIX_EPOCH,
            ctime: SystemTime::UNIX_EPOCH,
            crtime: SystemTime::UNIX_EPOCH,
            kind,
            perm: (attr.mode & 0o7777) as u16,
            nlink: 1,
            uid: self.uid,
            gid: self.gid,
            rdev: 0,
            blksize: 512,
            flags: 0,
        }
    }

    /// Remember a node so later getattr/open upcalls can find it.
    fn register(&mut self, node: NodeRef) {
        self.nodes.insert(node.attr().inode, node);
    }

    fn dir(&self, ino: u64) -> Option<Arc<dyn apifs_node::DirNode>> {
        match self.nodes.get(&ino) {
            Some(NodeRef::Dir(dir)) => Some(Arc::clone(dir)),
            _ => None,
        }
    }
}

impl Filesystem for Driver {
    fn lookup(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEntry) {
        let Some(dir) = self.dir(parent) else {
            reply.error(libc::ENOENT);
            return;
        };
        let Some(name) = name.to_str() else {
            reply.error(libc::ENOENT);
            return;
        };

        match dir.lookup(name) {
            Ok(node) => {
                let attr = self.file_attr(node.attr());
                self.register(node);
                reply.entry(&TTL, &attr, 0);
            }
            Err(e) => reply.error(errno(&e)),
        }
    }

    fn getattr(&mut self, _req: &Request<'_>, ino: u64, reply: ReplyAttr) {
        match self.nodes.get(&ino) {
            Some(node) => reply.attr(&TTL, &self.file_attr(node.attr())),
            None => reply.error(libc::ENOENT),
        }
    }

    fn mkdir(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        _mode: u32,
        _umask: u32,
        reply: ReplyEntry,
    ) {
        let Some(dir) = self.dir(parent) else {
            reply.error(libc::ENOENT);
            return;
        };
        let Some(name) = name.to_str() else {
            reply.error(libc::EINVAL);
            return;
        };

        match dir.mkdir(name) {
            Ok(child) => {
                let node = NodeRef::Dir(child);
                let attr = self.file_attr(node.attr());
                self.register(node);
                reply.entry(&TTL, &attr, 0);
            }
            Err(e) => reply.error(errno(&e)),
        }
    }

    fn readdir(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        mut reply: ReplyDirectory,
    ) {
        let Some(dir) = self.dir(ino) else {
            reply.error(libc::ENOENT);
            return;
        };

        match dir.readdir() {
            Ok(entries) => {
                for (i, entry) in entries.iter().enumerate().skip(offset as usize) {
                    let kind = match entry.kind {
                        FileKind::Directory => FileType::Directory,
                        FileKind::Regular => FileType::RegularFile,
                    };
                    if reply.add(entry.inode, (i + 1) as i64, kind, &entry.name) {
                        break;
                    }
                }
                reply.ok();
            }
            Err(e) => reply.error(errno(&e)),
        }
    }

    fn opendir(&mut self, _req: &Request<'_>, ino: u64, _flags: i32, reply: ReplyOpen) {
        let Some(dir) = self.dir(ino) else {
            reply.error(libc::ENOENT);
            return;
        };
        match dir.open() {
            Ok(fh) => reply.opened(fh, 0),
            Err(e) => reply.error(errno(&e)),
        }
    }

    fn open(&mut self, _req: &Request<'_>, ino: u64, _flags: i32, reply: ReplyOpen) {
        let file = match self.nodes.get(&ino) {
            Some(NodeRef::File(file)) => Arc::clone(file),
            Some(NodeRef::Dir(_)) => {
                reply.error(libc::EISDIR);
                return;
            }
            None => {
                reply.error(libc::ENOENT);
                return;
            }
        };

        match file.open() {
            Ok(open) => {
                let flags = if open.direct_io {
                    fuser::consts::FOPEN_DIRECT_IO
                } else {
                    0
                };
                self.handles.insert(
                    open.id,
                    Arc::new(OpenHandle {
                        handle: open.handle,
                        may_block: open.may_block,
                    }),
                );
                reply.opened(open.id, flags);
            }
            Err(e) => reply.error(errno(&e)),
        }
    }

    fn read(
        &mut self,
        _req: &Request<'_>,
        _ino: u64,
        fh: u64,
        offset: i64,
        size: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyData,
    ) {
        let Some(entry) = self.handles.get(&fh).map(Arc::clone) else {
            reply.error(libc::EBADF);
            return;
        };

        let offset = offset.max(0) as u64;
        if entry.may_block {
            // Body reads park until the response is buffered; answer off
            // the session thread so other upcalls keep flowing.
            std::thread::spawn(move || serve_read(&entry, offset, size, reply));
        } else {
            serve_read(&entry, offset, size, reply);
        }
    }

    fn write(
        &mut self,
        _req: &Request<'_>,
        _ino: u64,
        fh: u64,
        offset: i64,
        data: &[u8],
        _write_flags: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyWrite,
    ) {
        let Some(entry) = self.handles.get(&fh) else {
            reply.error(libc::EBADF);
            return;
        };

        match entry.handle.write(data, offset.max(0) as u64) {
            Ok(written) => reply.written(written as u32),
            Err(e) => reply.error(errno(&e)),
        }
    }

    fn flush(&mut self, _req: &Request<'_>, _ino: u64, fh: u64, _lock_owner: u64, reply: ReplyEmpty) {
        let Some(entry) = self.handles.get(&fh) else {
            reply.error(libc::EBADF);
            return;
        };
        match entry.handle.flush() {
            Ok(()) => reply.ok(),
            Err(e) => reply.error(errno(&e)),
        }
    }

    fn release(
        &mut self,
        _req: &Request<'_>,
        _ino: u64,
        fh: u64,
        _flags: i32,
        _lock_owner: Option<u64>,
        _flush: bool,
        reply: ReplyEmpty,
    ) {
        let Some(entry) = self.handles.remove(&fh) else {
            // The kernel may release handles we never saw; shrug.
            reply.ok();
            return;
        };
        match entry.handle.release() {
            Ok(()) => reply.ok(),
            Err(e) => reply.error(errno(&e)),
        }
    }

    fn fsync(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        _datasync: bool,
        reply: ReplyEmpty,
    ) {
        match self.nodes.get(&ino) {
            Some(NodeRef::File(file)) => match file.fsync() {
                Ok(()) => reply.ok(),
                Err(e) => reply.error(errno(&e)),
            },
            _ => reply.ok(),
        }
    }
}
