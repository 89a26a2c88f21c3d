//! # apifs-node
//!
//! The interface between the apifs core and whatever transport mounts it.
//!
//! This crate defines the node/handle vocabulary only. Errors at this level
//! are the ones a transport can map directly onto its own error constants;
//! no HTTP or request-grammar semantics live here - those belong in the
//! crates above.
//!
//! A transport drives the tree through three object-safe traits:
//!
//! * [`DirNode`] - `attr`, `lookup`, `readdir`, `mkdir`, `open`
//! * [`FileNode`] - `attr`, `open`, `fsync`
//! * [`FileHandle`] - `read`, `read_all`, `write`, `flush`, `release`
//!
//! Handles are identified by opaque random 64-bit tokens allocated with
//! [`fresh_handle_id`]; inodes are derived deterministically with
//! [`derive_inode`].

pub mod attr;
pub mod cancel;
pub mod error;
pub mod inode;
pub mod node;

pub use attr::{Attr, DirEntry, FileKind};
pub use cancel::CancelToken;
pub use error::FsError;
pub use inode::{derive_inode, ROOT_INODE};
pub use node::{fresh_handle_id, DirNode, FileHandle, FileNode, NodeRef, OpenFile};
