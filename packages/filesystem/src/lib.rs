//! # apifs-filesystem
//!
//! A user-space filesystem that turns HTTP APIs into file I/O.
//!
//! Directories under the root encode URLs: `mkdir example.com` followed by
//! `mkdir example.com/users` designates `http://example.com/users`. Every
//! resource directory carries a `clone` pseudo-file; reading it allocates a
//! numbered connection and materializes a `<id>.ctl` / `<id>.body` pair in
//! the directory:
//!
//! ```text
//! $ mkdir /mnt/api/example.com
//! $ cat /mnt/api/example.com/clone
//! 0
//! $ echo "query sort name" > /mnt/api/example.com/0.ctl
//! $ cat /mnt/api/example.com/0.body     # blocks until the response lands
//! ```
//!
//! Writing a request specification to the control file and releasing it
//! fires the connection's one-shot handshake: a background worker executes
//! the request and buffers the response, and reads of the body file block
//! until the buffer is ready. A connection is one-shot; clone again for the
//! next request.
//!
//! The tree is exposed through the `apifs-node` traits and carries no
//! transport or network code of its own: the kernel side is an external
//! adapter, and HTTP execution is the [`apifs_api::HttpClient`] capability
//! supplied at construction.

pub mod body;
pub mod clone;
pub mod connection;
pub mod control;
pub mod fs;
pub mod resource;
pub mod root;
pub mod sync;

pub use body::BodyFile;
pub use clone::CloneFile;
pub use connection::Connection;
pub use control::ControlFile;
pub use fs::ApiFs;
pub use resource::ResourceDir;
pub use root::RootDir;

/// Outcome of parsing a released control buffer, as delivered to the body
/// worker: either a runnable specification or the failure to report.
pub(crate) type SpecOutcome = Result<apifs_api::RequestSpec, apifs_api::ParseError>;
