//! Error kinds shared between the core and the transport.
//!
//! These are deliberately few: each variant corresponds to one error
//! constant a filesystem transport already knows how to deliver. Richer
//! failure detail (HTTP failures, grammar violations) is flattened into
//! [`FsError::Io`] with a message before it crosses this boundary.

/// Errors surfaced at the node/handle interface.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum FsError {
    /// Lookup of a name that does not exist.
    #[error("not found")]
    NotFound,

    /// Creating a name that already exists.
    #[error("already exists")]
    Exists,

    /// Read or write offset outside the valid range for the buffer.
    #[error("offset out of range")]
    OutOfRange,

    /// A blocking operation was cancelled by the caller.
    #[error("interrupted")]
    Interrupted,

    /// I/O failure: HTTP errors, response read failures, or a request
    /// specification that failed to parse.
    #[error("i/o error: {message}")]
    Io { message: String },
}

impl FsError {
    /// Build an [`FsError::Io`] from anything displayable.
    pub fn io(message: impl std::fmt::Display) -> Self {
        FsError::Io {
            message: message.to_string(),
        }
    }
}
