//! The facade handed to the transport.

use std::sync::Arc;

use apifs_api::HttpClient;
use apifs_node::{FsError, NodeRef};

use crate::root::RootDir;

/// The whole filesystem: a root and the client new connections will use.
///
/// Owns no other state; open handles and inode bookkeeping belong to the
/// transport driving the node interface.
pub struct ApiFs {
    root: Arc<RootDir>,
}

impl ApiFs {
    pub fn new(client: Arc<dyn HttpClient>) -> Self {
        ApiFs {
            root: RootDir::new(client),
        }
    }

    pub fn root(&self) -> Arc<RootDir> {
        Arc::clone(&self.root)
    }

    /// Walk a slash-separated path from the root.
    ///
    /// Empty components are skipped, so `"/example.com/users"` and
    /// `"example.com/users"` resolve alike. An empty path is the root.
    pub fn resolve(&self, path: &str) -> Result<NodeRef, FsError> {
        let mut node = NodeRef::Dir(self.root());
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            node = match node {
                NodeRef::Dir(dir) => dir.lookup(segment)?,
                NodeRef::File(_) => return Err(FsError::NotFound),
            };
        }
        Ok(node)
    }
}
