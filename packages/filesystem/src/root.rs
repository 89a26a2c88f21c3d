//! The root directory: one child per host.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use apifs_api::HttpClient;
use apifs_node::{Attr, DirEntry, DirNode, FileKind, FsError, NodeRef, ROOT_INODE};

use crate::resource::ResourceDir;

/// The mount root. Its immediate children are hosts (`example.com`);
/// deeper directories extend the URL path. The root itself carries no
/// clone file and no connections - only `mkdir` mutates it.
pub struct RootDir {
    client: Arc<dyn HttpClient>,
    state: Mutex<RootState>,
}

struct RootState {
    dirs: Vec<Arc<ResourceDir>>,
    dir_map: HashMap<String, usize>,
}

impl RootDir {
    pub fn new(client: Arc<dyn HttpClient>) -> Arc<Self> {
        Arc::new(RootDir {
            client,
            state: Mutex::new(RootState {
                dirs: Vec::new(),
                dir_map: HashMap::new(),
            }),
        })
    }

    fn lock_state(&self) -> Result<MutexGuard<'_, RootState>, FsError> {
        self.state
            .lock()
            .map_err(|e| FsError::io(format!("lock error: {}", e)))
    }
}

impl DirNode for RootDir {
    fn attr(&self) -> Attr {
        Attr::dir(ROOT_INODE, 0o777)
    }

    fn lookup(&self, name: &str) -> Result<NodeRef, FsError> {
        let state = self.lock_state()?;
        match state.dir_map.get(name) {
            Some(&idx) => Ok(NodeRef::Dir(Arc::clone(&state.dirs[idx]) as Arc<dyn DirNode>)),
            None => Err(FsError::NotFound),
        }
    }

    fn readdir(&self) -> Result<Vec<DirEntry>, FsError> {
        let state = self.lock_state()?;
        Ok(state
            .dirs
            .iter()
            .map(|dir| DirEntry::new(dir.name(), dir.attr().inode, FileKind::Directory))
            .collect())
    }

    fn mkdir(&self, name: &str) -> Result<Arc<dyn DirNode>, FsError> {
        let mut state = self.lock_state()?;
        if state.dir_map.contains_key(name) {
            return Err(FsError::Exists);
        }

        let child = ResourceDir::new(ROOT_INODE, name, "", Arc::clone(&self.client));
        state.dirs.push(Arc::clone(&child));
        let idx = state.dirs.len() - 1;
        state.dir_map.insert(name.to_string(), idx);

        log::debug!("root: mkdir {}", name);
        Ok(child)
    }
}
