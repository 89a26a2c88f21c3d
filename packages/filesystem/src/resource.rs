//! Resource directories: one URL path segment each.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use apifs_api::HttpClient;
use apifs_node::{derive_inode, Attr, DirEntry, DirNode, FileKind, FileNode, FsError, NodeRef};

use crate::clone::CloneFile;
use crate::connection::Connection;

/// A directory standing for one node of a URL.
///
/// Owns its child segments, its `clone` allocator, and every connection
/// cloned here. One mutex covers all mutable state, so id allocation and
/// pair registration are atomic with respect to lookups and enumerations:
/// nobody ever observes `<n>.ctl` without `<n>.body`.
pub struct ResourceDir {
    name: String,
    fullpath: String,
    inode: u64,
    client: Arc<dyn HttpClient>,
    clone: Arc<CloneFile>,
    state: Mutex<DirState>,
}

struct DirState {
    dirs: Vec<Arc<ResourceDir>>,
    dir_map: HashMap<String, usize>,
    conns: Vec<Arc<Connection>>,
    conn_map: HashMap<String, NodeRef>,
    next_conn_id: u64,
}

impl ResourceDir {
    /// Create a directory for `name` under a parent at `parent_path` with
    /// `parent_inode`. The root passes an empty `parent_path`.
    pub(crate) fn new(
        parent_inode: u64,
        name: &str,
        parent_path: &str,
        client: Arc<dyn HttpClient>,
    ) -> Arc<Self> {
        let inode = derive_inode(parent_inode, name);
        let fullpath = format!("{}/{}", parent_path, name);

        Arc::new_cyclic(|weak| ResourceDir {
            name: name.to_string(),
            fullpath,
            inode,
            client,
            clone: Arc::new(CloneFile::new(derive_inode(inode, "clone"), weak.clone())),
            state: Mutex::new(DirState {
                dirs: Vec::new(),
                dir_map: HashMap::new(),
                conns: Vec::new(),
                conn_map: HashMap::new(),
                next_conn_id: 0,
            }),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Path below the root, with a leading slash.
    pub fn fullpath(&self) -> &str {
        &self.fullpath
    }

    fn lock_state(&self) -> Result<MutexGuard<'_, DirState>, FsError> {
        self.state
            .lock()
            .map_err(|e| FsError::io(format!("lock error: {}", e)))
    }

    /// Allocate the next connection id and register its file pair.
    ///
    /// The worker is live before the pair becomes visible, and both names
    /// appear under one hold of the directory lock. Ids count up from 0
    /// and are never reused.
    pub fn clone_connection(&self) -> Result<u64, FsError> {
        let mut state = self.lock_state()?;

        let id = state.next_conn_id;
        state.next_conn_id += 1;

        let conn = Arc::new(Connection::spawn(
            self.inode,
            id,
            &self.fullpath,
            Arc::clone(&self.client),
        ));
        state
            .conn_map
            .insert(conn.ctl_name(), NodeRef::File(conn.control()));
        state
            .conn_map
            .insert(conn.body_name(), NodeRef::File(conn.body()));
        state.conns.push(conn);

        log::debug!("dir {}: added connection {}", self.fullpath, id);
        Ok(id)
    }
}

impl DirNode for ResourceDir {
    fn attr(&self) -> Attr {
        Attr::dir(self.inode, 0o555)
    }

    fn lookup(&self, name: &str) -> Result<NodeRef, FsError> {
        if name == "clone" {
            return Ok(NodeRef::File(Arc::clone(&self.clone) as Arc<dyn FileNode>));
        }

        let state = self.lock_state()?;
        if let Some(node) = state.conn_map.get(name) {
            return Ok(node.clone());
        }
        if let Some(&idx) = state.dir_map.get(name) {
            return Ok(NodeRef::Dir(Arc::clone(&state.dirs[idx]) as Arc<dyn DirNode>));
        }
        Err(FsError::NotFound)
    }

    fn readdir(&self) -> Result<Vec<DirEntry>, FsError> {
        let state = self.lock_state()?;

        let mut entries = Vec::with_capacity(1 + state.dirs.len() + state.conn_map.len());
        entries.push(DirEntry::new(
            "clone",
            self.clone.attr().inode,
            FileKind::Regular,
        ));
        for dir in &state.dirs {
            entries.push(DirEntry::new(dir.name(), dir.inode, FileKind::Directory));
        }
        for (name, node) in &state.conn_map {
            entries.push(DirEntry::new(
                name.as_str(),
                node.attr().inode,
                FileKind::Regular,
            ));
        }
        Ok(entries)
    }

    fn mkdir(&self, name: &str) -> Result<Arc<dyn DirNode>, FsError> {
        let mut state = self.lock_state()?;
        if state.dir_map.contains_key(name) {
            return Err(FsError::Exists);
        }

        let child = ResourceDir::new(self.inode, name, &self.fullpath, Arc::clone(&self.client));
        state.dirs.push(Arc::clone(&child));
        let idx = state.dirs.len() - 1;
        state.dir_map.insert(name.to_string(), idx);

        log::debug!("dir {}: mkdir {}", self.fullpath, name);
        Ok(child)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockClient;

    fn dir() -> Arc<ResourceDir> {
        ResourceDir::new(1, "example.com", "", Arc::new(MockClient::default()))
    }

    fn names(dir: &ResourceDir) -> Vec<String> {
        let mut names: Vec<String> = dir.readdir().unwrap().into_iter().map(|e| e.name).collect();
        names.sort();
        names
    }

    #[test]
    fn fullpath_has_a_leading_slash() {
        let dir = dir();
        assert_eq!(dir.fullpath(), "/example.com");
    }

    #[test]
    fn nested_fullpath_joins_segments() {
        let parent = dir();
        parent.mkdir("users").unwrap();
        let child = match parent.lookup("users").unwrap() {
            NodeRef::Dir(d) => d,
            _ => panic!("users is a directory"),
        };
        assert_eq!(child.attr().inode, derive_inode(parent.inode, "users"));
    }

    #[test]
    fn empty_dir_lists_only_clone() {
        assert_eq!(names(&dir()), vec!["clone"]);
    }

    #[test]
    fn lookup_clone_returns_a_file() {
        let dir = dir();
        assert!(matches!(dir.lookup("clone").unwrap(), NodeRef::File(_)));
    }

    #[test]
    fn lookup_unknown_name_fails() {
        assert_eq!(
            dir().lookup("missing").err(),
            Some(FsError::NotFound)
        );
    }

    #[test]
    fn mkdir_twice_fails_with_exists() {
        let dir = dir();
        dir.mkdir("users").unwrap();
        assert!(matches!(dir.mkdir("users"), Err(FsError::Exists)));
    }

    #[test]
    fn clone_connection_registers_both_names_at_once() {
        let dir = dir();
        let id = dir.clone_connection().unwrap();
        assert_eq!(id, 0);

        assert_eq!(names(&dir), vec!["0.body", "0.ctl", "clone"]);
        assert!(matches!(dir.lookup("0.ctl").unwrap(), NodeRef::File(_)));
        assert!(matches!(dir.lookup("0.body").unwrap(), NodeRef::File(_)));
    }

    #[test]
    fn readdir_after_n_clones_has_2n_connection_entries() {
        let dir = dir();
        dir.mkdir("users").unwrap();
        for expected in 0..3 {
            assert_eq!(dir.clone_connection().unwrap(), expected);
        }
        assert_eq!(
            names(&dir),
            vec!["0.body", "0.ctl", "1.body", "1.ctl", "2.body", "2.ctl", "clone", "users"]
        );
    }

    #[test]
    fn concurrent_clones_produce_distinct_sequential_ids() {
        let dir = dir();
        let mut workers = Vec::new();
        for _ in 0..8 {
            let dir = Arc::clone(&dir);
            workers.push(std::thread::spawn(move || dir.clone_connection().unwrap()));
        }
        let mut ids: Vec<u64> = workers.into_iter().map(|w| w.join().unwrap()).collect();
        ids.sort_unstable();
        assert_eq!(ids, (0..8).collect::<Vec<_>>());
    }

    #[test]
    fn sibling_entries_have_distinct_inodes() {
        let dir = dir();
        dir.mkdir("users").unwrap();
        dir.clone_connection().unwrap();

        let mut inodes: Vec<u64> = dir.readdir().unwrap().iter().map(|e| e.inode).collect();
        inodes.sort_unstable();
        inodes.dedup();
        assert_eq!(inodes.len(), 4); // clone, users, 0.ctl, 0.body
    }
}
