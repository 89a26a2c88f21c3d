//! A connection: one control/body pair, one HTTP round-trip.

use std::sync::{Arc, Mutex};
use std::thread;

use apifs_api::HttpClient;
use apifs_node::derive_inode;

use crate::body::BodyFile;
use crate::control::ControlFile;
use crate::sync::mailbox;

/// One numbered connection owned by a resource directory.
///
/// Created by a clone read; appears in the directory as `<id>.ctl` and
/// `<id>.body`. The body worker is already parked on the control file's
/// emission channel by the time the constructor returns, so the handshake
/// is live before either file can be opened. Designed to be consumed once:
/// one control write cycle, one body read.
pub struct Connection {
    id: u64,
    ctl: Arc<ControlFile>,
    body: Arc<BodyFile>,
    worker: Mutex<Option<thread::JoinHandle<()>>>,
}

impl Connection {
    /// Build the pair and start its worker.
    ///
    /// `fullpath` is the owning directory's path below the root; the
    /// target URL is formed by prefixing `http:/`.
    pub(crate) fn spawn(
        dir_inode: u64,
        id: u64,
        fullpath: &str,
        client: Arc<dyn HttpClient>,
    ) -> Self {
        let url = format!("http:/{}", fullpath);
        let (tx, rx) = mailbox();

        let ctl = Arc::new(ControlFile::new(
            derive_inode(dir_inode, &format!("{}.ctl", id)),
            url,
            tx,
        ));
        let body = BodyFile::new(derive_inode(dir_inode, &format!("{}.body", id)));
        let worker = body.spawn_worker(rx, client);

        Connection {
            id,
            ctl,
            body,
            worker: Mutex::new(Some(worker)),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn ctl_name(&self) -> String {
        format!("{}.ctl", self.id)
    }

    pub fn body_name(&self) -> String {
        format!("{}.body", self.id)
    }

    pub fn control(&self) -> Arc<ControlFile> {
        Arc::clone(&self.ctl)
    }

    pub fn body(&self) -> Arc<BodyFile> {
        Arc::clone(&self.body)
    }

    /// Wait for the worker thread to finish. Used at teardown; a worker
    /// still parked on its emission channel exits once the control file is
    /// dropped.
    pub fn join_worker(&self) {
        let handle = self.worker.lock().ok().and_then(|mut w| w.take());
        if let Some(handle) = handle {
            let _ = handle.join();
        }
    }
}
