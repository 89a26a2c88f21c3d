//! The body file: a lazily-filled, read-blocking response buffer.

use std::io::Read;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex};
use std::thread;

use bytes::Bytes;

use apifs_api::HttpClient;
use apifs_node::{Attr, CancelToken, FileHandle, FileNode, FsError, OpenFile};

use crate::sync::{Latch, MailboxReceiver};
use crate::SpecOutcome;

/// The readable half of a connection.
///
/// A background worker, started when the connection is created, waits for
/// the paired control file's emission, performs the HTTP round-trip,
/// buffers the full response, then raises the readiness latch. Once ready
/// the result never changes; all readers see the same bytes.
///
/// The advertised size stays 0 - contents exist only after the round-trip
/// - so opens request direct I/O and the transport must not trust the size
/// when serving reads.
pub struct BodyFile {
    inode: u64,
    response: Mutex<Option<Result<Bytes, String>>>,
    ready: Latch,
}

impl BodyFile {
    pub(crate) fn new(inode: u64) -> Arc<Self> {
        Arc::new(BodyFile {
            inode,
            response: Mutex::new(None),
            ready: Latch::new(),
        })
    }

    /// Start the worker for this body.
    ///
    /// The worker owns the mailbox receiver, so it counts as subscribed
    /// from this point on; it must be running before the connection is
    /// visible to lookups. It exits without raising readiness only when
    /// the control side is torn down unwritten.
    pub(crate) fn spawn_worker(
        self: &Arc<Self>,
        rx: MailboxReceiver<SpecOutcome>,
        client: Arc<dyn HttpClient>,
    ) -> thread::JoinHandle<()> {
        let file = Arc::clone(self);
        thread::spawn(move || file.run(rx, client))
    }

    fn run(&self, rx: MailboxReceiver<SpecOutcome>, client: Arc<dyn HttpClient>) {
        let outcome = match rx.recv() {
            Some(outcome) => outcome,
            None => {
                log::trace!("body {}: control went away unwritten", self.inode);
                return;
            }
        };

        // A panic in the round-trip must still land in the error slot and
        // raise readiness, or every reader would park forever.
        let result = panic::catch_unwind(AssertUnwindSafe(|| match outcome {
            Ok(spec) => {
                log::debug!("body {}: {} {}", self.inode, spec.method, spec.url);
                fetch(client.as_ref(), &spec)
            }
            Err(parse) => Err(parse.to_string()),
        }))
        .unwrap_or_else(|payload| Err(panic_text(payload)));

        if let Ok(mut response) = self.response.lock() {
            *response = Some(result);
        }
        self.ready.set();
        log::debug!("body {}: ready", self.inode);
    }

    /// Whether the round-trip has completed (successfully or not).
    pub fn is_ready(&self) -> bool {
        self.ready.is_set()
    }

    /// Block until the response is buffered, then return it.
    pub fn wait_body(&self, intr: &CancelToken) -> Result<Bytes, FsError> {
        self.ready.wait(intr)?;
        let response = self
            .response
            .lock()
            .map_err(|e| FsError::io(format!("lock error: {}", e)))?;
        match response.as_ref() {
            Some(Ok(body)) => Ok(body.clone()),
            Some(Err(message)) => Err(FsError::io(message)),
            None => Err(FsError::io("response worker finished without a result")),
        }
    }
}

/// Execute the request and drain the response stream.
fn fetch(client: &dyn HttpClient, spec: &apifs_api::RequestSpec) -> Result<Bytes, String> {
    let mut stream = client.execute(spec).map_err(|e| e.to_string())?;
    let mut buf = Vec::new();
    stream.read_to_end(&mut buf).map_err(|e| e.to_string())?;
    Ok(Bytes::from(buf))
}

fn panic_text(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        format!("worker panicked: {}", text)
    } else if let Some(text) = payload.downcast_ref::<String>() {
        format!("worker panicked: {}", text)
    } else {
        "worker panicked".to_string()
    }
}

impl FileNode for BodyFile {
    fn attr(&self) -> Attr {
        Attr::file(self.inode, 0, 0o555)
    }

    fn open(self: Arc<Self>) -> Result<OpenFile, FsError> {
        Ok(OpenFile::direct(Box::new(BodyHandle { file: self })).with_blocking_reads())
    }
}

struct BodyHandle {
    file: Arc<BodyFile>,
}

impl FileHandle for BodyHandle {
    fn read(&self, offset: u64, size: u32, intr: &CancelToken) -> Result<Bytes, FsError> {
        let body = self.file.wait_body(intr)?;
        let len = body.len() as u64;
        if offset >= len {
            return Ok(Bytes::new());
        }
        let end = len.min(offset + u64::from(size));
        Ok(body.slice(offset as usize..end as usize))
    }

    fn read_all(&self, intr: &CancelToken) -> Result<Bytes, FsError> {
        self.file.wait_body(intr)
    }
}
