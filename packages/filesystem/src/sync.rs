//! One-shot signalling primitives for the control → body handshake.
//!
//! Two single-fire shapes, deliberately distinct:
//!
//! * [`Mailbox`] carries the parsed specification from the control file to
//!   the body worker. It is a single-slot channel with non-blocking send:
//!   the first send while the receiver is live lands, everything after is
//!   dropped. The sender never waits.
//! * [`Latch`] announces body readiness. It is a set-once broadcast gate:
//!   every waiter, present or future, passes once it is set.

use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use apifs_node::{CancelToken, FsError};

struct MailboxState<T> {
    slot: Option<T>,
    senders: usize,
    receiver_gone: bool,
}

struct MailboxShared<T> {
    state: Mutex<MailboxState<T>>,
    cond: Condvar,
}

/// Create a connected sender/receiver pair.
pub fn mailbox<T>() -> (MailboxSender<T>, MailboxReceiver<T>) {
    let shared = Arc::new(MailboxShared {
        state: Mutex::new(MailboxState {
            slot: None,
            senders: 1,
            receiver_gone: false,
        }),
        cond: Condvar::new(),
    });
    (
        MailboxSender {
            shared: Arc::clone(&shared),
        },
        MailboxReceiver { shared },
    )
}

/// Sending half of a one-shot mailbox.
pub struct MailboxSender<T> {
    shared: Arc<MailboxShared<T>>,
}

impl<T> MailboxSender<T> {
    /// Deposit a value without blocking.
    ///
    /// Returns `true` if the value was accepted. The send is dropped when
    /// the slot is already occupied or the receiver has already consumed
    /// its value or gone away.
    pub fn try_send(&self, value: T) -> bool {
        let mut state = self.shared.state.lock().unwrap();
        if state.receiver_gone || state.slot.is_some() {
            return false;
        }
        state.slot = Some(value);
        self.shared.cond.notify_all();
        true
    }
}

impl<T> Clone for MailboxSender<T> {
    fn clone(&self) -> Self {
        self.shared.state.lock().unwrap().senders += 1;
        MailboxSender {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> Drop for MailboxSender<T> {
    fn drop(&mut self) {
        let mut state = self.shared.state.lock().unwrap();
        state.senders -= 1;
        if state.senders == 0 {
            self.shared.cond.notify_all();
        }
    }
}

/// Receiving half of a one-shot mailbox.
pub struct MailboxReceiver<T> {
    shared: Arc<MailboxShared<T>>,
}

impl<T> MailboxReceiver<T> {
    /// Park until a value arrives or every sender is gone.
    ///
    /// Consumes the receiver: a mailbox delivers at most one value.
    pub fn recv(self) -> Option<T> {
        let mut state = self.shared.state.lock().unwrap();
        loop {
            if let Some(value) = state.slot.take() {
                state.receiver_gone = true;
                return Some(value);
            }
            if state.senders == 0 {
                state.receiver_gone = true;
                return None;
            }
            state = self.shared.cond.wait(state).unwrap();
        }
    }
}

impl<T> Drop for MailboxReceiver<T> {
    fn drop(&mut self) {
        self.shared.state.lock().unwrap().receiver_gone = true;
    }
}

/// A set-once broadcast gate.
///
/// Waiters poll their cancellation token on a short cadence while parked,
/// so a cancelled caller leaves promptly without disturbing the latch.
pub struct Latch {
    set: Mutex<bool>,
    cond: Condvar,
}

const WAIT_POLL: Duration = Duration::from_millis(10);

impl Latch {
    pub fn new() -> Self {
        Latch {
            set: Mutex::new(false),
            cond: Condvar::new(),
        }
    }

    /// Raise the latch. Every current and future waiter passes.
    pub fn set(&self) {
        let mut set = self.set.lock().unwrap();
        *set = true;
        self.cond.notify_all();
    }

    pub fn is_set(&self) -> bool {
        *self.set.lock().unwrap()
    }

    /// Block until the latch is set or `intr` is cancelled.
    pub fn wait(&self, intr: &CancelToken) -> Result<(), FsError> {
        let mut set = self.set.lock().unwrap();
        loop {
            if *set {
                return Ok(());
            }
            if intr.is_cancelled() {
                return Err(FsError::Interrupted);
            }
            let (guard, _) = self.cond.wait_timeout(set, WAIT_POLL).unwrap();
            set = guard;
        }
    }
}

impl Default for Latch {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn mailbox_delivers_one_value() {
        let (tx, rx) = mailbox();
        assert!(tx.try_send(7));
        assert_eq!(rx.recv(), Some(7));
    }

    #[test]
    fn second_send_is_dropped_while_slot_full() {
        let (tx, rx) = mailbox();
        assert!(tx.try_send(1));
        assert!(!tx.try_send(2));
        assert_eq!(rx.recv(), Some(1));
    }

    #[test]
    fn send_after_consumption_is_dropped() {
        let (tx, rx) = mailbox();
        assert!(tx.try_send(1));
        assert_eq!(rx.recv(), Some(1));
        assert!(!tx.try_send(2));
    }

    #[test]
    fn send_after_receiver_drop_is_dropped() {
        let (tx, rx) = mailbox();
        drop(rx);
        assert!(!tx.try_send(1));
    }

    #[test]
    fn recv_unblocks_when_senders_are_gone() {
        let (tx, rx) = mailbox::<u32>();
        let waiter = thread::spawn(move || rx.recv());
        drop(tx);
        assert_eq!(waiter.join().unwrap(), None);
    }

    #[test]
    fn recv_waits_for_every_sender_clone() {
        let (tx, rx) = mailbox::<u32>();
        let extra = tx.clone();
        let waiter = thread::spawn(move || rx.recv());
        drop(tx);
        assert!(extra.try_send(11));
        assert_eq!(waiter.join().unwrap(), Some(11));
    }

    #[test]
    fn recv_sees_value_sent_before_it_parked() {
        let (tx, rx) = mailbox();
        assert!(tx.try_send(42));
        // Receiver arrives late; the slot holds the value for it.
        let waiter = thread::spawn(move || rx.recv());
        assert_eq!(waiter.join().unwrap(), Some(42));
    }

    #[test]
    fn latch_wait_passes_once_set() {
        let latch = Arc::new(Latch::new());
        let waiter = {
            let latch = Arc::clone(&latch);
            thread::spawn(move || latch.wait(&CancelToken::never()))
        };
        latch.set();
        assert!(waiter.join().unwrap().is_ok());
    }

    #[test]
    fn latch_wait_after_set_returns_immediately() {
        let latch = Latch::new();
        latch.set();
        assert!(latch.wait(&CancelToken::never()).is_ok());
        assert!(latch.is_set());
    }

    #[test]
    fn cancelled_wait_is_interrupted() {
        let latch = Latch::new();
        let token = CancelToken::new();
        token.cancel();
        assert_eq!(latch.wait(&token), Err(FsError::Interrupted));
    }

    #[test]
    fn cancellation_releases_a_parked_waiter() {
        let latch = Arc::new(Latch::new());
        let token = CancelToken::new();
        let waiter = {
            let latch = Arc::clone(&latch);
            let token = token.clone();
            thread::spawn(move || latch.wait(&token))
        };
        thread::sleep(Duration::from_millis(30));
        token.cancel();
        assert_eq!(waiter.join().unwrap(), Err(FsError::Interrupted));
        assert!(!latch.is_set());
    }
}
