//! The listener/queue-worker plumbing from spec.md §4.2 and §5: one listener
//! thread appends to a shared FIFO under a mutex, one worker thread drains it
//! and routes by header. A message tagged `ACCEPT-VALUE` can instead be
//! handled directly by the listener thread via an optional fast path,
//! bypassing the queue (spec.md §4.2's rationale: the ghost message must not
//! queue behind slow work).

use std::collections::VecDeque;
use std::fmt::Debug;
use std::sync::{Arc, Mutex};
use std::thread;
use std::thread::JoinHandle;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::message::Message;
use crate::transport::Transport;

type FastPath<T> = Box<dyn Fn(&Message<T>) -> bool + Send>;

/// Owns the ingress queue and the listener thread that feeds it. The worker
/// side (`recv_next`) is driven by the caller's own loop, so each role's
/// `Runnable::run` reads naturally top-to-bottom, matching the teacher's
/// `Proposer::run`/`Acceptor::run`/`Learner::run` shape.
pub struct Dispatcher<T> {
    queue: Arc<Mutex<VecDeque<Message<T>>>>,
    listener: Option<JoinHandle<()>>,
}

impl<T> Dispatcher<T>
where
    T: Serialize + DeserializeOwned + Clone + Debug + Send + Sync + 'static,
{
    /// Spawns the listener thread. `fast_path`, if given, is tried first on
    /// every received message; when it returns `true` the message is
    /// considered fully handled and never enters the queue (spec.md §4.2's
    /// `ACCEPT-VALUE` bypass — only the Proposer wires one up).
    pub fn spawn(transport: Arc<dyn Transport<T>>, fast_path: Option<FastPath<T>>) -> Self {
        let queue: Arc<Mutex<VecDeque<Message<T>>>> = Arc::new(Mutex::new(VecDeque::new()));
        let queue_for_listener = queue.clone();

        let listener = thread::spawn(move || loop {
            let msg = match transport.recv() {
                Some(m) => m,
                // Deserialize failure: already logged by the transport. Drop
                // and continue listening (spec.md §7).
                None => continue,
            };

            let handled = fast_path.as_ref().map(|f| f(&msg)).unwrap_or(false);
            if handled {
                continue;
            }

            let mut q = queue_for_listener.lock().expect("dispatcher queue poisoned");
            q.push_back(msg);
        });

        Dispatcher {
            queue,
            listener: Some(listener),
        }
    }

    /// Pops the next queued message, blocking (via a short busy-wait) until
    /// one is available. There is no condition variable here because the
    /// queue is only ever touched by this dispatcher's own listener thread
    /// and the single worker calling this method (spec.md §5: "exactly one
    /// worker mutates per-node state").
    pub fn recv_next(&self) -> Message<T> {
        loop {
            {
                let mut q = self.queue.lock().expect("dispatcher queue poisoned");
                if let Some(msg) = q.pop_front() {
                    return msg;
                }
            }
            thread::yield_now();
        }
    }
}

impl<T> Drop for Dispatcher<T> {
    fn drop(&mut self) {
        // The listener thread never exits on its own (it loops on
        // transport.recv() forever); a process that reaches here is already
        // on its way out via TERM (spec.md §4.7), so we don't join it.
        let _ = self.listener.take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{Message, Set};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// A transport that replays a fixed, pre-seeded sequence of messages,
    /// used to exercise the dispatcher without real sockets.
    struct ScriptedTransport {
        messages: Mutex<VecDeque<Message<i64>>>,
    }

    impl Transport<i64> for ScriptedTransport {
        fn send(&self, _to: &crate::host::HostEntry, _msg: &Message<i64>) {}

        fn recv(&self) -> Option<Message<i64>> {
            loop {
                if let Some(m) = self.messages.lock().unwrap().pop_front() {
                    return Some(m);
                }
                thread::yield_now();
            }
        }
    }

    #[test]
    fn queues_messages_in_order() {
        let transport = Arc::new(ScriptedTransport {
            messages: Mutex::new(VecDeque::from(vec![
                Message::Set(Set { v: 1i64 }),
                Message::Set(Set { v: 2i64 }),
            ])),
        });

        let dispatcher: Dispatcher<i64> = Dispatcher::spawn(transport, None);

        let first = dispatcher.recv_next();
        let second = dispatcher.recv_next();

        match (first, second) {
            (Message::Set(a), Message::Set(b)) => {
                assert_eq!(a.v, 1);
                assert_eq!(b.v, 2);
            }
            _ => panic!("expected two Set messages"),
        }
    }

    #[test]
    fn fast_path_bypasses_the_queue() {
        let transport = Arc::new(ScriptedTransport {
            messages: Mutex::new(VecDeque::from(vec![
                Message::Set(Set { v: 7i64 }),
                Message::Set(Set { v: 8i64 }),
            ])),
        });

        let seen = Arc::new(AtomicUsize::new(0));
        let seen_in_closure = seen.clone();

        let fast_path: FastPath<i64> = Box::new(move |msg| {
            if let Message::Set(Set { v }) = msg {
                if *v == 7 {
                    seen_in_closure.fetch_add(1, Ordering::SeqCst);
                    return true;
                }
            }
            false
        });

        let dispatcher: Dispatcher<i64> = Dispatcher::spawn(transport, Some(fast_path));

        // Only the second message should ever reach the queue.
        let next = dispatcher.recv_next();
        assert!(matches!(next, Message::Set(Set { v: 8 })));
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }
}
