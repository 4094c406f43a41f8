//! Chang-Roberts leader election over the ring of consensus nodes (spec.md
//! §4.3). Grounded on `examples/original_source/paxos/consensus.py`'s
//! `ChangRoberts`/`ChangRobertsListener`, translated into a blocking function
//! with a scoped listener thread instead of a field-mutating background
//! thread plus a busy-wait on `self.leader_is_chosen`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use log::{debug, info};

use crate::host::HostEntry;
use crate::message::{Message, Token};
use crate::transport::Transport;

/// How long a node waits before sending its opening token, so every ring
/// member's listener has a chance to be armed first (spec.md §5).
const SETTLING_DELAY: Duration = Duration::from_millis(50);

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum Color {
    Red,
    Black,
}

/// Runs Chang-Roberts to completion and returns whether this node is the
/// elected coordinator (spec.md §4.3: "exactly one node sees `j = i`, the
/// one with the globally largest uid"). Blocks until every ring member has
/// seen the `TOKEN("TERM")` broadcast, including the winner itself.
pub fn run_chang_roberts<T>(
    uid: usize,
    con_nodes: &[HostEntry],
    transport: Arc<dyn Transport<T>>,
) -> bool
where
    T: Send + Sync + 'static,
{
    let ring_len = con_nodes.len();
    assert!(ring_len > 0, "Chang-Roberts requires at least one consensus node");

    let successor = &con_nodes[(uid + 1) % ring_len];

    let color = Arc::new(Mutex::new(Color::Red));
    let is_leader = Arc::new(AtomicBool::new(false));
    let leader_chosen = Arc::new(AtomicBool::new(false));

    let listener = {
        let color = color.clone();
        let is_leader = is_leader.clone();
        let leader_chosen = leader_chosen.clone();
        let con_nodes = con_nodes.to_vec();
        let transport = transport.clone();

        thread::spawn(move || {
            let successor = &con_nodes[(uid + 1) % ring_len];

            loop {
                let msg = loop {
                    if let Some(m) = transport.recv() {
                        break m;
                    }
                };

                let token = match msg {
                    Message::Token(t) => t,
                    _ => {
                        debug!("node {} ignoring non-token message during election", uid);
                        continue;
                    }
                };

                match token {
                    Token::Term => {
                        leader_chosen.store(true, Ordering::SeqCst);
                        return;
                    }
                    Token::Candidate(j) => {
                        let mut c = color.lock().expect("election color lock poisoned");
                        if *c == Color::Black {
                            transport.send(successor, &Message::Token(Token::Candidate(j)));
                        } else if j < uid {
                            // The token dies here.
                        } else if j > uid {
                            *c = Color::Black;
                            transport.send(successor, &Message::Token(Token::Candidate(j)));
                        } else {
                            info!("node {} is the leader", uid);
                            is_leader.store(true, Ordering::SeqCst);
                            leader_chosen.store(true, Ordering::SeqCst);
                            for peer in &con_nodes {
                                transport.send(peer, &Message::Token(Token::Term));
                            }
                            return;
                        }
                    }
                }
            }
        })
    };

    thread::sleep(SETTLING_DELAY);
    transport.send(successor, &Message::Token(Token::Candidate(uid)));

    listener.join().expect("election listener thread panicked");

    is_leader.load(Ordering::SeqCst)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::HostKind;
    use std::collections::VecDeque;

    fn entry(uid: usize) -> HostEntry {
        HostEntry {
            uid,
            host: "127.0.0.1".to_string(),
            port: 9000 + uid as u16,
            kind: HostKind::Con,
        }
    }

    /// An in-process ring transport: `send` enqueues onto the recipient's
    /// inbox, `recv` pops from this node's own inbox. Lets the election unit
    /// tests run without real sockets.
    struct RingTransport {
        uid: usize,
        inboxes: Vec<Arc<Mutex<VecDeque<Message<i64>>>>>,
    }

    impl Transport<i64> for RingTransport {
        fn send(&self, to: &HostEntry, msg: &Message<i64>) {
            self.inboxes[to.uid].lock().unwrap().push_back(msg.clone());
        }

        fn recv(&self) -> Option<Message<i64>> {
            loop {
                if let Some(m) = self.inboxes[self.uid].lock().unwrap().pop_front() {
                    return Some(m);
                }
                thread::yield_now();
            }
        }
    }

    #[test]
    fn highest_uid_wins_a_five_node_ring() {
        let con_nodes: Vec<HostEntry> = (0..5).map(entry).collect();
        let inboxes: Vec<_> = (0..5)
            .map(|_| Arc::new(Mutex::new(VecDeque::new())))
            .collect();

        let handles: Vec<_> = (0..5)
            .map(|uid| {
                let con_nodes = con_nodes.clone();
                let inboxes = inboxes.clone();
                thread::spawn(move || {
                    let transport: Arc<dyn Transport<i64>> =
                        Arc::new(RingTransport { uid, inboxes });
                    run_chang_roberts(uid, &con_nodes, transport)
                })
            })
            .collect();

        let results: Vec<bool> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(results.iter().filter(|&&b| b).count(), 1);
        assert!(results[4]);
        for (uid, &is_leader) in results.iter().enumerate().take(4) {
            assert!(!is_leader, "node {} should not be leader", uid);
        }
    }

    #[test]
    fn single_node_ring_elects_itself() {
        let con_nodes = vec![entry(0)];
        let inbox = Arc::new(Mutex::new(VecDeque::new()));
        let transport: Arc<dyn Transport<i64>> = Arc::new(RingTransport {
            uid: 0,
            inboxes: vec![inbox],
        });

        assert!(run_chang_roberts(0, &con_nodes, transport));
    }
}
