//! The Proposer/Acceptor/Learner state machines (spec.md §4.6, Phases
//! 1a-3). One node type per role, each owning its own `Dispatcher` — the
//! "tagged variants" shape spec.md §9's design notes call for, inherited
//! directly from the teacher's `Proposer<T>`/`Acceptor<T>`/`Learner<T>`
//! split in `multi_paxos.rs`. Unlike the teacher, there is exactly one Paxos
//! instance per process (spec.md is single-decree, not multi-Paxos), so the
//! per-instance `HashMap<usize, ProposerState<T>>` collapses to flat fields.

use std::fmt::Debug;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use log::{debug, info, warn};
use rand::Rng;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::dispatcher::Dispatcher;
use crate::host::HostEntry;
use crate::message::{Accept, AcceptValue, Ack, Fwd, Learn, Message, Nack, Proposal};
use crate::transport::{multicast, Transport};

/// Bound satisfied by every value type this crate agrees on (spec.md §3).
pub trait PaxosValue:
    Serialize + DeserializeOwned + Copy + Clone + Debug + PartialEq + Send + Sync + 'static
{
}

impl<T> PaxosValue for T where
    T: Serialize + DeserializeOwned + Copy + Clone + Debug + PartialEq + Send + Sync + 'static
{
}

/// Implemented by every role's node type; `run` drives the role's receive
/// loop until a `TERM` is observed, then returns (spec.md §4.7 — the actual
/// process exit happens in the binary, right after `run` returns).
pub trait Runnable {
    fn run(self);
}

fn majority_of(n: usize) -> usize {
    n / 2 + 1
}

/// The Proposer role (spec.md §4.6 Phase 1a/2a).
pub struct Proposer<T: PaxosValue> {
    uid: usize,
    host_count: usize,
    host_lookup: Box<dyn Fn(usize) -> HostEntry + Send>,
    next_seq: usize,
    acceptors: Option<Vec<HostEntry>>,
    acks_received: Vec<Ack<T>>,
    // The ghost list fed by the ACCEPT-VALUE fast path (spec.md §4.2, §5).
    acceptances: Arc<Mutex<Vec<(T, usize)>>>,
    backoff: bool,
    last_value: Option<T>,
    transport: Arc<dyn Transport<T>>,
    dispatcher: Dispatcher<T>,
}

impl<T: PaxosValue> Proposer<T> {
    pub fn new(
        uid: usize,
        host_count: usize,
        host_lookup: impl Fn(usize) -> HostEntry + Send + 'static,
        transport: Arc<dyn Transport<T>>,
    ) -> Self {
        Self::with_backoff(uid, host_count, host_lookup, transport, false)
    }

    /// `backoff = true` enables the opt-in Nack-triggered re-`FWD` delay
    /// (spec.md §4.6: "configuration knob only", off by default).
    pub fn with_backoff(
        uid: usize,
        host_count: usize,
        host_lookup: impl Fn(usize) -> HostEntry + Send + 'static,
        transport: Arc<dyn Transport<T>>,
        backoff: bool,
    ) -> Self {
        let acceptances = Arc::new(Mutex::new(Vec::new()));
        let fast_path_acceptances = acceptances.clone();

        let fast_path = Box::new(move |msg: &Message<T>| {
            if let Message::AcceptValue(AcceptValue { v, n, .. }) = msg {
                fast_path_acceptances.lock().expect("ghost list poisoned").push((*v, *n));
                true
            } else {
                false
            }
        });

        let dispatcher = Dispatcher::spawn(transport.clone(), Some(fast_path));

        Proposer {
            uid,
            host_count,
            host_lookup: Box::new(host_lookup),
            // Ballots are drawn from this proposer's disjoint arithmetic
            // progression uid, uid+N, uid+2N, ... (spec.md §3, invariant 3).
            next_seq: uid,
            acceptors: None,
            acks_received: Vec::new(),
            acceptances,
            backoff,
            last_value: None,
            transport,
            dispatcher,
        }
    }

    fn majority(&self) -> usize {
        majority_of(self.acceptors.as_ref().map(Vec::len).unwrap_or(0))
    }

    fn handle_start(&mut self, start: &crate::message::Start) {
        self.acceptors = Some(start.acceptors.iter().map(|&uid| (self.host_lookup)(uid)).collect());
    }

    fn handle_fwd(&mut self, fwd: Fwd<T>) {
        let acceptors = match &self.acceptors {
            Some(a) => a,
            None => {
                warn!("proposer {} dropping FWD received before START", self.uid);
                return;
            }
        };

        let n = self.next_seq;
        self.next_seq += self.host_count;
        self.last_value = Some(fwd.value);

        debug!("proposer {} starting ballot {} for {:?}", self.uid, n, fwd.value);

        let msg = Message::Proposal(Proposal {
            value: fwd.value,
            n,
            sender_uid: self.uid,
        });

        let refs: Vec<&HostEntry> = acceptors.iter().collect();
        multicast(self.transport.as_ref(), &refs, &msg);
    }

    fn handle_ack(&mut self, ack: Ack<T>) {
        let acceptors = match &self.acceptors {
            Some(a) => a.clone(),
            None => {
                warn!("proposer {} dropping ACK received before START", self.uid);
                return;
            }
        };

        let triggering_n1 = ack.n1;
        self.acks_received.push(ack);

        let matching = self
            .acks_received
            .iter()
            .filter(|a| a.n1 == triggering_n1 || a.n2 == Some(triggering_n1))
            .count();

        if matching < self.majority() {
            return;
        }

        info!("proposer {} reached majority of acks for ballot {}", self.uid, triggering_n1);

        let (v, n) = {
            let ghost = self.acceptances.lock().expect("ghost list poisoned");
            match ghost.iter().max_by_key(|&&(_, n)| n) {
                Some(&(v, n)) => (v, n),
                None => {
                    // Ties on `n1` keep the first ack seen, matching the
                    // original's `acks[0]` (consensus.py:426-429) rather than
                    // `max_by_key`'s last-wins behavior.
                    let highest = self
                        .acks_received
                        .iter()
                        .fold(None::<&Ack<T>>, |best, a| match best {
                            Some(b) if b.n1 >= a.n1 => Some(b),
                            _ => Some(a),
                        })
                        .expect("acks_received is non-empty, just pushed to it");
                    (highest.v, triggering_n1)
                }
            }
        };

        let msg = Message::Accept(Accept {
            v,
            n,
            sender_uid: self.uid,
        });
        let refs: Vec<&HostEntry> = acceptors.iter().collect();
        multicast(self.transport.as_ref(), &refs, &msg);
    }

    /// Optional re-forward-to-self path (spec.md §4.6: "Proposer dueling",
    /// a configuration knob off by default). The jitter comes from `rand`
    /// so concurrently-dueling proposers don't re-forward in lockstep.
    fn handle_nack(&mut self, nack: Nack) {
        if !self.backoff {
            return;
        }

        let value = match self.last_value {
            Some(v) => v,
            None => return,
        };

        let jitter = {
            let mut rng = rand::thread_rng();
            Duration::from_millis(rng.gen_range(10, 100))
        };

        debug!(
            "proposer {} backing off {:?} after NACK from {} (conflicting ballot {})",
            self.uid, jitter, nack.sender_uid, nack.v_rnd
        );
        thread::sleep(jitter);

        let self_entry = (self.host_lookup)(self.uid);
        self.transport.send(
            &self_entry,
            &Message::Fwd(Fwd {
                value,
                sender_uid: self.uid,
            }),
        );
    }
}

impl<T: PaxosValue> Runnable for Proposer<T> {
    fn run(mut self) {
        loop {
            match self.dispatcher.recv_next() {
                Message::Start(start) => self.handle_start(&start),
                Message::Fwd(fwd) => self.handle_fwd(fwd),
                Message::Ack(ack) => self.handle_ack(ack),
                Message::Nack(nack) => self.handle_nack(nack),
                Message::Term => return,
                other => debug!("proposer {} ignoring unexpected message {:?}", self.uid, other),
            }
        }
    }
}

/// The Acceptor role (spec.md §4.6 Phase 1b/2b).
pub struct Acceptor<T: PaxosValue> {
    uid: usize,
    host_lookup: Box<dyn Fn(usize) -> HostEntry + Send>,
    promises_made: Vec<(T, usize)>,
    acceptances: Vec<(T, usize)>,
    proposers: Option<Vec<HostEntry>>,
    learners: Option<Vec<HostEntry>>,
    transport: Arc<dyn Transport<T>>,
    dispatcher: Dispatcher<T>,
}

impl<T: PaxosValue> Acceptor<T> {
    pub fn new(
        uid: usize,
        host_lookup: impl Fn(usize) -> HostEntry + Send + 'static,
        transport: Arc<dyn Transport<T>>,
    ) -> Self {
        let dispatcher = Dispatcher::spawn(transport.clone(), None);

        Acceptor {
            uid,
            host_lookup: Box::new(host_lookup),
            promises_made: Vec::new(),
            acceptances: Vec::new(),
            proposers: None,
            learners: None,
            transport,
            dispatcher,
        }
    }

    fn handle_start(&mut self, start: &crate::message::Start) {
        self.proposers = Some(start.proposers.iter().map(|&uid| (self.host_lookup)(uid)).collect());
        self.learners = Some(start.learners.iter().map(|&uid| (self.host_lookup)(uid)).collect());
    }

    /// Phase 1b: promise, or refuse with a `Nack` (spec.md §4.6; §9 open
    /// question 2 — the reply address is resolved from `sender_uid` here,
    /// before branching, rather than only in the promise branch).
    fn handle_proposal(&mut self, proposal: Proposal<T>) {
        let sender = (self.host_lookup)(proposal.sender_uid);

        if let Some(&(_, highest)) = self.promises_made.iter().max_by_key(|&&(_, m)| m) {
            if highest > proposal.n {
                self.transport.send(
                    &sender,
                    &Message::Nack(Nack {
                        v_rnd: highest,
                        sender_uid: self.uid,
                        receiver_uid: proposal.sender_uid,
                    }),
                );
                return;
            }
        }

        let (v, n2) = match self.acceptances.iter().max_by_key(|&&(_, n)| n) {
            Some(&(v_star, n_star)) => {
                self.promises_made.push((v_star, n_star));
                (v_star, Some(n_star))
            }
            None => {
                self.promises_made.push((proposal.value, proposal.n));
                (proposal.value, None)
            }
        };

        self.transport.send(
            &sender,
            &Message::Ack(Ack {
                n1: proposal.n,
                v,
                n2,
                sender_uid: self.uid,
                receiver_uid: proposal.sender_uid,
            }),
        );
    }

    /// Phase 2b: accept, or reject silently (spec.md §4.6).
    fn handle_accept(&mut self, accept: Accept<T>) {
        if let Some(&(_, highest)) = self.promises_made.iter().max_by_key(|&&(_, m)| m) {
            if highest > accept.n {
                debug!("acceptor {} rejecting stale ACCEPT at ballot {}", self.uid, accept.n);
                return;
            }
        }

        self.acceptances.push((accept.v, accept.n));

        let proposers = self.proposers.as_ref().expect("START processed before ACCEPT");
        let learners = self.learners.as_ref().expect("START processed before ACCEPT");

        let ghost = Message::AcceptValue(AcceptValue {
            v: accept.v,
            n: accept.n,
            sender_uid: self.uid,
        });
        let refs: Vec<&HostEntry> = proposers.iter().collect();
        multicast(self.transport.as_ref(), &refs, &ghost);

        let learn = Message::Learn(Learn {
            v: accept.v,
            n: accept.n,
            sender_uid: self.uid,
        });
        let refs: Vec<&HostEntry> = learners.iter().collect();
        multicast(self.transport.as_ref(), &refs, &learn);
    }
}

impl<T: PaxosValue> Runnable for Acceptor<T> {
    fn run(mut self) {
        loop {
            match self.dispatcher.recv_next() {
                Message::Start(start) => self.handle_start(&start),
                Message::Proposal(proposal) => {
                    if self.proposers.is_none() {
                        warn!("acceptor {} dropping PROPOSAL received before START", self.uid);
                        continue;
                    }
                    self.handle_proposal(proposal)
                }
                Message::Accept(accept) => {
                    if self.proposers.is_none() {
                        warn!("acceptor {} dropping ACCEPT received before START", self.uid);
                        continue;
                    }
                    self.handle_accept(accept)
                }
                Message::Term => return,
                other => debug!("acceptor {} ignoring unexpected message {:?}", self.uid, other),
            }
        }
    }
}

/// The Learner role (spec.md §4.6 Phase 3).
pub struct Learner<T: PaxosValue> {
    uid: usize,
    acceptances: Vec<(T, usize)>,
    acceptor_count: Option<usize>,
    clients: Vec<HostEntry>,
    decided: Option<T>,
    transport: Arc<dyn Transport<T>>,
    dispatcher: Dispatcher<T>,
}

impl<T: PaxosValue> Learner<T> {
    /// `clients` is resolved once at construction from the host table's
    /// client entries (spec.md §3); unlike `proposers`/`acceptors`/`learners`
    /// this list never depends on role assignment, so there's no need to
    /// wait for `START` to learn it.
    pub fn new(uid: usize, clients: Vec<HostEntry>, transport: Arc<dyn Transport<T>>) -> Self {
        let dispatcher = Dispatcher::spawn(transport.clone(), None);

        Learner {
            uid,
            acceptances: Vec::new(),
            acceptor_count: None,
            clients,
            decided: None,
            transport,
            dispatcher,
        }
    }

    fn majority(&self) -> usize {
        majority_of(self.acceptor_count.unwrap_or(0))
    }

    fn handle_start(&mut self, start: &crate::message::Start) {
        self.acceptor_count = Some(start.acceptors.len());
    }

    /// Phase 3: count acceptances for `n`; deliver `SET(v)` once a majority
    /// is reached. Further `LEARN`s after a decision are idempotent (spec.md
    /// §4.6, §7, invariant 4/5).
    fn handle_learn(&mut self, learn: Learn<T>) {
        self.acceptances.push((learn.v, learn.n));

        let matching = self.acceptances.iter().filter(|&&(_, n)| n == learn.n).count();
        if matching < self.majority() {
            return;
        }

        if let Some(decided) = self.decided {
            assert_eq!(
                decided, learn.v,
                "learner {} re-decided a different value for the same run",
                self.uid
            );
        } else {
            info!("learner {} decided {:?}", self.uid, learn.v);
            self.decided = Some(learn.v);
        }

        let msg = Message::Set(crate::message::Set { v: learn.v });
        let refs: Vec<&HostEntry> = self.clients.iter().collect();
        multicast(self.transport.as_ref(), &refs, &msg);
    }
}

impl<T: PaxosValue> Runnable for Learner<T> {
    fn run(mut self) {
        loop {
            match self.dispatcher.recv_next() {
                Message::Start(start) => self.handle_start(&start),
                Message::Learn(learn) => {
                    if self.acceptor_count.is_none() {
                        warn!("learner {} dropping LEARN received before START", self.uid);
                        continue;
                    }
                    self.handle_learn(learn)
                }
                Message::Term => return,
                other => debug!("learner {} ignoring unexpected message {:?}", self.uid, other),
            }
        }
    }
}
