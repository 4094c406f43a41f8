//! The client edge (spec.md §4.5). Grounded on
//! `examples/original_source/paxos/client.py`: bind, wait for `START`,
//! forward the value to the hinted proposer, wait for the decision, print
//! it, then tear the whole run down with a `TERM` broadcast.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use log::{debug, info};

use crate::host::{HostEntry, HostTable};
use crate::message::{Fwd, Message, Start};
use crate::paxos::PaxosValue;
use crate::transport::{multicast, Transport};

/// Gives every consensus node's own `START` handling a head start before the
/// client's `FWD` lands (spec.md §5, §9: bootstrap race).
const SETTLING_DELAY: Duration = Duration::from_millis(50);

/// Gives the `SET` reply time to reach every other client before this one's
/// `TERM` broadcast starts tearing down sockets (spec.md §4.7, §5).
const DRAIN_DELAY: Duration = Duration::from_millis(50);

pub struct Client<T: PaxosValue> {
    uid: usize,
    value: T,
    proposer_hint: usize,
    table: HostTable,
    transport: Arc<dyn Transport<T>>,
}

impl<T: PaxosValue> Client<T> {
    pub fn new(
        uid: usize,
        value: T,
        proposer_hint: usize,
        table: HostTable,
        transport: Arc<dyn Transport<T>>,
    ) -> Self {
        Client {
            uid,
            value,
            proposer_hint,
            table,
            transport,
        }
    }

    /// Runs this client's entire, single-shot lifecycle and returns the
    /// decided value once `TERM` has been sent. The binary calls
    /// `std::process::exit(0)` right after (spec.md §4.7).
    pub fn run(self) -> T {
        let start = self.await_start();
        let target_uid = start.proposers[self.proposer_hint % start.proposers.len()];
        let target = self.table.get(target_uid).clone();

        thread::sleep(SETTLING_DELAY);

        debug!("client {} forwarding value to proposer {}", self.uid, target_uid);
        self.transport.send(
            &target,
            &Message::Fwd(Fwd {
                value: self.value,
                sender_uid: self.uid,
            }),
        );

        let decided = self.await_decision();
        println!("{:?}", decided);
        info!("client {} learned decided value {:?}", self.uid, decided);

        thread::sleep(DRAIN_DELAY);

        let refs: Vec<&HostEntry> = self.table.entries.iter().collect();
        multicast(self.transport.as_ref(), &refs, &Message::Term);

        decided
    }

    fn await_start(&self) -> Start {
        loop {
            match self.transport.recv() {
                Some(Message::Start(start)) => return start,
                Some(other) => debug!("client {} ignoring {:?} while awaiting START", self.uid, other),
                None => continue,
            }
        }
    }

    fn await_decision(&self) -> T {
        loop {
            match self.transport.recv() {
                Some(Message::Set(set)) => return set.v,
                Some(other) => debug!("client {} ignoring {:?} while awaiting SET", self.uid, other),
                None => continue,
            }
        }
    }
}
