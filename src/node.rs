//! Per-process bootstrap (spec.md §1, §3, §4.4): run the election, then
//! either assign roles (coordinator) or wait to be told one (everyone
//! else), then build and run the right role-tagged state machine. Houses
//! the blocking `run_consensus_node`/`run_client` entry points the two
//! binaries call into.

use std::sync::Arc;

use log::{debug, info};

use crate::client::Client;
use crate::election::run_chang_roberts;
use crate::host::{HostEntry, HostTable};
use crate::message::{Message, RoleKind};
use crate::paxos::{Acceptor, Learner, PaxosValue, Proposer, Runnable};
use crate::roles::{assign_roles, broadcast_roles, RolePartition};
use crate::transport::{Transport, UdpTransport};

/// Tracks bootstrap progress for logging only; no behavior branches on it
/// beyond the sequencing already expressed by this module's control flow
/// (spec.md §3: "a node is created by the driver, transitions UNINIT →
/// ELECTING → ROLED → RUNNING → TERMINATED").
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum NodeState {
    Uninit,
    Electing,
    Roled,
    Running,
}

/// Runs a consensus node (Proposer, Acceptor, or Learner, decided by this
/// function) to completion. Blocks until `TERM` is observed.
pub fn run_consensus_node<T: PaxosValue>(uid: usize, table: HostTable) {
    let port = table.get(uid).port;
    let transport: Arc<dyn Transport<T>> = Arc::new(UdpTransport::new(port));
    run_consensus_node_with_transport(uid, table, transport)
}

/// Same as `run_consensus_node`, but takes an already-bound transport. Lets
/// integration tests bind every node's socket before releasing any of them
/// to run, avoiding startup races on the ring.
pub fn run_consensus_node_with_transport<T: PaxosValue>(
    uid: usize,
    table: HostTable,
    transport: Arc<dyn Transport<T>>,
) {
    let mut state = NodeState::Uninit;

    state = NodeState::Electing;
    debug!("node {} entering {:?}", uid, state);
    let con_nodes: Vec<HostEntry> = table.con_nodes().into_iter().cloned().collect();
    let is_coordinator = run_chang_roberts(uid, &con_nodes, transport.clone());

    state = NodeState::Roled;
    debug!("node {} entering {:?}", uid, state);
    let role = if is_coordinator {
        info!("node {} elected coordinator", uid);
        let partition = assign_roles(uid, &table);
        broadcast_roles(uid, &table, &partition, &transport);
        role_kind_for(uid, &partition)
    } else {
        await_role(transport.as_ref(), uid)
    };

    state = NodeState::Running;
    info!("node {} running as {:?} ({:?})", uid, role, state);
    run_role(uid, role, table, transport);
}

/// Runs the client side of a run (spec.md §4.5). Blocks until `TERM` has
/// been sent, then returns the decided value.
pub fn run_client<T: PaxosValue>(uid: usize, value: T, proposer_hint: usize, table: HostTable) -> T {
    let port = table.get(uid).port;
    let transport: Arc<dyn Transport<T>> = Arc::new(UdpTransport::new(port));
    run_client_with_transport(uid, value, proposer_hint, table, transport)
}

/// Same as `run_client`, but takes an already-bound transport (see
/// `run_consensus_node_with_transport`).
pub fn run_client_with_transport<T: PaxosValue>(
    uid: usize,
    value: T,
    proposer_hint: usize,
    table: HostTable,
    transport: Arc<dyn Transport<T>>,
) -> T {
    Client::new(uid, value, proposer_hint, table, transport).run()
}

/// The coordinator already has its own partition in hand and never sends
/// itself a `ROLE` message (`roles::send_role` skips it); this picks the
/// slot it landed in with the same precedence a dual-assignment edge case
/// (spec.md §9 open question 1) would need to break a tie: Proposer, then
/// Acceptor, then Learner, which is always populated per the forced-append
/// rule in `roles::assign_roles`.
fn role_kind_for(uid: usize, partition: &RolePartition) -> RoleKind {
    if partition.proposers.contains(&uid) {
        RoleKind::Proposer
    } else if partition.acceptors.contains(&uid) {
        RoleKind::Acceptor
    } else {
        RoleKind::Learner
    }
}

/// The init-phase receive loop for non-coordinator consensus nodes: discard
/// anything but `ROLE` (stray election tokens, reordered traffic), per
/// spec.md §4.4.
fn await_role<T: PaxosValue>(transport: &dyn Transport<T>, uid: usize) -> RoleKind {
    loop {
        match transport.recv() {
            Some(Message::Role(role)) => return role.kind,
            Some(other) => debug!("node {} ignoring {:?} while awaiting ROLE", uid, other),
            None => continue,
        }
    }
}

fn run_role<T: PaxosValue>(uid: usize, role: RoleKind, table: HostTable, transport: Arc<dyn Transport<T>>) {
    let lookup_table = table.clone();
    let lookup = move |id: usize| lookup_table.get(id).clone();

    match role {
        RoleKind::Proposer => Proposer::new(uid, table.len(), lookup, transport).run(),
        RoleKind::Acceptor => Acceptor::new(uid, lookup, transport).run(),
        RoleKind::Learner => {
            let clients = table.cli_nodes().into_iter().cloned().collect();
            Learner::new(uid, clients, transport).run()
        }
    }
}
