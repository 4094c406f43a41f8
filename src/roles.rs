//! Coordinator-side role partitioning and broadcast (spec.md §4.4).
//! Grounded on `examples/original_source/paxos/consensus.py::InitializeNode`,
//! translated to return data instead of mutating `self` in place, and to
//! resolve open question 1 (spec.md §9) explicitly instead of reproducing it
//! silently.

use std::sync::Arc;

use log::warn;

use crate::host::HostTable;
use crate::message::{Message, Role, RoleKind, Start};
use crate::transport::Transport;

/// The coordinator's partition of consensus UIDs into roles (spec.md §3,
/// invariant 5: "the reference design partitions consensus UIDs into
/// disjoint role sets by position in the host table").
#[derive(Debug, Clone)]
pub struct RolePartition {
    pub proposers: Vec<usize>,
    pub acceptors: Vec<usize>,
    pub learners: Vec<usize>,
}

/// Partitions the consensus UIDs in `table` into the first `num_proposers`
/// Proposers, next `num_acceptors` Acceptors, next `num_learners` Learners,
/// in ascending UID order. Per spec.md §9 open question 1, the coordinator
/// is always placed in `learners`, even if the configured counts didn't
/// already put it there; when that happens (the counts don't cover every
/// consensus UID) this is logged rather than silently accepted, since it
/// signals a host-table / count mismatch upstream.
pub fn assign_roles(coordinator_uid: usize, table: &HostTable) -> RolePartition {
    let con_nodes = table.con_nodes();
    let mut idx = 0;

    let mut proposers = Vec::with_capacity(table.num_proposers);
    for _ in 0..table.num_proposers {
        if let Some(host) = con_nodes.get(idx) {
            proposers.push(host.uid);
        }
        idx += 1;
    }

    let mut acceptors = Vec::with_capacity(table.num_acceptors);
    for _ in 0..table.num_acceptors {
        if let Some(host) = con_nodes.get(idx) {
            acceptors.push(host.uid);
        }
        idx += 1;
    }

    let mut learners = Vec::with_capacity(table.num_learners);
    for _ in 0..table.num_learners {
        if let Some(host) = con_nodes.get(idx) {
            learners.push(host.uid);
        }
        idx += 1;
    }

    if !learners.contains(&coordinator_uid) {
        warn!(
            "coordinator {} was not placed in the learner set by \
             proposers({})+acceptors({})+learners({}) over {} consensus nodes; \
             appending it as a learner per the reference behavior",
            coordinator_uid,
            table.num_proposers,
            table.num_acceptors,
            table.num_learners,
            con_nodes.len(),
        );
        learners.push(coordinator_uid);
    }

    RolePartition {
        proposers,
        acceptors,
        learners,
    }
}

/// Unicasts `ROLE(kind)` to every non-coordinator consensus UID in
/// `partition`, then multicasts `START` (as UID lists) to every host in the
/// table — consensus and client alike, including the coordinator itself,
/// which processes its own `START` through the same dispatcher code path as
/// everyone else (see DESIGN.md).
pub fn broadcast_roles<T>(
    coordinator_uid: usize,
    table: &HostTable,
    partition: &RolePartition,
    transport: &Arc<dyn Transport<T>>,
) {
    send_role(coordinator_uid, &partition.proposers, RoleKind::Proposer, table, transport);
    send_role(coordinator_uid, &partition.acceptors, RoleKind::Acceptor, table, transport);
    send_role(coordinator_uid, &partition.learners, RoleKind::Learner, table, transport);

    let start = Message::Start(Start {
        proposers: partition.proposers.clone(),
        acceptors: partition.acceptors.clone(),
        learners: partition.learners.clone(),
    });

    for host in &table.entries {
        transport.send(host, &start);
    }
}

fn send_role<T>(
    coordinator_uid: usize,
    uids: &[usize],
    kind: RoleKind,
    table: &HostTable,
    transport: &Arc<dyn Transport<T>>,
) {
    for &uid in uids {
        if uid == coordinator_uid {
            continue;
        }
        transport.send(table.get(uid), &Message::Role(Role { kind }));
    }
}
