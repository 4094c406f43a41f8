//! End-to-end scenarios from spec.md §8, run against real `UdpTransport`
//! instances on loopback, one thread per node — the same shape as the
//! teacher's `examples/simulate.rs` (thread-per-node + a startup `Barrier`).
//! S4 (chosen-value adoption), S5 (leader election), and S6 (fast-path loss
//! rescue) are covered by `#[cfg(test)]` unit tests in `paxos.rs`/
//! `election.rs`/`dispatcher.rs` instead, since they need to inject a
//! specific prior acceptor state or drop one specific datagram — easier to
//! express against an in-memory mock than by racing real sockets.

mod common;

use std::sync::{Arc, Barrier};
use std::thread;

use paxos_ring::host::HostTable;
use paxos_ring::node::{run_client_with_transport, run_consensus_node_with_transport};
use paxos_ring::transport::{Transport, UdpTransport};

/// Binds every entry in `table` to its own `UdpTransport<i64>` up front, so
/// no node starts sending before every socket in the run exists.
fn bind_all(table: &HostTable) -> Vec<Arc<dyn Transport<i64>>> {
    table
        .entries
        .iter()
        .map(|e| Arc::new(UdpTransport::<i64>::new(e.port)) as Arc<dyn Transport<i64>>)
        .collect()
}

/// S1 — single proposer, no loss.
#[test]
fn single_proposer_no_loss() {
    // 1 proposer (uid 0), 3 acceptors (1..3), 1 learner (4), 1 client (5).
    let table = common::make_table(1, 3, 1, 1);
    let transports = bind_all(&table);
    let barrier = Arc::new(Barrier::new(table.len()));

    let mut handles = Vec::new();
    for uid in 0..5 {
        let table = table.clone();
        let transport = transports[uid].clone();
        let barrier = barrier.clone();
        handles.push(thread::spawn(move || {
            barrier.wait();
            run_consensus_node_with_transport(uid, table, transport);
        }));
    }

    let client_table = table.clone();
    let client_transport = transports[5].clone();
    let client_barrier = barrier.clone();
    let client = thread::spawn(move || {
        client_barrier.wait();
        run_client_with_transport(5, 42i64, 0, client_table, client_transport)
    });

    let decided = client.join().expect("client thread panicked");
    assert_eq!(decided, 42);

    for h in handles {
        h.join().expect("consensus node thread panicked");
    }
}

/// S2 — two clients targeting the same proposer must see the same decision.
#[test]
fn two_clients_same_proposer_agree() {
    // 1 proposer (uid 0), 3 acceptors (1..3), 1 learner (4), clients 5 and 6.
    let table = common::make_table(1, 3, 1, 2);
    let transports = bind_all(&table);
    let barrier = Arc::new(Barrier::new(table.len()));

    let mut handles = Vec::new();
    for uid in 0..5 {
        let table = table.clone();
        let transport = transports[uid].clone();
        let barrier = barrier.clone();
        handles.push(thread::spawn(move || {
            barrier.wait();
            run_consensus_node_with_transport(uid, table, transport);
        }));
    }

    let mut client_handles = Vec::new();
    for (uid, value) in [(5usize, 7i64), (6usize, 9i64)] {
        let table = table.clone();
        let transport = transports[uid].clone();
        let barrier = barrier.clone();
        client_handles.push(thread::spawn(move || {
            barrier.wait();
            run_client_with_transport(uid, value, 0, table, transport)
        }));
    }

    let decisions: Vec<i64> = client_handles
        .into_iter()
        .map(|h| h.join().expect("client thread panicked"))
        .collect();

    assert_eq!(decisions[0], decisions[1]);
    assert!(decisions[0] == 7 || decisions[0] == 9);

    for h in handles {
        h.join().expect("consensus node thread panicked");
    }
}

/// S3 — competing proposers must still converge on exactly one value.
#[test]
fn competing_proposers_converge_on_one_value() {
    // 2 proposers (0,1), 3 acceptors (2..4), 1 learner (5), clients 6 and 7,
    // each targeting a different proposer so both ballots race concurrently.
    let table = common::make_table(2, 3, 1, 2);
    let transports = bind_all(&table);
    let barrier = Arc::new(Barrier::new(table.len()));

    let mut handles = Vec::new();
    for uid in 0..6 {
        let table = table.clone();
        let transport = transports[uid].clone();
        let barrier = barrier.clone();
        handles.push(thread::spawn(move || {
            barrier.wait();
            run_consensus_node_with_transport(uid, table, transport);
        }));
    }

    let mut client_handles = Vec::new();
    for (uid, value, proposer_hint) in [(6usize, 5i64, 0usize), (7usize, 6i64, 1usize)] {
        let table = table.clone();
        let transport = transports[uid].clone();
        let barrier = barrier.clone();
        client_handles.push(thread::spawn(move || {
            barrier.wait();
            run_client_with_transport(uid, value, proposer_hint, table, transport)
        }));
    }

    let decisions: Vec<i64> = client_handles
        .into_iter()
        .map(|h| h.join().expect("client thread panicked"))
        .collect();

    assert_eq!(decisions[0], decisions[1], "learners must observe exactly one decision");
    assert!(decisions[0] == 5 || decisions[0] == 6);

    for h in handles {
        h.join().expect("consensus node thread panicked");
    }
}
