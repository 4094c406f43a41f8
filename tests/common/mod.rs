//! Shared end-to-end test scaffolding: a free-loopback-port host table
//! builder, mirroring the teacher's `examples/simulate.rs` (one thread per
//! node, a `Barrier` so nobody sends before every socket is bound).

use std::net::UdpSocket;

use paxos_ring::host::{HostEntry, HostKind, HostTable};

/// Binds to an ephemeral port just to learn a free one, then releases it.
/// Good enough for a test process where nothing else is racing for ports.
pub fn free_port() -> u16 {
    UdpSocket::bind("127.0.0.1:0")
        .expect("could not bind an ephemeral port")
        .local_addr()
        .expect("bound socket has no local address")
        .port()
}

/// Builds a host table with `num_con` consensus nodes (uids `0..num_con`)
/// followed by `num_cli` clients (uids `num_con..num_con+num_cli`), each on
/// its own freshly allocated loopback port.
pub fn make_table(num_proposers: usize, num_acceptors: usize, num_learners: usize, num_cli: usize) -> HostTable {
    let num_con = num_proposers + num_acceptors + num_learners;
    let mut entries = Vec::with_capacity(num_con + num_cli);

    for uid in 0..num_con {
        entries.push(HostEntry {
            uid,
            host: "127.0.0.1".to_string(),
            port: free_port(),
            kind: HostKind::Con,
        });
    }
    for uid in num_con..num_con + num_cli {
        entries.push(HostEntry {
            uid,
            host: "127.0.0.1".to_string(),
            port: free_port(),
            kind: HostKind::Cli,
        });
    }

    HostTable {
        entries,
        num_proposers,
        num_acceptors,
        num_learners,
    }
}
