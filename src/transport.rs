//! The opaque send/recv transport spec.md §1 and §4.1 describe. `Transport`
//! is the seam that lets the rest of the crate stay ignorant of UDP, bincode,
//! or sockets at all; `UdpTransport` is the one real implementation, and
//! tests substitute an in-memory `MockTransport` (see `tests/common.rs`).
//!
//! Grounded on the teacher's `net_node.rs`, generalized into a trait per
//! spec.md §1 ("the core consumes ... an opaque send/recv transport") and
//! switched from IP multicast group membership to plain per-recipient
//! unicast, since "multicast" throughout this spec means "send to each
//! recipient individually", not IP multicast (see DESIGN.md).

use std::fmt::Debug;
use std::marker::PhantomData;
use std::net::UdpSocket;

use bincode::{deserialize, serialize};
use log::warn;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::host::HostEntry;
use crate::message::Message;

/// Bound on a single datagram's payload (spec.md §6).
const MAX_DATAGRAM_SIZE: usize = 4096;

/// The seam between the Paxos core and the network. `send` is best-effort:
/// spec.md §4.1/§7 treat a dropped or failed send as silent. `recv` blocks
/// until a datagram arrives; a datagram that fails to deserialize is logged
/// and reported as `None` so the caller's loop can simply try again (spec.md
/// §7: "Deserialize fail → Drop packet; log; continue").
pub trait Transport<T>: Send + Sync {
    fn send(&self, to: &HostEntry, msg: &Message<T>);
    fn recv(&self) -> Option<Message<T>>;
}

/// Sends every recipient in `group` an individual unicast copy of `msg` —
/// this crate's notion of "multicast" (spec.md §4.4, §4.5, §4.6: "multicast
/// to all acceptors/learners/clients").
pub fn multicast<T>(transport: &dyn Transport<T>, group: &[&HostEntry], msg: &Message<T>) {
    for host in group {
        transport.send(host, msg);
    }
}

/// A UDP-backed `Transport`. One socket, bound once to this node's port,
/// used for both sending and receiving.
pub struct UdpTransport<T> {
    socket: UdpSocket,
    value: PhantomData<T>,
}

impl<T> UdpTransport<T>
where
    T: Serialize + DeserializeOwned + Clone + Debug,
{
    /// Binds to `0.0.0.0:port`. Bind failure is a fatal, process-start-time
    /// condition (spec.md §5: sockets are a process-owned resource; there is
    /// no recovery path if the port this node was assigned can't be bound).
    pub fn new(port: u16) -> Self {
        let socket =
            UdpSocket::bind(("0.0.0.0", port)).expect("could not bind UDP socket for this node");

        UdpTransport {
            socket,
            value: PhantomData,
        }
    }
}

impl<T> Transport<T> for UdpTransport<T>
where
    T: Serialize + DeserializeOwned + Clone + Debug + Send + Sync,
{
    fn send(&self, to: &HostEntry, msg: &Message<T>) {
        let encoded = match serialize(msg) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("could not serialize {:?} for {:?}: {}", msg, to.uid, e);
                return;
            }
        };

        if let Err(e) = self.socket.send_to(&encoded[..], (to.host.as_str(), to.port)) {
            warn!("could not send {:?} to {}:{}: {}", msg, to.host, to.port, e);
        }
    }

    fn recv(&self) -> Option<Message<T>> {
        let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];

        let (n, _src) = self
            .socket
            .recv_from(&mut buf)
            .expect("UDP socket recv_from failed");

        match deserialize(&buf[..n]) {
            Ok(msg) => Some(msg),
            Err(e) => {
                warn!("dropping undecodable datagram ({} bytes): {}", n, e);
                None
            }
        }
    }
}
