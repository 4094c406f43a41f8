//! The wire messages exchanged between nodes. One `enum` variant per header
//! from spec.md §6: `TOKEN`, `ROLE`, `START`, `FWD`, `PROPOSAL`, `ACK`,
//! `NACK`, `ACCEPT`, `ACCEPT-VALUE`, `LEARN`, `SET`, `TERM`.

/// All message types exchanged in a run. Generic over the value type `T`
/// being agreed upon.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub enum Message<T> {
    Token(Token),
    Role(Role),
    Start(Start),
    Fwd(Fwd<T>),
    Proposal(Proposal<T>),
    Ack(Ack<T>),
    Nack(Nack),
    Accept(Accept<T>),
    AcceptValue(AcceptValue<T>),
    Learn(Learn<T>),
    Set(Set<T>),
    Term,
}

/// The Chang-Roberts ring token (spec.md §4.3). `Term` is the special
/// `TOKEN("TERM")` payload that ends the election listener everywhere.
#[derive(Serialize, Deserialize, Debug, Copy, Clone)]
pub enum Token {
    Candidate(usize),
    Term,
}

/// Sent unicast by the coordinator to assign a role (spec.md §4.4).
#[derive(Serialize, Deserialize, Debug, Copy, Clone)]
pub struct Role {
    pub kind: RoleKind,
}

#[derive(Serialize, Deserialize, Debug, Copy, Clone, Eq, PartialEq)]
pub enum RoleKind {
    Proposer,
    Acceptor,
    Learner,
}

/// Sent by the coordinator to every host after role assignment (spec.md
/// §4.4). Carries UIDs, not addresses — every node already has the shared
/// host table and can resolve UIDs to addresses locally.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Start {
    pub proposers: Vec<usize>,
    pub acceptors: Vec<usize>,
    pub learners: Vec<usize>,
}

/// Phase 0: a client forwards its value to a proposer (spec.md §4.5, §4.6).
#[derive(Serialize, Deserialize, Debug, Copy, Clone)]
pub struct Fwd<T> {
    pub value: T,
    pub sender_uid: usize,
}

/// Phase 1a: a proposer's `PROPOSAL(v, n)` to the acceptors.
#[derive(Serialize, Deserialize, Debug, Copy, Clone)]
pub struct Proposal<T> {
    pub value: T,
    pub n: usize,
    pub sender_uid: usize,
}

/// Phase 1b: an acceptor's `ACK(n1, v, n2)` reply to a proposer.
#[derive(Serialize, Deserialize, Debug, Copy, Clone)]
pub struct Ack<T> {
    pub n1: usize,
    pub v: T,
    pub n2: Option<usize>,
    pub sender_uid: usize,
    pub receiver_uid: usize,
}

/// An acceptor's rejection of a stale `Proposal` (spec.md §4.6, §9 open
/// question 2: addressed via `sender_uid`, resolved before branching).
#[derive(Serialize, Deserialize, Debug, Copy, Clone)]
pub struct Nack {
    pub v_rnd: usize,
    pub sender_uid: usize,
    pub receiver_uid: usize,
}

/// Phase 2a: a proposer's `ACCEPT(v, n)` to the acceptors.
#[derive(Serialize, Deserialize, Debug, Copy, Clone)]
pub struct Accept<T> {
    pub v: T,
    pub n: usize,
    pub sender_uid: usize,
}

/// The ghost message: an acceptor refreshes the proposers' view of already-
/// accepted values (spec.md §4.6 Phase 2b, GLOSSARY). Bypasses the
/// dispatcher queue on the listener thread (spec.md §4.2).
#[derive(Serialize, Deserialize, Debug, Copy, Clone)]
pub struct AcceptValue<T> {
    pub v: T,
    pub n: usize,
    pub sender_uid: usize,
}

/// Phase 3: an acceptor's `LEARN(v, n)` to the learners.
#[derive(Serialize, Deserialize, Debug, Copy, Clone)]
pub struct Learn<T> {
    pub v: T,
    pub n: usize,
    pub sender_uid: usize,
}

/// The decided value, delivered to clients.
#[derive(Serialize, Deserialize, Debug, Copy, Clone)]
pub struct Set<T> {
    pub v: T,
}
