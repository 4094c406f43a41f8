//! Error types for the boundary between the outside world (host-table files,
//! CLI arguments) and the core consensus engine. The engine itself is
//! crash-stop (see `node.rs` and `paxos.rs`): protocol-level faults are
//! either silent (lost datagrams), logged-and-dropped (bad datagrams,
//! misrouted headers), or a `panic!`/`assert!` (a role-table bug). Only
//! input validation at process start uses `Result`.

use std::io;

/// Failures while reading or parsing a host-table file (spec.md §6).
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read host table file {path:?}: {source}")]
    Io { path: String, source: io::Error },

    #[error("host table line {line}: expected `{expected} N`, got {found:?}")]
    BadHeader {
        line: usize,
        expected: &'static str,
        found: String,
    },

    #[error("host table line {line}: count is not a number: {found:?}")]
    BadCount { line: usize, found: String },

    #[error("host table line {line}: expected `host port kind`, got {found:?}")]
    BadHostLine { line: usize, found: String },

    #[error("host table line {line}: port is not a number: {found:?}")]
    BadPort { line: usize, found: String },

    #[error("host table line {line}: kind must be `con` or `cli`, got {found:?}")]
    BadKind { line: usize, found: String },
}

/// Top-level error type returned by the CLI binaries.
#[derive(Debug, thiserror::Error)]
pub enum PaxosError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Args(String),
}
