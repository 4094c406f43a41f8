//! Starts one consensus node: runs the election, learns or assigns a role,
//! then runs that role's state machine until `TERM`.
//!
//!     RUST_LOG=paxos_ring=info cargo run --bin consensus_driver -- <uid>
//!
//! Reads `./hosts.txt` in the current directory (spec.md §6: fixed name, no
//! path argument, no environment variables).

extern crate env_logger;
#[macro_use]
extern crate log;
extern crate paxos_ring;

use std::env;
use std::process;

use paxos_ring::error::PaxosError;
use paxos_ring::host::parse_host_table;
use paxos_ring::node::run_consensus_node;

const HOSTS_FILE: &str = "./hosts.txt";

fn main() -> Result<(), PaxosError> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    info!("{:?}", args);

    if args.len() != 2 {
        return Err(PaxosError::Args(format!(
            "expected 1 argument (uid), got {}",
            args.len() - 1
        )));
    }

    let uid: usize = args[1]
        .parse()
        .map_err(|_| PaxosError::Args(format!("uid {:?} is not a non-negative integer", args[1])))?;

    let table = parse_host_table(HOSTS_FILE)?;

    run_consensus_node::<i64>(uid, table);

    process::exit(0);
}
