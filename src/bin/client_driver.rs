//! Starts one client: forwards a value to a proposer and prints the decided
//! value once consensus is reached.
//!
//!     RUST_LOG=paxos_ring=info cargo run --bin client_driver -- <uid> <value> <proposer_hint>
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
use paxos_ring::node::run_client;

const HOSTS_FILE: &str = "./hosts.txt";

fn main() -> Result<(), PaxosError> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    info!("{:?}", args);

    if args.len() != 4 {
        return Err(PaxosError::Args(format!(
            "expected 3 arguments (uid, value, proposer_hint), got {}",
            args.len() - 1
        )));
    }

    let uid: usize = args[1]
        .parse()
        .map_err(|_| PaxosError::Args(format!("uid {:?} is not a non-negative integer", args[1])))?;

    let value: i64 = args[2]
        .parse()
        .map_err(|_| PaxosError::Args(format!("value {:?} is not an integer", args[2])))?;

    let proposer_hint: usize = args[3].parse().map_err(|_| {
        PaxosError::Args(format!("proposer_hint {:?} is not a non-negative integer", args[3]))
    })?;

    let table = parse_host_table(HOSTS_FILE)?;

    run_client(uid, value, proposer_hint, table);
    process::exit(0);
}
