extern crate bincode;
extern crate env_logger;
#[macro_use]
extern crate log;
extern crate rand;
extern crate serde;
#[macro_use]
extern crate serde_derive;

pub mod client;
pub mod dispatcher;
pub mod election;
pub mod error;
pub mod host;
pub mod message;
pub mod node;
pub mod paxos;
pub mod roles;
pub mod transport;
