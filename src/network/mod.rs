//! Network Module
//!
//! Connection lifecycle and request/response correlation.
//!
//! ## Architecture
//! - One TCP connection to the switch, replaced on every fault
//! - One supervisor thread: read loop, then redial loop, repeat
//! - Callers write directly and wait on the correlator for the reply

mod connection;
mod correlator;
mod supervisor;

pub use connection::{Connection, ConnectionWriter};
pub use correlator::{Correlator, Delivery, Flight, Observer};
pub use supervisor::{ConnectionState, Supervisor};
