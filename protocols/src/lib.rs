//! Text formats exchanged with the provisioned host and the local mesh client.
//!
//! Everything here is pure parsing: no process spawning, no I/O.

pub mod log;
pub mod mesh;
pub mod status;
