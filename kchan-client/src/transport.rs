//! Transports implementing the socket traits.
mod memory;
mod tcp;

pub use memory::{MemoryContext, MemoryPeer};
pub use tcp::{TcpContext, TcpSocket};
