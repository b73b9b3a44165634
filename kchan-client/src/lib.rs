//! Blocking channels to a messaging kernel.
//!
//! Useful for test suites and blocking terminal interfaces. Every call blocks the
//! calling thread, only the heartbeat runs on its own thread.
mod address;
pub use address::Endpoint;

pub mod channel;
pub use channel::{
    HeartbeatChannel, HeartbeatConfig, IOPubChannel, KernelChannel, MissedBeat, ShellChannel, SocketChannel,
    StdInChannel,
};

mod client;
pub use client::BlockingClient;

mod connection;
pub use connection::ConnectionInfo;

mod error;
pub use error::{is_empty, ChannelError};

mod socket;
pub use socket::{ChannelRole, Socket, SocketFactory};

pub mod transport;
pub use transport::{MemoryContext, MemoryPeer, TcpContext};

pub use kchan_codec::content::{ExecuteOptions, HistoryAccess};
pub use kchan_codec::{validate_string_dict, validate_string_list, Message, Session, ValueError};
