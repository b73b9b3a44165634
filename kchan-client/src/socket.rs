use anyhow::Result;
use kchan_codec::codec::Multipart;
use std::fmt;
use std::time::Duration;

/// The role of a channel, the socket factory builds a socket for each role.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChannelRole {
    Shell,
    IOPub,
    StdIn,
    Heartbeat,
}

impl fmt::Display for ChannelRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChannelRole::Shell => "shell",
            ChannelRole::IOPub => "iopub",
            ChannelRole::StdIn => "stdin",
            ChannelRole::Heartbeat => "hb",
        };

        f.write_str(name)
    }
}

/// A connected messaging socket which can be used in a blocking way.
pub trait Socket: Send {
    /// Waits until a message can be received. `None` waits forever, zero duration
    /// just checks. Returns if a message is ready, it doesn't consume the message.
    fn poll(&mut self, timeout: Option<Duration>) -> Result<bool>;

    /// Receives the next multipart message, blocks until there is one.
    fn recv_multipart(&mut self) -> Result<Multipart>;

    /// Queues a multipart message for sending, doesn't wait for the delivery.
    fn send_multipart(&mut self, frames: Multipart) -> Result<()>;

    /// Closes the socket. Pending outgoing messages are tried to be delivered
    /// within the `linger` time, the rest is discarded.
    fn close(&mut self, linger: Duration) -> Result<()>;
}

/// The transport context shared by the channels of a client. It makes sockets
/// for the different channel roles.
pub trait SocketFactory: Send + Sync {
    /// Connects a socket of the `role` to `address` with the session `identity`.
    fn connect(&self, role: ChannelRole, identity: &[u8], address: &str) -> Result<Box<dyn Socket>>;
}
