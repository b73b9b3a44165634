//! Blocking channels to a kernel.
//!
//! Every channel owns one socket, created by `start` through the shared socket
//! factory and released by `close`. The session is shared by all the channels
//! of a client.
mod heartbeat;
mod iopub;
mod shell;
mod stdin;

pub use heartbeat::{HeartbeatChannel, HeartbeatConfig, MissedBeat};
pub use iopub::IOPubChannel;
pub use shell::ShellChannel;
pub use stdin::StdInChannel;

use crate::address::Endpoint;
use crate::channel_error;
use crate::error::{is_empty, ChannelError};
use crate::socket::{ChannelRole, Socket, SocketFactory};
use anyhow::Result;
use kchan_codec::{Message, Session};
use log::{trace, warn};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// The socket and the address of a channel, the part shared by every role.
pub struct SocketChannel {
    role: ChannelRole,
    context: Arc<dyn SocketFactory>,
    session: Arc<Session>,
    address: String,
    socket: Option<Box<dyn Socket>>,
}

impl fmt::Debug for SocketChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SocketChannel")
            .field("role", &self.role)
            .field("address", &self.address)
            .field("alive", &self.is_alive())
            .finish()
    }
}

impl SocketChannel {
    /// Creates an inert channel, the socket is made by `start`.
    pub fn new(
        role: ChannelRole,
        context: Arc<dyn SocketFactory>,
        session: Arc<Session>,
        endpoint: impl Into<Endpoint>,
    ) -> Result<Self> {
        Ok(SocketChannel {
            role,
            context,
            session,
            address: endpoint.into().into_url()?,
            socket: None,
        })
    }

    pub fn role(&self) -> ChannelRole {
        self.role
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// The connection URL like `tcp://127.0.0.1:5555`.
    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn start(&mut self) -> Result<()> {
        let socket = self
            .context
            .connect(self.role, self.session.bsession(), &self.address)?;

        self.socket = Some(socket);

        Ok(())
    }

    fn socket_mut(&mut self) -> Result<&mut Box<dyn Socket>> {
        match self.socket.as_mut() {
            Some(socket) => Ok(socket),
            None => channel_error!(ChannelError::NotConnected(self.address.clone())),
        }
    }

    fn recv(&mut self) -> Result<Message> {
        let frames = self.socket_mut()?.recv_multipart()?;
        let (_identities, frames) = self.session.feed_identities(frames)?;
        let msg = self.session.deserialize(frames)?;

        trace!("Received {} on {}", msg.msg_type(), self.role);

        Ok(msg)
    }

    /// Gets a message if there is one that is ready.
    ///
    /// A blocking call waits at most `timeout` (forever if it is `None`), a
    /// non-blocking call just checks. If there is no message it fails with
    /// [`ChannelError::Empty`].
    pub fn get_msg(&mut self, block: bool, timeout: Option<Duration>) -> Result<Message> {
        let timeout = if block { timeout } else { Some(Duration::ZERO) };

        if self.socket_mut()?.poll(timeout)? {
            self.recv()
        } else {
            channel_error!(ChannelError::Empty)
        }
    }

    /// Is there a message that has been received?
    pub fn msg_ready(&mut self) -> Result<bool> {
        self.socket_mut()?.poll(Some(Duration::ZERO))
    }

    /// Closes the socket without lingering. Errors of the close are logged only.
    pub fn close(&mut self) {
        if let Some(mut socket) = self.socket.take() {
            if let Err(e) = socket.close(Duration::ZERO) {
                warn!("Error closing {} socket {:?}", self.role, e);
            }
        }
    }

    pub fn is_alive(&self) -> bool {
        self.socket.is_some()
    }

    /// Passes a message to the socket, doesn't wait for any answer.
    pub fn queue_send(&mut self, msg: &Message) -> Result<()> {
        let frames = self.session.serialize(msg, &[])?;

        trace!("Sending {} on {}", msg.msg_type(), self.role);

        self.socket_mut()?.send_multipart(frames)
    }
}

/// The operations of a message channel.
///
/// Implementors give access to their `SocketChannel` and can look at every
/// received message in `received` before it is handed to the caller.
pub trait KernelChannel {
    fn socket_channel(&self) -> &SocketChannel;

    fn socket_channel_mut(&mut self) -> &mut SocketChannel;

    /// Called with every received message.
    fn received(&mut self, _msg: &Message) {}

    fn start(&mut self) -> Result<()> {
        self.socket_channel_mut().start()
    }

    fn address(&self) -> &str {
        self.socket_channel().address()
    }

    /// See [`SocketChannel::get_msg`].
    fn get_msg(&mut self, block: bool, timeout: Option<Duration>) -> Result<Message> {
        let msg = self.socket_channel_mut().get_msg(block, timeout)?;

        self.received(&msg);

        Ok(msg)
    }

    /// Get all messages that are currently ready.
    fn get_msgs(&mut self) -> Result<Vec<Message>> {
        let mut msgs = vec![];

        loop {
            match self.get_msg(false, None) {
                Ok(msg) => msgs.push(msg),
                Err(e) if is_empty(&e) => break,
                Err(e) => return Err(e),
            }
        }

        Ok(msgs)
    }

    fn msg_ready(&mut self) -> Result<bool> {
        self.socket_channel_mut().msg_ready()
    }

    fn close(&mut self) {
        self.socket_channel_mut().close()
    }

    fn stop(&mut self) {
        self.close()
    }

    fn is_alive(&self) -> bool {
        self.socket_channel().is_alive()
    }

    fn queue_send(&mut self, msg: &Message) -> Result<()> {
        self.socket_channel_mut().queue_send(msg)
    }
}
