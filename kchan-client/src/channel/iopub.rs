use super::{KernelChannel, SocketChannel};
use crate::address::Endpoint;
use crate::socket::{ChannelRole, SocketFactory};
use anyhow::Result;
use kchan_codec::Session;
use std::sync::Arc;

/// The iopub channel which listens for messages that the kernel publishes.
///
/// This channel is where all output is published to frontends.
#[derive(Debug)]
pub struct IOPubChannel {
    channel: SocketChannel,
}

impl IOPubChannel {
    pub fn new(context: Arc<dyn SocketFactory>, session: Arc<Session>, endpoint: impl Into<Endpoint>) -> Result<Self> {
        Ok(IOPubChannel {
            channel: SocketChannel::new(ChannelRole::IOPub, context, session, endpoint)?,
        })
    }
}

impl KernelChannel for IOPubChannel {
    fn socket_channel(&self) -> &SocketChannel {
        &self.channel
    }

    fn socket_channel_mut(&mut self) -> &mut SocketChannel {
        &mut self.channel
    }
}
