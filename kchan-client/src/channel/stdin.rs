use super::{KernelChannel, SocketChannel};
use crate::address::Endpoint;
use crate::socket::{ChannelRole, SocketFactory};
use anyhow::Result;
use kchan_codec::message::INPUT_REPLY;
use kchan_codec::{content, Session};
use std::sync::Arc;

/// The stdin channel to handle `input_request` messages the kernel sends.
#[derive(Debug)]
pub struct StdInChannel {
    channel: SocketChannel,
}

impl StdInChannel {
    pub fn new(context: Arc<dyn SocketFactory>, session: Arc<Session>, endpoint: impl Into<Endpoint>) -> Result<Self> {
        Ok(StdInChannel {
            channel: SocketChannel::new(ChannelRole::StdIn, context, session, endpoint)?,
        })
    }

    /// Sends the text the user typed in answer to an input request.
    pub fn input(&mut self, text: &str) -> Result<()> {
        let msg = self.channel.session().msg(INPUT_REPLY, content::input_reply(text), None);

        self.channel.queue_send(&msg)
    }
}

impl KernelChannel for StdInChannel {
    fn socket_channel(&self) -> &SocketChannel {
        &self.channel
    }

    fn socket_channel_mut(&mut self) -> &mut SocketChannel {
        &mut self.channel
    }
}
