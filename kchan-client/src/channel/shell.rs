use super::{KernelChannel, SocketChannel};
use crate::address::Endpoint;
use crate::socket::{ChannelRole, SocketFactory};
use anyhow::Result;
use kchan_codec::message::{major_version, KERNEL_INFO_REPLY};
use kchan_codec::{Message, Session, MAJOR_PROTOCOL_VERSION};
use log::{info, warn};
use std::sync::Arc;

/// The shell channel for issuing request/replies to the kernel.
///
/// It listens for `kernel_info_reply` messages and adapts the session to the
/// protocol version of the kernel.
#[derive(Debug)]
pub struct ShellChannel {
    channel: SocketChannel,
}

impl ShellChannel {
    pub fn new(context: Arc<dyn SocketFactory>, session: Arc<Session>, endpoint: impl Into<Endpoint>) -> Result<Self> {
        Ok(ShellChannel {
            channel: SocketChannel::new(ChannelRole::Shell, context, session, endpoint)?,
        })
    }

    fn handle_kernel_info_reply(&self, msg: &Message) {
        let version = match msg.content_str("protocol_version") {
            Some(version) => version,
            None => {
                warn!("Kernel info reply without protocol version {:?}", msg.content);
                return;
            }
        };

        match major_version(version) {
            Some(major) if major != MAJOR_PROTOCOL_VERSION => {
                info!("Kernel speaks protocol {}, adapting session", version);

                self.channel.session().set_adapt_version(major);
            }
            Some(_) => (),
            None => warn!("Cannot parse protocol version {:?}", version),
        }
    }
}

impl KernelChannel for ShellChannel {
    fn socket_channel(&self) -> &SocketChannel {
        &self.channel
    }

    fn socket_channel_mut(&mut self) -> &mut SocketChannel {
        &mut self.channel
    }

    fn received(&mut self, msg: &Message) {
        if msg.msg_type() == KERNEL_INFO_REPLY {
            self.handle_kernel_info_reply(msg);
        }
    }
}
