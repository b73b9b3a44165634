use bytes::Bytes;
use kchan_client::{ChannelError, ChannelRole, MemoryContext, MemoryPeer, Session};
use kchan_codec::{Header, Message};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

pub fn setup() -> (Arc<MemoryContext>, Arc<Session>) {
    let _ = env_logger::builder().is_test(true).try_init();

    (Arc::new(MemoryContext::new()), Arc::new(Session::with_username("client")))
}

/// Kernel side of one channel.
pub struct Kernel {
    pub session: Session,
    peer: MemoryPeer,
}

impl Kernel {
    pub fn accept(context: &MemoryContext, role: ChannelRole) -> Kernel {
        let peer = context
            .accept(role)
            .unwrap_or_else(|| panic!("no {} socket connected", role));

        Kernel {
            session: Session::with_username("kernel"),
            peer,
        }
    }

    pub fn send(&self, msg_type: &str, content: Value, parent: Option<&Header>) -> Message {
        let msg = self.session.msg(msg_type, content, parent);
        let identity = Bytes::copy_from_slice(self.peer.identity());
        let frames = self.session.serialize(&msg, &[identity]).unwrap();

        self.peer.send(frames).unwrap();

        msg
    }

    pub fn try_recv(&self, timeout: Duration) -> Option<Message> {
        let frames = self.peer.recv_timeout(timeout)?;
        let (_, rest) = self.session.feed_identities(frames).unwrap();

        Some(self.session.deserialize(rest).unwrap())
    }

    pub fn recv(&self) -> Message {
        self.try_recv(Duration::from_secs(2)).expect("no message from the client")
    }

    pub fn peer(&self) -> &MemoryPeer {
        &self.peer
    }
}

pub fn to_channel_error<T: std::fmt::Debug>(result: anyhow::Result<T>) -> ChannelError {
    result.unwrap_err().downcast::<ChannelError>().unwrap()
}
