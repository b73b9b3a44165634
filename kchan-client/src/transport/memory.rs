use crate::channel_error;
use crate::error::ChannelError;
use crate::socket::{ChannelRole, Socket, SocketFactory};
use anyhow::{anyhow, Result};
use kchan_codec::codec::Multipart;
use log::trace;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// In-process transport context.
///
/// Every connected socket has a kernel side end, a [`MemoryPeer`], which can be
/// taken by [`MemoryContext::accept`]. Useful for test suites and for embedding
/// a kernel in the same process.
///
/// Peers of closed client sockets which were never accepted are dropped.
#[derive(Default)]
pub struct MemoryContext {
    peers: Mutex<HashMap<ChannelRole, Vec<MemoryPeer>>>,
}

impl MemoryContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes the kernel side of the last open socket connected with `role`.
    pub fn accept(&self, role: ChannelRole) -> Option<MemoryPeer> {
        let mut peers = self.peers.lock().unwrap_or_else(PoisonError::into_inner);

        peers.get_mut(&role).and_then(|p| {
            p.retain(|peer| !peer.is_closed());
            p.pop()
        })
    }

    /// Number of open sockets of `role` whose kernel side is not accepted yet.
    pub fn pending(&self, role: ChannelRole) -> usize {
        let mut peers = self.peers.lock().unwrap_or_else(PoisonError::into_inner);

        peers.get_mut(&role).map_or(0, |p| {
            p.retain(|peer| !peer.is_closed());
            p.len()
        })
    }
}

impl SocketFactory for MemoryContext {
    fn connect(&self, role: ChannelRole, identity: &[u8], address: &str) -> Result<Box<dyn Socket>> {
        let (to_kernel, from_client) = mpsc::channel();
        let (to_client, from_kernel) = mpsc::channel();
        let closed = Arc::new(AtomicBool::new(false));

        trace!("Memory {} socket for {}", role, address);

        let peer = MemoryPeer {
            identity: identity.to_vec(),
            incoming: from_client,
            outgoing: to_client,
            closed: closed.clone(),
        };

        let mut peers = self.peers.lock().unwrap_or_else(PoisonError::into_inner);
        let role_peers = peers.entry(role).or_default();

        role_peers.retain(|peer| !peer.is_closed());
        role_peers.push(peer);

        Ok(Box::new(MemorySocket {
            role,
            incoming: from_kernel,
            outgoing: Some(to_kernel),
            pending: None,
            closed,
        }))
    }
}

/// The kernel side end of a memory socket.
pub struct MemoryPeer {
    identity: Vec<u8>,
    incoming: Receiver<Multipart>,
    outgoing: Sender<Multipart>,
    closed: Arc<AtomicBool>,
}

impl MemoryPeer {
    /// The identity the client socket was connected with.
    pub fn identity(&self) -> &[u8] {
        &self.identity
    }

    /// Is the client socket closed or dropped?
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<Multipart> {
        self.incoming.recv_timeout(timeout).ok()
    }

    /// Sends a message to the client, fails if the client socket is closed.
    pub fn send(&self, frames: Multipart) -> Result<()> {
        self.outgoing.send(frames).map_err(|_| anyhow!("Client socket is closed"))
    }
}

struct MemorySocket {
    role: ChannelRole,
    incoming: Receiver<Multipart>,
    outgoing: Option<Sender<Multipart>>,
    pending: Option<Multipart>,
    closed: Arc<AtomicBool>,
}

impl MemorySocket {
    fn disconnected<T>(&self) -> Result<T> {
        channel_error!(ChannelError::Disconnected(self.role.to_string()))
    }
}

impl Socket for MemorySocket {
    fn poll(&mut self, timeout: Option<Duration>) -> Result<bool> {
        if self.pending.is_some() {
            return Ok(true);
        }

        let frames = match timeout {
            Some(t) if t.is_zero() => match self.incoming.try_recv() {
                Ok(frames) => frames,
                Err(TryRecvError::Empty) => return Ok(false),
                Err(TryRecvError::Disconnected) => return self.disconnected(),
            },
            Some(t) => match self.incoming.recv_timeout(t) {
                Ok(frames) => frames,
                Err(RecvTimeoutError::Timeout) => return Ok(false),
                Err(RecvTimeoutError::Disconnected) => return self.disconnected(),
            },
            None => match self.incoming.recv() {
                Ok(frames) => frames,
                Err(_) => return self.disconnected(),
            },
        };

        self.pending = Some(frames);

        Ok(true)
    }

    fn recv_multipart(&mut self) -> Result<Multipart> {
        if let Some(frames) = self.pending.take() {
            return Ok(frames);
        }

        match self.incoming.recv() {
            Ok(frames) => Ok(frames),
            Err(_) => self.disconnected(),
        }
    }

    fn send_multipart(&mut self, frames: Multipart) -> Result<()> {
        match &self.outgoing {
            Some(out) => out
                .send(frames)
                .map_err(|_| anyhow!("Kernel side of {} is closed", self.role)),
            None => Err(anyhow!("{} socket is closed", self.role)),
        }
    }

    fn close(&mut self, _linger: Duration) -> Result<()> {
        self.outgoing = None;
        self.pending = None;
        self.closed.store(true, Ordering::SeqCst);

        Ok(())
    }
}

impl Drop for MemorySocket {
    fn drop(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}
