use crate::address::tcp_host_port;
use crate::channel_error;
use crate::error::ChannelError;
use crate::socket::{ChannelRole, Socket, SocketFactory};
use anyhow::{anyhow, Result};
use futures::stream::StreamExt;
use futures::SinkExt;
use kchan_codec::codec::{Multipart, MultipartCodec};
use log::{debug, error, trace};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::runtime::Runtime;
use tokio::sync::mpsc::{self, error::TryRecvError};
use tokio::task::JoinHandle;
use tokio_util::codec::Framed;

/// Transport context of TCP sockets.
///
/// The socket I/O runs on a shared multi-threaded runtime, so messages keep
/// arriving while the blocking callers are busy with something else.
#[derive(Clone)]
pub struct TcpContext {
    runtime: Arc<Runtime>,
}

impl TcpContext {
    pub fn new() -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("kchan-io")
            .enable_all()
            .build()?;

        Ok(TcpContext {
            runtime: Arc::new(runtime),
        })
    }
}

impl SocketFactory for TcpContext {
    fn connect(&self, role: ChannelRole, identity: &[u8], address: &str) -> Result<Box<dyn Socket>> {
        let socket = TcpSocket::connect(self.runtime.clone(), role, identity, address)?;

        Ok(Box::new(socket))
    }
}

/// Blocking face of a framed TCP connection.
pub struct TcpSocket {
    runtime: Arc<Runtime>,
    role: ChannelRole,
    identity: Vec<u8>,
    incoming: mpsc::UnboundedReceiver<Multipart>,
    outgoing: Option<mpsc::UnboundedSender<Multipart>>,
    /// A message which was seen by `poll` but not received yet.
    pending: Option<Multipart>,
    io_task: Option<JoinHandle<()>>,
}

impl TcpSocket {
    pub fn connect(runtime: Arc<Runtime>, role: ChannelRole, identity: &[u8], address: &str) -> Result<TcpSocket> {
        let (host, port) = tcp_host_port(address)?;

        let stream = runtime
            .block_on(TcpStream::connect((host.as_str(), port)))
            .map_err(|e| anyhow!("Connection error to {} {:?}", address, e))?;
        stream.set_nodelay(true)?;

        debug!("Connected {} channel to {}", role, address);

        let (in_tx, in_rx) = mpsc::unbounded_channel();
        let (out_tx, out_rx) = mpsc::unbounded_channel();

        let io_task = runtime.spawn(async move {
            if let Err(e) = socket_loop(stream, in_tx, out_rx).await {
                error!("Error in {} socket {:?}", role, e);
            }
        });

        Ok(TcpSocket {
            runtime,
            role,
            identity: identity.to_vec(),
            incoming: in_rx,
            outgoing: Some(out_tx),
            pending: None,
            io_task: Some(io_task),
        })
    }

    pub fn identity(&self) -> &[u8] {
        &self.identity
    }
}

async fn socket_loop(
    socket: TcpStream,
    incoming: mpsc::UnboundedSender<Multipart>,
    mut outgoing: mpsc::UnboundedReceiver<Multipart>,
) -> Result<()> {
    let (mut sink, mut stream) = Framed::new(socket, MultipartCodec {}).split();

    loop {
        tokio::select! {
            frames = stream.next() => {
                match frames {
                    Some(Ok(frames)) => {
                        if incoming.send(frames).is_err() {
                            break;
                        }
                    }
                    Some(Err(e)) => return Err(e.into()),
                    None => {
                        trace!("Peer closed the connection");
                        break;
                    }
                }
            }
            frames = outgoing.recv() => {
                match frames {
                    Some(frames) => sink.send(frames).await?,
                    None => break,
                }
            }
        }
    }

    Ok(())
}

impl Socket for TcpSocket {
    fn poll(&mut self, timeout: Option<Duration>) -> Result<bool> {
        if self.pending.is_some() {
            return Ok(true);
        }

        let incoming = &mut self.incoming;

        let next = match timeout {
            Some(t) if t.is_zero() => match incoming.try_recv() {
                Ok(frames) => Some(frames),
                Err(TryRecvError::Empty) => return Ok(false),
                Err(TryRecvError::Disconnected) => None,
            },
            Some(t) => match self.runtime.block_on(tokio::time::timeout(t, incoming.recv())) {
                Ok(next) => next,
                Err(_elapsed) => return Ok(false),
            },
            None => self.runtime.block_on(incoming.recv()),
        };

        match next {
            Some(frames) => {
                self.pending = Some(frames);

                Ok(true)
            }
            None => channel_error!(ChannelError::Disconnected(self.role.to_string())),
        }
    }

    fn recv_multipart(&mut self) -> Result<Multipart> {
        if let Some(frames) = self.pending.take() {
            return Ok(frames);
        }

        match self.runtime.block_on(self.incoming.recv()) {
            Some(frames) => Ok(frames),
            None => channel_error!(ChannelError::Disconnected(self.role.to_string())),
        }
    }

    fn send_multipart(&mut self, frames: Multipart) -> Result<()> {
        match &self.outgoing {
            Some(out) => out
                .send(frames)
                .map_err(|_| anyhow!("{} connection is closed", self.role)),
            None => Err(anyhow!("{} socket is closed", self.role)),
        }
    }

    fn close(&mut self, linger: Duration) -> Result<()> {
        // Closing the outgoing queue ends the I/O loop once the queued messages are written.
        self.outgoing = None;
        self.pending = None;

        if let Some(task) = self.io_task.take() {
            let abort = task.abort_handle();

            if !linger.is_zero() && self.runtime.block_on(tokio::time::timeout(linger, task)).is_err() {
                debug!("{} socket didn't finish in {:?}", self.role, linger);
            }

            abort.abort();
        }

        Ok(())
    }
}

impl Drop for TcpSocket {
    fn drop(&mut self) {
        if let Some(task) = self.io_task.take() {
            task.abort();
        }
    }
}
